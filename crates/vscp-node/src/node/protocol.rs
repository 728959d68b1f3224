//! `CLASS1.PROTOCOL` command handling.

use log::{debug, info, warn};

use super::{AckOutcome, FrameOutcome, Node, NodeState, ProcessOutcome};
use crate::api::{Application, LampState, PersistentStore, TimerService, Transport};
use crate::config::{BOOT_LOADER_NONE, MDF_URL_LEN};
use crate::diag::bump;
use crate::dm::ROW_LEN;
use crate::message::RxEvent;
use crate::persist::{ADDR_SEGMENT_CRC, GUID_LEN};
use crate::protocol::{ProtocolType, CLASS1_PROTOCOL, NICKNAME_MAX, NICKNAME_UNINITIALIZED};
use crate::register::{
    frame_chunks, page_span, read_be_u16, read_be_u32, EXTENDED_FRAME_VALUES, FRAME_VALUES,
    PAGE_LEN,
};
use crate::timer::TimerSlot;

/// `NACK_BOOT_LOADER` code: algorithm not supported.
pub const BOOT_NACK_ALGORITHM: u8 = 1;
/// `NACK_BOOT_LOADER` code: GUID bytes do not match.
pub const BOOT_NACK_GUID: u8 = 2;
/// `NACK_BOOT_LOADER` code: request too short.
pub const BOOT_NACK_MALFORMED: u8 = 3;

/// `DROP_NICKNAME` flag: keep the current nickname.
pub const DROP_KEEP_NICKNAME: u8 = 1 << 5;
/// `DROP_NICKNAME` flag: restore factory defaults before the reset.
pub const DROP_FACTORY_DEFAULTS: u8 = 1 << 6;
/// `DROP_NICKNAME` flag: park the node instead of resetting.
pub const DROP_GO_IDLE: u8 = 1 << 7;

/// Frames in a `WHO_IS_THERE` response.
pub const WHO_IS_THERE_FRAMES: usize = 7;

const BOOT_GUID_BYTES: usize = 6;

impl<S, T, M, A> Node<S, T, M, A>
where
    S: PersistentStore,
    T: Transport,
    M: TimerService,
    A: Application,
{
    fn reply(&mut self, kind: ProtocolType, data: &[u8]) -> bool {
        let nickname = self.nickname();
        self.send(CLASS1_PROTOCOL, kind.as_u8(), nickname, data)
    }

    fn enter_idle(&mut self) {
        if let Some(bank) = self.ctx.timers.as_mut() {
            bank.stop_all(&mut self.timer_service);
        }
        self.ctx.sessions.clear();
        self.ctx.reset_pending = false;
        self.ctx.state = NodeState::Idle;
        self.app.on_idle();
        info!("node idle");
    }

    fn segment_heartbeat(&mut self, data: &[u8], restart_on_change: bool) {
        let Some(&crc) = data.first() else {
            return;
        };
        let stored = self.store.read8(ADDR_SEGMENT_CRC);
        if crc == stored || !restart_on_change {
            if crc != stored {
                self.store.write8(ADDR_SEGMENT_CRC, crc);
            }
            if let Some(time) = read_be_u32(data, 1) {
                self.ctx.time_since_epoch = time;
            }
            return;
        }
        info!("segment controller CRC changed from {stored:#04x} to {crc:#04x}");
        self.store.write8(ADDR_SEGMENT_CRC, crc);
        self.set_nickname(NICKNAME_UNINITIALIZED);
        self.start_discovery();
    }

    pub(super) fn handle_discovery_event(&mut self, event: &RxEvent) -> ProcessOutcome {
        if event.class() != CLASS1_PROTOCOL {
            return ProcessOutcome::Ignored;
        }
        let data = event.data();
        let handled = match ProtocolType::from_u8(event.event_type()) {
            Some(ProtocolType::SetNicknameId) => match (data.first(), data.get(1)) {
                (Some(&old), Some(&new))
                    if self.ctx.discovery.addresses_us(old) && new <= NICKNAME_MAX =>
                {
                    self.stop_general();
                    self.set_nickname(new);
                    self.send(
                        CLASS1_PROTOCOL,
                        ProtocolType::NicknameIdAccepted.as_u8(),
                        new,
                        &[],
                    );
                    info!("nickname {new} assigned");
                    self.go_active(new);
                    true
                }
                _ => false,
            },
            Some(ProtocolType::ProbeAck) if event.origin() == self.ctx.discovery.candidate() => {
                match self.ctx.discovery.on_ack() {
                    AckOutcome::MasterPresent => {
                        debug!("segment master present, waiting for assignment");
                        self.start_general(self.config.assignment_timeout_ms);
                    }
                    AckOutcome::Taken => self.send_probe(),
                    AckOutcome::Exhausted => {
                        warn!("no free nickname on the segment");
                        self.stop_general();
                        self.send(
                            CLASS1_PROTOCOL,
                            ProtocolType::NewNodeOnline.as_u8(),
                            NICKNAME_UNINITIALIZED,
                            &[NICKNAME_UNINITIALIZED],
                        );
                        self.app.set_lamp(LampState::Off);
                        self.enter_idle();
                    }
                }
                true
            }
            Some(ProtocolType::SegmentControllerHeartbeat) => {
                self.segment_heartbeat(data, false);
                true
            }
            _ => false,
        };
        if handled {
            bump(&mut self.ctx.diagnostics.protocol_events);
            ProcessOutcome::Protocol(event.event_type())
        } else {
            ProcessOutcome::Ignored
        }
    }

    pub(super) fn handle_protocol_event(&mut self, event: &RxEvent) -> ProcessOutcome {
        let Some(kind) = ProtocolType::from_u8(event.event_type()) else {
            return ProcessOutcome::Ignored;
        };
        let nickname = self.nickname();
        let data = event.data();
        let addressed = nickname != NICKNAME_UNINITIALIZED && data.first() == Some(&nickname);

        let handled = match kind {
            ProtocolType::SegmentControllerHeartbeat => {
                self.segment_heartbeat(data, true);
                true
            }
            ProtocolType::NewNodeOnline if addressed => {
                debug!("defending nickname {nickname}");
                self.reply(ProtocolType::ProbeAck, &[]);
                true
            }
            ProtocolType::ProbeAck if event.origin() == nickname => {
                warn!("nickname {nickname} collision, restarting discovery");
                bump(&mut self.ctx.diagnostics.nickname_collisions);
                self.set_nickname(NICKNAME_UNINITIALIZED);
                self.start_discovery();
                true
            }
            ProtocolType::SetNicknameId if addressed => match data.get(1) {
                Some(&new) if new <= NICKNAME_MAX => {
                    self.set_nickname(new);
                    info!("nickname changed from {nickname} to {new}");
                    self.reply(ProtocolType::NicknameIdAccepted, &[]);
                    true
                }
                _ => false,
            },
            ProtocolType::DropNickname if addressed => {
                let flags = data.get(1).copied().unwrap_or(0);
                let delay_s = data.get(2).copied().unwrap_or(0);
                self.drop_nickname(flags, delay_s);
                true
            }
            ProtocolType::ReadRegister if addressed => match data.get(1) {
                Some(&reg) => {
                    let value = self.read_register(self.ctx.page_select, reg);
                    self.reply(ProtocolType::RwResponse, &[reg, value]);
                    true
                }
                None => false,
            },
            ProtocolType::WriteRegister if addressed => match (data.get(1), data.get(2)) {
                (Some(&reg), Some(&value)) => {
                    let readback = self.write_register(self.ctx.page_select, reg, value);
                    self.reply(ProtocolType::RwResponse, &[reg, readback]);
                    true
                }
                _ => false,
            },
            ProtocolType::IncrementRegister | ProtocolType::DecrementRegister if addressed => {
                match data.get(1) {
                    Some(&reg) => {
                        let page = self.ctx.page_select;
                        let target = self.register_layout().resolve(page, reg);
                        let current = self.peek_target(target, page, reg);
                        let next = if kind == ProtocolType::IncrementRegister {
                            current.wrapping_add(1)
                        } else {
                            current.wrapping_sub(1)
                        };
                        let readback = self.write_register(page, reg, next);
                        self.reply(ProtocolType::RwResponse, &[reg, readback]);
                        true
                    }
                    None => false,
                }
            }
            ProtocolType::EnterBootLoader if addressed => {
                self.enter_boot_loader(data);
                true
            }
            ProtocolType::GuidDropNickname => self.guid_drop_frame(event.origin(), data),
            ProtocolType::PageRead if addressed => match (data.get(1), data.get(2)) {
                (Some(&offset), Some(&count)) => {
                    self.page_read(offset, usize::from(count));
                    true
                }
                _ => false,
            },
            ProtocolType::PageWrite if addressed && data.len() >= 3 => {
                let offset = data[1];
                let page = self.ctx.page_select;
                let readbacks = self.write_span(page, offset, &data[2..]);
                let mut frame = vec![0];
                frame.extend_from_slice(&readbacks);
                self.reply(ProtocolType::RwPageResponse, &frame);
                true
            }
            ProtocolType::WhoIsThere
                if data.first().is_some_and(|&target| {
                    target == nickname || target == NICKNAME_UNINITIALIZED
                }) =>
            {
                self.who_is_there();
                true
            }
            ProtocolType::GetDmInfo if addressed => {
                let [page_msb, page_lsb] = self.config.dm_page.to_be_bytes();
                let info = [
                    self.config.dm_rows,
                    0,
                    page_msb,
                    page_lsb,
                    page_msb,
                    page_lsb,
                    u8::try_from(ROW_LEN).unwrap_or(u8::MAX),
                ];
                self.reply(ProtocolType::DmInfoResponse, &info);
                true
            }
            ProtocolType::ExtendedPageRead if addressed => {
                match (read_be_u16(data, 1), data.get(3)) {
                    (Some(page), Some(&offset)) => {
                        let count = match data.get(4) {
                            None => 1,
                            Some(0) => PAGE_LEN,
                            Some(&count) => usize::from(count),
                        };
                        self.extended_page_read(page, offset, count);
                        true
                    }
                    _ => false,
                }
            }
            ProtocolType::ExtendedPageWrite if addressed && data.len() >= 5 => {
                match read_be_u16(data, 1) {
                    Some(page) => {
                        let offset = data[3];
                        let values = &data[4..data.len().min(4 + EXTENDED_FRAME_VALUES)];
                        let readbacks = self.write_span(page, offset, values);
                        let mut frame = vec![0, data[1], data[2], offset];
                        frame.extend_from_slice(&readbacks);
                        self.reply(ProtocolType::ExtendedPageResponse, &frame);
                        true
                    }
                    None => false,
                }
            }
            _ => false,
        };

        bump(&mut self.ctx.diagnostics.protocol_events);
        if handled {
            ProcessOutcome::Protocol(kind.as_u8())
        } else {
            ProcessOutcome::Ignored
        }
    }

    fn drop_nickname(&mut self, flags: u8, delay_s: u8) {
        let clear = flags & DROP_KEEP_NICKNAME == 0;
        let delayed = flags & (DROP_GO_IDLE | DROP_FACTORY_DEFAULTS) == 0 && delay_s > 0;
        // A delayed reset keeps answering on the old nickname until it fires.
        if clear && !delayed {
            self.set_nickname(NICKNAME_UNINITIALIZED);
        }
        if flags & DROP_GO_IDLE != 0 {
            self.enter_idle();
        } else if flags & DROP_FACTORY_DEFAULTS != 0 {
            info!("drop nickname with factory defaults");
            self.app.restore_factory_defaults();
            self.reset();
        } else if delay_s > 0 {
            debug!("reset in {delay_s} s");
            self.ctx.reset_pending = true;
            self.ctx.clear_nickname_on_reset = clear;
            self.start_general(u32::from(delay_s) * 1_000);
        } else {
            self.reset();
        }
    }

    fn enter_boot_loader(&mut self, data: &[u8]) {
        let (Some(&algorithm), Some(guid_tail)) = (data.get(1), data.get(2..2 + BOOT_GUID_BYTES))
        else {
            self.reply(ProtocolType::NackBootLoader, &[BOOT_NACK_MALFORMED]);
            return;
        };
        if algorithm == BOOT_LOADER_NONE || algorithm != self.config.boot_loader_algorithm {
            self.reply(ProtocolType::NackBootLoader, &[BOOT_NACK_ALGORITHM]);
            return;
        }
        let guid = self.guid();
        if guid[GUID_LEN - BOOT_GUID_BYTES..] != *guid_tail {
            self.reply(ProtocolType::NackBootLoader, &[BOOT_NACK_GUID]);
            return;
        }
        info!("handing control to boot loader algorithm {algorithm}");
        if let Some(bank) = self.ctx.timers.as_mut() {
            bank.stop_all(&mut self.timer_service);
        }
        self.app.on_bootloader_request(algorithm);
        self.ctx.state = NodeState::BootloaderHandoff;
    }

    fn guid_drop_frame(&mut self, origin: u8, data: &[u8]) -> bool {
        let Some((&index, chunk)) = data.split_first() else {
            return false;
        };
        let guid = self.guid();
        match self.ctx.sessions.accept(origin, index, chunk, &guid) {
            FrameOutcome::Progress(session) => {
                if let (Some(slot), Some(bank)) =
                    (TimerSlot::multi_frame(session), self.ctx.timers.as_mut())
                {
                    bank.start(
                        &mut self.timer_service,
                        slot,
                        self.config.multi_frame_timeout_ms,
                    );
                }
            }
            FrameOutcome::Complete(session) => {
                self.stop_session_timer(session);
                info!("guid drop nickname from {origin}");
                self.set_nickname(NICKNAME_UNINITIALIZED);
                self.reset();
            }
            FrameOutcome::Dropped(Some(session)) => {
                debug!("guid drop session {session} discarded");
                self.stop_session_timer(session);
            }
            FrameOutcome::Dropped(None) => return false,
        }
        true
    }

    fn stop_session_timer(&mut self, session: usize) {
        if let (Some(slot), Some(bank)) = (TimerSlot::multi_frame(session), self.ctx.timers.as_mut())
        {
            bank.stop(&mut self.timer_service, slot);
        }
    }

    fn read_span(&mut self, page: u16, offset: u8, count: usize) -> Vec<u8> {
        page_span(offset, count)
            .map(|(_, register)| self.read_register(page, register))
            .collect()
    }

    fn write_span(&mut self, page: u16, offset: u8, values: &[u8]) -> Vec<u8> {
        page_span(offset, values.len())
            .zip(values)
            .map(|((_, register), &value)| self.write_register(page, register, value))
            .collect()
    }

    fn page_read(&mut self, offset: u8, count: usize) {
        let values = self.read_span(self.ctx.page_select, offset, count);
        for (index, chunk) in frame_chunks(&values, FRAME_VALUES) {
            let mut frame = Vec::with_capacity(chunk.len() + 1);
            frame.push(index);
            frame.extend_from_slice(chunk);
            self.reply(ProtocolType::RwPageResponse, &frame);
        }
    }

    fn extended_page_read(&mut self, page: u16, offset: u8, count: usize) {
        let values = self.read_span(page, offset, count);
        let [page_msb, page_lsb] = page.to_be_bytes();
        for (index, chunk) in frame_chunks(&values, EXTENDED_FRAME_VALUES) {
            let first = usize::from(offset) + usize::from(index) * EXTENDED_FRAME_VALUES;
            let mut frame = vec![
                index,
                page_msb,
                page_lsb,
                u8::try_from(first).unwrap_or(u8::MAX),
            ];
            frame.extend_from_slice(chunk);
            self.reply(ProtocolType::ExtendedPageResponse, &frame);
        }
    }

    fn who_is_there(&mut self) {
        let mut identity = Vec::with_capacity(WHO_IS_THERE_FRAMES * FRAME_VALUES);
        identity.extend_from_slice(&self.guid());
        identity.extend_from_slice(&self.config.mdf_bytes());
        identity.resize(WHO_IS_THERE_FRAMES * FRAME_VALUES, 0);
        debug_assert_eq!(GUID_LEN + MDF_URL_LEN + 1, identity.len());
        for (index, chunk) in frame_chunks(&identity, FRAME_VALUES) {
            let mut frame = Vec::with_capacity(FRAME_VALUES + 1);
            frame.push(index);
            frame.extend_from_slice(chunk);
            self.reply(ProtocolType::WhoIsThereResponse, &frame);
        }
    }
}
