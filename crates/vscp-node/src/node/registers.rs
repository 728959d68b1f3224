use log::{debug, info};

use super::Node;
use crate::api::{Application, PersistentStore, TimerService, Transport};
use crate::config::RESTORE_DEFAULTS_WINDOW_MS;
use crate::persist::{ADDR_GUID, ADDR_NICKNAME, ADDR_NODE_CONTROL, ADDR_USER_ID};
use crate::register::{
    be_byte, RegisterTarget, StandardRegister, StandardSlot, BUFFER_SIZE, RESTORE_DEFAULTS_ARM,
    RESTORE_DEFAULTS_CONFIRM, VSCP_VERSION_MAJOR, VSCP_VERSION_MINOR,
};

impl<S, T, M, A> Node<S, T, M, A>
where
    S: PersistentStore,
    T: Transport,
    M: TimerService,
    A: Application,
{
    /// Reads one register. Reading the alarm status register clears it.
    pub fn read_register(&mut self, page: u16, offset: u8) -> u8 {
        let target = self.register_layout().resolve(page, offset);
        let value = self.peek_target(target, page, offset);
        if let RegisterTarget::Standard(StandardSlot {
            register: StandardRegister::AlarmStatus,
            ..
        }) = target
        {
            self.ctx.alarm = 0;
        }
        value
    }

    /// Writes one register and returns its read-back.
    ///
    /// Read-only registers ignore the write. The read-back never clears the
    /// alarm status.
    pub fn write_register(&mut self, page: u16, offset: u8, value: u8) -> u8 {
        let target = self.register_layout().resolve(page, offset);
        match target {
            RegisterTarget::Standard(slot) if slot.access.writable() => {
                self.write_standard(slot, value);
            }
            RegisterTarget::Standard(_) | RegisterTarget::Unmapped => {}
            RegisterTarget::DecisionMatrix(index) => {
                let addr = self.layout.dm_row(0) + u16::from(index);
                self.store.write8(addr, value);
            }
            RegisterTarget::DmNg(index) => {
                let addr = self.layout.dmng_base() + u16::from(index);
                self.store.write8(addr, value);
            }
            RegisterTarget::Application => {
                return self.app.write_app_register(page, offset, value);
            }
        }
        self.peek_target(target, page, offset)
    }

    pub(super) fn peek_target(&mut self, target: RegisterTarget, page: u16, offset: u8) -> u8 {
        match target {
            RegisterTarget::Standard(slot) => self.peek_standard(slot),
            RegisterTarget::DecisionMatrix(index) => {
                self.store.read8(self.layout.dm_row(0) + u16::from(index))
            }
            RegisterTarget::DmNg(index) => {
                self.store.read8(self.layout.dmng_base() + u16::from(index))
            }
            RegisterTarget::Application => self.app.read_app_register(page, offset),
            RegisterTarget::Unmapped => 0,
        }
    }

    fn peek_standard(&mut self, slot: StandardSlot) -> u8 {
        let index = slot.index;
        let [page_msb, page_lsb] = self.ctx.page_select.to_be_bytes();
        match slot.register {
            StandardRegister::AlarmStatus => self.ctx.alarm,
            StandardRegister::VersionMajor => VSCP_VERSION_MAJOR,
            StandardRegister::VersionMinor => VSCP_VERSION_MINOR,
            StandardRegister::NodeControl => self.store.read8(ADDR_NODE_CONTROL),
            StandardRegister::UserId => self.store.read8(ADDR_USER_ID + u16::from(index)),
            StandardRegister::ManufacturerDeviceId => {
                be_byte(self.config.manufacturer_device_id, 4, index)
            }
            StandardRegister::ManufacturerSubDeviceId => {
                be_byte(self.config.manufacturer_sub_device_id, 4, index)
            }
            StandardRegister::Nickname => self.store.read8(ADDR_NICKNAME),
            StandardRegister::PageSelectMsb => page_msb,
            StandardRegister::PageSelectLsb => page_lsb,
            StandardRegister::FirmwareMajor => self.config.firmware_major,
            StandardRegister::FirmwareMinor => self.config.firmware_minor,
            StandardRegister::FirmwareSubMinor => self.config.firmware_sub_minor,
            StandardRegister::BootLoaderAlgorithm => self.config.boot_loader_algorithm,
            StandardRegister::BufferSize => BUFFER_SIZE,
            StandardRegister::PagesUsed => self.config.pages_used,
            StandardRegister::FamilyCode => be_byte(self.config.family_code, 4, index),
            StandardRegister::DeviceType => be_byte(self.config.device_type, 4, index),
            StandardRegister::FirmwareDeviceCode => {
                be_byte(u32::from(self.config.firmware_device_code), 2, index)
            }
            StandardRegister::RestoreDefaults | StandardRegister::Reserved => 0,
            StandardRegister::Guid => self.store.read8(ADDR_GUID + u16::from(index)),
            StandardRegister::MdfUrl => self
                .config
                .mdf_bytes()
                .get(usize::from(index))
                .copied()
                .unwrap_or(0),
        }
    }

    fn write_standard(&mut self, slot: StandardSlot, value: u8) {
        match slot.register {
            StandardRegister::NodeControl => self.store.write8(ADDR_NODE_CONTROL, value),
            StandardRegister::UserId => {
                self.store.write8(ADDR_USER_ID + u16::from(slot.index), value);
            }
            StandardRegister::PageSelectMsb => {
                self.ctx.page_select = (self.ctx.page_select & 0x00FF) | (u16::from(value) << 8);
            }
            StandardRegister::PageSelectLsb => {
                self.ctx.page_select = (self.ctx.page_select & 0xFF00) | u16::from(value);
            }
            StandardRegister::RestoreDefaults => self.restore_sequence(value),
            _ => {}
        }
    }

    fn restore_sequence(&mut self, value: u8) {
        let now = self.ctx.uptime_ms;
        match (value, self.ctx.restore_armed_at.take()) {
            (RESTORE_DEFAULTS_ARM, _) => {
                debug!("restore defaults armed");
                self.ctx.restore_armed_at = Some(now);
            }
            (RESTORE_DEFAULTS_CONFIRM, Some(armed))
                if now.saturating_sub(armed) <= u64::from(RESTORE_DEFAULTS_WINDOW_MS) =>
            {
                info!("restoring factory defaults");
                self.app.restore_factory_defaults();
            }
            _ => {}
        }
    }
}
