//! Multi-frame `GUID_DROP_NICKNAME` sessions.

use crate::persist::GUID_LEN;

/// Concurrent reassembly sessions.
pub const SESSION_COUNT: usize = 2;
/// Frames in one GUID drop sequence.
pub const GUID_DROP_FRAMES: u8 = 4;
/// GUID bytes carried per frame.
pub const GUID_CHUNK: usize = GUID_LEN / GUID_DROP_FRAMES as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Session {
    origin: u8,
    next_index: u8,
}

/// Effect of one frame on the session table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Frame accepted; the slot's timer must be (re)started.
    Progress(usize),
    /// Last frame matched; the slot is free again.
    Complete(usize),
    /// Frame rejected; `Some(slot)` when a session was discarded with it.
    Dropped(Option<usize>),
}

/// Two GUID drop sessions keyed by originating address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GuidDropSessions {
    sessions: [Option<Session>; SESSION_COUNT],
}

impl GuidDropSessions {
    /// Empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sessions: [None; SESSION_COUNT],
        }
    }

    fn slot_of(&self, origin: u8) -> Option<usize> {
        self.sessions
            .iter()
            .position(|session| session.is_some_and(|s| s.origin == origin))
    }

    /// Applies frame `[index, chunk...]` from `origin` against `guid`.
    pub fn accept(
        &mut self,
        origin: u8,
        index: u8,
        chunk: &[u8],
        guid: &[u8; GUID_LEN],
    ) -> FrameOutcome {
        let slot = if index == 0 {
            match self
                .slot_of(origin)
                .or_else(|| self.sessions.iter().position(Option::is_none))
            {
                Some(slot) => {
                    self.sessions[slot] = Some(Session {
                        origin,
                        next_index: 0,
                    });
                    slot
                }
                None => return FrameOutcome::Dropped(None),
            }
        } else {
            match self.slot_of(origin) {
                Some(slot) => slot,
                None => return FrameOutcome::Dropped(None),
            }
        };

        let Some(session) = self.sessions[slot] else {
            return FrameOutcome::Dropped(None);
        };
        let start = usize::from(index) * GUID_CHUNK;
        let expected = guid.get(start..start + GUID_CHUNK);
        if index != session.next_index || expected != Some(chunk) {
            self.sessions[slot] = None;
            return FrameOutcome::Dropped(Some(slot));
        }
        if index + 1 == GUID_DROP_FRAMES {
            self.sessions[slot] = None;
            return FrameOutcome::Complete(slot);
        }
        self.sessions[slot] = Some(Session {
            origin,
            next_index: index + 1,
        });
        FrameOutcome::Progress(slot)
    }

    /// Drops the session in `slot` after its timer expired.
    pub fn expire(&mut self, slot: usize) -> bool {
        self.sessions
            .get_mut(slot)
            .and_then(Option::take)
            .is_some()
    }

    /// `true` when `slot` holds a session.
    #[must_use]
    pub fn is_open(&self, slot: usize) -> bool {
        self.sessions.get(slot).is_some_and(Option::is_some)
    }

    /// Drops every session.
    pub fn clear(&mut self) {
        self.sessions = [None; SESSION_COUNT];
    }
}
