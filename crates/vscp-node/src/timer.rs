//! Logical timer slots used by the node and a software timer service.

use crate::api::TimerService;

/// Handle to a slot allocated from a [`TimerService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TimerId(pub u8);

/// Number of logical timers the node allocates at start-up.
pub const NODE_TIMER_COUNT: usize = 4;

/// Purpose of each timer the node owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerSlot {
    /// Nickname discovery timeout and deferred reset.
    General,
    /// First multi-frame reassembly session.
    MultiFrame1,
    /// Second multi-frame reassembly session.
    MultiFrame2,
    /// Node heartbeat period.
    Heartbeat,
}

impl TimerSlot {
    /// Slots in allocation order.
    pub const ALL: [Self; NODE_TIMER_COUNT] = [
        Self::General,
        Self::MultiFrame1,
        Self::MultiFrame2,
        Self::Heartbeat,
    ];

    /// Array index of this slot (`0..NODE_TIMER_COUNT`).
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Reassembly slot for session `n` (0 or 1).
    #[must_use]
    pub const fn multi_frame(n: usize) -> Option<Self> {
        match n {
            0 => Some(Self::MultiFrame1),
            1 => Some(Self::MultiFrame2),
            _ => None,
        }
    }
}

/// Timer ids the node holds, indexed by [`TimerSlot`], with expiry tracking.
///
/// A slot is "armed" from `start` until its expiry has been observed once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerBank {
    ids: [TimerId; NODE_TIMER_COUNT],
    armed: [bool; NODE_TIMER_COUNT],
}

impl TimerBank {
    /// Allocates one id per slot, or `None` when the service runs out.
    pub fn allocate(service: &mut dyn TimerService) -> Option<Self> {
        let mut ids = [TimerId(0); NODE_TIMER_COUNT];
        for slot in TimerSlot::ALL {
            ids[slot.index()] = service.create()?;
        }
        Some(Self {
            ids,
            armed: [false; NODE_TIMER_COUNT],
        })
    }

    /// Starts `slot`.
    pub fn start(&mut self, service: &mut dyn TimerService, slot: TimerSlot, timeout_ms: u32) {
        service.start(self.ids[slot.index()], timeout_ms);
        self.armed[slot.index()] = true;
    }

    /// Stops `slot` and forgets any pending expiry.
    pub fn stop(&mut self, service: &mut dyn TimerService, slot: TimerSlot) {
        service.stop(self.ids[slot.index()]);
        self.armed[slot.index()] = false;
    }

    /// Stops every slot.
    pub fn stop_all(&mut self, service: &mut dyn TimerService) {
        for slot in TimerSlot::ALL {
            self.stop(service, slot);
        }
    }

    /// `true` while `slot` has been started and not yet expired or stopped.
    #[must_use]
    pub fn is_armed(&self, slot: TimerSlot) -> bool {
        self.armed[slot.index()]
    }

    /// Reports and disarms a slot whose countdown has finished.
    pub fn take_expired(&mut self, service: &dyn TimerService, slot: TimerSlot) -> bool {
        let index = slot.index();
        if self.armed[index] && !service.is_running(self.ids[index]) {
            self.armed[index] = false;
            return true;
        }
        false
    }
}

/// Software timer service driven by [`TimerService::advance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftTimers {
    remaining: Vec<Option<u32>>,
    capacity: usize,
}

impl SoftTimers {
    /// Creates a service able to hand out `capacity` slots.
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self {
            remaining: Vec::new(),
            capacity,
        }
    }

    /// Milliseconds left on `id`, or `None` when idle or unknown.
    #[must_use]
    pub fn remaining_ms(&self, id: TimerId) -> Option<u32> {
        self.remaining.get(usize::from(id.0)).copied().flatten()
    }
}

impl Default for SoftTimers {
    fn default() -> Self {
        Self::new(NODE_TIMER_COUNT)
    }
}

impl TimerService for SoftTimers {
    fn create(&mut self) -> Option<TimerId> {
        if self.remaining.len() >= self.capacity {
            return None;
        }
        let id = u8::try_from(self.remaining.len()).ok()?;
        self.remaining.push(None);
        Some(TimerId(id))
    }

    fn start(&mut self, id: TimerId, timeout_ms: u32) {
        if let Some(slot) = self.remaining.get_mut(usize::from(id.0)) {
            *slot = Some(timeout_ms);
        }
    }

    fn stop(&mut self, id: TimerId) {
        if let Some(slot) = self.remaining.get_mut(usize::from(id.0)) {
            *slot = None;
        }
    }

    fn is_running(&self, id: TimerId) -> bool {
        self.remaining_ms(id).is_some_and(|ms| ms > 0)
    }

    fn advance(&mut self, elapsed_ms: u32) {
        for ms in self.remaining.iter_mut().flatten() {
            *ms = ms.saturating_sub(elapsed_ms);
        }
    }
}
