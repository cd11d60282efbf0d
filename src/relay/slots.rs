//! Pending-action queue: one atomic slot per registered relay.
//!
//! Each slot packs a status tag and the requested action into one `AtomicU8`
//! so every transition is a single atomic operation.  No lock is shared
//! between the relay task, the timer context, and the zero-cross ISR.
//!
//! ```text
//!   bit  7..4   3..2   1..0
//!       ┌──────┬──────┬──────┐
//!       │  0   │ tag  │action│
//!       └──────┴──────┴──────┘
//!   tag: 0 = Idle, 1 = Pending, 2 = Completed, 3 = Failed
//! ```
//!
//! Transitions and their owners:
//!
//! | From               | To          | Who                        |
//! |--------------------|-------------|----------------------------|
//! | any                | Pending     | intake (`upsert`)          |
//! | Idle / Failed      | Pending     | timeout monitor            |
//! | Pending            | Completed   | edge scheduler only        |
//! | Pending            | Failed      | edge scheduler, watchdog   |
//! | Completed / Failed | Idle        | dispatcher (`take_finished`) |

use core::sync::atomic::{AtomicU8, Ordering};

use super::actuator::RelayAction;

const TAG_SHIFT: u8 = 2;
const ACTION_MASK: u8 = 0b11;

const TAG_IDLE: u8 = 0;
const TAG_PENDING: u8 = 1;
const TAG_COMPLETED: u8 = 2;
const TAG_FAILED: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    Idle,
    Pending(RelayAction),
    Completed(RelayAction),
    Failed(RelayAction),
}

impl SlotStatus {
    const fn encode(self) -> u8 {
        match self {
            Self::Idle => TAG_IDLE << TAG_SHIFT,
            Self::Pending(a) => (TAG_PENDING << TAG_SHIFT) | a as u8,
            Self::Completed(a) => (TAG_COMPLETED << TAG_SHIFT) | a as u8,
            Self::Failed(a) => (TAG_FAILED << TAG_SHIFT) | a as u8,
        }
    }

    const fn decode(raw: u8) -> Self {
        let action = match RelayAction::from_u8(raw & ACTION_MASK) {
            Some(a) => a,
            None => return Self::Idle,
        };
        match raw >> TAG_SHIFT {
            TAG_PENDING => Self::Pending(action),
            TAG_COMPLETED => Self::Completed(action),
            TAG_FAILED => Self::Failed(action),
            _ => Self::Idle,
        }
    }

    pub fn is_pending(self) -> bool {
        matches!(self, Self::Pending(_))
    }

    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed(_))
    }
}

pub struct ActionSlots<const N: usize> {
    slots: [AtomicU8; N],
}

impl<const N: usize> Default for ActionSlots<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ActionSlots<N> {
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| AtomicU8::new(SlotStatus::Idle.encode())),
        }
    }

    pub fn status(&self, idx: usize) -> SlotStatus {
        SlotStatus::decode(self.slots[idx].load(Ordering::Acquire))
    }

    /// Request `action` for a relay, last-write-wins.  Returns what the slot
    /// held before, so the caller can report a completion it overwrote.
    pub fn upsert(&self, idx: usize, action: RelayAction) -> SlotStatus {
        let prev = self.slots[idx].swap(SlotStatus::Pending(action).encode(), Ordering::AcqRel);
        SlotStatus::decode(prev)
    }

    /// Request `action` only if the slot holds no outstanding or
    /// undelivered work.  Used by the timeout monitor, which must never
    /// override an explicit request.
    pub fn request_if_free(&self, idx: usize, action: RelayAction) -> bool {
        let slot = &self.slots[idx];
        let mut current = slot.load(Ordering::Acquire);
        loop {
            if SlotStatus::decode(current) != SlotStatus::Idle {
                return false;
            }
            match slot.compare_exchange_weak(
                current,
                SlotStatus::Pending(action).encode(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// `Pending(action) → Completed(action)`.  Fails if the slot was
    /// rewritten while the action was being applied; the newer request then
    /// stays pending for a later edge.
    pub fn complete(&self, idx: usize, action: RelayAction) -> bool {
        self.transition(idx, SlotStatus::Pending(action), SlotStatus::Completed(action))
    }

    /// `Pending(action) → Failed(action)`.
    pub fn fail(&self, idx: usize, action: RelayAction) -> bool {
        self.transition(idx, SlotStatus::Pending(action), SlotStatus::Failed(action))
    }

    /// Reset a completed or failed slot to `Idle` and return what it held.
    pub fn take_finished(&self, idx: usize) -> Option<SlotStatus> {
        let slot = &self.slots[idx];
        let current = slot.load(Ordering::Acquire);
        let status = SlotStatus::decode(current);
        if !status.is_finished() {
            return None;
        }
        slot.compare_exchange(current, SlotStatus::Idle.encode(), Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| status)
    }

    /// First pending slot at or after `from`.
    pub fn next_pending(&self, from: usize) -> Option<usize> {
        (from..N).find(|&i| self.status(i).is_pending())
    }

    pub fn any_pending(&self) -> bool {
        self.next_pending(0).is_some()
    }

    /// First pending slot after `current`, wrapping round to the start,
    /// with `current` itself checked last.  `None` starts at slot 0.
    pub fn next_pending_after(&self, current: Option<usize>) -> Option<usize> {
        match current {
            None => self.next_pending(0),
            Some(c) => self
                .next_pending(c + 1)
                .or_else(|| (0..=c.min(N.saturating_sub(1))).find(|&i| self.status(i).is_pending())),
        }
    }

    /// Mark every pending slot failed.  `before` runs for each slot just
    /// ahead of its transition so the caller can record a cause the
    /// dispatcher will see together with the `Failed` tag.
    /// Returns how many slots were flushed.
    pub fn fail_all_pending(&self, mut before: impl FnMut(usize)) -> usize {
        let mut flushed = 0;
        for idx in 0..N {
            if let SlotStatus::Pending(action) = self.status(idx) {
                before(idx);
                if self.fail(idx, action) {
                    flushed += 1;
                }
            }
        }
        flushed
    }

    fn transition(&self, idx: usize, from: SlotStatus, to: SlotStatus) -> bool {
        self.slots[idx]
            .compare_exchange(from.encode(), to.encode(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
