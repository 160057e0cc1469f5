use std::collections::VecDeque;

use crate::output::VoiceSlot;

/// Free voice slots, reused in the order they were released
#[derive(Debug, Clone)]
pub struct VoicePool {
    free: VecDeque<VoiceSlot>,
    total: usize,
}

impl VoicePool {
    /// A pool of `total` slots, all free
    pub fn new(total: usize) -> Self {
        let total = total.min(usize::from(u16::MAX) + 1);
        Self {
            free: (0..total).map(|i| VoiceSlot::new(i as u16)).collect(),
            total,
        }
    }

    /// Take the oldest free slot
    pub fn acquire(&mut self) -> Option<VoiceSlot> {
        self.free.pop_front()
    }

    /// Return a slot to the back of the queue
    pub fn release(&mut self, slot: VoiceSlot) {
        debug_assert!(!self.free.contains(&slot), "voice slot {slot} released twice");
        self.free.push_back(slot);
    }

    /// Slots ready to be handed out
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Slots in the pool, free or not
    pub fn total(&self) -> usize {
        self.total
    }

    /// Every slot the pool manages
    pub fn slots(&self) -> impl Iterator<Item = VoiceSlot> + use<> {
        (0..self.total).map(|i| VoiceSlot::new(i as u16))
    }
}
