//! # Slot Container
//!
//! Fixed-capacity store mapping a small integer index to a native handle.
//!
//! Each slot walks through `Free → Reserved → Ready(handle) → Free`. The
//! producer thread reserves a slot and requests creation; the render thread
//! attaches the real handle and later detaches it. The slot array is sized
//! once and never reallocated, so an index handed out to one thread stays
//! valid while the other thread works on a different index.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lifecycle state of a single slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotState<H> {
    /// Available for `create_slot`.
    Free,
    /// Claimed, payload creation in flight.
    Reserved,
    /// Holds a live native handle.
    Ready(H),
}

#[derive(Debug)]
struct SlotEntry<H> {
    state: SlotState<H>,
    usage: u64,
}

/// A fixed-capacity slot container.
///
/// # Thread Safety
///
/// Every slot has its own lock, so operations on distinct indices never
/// contend. The usage counter is atomic.
///
/// # Example
///
/// ```rust,ignore
/// let texts: SlotContainer<TextureId> = SlotContainer::new(64);
///
/// // update thread
/// let index = texts.create_slot().ok_or(Full)?;
///
/// // render thread
/// texts.attach(index, texture, width * height * 4);
/// let texture = texts.get(index);
/// texts.detach(index);
/// ```
#[derive(Debug)]
pub struct SlotContainer<H> {
    /// The slots. Length is fixed at construction.
    slots: Box<[Mutex<SlotEntry<H>>]>,
    /// Sum of the usage of every ready slot, in bytes.
    memory_usage: AtomicU64,
}

impl<H: Copy> SlotContainer<H> {
    /// Creates a container with `capacity` free slots.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");

        let slots: Vec<Mutex<SlotEntry<H>>> = (0..capacity)
            .map(|_| {
                Mutex::new(SlotEntry {
                    state: SlotState::Free,
                    usage: 0,
                })
            })
            .collect();

        Self {
            slots: slots.into_boxed_slice(),
            memory_usage: AtomicU64::new(0),
        }
    }

    /// Returns the total number of slots.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the summed byte usage of all ready slots.
    #[inline]
    #[must_use]
    pub fn memory_usage(&self) -> u64 {
        self.memory_usage.load(Ordering::Acquire)
    }

    /// Claims the first free slot and marks it reserved.
    ///
    /// Returns `None` when every slot is reserved or ready. The container
    /// never grows.
    pub fn create_slot(&self) -> Option<usize> {
        for (index, slot) in self.slots.iter().enumerate() {
            let mut entry = slot.lock();
            if matches!(entry.state, SlotState::Free) {
                entry.state = SlotState::Reserved;
                return Some(index);
            }
        }
        None
    }

    /// Stores a created handle into a reserved slot.
    ///
    /// Returns false if the index is out of range or the slot was not
    /// reserved; nothing is changed in that case.
    pub fn attach(&self, index: usize, handle: H, usage: u64) -> bool {
        let Some(slot) = self.slots.get(index) else {
            return false;
        };

        let mut entry = slot.lock();
        if !matches!(entry.state, SlotState::Reserved) {
            return false;
        }

        entry.state = SlotState::Ready(handle);
        entry.usage = usage;
        self.memory_usage.fetch_add(usage, Ordering::AcqRel);
        true
    }

    /// Swaps the handle of a ready (or reserved) slot for a new one.
    ///
    /// Returns the previous handle if the slot was ready. Used when a
    /// resource is recreated in place under the same index.
    pub fn replace(&self, index: usize, handle: H, usage: u64) -> Option<H> {
        let slot = self.slots.get(index)?;
        let mut entry = slot.lock();

        let previous = match entry.state {
            SlotState::Ready(old) => Some(old),
            SlotState::Reserved => None,
            SlotState::Free => return None,
        };

        self.memory_usage.fetch_sub(entry.usage, Ordering::AcqRel);
        entry.state = SlotState::Ready(handle);
        entry.usage = usage;
        self.memory_usage.fetch_add(usage, Ordering::AcqRel);
        previous
    }

    /// Returns the handle of a ready slot.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<H> {
        match self.slots.get(index)?.lock().state {
            SlotState::Ready(handle) => Some(handle),
            _ => None,
        }
    }

    /// Returns the lifecycle state of a slot.
    #[must_use]
    pub fn state(&self, index: usize) -> Option<SlotState<H>> {
        Some(self.slots.get(index)?.lock().state)
    }

    /// Frees a slot and subtracts its usage, returning the handle if it was ready.
    ///
    /// The native resource itself is NOT destroyed; that is the caller's job.
    pub fn detach(&self, index: usize) -> Option<H> {
        let slot = self.slots.get(index)?;
        let mut entry = slot.lock();

        let previous = match entry.state {
            SlotState::Ready(handle) => Some(handle),
            _ => None,
        };

        self.memory_usage.fetch_sub(entry.usage, Ordering::AcqRel);
        entry.state = SlotState::Free;
        entry.usage = 0;
        previous
    }

    /// Returns the number of slots that are reserved or ready.
    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| !matches!(slot.lock().state, SlotState::Free))
            .count()
    }

    /// Frees every slot, returning the handles that were ready.
    ///
    /// Reserved slots are released without a handle.
    pub fn drain_ready(&self) -> Vec<(usize, H)> {
        let mut handles = Vec::new();
        for (index, slot) in self.slots.iter().enumerate() {
            let mut entry = slot.lock();
            if let SlotState::Ready(handle) = entry.state {
                handles.push((index, handle));
            }
            entry.state = SlotState::Free;
            entry.usage = 0;
        }
        self.memory_usage.store(0, Ordering::Release);
        handles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_lifecycle() {
        let slots: SlotContainer<u32> = SlotContainer::new(4);

        let index = slots.create_slot().unwrap();
        assert_eq!(slots.state(index), Some(SlotState::Reserved));
        assert_eq!(slots.get(index), None);

        assert!(slots.attach(index, 77, 400));
        assert_eq!(slots.get(index), Some(77));
        assert_eq!(slots.memory_usage(), 400);

        assert_eq!(slots.detach(index), Some(77));
        assert_eq!(slots.state(index), Some(SlotState::Free));
        assert_eq!(slots.memory_usage(), 0);
    }

    #[test]
    fn test_slot_capacity_boundary() {
        let slots: SlotContainer<u32> = SlotContainer::new(3);

        let first: Vec<usize> = (0..3).map(|_| slots.create_slot().unwrap()).collect();
        for (i, &index) in first.iter().enumerate() {
            assert!(slots.attach(index, i as u32 * 10, 8));
        }

        // N + 1
        assert!(slots.create_slot().is_none());

        for (i, &index) in first.iter().enumerate() {
            assert_eq!(slots.get(index), Some(i as u32 * 10));
        }
        assert_eq!(slots.memory_usage(), 24);
    }

    #[test]
    fn test_slot_reuse_after_detach() {
        let slots: SlotContainer<u32> = SlotContainer::new(1);

        let a = slots.create_slot().unwrap();
        slots.attach(a, 1, 0);
        assert!(slots.create_slot().is_none());

        slots.detach(a);
        let b = slots.create_slot().unwrap();
        assert_eq!(a, b); // Same slot reused
    }

    #[test]
    fn test_attach_requires_reservation() {
        let slots: SlotContainer<u32> = SlotContainer::new(2);

        assert!(!slots.attach(0, 5, 10));
        assert!(!slots.attach(9, 5, 10));

        let index = slots.create_slot().unwrap();
        assert!(slots.attach(index, 5, 10));
        // already ready
        assert!(!slots.attach(index, 6, 10));
        assert_eq!(slots.get(index), Some(5));
    }

    #[test]
    fn test_replace_keeps_accounting() {
        let slots: SlotContainer<u32> = SlotContainer::new(2);
        let index = slots.create_slot().unwrap();
        slots.attach(index, 1, 100);

        assert_eq!(slots.replace(index, 2, 40), Some(1));
        assert_eq!(slots.get(index), Some(2));
        assert_eq!(slots.memory_usage(), 40);

        assert_eq!(slots.replace(1, 3, 5), None);
        assert_eq!(slots.state(1), Some(SlotState::Free));
    }

    #[test]
    fn test_drain_ready() {
        let slots: SlotContainer<u32> = SlotContainer::new(3);
        let a = slots.create_slot().unwrap();
        let _reserved = slots.create_slot().unwrap();
        slots.attach(a, 9, 12);

        let drained = slots.drain_ready();
        assert_eq!(drained, vec![(a, 9)]);
        assert_eq!(slots.occupied_count(), 0);
        assert_eq!(slots.memory_usage(), 0);
    }
}
