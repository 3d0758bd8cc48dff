//! Integration tests for the double-buffer swap under load and for slot
//! containers driven by random sequences.

use ember_core::{DoubleBuffer, SlotContainer, SlotState};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// One frame: a batch id and the values produced for it.
#[derive(Default)]
struct Frame {
    batch: Vec<(u32, u32)>,
}

#[test]
fn test_swap_under_load_fast_producer_slow_consumer() {
    const FRAMES: u32 = 200;
    const PER_FRAME: u32 = 16;

    let frames = Arc::new(DoubleBuffer::new(Frame::default(), Frame::default()));

    let consumer = {
        let frames = Arc::clone(&frames);
        thread::spawn(move || {
            let mut seen = Vec::with_capacity(FRAMES as usize);
            for _ in 0..FRAMES {
                let batch = frames.wait_and_drain(|frame| {
                    // slow consumer
                    thread::sleep(Duration::from_micros(200));
                    std::mem::take(&mut frame.batch)
                });
                seen.push(batch);
            }
            seen
        })
    };

    for frame_id in 0..FRAMES {
        frames.with_producer(|frame| {
            for i in 0..PER_FRAME {
                frame.batch.push((frame_id, i));
            }
        });
        frames.swap_back_buffers(|_, _| {});
    }

    let seen = consumer.join().unwrap();
    assert_eq!(seen.len(), FRAMES as usize);

    for (frame_id, batch) in seen.iter().enumerate() {
        // never replayed, never interleaved
        assert_eq!(batch.len(), PER_FRAME as usize);
        for (i, &(id, value)) in batch.iter().enumerate() {
            assert_eq!(id, frame_id as u32);
            assert_eq!(value, i as u32);
        }
    }

    assert_eq!(frames.frames_swapped(), u64::from(FRAMES));
    assert_eq!(frames.frames_drained(), u64::from(FRAMES));
}

#[test]
fn test_slot_uniqueness_random_sequences() {
    const CAPACITY: usize = 32;

    let slots: SlotContainer<u64> = SlotContainer::new(CAPACITY);
    let mut rng = StdRng::seed_from_u64(0x5EED);
    let mut live: HashSet<usize> = HashSet::new();
    let mut next_handle = 1_u64;

    for _ in 0..5_000 {
        if rng.gen_bool(0.6) {
            match slots.create_slot() {
                Some(index) => {
                    // a handed-out index is never handed out twice
                    assert!(live.insert(index), "slot {index} reused while live");
                    assert!(slots.attach(index, next_handle, 4));
                    next_handle += 1;
                }
                None => assert_eq!(live.len(), CAPACITY),
            }
        } else if !live.is_empty() {
            let pick = rng.gen_range(0..live.len());
            let index = *live.iter().nth(pick).unwrap();
            assert!(slots.detach(index).is_some());
            live.remove(&index);
            assert_eq!(slots.state(index), Some(SlotState::Free));
        }

        assert_eq!(slots.occupied_count(), live.len());
        assert_eq!(slots.memory_usage(), live.len() as u64 * 4);
    }
}

#[test]
fn test_slot_concurrent_distinct_indices() {
    let slots: Arc<SlotContainer<u64>> = Arc::new(SlotContainer::new(8));
    let indices: Vec<usize> = (0..8).map(|_| slots.create_slot().unwrap()).collect();

    let handles: Vec<_> = indices
        .into_iter()
        .map(|index| {
            let slots = Arc::clone(&slots);
            thread::spawn(move || {
                for round in 0..100_u64 {
                    slots.replace(index, round, 1);
                    assert_eq!(slots.get(index), Some(round));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(slots.memory_usage(), 8);
}
