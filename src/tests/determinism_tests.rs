use super::{record_run, TallyProgram};
use crate::replay::{replay_from_initial, ReplayPolicy};
use crate::types::RequestDescriptor;
use alloc::format;
use std::vec::Vec;

/// A simple deterministic RNG for tests.
struct Pcg32 {
    state: u64,
    inc: u64,
}

impl Pcg32 {
    fn new(seed: u64) -> Self {
        Self { state: seed, inc: 1 }
    }

    fn next_u32(&mut self) -> u32 {
        let oldstate = self.state;
        self.state = oldstate.wrapping_mul(6364136223846793005).wrapping_add(self.inc);
        let xorshifted = (((oldstate >> 18) ^ oldstate) >> 27) as u32;
        let rot = (oldstate >> 59) as u32;
        xorshifted.rotate_right(rot)
    }
}

fn generate_requests(seed: u64, n: usize) -> Vec<RequestDescriptor> {
    let mut rng = Pcg32::new(seed);
    (0..n)
        .map(|_| {
            let key = format!("/k{}", rng.next_u32() % 5);
            if rng.next_u32() % 3 == 0 {
                RequestDescriptor::new("GET", key)
            } else {
                RequestDescriptor::new("POST", key).with_body(format!("{}", rng.next_u32()))
            }
        })
        .collect()
}

#[test]
fn test_replay_is_deterministic_across_runs() {
    for seed in [1u64, 7, 42, 1234] {
        let requests = generate_requests(seed, 200);
        let records = record_run(&requests);

        let (a, last_a) = replay_from_initial(&TallyProgram, &records, ReplayPolicy::default()).unwrap();
        let (b, last_b) = replay_from_initial(&TallyProgram, &records, ReplayPolicy::default()).unwrap();

        assert_eq!(last_a, 200);
        assert_eq!(last_a, last_b);
        assert_eq!(a, b, "seed {} diverged between replays", seed);
    }
}

#[test]
fn test_every_prefix_is_a_valid_recovery_point() {
    let requests = generate_requests(99, 50);
    let records = record_run(&requests);
    let (full, _) = replay_from_initial(&TallyProgram, &records, ReplayPolicy::default()).unwrap();

    for split in 0..records.len() {
        let (base, base_seq) =
            replay_from_initial(&TallyProgram, &records[..split], ReplayPolicy::default()).unwrap();
        let mut replay = crate::replay::Replay::new(&TallyProgram, base, base_seq, ReplayPolicy::default());
        for record in &records[split..] {
            replay.apply(record).unwrap();
        }
        assert_eq!(replay.state(), &full, "split at {} diverged", split);
    }
}
