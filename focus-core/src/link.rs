//! Per-channel pseudo-random fragment masking.
//!
//! Grounded in `focus.link.mask_fragments`: XOR-ing a fragment with a
//! fixed pseudo-random byte sequence whitens its structure, which keeps
//! the peak-to-average ratio of the OFDM signal down and decorrelates
//! identical payloads across channels. The mask is its own inverse, so
//! the same function both masks and unmasks.
//!
//! The original seeds NumPy's legacy `RandomState` (Mersenne Twister)
//! with `39402 + channel_idx`. There is no Rust crate in this workspace
//! that reproduces that exact bit stream, so masks here are generated
//! with `ChaCha8Rng` seeded the same way. This is deterministic and
//! self-inverse like the original, but **not byte-compatible** with a
//! Python-side peer -- interop across the two implementations is out of
//! scope (see spec.md Non-goals).

use std::collections::HashMap;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use rand::RngCore;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;

const MASK_LEN: usize = 32768;
const SEED_BASE: u64 = 39402;

static MASKS: Lazy<Mutex<HashMap<usize, Vec<u8>>>> = Lazy::new(|| Mutex::new(HashMap::new()));

fn mask_for_channel(channel_idx: usize) -> Vec<u8> {
    let mut cache = MASKS.lock().expect("mask cache poisoned");
    cache
        .entry(channel_idx)
        .or_insert_with(|| {
            let mut rng = ChaCha8Rng::seed_from_u64(SEED_BASE + channel_idx as u64);
            let mut mask = vec![0u8; MASK_LEN];
            rng.fill_bytes(&mut mask);
            mask
        })
        .clone()
}

/// Applies the pseudo-random mask for `channel_idx` to `fragment` in
/// place. Calling this twice with the same channel is a no-op.
pub fn mask_fragment(fragment: &mut [u8], channel_idx: usize) {
    let mask = mask_for_channel(channel_idx);
    for (byte, &m) in fragment.iter_mut().zip(mask.iter()) {
        *byte ^= m;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masking_twice_is_identity() {
        let original = vec![1u8, 2, 3, 4, 5, 250, 255, 0];
        let mut copy = original.clone();
        mask_fragment(&mut copy, 0);
        mask_fragment(&mut copy, 0);
        assert_eq!(copy, original);
    }

    #[test]
    fn masking_actually_changes_data() {
        let mut data = vec![0u8; 64];
        mask_fragment(&mut data, 1);
        assert!(data.iter().any(|&b| b != 0));
    }

    #[test]
    fn different_channels_use_different_masks() {
        let mut a = vec![0u8; 64];
        let mut b = vec![0u8; 64];
        mask_fragment(&mut a, 0);
        mask_fragment(&mut b, 1);
        assert_ne!(a, b);
    }

    #[test]
    fn mask_is_deterministic_across_calls() {
        let mut a = vec![5u8; 16];
        let mut b = vec![5u8; 16];
        mask_fragment(&mut a, 7);
        mask_fragment(&mut b, 7);
        assert_eq!(a, b);
    }
}
