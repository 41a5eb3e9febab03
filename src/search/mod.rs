//! Partial preimage search.
//!
//! A puzzle asks for the first offset, counting up from its start offset, whose SHA-256 digest
//! agrees with a target digest on the `mask_bit_count` most significant bits.  The candidate
//! message is the 4-byte little endian encoding of the offset.
//!
//! - [`Mask`] - precomputed split of a bit count into whole bytes and a partial byte
//! - [`Search`] - synchronous cursor over one puzzle, stepped one hash at a time
//! - [`futures::SearchEngine`] - the background task that owns a cursor and supersedes it
//!   whenever a newer puzzle arrives

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

#[cfg(feature = "async")]
pub mod futures;
pub mod sync;

#[cfg(feature = "async")]
pub use futures::{EngineChannels, SearchEngine};
pub use sync::{Search, Step};

use sha2::{Digest, Sha256};

use crate::protocol::HASH_LEN;

/// Digest of a candidate offset.
pub fn digest(offset: u32) -> [u8; HASH_LEN] {
    Sha256::digest(offset.to_le_bytes()).into()
}

/// Comparison parameters derived from a mask bit count.
///
/// The most significant `full_bytes` bytes must match exactly.  If the bit count isn't a
/// multiple of 8, the following byte is compared under `remaining_bits_mask`, which keeps the
/// `remaining_bits` most significant bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mask {
    full_bytes: usize,
    remaining_bits: u8,
    remaining_bits_mask: u8,
}

impl Mask {
    /// Derive from the number of bits to match, 1 to 256.  Larger counts are treated as 256.
    pub fn from_bit_count(bit_count: u16) -> Self {
        let bit_count = usize::from(bit_count).min(HASH_LEN * 8);
        let full_bytes = bit_count / 8;
        let remaining_bits = (bit_count % 8) as u8;
        let remaining_bits_mask = if remaining_bits == 0 {
            0
        } else {
            0xFFu8 << (8 - remaining_bits)
        };

        Self {
            full_bytes,
            remaining_bits,
            remaining_bits_mask,
        }
    }

    pub fn full_bytes(&self) -> usize {
        self.full_bytes
    }

    pub fn remaining_bits(&self) -> u8 {
        self.remaining_bits
    }

    pub fn remaining_bits_mask(&self) -> u8 {
        self.remaining_bits_mask
    }

    /// Whether `hash` and `target` agree on the masked bits.
    ///
    /// An empty whole-byte span or an empty partial byte compares equal.
    pub fn matches(&self, hash: &[u8; HASH_LEN], target: &[u8; HASH_LEN]) -> bool {
        let full = self.full_bytes;
        if hash[..full] != target[..full] {
            return false;
        }

        if self.remaining_bits > 0 {
            let mask = self.remaining_bits_mask;
            return (hash[full] & mask) == (target[full] & mask);
        }

        true
    }
}
