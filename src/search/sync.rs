//! Synchronous search cursor - one hash per step, no executor required.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::protocol::{HASH_LEN, Puzzle, Solution};
use crate::search::{Mask, digest};

/// Outcome of hashing one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Candidate didn't match, cursor advanced
    Continue,
    /// Candidate matched
    Found(Solution),
    /// Every offset up to `u32::MAX` has been tried without a match
    Exhausted,
}

/// Live search over a single puzzle.
///
/// Offsets are visited in increasing order from the puzzle's start offset, so the first
/// [`Step::Found`] is the lowest matching offset.  The cursor never wraps - a solution is
/// always at or after the start offset.
#[derive(Debug, Clone)]
pub struct Search {
    puzzle_id: u8,
    target_hash: [u8; HASH_LEN],
    mask: Mask,
    current_offset: u32,
    exhausted: bool,
}

impl Search {
    /// Start searching `puzzle` from its start offset.
    pub fn new(puzzle: &Puzzle) -> Self {
        Self {
            puzzle_id: puzzle.puzzle_id,
            target_hash: puzzle.target_hash,
            mask: Mask::from_bit_count(puzzle.mask_bit_count()),
            current_offset: puzzle.start_offset,
            exhausted: false,
        }
    }

    pub fn puzzle_id(&self) -> u8 {
        self.puzzle_id
    }

    /// Next offset to be hashed
    pub fn current_offset(&self) -> u32 {
        self.current_offset
    }

    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    /// Hash the current offset, advancing past it if it doesn't match.
    ///
    /// Once a solution has been found, further calls return it again without hashing.
    pub fn step(&mut self) -> Step {
        if self.exhausted {
            return Step::Exhausted;
        }

        let hash = digest(self.current_offset);
        if self.mask.matches(&hash, &self.target_hash) {
            return Step::Found(Solution {
                puzzle_id: self.puzzle_id,
                offset_solution: self.current_offset,
            });
        }

        match self.current_offset.checked_add(1) {
            Some(next) => self.current_offset = next,
            None => self.exhausted = true,
        }
        Step::Continue
    }

    /// Step at most `max_hashes` times, stopping early on a match or exhaustion.
    pub fn run_for(&mut self, max_hashes: u32) -> Step {
        for _ in 0..max_hashes {
            match self.step() {
                Step::Continue => {}
                done => return done,
            }
        }
        if self.exhausted {
            Step::Exhausted
        } else {
            Step::Continue
        }
    }
}
