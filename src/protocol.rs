//! Wire protocol between the controller and this peripheral.
//!
//! Framing is static: every inbound frame is [`INBOUND_FRAME_LEN`] bytes and every outbound
//! frame is [`OUTBOUND_FRAME_LEN`] bytes, independent of the bus carrying them.  Multi-byte
//! integers are little endian.
//!
//! Inbound frame (controller to peripheral):
//!
//! | Bytes    | Field          |
//! |----------|----------------|
//! | `0..4`   | `start_offset` |
//! | `4`      | `mask_offset` (match `mask_offset + 1` most significant bits) |
//! | `5..37`  | `target_hash`  |
//! | `37`     | reserved, ignored |
//! | `38`     | `puzzle_id`    |
//!
//! Outbound frame (peripheral to controller):
//!
//! | Bytes  | Field             |
//! |--------|-------------------|
//! | `0..4` | `offset_solution` |
//! | `4`    | `puzzle_id`       |
//!
//! There is no error frame.  The controller must compare the `puzzle_id` of a solution with the
//! id of the puzzle it is waiting for.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

/// Length of a SHA-256 digest
pub const HASH_LEN: usize = 32;

/// Length of an inbound (puzzle) frame
pub const INBOUND_FRAME_LEN: usize = 39;

/// Length of an outbound (solution) frame
pub const OUTBOUND_FRAME_LEN: usize = 5;

/// Length of every SPI duplex transaction - one command byte plus an inbound frame
pub const SPI_TRANSACTION_LEN: usize = 1 + INBOUND_FRAME_LEN;

/// Default depth of the I2C receive queue
pub const DEFAULT_RX_QUEUE_DEPTH: usize = 10;

/// A raw inbound frame
pub type InboundFrame = [u8; INBOUND_FRAME_LEN];

/// A raw outbound frame
pub type OutboundFrame = [u8; OUTBOUND_FRAME_LEN];

/// A unit of search work submitted by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Puzzle {
    /// Identity tag, used to discard solutions to superseded puzzles
    pub puzzle_id: u8,

    /// First candidate offset to hash
    pub start_offset: u32,

    /// Reference digest
    pub target_hash: [u8; HASH_LEN],

    /// Number of most significant digest bits to match, minus one
    pub mask_offset: u8,
}

/// Puzzle frame offsets
impl Puzzle {
    pub const fn start_offset_pos() -> usize {
        0
    }

    pub const fn mask_offset_pos() -> usize {
        4
    }

    pub const fn target_hash_pos() -> usize {
        5
    }

    pub const fn reserved_pos() -> usize {
        Self::target_hash_pos() + HASH_LEN
    }

    pub const fn puzzle_id_pos() -> usize {
        INBOUND_FRAME_LEN - 1
    }
}

impl Puzzle {
    /// Create a puzzle matching `mask_bit_count` most significant bits, which must be in the
    /// range 1 to 256 inclusive.  Out of range counts are clamped.
    pub fn new(
        puzzle_id: u8,
        start_offset: u32,
        target_hash: [u8; HASH_LEN],
        mask_bit_count: u16,
    ) -> Self {
        let mask_offset = mask_bit_count.clamp(1, 256) - 1;
        Self {
            puzzle_id,
            start_offset,
            target_hash,
            mask_offset: mask_offset as u8,
        }
    }

    /// Number of most significant digest bits that must match, 1 to 256.
    pub fn mask_bit_count(&self) -> u16 {
        u16::from(self.mask_offset) + 1
    }

    /// Decode a puzzle from its wire frame.  Every byte pattern is a valid puzzle.
    pub fn from_frame(frame: &InboundFrame) -> Self {
        let start = Self::start_offset_pos();
        let hash = Self::target_hash_pos();

        let mut start_offset = [0u8; 4];
        start_offset.copy_from_slice(&frame[start..start + 4]);
        let mut target_hash = [0u8; HASH_LEN];
        target_hash.copy_from_slice(&frame[hash..hash + HASH_LEN]);

        Self {
            puzzle_id: frame[Self::puzzle_id_pos()],
            start_offset: u32::from_le_bytes(start_offset),
            target_hash,
            mask_offset: frame[Self::mask_offset_pos()],
        }
    }

    /// Encode this puzzle as a wire frame, as the controller would.  The reserved byte is zero.
    pub fn to_frame(&self) -> InboundFrame {
        let start = Self::start_offset_pos();
        let hash = Self::target_hash_pos();

        let mut frame = [0u8; INBOUND_FRAME_LEN];
        frame[start..start + 4].copy_from_slice(&self.start_offset.to_le_bytes());
        frame[Self::mask_offset_pos()] = self.mask_offset;
        frame[hash..hash + HASH_LEN].copy_from_slice(&self.target_hash);
        frame[Self::reserved_pos()] = 0;
        frame[Self::puzzle_id_pos()] = self.puzzle_id;
        frame
    }
}

/// The answer to one [`Puzzle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Solution {
    /// Id of the puzzle this solves
    pub puzzle_id: u8,

    /// First offset at or after the puzzle's start offset whose digest matches
    pub offset_solution: u32,
}

impl Solution {
    /// Encode as an outbound wire frame.
    pub fn to_frame(&self) -> OutboundFrame {
        let offset = self.offset_solution.to_le_bytes();
        [offset[0], offset[1], offset[2], offset[3], self.puzzle_id]
    }

    /// Decode an outbound wire frame, as the controller would.
    pub fn from_frame(frame: &OutboundFrame) -> Self {
        Self {
            puzzle_id: frame[4],
            offset_solution: u32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]),
        }
    }
}

/// Command byte leading every SPI transaction
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpiCommand {
    /// Controller is about to write a puzzle
    RequestWrite = 0x11,
    /// Transaction carries a puzzle frame
    DataWrite = 0x22,
    /// Controller is about to read - load the last published solution
    RequestRead = 0x33,
    /// Transaction clocked out the solution
    DataRead = 0x44,
}

impl TryFrom<u8> for SpiCommand {
    type Error = u8;

    fn try_from(value: u8) -> core::result::Result<Self, Self::Error> {
        match value {
            0x11 => Ok(SpiCommand::RequestWrite),
            0x22 => Ok(SpiCommand::DataWrite),
            0x33 => Ok(SpiCommand::RequestRead),
            0x44 => Ok(SpiCommand::DataRead),
            other => Err(other),
        }
    }
}
