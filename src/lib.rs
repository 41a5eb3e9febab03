//! Bus peripheral core for answering partial SHA-256 preimage puzzles on behalf of an I2C or
//! SPI controller.
//!
//! The microcontroller running this crate is a bus target (slave).  A controller writes a
//! puzzle - a starting offset, a target digest and the number of most significant digest bits
//! that must match - and some time later reads back the first offset whose SHA-256 digest
//! matches the target to that precision.  A side-channel GPIO line is pulsed to tell the
//! controller that an answer is waiting to be read.
//!
//! `no_std`.  The `async` feature (default) requires `alloc` for the boxed futures of the
//! transport facade.
//!
//! ## Architecture
//!
//! Three execution contexts cooperate, connected only by bounded single-producer/single-consumer
//! channels carrying copies, never references:
//!
//! - **Interrupt context** - the bus hardware handlers ([`transport::i2c::I2cShared::on_receive`],
//!   [`transport::i2c::I2cShared::on_request`]) hand complete frames and "controller has read"
//!   events to task context without blocking.  On SPI the same role is played by a dedicated
//!   high priority [`transport::spi::SpiTransactionTask`].
//! - **Flow control** - [`flow::FlowControl`] drains puzzles from the transport, forwards them to
//!   the search engine and publishes solutions back, but only those tagged with the id of the
//!   puzzle currently outstanding.
//! - **Search engine** - [`search::futures::SearchEngine`] hashes candidate offsets, checking
//!   for a newer puzzle before every hash, so a new puzzle supersedes an in-flight search
//!   within one hash of latency.
//!
//! ```text
//!  controller -> ISR -> Transport -> FlowControl -> puzzles  -> SearchEngine
//!  controller <- ISR <- Transport <- FlowControl <- solutions <- SearchEngine
//! ```
//!
//! Data flowing through the channels is defined in [`protocol`].
//!
//! ## Supersession
//!
//! Only one puzzle is current at a time.  There is no cancellation primitive: a newer puzzle
//! overwrites the search parameters, and any solution for an older puzzle that was already
//! queued is dropped by [`flow::FlowControl`] because its `puzzle_id` no longer matches.  The
//! controller is never sent a stale answer.
//!
//! ## Getting Started
//!
//! **Firmware setup**:
//! 1. Build a [`config::Config`] for the board, and [`config::Config::validate()`] it
//! 2. Allocate the shared state statically - [`search::futures::EngineChannels`] and either
//!    [`transport::i2c::I2cShared`] or [`transport::spi::SpiLink`]
//! 3. Route the bus interrupts (I2C) to the `I2cShared` handlers, or spawn the
//!    [`transport::spi::SpiTransactionTask`] (SPI) at a priority above the rest of the system
//! 4. Create the driver implementing [`transport::Transport`] for the configured bus and call
//!    [`transport::Transport::init()`]
//! 5. Run [`flow::run_firmware()`], and pass any error it returns to [`abort()`]
//!
//! Without the `async` feature only [`protocol`], [`config`] and the synchronous
//! [`search::Search`] cursor are available, which is enough to drive the search from a bare
//! metal super-loop.
//!
//! ## Features
//!
//! Default features:
//! - `async` - Enable the transports, search engine task and flow control (requires `alloc`).

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

#![cfg_attr(not(test), no_std)]

#[cfg(feature = "async")]
extern crate alloc;

pub mod config;
#[cfg(feature = "async")]
pub mod flow;
#[cfg(feature = "async")]
pub mod io;
pub mod protocol;
pub mod search;
#[cfg(feature = "async")]
pub mod signal;
#[cfg(feature = "async")]
pub mod transport;

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

/// Peripheral errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Allocation, hardware registration or capacity mismatch during init
    Init,
    /// Driver used before it was initialized
    Uninit,
    /// Buffer length doesn't match the fixed frame size
    FrameSize,
    /// Error reported by the underlying bus driver
    Bus,
    /// Error driving the side-channel line
    Signal,
    /// Configuration rejected by validation
    InvalidConfig,
}

/// Type to represent the result of a peripheral operation
pub type Result<T> = core::result::Result<T, Error>;

/// Terminate the firmware after an unrecoverable error.
///
/// There is no degraded mode for a peripheral that has lost its communication path, or whose
/// framing no longer matches the controller's, so every error surfacing from the long-running
/// loops ends up here.  Firmware builds are expected to use `panic = "abort"`.
pub fn abort(err: Error) -> ! {
    error!("Fatal error {err:?}. Aborting!");
    panic!("fatal peripheral error: {err:?}");
}
