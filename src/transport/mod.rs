//! Bus transport between the controller and this peripheral.
//!
//! [`Transport`] is the protocol-agnostic facade the rest of the crate uses.  Exactly one
//! driver implements it in a given firmware, chosen from [`crate::config::TransportConfig`] at
//! start-up:
//!
//! - [`i2c::I2cSlave`] - frames delivered by I2C target interrupt handlers
//! - [`spi::SpiSlave`] - frames delivered by a dedicated SPI transaction task
//!
//! No bus-specific type crosses the facade, so callers may hold a `&mut dyn Transport`.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

pub mod i2c;
pub mod spi;

pub use i2c::{I2cShared, I2cSlave};
pub use spi::{SpiLink, SpiSlave, SpiTransactionTask};

use alloc::boxed::Box;
use async_trait::async_trait;

use crate::protocol::{INBOUND_FRAME_LEN, OUTBOUND_FRAME_LEN};
use crate::{Error, Result};

/// Protocol-agnostic byte exchange with the controller.
#[async_trait(?Send)]
pub trait Transport {
    /// Register the hardware and prepare the driver for use.
    ///
    /// # Errors
    ///
    /// [`Error::Init`] if the configuration doesn't match the statically allocated resources,
    /// or the hardware cannot be registered.  There is no degraded mode - callers should
    /// treat this as fatal.
    fn init(&mut self) -> Result<()>;

    /// Publish an outbound frame for the controller to read.  Blocking.
    ///
    /// Loads `data` into the outbound buffer, then pulses the data ready line, then waits
    /// until the controller has read it.  The frame is complete in the outbound buffer before
    /// the line is raised.
    ///
    /// # Errors
    ///
    /// [`Error::FrameSize`] if `data` isn't exactly [`OUTBOUND_FRAME_LEN`] bytes, or a bus
    /// or signal error from the hardware.
    async fn set_data_to_be_read(&mut self, data: &[u8]) -> Result<()>;

    /// Take the oldest complete inbound frame, if there is one.  Non-blocking.
    ///
    /// Returns `Ok(true)` with `buf` filled if a frame was waiting, and `Ok(false)`, leaving
    /// `buf` untouched, if not.
    ///
    /// # Errors
    ///
    /// [`Error::FrameSize`] if `buf` isn't exactly [`INBOUND_FRAME_LEN`] bytes.  Framing is
    /// static, so this means the firmware and controller disagree on the protocol.
    fn receive_data(&mut self, buf: &mut [u8]) -> Result<bool>;
}

// Helper functions

fn check_inbound_len(len: usize) -> Result<()> {
    if len != INBOUND_FRAME_LEN {
        log::error!("Inbound buffer size {len} doesn't match frame size {INBOUND_FRAME_LEN}");
        Err(Error::FrameSize)
    } else {
        Ok(())
    }
}

fn check_outbound_len(len: usize) -> Result<()> {
    if len != OUTBOUND_FRAME_LEN {
        log::error!("Outbound buffer size {len} doesn't match frame size {OUTBOUND_FRAME_LEN}");
        Err(Error::FrameSize)
    } else {
        Ok(())
    }
}
