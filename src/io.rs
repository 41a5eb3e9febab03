//! Hardware traits for the bus peripherals and the side-channel line.
//!
//! `embedded-hal` covers controller-mode buses only, so the target-mode (slave) bus
//! peripherals this crate sits on are abstracted here.  Implementations wrap the MCU vendor's
//! HAL: register the peripheral, load transmit buffers and run duplex transfers.  Everything
//! above these traits is bus-agnostic.
//!
//! # Possible implementations
//!
//! - For firmware: the vendor HAL's I2C target driver or SPI target driver
//! - For host-side testing: in-memory fakes that record what was written and replay what a
//!   controller would send

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use alloc::boxed::Box;
use async_trait::async_trait;

use crate::Result;
use crate::config::{I2cConfig, SpiConfig};
use crate::protocol::SPI_TRANSACTION_LEN;

/// I2C target (slave) peripheral.
///
/// Inbound frames and controller read requests arrive by interrupt.  The implementation must
/// route them to [`crate::transport::i2c::I2cShared::on_receive()`] and
/// [`crate::transport::i2c::I2cShared::on_request()`] respectively.
pub trait I2cTarget {
    /// The error type returned by the bus driver.
    type Error: core::fmt::Debug;

    /// Configure the peripheral at the given address and pins and enable its interrupts.
    ///
    /// # Errors
    ///
    /// Returns an error if the peripheral or its interrupt handlers cannot be registered.
    fn register(&mut self, config: &I2cConfig) -> core::result::Result<(), Self::Error>;

    /// Load bytes into the transmit ring, to be clocked out on the controller's next read.
    ///
    /// # Arguments
    ///
    /// * `data` - Bytes to transmit
    /// * `timeout_ms` - Time allowed for space to become available in the ring
    ///
    /// Returns the number of bytes actually loaded.
    fn write_tx(&mut self, data: &[u8], timeout_ms: u32)
    -> core::result::Result<usize, Self::Error>;
}

/// SPI target (slave) peripheral.
///
/// Every exchange is a fixed [`SPI_TRANSACTION_LEN`] byte full-duplex transaction clocked by
/// the controller.
#[async_trait(?Send)]
pub trait SpiTarget {
    /// The error type returned by the bus driver.
    type Error: core::fmt::Debug;

    /// Configure the peripheral with the given pins.
    fn configure(&mut self, config: &SpiConfig) -> core::result::Result<(), Self::Error>;

    /// Queue `tx` and wait for the controller to clock a complete transaction, filling `rx`
    /// with the bytes it sent.
    async fn transfer(
        &mut self,
        tx: &[u8; SPI_TRANSACTION_LEN],
        rx: &mut [u8; SPI_TRANSACTION_LEN],
    ) -> core::result::Result<(), Self::Error>;
}

/// Out-of-band "data ready" notification to the controller.
///
/// Fire-and-forget: there is no read-back or handshake beyond the edge itself.
pub trait SideChannel {
    /// Raise the line, hold it for the configured pulse width, then lower it.
    fn pulse(&mut self) -> impl core::future::Future<Output = Result<()>>;
}
