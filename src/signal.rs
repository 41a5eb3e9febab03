//! Side-channel "data ready" line.
//!
//! A GPIO pulsed high for [`crate::config::Config::pulse_ms`] and then low each time a
//! solution has been loaded for the controller to read.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::io::SideChannel;
use crate::{Error, Result};

/// [`SideChannel`] driving an `embedded-hal` output pin.
pub struct DataReadyLine<P: OutputPin, D: DelayNs> {
    pin: P,
    delay: D,
    pulse_ms: u32,
}

impl<P: OutputPin, D: DelayNs> DataReadyLine<P, D> {
    /// Take ownership of the pin and drive it low.
    pub fn new(mut pin: P, delay: D, pulse_ms: u32) -> Result<Self> {
        pin.set_low().map_err(|e| {
            error!("Failed to reset data ready line {e:?}");
            Error::Signal
        })?;
        info!("Initialized data ready line, pulse {pulse_ms}ms");
        Ok(Self {
            pin,
            delay,
            pulse_ms,
        })
    }

    /// Release the pin and delay.
    pub fn free(self) -> (P, D) {
        (self.pin, self.delay)
    }
}

impl<P: OutputPin, D: DelayNs> SideChannel for DataReadyLine<P, D> {
    async fn pulse(&mut self) -> Result<()> {
        self.pin.set_high().map_err(|e| {
            error!("Failed to set data ready line {e:?}");
            Error::Signal
        })?;
        self.delay.delay_ms(self.pulse_ms).await;
        self.pin.set_low().map_err(|e| {
            error!("Failed to reset data ready line {e:?}");
            Error::Signal
        })
    }
}
