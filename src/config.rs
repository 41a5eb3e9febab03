//! Start-up configuration for the peripheral.
//!
//! Mirrors the board-level build options of the firmware: which bus the controller talks
//! over, bus address and pin assignments, queue depths, the side-channel line and how the
//! search task shares the CPU.  The firmware builds a [`Config`] once, validates it, and hands
//! the relevant parts to the drivers' `init()`.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::protocol::DEFAULT_RX_QUEUE_DEPTH;
use crate::{Error, Result};

/// Default I2C target address
pub const DEFAULT_I2C_ADDRESS: u16 = 0x28;

/// Default hardware ring buffer depth, used for both directions
pub const DEFAULT_BUF_DEPTH: usize = 256;

/// Default time allowed to load the I2C transmit ring
pub const DEFAULT_TX_TIMEOUT_MS: u32 = 10;

/// Default width of the data ready pulse
pub const DEFAULT_PULSE_MS: u32 = 10;

/// Default number of hashes between cooperative yields of the search task
pub const DEFAULT_HASHES_PER_YIELD: u32 = 32;

/// Which bus the controller uses, with its settings.
/// - `I2c`: I2C target mode, frames delivered by interrupt handlers
/// - `Spi`: SPI target mode, frames delivered by a dedicated transaction task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportConfig {
    I2c(I2cConfig),
    Spi(SpiConfig),
}

/// Which bus is in use, without its settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    I2c,
    Spi,
}

/// I2C target settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct I2cConfig {
    /// 7-bit target address
    pub address: u16,
    /// SDA GPIO
    pub sda: u8,
    /// SCL GPIO
    pub scl: u8,
    /// Number of inbound frames the interrupt handler may queue
    pub rx_queue_depth: usize,
    /// Transmit ring buffer depth in bytes
    pub send_buf_depth: usize,
    /// Receive buffer depth in bytes
    pub receive_buf_depth: usize,
    /// Transmit ring load timeout
    pub tx_timeout_ms: u32,
    /// Whether to enable the MCU's internal pull-ups on SDA/SCL
    pub internal_pullup: bool,
}

impl Default for I2cConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_I2C_ADDRESS,
            sda: 5,
            scl: 6,
            rx_queue_depth: DEFAULT_RX_QUEUE_DEPTH,
            send_buf_depth: DEFAULT_BUF_DEPTH,
            receive_buf_depth: DEFAULT_BUF_DEPTH,
            tx_timeout_ms: DEFAULT_TX_TIMEOUT_MS,
            internal_pullup: false,
        }
    }
}

/// SPI target settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiConfig {
    /// Controller out, target in
    pub mosi: u8,
    /// Controller in, target out
    pub miso: u8,
    /// Clock
    pub sclk: u8,
    /// Chip select
    pub cs: u8,
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            mosi: 7,
            miso: 2,
            sclk: 6,
            cs: 10,
        }
    }
}

/// Search engine settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    /// Hashes computed between yields to the other tasks.  A newer puzzle is still checked
    /// for before every hash.
    pub hashes_per_yield: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            hashes_per_yield: DEFAULT_HASHES_PER_YIELD,
        }
    }
}

/// Complete peripheral configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Bus to the controller
    pub transport: TransportConfig,
    /// GPIO used to pulse "data ready" to the controller
    pub data_ready_pin: u8,
    /// Width of the data ready pulse
    pub pulse_ms: u32,
    /// Search engine settings
    pub search: SearchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transport: TransportConfig::I2c(I2cConfig::default()),
            data_ready_pin: 4,
            pulse_ms: DEFAULT_PULSE_MS,
            search: SearchConfig::default(),
        }
    }
}

impl TransportConfig {
    pub fn kind(&self) -> TransportKind {
        match self {
            TransportConfig::I2c(_) => TransportKind::I2c,
            TransportConfig::Spi(_) => TransportKind::Spi,
        }
    }

    /// GPIOs claimed by the bus
    fn pins(&self) -> ([u8; 4], usize) {
        match self {
            TransportConfig::I2c(c) => ([c.sda, c.scl, 0, 0], 2),
            TransportConfig::Spi(c) => ([c.mosi, c.miso, c.sclk, c.cs], 4),
        }
    }
}

impl I2cConfig {
    /// Check the address is a usable 7-bit address and that the buffers are non-empty.
    pub fn validate(&self) -> Result<()> {
        // 0x00-0x07 and 0x78-0x7F are reserved by the I2C specification
        if !(0x08..=0x77).contains(&self.address) {
            warn!("Invalid I2C address {:#04X}", self.address);
            return Err(Error::InvalidConfig);
        }
        if self.rx_queue_depth == 0 || self.send_buf_depth == 0 || self.receive_buf_depth == 0 {
            warn!("I2C queue and buffer depths must be non-zero");
            return Err(Error::InvalidConfig);
        }
        Ok(())
    }
}

impl Config {
    /// Check the configuration is self-consistent.
    pub fn validate(&self) -> Result<()> {
        if let TransportConfig::I2c(i2c) = &self.transport {
            i2c.validate()?;
        }

        if self.pulse_ms == 0 {
            warn!("Data ready pulse width must be non-zero");
            return Err(Error::InvalidConfig);
        }
        if self.search.hashes_per_yield == 0 {
            warn!("Search must compute at least one hash between yields");
            return Err(Error::InvalidConfig);
        }

        let (pins, count) = self.transport.pins();
        let pins = &pins[..count];
        for (i, pin) in pins.iter().enumerate() {
            if pins[i + 1..].contains(pin) {
                warn!("GPIO {pin} assigned to more than one bus signal");
                return Err(Error::InvalidConfig);
            }
        }
        if pins.contains(&self.data_ready_pin) {
            warn!("Data ready GPIO {} collides with a bus pin", self.data_ready_pin);
            return Err(Error::InvalidConfig);
        }

        Ok(())
    }
}
