//! SPI target transport.
//!
//! SPI gives the target no way to initiate a transfer, so a half-duplex request/response
//! protocol is run over fixed [`SPI_TRANSACTION_LEN`] byte full-duplex transactions.  The
//! first byte the controller sends in each transaction is a [`SpiCommand`]:
//!
//! | Command        | Action |
//! |----------------|--------|
//! | `RequestWrite` | none - the next transaction carries a puzzle |
//! | `DataWrite`    | snapshot the received frame and give "data written" |
//! | `RequestRead`  | load the last published solution into the transmit buffer |
//! | `DataRead`     | the solution has been clocked out - give "data read" |
//!
//! Received transaction: `[0]` command, `[1..40]` inbound frame.  Transmitted transaction:
//! `[0..5]` outbound frame, the rest zero.
//!
//! [`SpiTransactionTask`] owns the bus and runs transactions back to back.  It should run at
//! a higher priority than the rest of the system so the controller's timing is met.
//! [`SpiSlave`] is the [`Transport`] the rest of the firmware uses.  They share a [`SpiLink`].

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use core::cell::Cell;
use core::convert::Infallible;

use alloc::boxed::Box;
use async_trait::async_trait;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::config::SpiConfig;
use crate::io::{SideChannel, SpiTarget};
use crate::protocol::{
    INBOUND_FRAME_LEN, InboundFrame, OUTBOUND_FRAME_LEN, OutboundFrame, SPI_TRANSACTION_LEN,
    SpiCommand,
};
use crate::transport::{Transport, check_inbound_len, check_outbound_len};
use crate::{Error, Result};

/// State shared between [`SpiTransactionTask`] and [`SpiSlave`].
///
/// Typically allocated statically:
///
/// ```rust
/// use puzzle_peripheral::transport::SpiLink;
/// static SPI: SpiLink = SpiLink::new();
/// ```
pub struct SpiLink {
    /// Last frame passed to publish, loaded on `RequestRead`
    published: Mutex<CriticalSectionRawMutex, Cell<OutboundFrame>>,
    /// Stable copy of the last `DataWrite` frame.  A newer frame replaces an untaken one.
    written: Signal<CriticalSectionRawMutex, InboundFrame>,
    read_done: Signal<CriticalSectionRawMutex, ()>,
}

impl SpiLink {
    // Must be const to allow static allocation.
    #[allow(clippy::new_without_default)]
    pub const fn new() -> Self {
        Self {
            published: Mutex::new(Cell::new([0; OUTBOUND_FRAME_LEN])),
            written: Signal::new(),
            read_done: Signal::new(),
        }
    }

    /// Last published outbound frame
    pub fn published(&self) -> OutboundFrame {
        self.published.lock(|frame| frame.get())
    }

    fn publish(&self, data: &OutboundFrame) {
        self.published.lock(|frame| frame.set(*data));
    }
}

/// Perpetual task running SPI transactions.
pub struct SpiTransactionTask<'a, B: SpiTarget> {
    bus: B,
    link: &'a SpiLink,
    config: SpiConfig,
    tx: [u8; SPI_TRANSACTION_LEN],
    rx: [u8; SPI_TRANSACTION_LEN],
    initialized: bool,
}

impl<'a, B: SpiTarget> SpiTransactionTask<'a, B> {
    /// Create the task.  [`Self::init()`] must be called before running it.
    pub fn new(bus: B, link: &'a SpiLink, config: SpiConfig) -> Self {
        Self {
            bus,
            link,
            config,
            tx: [0; SPI_TRANSACTION_LEN],
            rx: [0; SPI_TRANSACTION_LEN],
            initialized: false,
        }
    }

    /// Configure the SPI target peripheral.
    pub fn init(&mut self) -> Result<()> {
        self.bus.configure(&self.config).map_err(|e| {
            error!("Failed to configure SPI target {e:?}. Aborting!");
            Error::Init
        })?;
        self.initialized = true;

        info!(
            "Initialized SPI target on GPIO MOSI {} MISO {} SCLK {} CS {}",
            self.config.mosi, self.config.miso, self.config.sclk, self.config.cs
        );
        Ok(())
    }

    /// Run transactions until the bus fails.
    pub async fn run(&mut self) -> Result<Infallible> {
        loop {
            self.exchange().await?;
        }
    }

    /// Run one transaction and act on its command.
    ///
    /// Returns the command received, or `None` if the command byte wasn't recognised.
    pub async fn exchange(&mut self) -> Result<Option<SpiCommand>> {
        if !self.initialized {
            return Err(Error::Uninit);
        }

        self.bus
            .transfer(&self.tx, &mut self.rx)
            .await
            .map_err(|e| {
                error!("SPI transaction failed {e:?}");
                Error::Bus
            })?;

        let command = match SpiCommand::try_from(self.rx[0]) {
            Ok(command) => command,
            Err(byte @ (0x00 | 0xFF)) => {
                trace!("Idle SPI transaction {byte:#04X}");
                return Ok(None);
            }
            Err(byte) => {
                warn!("Ignoring unknown SPI command {byte:#04X}");
                return Ok(None);
            }
        };
        trace!("SPI command {command:?}");

        match command {
            SpiCommand::RequestWrite => {}
            SpiCommand::DataWrite => {
                let mut frame = [0u8; INBOUND_FRAME_LEN];
                frame.copy_from_slice(&self.rx[1..]);
                self.link.written.signal(frame);
            }
            SpiCommand::RequestRead => {
                self.tx = [0; SPI_TRANSACTION_LEN];
                self.tx[..OUTBOUND_FRAME_LEN].copy_from_slice(&self.link.published());
            }
            SpiCommand::DataRead => {
                self.link.read_done.signal(());
            }
        }

        Ok(Some(command))
    }

    /// Release the bus.
    pub fn free(self) -> B {
        self.bus
    }
}

/// SPI target driver implementing [`Transport`].
pub struct SpiSlave<'a, S: SideChannel> {
    link: &'a SpiLink,
    ready: S,
    initialized: bool,
}

impl<'a, S: SideChannel> SpiSlave<'a, S> {
    /// Create the driver.  [`Transport::init()`] must be called before use.
    pub fn new(link: &'a SpiLink, ready: S) -> Self {
        Self {
            link,
            ready,
            initialized: false,
        }
    }

    /// Release the data ready line.
    pub fn free(self) -> S {
        self.ready
    }

    fn check_initialized(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(Error::Uninit)
        }
    }
}

#[async_trait(?Send)]
impl<S: SideChannel> Transport for SpiSlave<'_, S> {
    fn init(&mut self) -> Result<()> {
        // The bus itself belongs to the transaction task
        self.link.written.reset();
        self.link.read_done.reset();
        self.initialized = true;
        debug!("Initialized SPI transport");
        Ok(())
    }

    async fn set_data_to_be_read(&mut self, data: &[u8]) -> Result<()> {
        self.check_initialized()?;
        check_outbound_len(data.len())?;

        let mut frame = [0u8; OUTBOUND_FRAME_LEN];
        frame.copy_from_slice(data);

        // Only a read following this publish counts
        self.link.read_done.reset();
        self.link.publish(&frame);

        // Frame is complete in the published copy - tell the controller
        self.ready.pulse().await?;

        self.link.read_done.wait().await;
        trace!("Controller read published frame");
        Ok(())
    }

    fn receive_data(&mut self, buf: &mut [u8]) -> Result<bool> {
        self.check_initialized()?;
        check_inbound_len(buf.len())?;

        match self.link.written.try_take() {
            Some(frame) => {
                buf[..INBOUND_FRAME_LEN].copy_from_slice(&frame);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
