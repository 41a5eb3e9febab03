//! I2C target transport.
//!
//! Two ownership zones, connected only by [`I2cShared`]:
//!
//! - **Interrupt context** - the bus driver's receive-done and read-request interrupts call
//!   [`I2cShared::on_receive()`] and [`I2cShared::on_request()`].  Neither blocks nor
//!   allocates.
//! - **Task context** - [`I2cSlave`] drains queued frames without blocking, and blocks in
//!   publish until the interrupt side reports the controller's read.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use alloc::boxed::Box;
use async_trait::async_trait;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::config::I2cConfig;
use crate::io::{I2cTarget, SideChannel};
use crate::protocol::{INBOUND_FRAME_LEN, InboundFrame};
use crate::transport::{Transport, check_inbound_len, check_outbound_len};
use crate::{Error, Result};

/// State shared between the I2C interrupt handlers and [`I2cSlave`].
///
/// `N` is the receive queue depth, which must match
/// [`I2cConfig::rx_queue_depth`].  Typically allocated statically:
///
/// ```rust
/// use puzzle_peripheral::protocol::DEFAULT_RX_QUEUE_DEPTH;
/// use puzzle_peripheral::transport::I2cShared;
/// static I2C: I2cShared<DEFAULT_RX_QUEUE_DEPTH> = I2cShared::new();
/// ```
pub struct I2cShared<const N: usize> {
    rx_queue: Channel<CriticalSectionRawMutex, InboundFrame, N>,
    read_done: Signal<CriticalSectionRawMutex, ()>,
}

impl<const N: usize> I2cShared<N> {
    // Must be const to allow static allocation.
    #[allow(clippy::new_without_default)]
    pub const fn new() -> Self {
        Self {
            rx_queue: Channel::new(),
            read_done: Signal::new(),
        }
    }

    /// Receive queue capacity
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Interrupt handler: the controller has written a complete frame.
    ///
    /// Copies the frame into the receive queue.  Returns `false` if the frame was dropped,
    /// because it isn't [`INBOUND_FRAME_LEN`] bytes or the queue is full.  Waking the task
    /// blocked on the queue, and any context switch that follows, is handled by the
    /// executor.
    pub fn on_receive(&self, data: &[u8]) -> bool {
        let Ok(frame) = InboundFrame::try_from(data) else {
            return false;
        };
        self.rx_queue.try_send(frame).is_ok()
    }

    /// Interrupt handler: the controller has read the transmit buffer.
    ///
    /// Gives the binary "read done" semaphore.  Giving it twice before it is taken is the same
    /// as giving it once.
    ///
    /// Returns whether the semaphore was newly given, `false` if it was already pending.
    pub fn on_request(&self) -> bool {
        let given = !self.read_done.signaled();
        self.read_done.signal(());
        given
    }
}

/// I2C target driver implementing [`Transport`].
pub struct I2cSlave<'a, B: I2cTarget, S: SideChannel, const N: usize> {
    bus: B,
    shared: &'a I2cShared<N>,
    ready: S,
    config: I2cConfig,
    initialized: bool,
}

impl<'a, B: I2cTarget, S: SideChannel, const N: usize> I2cSlave<'a, B, S, N> {
    /// Create the driver.  [`Transport::init()`] must be called before use.
    ///
    /// Arguments:
    /// - `bus` - I2C target peripheral
    /// - `shared` - State shared with the interrupt handlers
    /// - `ready` - Data ready line
    /// - `config` - Address, pins and queue depth
    pub fn new(bus: B, shared: &'a I2cShared<N>, ready: S, config: I2cConfig) -> Self {
        Self {
            bus,
            shared,
            ready,
            config,
            initialized: false,
        }
    }

    /// Release the hardware.
    pub fn free(self) -> (B, S) {
        (self.bus, self.ready)
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
impl<B: I2cTarget, S: SideChannel, const N: usize> Transport for I2cSlave<'_, B, S, N> {
    fn init(&mut self) -> Result<()> {
        if self.config.validate().is_err() {
            error!("Invalid I2C configuration. Aborting!");
            return Err(Error::Init);
        }
        if self.config.rx_queue_depth != N {
            error!(
                "I2C receive queue depth {} doesn't match allocated depth {N}. Aborting!",
                self.config.rx_queue_depth
            );
            return Err(Error::Init);
        }

        self.bus.register(&self.config).map_err(|e| {
            error!("Failed to register I2C target {e:?}. Aborting!");
            Error::Init
        })?;
        self.shared.read_done.reset();
        self.initialized = true;

        info!(
            "Initialized I2C target with address {:#04X}, on GPIO SDA {} and SCL {}",
            self.config.address, self.config.sda, self.config.scl
        );
        Ok(())
    }

    async fn set_data_to_be_read(&mut self, data: &[u8]) -> Result<()> {
        self.check_initialized()?;
        check_outbound_len(data.len())?;

        // Only a read following this publish counts
        self.shared.read_done.reset();

        let written = self
            .bus
            .write_tx(data, self.config.tx_timeout_ms)
            .map_err(|e| {
                error!("Failed to load I2C transmit buffer {e:?}");
                Error::Bus
            })?;
        if written != data.len() {
            error!("Loaded {written} of {} bytes into I2C transmit buffer", data.len());
            return Err(Error::Bus);
        }

        // Frame is complete in the transmit buffer - tell the controller
        self.ready.pulse().await?;

        self.shared.read_done.wait().await;
        trace!("Controller read published frame");
        Ok(())
    }

    fn receive_data(&mut self, buf: &mut [u8]) -> Result<bool> {
        self.check_initialized()?;
        check_inbound_len(buf.len())?;

        match self.shared.rx_queue.try_receive() {
            Ok(frame) => {
                buf[..INBOUND_FRAME_LEN].copy_from_slice(&frame);
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }
}
