//! In-memory fakes for the hardware seams, recording an event log so tests can assert the
//! order in which the peripheral touched the bus and the data ready line.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use async_trait::async_trait;
use embassy_futures::yield_now;
use embedded_hal::digital::{ErrorType, OutputPin};
use embedded_hal_async::delay::DelayNs;

use puzzle_peripheral::Error;
use puzzle_peripheral::config::{I2cConfig, SpiConfig};
use puzzle_peripheral::io::{I2cTarget, SpiTarget};
use puzzle_peripheral::protocol::{
    INBOUND_FRAME_LEN, InboundFrame, OUTBOUND_FRAME_LEN, OutboundFrame, SPI_TRANSACTION_LEN,
    SpiCommand,
};
use puzzle_peripheral::signal::DataReadyLine;
use puzzle_peripheral::transport::Transport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Registered,
    TxLoaded(Vec<u8>),
    LineHigh,
    LineLow,
}

#[derive(Clone, Default)]
pub struct EventLog(Rc<RefCell<Vec<Event>>>);

impl EventLog {
    pub fn push(&self, event: Event) {
        self.0.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    pub fn position(&self, event: &Event) -> Option<usize> {
        self.0.borrow().iter().position(|e| e == event)
    }

    /// Frames loaded for the controller, oldest first
    pub fn loaded_frames(&self) -> Vec<OutboundFrame> {
        self.0
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::TxLoaded(bytes) => OutboundFrame::try_from(bytes.as_slice()).ok(),
                _ => None,
            })
            .collect()
    }

    /// Number of completed data ready pulses
    pub fn pulses(&self) -> usize {
        self.0.borrow().iter().filter(|e| **e == Event::LineHigh).count()
    }

    /// Wait until `count` data ready pulses have completed
    pub async fn wait_for_pulses(&self, count: usize) {
        loop {
            let complete = {
                let events = self.0.borrow();
                let highs = events.iter().filter(|e| **e == Event::LineHigh).count();
                highs >= count && events.last() == Some(&Event::LineLow)
            };
            if complete {
                return;
            }
            yield_now().await;
        }
    }
}

pub struct FakePin {
    log: EventLog,
}

impl ErrorType for FakePin {
    type Error = Infallible;
}

impl OutputPin for FakePin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.log.push(Event::LineLow);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.log.push(Event::LineHigh);
        Ok(())
    }
}

/// Delay that only yields, so the pulse completes without wall-clock time
pub struct FakeDelay;

impl DelayNs for FakeDelay {
    async fn delay_ns(&mut self, _ns: u32) {
        yield_now().await;
    }
}

/// Data ready line on a fake pin.  Construction drives the line low, which is logged.
pub fn data_ready_line(log: &EventLog) -> DataReadyLine<FakePin, FakeDelay> {
    DataReadyLine::new(FakePin { log: log.clone() }, FakeDelay, 10).unwrap()
}

#[derive(Default)]
pub struct FakeI2c {
    pub log: EventLog,
    pub fail_register: bool,
    pub short_write: bool,
}

impl FakeI2c {
    pub fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            ..Self::default()
        }
    }
}

impl I2cTarget for FakeI2c {
    type Error = &'static str;

    fn register(&mut self, _config: &I2cConfig) -> Result<(), Self::Error> {
        if self.fail_register {
            return Err("no such peripheral");
        }
        self.log.push(Event::Registered);
        Ok(())
    }

    fn write_tx(&mut self, data: &[u8], _timeout_ms: u32) -> Result<usize, Self::Error> {
        let len = if self.short_write { data.len() - 1 } else { data.len() };
        self.log.push(Event::TxLoaded(data[..len].to_vec()));
        Ok(len)
    }
}

/// Controller side of a fake SPI bus.  Each queued transaction is clocked as soon as the
/// target is ready for it.
#[derive(Clone, Default)]
pub struct SpiController {
    script: Rc<RefCell<VecDeque<[u8; SPI_TRANSACTION_LEN]>>>,
    clocked_out: Rc<RefCell<Vec<[u8; SPI_TRANSACTION_LEN]>>>,
}

impl SpiController {
    pub fn queue(&self, command: u8, payload: &[u8]) {
        let mut transaction = [0u8; SPI_TRANSACTION_LEN];
        transaction[0] = command;
        transaction[1..1 + payload.len()].copy_from_slice(payload);
        self.script.borrow_mut().push_back(transaction);
    }

    pub fn queue_command(&self, command: SpiCommand) {
        self.queue(command as u8, &[]);
    }

    pub fn write_frame(&self, frame: &InboundFrame) {
        self.queue_command(SpiCommand::RequestWrite);
        self.queue(SpiCommand::DataWrite as u8, frame);
    }

    pub fn read_frame(&self) {
        self.queue_command(SpiCommand::RequestRead);
        self.queue_command(SpiCommand::DataRead);
    }

    pub fn pending(&self) -> usize {
        self.script.borrow().len()
    }

    /// Bytes the target transmitted, one entry per transaction
    pub fn clocked_out(&self) -> Vec<[u8; SPI_TRANSACTION_LEN]> {
        self.clocked_out.borrow().clone()
    }

    /// Outbound frame carried by the most recent `DataRead` transaction
    pub fn last_read(&self) -> Option<OutboundFrame> {
        let script_len = self.clocked_out.borrow().len();
        if script_len == 0 {
            return None;
        }
        let tx = self.clocked_out.borrow()[script_len - 1];
        OutboundFrame::try_from(&tx[..OUTBOUND_FRAME_LEN]).ok()
    }

    pub async fn wait_until_clocked(&self) {
        while self.pending() > 0 {
            yield_now().await;
        }
    }
}

pub struct FakeSpi {
    pub controller: SpiController,
    pub fail: bool,
}

impl FakeSpi {
    pub fn new(controller: &SpiController) -> Self {
        Self {
            controller: controller.clone(),
            fail: false,
        }
    }
}

#[async_trait(?Send)]
impl SpiTarget for FakeSpi {
    type Error = &'static str;

    fn configure(&mut self, _config: &SpiConfig) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn transfer(
        &mut self,
        tx: &[u8; SPI_TRANSACTION_LEN],
        rx: &mut [u8; SPI_TRANSACTION_LEN],
    ) -> Result<(), Self::Error> {
        if self.fail {
            return Err("mode fault");
        }
        loop {
            let next = self.controller.script.borrow_mut().pop_front();
            if let Some(transaction) = next {
                self.controller.clocked_out.borrow_mut().push(*tx);
                *rx = transaction;
                return Ok(());
            }
            yield_now().await;
        }
    }
}

/// Transport fake with shared handles so a test can feed frames while flow control holds the
/// transport.
#[derive(Clone)]
pub struct FakeTransport {
    pub inbound: Rc<RefCell<VecDeque<InboundFrame>>>,
    pub published: Rc<RefCell<Vec<Vec<u8>>>>,
    /// Frame size the transport was built for
    pub frame_len: usize,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            inbound: Rc::default(),
            published: Rc::default(),
            frame_len: INBOUND_FRAME_LEN,
        }
    }

    pub fn push(&self, frame: InboundFrame) {
        self.inbound.borrow_mut().push_back(frame);
    }

    pub fn published(&self) -> Vec<Vec<u8>> {
        self.published.borrow().clone()
    }
}

#[async_trait(?Send)]
impl Transport for FakeTransport {
    fn init(&mut self) -> puzzle_peripheral::Result<()> {
        Ok(())
    }

    async fn set_data_to_be_read(&mut self, data: &[u8]) -> puzzle_peripheral::Result<()> {
        self.published.borrow_mut().push(data.to_vec());
        Ok(())
    }

    fn receive_data(&mut self, buf: &mut [u8]) -> puzzle_peripheral::Result<bool> {
        if buf.len() != self.frame_len {
            return Err(Error::FrameSize);
        }
        match self.inbound.borrow_mut().pop_front() {
            Some(frame) => {
                buf.copy_from_slice(&frame);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Yield to the executor `count` times
pub async fn yield_times(count: usize) {
    for _ in 0..count {
        yield_now().await;
    }
}
