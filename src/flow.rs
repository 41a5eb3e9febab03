//! Flow control - correlates puzzles from the controller with solutions from the search
//! engine.
//!
//! Each round:
//! 1. Drain one puzzle from the transport, if one has arrived.  It becomes the current
//!    puzzle and is forwarded to the search engine.
//! 2. Poll the search engine for a solution.
//! 3. Publish the solution only if it is for the current puzzle.  Solutions for superseded
//!    puzzles are dropped.
//!
//! Forwarding happens before the solution check, so a solution for a puzzle superseded in
//! this same round is never published.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use core::convert::Infallible;

use embassy_futures::select::{Either, select};
use embassy_futures::yield_now;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::Result;
use crate::config::SearchConfig;
use crate::protocol::{INBOUND_FRAME_LEN, Puzzle};
use crate::search::futures::{EngineChannels, PuzzleSender, SearchEngine, SolutionReceiver};
use crate::transport::Transport;

/// What happened in one round of [`FlowControl::poll_once()`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Round {
    /// Id of the puzzle drained and forwarded to the search engine
    pub forwarded: Option<u8>,
    /// Id of the solution published to the controller
    pub published: Option<u8>,
    /// Id of a solution dropped because its puzzle was superseded
    pub dropped: Option<u8>,
}

impl Round {
    /// Whether the round did nothing at all
    pub fn is_idle(&self) -> bool {
        self.forwarded.is_none() && self.published.is_none() && self.dropped.is_none()
    }
}

/// The top-level loop.  The only owner of the current puzzle id.
pub struct FlowControl<'a, T: Transport + ?Sized> {
    transport: &'a mut T,
    puzzles: PuzzleSender<'a>,
    solutions: SolutionReceiver<'a>,
    current_puzzle_id: Option<u8>,
}

impl<'a, T: Transport + ?Sized> FlowControl<'a, T> {
    /// Arguments:
    /// - `transport` - Initialized transport to the controller
    /// - `channels` - Channels shared with the [`SearchEngine`]
    pub fn new(transport: &'a mut T, channels: &'a EngineChannels) -> Self {
        Self {
            transport,
            puzzles: channels.puzzle_sender(),
            solutions: channels.solution_receiver(),
            current_puzzle_id: None,
        }
    }

    /// Id of the puzzle whose solution will be published, if any puzzle has arrived yet
    pub fn current_puzzle_id(&self) -> Option<u8> {
        self.current_puzzle_id
    }

    /// Run rounds forever, yielding between them.  Returns only on a fatal error.
    pub async fn run(&mut self) -> Result<Infallible> {
        loop {
            self.poll_once().await?;
            yield_now().await;
        }
    }

    /// Run a single round.
    ///
    /// Suspends only while forwarding a puzzle to a search engine that hasn't yet taken the
    /// previous one, and while a published solution waits for the controller to read it.
    pub async fn poll_once(&mut self) -> Result<Round> {
        let mut round = Round::default();

        let mut frame = [0u8; INBOUND_FRAME_LEN];
        if self.transport.receive_data(&mut frame)? {
            let puzzle = Puzzle::from_frame(&frame);
            debug!(
                "Puzzle {} received, offset {} bits {}",
                puzzle.puzzle_id,
                puzzle.start_offset,
                puzzle.mask_bit_count()
            );
            self.current_puzzle_id = Some(puzzle.puzzle_id);
            self.puzzles.send(puzzle).await;
            round.forwarded = Some(puzzle.puzzle_id);
        }

        if let Ok(solution) = self.solutions.try_receive() {
            if Some(solution.puzzle_id) == self.current_puzzle_id {
                self.transport
                    .set_data_to_be_read(&solution.to_frame())
                    .await?;
                info!(
                    "Offset solution {} for puzzle {}",
                    solution.offset_solution, solution.puzzle_id
                );
                round.published = Some(solution.puzzle_id);
            } else {
                debug!(
                    "Dropping stale solution for puzzle {}, current {:?}",
                    solution.puzzle_id, self.current_puzzle_id
                );
                round.dropped = Some(solution.puzzle_id);
            }
        }

        Ok(round)
    }
}

/// Run flow control and the search engine together until a fatal error.
///
/// The transport must already be initialized.  On SPI the [`crate::transport::SpiTransactionTask`]
/// is run separately, at a higher priority.
pub async fn run_firmware<T: Transport + ?Sized>(
    transport: &mut T,
    channels: &EngineChannels,
    config: SearchConfig,
) -> Result<Infallible> {
    let mut engine = SearchEngine::new(channels, config);
    let mut flow = FlowControl::new(transport, channels);

    match select(flow.run(), engine.run()).await {
        Either::First(result) => result,
        Either::Second(never) => match never {},
    }
}
