//! Search engine task - runs cooperatively alongside bus I/O.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use core::convert::Infallible;

use embassy_futures::yield_now;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::config::SearchConfig;
use crate::protocol::{Puzzle, Solution};
use crate::search::{Search, Step};

/// Capacity of both engine channels.  Only the newest puzzle matters, so there is no backlog.
pub const ENGINE_CHANNEL_DEPTH: usize = 1;

/// Sending half of the puzzle channel, held by flow control
pub type PuzzleSender<'a> = Sender<'a, CriticalSectionRawMutex, Puzzle, ENGINE_CHANNEL_DEPTH>;

/// Receiving half of the puzzle channel, held by the search engine
pub type PuzzleReceiver<'a> = Receiver<'a, CriticalSectionRawMutex, Puzzle, ENGINE_CHANNEL_DEPTH>;

/// Sending half of the solution channel, held by the search engine
pub type SolutionSender<'a> = Sender<'a, CriticalSectionRawMutex, Solution, ENGINE_CHANNEL_DEPTH>;

/// Receiving half of the solution channel, held by flow control
pub type SolutionReceiver<'a> =
    Receiver<'a, CriticalSectionRawMutex, Solution, ENGINE_CHANNEL_DEPTH>;

/// The two single-slot channels connecting flow control and the search engine.
///
/// Typically allocated statically:
///
/// ```rust
/// use puzzle_peripheral::search::EngineChannels;
/// static ENGINE: EngineChannels = EngineChannels::new();
/// ```
pub struct EngineChannels {
    puzzles: Channel<CriticalSectionRawMutex, Puzzle, ENGINE_CHANNEL_DEPTH>,
    solutions: Channel<CriticalSectionRawMutex, Solution, ENGINE_CHANNEL_DEPTH>,
}

impl EngineChannels {
    // Must be const to allow static allocation.
    #[allow(clippy::new_without_default)]
    pub const fn new() -> Self {
        Self {
            puzzles: Channel::new(),
            solutions: Channel::new(),
        }
    }

    pub fn puzzle_sender(&self) -> PuzzleSender<'_> {
        self.puzzles.sender()
    }

    pub fn puzzle_receiver(&self) -> PuzzleReceiver<'_> {
        self.puzzles.receiver()
    }

    pub fn solution_sender(&self) -> SolutionSender<'_> {
        self.solutions.sender()
    }

    pub fn solution_receiver(&self) -> SolutionReceiver<'_> {
        self.solutions.receiver()
    }
}

/// Background worker holding at most one live search.
///
/// Two states:
/// - **idle-wait** - no search in progress, suspended on the puzzle channel.  Entered at
///   start-up, after every solution, and if a search runs off the end of the offset range.
/// - **searching** - before each hash, polls the puzzle channel without blocking.  A new
///   puzzle replaces the live search immediately, discarding its progress.
///
/// The engine doesn't know whether its solutions will be accepted.  Filtering solutions for
/// superseded puzzles is flow control's job.
pub struct SearchEngine<'a> {
    puzzles: PuzzleReceiver<'a>,
    solutions: SolutionSender<'a>,
    config: SearchConfig,
}

impl<'a> SearchEngine<'a> {
    pub fn new(channels: &'a EngineChannels, config: SearchConfig) -> Self {
        Self {
            puzzles: channels.puzzle_receiver(),
            solutions: channels.solution_sender(),
            config,
        }
    }

    /// Run forever.
    pub async fn run(&mut self) -> Infallible {
        loop {
            let puzzle = self.puzzles.receive().await;
            debug!(
                "Search {} started at {} matching {} bits",
                puzzle.puzzle_id,
                puzzle.start_offset,
                puzzle.mask_bit_count()
            );
            self.search(Search::new(&puzzle)).await;
        }
    }

    /// Search until a solution is sent or the range is exhausted, adopting any newer puzzle
    /// on the way.
    async fn search(&mut self, mut search: Search) {
        let hashes_per_yield = self.config.hashes_per_yield.max(1);
        let mut budget = hashes_per_yield;

        loop {
            if let Ok(puzzle) = self.puzzles.try_receive() {
                debug!(
                    "Search {} superseded by {} at offset {}",
                    search.puzzle_id(),
                    puzzle.puzzle_id,
                    search.current_offset()
                );
                search = Search::new(&puzzle);
            }

            match search.step() {
                Step::Continue => {}
                Step::Found(solution) => {
                    debug!(
                        "Search {} solved at offset {}",
                        solution.puzzle_id, solution.offset_solution
                    );
                    // Only blocks if the previous solution was never collected
                    self.solutions.send(solution).await;
                    return;
                }
                Step::Exhausted => {
                    warn!(
                        "Search {} exhausted the offset range without a match",
                        search.puzzle_id()
                    );
                    return;
                }
            }

            budget -= 1;
            if budget == 0 {
                budget = hashes_per_yield;
                yield_now().await;
            }
        }
    }
}
