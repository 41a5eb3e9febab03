//! Flow control correlation rules, driven round by round against a fake transport and a
//! hand-operated search engine channel pair.

#![cfg(feature = "async")]

mod common;

use common::FakeTransport;
use puzzle_peripheral::Error;
use puzzle_peripheral::flow::{FlowControl, Round};
use puzzle_peripheral::protocol::{INBOUND_FRAME_LEN, Puzzle, Solution};
use puzzle_peripheral::search::EngineChannels;

fn puzzle(id: u8) -> Puzzle {
    Puzzle::new(id, u32::from(id) * 100, [id; 32], 12)
}

fn solution(id: u8, offset: u32) -> Solution {
    Solution {
        puzzle_id: id,
        offset_solution: offset,
    }
}

#[tokio::test]
async fn idle_round_does_nothing() {
    let channels = EngineChannels::new();
    let mut transport = FakeTransport::new();
    let handle = transport.clone();
    let mut flow = FlowControl::new(&mut transport, &channels);

    for _ in 0..10 {
        let round = flow.poll_once().await.unwrap();
        assert!(round.is_idle());
    }
    assert_eq!(flow.current_puzzle_id(), None);
    assert!(channels.puzzle_receiver().try_receive().is_err());
    assert!(handle.published().is_empty());
}

#[tokio::test]
async fn puzzle_is_forwarded_unchanged() {
    let channels = EngineChannels::new();
    let mut transport = FakeTransport::new();
    let handle = transport.clone();
    let mut flow = FlowControl::new(&mut transport, &channels);

    let submitted = puzzle(7);
    handle.push(submitted.to_frame());

    let round = flow.poll_once().await.unwrap();
    assert_eq!(
        round,
        Round {
            forwarded: Some(7),
            ..Round::default()
        }
    );
    assert_eq!(flow.current_puzzle_id(), Some(7));
    assert_eq!(channels.puzzle_receiver().try_receive().ok(), Some(submitted));
}

#[tokio::test]
async fn matching_solution_is_published() {
    let channels = EngineChannels::new();
    let mut transport = FakeTransport::new();
    let handle = transport.clone();
    let mut flow = FlowControl::new(&mut transport, &channels);

    handle.push(puzzle(7).to_frame());
    flow.poll_once().await.unwrap();
    channels.puzzle_receiver().try_receive().unwrap();

    let found = solution(7, 1234);
    channels.solution_sender().try_send(found).unwrap();

    let round = flow.poll_once().await.unwrap();
    assert_eq!(round.published, Some(7));
    assert_eq!(round.dropped, None);
    assert_eq!(handle.published(), vec![found.to_frame().to_vec()]);
}

#[tokio::test]
async fn solution_before_any_puzzle_is_dropped() {
    let channels = EngineChannels::new();
    let mut transport = FakeTransport::new();
    let handle = transport.clone();
    let mut flow = FlowControl::new(&mut transport, &channels);

    channels.solution_sender().try_send(solution(0, 0)).unwrap();

    let round = flow.poll_once().await.unwrap();
    assert_eq!(round.dropped, Some(0));
    assert!(handle.published().is_empty());
}

#[tokio::test]
async fn superseded_solution_is_dropped_in_the_same_round() {
    let channels = EngineChannels::new();
    let mut transport = FakeTransport::new();
    let handle = transport.clone();
    let mut flow = FlowControl::new(&mut transport, &channels);

    // Puzzle A is being searched
    handle.push(puzzle(1).to_frame());
    flow.poll_once().await.unwrap();
    channels.puzzle_receiver().try_receive().unwrap();

    // A's solution is ready just as puzzle B arrives
    channels.solution_sender().try_send(solution(1, 150)).unwrap();
    handle.push(puzzle(2).to_frame());

    let round = flow.poll_once().await.unwrap();
    assert_eq!(
        round,
        Round {
            forwarded: Some(2),
            published: None,
            dropped: Some(1),
        }
    );
    assert_eq!(flow.current_puzzle_id(), Some(2));
    assert!(handle.published().is_empty());

    // B's own solution still goes out
    channels.puzzle_receiver().try_receive().unwrap();
    channels.solution_sender().try_send(solution(2, 250)).unwrap();
    let round = flow.poll_once().await.unwrap();
    assert_eq!(round.published, Some(2));
    assert_eq!(handle.published(), vec![solution(2, 250).to_frame().to_vec()]);
}

#[tokio::test]
async fn late_solution_for_older_puzzle_is_dropped() {
    let channels = EngineChannels::new();
    let mut transport = FakeTransport::new();
    let handle = transport.clone();
    let mut flow = FlowControl::new(&mut transport, &channels);

    handle.push(puzzle(1).to_frame());
    flow.poll_once().await.unwrap();
    channels.puzzle_receiver().try_receive().unwrap();
    handle.push(puzzle(2).to_frame());
    flow.poll_once().await.unwrap();
    channels.puzzle_receiver().try_receive().unwrap();

    // Engine finished A's comparison before it saw B
    channels.solution_sender().try_send(solution(1, 101)).unwrap();
    let round = flow.poll_once().await.unwrap();
    assert_eq!(round.dropped, Some(1));
    assert!(handle.published().is_empty());
}

#[tokio::test]
async fn frame_size_mismatch_stops_the_loop() {
    let channels = EngineChannels::new();
    let mut transport = FakeTransport::new();
    transport.frame_len = INBOUND_FRAME_LEN - 1;
    let mut flow = FlowControl::new(&mut transport, &channels);

    match flow.run().await {
        Err(err) => assert_eq!(err, Error::FrameSize),
        Ok(never) => match never {},
    }
}
