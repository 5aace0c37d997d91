//! Channel correlation, timeout, and sequencing behavior against a
//! scripted engine

mod common;

use common::{mock_engine, MockEngine};
use evm_protocol::{Command, CommandKind, Response};
use evm_session::{block_on, ChannelConfig, ChannelError, EngineChannel};
use std::time::Duration;

fn open_fast(engine: MockEngine) -> EngineChannel {
    EngineChannel::open(
        Box::new(engine),
        ChannelConfig {
            response_timeout: Duration::from_millis(25),
        },
    )
}

#[test]
fn responses_resolve_the_request_that_issued_them() {
    let (engine, _probe) = mock_engine();
    let channel = open_fast(engine);

    let response = block_on(channel.request(Command::Init).unwrap()).unwrap();
    assert_eq!(response, Response::Ready);

    let response = block_on(
        channel
            .request(Command::ReadMemory {
                addr: 0x40_0000,
                size: 4,
            })
            .unwrap(),
    )
    .unwrap();
    assert_eq!(
        response,
        Response::Memory {
            addr: 0x40_0000,
            data: vec![0, 0, 0, 0]
        }
    );
    assert_eq!(channel.pending_requests(), 0);
}

#[test]
fn unanswered_request_times_out_and_leaves_no_pending_entry() {
    let (engine, _probe) = mock_engine();
    let channel = open_fast(engine.swallowing(CommandKind::ReadMemory));

    let request = || {
        channel
            .request(Command::ReadMemory {
                addr: 0x40_0000,
                size: 16,
            })
            .unwrap()
    };

    let err = block_on(request()).unwrap_err();
    assert!(matches!(
        err,
        ChannelError::Timeout {
            kind: CommandKind::ReadMemory,
            ..
        }
    ));
    assert_eq!(channel.pending_requests(), 0);

    // an identical request afterwards gets its own independent timeout
    let err = block_on(request()).unwrap_err();
    assert!(matches!(err, ChannelError::Timeout { .. }));
    assert_eq!(channel.pending_requests(), 0);
}

#[test]
fn every_command_kind_is_deadline_guarded() {
    let (engine, _probe) = mock_engine();
    let channel = open_fast(
        engine
            .swallowing(CommandKind::Init)
            .swallowing(CommandKind::Run)
            .swallowing(CommandKind::LoadImage),
    );

    for command in [
        Command::Init,
        Command::Run { count: 100 },
        Command::LoadImage {
            addr: 0,
            data: vec![1, 2],
        },
    ] {
        let err = block_on(channel.request(command).unwrap()).unwrap_err();
        assert!(matches!(err, ChannelError::Timeout { .. }));
    }
    assert_eq!(channel.pending_requests(), 0);
}

#[test]
fn engine_errors_reach_exactly_the_waiting_caller() {
    let (engine, _probe) = mock_engine();
    let channel = open_fast(engine.failing(CommandKind::LoadImage));

    let err = block_on(
        channel
            .request(Command::LoadImage {
                addr: 0x400,
                data: vec![0x4E, 0x71],
            })
            .unwrap(),
    )
    .unwrap_err();
    match err {
        ChannelError::Engine { message } => assert!(message.contains("load-image")),
        other => panic!("expected engine error, got {other:?}"),
    }

    // the channel is still usable for other commands
    let response = block_on(channel.request(Command::GetState).unwrap()).unwrap();
    assert!(matches!(response, Response::State(_)));
}

#[test]
fn concurrent_distinct_kinds_demultiplex_independently() {
    let (engine, _probe) = mock_engine();
    let channel = open_fast(engine);

    let read = channel
        .request(Command::ReadMemory { addr: 0, size: 2 })
        .unwrap();
    let step = channel.request(Command::Step).unwrap();
    assert_eq!(channel.pending_requests(), 2);

    // resolution order does not depend on issue order
    let step_response = block_on(step).unwrap();
    assert!(matches!(step_response, Response::State(_)));
    let read_response = block_on(read).unwrap();
    assert!(matches!(read_response, Response::Memory { .. }));
}

#[test]
fn same_kind_is_rejected_until_the_first_resolves() {
    let (engine, _probe) = mock_engine();
    let channel = open_fast(engine.swallowing(CommandKind::Run));

    let first = channel.request(Command::Run { count: 1 }).unwrap();
    assert!(matches!(
        channel.request(Command::Run { count: 1 }),
        Err(ChannelError::SequenceViolation {
            kind: CommandKind::Run
        })
    ));

    let _ = block_on(first);
    assert!(channel.request(Command::Run { count: 1 }).is_ok());
}
