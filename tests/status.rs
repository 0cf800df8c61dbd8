mod common;
use common::*;

use tokio_util::sync::CancellationToken;

use blockdrive::arbitration::EndpointOwner;
use blockdrive::engine::{
    ChannelSink, Engine, ExecutionState, MemorySink, StatusBus, StatusEvent,
};
use blockdrive::program::{Command, Program};

#[tokio::test]
async fn bus_broadcasts_run_events_to_memory_sink() {
    let sink = MemorySink::new();
    let bus = StatusBus::with_sink(sink.clone());
    bus.listen();

    let engine = Engine::new(
        recording_client(RecordingTransport::new(), true),
        EndpointOwner::new(),
        bus.sender(),
    );
    let program = Program::new(vec![Command::Stop { seconds: 0.1 }]);
    engine.run(&program, CancellationToken::new()).await.unwrap();

    bus.stop().await;

    let events = sink.snapshot();
    assert_eq!(events.first().map(|e| e.state), Some(ExecutionState::Running));
    assert_eq!(events.last().map(|e| e.state), Some(ExecutionState::Completed));
    assert!(sink.lines().contains(&"Stopping for 0.1s".to_string()));
}

#[tokio::test]
async fn channel_sink_streams_to_async_consumers() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let bus = StatusBus::with_sink(ChannelSink::new(tx));
    bus.listen();

    let sender = bus.sender();
    sender
        .send(StatusEvent::line(ExecutionState::Running, Some(0), "hello"))
        .unwrap();

    let event = rx.recv().await.unwrap();
    assert_eq!(event.line.as_deref(), Some("hello"));
    bus.stop().await;
}

#[tokio::test]
async fn added_sinks_receive_subsequent_events() {
    let first = MemorySink::new();
    let bus = StatusBus::with_sink(first.clone());
    bus.listen();

    let late = MemorySink::new();
    bus.add_sink(late.clone());

    bus.sender()
        .send(StatusEvent::transition(ExecutionState::Idle, None))
        .unwrap();
    bus.stop().await;

    assert_eq!(first.snapshot().len(), 1);
    assert_eq!(late.snapshot().len(), 1);
}
