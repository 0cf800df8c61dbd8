mod common;
use common::*;

use std::time::Duration;

use httpmock::prelude::*;

use blockdrive::actuator::{
    ActuationClient, ActuationError, Direction, HttpTransport, RequestPolicy,
};
use blockdrive::link::LinkState;
use blockdrive::program::Command;

fn fast_policy() -> RequestPolicy {
    RequestPolicy {
        timeout: Duration::from_millis(250),
        retries: 1,
        retry_delay: Duration::from_millis(10),
        settle_delay: Duration::from_millis(10),
    }
}

fn http_client(base_url: String) -> ActuationClient<HttpTransport> {
    ActuationClient::new(HttpTransport::new(base_url), LinkState::with_reachable(true))
        .with_policy(fast_policy())
}

#[tokio::test]
async fn wire_contract_is_direction_query_with_french_tokens() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/direction").query_param("dir", "avant");
            then.status(200);
        })
        .await;

    let client = http_client(server.base_url());
    client.request(Direction::Forward, 0).await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn response_status_is_ignored() {
    // The firmware's responses are opaque; an error status still counts as
    // delivered.
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/direction");
            then.status(500);
        })
        .await;

    let client = http_client(server.base_url());
    assert!(client.request(Direction::Stop, 0).await.is_ok());
}

#[tokio::test]
async fn motion_leaf_is_wrapped_in_stops() {
    let server = MockServer::start_async().await;
    let stops = server
        .mock_async(|when, then| {
            when.method(GET).path("/direction").query_param("dir", "stop");
            then.status(200);
        })
        .await;
    let forward = server
        .mock_async(|when, then| {
            when.method(GET).path("/direction").query_param("dir", "avant");
            then.status(200);
        })
        .await;

    let client = http_client(server.base_url());
    client
        .perform(&Command::MoveForward { seconds: 0.1 })
        .await
        .unwrap();

    // Pre-motion settle stop plus guaranteed cleanup stop.
    assert_eq!(stops.hits_async().await, 2);
    assert_eq!(forward.hits_async().await, 1);
}

#[tokio::test]
async fn stop_leaf_sends_exactly_one_request() {
    let server = MockServer::start_async().await;
    let stops = server
        .mock_async(|when, then| {
            when.method(GET).path("/direction").query_param("dir", "stop");
            then.status(200);
        })
        .await;

    let client = http_client(server.base_url());
    client
        .perform(&Command::Stop { seconds: 0.1 })
        .await
        .unwrap();

    assert_eq!(stops.hits_async().await, 1);
}

#[tokio::test]
async fn attempts_exhaust_against_unreachable_host() {
    // Nothing listens on this port; every attempt fails at connect.
    let client = ActuationClient::new(
        HttpTransport::new("http://127.0.0.1:9"),
        LinkState::with_reachable(true),
    )
    .with_policy(fast_policy());

    let err = client.request(Direction::Forward, 2).await.unwrap_err();
    match err {
        ActuationError::Unreachable { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("expected Unreachable, got {other:?}"),
    }
}

#[tokio::test]
async fn slow_endpoint_times_out_per_attempt() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/direction");
            then.status(200).delay(Duration::from_millis(2000));
        })
        .await;

    let policy = RequestPolicy {
        timeout: Duration::from_millis(50),
        ..fast_policy()
    };
    let client = ActuationClient::new(
        HttpTransport::new(server.base_url()),
        LinkState::with_reachable(true),
    )
    .with_policy(policy);

    let err = client.request(Direction::Left, 1).await.unwrap_err();
    match err {
        ActuationError::Timeout {
            direction,
            attempts,
        } => {
            assert_eq!(direction, Direction::Left);
            assert_eq!(attempts, 2);
        }
        other => panic!("expected Timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn disconnected_perform_makes_no_request() {
    let transport = RecordingTransport::new();
    let client = recording_client(transport.clone(), false);

    let err = client
        .perform(&Command::MoveForward { seconds: 1.0 })
        .await
        .unwrap_err();

    assert!(matches!(err, ActuationError::Disconnected));
    assert!(transport.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_primary_still_holds_and_cleans_up() {
    let transport = RecordingTransport::failing();
    let client = recording_client(transport.clone(), true);

    let started = tokio::time::Instant::now();
    let result = client.perform(&Command::MoveForward { seconds: 1.0 }).await;

    assert!(result.is_err());
    // settle 100 ms + hold 1000 ms + retry delays: pre-stop (1 retry),
    // primary (1 retry), cleanup stop (1 retry) at 150 ms each.
    assert_eq!(
        started.elapsed(),
        Duration::from_millis(100 + 1000 + 3 * 150)
    );
    // Cleanup stop was attempted after the failed primary.
    assert_eq!(transport.sent().last(), Some(&Direction::Stop));
}
