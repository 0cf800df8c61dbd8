//! # Blockdrive: block programs for a Wi-Fi RC car
//!
//! Blockdrive compiles graphical block programs into a small command IR and
//! executes them against a remote wheeled-vehicle endpoint over a lossy,
//! acknowledgment-free HTTP link, with retry/timeout discipline, forced
//! safety stops, cooperative cancellation, and a status event stream.
//!
//! ## Pipeline
//!
//! block graph → [`compiler::compile`] → [`program::Program`] →
//! [`engine::Engine::run`] → per-leaf requests through
//! [`actuator::ActuationClient`] → status events into an
//! [`engine::StatusBus`].
//!
//! ## Quick start
//!
//! ```no_run
//! use blockdrive::blocks::{BlockGraph, BlockKind, BlockNode};
//! use blockdrive::compiler::compile;
//! use blockdrive::config::DriveConfig;
//! use blockdrive::actuator::ActuationClient;
//! use blockdrive::arbitration::EndpointOwner;
//! use blockdrive::engine::{Engine, StatusBus};
//! use blockdrive::link::LinkState;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! // A two-block program: Start → move forward 2s.
//! let mut graph = BlockGraph::new();
//! graph.insert("start", BlockNode::new(BlockKind::Start).with_next("fwd"));
//! graph.insert("fwd", BlockNode::new(BlockKind::MoveForward).with_value(2.0));
//! graph.push_top("start");
//! let program = compile(&graph)?;
//!
//! // Wire up the endpoint. The reachability flag is written by an external
//! // connectivity poller; the engine only reads it.
//! let config = DriveConfig::from_env();
//! let link = LinkState::with_reachable(true);
//! let client = ActuationClient::new(config.http_transport(), link)
//!     .with_policy(config.policy);
//!
//! let bus = StatusBus::default();
//! bus.listen();
//! let engine = Engine::new(client, EndpointOwner::new(), bus.sender());
//!
//! let report = engine.run(&program, CancellationToken::new()).await?;
//! assert!(!report.cancelled);
//! # Ok(())
//! # }
//! ```
//!
//! ## Guarantees
//!
//! - One leaf actuation in flight at a time; commands are awaited to
//!   completion, including their hold duration, before the next begins.
//! - Cancellation is sampled before every leaf command, even inside nested
//!   repeats; worst-case latency is one leaf's settle + retries·timeout +
//!   hold.
//! - Actuation failures never abort a run: they are logged, the cleanup stop
//!   is still attempted, and execution proceeds.
//! - The program executor and the manual path ([`manual::ManualControl`])
//!   arbitrate over the endpoint through [`arbitration::EndpointOwner`];
//!   they can never interleave commands.
//!
//! "Success" on this link means only that a request did not error or time
//! out. The firmware never acknowledges execution.
//!
//! ## Module guide
//!
//! - [`blocks`] — block-graph input model (serde)
//! - [`compiler`] — graph → program compilation and validation
//! - [`program`] — command IR, hold timing, programs
//! - [`actuator`] — wire directions, HTTP transport, retrying client
//! - [`engine`] — run loop, execution state, status bus and sinks
//! - [`manual`] — one-shot manual control and emergency stop
//! - [`arbitration`] — single-owner endpoint lock
//! - [`link`] — shared reachability flag
//! - [`config`] — endpoint configuration
//! - [`telemetry`] — tracing subscriber setup

pub mod actuator;
pub mod arbitration;
pub mod blocks;
pub mod compiler;
pub mod config;
pub mod engine;
pub mod link;
pub mod manual;
pub mod program;
pub mod telemetry;
