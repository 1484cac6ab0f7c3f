//! Core process-supervision primitives for fleetd: a bounded ring buffer of
//! child output, trailing-line reassembly across stream reads, a
//! backpressured live-subscriber fan-out, and the `ProcessSupervisor` /
//! `Registry` types that tie them to an actual spawned child.
//!
//! Transport (HTTP/WebSocket, auth, JSON encoding) lives in `fleetd-client-api`.

pub mod error;
pub mod line_assembler;
pub mod log_record;
pub mod registry;
pub mod ring_buffer;
pub mod subscriber;
pub mod supervisor;

pub use error::SupervisorError;
pub use log_record::{LogRecord, StreamKind};
pub use registry::Registry;
pub use ring_buffer::RingBuffer;
pub use subscriber::{SubscriberId, SubscriberSet};
pub use supervisor::{ProcessSupervisor, StatusSnapshot, Subscription};
