//! Per-call state machines for the streaming handlers and the async drivers
//! that feed them from a `tonic` stream.
//!
//! - [`sink`] - [`ClientStreamSink`](sink::ClientStreamSink): validates and
//!   accumulates a client stream into one aggregate response.
//! - [`echo`] - [`TurnBasedEcho`](echo::TurnBasedEcho): answers every valid
//!   item of a bidirectional stream with a sequence-numbered response.
//! - [`coordinator`] - Drives either machine from an inbound stream, honours
//!   shutdown, and forwards output to the response channel.
//!
//! Both machines are owned by exactly one call task; nothing in here is
//! shared across calls.

pub mod coordinator;
pub mod echo;
pub mod sink;

/// Lifecycle of a streaming handler.
///
/// ```text
/// Idle -> Receiving -> {Accumulating | Emitting} -> (Error | Completed)
/// ```
///
/// `Error` and `Completed` are terminal: a machine in either phase refuses
/// every further event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Created, stream not opened yet.
    Idle,
    /// Stream opened, no item processed yet.
    Receiving,
    /// The client-stream sink holds at least one validated item.
    Accumulating,
    /// The turn-based echo has emitted at least one response.
    Emitting,
    /// The call failed; nothing more is processed.
    Error,
    /// The inbound stream completed and the outbound side was finished.
    Completed,
}

impl Phase {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Error | Self::Completed)
    }
}
