//! Shared building blocks for both sides of the `SendService` contract.
//!
//! - [`proto`] - Generated Protobuf messages, client and server stubs.
//! - [`envelope`] - Construction helpers for [`proto::Envelope`] and
//!   [`proto::AggregateResponse`].
//! - [`validate`] - The login validator every server handler runs.
//! - [`error`] - The error taxonomy shared by client adapters and handlers.
//! - [`types`] - Wire constants (greeting marker, terminator, login pattern).

pub mod envelope;
pub mod error;
pub mod types;
pub mod validate;

pub use error::*;

/// gRPC service and message definitions generated from
/// `proto/sendwire.proto`.
///
/// ## Service
///
/// - `Call` - unary.
/// - `GetStream` - server streaming.
/// - `PutStream` - client streaming.
/// - `StreamCall` - bidirectional streaming.
///
/// ## Messages
///
/// - [`Envelope`](proto::Envelope) - request id, creation timestamp and an
///   optional login. An unset login is how a missing payload travels on the
///   wire.
/// - [`AggregateResponse`](proto::AggregateResponse) - ordered list of message
///   fragments.
pub mod proto {
    tonic::include_proto!("sendwire");

    /// Encoded `FileDescriptorSet` used to serve gRPC reflection.
    pub const FILE_DESCRIPTOR_SET: &[u8] =
        tonic::include_file_descriptor_set!("sendwire_descriptor");
}
