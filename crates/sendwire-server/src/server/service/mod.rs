//! gRPC service implementation.
//!
//! - [`handler`] - `SendService` entry point ([`GreetingService`](handler::GreetingService)).

pub mod handler;
