//! Wire shapes for the `/ws/video` channel.

pub mod inbound;
pub mod outbound;

pub use inbound::{Age, BenchmarkReport, InboundEvent, PredictionSnapshot, PLACEHOLDER};
pub use outbound::ControlMessage;
