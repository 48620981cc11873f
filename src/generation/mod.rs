//! Request builder - caller requests and outbound payloads

pub mod payload;
pub mod request;

pub use payload::{ReferenceImages, ResponseFormat, SequentialMode, SequentialOptions, UpstreamPayload};
pub use request::{GenerationRequest, ImageSize};
