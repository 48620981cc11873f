//! Upstream module - the generation API trait and its HTTP client

pub mod http_upstream;
pub mod traits;

pub use http_upstream::HttpUpstream;
pub use traits::ImageUpstream;
