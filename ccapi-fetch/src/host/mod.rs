//! Host APIs for the request layer.
//!
//! - [`http`] - HTTP transport seam and its reqwest implementation

pub mod http;

// Re-export key types
pub use http::{HttpClient, HttpRequest, HttpResponse, Transport};
