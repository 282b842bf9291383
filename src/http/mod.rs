//! HTTP protocol layer module
//!
//! Provides HTTP protocol-related base functionality (validators, ranges,
//! MIME types, response builders) shared by the static file server and the
//! metadata API.

pub mod cache;
pub mod mime;
pub mod range;
pub mod response;

// Re-export commonly used types
pub use range::{parse_range_header, RangeParseResult};
pub use response::{
    build_403_response, build_404_response, build_405_response, build_413_response,
    build_416_response, build_500_response, build_health_response, build_options_response,
    HttpResponse,
};
