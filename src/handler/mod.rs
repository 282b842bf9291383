//! Request handler module
//!
//! Responsible for request routing dispatch and static application serving.
//! The metadata API lives in [`crate::metadata`].

pub mod router;
pub mod static_files;

// Re-export main entry point
pub use router::handle_request;
