//! Utility modules for web and DOM operations.
//!
//! Provides:
//! - [`dom`] - Window, document and history access
//! - [`WebHttpClient`] - Fetch API transport for the publisher backend

pub mod dom;
mod fetch;

pub use fetch::WebHttpClient;
