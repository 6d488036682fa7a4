//! Transport to the hosted serverless functions that wrap the language model.

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::{FunctionsClient, FunctionsError};
