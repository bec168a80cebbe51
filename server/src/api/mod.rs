//! API-facing types
//!
//! Services embedding the compiler return `ApiError` from axum handlers; it
//! converts from `FilterError` and `CatalogError` with `?` and renders as a
//! JSON error response. The CLI reports the same `ErrorBody` on stderr.

pub mod types;

pub use types::{ApiError, ErrorBody};
