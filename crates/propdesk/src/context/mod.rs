//! Request-scoped context module.
//!
//! Provides the `RequestContext` extractor bundling the request id and the
//! acting user, complementing the application-scoped `AppState`.

mod extractor;
mod types;

pub use types::RequestContext;
