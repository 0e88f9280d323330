//! Structured logging for modhost.
//!
//! Sets up console and rolling NDJSON output, and provides the default bus
//! error interceptor that records failed listeners with redacted payloads.

pub mod interceptor;
pub mod logger;
pub mod redact;

pub use interceptor::{ListenerFailureRecord, LoggingInterceptor};
pub use logger::init_logger;
pub use redact::{redact_sensitive_data, redact_value};
