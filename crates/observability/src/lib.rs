//! Tracing/logging setup shared by the binaries.

/// Logging configuration.
pub mod logging;

pub use logging::LogFormat;

/// Initialize process-wide logging, reading `LOG_FORMAT` and `RUST_LOG`.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    let format = LogFormat::parse(std::env::var("LOG_FORMAT").ok().as_deref());
    logging::init(format);
}
