pub mod http;
pub mod logger;

pub use http::HttpHandler;
pub use logger::{init_logger, LogContext, TimedOperation};
