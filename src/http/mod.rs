//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout, tracing)
//!     → interceptor.rs (identity, limiters, inspection, brute-force guard)
//!     → request.rs (peek at login body, preserve it)
//!     → upstream.rs (forward to the wrapped application)
//!     → response.rs (structured rejections)
//!     → Send to client
//! ```

pub mod interceptor;
pub mod request;
pub mod response;
pub mod server;
pub mod upstream;

pub use interceptor::{intercept, protect};
pub use request::{UuidRequestId, X_REQUEST_ID};
pub use response::{DownstreamFault, ErrorBody, Rejection};
pub use server::{HttpServer, ServerError};
pub use upstream::Upstream;
