//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Request (method, path)
//!     → classifier.rs (normalize path, match auth patterns)
//!     → RouteClass::{General, Auth, Login}
//!     → interceptor picks which checks run
//! ```
//!
//! # Design Decisions
//! - Path matching is case-insensitive (normalized lower-case)
//! - The login route is a subset of the auth routes

pub mod classifier;

pub use classifier::{normalize_path, RouteClass, RouteClassifier};
