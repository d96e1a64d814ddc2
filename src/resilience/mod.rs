//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Supervised listener exits:
//!     → policy.rs (fixed interval or exponential backoff, optional cap)
//!     → backoff.rs (jittered exponential delay)
//!     → supervisor sleeps, then relaunches
//! ```

pub mod backoff;
pub mod policy;

pub use policy::{ExponentialBackoff, FixedInterval, RetryPolicy};
