//! Shared test utilities for the tapestry workspace.
//!
//! This crate provides:
//! - A mock rendering engine speaking the real wire protocol, either
//!   in-process over duplex pipes or as the `mock-engine` binary
//! - Request fixtures
//! - Approximate float assertions
//!
//! # Usage
//!
//! ```ignore
//! use test_utils::{MockEngine, sample_request};
//!
//! let pipes = MockEngine::new().spawn();
//! // hand pipes.stdin / pipes.stdout to the code under test
//! ```

pub mod fixtures;
pub mod mock_engine;

pub use fixtures::*;
pub use mock_engine::{MockEngine, MockEnginePipes, MockPayload};

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(0.5000001_f64, 0.5_f64, 1e-6); // passes
/// assert_approx_eq!(0.6_f64, 0.5_f64, 1e-6);       // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}
