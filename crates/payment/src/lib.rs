//! Payment handling.
//!
//! A charge is a decision, not a workflow: the processor evaluates the
//! amount, records the outcome as an event on the order's payment stream
//! and answers. No cross-stream coordination is needed; undoing a paid
//! order is the saga's job, not this crate's.

pub mod error;
pub mod processor;

pub use error::{PaymentError, Result};
pub use processor::{PaymentConfig, PaymentProcessor};
