//! Turn runtime
//!
//! Drives requests against a transport and folds their events into a
//! conversation store.

mod driver;

#[cfg(test)]
pub mod testing;

pub use driver::{TurnDriver, TurnError, TurnOutcome, TurnPhase, TurnSettings};
