//! Helpers shared by the unit tests, the integration tests and downstream crates.
pub mod testing;
