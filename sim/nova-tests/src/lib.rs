//! Integration scenarios for Nova Physics.
//!
//! This crate has no library code. The scenarios live in the `integration`
//! test target and exercise the engine crates together through a `Space`.
