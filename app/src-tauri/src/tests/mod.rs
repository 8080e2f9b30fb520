//! Scenario tests driving the shell through fakes.

pub mod fakes;
