//! Integration test driver for `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that drives the relay engine and the
//! relay service together against [`mock_hw`].  All tests run on the host
//! with no real hardware required.

mod intake_tests;
mod mock_hw;
mod scenario_tests;
