//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises a slice of the firmware
//! against mock hardware.  All tests run on the host with no real
//! peripherals required.

mod app_service_tests;
mod config_store_tests;
mod mock_hw;
mod ranging_tests;
