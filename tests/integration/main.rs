//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem (or,
//! for the drive-loop test, all three together) against simulation
//! adapters. All tests run on the host with no real hardware required.

mod drive_loop_tests;
