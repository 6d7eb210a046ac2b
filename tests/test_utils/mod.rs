//! Test Utilities and Mocks
//!
//! A scripted stand-in for the FriCAS process plus helpers to drive a
//! session over it, so no test needs a real FriCAS installation.

#![allow(dead_code)]

pub mod mock_process;

pub use fixtures::{output_text, pump_until_idle, test_config, test_session, test_session_with};
pub use mock_process::{MockFricas, MockHandle, MockOptions};
