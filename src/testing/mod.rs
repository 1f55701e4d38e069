//! Testing utilities for the webhook service
//!
//! - In-process HTTP scenarios with a simulated peer address
//! - Signed payment fixtures
//! - A ready-made test router keyed with [`TEST_SECRET`]

mod fixtures;
mod scenario;

pub use fixtures::{TEST_SECRET, TestPayment, fake};
pub use scenario::{SIGNATURE_HEADER, Scenario, ScenarioAssert, get, post};

use crate::{App, ConfigBuilder};
use axum::Router;

/// Config builder preloaded with [`TEST_SECRET`] and default settings
pub fn test_config() -> ConfigBuilder {
    ConfigBuilder::new().with_secret_key(TEST_SECRET)
}

/// Router for the full service with default settings
///
/// Must be called inside a Tokio runtime.
pub fn test_app() -> Router {
    let config = test_config().build().unwrap();
    App::with_config(config).unwrap().into_test_router()
}
