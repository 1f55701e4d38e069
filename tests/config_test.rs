//! Environment-driven configuration
//!
//! Everything runs in one test: the process environment is shared between
//! threads of the test binary.

use std::net::IpAddr;
use std::time::Duration;
use yaya_webhook::{ConfigBuilder, WebhookError};

const KEYS: [&str; 8] = [
    "YAYA_SECRET_KEY",
    "YAYA_PORT",
    "YAYA_ALLOWED_IPS",
    "YAYA_REPLAY_TOLERANCE_SECONDS",
    "YAYA_SIGNING_ENDPOINT_ENABLED",
    "YAYA_TRUST_PROXY",
    "YAYA_SIGNATURE_HEADER",
    "YAYA_DISPATCH_QUEUE_CAPACITY",
];

fn clear() {
    for key in KEYS {
        unsafe { std::env::remove_var(key) };
    }
}

#[test]
fn test_config_from_env() {
    clear();
    unsafe {
        std::env::set_var("YAYA_SECRET_KEY", "from-env");
        std::env::set_var("YAYA_PORT", "8080");
        std::env::set_var("YAYA_ALLOWED_IPS", "10.0.0.1, ::1");
        std::env::set_var("YAYA_REPLAY_TOLERANCE_SECONDS", "60");
        std::env::set_var("YAYA_SIGNING_ENDPOINT_ENABLED", "false");
        std::env::set_var("YAYA_TRUST_PROXY", "true");
        std::env::set_var("YAYA_SIGNATURE_HEADER", "x-yaya-signature");
        std::env::set_var("YAYA_DISPATCH_QUEUE_CAPACITY", "16");
    }

    let config = ConfigBuilder::new().from_env().build().unwrap();
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.webhook.secret_bytes().unwrap(), b"from-env");
    assert_eq!(config.webhook.replay_tolerance(), Duration::from_secs(60));
    assert!(!config.webhook.signing_endpoint_enabled);
    assert!(config.webhook.trust_proxy);
    assert_eq!(config.webhook.signature_header, "x-yaya-signature");
    assert_eq!(config.webhook.dispatch_queue_capacity, 16);

    let allowlist = config.webhook.allowlist();
    assert_eq!(allowlist.len(), 2);
    assert!(allowlist.contains("10.0.0.1".parse::<IpAddr>().unwrap()));
    assert!(!allowlist.contains("127.0.0.1".parse::<IpAddr>().unwrap()));

    // The secret is never printed.
    assert!(!format!("{:?}", config).contains("from-env"));

    // Unparseable values surface as configuration errors.
    unsafe { std::env::set_var("YAYA_PORT", "not-a-port") };
    let err = ConfigBuilder::new().from_env().build().unwrap_err();
    assert!(matches!(err, WebhookError::Config(_)));
    assert!(err.to_string().contains("PORT"));
    unsafe { std::env::set_var("YAYA_PORT", "8080") };

    unsafe { std::env::set_var("YAYA_ALLOWED_IPS", "10.0.0.1,not-an-ip") };
    let err = ConfigBuilder::new().from_env().build().unwrap_err();
    assert!(matches!(err, WebhookError::Config(_)));

    clear();
}
