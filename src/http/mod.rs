//! HTTP surface: route modules, handlers and extractors.

pub mod extract;
pub mod routes;
pub mod webhook;

pub use extract::ClientIp;
pub use routes::RouteModule;
pub use webhook::{SignatureResponse, WebhookModule};
