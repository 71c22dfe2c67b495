//! Chrome-backed page and capture source

pub mod config;
pub mod page;
pub mod session;

pub use config::{ConnectionOptions, LaunchOptions};
pub use page::{ChromeCapture, ChromePage};
pub use session::BrowserSession;
