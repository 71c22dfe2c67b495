//! # list-export
//!
//! Finds repeating lists on a web page (search results, product grids, feeds)
//! and exports every item as a cropped screenshot plus a row of text.
//!
//! ## Features
//!
//! - **Detection**: groups sibling elements of the same kind and ranks the groups by size
//! - **Harvesting**: pulls named text fields (titles, data attributes, links, alt text) out of each item
//! - **Capture**: scrolls each item into view, screenshots the viewport and crops the item out, with retry and backoff
//! - **Export**: writes a CSV index plus one JPEG per item, as a zip file or a directory
//!
//! ## Library Usage
//!
//! ```rust,no_run
//! use list_export::{BrowserSession, CaptureConfig, CapturePipeline, ContentAgent, ContentClient,
//!                   LaunchOptions, LocalChannel, ZipSink};
//! use std::sync::Arc;
//!
//! # async fn run() -> list_export::Result<()> {
//! let session = BrowserSession::launch(LaunchOptions::default())?;
//! session.open("https://example.com/search?q=rust")?;
//!
//! let page = session.page();
//! let capture = page.capture_resource();
//! let agent = Arc::new(ContentAgent::new(page, CaptureConfig::default()));
//! let client = ContentClient::new(LocalChannel::new(agent));
//!
//! let groups = client.scan().await?;
//! println!("Largest group: {} items", groups[0].count);
//!
//! let mut pipeline = CapturePipeline::new(client, capture, CaptureConfig::default());
//! let mut sink = ZipSink::new("list_export.zip");
//! let report = pipeline
//!     .run(groups[0].id, &mut sink, |p| println!("{}/{}", p.current, p.total))
//!     .await?;
//! println!("{} captured, {} failed", report.captured, report.failed);
//! # Ok(())
//! # }
//! ```
//!
//! ## Offline Scans
//!
//! A serialized [`DomTree`] can be scanned without a browser through
//! [`StaticPage`]:
//!
//! ```rust
//! use list_export::{DomTree, ElementNode, detect};
//!
//! let items = (0..3).map(|i| ElementNode::new("LI").with_text(format!("Item {}", i))).collect();
//! let tree = DomTree::new(ElementNode::new("BODY").with_children(vec![
//!     ElementNode::new("UL").with_children(items),
//! ]));
//!
//! let groups = detect::detect(&tree);
//! assert_eq!(groups[0].count, 3);
//! ```
//!
//! ## Module Overview
//!
//! - [`dom`]: element tree, node paths and extraction from a live tab
//! - [`detect`]: list-pattern detection and ranking
//! - [`harvest`]: per-item field extraction
//! - [`session`]: state of the latest scan
//! - [`page`]: tree access adapter ([`Page`]) and its in-memory implementation
//! - [`actions`]: request handlers served by the agent
//! - [`agent`]: page-side agent, channel and typed client
//! - [`capture`]: capture pipeline, cropping, retry and archive output
//! - [`browser`]: Chrome session and the Chrome-backed page
//! - [`error`]: Error types and result aliases

pub mod actions;
pub mod agent;
pub mod browser;
pub mod capture;
pub mod detect;
pub mod dom;
pub mod error;
pub mod harvest;
pub mod page;
pub mod session;

pub use actions::{Action, ActionRegistry, ActionResult, PreparedItem};
pub use agent::{Channel, ContentAgent, ContentClient, GroupHarvest, LocalChannel};
pub use browser::{BrowserSession, ChromeCapture, ChromePage, ConnectionOptions, LaunchOptions};
pub use capture::{
    ArchiveSink, CaptureConfig, CaptureFailure, CapturePipeline, CaptureResource, DirectorySink, ExportProgress,
    ExportReport, ExportStatus, MemorySink, ZipSink,
};
pub use detect::{ItemGroup, ItemGroupSummary};
pub use dom::{BoundingBox, DomTree, ElementNode, NodeRef};
pub use error::{ExportError, Result};
pub use harvest::FieldRecord;
pub use page::{Page, ScrollBehavior, StaticPage};
pub use session::ScanSession;
