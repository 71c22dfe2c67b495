//! Access to the rendered page
//!
//! The detector and harvester only ever read a [`DomTree`] snapshot. Everything
//! that needs the live page (scrolling, geometry, outlines) goes through the
//! [`Page`] trait so the core never depends on a concrete host.

pub mod static_page;

pub use static_page::StaticPage;

use crate::dom::{BoundingBox, DomTree, NodeRef};
use crate::error::Result;
use async_trait::async_trait;

/// How a node is brought into view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    /// Jump immediately; used before measuring for a capture
    Instant,
    /// Animated scroll; used when showing a highlight
    Smooth,
}

impl ScrollBehavior {
    /// Value for the DOM `ScrollIntoViewOptions.behavior` field
    pub fn as_dom_value(&self) -> &'static str {
        match self {
            Self::Instant => "auto",
            Self::Smooth => "smooth",
        }
    }
}

/// Tree access adapter over a rendered document
///
/// `NodeRef`s passed in come from the most recent [`Page::snapshot`]. Node
/// operations read the live element, never the snapshot, and fail when the
/// element is gone.
#[async_trait]
pub trait Page: Send + Sync {
    /// Snapshot the current element tree
    async fn snapshot(&self) -> Result<DomTree>;

    /// Scroll `node` to the center of the viewport
    async fn scroll_into_view(&self, node: &NodeRef, behavior: ScrollBehavior) -> Result<()>;

    /// Current bounding box of `node` in viewport (CSS pixel) coordinates
    async fn bounding_box(&self, node: &NodeRef) -> Result<BoundingBox>;

    /// Current rendered text of `node`
    async fn inner_text(&self, node: &NodeRef) -> Result<String>;

    /// Device pixels per CSS pixel
    async fn scale_factor(&self) -> Result<f64>;

    /// Apply (`Some`) or revert (`None`) an outline on every node
    ///
    /// Applying remembers each node's own outline; reverting restores it.
    async fn set_outline(&self, nodes: &[NodeRef], outline: Option<&str>) -> Result<()>;
}
