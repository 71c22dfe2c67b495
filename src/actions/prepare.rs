use crate::actions::{Action, ActionContext, ActionResult};
use crate::dom::BoundingBox;
use crate::error::Result;
use crate::page::ScrollBehavior;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareItemParams {
    pub group_id: usize,
    /// 0-based position within the group
    pub index: usize,
}

/// Geometry and text of an item, measured right before its capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedItem {
    /// Viewport coordinates after scrolling and settling
    pub bounding_box: BoundingBox,
    pub scale_factor: f64,
    /// Visible text on a single line; CSV quoting is left to the writer
    pub text: String,
    pub is_last: bool,
}

/// Scroll an item to the viewport center, let it settle, then measure it and
/// read its text
#[derive(Default)]
pub struct PrepareItemAction;

#[async_trait]
impl Action for PrepareItemAction {
    type Params = PrepareItemParams;

    fn name(&self) -> &str {
        "PREPARE_ITEM"
    }

    async fn execute_typed(&self, params: PrepareItemParams, context: &ActionContext<'_>) -> Result<ActionResult> {
        let (node, is_last) = {
            let session = context.session();
            let node = session.item(params.group_id, params.index)?.clone();
            let is_last = params.index + 1 >= session.group(params.group_id)?.len();
            (node, is_last)
        };

        context.page.scroll_into_view(&node, ScrollBehavior::Instant).await?;
        tokio::time::sleep(context.config.settle).await;

        // Read from the live element after the settle, not from the scan snapshot
        let bounding_box = context.page.bounding_box(&node).await?;
        let scale_factor = context.page.scale_factor().await?;
        let text = single_line(&context.page.inner_text(&node).await?);

        let prepared = PreparedItem {
            bounding_box,
            scale_factor,
            text,
            is_last,
        };
        Ok(ActionResult::success_with(serde_json::to_value(&prepared)?))
    }
}

fn single_line(text: &str) -> String {
    text.replace(['\n', '\r'], " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureConfig;
    use crate::dom::{DomTree, ElementNode, NodeRef};
    use crate::page::{Page, StaticPage};
    use crate::session::ScanSession;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    /// Records when the item was scrolled and when it was measured
    struct TimedPage {
        inner: StaticPage,
        scrolled: Mutex<Option<Instant>>,
        measured: Mutex<Option<Instant>>,
    }

    #[async_trait]
    impl Page for TimedPage {
        async fn snapshot(&self) -> Result<DomTree> {
            self.inner.snapshot().await
        }

        async fn scroll_into_view(&self, node: &NodeRef, behavior: ScrollBehavior) -> Result<()> {
            *self.scrolled.lock().unwrap() = Some(Instant::now());
            self.inner.scroll_into_view(node, behavior).await
        }

        async fn bounding_box(&self, node: &NodeRef) -> Result<BoundingBox> {
            *self.measured.lock().unwrap() = Some(Instant::now());
            self.inner.bounding_box(node).await
        }

        async fn inner_text(&self, node: &NodeRef) -> Result<String> {
            self.inner.inner_text(node).await
        }

        async fn scale_factor(&self) -> Result<f64> {
            self.inner.scale_factor().await
        }

        async fn set_outline(&self, nodes: &[NodeRef], outline: Option<&str>) -> Result<()> {
            self.inner.set_outline(nodes, outline).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_measures_only_after_settle() {
        let items = (0..3)
            .map(|i| {
                ElementNode::new("LI")
                    .with_text(format!("row {}", i))
                    .with_bounding_box(0.0, 30.0 * i as f64, 80.0, 20.0)
            })
            .collect();
        let page = TimedPage {
            inner: StaticPage::new(ElementNode::new("BODY").with_children(vec![
                ElementNode::new("UL").with_children(items),
            ])),
            scrolled: Mutex::new(None),
            measured: Mutex::new(None),
        };
        let session = Mutex::new(ScanSession::new());
        session.lock().unwrap().rescan(page.snapshot().await.unwrap());
        let config = CaptureConfig::default();
        let context = ActionContext::new(&page, &session, &config);

        let result = PrepareItemAction
            .execute_typed(PrepareItemParams { group_id: 0, index: 2 }, &context)
            .await
            .unwrap();
        assert!(result.success);

        let scrolled = page.scrolled.lock().unwrap().unwrap();
        let measured = page.measured.lock().unwrap().unwrap();
        let waited = measured - scrolled;
        assert!(waited >= Duration::from_millis(200), "measured after {:?}", waited);
        assert!(waited < Duration::from_millis(250), "measured after {:?}", waited);
    }

    #[test]
    fn test_single_line() {
        assert_eq!(single_line(" Name\nPrice \"5\"\r\n"), "Name Price \"5\"");
    }

    #[test]
    fn test_prepared_item_json_shape() {
        let item = PreparedItem {
            bounding_box: BoundingBox::new(1.0, 2.0, 3.0, 4.0),
            scale_factor: 2.0,
            text: "row".to_string(),
            is_last: true,
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["bounding_box"]["width"], 3.0);
        assert_eq!(value["is_last"], true);
    }
}
