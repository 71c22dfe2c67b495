use crate::actions::{Action, ActionContext, ActionResult};
use crate::error::Result;
use crate::page::ScrollBehavior;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighlightParams {
    /// Group to highlight
    pub id: usize,
}

/// Outline every item of a group and scroll its first item into view
///
/// The previous highlight is always reverted first. An unknown id leaves the
/// page without any highlight.
#[derive(Default)]
pub struct HighlightAction;

#[async_trait]
impl Action for HighlightAction {
    type Params = HighlightParams;

    fn name(&self) -> &str {
        "HIGHLIGHT"
    }

    async fn execute_typed(&self, params: HighlightParams, context: &ActionContext<'_>) -> Result<ActionResult> {
        revert_highlight(context).await?;

        let items = {
            let mut session = context.session();
            if let Err(e) = session.set_highlight(params.id) {
                log::warn!("Not highlighting: {}", e);
                return Ok(ActionResult::success());
            }
            session.group(params.id)?.items.clone()
        };

        context
            .page
            .set_outline(&items, Some(context.config.highlight_outline.as_str()))
            .await?;
        if let Some(first) = items.first() {
            context.page.scroll_into_view(first, ScrollBehavior::Smooth).await?;
        }

        log::debug!("Highlighted group {} ({} items)", params.id, items.len());
        Ok(ActionResult::success())
    }
}

/// Revert the outlines of the highlighted group, if any
///
/// The highlight stays recorded when reverting fails, so a later attempt
/// still knows what to undo.
pub(crate) async fn revert_highlight(context: &ActionContext<'_>) -> Result<()> {
    let previous = context
        .session()
        .highlighted()
        .map(|group| (group.id, group.items.clone()));

    if let Some((id, items)) = previous {
        context.page.set_outline(&items, None).await?;
        context.session().release_highlight(id);
        log::debug!("Cleared highlight of group {}", id);
    }
    Ok(())
}

/// Parameters for clearing the highlight (no parameters needed)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClearHighlightParams {}

/// Revert the active highlight; a no-op when nothing is highlighted
#[derive(Default)]
pub struct ClearHighlightAction;

#[async_trait]
impl Action for ClearHighlightAction {
    type Params = ClearHighlightParams;

    fn name(&self) -> &str {
        "CLEAR_HIGHLIGHT"
    }

    async fn execute_typed(&self, _params: ClearHighlightParams, context: &ActionContext<'_>) -> Result<ActionResult> {
        revert_highlight(context).await?;
        Ok(ActionResult::success())
    }
}
