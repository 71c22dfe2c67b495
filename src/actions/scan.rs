use crate::actions::highlight::revert_highlight;
use crate::actions::{Action, ActionContext, ActionResult};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Parameters for scanning the page (no parameters needed)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanParams {}

/// Snapshot the page and detect item groups
///
/// Replaces every group of the previous scan. An active highlight is reverted
/// before the snapshot, while its nodes still resolve, so no outline outlives
/// the groups it belonged to.
#[derive(Default)]
pub struct ScanAction;

#[async_trait]
impl Action for ScanAction {
    type Params = ScanParams;

    fn name(&self) -> &str {
        "SCAN"
    }

    async fn execute_typed(&self, _params: ScanParams, context: &ActionContext<'_>) -> Result<ActionResult> {
        revert_highlight(context).await?;

        let tree = context.page.snapshot().await?;
        let summaries = context.session().rescan(tree);

        log::info!("Scan found {} groups", summaries.len());
        Ok(ActionResult::success_with(serde_json::json!({ "groups": summaries })))
    }
}
