use crate::actions::{Action, ActionContext, ActionResult};
use crate::error::{ExportError, Result};
use crate::harvest;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestItemParams {
    pub group_id: usize,
    pub index: usize,
}

/// Extract the flat field record of one item
#[derive(Default)]
pub struct HarvestItemAction;

#[async_trait]
impl Action for HarvestItemAction {
    type Params = HarvestItemParams;

    fn name(&self) -> &str {
        "HARVEST_ITEM"
    }

    async fn execute_typed(&self, params: HarvestItemParams, context: &ActionContext<'_>) -> Result<ActionResult> {
        let record = {
            let session = context.session();
            let item = session.item_node(params.group_id, params.index)?;
            let tree = session.tree().ok_or(ExportError::GroupNotFound(params.group_id))?;
            harvest::harvest(tree, item)
        };
        Ok(ActionResult::success_with(serde_json::to_value(&record)?))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestSchemaParams {
    pub group_id: usize,
}

/// Every field name any item of the group produces
#[derive(Default)]
pub struct HarvestSchemaAction;

#[async_trait]
impl Action for HarvestSchemaAction {
    type Params = HarvestSchemaParams;

    fn name(&self) -> &str {
        "HARVEST_SCHEMA"
    }

    async fn execute_typed(&self, params: HarvestSchemaParams, context: &ActionContext<'_>) -> Result<ActionResult> {
        let fields = {
            let session = context.session();
            let group = session.group(params.group_id)?;
            let tree = session.tree().ok_or(ExportError::GroupNotFound(params.group_id))?;
            harvest::harvest_group_keys(tree, group)
        };
        Ok(ActionResult::success_with(serde_json::json!({ "fields": fields })))
    }
}
