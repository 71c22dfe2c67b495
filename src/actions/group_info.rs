use crate::actions::{Action, ActionContext, ActionResult};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupInfoParams {
    pub group_id: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
    pub count: usize,
}

/// Report how many items a group has
#[derive(Default)]
pub struct GroupInfoAction;

#[async_trait]
impl Action for GroupInfoAction {
    type Params = GroupInfoParams;

    fn name(&self) -> &str {
        "GROUP_INFO"
    }

    async fn execute_typed(&self, params: GroupInfoParams, context: &ActionContext<'_>) -> Result<ActionResult> {
        let info = GroupInfo {
            count: context.session().group(params.group_id)?.len(),
        };
        Ok(ActionResult::success_with(serde_json::to_value(&info)?))
    }
}
