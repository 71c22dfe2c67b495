//! Request handlers for the page-side agent
//!
//! Every request the agent understands is an [`Action`] with typed parameters.
//! The [`ActionRegistry`] routes JSON messages of the form
//! `{"action": "NAME", ...params}` to the matching action.

pub mod group_info;
pub mod harvest;
pub mod highlight;
pub mod prepare;
pub mod scan;

pub use group_info::{GroupInfo, GroupInfoAction, GroupInfoParams};
pub use harvest::{HarvestItemAction, HarvestItemParams, HarvestSchemaAction, HarvestSchemaParams};
pub use highlight::{ClearHighlightAction, ClearHighlightParams, HighlightAction, HighlightParams};
pub use prepare::{PrepareItemAction, PrepareItemParams, PreparedItem};
pub use scan::{ScanAction, ScanParams};

use crate::capture::CaptureConfig;
use crate::error::{ExportError, Result};
use crate::page::Page;
use crate::session::ScanSession;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Everything an action may touch
pub struct ActionContext<'a> {
    pub page: &'a dyn Page,
    session: &'a Mutex<ScanSession>,
    pub config: &'a CaptureConfig,
}

impl<'a> ActionContext<'a> {
    pub fn new(page: &'a dyn Page, session: &'a Mutex<ScanSession>, config: &'a CaptureConfig) -> Self {
        Self { page, session, config }
    }

    /// Lock the scan session; never hold the guard across an `.await`
    pub fn session(&self) -> MutexGuard<'a, ScanSession> {
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Classification of a failed action, carried across the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionErrorKind {
    GroupNotFound,
    ItemNotFound,
    InvalidRequest,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionError {
    pub kind: ActionErrorKind,
    pub message: String,
}

impl From<&ExportError> for ActionError {
    fn from(err: &ExportError) -> Self {
        let kind = match err {
            ExportError::GroupNotFound(_) => ActionErrorKind::GroupNotFound,
            ExportError::ItemNotFound { .. } => ActionErrorKind::ItemNotFound,
            ExportError::InvalidMessage(_) | ExportError::UnknownAction(_) => ActionErrorKind::InvalidRequest,
            _ => ActionErrorKind::Failed,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

/// Response to one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ActionError>,
}

impl ActionResult {
    /// Plain acknowledgment
    pub fn success() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }

    pub fn success_with(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: ActionError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

/// A request handler with typed parameters
#[async_trait]
pub trait Action: Send + Sync {
    type Params: DeserializeOwned + Send;

    /// Message name this action answers to
    fn name(&self) -> &str;

    async fn execute_typed(&self, params: Self::Params, context: &ActionContext<'_>) -> Result<ActionResult>;
}

/// Object-safe form of [`Action`] taking raw JSON parameters
#[async_trait]
pub trait DynAction: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(&self, params: Value, context: &ActionContext<'_>) -> Result<ActionResult>;
}

#[async_trait]
impl<T: Action> DynAction for T {
    fn name(&self) -> &str {
        Action::name(self)
    }

    async fn execute(&self, params: Value, context: &ActionContext<'_>) -> Result<ActionResult> {
        let params: T::Params = serde_json::from_value(params)
            .map_err(|e| ExportError::InvalidMessage(format!("{}: {}", Action::name(self), e)))?;
        self.execute_typed(params, context).await
    }
}

/// Routes requests to actions by name
#[derive(Default)]
pub struct ActionRegistry {
    actions: HashMap<String, Box<dyn DynAction>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in action
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(ScanAction);
        registry.register(HighlightAction);
        registry.register(ClearHighlightAction);
        registry.register(PrepareItemAction);
        registry.register(HarvestItemAction);
        registry.register(HarvestSchemaAction);
        registry.register(GroupInfoAction);
        registry
    }

    pub fn register<A: Action + 'static>(&mut self, action: A) {
        self.actions.insert(Action::name(&action).to_string(), Box::new(action));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    /// Run the action `name` with raw parameters
    pub async fn execute(&self, name: &str, params: Value, context: &ActionContext<'_>) -> Result<ActionResult> {
        let action = self
            .actions
            .get(name)
            .ok_or_else(|| ExportError::UnknownAction(name.to_string()))?;
        action.execute(params, context).await
    }

    /// Route a full message, reading the action name from its `action` field
    pub async fn dispatch(&self, message: Value, context: &ActionContext<'_>) -> Result<ActionResult> {
        let (name, params) = split_message(message)?;
        self.execute(&name, params, context).await
    }
}

/// Split `{"action": NAME, ...rest}` into the name and the remaining object
pub fn split_message(message: Value) -> Result<(String, Value)> {
    let Value::Object(mut fields) = message else {
        return Err(ExportError::InvalidMessage("message must be a JSON object".to_string()));
    };
    let name = match fields.remove("action") {
        Some(Value::String(name)) => name,
        _ => return Err(ExportError::InvalidMessage("missing 'action' field".to_string())),
    };
    Ok((name, Value::Object(fields)))
}
