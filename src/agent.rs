//! Page-side agent and the request/response channel to it
//!
//! [`ContentAgent`] lives next to the page and answers requests. Callers reach
//! it through a [`Channel`], which is opaque: requests and responses are plain
//! JSON. [`ContentClient`] wraps a channel with typed methods.

use crate::actions::{
    ActionContext, ActionErrorKind, ActionRegistry, ActionResult, GroupInfo, PreparedItem,
};
use crate::capture::CaptureConfig;
use crate::detect::ItemGroupSummary;
use crate::error::{ExportError, Result};
use crate::harvest::FieldRecord;
use crate::page::Page;
use crate::session::ScanSession;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

/// Owns the page, the scan session and the action registry
pub struct ContentAgent<P: Page> {
    page: P,
    session: Mutex<ScanSession>,
    registry: ActionRegistry,
    config: CaptureConfig,
}

impl<P: Page> ContentAgent<P> {
    pub fn new(page: P, config: CaptureConfig) -> Self {
        Self {
            page,
            session: Mutex::new(ScanSession::new()),
            registry: ActionRegistry::with_defaults(),
            config,
        }
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    /// Answer one message; failures are reported in the result, never raised
    pub async fn handle(&self, message: Value) -> ActionResult {
        let context = ActionContext::new(&self.page, &self.session, &self.config);
        match self.registry.dispatch(message, &context).await {
            Ok(result) => result,
            Err(e) => {
                if e.is_not_found() {
                    log::debug!("Request failed: {}", e);
                } else {
                    log::warn!("Request failed: {}", e);
                }
                ActionResult::failure((&e).into())
            }
        }
    }
}

/// Request/response transport to a [`ContentAgent`]
#[async_trait]
pub trait Channel: Send + Sync {
    /// Deliver `message` and wait for its response
    ///
    /// An `Err` means the transport itself failed, not the action.
    async fn send(&self, message: Value) -> Result<ActionResult>;
}

#[async_trait]
impl<C: Channel + ?Sized> Channel for Box<C> {
    async fn send(&self, message: Value) -> Result<ActionResult> {
        (**self).send(message).await
    }
}

/// Channel to an agent in the same process
pub struct LocalChannel<P: Page> {
    agent: Arc<ContentAgent<P>>,
}

impl<P: Page> LocalChannel<P> {
    pub fn new(agent: Arc<ContentAgent<P>>) -> Self {
        Self { agent }
    }
}

impl<P: Page> Clone for LocalChannel<P> {
    fn clone(&self) -> Self {
        Self {
            agent: Arc::clone(&self.agent),
        }
    }
}

#[async_trait]
impl<P: Page> Channel for LocalChannel<P> {
    async fn send(&self, message: Value) -> Result<ActionResult> {
        Ok(self.agent.handle(message).await)
    }
}

/// Typed requests over a [`Channel`]
pub struct ContentClient<C: Channel> {
    channel: C,
}

#[derive(Deserialize)]
struct ScanResponse {
    groups: Vec<ItemGroupSummary>,
}

#[derive(Deserialize)]
struct SchemaResponse {
    fields: Vec<String>,
}

/// Schema and records of every item in a group
#[derive(Debug, Clone, PartialEq)]
pub struct GroupHarvest {
    pub fields: Vec<String>,
    pub records: Vec<FieldRecord>,
}

impl<C: Channel> ContentClient<C> {
    pub fn new(channel: C) -> Self {
        Self { channel }
    }

    pub async fn scan(&self) -> Result<Vec<ItemGroupSummary>> {
        let response: ScanResponse = self.request(json!({ "action": "SCAN" }), None).await?;
        Ok(response.groups)
    }

    pub async fn highlight(&self, group_id: usize) -> Result<()> {
        self.acknowledge(json!({ "action": "HIGHLIGHT", "id": group_id })).await
    }

    pub async fn clear_highlight(&self) -> Result<()> {
        self.acknowledge(json!({ "action": "CLEAR_HIGHLIGHT" })).await
    }

    pub async fn group_info(&self, group_id: usize) -> Result<GroupInfo> {
        self.request(json!({ "action": "GROUP_INFO", "group_id": group_id }), Some((group_id, None)))
            .await
    }

    pub async fn prepare_item(&self, group_id: usize, index: usize) -> Result<PreparedItem> {
        self.request(
            json!({ "action": "PREPARE_ITEM", "group_id": group_id, "index": index }),
            Some((group_id, Some(index))),
        )
        .await
    }

    pub async fn harvest_item(&self, group_id: usize, index: usize) -> Result<FieldRecord> {
        self.request(
            json!({ "action": "HARVEST_ITEM", "group_id": group_id, "index": index }),
            Some((group_id, Some(index))),
        )
        .await
    }

    pub async fn harvest_schema(&self, group_id: usize) -> Result<Vec<String>> {
        let response: SchemaResponse = self
            .request(json!({ "action": "HARVEST_SCHEMA", "group_id": group_id }), Some((group_id, None)))
            .await?;
        Ok(response.fields)
    }

    /// Schema plus every item's record, without any screenshots
    pub async fn harvest_group(&self, group_id: usize) -> Result<GroupHarvest> {
        let fields = self.harvest_schema(group_id).await?;
        let count = self.group_info(group_id).await?.count;

        let mut records = Vec::with_capacity(count);
        for index in 0..count {
            records.push(self.harvest_item(group_id, index).await?);
        }
        Ok(GroupHarvest { fields, records })
    }

    async fn acknowledge(&self, message: Value) -> Result<()> {
        let name = message["action"].as_str().unwrap_or_default().to_string();
        let result = self.channel.send(message).await?;
        check(&name, &result, None)
    }

    /// Send `message` and decode its data; `target` maps not-found failures
    /// back to the group/item that was asked for
    async fn request<T: DeserializeOwned>(
        &self,
        message: Value,
        target: Option<(usize, Option<usize>)>,
    ) -> Result<T> {
        let name = message["action"].as_str().unwrap_or_default().to_string();
        let result = self.channel.send(message).await?;
        check(&name, &result, target)?;

        let data = result.data.unwrap_or(Value::Null);
        serde_json::from_value(data).map_err(|e| ExportError::ChannelFailed(format!("Malformed {} response: {}", name, e)))
    }
}

fn check(name: &str, result: &ActionResult, target: Option<(usize, Option<usize>)>) -> Result<()> {
    if result.success {
        return Ok(());
    }

    let Some(error) = &result.error else {
        return Err(ExportError::ActionFailed {
            action: name.to_string(),
            reason: "Unknown error".to_string(),
        });
    };

    match (error.kind, target) {
        (ActionErrorKind::GroupNotFound, Some((group_id, _))) => Err(ExportError::GroupNotFound(group_id)),
        (ActionErrorKind::ItemNotFound, Some((group_id, Some(index)))) => {
            Err(ExportError::ItemNotFound { group_id, index })
        }
        (ActionErrorKind::InvalidRequest, _) => Err(ExportError::InvalidMessage(error.message.clone())),
        _ => Err(ExportError::ActionFailed {
            action: name.to_string(),
            reason: error.message.clone(),
        }),
    }
}
