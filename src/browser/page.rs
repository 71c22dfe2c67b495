use crate::capture::{CaptureFailure, CaptureResource};
use crate::dom::{self, BoundingBox, DomTree, NodeRef};
use crate::error::{ExportError, Result};
use crate::page::{Page, ScrollBehavior};
use async_trait::async_trait;
use headless_chrome::Tab;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// Resolves `(handle, selector)` to a live element, or `null`
///
/// Handles index the registry written by the last snapshot and only resolve
/// while the element is still attached. The selector is used only for nodes
/// without a handle.
const LOCATE_JS: &str = r#"function locate(handle, sel) {
    if (handle !== null) {
        const nodes = window.__listExportNodes;
        const el = nodes ? nodes[handle] : null;
        return el && el.isConnected ? el : null;
    }
    return document.querySelector(sel);
}"#;

/// [`Page`] backed by a live Chrome tab
///
/// Nodes are addressed through the handle recorded for them in the last
/// snapshot this page took. DevTools calls block, so each one runs on the
/// blocking thread pool.
#[derive(Clone)]
pub struct ChromePage {
    tab: Arc<Tab>,
    last_snapshot: Arc<Mutex<Option<DomTree>>>,
}

impl ChromePage {
    pub fn new(tab: Arc<Tab>) -> Self {
        Self {
            tab,
            last_snapshot: Arc::new(Mutex::new(None)),
        }
    }

    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }

    /// Screenshot source sharing this page's tab
    pub fn capture_resource(&self) -> ChromeCapture {
        ChromeCapture {
            tab: Arc::clone(&self.tab),
        }
    }

    async fn evaluate(&self, expression: String) -> Result<Value> {
        let tab = Arc::clone(&self.tab);
        let object = tokio::task::spawn_blocking(move || tab.evaluate(&expression, false))
            .await
            .map_err(|e| ExportError::EvaluationFailed(e.to_string()))?
            .map_err(|e| ExportError::EvaluationFailed(e.to_string()))?;
        Ok(object.value.unwrap_or(Value::Null))
    }

    /// JS arguments `handle, selector` addressing `node`
    fn locator(&self, node: &NodeRef) -> Result<String> {
        let handle = self
            .last_snapshot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .and_then(|tree| tree.get(node))
            .and_then(|element| element.handle);
        Ok(format!("{}, {}", serde_json::to_string(&handle)?, js_string(&node.css_selector())?))
    }

    /// Run `body` with `el` bound to the live element of `node`; `null` when it is gone
    async fn with_element(&self, node: &NodeRef, body: &str) -> Result<Value> {
        let js = format!(
            r#"(function(handle, sel) {{
                {}
                const el = locate(handle, sel);
                if (!el) return null;
                {}
            }})({})"#,
            LOCATE_JS,
            body,
            self.locator(node)?
        );
        self.evaluate(js).await
    }
}

/// Quote `value` as a JavaScript string literal
fn js_string(value: &str) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn missing(node: &NodeRef) -> ExportError {
    ExportError::EvaluationFailed(format!("Element '{}' is no longer in the page", node))
}

#[async_trait]
impl Page for ChromePage {
    async fn snapshot(&self) -> Result<DomTree> {
        let tab = Arc::clone(&self.tab);
        let tree = tokio::task::spawn_blocking(move || dom::extract_dom(&tab))
            .await
            .map_err(|e| ExportError::DomParseFailed(e.to_string()))??;

        *self.last_snapshot.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(tree.clone());
        Ok(tree)
    }

    async fn scroll_into_view(&self, node: &NodeRef, behavior: ScrollBehavior) -> Result<()> {
        let body = format!(
            "el.scrollIntoView({{ behavior: {}, block: 'center', inline: 'center' }}); return true;",
            js_string(behavior.as_dom_value())?
        );

        match self.with_element(node, &body).await? {
            Value::Bool(true) => Ok(()),
            _ => Err(missing(node)),
        }
    }

    async fn bounding_box(&self, node: &NodeRef) -> Result<BoundingBox> {
        let body = r#"const r = el.getBoundingClientRect();
                return JSON.stringify({ x: r.left, y: r.top, width: r.width, height: r.height });"#;

        match self.with_element(node, body).await? {
            Value::String(json) => Ok(serde_json::from_str(&json)?),
            _ => Err(missing(node)),
        }
    }

    async fn inner_text(&self, node: &NodeRef) -> Result<String> {
        match self.with_element(node, "return el.innerText || '';").await? {
            Value::String(text) => Ok(text),
            _ => Err(missing(node)),
        }
    }

    async fn scale_factor(&self) -> Result<f64> {
        self.evaluate("window.devicePixelRatio".to_string())
            .await?
            .as_f64()
            .ok_or_else(|| ExportError::EvaluationFailed("devicePixelRatio is not a number".to_string()))
    }

    async fn set_outline(&self, nodes: &[NodeRef], outline: Option<&str>) -> Result<()> {
        if nodes.is_empty() {
            return Ok(());
        }

        let targets = nodes
            .iter()
            .map(|node| self.locator(node).map(|args| format!("[{}]", args)))
            .collect::<Result<Vec<_>>>()?;
        let js = format!(
            r#"(function(targets, outline) {{
                {}
                const saved = window.__listExportOutlines || (window.__listExportOutlines = new Map());
                let missing = 0;
                for (const [handle, sel] of targets) {{
                    const el = locate(handle, sel);
                    if (!el) {{ missing++; continue; }}
                    if (outline !== null) {{
                        if (!saved.has(el)) saved.set(el, el.style.outline);
                        el.style.outline = outline;
                    }} else if (saved.has(el)) {{
                        el.style.outline = saved.get(el);
                        saved.delete(el);
                    }}
                }}
                return missing;
            }})([{}], {})"#,
            LOCATE_JS,
            targets.join(", "),
            serde_json::to_string(&outline)?
        );

        let missing = self.evaluate(js).await?.as_u64().unwrap_or(0);
        if missing > 0 {
            log::debug!("{} of {} outlined elements are no longer in the page", missing, nodes.len());
        }
        Ok(())
    }
}

/// Viewport screenshots of a Chrome tab
///
/// DevTools gives no rate-limit signal, so every failure is treated as
/// transient and left to the retry budget.
pub struct ChromeCapture {
    tab: Arc<Tab>,
}

#[async_trait]
impl CaptureResource for ChromeCapture {
    async fn capture_viewport(&mut self) -> std::result::Result<Vec<u8>, CaptureFailure> {
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || tab.capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true))
            .await
            .map_err(|e| CaptureFailure::Transient(e.to_string()))?
            .map_err(|e| CaptureFailure::Transient(e.to_string()))
    }
}
