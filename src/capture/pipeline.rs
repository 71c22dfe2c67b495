use crate::agent::{Channel, ContentClient};
use crate::capture::archive::ArchiveSink;
use crate::capture::config::CaptureConfig;
use crate::capture::crop::{CropRect, crop_to_jpeg};
use crate::capture::export::ExportRecord;
use crate::capture::retry::{CaptureError, RetryPolicy, capture_with_retry, pause};
use crate::capture::CaptureResource;
use crate::error::{ExportError, Result};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

/// Emitted before each item is processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExportProgress {
    /// 1-based position of the item about to be processed
    pub current: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    Complete,
    /// Stopped early; the archive holds the rows processed until then
    Cancelled,
}

/// Outcome of a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    /// Items in the group
    pub total: usize,
    /// Rows with a stored image
    pub captured: usize,
    /// Rows whose crop had zero area
    pub empty: usize,
    /// Rows carrying an error sentinel
    pub failed: usize,
    pub status: ExportStatus,
}

impl ExportReport {
    /// Rows written to the index
    pub fn rows(&self) -> usize {
        self.captured + self.empty + self.failed
    }
}

enum ItemOutcome {
    Captured,
    Empty,
    Failed,
    Cancelled,
}

/// Exports every item of a group as a cropped screenshot plus a CSV row
///
/// Items are processed strictly one after another. The pipeline owns the
/// capture resource for the whole run so no two screenshots can overlap.
pub struct CapturePipeline<C: Channel, R: CaptureResource> {
    client: ContentClient<C>,
    resource: R,
    config: CaptureConfig,
    cancel: CancellationToken,
}

impl<C: Channel, R: CaptureResource> CapturePipeline<C, R> {
    pub fn new(client: ContentClient<C>, resource: R, config: CaptureConfig) -> Self {
        Self {
            client,
            resource,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Builder method: stop when `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn client(&self) -> &ContentClient<C> {
        &self.client
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Export group `group_id` into `sink`
    ///
    /// Every processed item yields exactly one row, whether or not its capture
    /// succeeded. Only an unknown group or a failing sink abort the run.
    pub async fn run<S, F>(&mut self, group_id: usize, sink: &mut S, mut on_progress: F) -> Result<ExportReport>
    where
        S: ArchiveSink + ?Sized,
        F: FnMut(ExportProgress),
    {
        let total = self.client.group_info(group_id).await?.count;
        log::info!("Exporting group {} ({} items)", group_id, total);

        // Outlines must not show up in the screenshots
        self.client.clear_highlight().await?;

        let policy = RetryPolicy::from(&self.config);
        let mut record = ExportRecord::new();
        let mut report = ExportReport {
            total,
            captured: 0,
            empty: 0,
            failed: 0,
            status: ExportStatus::Complete,
        };

        for index in 0..total {
            if self.cancel.is_cancelled() {
                report.status = ExportStatus::Cancelled;
                break;
            }

            on_progress(ExportProgress {
                current: index + 1,
                total,
            });

            match self.export_item(group_id, index, &policy, &mut record).await {
                ItemOutcome::Captured => report.captured += 1,
                ItemOutcome::Empty => report.empty += 1,
                ItemOutcome::Failed => report.failed += 1,
                ItemOutcome::Cancelled => {
                    report.status = ExportStatus::Cancelled;
                    break;
                }
            }

            if pause(self.config.throttle, &self.cancel).await {
                report.status = ExportStatus::Cancelled;
                break;
            }
        }

        if report.status == ExportStatus::Cancelled {
            log::warn!("Export cancelled after {} of {} items", record.len(), total);
        }

        let archive = record.into_archive().map_err(into_archive_failure)?;
        sink.write_archive(&archive).map_err(into_archive_failure)?;

        log::info!(
            "Export finished: {} captured, {} empty, {} failed",
            report.captured,
            report.empty,
            report.failed
        );
        Ok(report)
    }

    /// Position, capture and crop one item, recording exactly one row for it
    /// unless cancelled mid-capture
    async fn export_item(
        &mut self,
        group_id: usize,
        index: usize,
        policy: &RetryPolicy,
        record: &mut ExportRecord,
    ) -> ItemOutcome {
        let position = index + 1;

        let prepared = match self.client.prepare_item(group_id, index).await {
            Ok(prepared) => prepared,
            Err(e) => {
                log::warn!("Item {}: could not be prepared: {}", position, e);
                record.push_prepare_failure(position);
                return ItemOutcome::Failed;
            }
        };

        if !prepared.bounding_box.is_visible() {
            log::debug!("Item {}: has no visible area", position);
        }

        let screenshot = match capture_with_retry(&mut self.resource, policy, &self.cancel).await {
            Ok(bytes) => bytes,
            Err(CaptureError::Cancelled) => return ItemOutcome::Cancelled,
            Err(CaptureError::GaveUp { attempts, failure }) => {
                log::error!("Item {}: giving up after {} attempts: {}", position, attempts, failure);
                record.push_capture_failure(position);
                return ItemOutcome::Failed;
            }
        };

        let rect = CropRect::from_box(&prepared.bounding_box, prepared.scale_factor);
        if rect.is_empty() {
            record.push_empty(position, prepared.text);
            return ItemOutcome::Empty;
        }

        match crop_to_jpeg(&screenshot, rect, self.config.jpeg_quality) {
            Ok(jpeg) if jpeg.is_empty() => {
                log::debug!("Item {}: lies outside the captured viewport", position);
                record.push_empty(position, prepared.text);
                ItemOutcome::Empty
            }
            Ok(jpeg) => {
                record.push_captured(position, prepared.text, jpeg);
                ItemOutcome::Captured
            }
            Err(e) => {
                log::error!("Item {}: could not crop screenshot: {}", position, e);
                record.push_capture_failure(position);
                ItemOutcome::Failed
            }
        }
    }
}

fn into_archive_failure(err: ExportError) -> ExportError {
    match err {
        ExportError::ArchiveFailed(_) => err,
        other => ExportError::ArchiveFailed(other.to_string()),
    }
}
