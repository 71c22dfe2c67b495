use thiserror::Error;

/// Errors raised while scanning, harvesting or exporting a page
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Failed to connect to browser: {0}")]
    ConnectionFailed(String),

    #[error("Tab operation failed: {0}")]
    TabOperationFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("JavaScript evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("Failed to parse DOM: {0}")]
    DomParseFailed(String),

    /// The group id is not part of the current scan
    #[error("Group {0} not found")]
    GroupNotFound(usize),

    /// The group exists but has no item at this index
    #[error("Item {index} not found in group {group_id}")]
    ItemNotFound { group_id: usize, index: usize },

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Action '{action}' failed: {reason}")]
    ActionFailed { action: String, reason: String },

    #[error("Channel failure: {0}")]
    ChannelFailed(String),

    /// The export could not be assembled or written
    #[error("Failed to write archive: {0}")]
    ArchiveFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl ExportError {
    /// Whether the error means the requested group or item does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::GroupNotFound(_) | Self::ItemNotFound { .. })
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, ExportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(ExportError::GroupNotFound(3).is_not_found());
        assert!(ExportError::ItemNotFound { group_id: 0, index: 9 }.is_not_found());
        assert!(!ExportError::ArchiveFailed("disk full".to_string()).is_not_found());
    }

    #[test]
    fn test_error_messages() {
        let err = ExportError::ItemNotFound { group_id: 2, index: 7 };
        assert_eq!(err.to_string(), "Item 7 not found in group 2");

        let err = ExportError::ActionFailed {
            action: "PREPARE_ITEM".to_string(),
            reason: "detached node".to_string(),
        };
        assert_eq!(err.to_string(), "Action 'PREPARE_ITEM' failed: detached node");
    }
}
