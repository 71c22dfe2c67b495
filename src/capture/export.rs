use crate::capture::archive::ExportArchive;
use crate::error::{ExportError, Result};
use indexmap::IndexMap;
use std::io::Write;

/// Header of the tabular index
pub const CSV_HEADER: &str = "Index,Text,ImageFile";

/// Directory holding the per-item images inside the archive
pub const IMAGE_DIR: &str = "images";

/// Text written for items whose data could not be obtained
pub const ERROR_TEXT: &str = "ERROR";

/// Image cell for items that could not be positioned or measured
pub const PREPARE_FAILED: &str = "ERROR";

/// Image cell for items whose screenshot failed after all retries
pub const CAPTURE_FAILED: &str = "ERROR_CAPTURE";

/// Image cell for items whose crop had zero area
pub const EMPTY_IMAGE: &str = "EMPTY_IMAGE";

const BYTE_ORDER_MARK: &str = "\u{feff}";

/// Archive path of the image for the 1-based `index`
pub fn image_path(index: usize) -> String {
    format!("{}/image_{}.jpg", IMAGE_DIR, index)
}

/// What the ImageFile column holds for a row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageCell {
    /// Path of the stored image
    File(String),
    /// Fixed placeholder, no image stored
    Sentinel(&'static str),
}

impl ImageCell {
    pub fn as_str(&self) -> &str {
        match self {
            Self::File(path) => path,
            Self::Sentinel(value) => value,
        }
    }
}

/// One line of the tabular index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    /// 1-based position in the group
    pub index: usize,
    pub text: String,
    pub image: ImageCell,
}

impl ExportRow {
    pub fn is_failure(&self) -> bool {
        matches!(self.image, ImageCell::Sentinel(PREPARE_FAILED | CAPTURE_FAILED))
    }
}

/// Rows and image bytes accumulated over a run
#[derive(Debug, Clone, Default)]
pub struct ExportRecord {
    rows: Vec<ExportRow>,
    images: IndexMap<String, Vec<u8>>,
}

impl ExportRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a captured item and store its image
    pub fn push_captured(&mut self, index: usize, text: impl Into<String>, image: Vec<u8>) {
        let path = image_path(index);
        self.images.insert(path.clone(), image);
        self.rows.push(ExportRow {
            index,
            text: text.into(),
            image: ImageCell::File(path),
        });
    }

    /// Record an item whose crop was empty; its text is kept, no image is stored
    pub fn push_empty(&mut self, index: usize, text: impl Into<String>) {
        self.rows.push(ExportRow {
            index,
            text: text.into(),
            image: ImageCell::Sentinel(EMPTY_IMAGE),
        });
    }

    /// Record an item that could not be positioned
    pub fn push_prepare_failure(&mut self, index: usize) {
        self.push_sentinel(index, PREPARE_FAILED);
    }

    /// Record an item whose capture failed for good
    pub fn push_capture_failure(&mut self, index: usize) {
        self.push_sentinel(index, CAPTURE_FAILED);
    }

    fn push_sentinel(&mut self, index: usize, image: &'static str) {
        self.rows.push(ExportRow {
            index,
            text: ERROR_TEXT.to_string(),
            image: ImageCell::Sentinel(image),
        });
    }

    pub fn rows(&self) -> &[ExportRow] {
        &self.rows
    }

    pub fn images(&self) -> &IndexMap<String, Vec<u8>> {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render the index file: BOM, header, then one row per item
    ///
    /// The index column is bare; text and image columns are always quoted,
    /// with internal quotes doubled, so numeric-looking text stays a string.
    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        buf.extend_from_slice(BYTE_ORDER_MARK.as_bytes());
        buf.extend_from_slice(CSV_HEADER.as_bytes());
        buf.push(b'\n');

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .quote_style(csv::QuoteStyle::Always)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(buf);

        for row in &self.rows {
            // The writer buffers internally; drain it before appending the bare index
            writer.flush()?;
            write!(writer.get_mut(), "{},", row.index)?;
            writer.write_record([row.text.as_str(), row.image.as_str()])?;
        }

        writer
            .into_inner()
            .map_err(|e| ExportError::ArchiveFailed(format!("Failed to flush index: {}", e)))
    }

    /// Finalize into an archive
    pub fn into_archive(self) -> Result<ExportArchive> {
        let index = self.to_csv()?;
        Ok(ExportArchive::new(index, self.images))
    }
}
