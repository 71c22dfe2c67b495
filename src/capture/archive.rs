use crate::capture::export::IMAGE_DIR;
use crate::error::{ExportError, Result};
use indexmap::IndexMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Name of the tabular index inside the archive
pub const INDEX_FILE: &str = "data.csv";

/// Finalized export: the index file plus every stored image, keyed by path
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArchive {
    index: Vec<u8>,
    images: IndexMap<String, Vec<u8>>,
}

impl ExportArchive {
    pub fn new(index: Vec<u8>, images: IndexMap<String, Vec<u8>>) -> Self {
        Self { index, images }
    }

    /// Contents of the index file
    pub fn index(&self) -> &[u8] {
        &self.index
    }

    pub fn images(&self) -> &IndexMap<String, Vec<u8>> {
        &self.images
    }

    /// Every file of the archive as (relative path, bytes), index first
    pub fn entries(&self) -> impl Iterator<Item = (&str, &[u8])> {
        std::iter::once((INDEX_FILE, self.index.as_slice()))
            .chain(self.images.iter().map(|(path, bytes)| (path.as_str(), bytes.as_slice())))
    }
}

/// Destination for a finished export
pub trait ArchiveSink {
    /// Store the archive; on error nothing must be left behind as a finished export
    fn write_archive(&mut self, archive: &ExportArchive) -> Result<()>;
}

/// Writes the archive as a directory tree
///
/// Files are staged in a sibling directory and moved into place once all of
/// them are written.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn staging_dir(&self) -> PathBuf {
        staging_path(&self.root, "export")
    }

    fn write_all(staging: &Path, archive: &ExportArchive) -> std::io::Result<()> {
        for (relative, bytes) in archive.entries() {
            let path = staging.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, bytes)?;
        }
        Ok(())
    }
}

impl ArchiveSink for DirectorySink {
    fn write_archive(&mut self, archive: &ExportArchive) -> Result<()> {
        refuse_existing(&self.root)?;

        let staging = self.staging_dir();
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;

        let written = Self::write_all(&staging, archive).and_then(|_| fs::rename(&staging, &self.root));
        if let Err(e) = written {
            let _ = fs::remove_dir_all(&staging);
            return Err(ExportError::ArchiveFailed(format!(
                "Failed to write {}: {}",
                self.root.display(),
                e
            )));
        }

        log::info!("Wrote export to {}", self.root.display());
        Ok(())
    }
}

/// Writes the archive as a single zip file
///
/// The index sits at the top level next to the image folder. The file is
/// written under a `.partial` name and renamed once complete.
#[derive(Debug, Clone)]
pub struct ZipSink {
    path: PathBuf,
}

impl ZipSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_zip(staging: &Path, archive: &ExportArchive) -> zip::result::ZipResult<()> {
        let mut zip = ZipWriter::new(BufWriter::new(File::create(staging)?));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        zip.add_directory(IMAGE_DIR, options)?;
        for (relative, bytes) in archive.entries() {
            zip.start_file(relative, options)?;
            zip.write_all(bytes)?;
        }
        zip.finish()?.flush()?;
        Ok(())
    }
}

impl ArchiveSink for ZipSink {
    fn write_archive(&mut self, archive: &ExportArchive) -> Result<()> {
        refuse_existing(&self.path)?;

        let staging = staging_path(&self.path, "list_export.zip");
        let written = Self::write_zip(&staging, archive)
            .map_err(|e| e.to_string())
            .and_then(|_| fs::rename(&staging, &self.path).map_err(|e| e.to_string()));
        if let Err(e) = written {
            let _ = fs::remove_file(&staging);
            return Err(ExportError::ArchiveFailed(format!(
                "Failed to write {}: {}",
                self.path.display(),
                e
            )));
        }

        log::info!("Wrote export to {}", self.path.display());
        Ok(())
    }
}

/// Sibling of `target` with `.partial` appended to its name
fn staging_path(target: &Path, fallback: &str) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from(fallback));
    name.push(".partial");
    target.with_file_name(name)
}

fn refuse_existing(target: &Path) -> Result<()> {
    if target.exists() {
        return Err(ExportError::ArchiveFailed(format!("{} already exists", target.display())));
    }
    Ok(())
}

/// Keeps archive entries in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub entries: IndexMap<String, Vec<u8>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.entries.get(path).map(Vec::as_slice)
    }
}

impl ArchiveSink for MemorySink {
    fn write_archive(&mut self, archive: &ExportArchive) -> Result<()> {
        self.entries = archive
            .entries()
            .map(|(path, bytes)| (path.to_string(), bytes.to_vec()))
            .collect();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn archive() -> ExportArchive {
        let mut images = IndexMap::new();
        images.insert("images/image_1.jpg".to_string(), vec![1, 2, 3]);
        images.insert("images/image_3.jpg".to_string(), vec![4]);
        ExportArchive::new(b"Index,Text,ImageFile\n".to_vec(), images)
    }

    #[test]
    fn test_entries_order() {
        let archive = archive();
        let paths: Vec<_> = archive.entries().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["data.csv", "images/image_1.jpg", "images/image_3.jpg"]);
    }

    #[test]
    fn test_memory_sink() {
        let mut sink = MemorySink::new();
        sink.write_archive(&archive()).unwrap();

        assert_eq!(sink.entries.len(), 3);
        assert_eq!(sink.get("images/image_3.jpg"), Some(&[4u8][..]));
    }

    #[test]
    fn test_directory_sink_writes_tree() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("list_export");
        let mut sink = DirectorySink::new(&root);

        sink.write_archive(&archive()).unwrap();

        assert_eq!(fs::read(root.join("data.csv")).unwrap(), b"Index,Text,ImageFile\n");
        assert_eq!(fs::read(root.join("images/image_1.jpg")).unwrap(), vec![1, 2, 3]);
        assert!(!dir.path().join("list_export.partial").exists());
    }

    #[test]
    fn test_zip_sink_writes_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list_export.zip");
        let mut sink = ZipSink::new(&path);

        sink.write_archive(&archive()).unwrap();

        let mut zip = zip::ZipArchive::new(File::open(&path).unwrap()).unwrap();
        let mut index = Vec::new();
        std::io::Read::read_to_end(&mut zip.by_name("data.csv").unwrap(), &mut index).unwrap();
        assert_eq!(index, b"Index,Text,ImageFile\n");
        assert!(zip.by_name("images/").unwrap().is_dir());
        assert_eq!(zip.by_name("images/image_3.jpg").unwrap().size(), 1);
        assert!(!dir.path().join("list_export.zip.partial").exists());
    }

    #[test]
    fn test_zip_sink_refuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.zip");
        fs::write(&path, b"keep me").unwrap();

        let err = ZipSink::new(&path).write_archive(&archive()).unwrap_err();
        assert!(matches!(err, ExportError::ArchiveFailed(_)));
        assert_eq!(fs::read(&path).unwrap(), b"keep me");
    }

    #[test]
    fn test_directory_sink_refuses_existing_target() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path());

        let err = sink.write_archive(&archive()).unwrap_err();
        assert!(matches!(err, ExportError::ArchiveFailed(_)));
    }
}
