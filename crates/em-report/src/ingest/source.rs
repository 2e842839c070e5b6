//! Named byte sources handed over by the presentation shell.

use std::fs;
use std::io::{self, Cursor, Read, Seek};
use std::path::{Path, PathBuf};

/// A named, re-readable byte source.
///
/// Every call to [`read_bytes`](ReportSource::read_bytes) returns the full content,
/// regardless of what was read before.
pub trait ReportSource {
    /// File name as uploaded, e.g. `10.27.25_11.2.25.csv`.
    fn name(&self) -> &str;

    /// Read the whole content from the start.
    fn read_bytes(&mut self) -> io::Result<Vec<u8>>;
}

impl<T: ReportSource + ?Sized> ReportSource for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn read_bytes(&mut self) -> io::Result<Vec<u8>> {
        (**self).read_bytes()
    }
}

/// An uploaded file backed by any seekable reader.
///
/// The reader is rewound before and after each read so the shell can hand the
/// same upload to the pipeline more than once.
#[derive(Debug)]
pub struct UploadedFile<R> {
    name: String,
    inner: R,
}

impl<R> UploadedFile<R> {
    pub fn new(name: impl Into<String>, inner: R) -> Self {
        Self {
            name: name.into(),
            inner,
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl UploadedFile<Cursor<Vec<u8>>> {
    /// Wrap in-memory content, as produced by an upload form.
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(name, Cursor::new(bytes.into()))
    }
}

impl<R: Read + Seek> ReportSource for UploadedFile<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_bytes(&mut self) -> io::Result<Vec<u8>> {
        self.inner.rewind()?;
        let mut buf = Vec::new();
        self.inner.read_to_end(&mut buf)?;
        self.inner.rewind()?;
        Ok(buf)
    }
}

/// A file on disk, opened fresh on every read.
///
/// Open failures surface as read errors for this file only.
#[derive(Debug, Clone)]
pub struct FileSource {
    name: String,
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { name, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_bytes(&mut self) -> io::Result<Vec<u8>> {
        fs::read(&self.path)
    }
}
