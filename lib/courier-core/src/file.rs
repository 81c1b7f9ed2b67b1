//! Files uploaded in multipart bodies.

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

/// A file to upload as one part of a `multipart/form-data` body.
///
/// The content comes either from an already open reader or from a path that
/// is opened when the body is encoded. A reader attached here belongs to the
/// request: it is dropped once its content has been copied.
#[derive(Default)]
pub struct File {
    field_name: String,
    name: String,
    path: Option<PathBuf>,
    reader: Option<Box<dyn Read + Send>>,
}

impl File {
    /// Create an empty file descriptor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Upload the file at `path`, named after its base name.
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::new().with_path(path)
    }

    /// Upload the content of `reader` under `name`.
    #[must_use]
    pub fn from_reader(name: impl Into<String>, reader: impl Read + Send + 'static) -> Self {
        Self::new().with_name(name).with_reader(reader)
    }

    /// Set the form field name. Defaults to `file<n>` by position.
    #[must_use]
    pub fn with_field_name(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = field_name.into();
        self
    }

    /// Set the file name sent in `Content-Disposition`.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the path the content is read from.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the reader the content is copied from.
    #[must_use]
    pub fn with_reader(mut self, reader: impl Read + Send + 'static) -> Self {
        self.reader = Some(Box::new(reader));
        self
    }

    /// The form field name, possibly empty.
    #[must_use]
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// The file name, possibly empty.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The source path, if any. An empty path counts as none.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
    }

    /// Returns `true` if a reader is attached.
    #[must_use]
    pub fn has_reader(&self) -> bool {
        self.reader.is_some()
    }

    pub(crate) fn set_field_name(&mut self, field_name: String) {
        self.field_name = field_name;
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn take_reader(&mut self) -> Option<Box<dyn Read + Send>> {
        self.reader.take()
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("field_name", &self.field_name)
            .field("name", &self.name)
            .field("path", &self.path)
            .field("reader", &self.reader.is_some())
            .finish()
    }
}
