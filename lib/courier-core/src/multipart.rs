//! `multipart/form-data` encoding.
//!
//! Form fields are written first, then one part per file. File content is
//! streamed from its reader through a fixed-size copy buffer.

use std::io::{ErrorKind, Read};

use bytes::{BufMut, Bytes, BytesMut};
use rand::Rng;
use rand::distributions::Alphanumeric;

use crate::file::File;
use crate::params::FormData;
use crate::{Error, Result};

/// Boundary used when the caller does not pick one.
///
/// A request left on this value gets a random suffix so concurrent uploads
/// never share a delimiter.
pub const DEFAULT_BOUNDARY: &str = "--CourierFormBoundary";

/// Size of the buffer file content is copied through.
pub const COPY_BUFFER_SIZE: usize = 1024 * 1024;

const RANDOM_SUFFIX_LEN: usize = 16;

/// Append 16 random alphanumeric characters to `base`.
#[must_use]
pub fn randomize_boundary(base: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("{base}{suffix}")
}

/// Incremental multipart body writer.
#[derive(Debug)]
pub struct MultipartWriter {
    boundary: String,
    buf: BytesMut,
    part_open: bool,
}

impl MultipartWriter {
    /// Create a writer, validating the boundary against RFC 2046.
    pub fn new(boundary: impl Into<String>) -> Result<Self> {
        let boundary = boundary.into();
        validate_boundary(&boundary)?;
        Ok(Self {
            boundary,
            buf: BytesMut::new(),
            part_open: false,
        })
    }

    /// The boundary.
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// The `Content-Type` value announcing this body.
    #[must_use]
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Write a text field as a complete part.
    pub fn write_field(&mut self, name: &str, value: &str) {
        self.begin_part(name, None);
        self.write_data(value.as_bytes());
    }

    /// Start a file part. Content follows through [`MultipartWriter::write_data`].
    pub fn begin_file(&mut self, field_name: &str, file_name: &str) {
        self.begin_part(field_name, Some(file_name));
    }

    /// Append content to the current part.
    pub fn write_data(&mut self, data: &[u8]) {
        self.buf.put_slice(data);
    }

    /// Terminate the body and return it.
    #[must_use]
    pub fn close(mut self) -> Bytes {
        self.end_part();
        self.buf.put_slice(b"--");
        self.buf.put_slice(self.boundary.as_bytes());
        self.buf.put_slice(b"--\r\n");
        self.buf.freeze()
    }

    fn begin_part(&mut self, name: &str, file_name: Option<&str>) {
        self.end_part();
        self.buf.put_slice(b"--");
        self.buf.put_slice(self.boundary.as_bytes());
        self.buf.put_slice(b"\r\n");

        self.buf.put_slice(b"Content-Disposition: form-data; name=\"");
        self.buf.put_slice(escape_quotes(name).as_bytes());
        self.buf.put_slice(b"\"");
        if let Some(file_name) = file_name {
            self.buf.put_slice(b"; filename=\"");
            self.buf.put_slice(escape_quotes(file_name).as_bytes());
            self.buf.put_slice(b"\"\r\nContent-Type: ");
            self.buf.put_slice(guess_content_type(file_name).as_bytes());
        }
        self.buf.put_slice(b"\r\n\r\n");
        self.part_open = true;
    }

    fn end_part(&mut self) {
        if self.part_open {
            self.buf.put_slice(b"\r\n");
            self.part_open = false;
        }
    }
}

/// Encode form fields and files into a multipart body.
///
/// Files without a field name get `file1`, `file2`, ... by position. Files
/// without a name are named after the base name of their path. Each reader
/// is dropped once copied, including on error.
pub fn encode_multipart(boundary: &str, form: &FormData, files: &mut [File]) -> Result<Bytes> {
    let mut writer = MultipartWriter::new(boundary)?;

    for (name, value) in form.iter() {
        writer.write_field(name, value);
    }

    let mut chunk = vec![0_u8; COPY_BUFFER_SIZE];
    for (index, file) in files.iter_mut().enumerate() {
        let base_name = match file.path() {
            _ if !file.name().is_empty() => None,
            Some(path) => Some(
                path.file_name()
                    .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned()),
            ),
            None => return Err(Error::FileNoName),
        };
        if let Some(name) = base_name {
            file.set_name(name);
        }
        if file.field_name().is_empty() {
            file.set_field_name(format!("file{}", index + 1));
        }

        let mut reader = match file.take_reader() {
            Some(reader) => reader,
            None => {
                let path = file.path().ok_or(Error::FileNoName)?;
                let opened = std::fs::File::open(path).map_err(|e| Error::io("open file", e))?;
                Box::new(opened)
            }
        };

        writer.begin_file(file.field_name(), file.name());
        loop {
            let read = match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(read) => read,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::io("copy file data", e)),
            };
            if let Some(data) = chunk.get(..read) {
                writer.write_data(data);
            }
        }
    }

    Ok(writer.close())
}

fn validate_boundary(boundary: &str) -> Result<()> {
    if boundary.is_empty() || boundary.len() > 70 {
        return Err(Error::invalid_request(format!(
            "multipart boundary must be 1 to 70 characters: {boundary:?}"
        )));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || "'()+_,-./:=? ".contains(c);
    if !boundary.chars().all(allowed) || boundary.ends_with(' ') {
        return Err(Error::invalid_request(format!(
            "invalid multipart boundary: {boundary:?}"
        )));
    }
    Ok(())
}

fn escape_quotes(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Guess the content type from a file name extension.
fn guess_content_type(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "md" => "text/markdown",
        "js" => "application/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "wasm" => "application/wasm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use assert2::let_assert;

    use super::*;

    fn body_text(bytes: &Bytes) -> String {
        String::from_utf8(bytes.to_vec()).expect("utf8 body")
    }

    #[test]
    fn fields_only() {
        let mut form = FormData::new();
        form.add("name", "John").add("role", "admin");

        let body = encode_multipart("b0undary", &form, &mut []).expect("encode");
        assert_eq!(
            body_text(&body),
            "--b0undary\r\n\
             Content-Disposition: form-data; name=\"name\"\r\n\r\n\
             John\r\n\
             --b0undary\r\n\
             Content-Disposition: form-data; name=\"role\"\r\n\r\n\
             admin\r\n\
             --b0undary--\r\n"
        );
    }

    #[test]
    fn fields_come_before_files() {
        let mut form = FormData::new();
        form.add("foo", "bar");
        let mut files = [File::from_reader("hello.txt", Cursor::new(b"hi there".to_vec()))];

        let body = body_text(&encode_multipart("xyz", &form, &mut files).expect("encode"));
        let field_at = body.find("name=\"foo\"").expect("field part");
        let file_at = body.find("name=\"file1\"; filename=\"hello.txt\"").expect("file part");
        assert!(field_at < file_at);
        assert!(body.contains("Content-Type: text/plain\r\n\r\nhi there\r\n--xyz--\r\n"));
        assert!(!files[0].has_reader());
    }

    #[test]
    fn file_named_after_path() {
        let mut temp = tempfile::Builder::new()
            .suffix(".json")
            .tempfile()
            .expect("temp file");
        temp.write_all(br#"{"ok":true}"#).expect("write");
        let base = temp
            .path()
            .file_name()
            .expect("file name")
            .to_string_lossy()
            .into_owned();

        let mut files = [
            File::from_reader("a.bin", Cursor::new(vec![1, 2])),
            File::from_path(temp.path()).with_field_name("config"),
        ];
        let body = body_text(&encode_multipart("b", &FormData::new(), &mut files).expect("encode"));

        assert_eq!(files[1].name(), base);
        assert!(body.contains(&format!("name=\"config\"; filename=\"{base}\"")));
        assert!(body.contains("Content-Type: application/json\r\n\r\n{\"ok\":true}\r\n"));
    }

    #[test]
    fn file_without_name_or_path_fails() {
        let mut files = [File::new().with_reader(Cursor::new(Vec::new()))];
        let result = encode_multipart("b", &FormData::new(), &mut files);
        let_assert!(Err(Error::FileNoName) = result);
    }

    #[test]
    fn empty_path_is_no_name() {
        let mut files = [File::from_path("")];
        let result = encode_multipart("b", &FormData::new(), &mut files);
        let_assert!(Err(Error::FileNoName) = result);
    }

    #[test]
    fn missing_file_fails_to_open() {
        let mut files = [File::from_path("/definitely/not/here.txt")];
        let result = encode_multipart("b", &FormData::new(), &mut files);
        let_assert!(Err(Error::Io { op: "open file", .. }) = result);
    }

    #[test]
    fn boundary_validation() {
        assert!(MultipartWriter::new("").is_err());
        assert!(MultipartWriter::new("a".repeat(71)).is_err());
        assert!(MultipartWriter::new("bad\"quote").is_err());
        assert!(MultipartWriter::new("trailing ").is_err());
        assert!(MultipartWriter::new(DEFAULT_BOUNDARY).is_ok());
    }

    #[test]
    fn randomized_boundary_is_valid() {
        let boundary = randomize_boundary(DEFAULT_BOUNDARY);
        assert_eq!(boundary.len(), DEFAULT_BOUNDARY.len() + 16);
        assert!(boundary.starts_with(DEFAULT_BOUNDARY));
        assert_ne!(boundary, randomize_boundary(DEFAULT_BOUNDARY));
        assert!(MultipartWriter::new(boundary).is_ok());
    }

    #[test]
    fn guess_content_types() {
        assert_eq!(guess_content_type("photo.JPG"), "image/jpeg");
        assert_eq!(guess_content_type("archive.tar.gz"), "application/gzip");
        assert_eq!(guess_content_type("noext"), "application/octet-stream");
    }
}
