//! Error types for courier.

use derive_more::{Display, Error, From};

/// Main error type for courier operations.
///
/// Every pipeline stage stops at the first error it meets and returns it
/// unchanged, so the variant tells which stage failed.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// The request URL is neither absolute nor made absolute by the base URL.
    #[display("the URL doesn't match the required format: {_0}")]
    UrlFormat(#[error(not(source))] String),

    /// The body kind does not accept the given payload.
    #[display("invalid body type: {_0}")]
    BodyType(#[error(not(source))] String),

    /// A file to upload has neither a name nor a path.
    #[display("the file should have a name or a path")]
    FileNoName,

    /// A header name or value is not valid HTTP.
    #[display("invalid header: {_0}")]
    InvalidHeader(#[error(not(source))] String),

    /// Invalid request configuration.
    #[display("invalid request: {_0}")]
    InvalidRequest(#[error(not(source))] String),

    /// The `http` crate rejected the assembled request.
    #[display("cannot build HTTP request: {_0}")]
    #[from]
    Http(http::Error),

    /// A codec failed to marshal a body.
    #[display("{format} encoding error: {message}")]
    Encode {
        /// Codec format (`json`, `xml`, `cbor`, `form`).
        format: &'static str,
        /// Error message.
        message: String,
    },

    /// A codec failed to unmarshal a body.
    #[display("{format} decoding error at '{path}': {message}")]
    Decode {
        /// Codec format (`json`, `xml`, `cbor`).
        format: &'static str,
        /// Path to the failing value, `.` when unknown.
        path: String,
        /// Error message.
        message: String,
    },

    /// I/O failure while reading or writing local data.
    #[display("cannot {op}: {source}")]
    Io {
        /// What was being done.
        op: &'static str,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A `Set-Cookie` header could not be parsed.
    #[display("invalid cookie '{value}': {source}")]
    CookieParse {
        /// The raw header value.
        value: String,
        /// Parser error.
        source: cookie::ParseError,
    },

    /// Network/connection errors.
    #[display("connection error: {_0}")]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    Tls(#[error(not(source))] String),

    /// Request timeout.
    #[display("request timeout")]
    Timeout,

    /// The request was cancelled by its caller.
    #[display("request cancelled")]
    Cancelled,

    /// A request or response hook refused to continue.
    #[display("hook error: {_0}")]
    Hook(#[error(not(source))] String),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a URL format error.
    #[must_use]
    pub fn url_format(message: impl Into<String>) -> Self {
        Self::UrlFormat(message.into())
    }

    /// Create a body type error.
    #[must_use]
    pub fn body_type(message: impl Into<String>) -> Self {
        Self::BodyType(message.into())
    }

    /// Create an invalid header error.
    #[must_use]
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create an encoding error for the given format.
    #[must_use]
    pub fn encode(format: &'static str, message: impl Into<String>) -> Self {
        Self::Encode {
            format,
            message: message.into(),
        }
    }

    /// Create a decoding error with path context.
    #[must_use]
    pub fn decode(
        format: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Decode {
            format,
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error.
    #[must_use]
    pub const fn io(op: &'static str, source: std::io::Error) -> Self {
        Self::Io { op, source }
    }

    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create a hook error.
    #[must_use]
    pub fn hook(message: impl Into<String>) -> Self {
        Self::Hook(message.into())
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if the request was cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns the codec format if this is an encoding or decoding error.
    #[must_use]
    pub const fn format(&self) -> Option<&'static str> {
        match self {
            Self::Encode { format, .. } | Self::Decode { format, .. } => Some(format),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::url_format("ftp://example.com");
        assert_eq!(
            err.to_string(),
            "the URL doesn't match the required format: ftp://example.com"
        );

        assert_eq!(Error::Timeout.to_string(), "request timeout");
        assert_eq!(
            Error::FileNoName.to_string(),
            "the file should have a name or a path"
        );

        let err = Error::decode("json", "user.address.city", "missing field `city`");
        assert_eq!(
            err.to_string(),
            "json decoding error at 'user.address.city': missing field `city`"
        );
    }

    #[test]
    fn error_io_keeps_source() {
        use std::error::Error as _;

        let err = Error::io(
            "open file",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.to_string(), "cannot open file: gone");
        assert!(err.source().is_some());
    }

    #[test]
    fn error_predicates() {
        assert!(Error::Timeout.is_timeout());
        assert!(!Error::Cancelled.is_timeout());
        assert!(Error::Cancelled.is_cancelled());
        assert!(Error::connection("refused").is_connection());
        assert_eq!(Error::encode("xml", "bad").format(), Some("xml"));
        assert_eq!(Error::FileNoName.format(), None);
    }
}
