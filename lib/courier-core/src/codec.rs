//! Pluggable body codecs.
//!
//! A client owns one codec per structured format (JSON, XML, CBOR). Codecs
//! are object safe: values go in as `&dyn erased_serde::Serialize` and come
//! out through a visitor that receives an erased deserializer, so a client
//! can swap implementations at runtime.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{Error, Result};

/// Callback handed an erased deserializer positioned on the input.
pub type Visit<'a> = &'a mut dyn for<'de> FnMut(
    &mut dyn erased_serde::Deserializer<'de>,
) -> std::result::Result<(), erased_serde::Error>;

/// A body format.
pub trait Codec: Send + Sync {
    /// Short format name, used in error messages.
    fn format(&self) -> &'static str;

    /// Media type written to `Content-Type`.
    fn content_type(&self) -> &'static str;

    /// Serialize a value.
    fn marshal(&self, value: &dyn erased_serde::Serialize) -> Result<Vec<u8>>;

    /// Deserialize `bytes`, letting `visit` drive the deserializer.
    fn unmarshal(&self, bytes: &[u8], visit: Visit<'_>) -> Result<()>;
}

/// Serialize a value with the given codec.
pub fn encode<T: Serialize>(codec: &dyn Codec, value: &T) -> Result<Vec<u8>> {
    codec.marshal(value)
}

/// Deserialize a value with the given codec.
pub fn decode<T: DeserializeOwned>(codec: &dyn Codec, bytes: &[u8]) -> Result<T> {
    let mut slot: Option<T> = None;
    codec.unmarshal(bytes, &mut |de: &mut dyn erased_serde::Deserializer<'_>| {
        slot = Some(erased_serde::deserialize::<T>(de)?);
        Ok(())
    })?;
    slot.ok_or_else(|| Error::decode(codec.format(), ".", "no value decoded"))
}

/// JSON codec backed by `serde_json`.
///
/// Decoding errors carry the path of the failing field.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn format(&self) -> &'static str {
        "json"
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn marshal(&self, value: &dyn erased_serde::Serialize) -> Result<Vec<u8>> {
        serde_json::to_vec(&value).map_err(|e| Error::encode("json", e.to_string()))
    }

    fn unmarshal(&self, bytes: &[u8], visit: Visit<'_>) -> Result<()> {
        let mut inner = serde_json::Deserializer::from_slice(bytes);
        let mut track = serde_path_to_error::Track::new();
        let visited = {
            let tracked = serde_path_to_error::Deserializer::new(&mut inner, &mut track);
            let mut erased = <dyn erased_serde::Deserializer>::erase(tracked);
            visit(&mut erased)
        };
        if let Err(e) = visited {
            return Err(Error::decode("json", track.path().to_string(), e.to_string()));
        }
        inner
            .end()
            .map_err(|e| Error::decode("json", ".", e.to_string()))
    }
}

/// XML codec backed by `quick-xml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlCodec;

impl Codec for XmlCodec {
    fn format(&self) -> &'static str {
        "xml"
    }

    fn content_type(&self) -> &'static str {
        "application/xml"
    }

    fn marshal(&self, value: &dyn erased_serde::Serialize) -> Result<Vec<u8>> {
        quick_xml::se::to_string(&value)
            .map(String::into_bytes)
            .map_err(|e| Error::encode("xml", e.to_string()))
    }

    fn unmarshal(&self, bytes: &[u8], visit: Visit<'_>) -> Result<()> {
        let text = std::str::from_utf8(bytes).map_err(|e| Error::decode("xml", ".", e.to_string()))?;
        let mut de = quick_xml::de::Deserializer::from_str(text);
        let mut erased = <dyn erased_serde::Deserializer>::erase(&mut de);
        visit(&mut erased).map_err(|e| Error::decode("xml", ".", e.to_string()))
    }
}

/// CBOR codec backed by `serde_cbor`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CborCodec;

impl Codec for CborCodec {
    fn format(&self) -> &'static str {
        "cbor"
    }

    fn content_type(&self) -> &'static str {
        "application/cbor"
    }

    fn marshal(&self, value: &dyn erased_serde::Serialize) -> Result<Vec<u8>> {
        serde_cbor::to_vec(&value).map_err(|e| Error::encode("cbor", e.to_string()))
    }

    fn unmarshal(&self, bytes: &[u8], visit: Visit<'_>) -> Result<()> {
        let mut de = serde_cbor::Deserializer::from_slice(bytes);
        let visited = {
            let mut erased = <dyn erased_serde::Deserializer>::erase(&mut de);
            visit(&mut erased)
        };
        visited.map_err(|e| Error::decode("cbor", ".", e.to_string()))?;
        de.end().map_err(|e| Error::decode("cbor", ".", e.to_string()))
    }
}

/// The codec set of a client.
#[derive(Clone)]
pub struct Codecs {
    /// Used by `json` bodies and `Response::json`.
    pub json: Arc<dyn Codec>,
    /// Used by `xml` bodies and `Response::xml`.
    pub xml: Arc<dyn Codec>,
    /// Used by `cbor` bodies and `Response::cbor`.
    pub cbor: Arc<dyn Codec>,
}

impl Default for Codecs {
    fn default() -> Self {
        Self {
            json: Arc::new(JsonCodec),
            xml: Arc::new(XmlCodec),
            cbor: Arc::new(CborCodec),
        }
    }
}

impl fmt::Debug for Codecs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codecs")
            .field("json", &self.json.content_type())
            .field("xml", &self.xml.content_type())
            .field("cbor", &self.cbor.content_type())
            .finish()
    }
}
