//! Body encoders and decoders.
//!
//! Each encoder returns the body bytes; the caller pairs them with the
//! matching [`ContentType`](crate::ContentType) tag.

use std::io;

use bytes::Bytes;
use prost::Message;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::ser::Formatter;

use crate::{DecodeError, EncodeError};

/// Encode key/value pairs as `application/x-www-form-urlencoded`.
///
/// Keys may repeat; pairs are emitted in iteration order.
pub fn encode_form<I, K, V>(pairs: I) -> Bytes
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (k, v) in pairs {
        serializer.append_pair(k.as_ref(), v.as_ref());
    }
    Bytes::from(serializer.finish())
}

/// Encode a value as JSON.
pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<Bytes, EncodeError> {
    Ok(Bytes::from(serde_json::to_vec(value)?))
}

/// Encode a value as JSON with `<`, `>` and `&` inside strings written as
/// `\u003c`, `\u003e` and `\u0026`, so the output can be embedded in HTML.
pub fn encode_json_html_escaped<T: Serialize + ?Sized>(value: &T) -> Result<Bytes, EncodeError> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, HtmlEscapeFormatter);
    value.serialize(&mut ser)?;
    Ok(Bytes::from(buf))
}

/// Encode a value as XML.
pub fn encode_xml<T: Serialize>(value: &T) -> Result<Bytes, EncodeError> {
    Ok(Bytes::from(quick_xml::se::to_string(value)?))
}

/// Encode a protobuf message using its JSON mapping.
///
/// The message type supplies the mapping through its `Serialize` impl
/// (as generated by `pbjson` or `prost-serde` style derives).
pub fn encode_pb_json<T: Message + Serialize>(message: &T) -> Result<Bytes, EncodeError> {
    encode_json(message)
}

/// Decode a JSON body.
pub fn decode_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, DecodeError> {
    Ok(serde_json::from_slice(body)?)
}

/// Decode an XML body.
pub fn decode_xml<T: DeserializeOwned>(body: &[u8]) -> Result<T, DecodeError> {
    let text = std::str::from_utf8(body)?;
    Ok(quick_xml::de::from_str(text)?)
}

/// Decode a protobuf message from its JSON mapping.
///
/// An empty (or whitespace-only) body yields the default message, since the
/// JSON mapping of a message with every field at its default may be omitted
/// entirely by servers.
pub fn decode_pb_json<T>(body: &[u8]) -> Result<T, DecodeError>
where
    T: Message + DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    decode_json(body)
}

struct HtmlEscapeFormatter;

impl Formatter for HtmlEscapeFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let bytes = fragment.as_bytes();
        let mut start = 0;
        for (i, b) in bytes.iter().enumerate() {
            let escaped: &[u8] = match b {
                b'<' => b"\\u003c",
                b'>' => b"\\u003e",
                b'&' => b"\\u0026",
                _ => continue,
            };
            writer.write_all(&bytes[start..i])?;
            writer.write_all(escaped)?;
            start = i + 1;
        }
        writer.write_all(&bytes[start..])
    }
}
