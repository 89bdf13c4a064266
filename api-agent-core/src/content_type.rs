//! Content-type tags.
//!
//! The agent tracks the body encoding as a short tag rather than a raw MIME
//! string. Each body setter switches the tag; the pipeline maps it to the
//! `Content-Type` header value when the request is assembled.

use std::fmt;
use std::str::FromStr;

/// Body encoding tag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ContentType {
    #[default]
    Html,
    Json,
    Xml,
    Text,
    Form,
    Multipart,
}

impl ContentType {
    /// MIME type sent in the `Content-Type` header.
    ///
    /// For [`ContentType::Multipart`] this is the bare type; the boundary
    /// parameter is appended when the multipart body is built.
    pub fn mime(&self) -> &'static str {
        match self {
            ContentType::Html => "text/html",
            ContentType::Json => "application/json",
            ContentType::Xml => "application/xml",
            ContentType::Text => "text/plain",
            ContentType::Form => "application/x-www-form-urlencoded",
            ContentType::Multipart => "multipart/form-data",
        }
    }

    /// Short tag name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Html => "html",
            ContentType::Json => "json",
            ContentType::Xml => "xml",
            ContentType::Text => "text",
            ContentType::Form => "form",
            ContentType::Multipart => "multipart",
        }
    }

    /// Look up a tag by name.
    ///
    /// `urlencoded`, `form` and `form-data` are aliases of the same tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "html" => Some(ContentType::Html),
            "json" => Some(ContentType::Json),
            "xml" => Some(ContentType::Xml),
            "text" => Some(ContentType::Text),
            "urlencoded" | "form" | "form-data" => Some(ContentType::Form),
            "multipart" => Some(ContentType::Multipart),
            _ => None,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown content-type tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown content type tag: {0}")]
pub struct UnknownContentType(pub String);

impl FromStr for ContentType {
    type Err = UnknownContentType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s).ok_or_else(|| UnknownContentType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_table() {
        assert_eq!(ContentType::Html.mime(), "text/html");
        assert_eq!(ContentType::Json.mime(), "application/json");
        assert_eq!(ContentType::Xml.mime(), "application/xml");
        assert_eq!(ContentType::Text.mime(), "text/plain");
        assert_eq!(ContentType::Form.mime(), "application/x-www-form-urlencoded");
        assert_eq!(ContentType::Multipart.mime(), "multipart/form-data");
    }

    #[test]
    fn test_form_aliases() {
        for tag in ["urlencoded", "form", "form-data"] {
            assert_eq!(ContentType::from_tag(tag), Some(ContentType::Form));
        }
    }

    #[test]
    fn test_default_is_html() {
        assert_eq!(ContentType::default(), ContentType::Html);
    }

    #[test]
    fn test_parse_unknown() {
        let err = "yaml".parse::<ContentType>().unwrap_err();
        assert_eq!(err, UnknownContentType("yaml".into()));
        assert_eq!("json".parse::<ContentType>().unwrap(), ContentType::Json);
    }
}
