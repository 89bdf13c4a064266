//! `multipart/form-data` encoding.
//!
//! Produces one part per [`File`]:
//!
//! ```text
//! --{boundary}\r\n
//! Content-Disposition: form-data; name="{field}"; filename="{filename}"\r\n
//! Content-Type: application/octet-stream\r\n
//! \r\n
//! {data}\r\n
//! --{boundary}--\r\n
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use rand::Rng;

use crate::{ContentType, File};

/// An encoded multipart body together with its header value.
#[derive(Debug, Clone)]
pub struct MultipartBody {
    boundary: String,
    body: Bytes,
}

impl MultipartBody {
    /// Encode `files` with a freshly generated boundary.
    pub fn encode(files: &[File]) -> Self {
        Self::encode_with_boundary(files, random_boundary())
    }

    /// Encode `files` with a caller-chosen boundary.
    pub fn encode_with_boundary(files: &[File], boundary: impl Into<String>) -> Self {
        let boundary = boundary.into();
        let mut buf = BytesMut::new();

        for file in files {
            buf.put_slice(b"--");
            buf.put_slice(boundary.as_bytes());
            buf.put_slice(b"\r\n");
            buf.put_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    escape_quotes(file.field()),
                    escape_quotes(file.filename())
                )
                .as_bytes(),
            );
            buf.put_slice(b"Content-Type: application/octet-stream\r\n\r\n");
            buf.put_slice(file.data());
            buf.put_slice(b"\r\n");
        }

        buf.put_slice(b"--");
        buf.put_slice(boundary.as_bytes());
        buf.put_slice(b"--\r\n");

        Self {
            boundary,
            body: buf.freeze(),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// `Content-Type` header value, including the boundary parameter.
    pub fn content_type(&self) -> String {
        format!("{}; boundary={}", ContentType::Multipart.mime(), self.boundary)
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

/// 30 random hex characters, short enough to stay well under the 70-char
/// limit of RFC 2046.
fn random_boundary() -> String {
    let bytes: [u8; 15] = rand::rng().random();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn escape_quotes(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_single_file() {
        let files = vec![File::from_bytes("doc", "notes.txt", &b"hello"[..])];
        let mp = MultipartBody::encode_with_boundary(&files, "XYZ");

        let expected = "--XYZ\r\n\
            Content-Disposition: form-data; name=\"doc\"; filename=\"notes.txt\"\r\n\
            Content-Type: application/octet-stream\r\n\
            \r\n\
            hello\r\n\
            --XYZ--\r\n";
        assert_eq!(mp.body(), &Bytes::from(expected));
        assert_eq!(mp.content_type(), "multipart/form-data; boundary=XYZ");
    }

    #[test]
    fn test_encode_preserves_file_order() {
        let files = vec![
            File::from_bytes("a", "first.bin", &b"1"[..]),
            File::from_bytes("b", "second.bin", &b"2"[..]),
        ];
        let body = MultipartBody::encode(&files).into_body();
        let text = String::from_utf8_lossy(&body);
        let first = text.find("first.bin").unwrap();
        let second = text.find("second.bin").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_random_boundary_shape() {
        let mp = MultipartBody::encode(&[]);
        assert_eq!(mp.boundary().len(), 30);
        assert!(mp.boundary().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(MultipartBody::encode(&[]).boundary(), mp.boundary());
    }

    #[test]
    fn test_quotes_escaped() {
        let files = vec![File::from_bytes("f\"x", "a\"b.txt", &b""[..])];
        let body = MultipartBody::encode_with_boundary(&files, "B").into_body();
        let text = String::from_utf8_lossy(&body);
        assert!(text.contains("name=\"f\\\"x\"; filename=\"a\\\"b.txt\""));
    }
}
