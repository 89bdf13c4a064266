//! File attachments for multipart requests.

use bytes::Bytes;
use std::io::Read;
use std::path::Path;

use crate::EncodeError;

/// An immutable multipart attachment.
///
/// The file name is always reduced to its base name, so a path such as
/// `reports/2024/q1.csv` is sent as `q1.csv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    field: String,
    filename: String,
    data: Bytes,
}

impl File {
    /// Read an attachment from disk.
    ///
    /// The file is read synchronously and completely; a read failure is
    /// returned here rather than when the request is sent.
    pub fn from_path(field: impl Into<String>, path: impl AsRef<Path>) -> Result<Self, EncodeError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| EncodeError::io(path.display().to_string(), e))?;
        Ok(Self::from_bytes(field, path.to_string_lossy(), data))
    }

    /// Async counterpart of [`File::from_path`].
    pub async fn from_path_async(
        field: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> Result<Self, EncodeError> {
        let path = path.as_ref();
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| EncodeError::io(path.display().to_string(), e))?;
        Ok(Self::from_bytes(field, path.to_string_lossy(), data))
    }

    /// Build an attachment from bytes already in memory.
    pub fn from_bytes(
        field: impl Into<String>,
        filename: impl AsRef<str>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            field: field.into(),
            filename: base_name(filename.as_ref()),
            data: data.into(),
        }
    }

    /// Build an attachment by draining a reader.
    pub fn from_reader<R: Read>(
        field: impl Into<String>,
        filename: impl AsRef<str>,
        mut reader: R,
    ) -> Result<Self, EncodeError> {
        let filename = filename.as_ref();
        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .map_err(|e| EncodeError::io(filename, e))?;
        Ok(Self::from_bytes(field, filename, data))
    }

    /// Form field name.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Base file name.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Raw payload.
    pub fn data(&self) -> &Bytes {
        &self.data
    }
}

fn base_name(name: &str) -> String {
    Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Write};

    #[test]
    fn test_from_bytes_strips_directories() {
        let file = File::from_bytes("upload", "a/b/c/report.csv", &b"x,y"[..]);
        assert_eq!(file.field(), "upload");
        assert_eq!(file.filename(), "report.csv");
        assert_eq!(file.data(), &Bytes::from_static(b"x,y"));
    }

    #[test]
    fn test_from_path_reads_contents() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"payload").unwrap();

        let file = File::from_path("doc", tmp.path()).unwrap();
        assert_eq!(&file.data()[..], b"payload");
        assert_eq!(
            file.filename(),
            tmp.path().file_name().unwrap().to_string_lossy()
        );
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = File::from_path("doc", "/definitely/not/here.bin").unwrap_err();
        assert!(matches!(err, EncodeError::Io { .. }));
    }

    #[tokio::test]
    async fn test_from_path_async() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"async").unwrap();

        let file = File::from_path_async("doc", tmp.path()).await.unwrap();
        assert_eq!(&file.data()[..], b"async");
    }

    #[test]
    fn test_from_reader() {
        let file = File::from_reader("f", "dir/name.txt", io::Cursor::new(b"abc".to_vec())).unwrap();
        assert_eq!(file.filename(), "name.txt");
        assert_eq!(&file.data()[..], b"abc");
    }

    #[test]
    fn test_from_reader_failure() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::other("boom"))
            }
        }

        let err = File::from_reader("f", "x.bin", Broken).unwrap_err();
        assert!(err.to_string().contains("boom"));
    }
}
