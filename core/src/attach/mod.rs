//! Upload of produced files to the attachment endpoint.
//!
//! The HTTP side lives behind [`AttachClient`]; this module owns the
//! orchestration (one URL request then one transfer per file, first error
//! aborts) and endpoint precedence.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::AttachError;

/// Used when neither a flag nor the config file names an endpoint.
pub const DEFAULT_ATTACHMENT_ENDPOINT: &str = "http://localhost:3000/attachments";

/// Per-request timeout for file transfers.
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(7200);

/// Header carrying the attachment key on transfers.
pub const ATTACHMENT_KEY_HEADER: &str = "Attachment-Key";

/// Pick the endpoint: explicit flag, then persisted config, then the default.
/// Blank values count as unset.
pub fn resolve_attachment_endpoint(flag: Option<&str>, persisted: Option<&str>) -> String {
    [flag, persisted]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|v| !v.is_empty())
        .unwrap_or(DEFAULT_ATTACHMENT_ENDPOINT)
        .trim_end_matches('/')
        .to_string()
}

/// Attachment settings resolved once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachSettings {
    pub endpoint: String,
    pub timeout: Duration,
}

impl AttachSettings {
    pub fn resolve(flag: Option<&str>, persisted: Option<&str>, timeout: Option<Duration>) -> Self {
        Self {
            endpoint: resolve_attachment_endpoint(flag, persisted),
            timeout: timeout.unwrap_or(UPLOAD_TIMEOUT),
        }
    }
}

impl Default for AttachSettings {
    fn default() -> Self {
        Self::resolve(None, None, None)
    }
}

/// A file to upload: the name the server sees, its size, and where to read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub filename: String,
    pub size: u64,
    pub path: PathBuf,
}

impl UploadFile {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, AttachError> {
        let path = path.as_ref();
        let meta = std::fs::metadata(path).map_err(|source| AttachError::Reader {
            path: path.to_path_buf(),
            source,
        })?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            filename,
            size: meta.len(),
            path: path.to_path_buf(),
        })
    }
}

/// Remote side of an upload.
#[async_trait]
pub trait AttachClient: Send + Sync {
    /// Ask the endpoint where `file` should be sent.
    async fn request_upload_url(&self, attachment_key: &str, file: &UploadFile) -> Result<String, AttachError>;

    /// Stream `file` to `url`, declaring its byte length.
    async fn transfer(&self, url: &str, attachment_key: &str, file: &UploadFile) -> Result<(), AttachError>;
}

/// Upload `files` in order and return one public URL per file.
///
/// The first failure aborts the batch; files already sent stay sent.
pub async fn upload_files(
    client: &dyn AttachClient,
    attachment_key: &str,
    files: &[UploadFile],
) -> Result<Vec<String>, AttachError> {
    let mut urls = Vec::with_capacity(files.len());
    for file in files {
        tracing::info!(
            target: "diagkit.attach",
            file = %file.filename,
            bytes = file.size,
            "uploading"
        );
        let upload_url = client.request_upload_url(attachment_key, file).await?;
        client.transfer(&upload_url, attachment_key, file).await?;
        let url = public_url(&upload_url);
        tracing::debug!(target: "diagkit.attach", file = %file.filename, %url, "uploaded");
        urls.push(url);
    }
    Ok(urls)
}

/// Public location of an upload: the destination URL without its query.
pub fn public_url(upload_url: &str) -> String {
    let end = upload_url.find(|c| c == '?' || c == '#').unwrap_or(upload_url.len());
    upload_url[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeClient {
        fail_url_for: Option<&'static str>,
        fail_transfer_for: Option<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AttachClient for FakeClient {
        async fn request_upload_url(&self, key: &str, file: &UploadFile) -> Result<String, AttachError> {
            self.calls.lock().unwrap().push(format!("url:{}", file.filename));
            if self.fail_url_for == Some(file.filename.as_str()) {
                return Err(AttachError::UploadUrl {
                    filename: file.filename.clone(),
                    message: "boom".into(),
                });
            }
            Ok(format!(
                "https://bucket.example.com/{}/{}?signature=abc",
                key, file.filename
            ))
        }

        async fn transfer(&self, url: &str, _key: &str, file: &UploadFile) -> Result<(), AttachError> {
            self.calls.lock().unwrap().push(format!("put:{}", file.filename));
            if self.fail_transfer_for == Some(file.filename.as_str()) {
                return Err(AttachError::Status {
                    status: 500,
                    url: url.to_string(),
                });
            }
            Ok(())
        }
    }

    fn file(name: &str) -> UploadFile {
        UploadFile {
            filename: name.to_string(),
            size: 4,
            path: PathBuf::from(name),
        }
    }

    #[test]
    fn test_endpoint_precedence() {
        assert_eq!(
            resolve_attachment_endpoint(Some("https://flag.example.com/"), Some("https://cfg.example.com")),
            "https://flag.example.com"
        );
        assert_eq!(
            resolve_attachment_endpoint(None, Some("https://cfg.example.com")),
            "https://cfg.example.com"
        );
        assert_eq!(
            resolve_attachment_endpoint(Some("  "), None),
            DEFAULT_ATTACHMENT_ENDPOINT
        );
        assert_eq!(AttachSettings::default().timeout, UPLOAD_TIMEOUT);
    }

    #[test]
    fn test_public_url_drops_query() {
        assert_eq!(
            public_url("https://b.example.com/k/a.zip?X-Amz-Signature=1&x=2"),
            "https://b.example.com/k/a.zip"
        );
        assert_eq!(public_url("https://b.example.com/k/a.zip"), "https://b.example.com/k/a.zip");
    }

    #[tokio::test]
    async fn test_successful_batch_returns_urls_in_order() {
        let client = FakeClient::default();
        let urls = upload_files(&client, "key", &[file("a.json"), file("b.zip")])
            .await
            .unwrap();
        assert_eq!(
            urls,
            vec![
                "https://bucket.example.com/key/a.json",
                "https://bucket.example.com/key/b.zip"
            ]
        );
    }

    #[tokio::test]
    async fn test_second_url_failure_aborts_batch() {
        let client = FakeClient {
            fail_url_for: Some("b.zip"),
            ..Default::default()
        };
        let err = upload_files(&client, "key", &[file("a.json"), file("b.zip")])
            .await
            .unwrap_err();

        assert!(matches!(err, AttachError::UploadUrl { .. }));
        assert_eq!(
            *client.calls.lock().unwrap(),
            vec!["url:a.json", "put:a.json", "url:b.zip"]
        );
    }

    #[tokio::test]
    async fn test_transfer_failure_stops_remaining_files() {
        let client = FakeClient {
            fail_transfer_for: Some("a.json"),
            ..Default::default()
        };
        let err = upload_files(&client, "key", &[file("a.json"), file("b.zip")])
            .await
            .unwrap_err();
        assert!(matches!(err, AttachError::Status { status: 500, .. }));
        assert_eq!(client.calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_upload_file_reads_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diagkit-output.zip");
        std::fs::write(&path, b"mock").unwrap();
        let f = UploadFile::from_path(&path).unwrap();
        assert_eq!(f.size, 4);
        assert_eq!(f.filename, "diagkit-output.zip");
        assert!(matches!(
            UploadFile::from_path(dir.path().join("missing")),
            Err(AttachError::Reader { .. })
        ));
    }
}
