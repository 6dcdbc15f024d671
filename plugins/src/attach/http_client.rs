use std::io;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::Deserialize;
use tokio::io::AsyncReadExt;

use diagkit_core::attach::{AttachClient, AttachSettings, UploadFile, ATTACHMENT_KEY_HEADER};
use diagkit_core::error::AttachError;

const BODY_PREVIEW_LIMIT: usize = 512;
const UPLOAD_URL_TIMEOUT: Duration = Duration::from_secs(30);
const CHUNK_SIZE: usize = 64 * 1024;

/// Body of the upload URL endpoint: a URL, or an error message.
#[derive(Debug, Deserialize)]
struct UploadUrlResponse {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

fn preview_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }

    let mut out = String::new();
    let mut truncated = false;
    for (idx, ch) in trimmed.chars().enumerate() {
        if idx >= BODY_PREVIEW_LIMIT {
            truncated = true;
            break;
        }
        out.push(ch);
    }

    if truncated {
        out.push_str("...");
    }

    out
}

fn transport_error(err: reqwest::Error, url: &str) -> AttachError {
    let kind = if err.is_timeout() {
        "timeout"
    } else if err.is_connect() {
        "connect"
    } else if err.is_request() {
        "request"
    } else if err.is_body() {
        "body"
    } else {
        "unknown"
    };
    AttachError::Transport {
        url: url.to_string(),
        message: format!("{kind}: {err}"),
    }
}

/// Reads `file` in fixed-size chunks for a streamed request body.
fn file_chunks(mut file: tokio::fs::File) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
    async_stream::try_stream! {
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            yield Bytes::copy_from_slice(&buf[..n]);
        }
    }
}

/// Talks to the attachment endpoint over HTTP.
#[derive(Clone)]
pub struct HttpAttachClient {
    http: reqwest::Client,
    url_upload_url: String,
    transfer_timeout: Duration,
}

impl HttpAttachClient {
    pub fn new(settings: &AttachSettings) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().build()?;
        let normalized = settings.endpoint.trim_end_matches('/');
        Ok(Self {
            http,
            url_upload_url: format!("{}/upload_url", normalized),
            transfer_timeout: settings.timeout,
        })
    }
}

#[async_trait]
impl AttachClient for HttpAttachClient {
    async fn request_upload_url(&self, attachment_key: &str, file: &UploadFile) -> Result<String, AttachError> {
        let url = &self.url_upload_url;
        let url_error = |message: String| AttachError::UploadUrl {
            filename: file.filename.clone(),
            message,
        };
        tracing::debug!(
            target: "diagkit.attach",
            stage = "attach.http.upload_url.in",
            url = %url,
            filename = %file.filename,
            filesize = file.size
        );

        let filesize = file.size.to_string();
        let resp = self
            .http
            .get(url)
            .query(&[
                ("attachment_key", attachment_key),
                ("filename", file.filename.as_str()),
                ("filesize", filesize.as_str()),
            ])
            .timeout(UPLOAD_URL_TIMEOUT)
            .send()
            .await
            .map_err(|err| url_error(transport_error(err, url).to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|err| url_error(transport_error(err, url).to_string()))?;
        if !status.is_success() {
            return Err(url_error(format!(
                "status {}: {}",
                status.as_u16(),
                preview_body(&body)
            )));
        }

        let parsed: UploadUrlResponse = serde_json::from_str(&body).map_err(|err| AttachError::Decode {
            url: url.clone(),
            message: format!("{} | body={}", err, preview_body(&body)),
        })?;
        tracing::debug!(
            target: "diagkit.attach",
            stage = "attach.http.upload_url.out",
            status = %status
        );
        match (parsed.url, parsed.error) {
            (Some(upload_url), _) if !upload_url.trim().is_empty() => Ok(upload_url),
            (_, Some(error)) => Err(url_error(error)),
            _ => Err(url_error("response carried no url".to_string())),
        }
    }

    async fn transfer(&self, url: &str, attachment_key: &str, file: &UploadFile) -> Result<(), AttachError> {
        let handle = tokio::fs::File::open(&file.path)
            .await
            .map_err(|source| AttachError::Reader {
                path: file.path.clone(),
                source,
            })?;
        tracing::debug!(
            target: "diagkit.attach",
            stage = "attach.http.transfer.in",
            filename = %file.filename,
            bytes = file.size
        );

        let resp = self
            .http
            .put(url)
            .header(ATTACHMENT_KEY_HEADER, attachment_key)
            .header(reqwest::header::CONTENT_LENGTH, file.size)
            .body(reqwest::Body::wrap_stream(file_chunks(handle)))
            .timeout(self.transfer_timeout)
            .send()
            .await
            .map_err(|err| transport_error(err, url))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::debug!(
                target: "diagkit.attach",
                status = %status,
                body = %preview_body(&body),
                "transfer rejected"
            );
            return Err(AttachError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        tracing::debug!(target: "diagkit.attach", stage = "attach.http.transfer.out", status = %status);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diagkit_core::attach::upload_files;
    use mockito::{Matcher, Server};

    #[test]
    fn test_preview_body_empty() {
        assert_eq!(preview_body("   "), "<empty body>");
    }

    #[test]
    fn test_preview_body_truncates() {
        let body = "a".repeat(BODY_PREVIEW_LIMIT + 10);
        let preview = preview_body(&body);
        assert!(preview.ends_with("..."));
        assert!(preview.len() <= BODY_PREVIEW_LIMIT + 3);
    }

    fn settings(endpoint: String) -> AttachSettings {
        AttachSettings {
            endpoint,
            timeout: Duration::from_secs(5),
        }
    }

    fn upload_file(dir: &std::path::Path, name: &str, body: &[u8]) -> UploadFile {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        UploadFile::from_path(&path).unwrap()
    }

    #[tokio::test]
    async fn test_upload_url_request_carries_query() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/attachments/upload_url")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("attachment_key".into(), "key-1".into()),
                Matcher::UrlEncoded("filename".into(), "a.json".into()),
                Matcher::UrlEncoded("filesize".into(), "4".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"url":"https://bucket.example.com/a.json?sig=1"}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = upload_file(dir.path(), "a.json", b"mock");
        let client = HttpAttachClient::new(&settings(format!("{}/attachments", server.url()))).unwrap();
        let url = client.request_upload_url("key-1", &file).await.unwrap();
        assert_eq!(url, "https://bucket.example.com/a.json?sig=1");
    }

    #[tokio::test]
    async fn test_upload_url_error_body() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/upload_url")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"error":"invalid attachment key"}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = upload_file(dir.path(), "a.json", b"mock");
        let client = HttpAttachClient::new(&settings(server.url())).unwrap();
        let err = client.request_upload_url("bad", &file).await.unwrap_err();
        assert!(err.to_string().contains("invalid attachment key"));
    }

    #[tokio::test]
    async fn test_upload_url_decode_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/upload_url")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = upload_file(dir.path(), "a.json", b"mock");
        let client = HttpAttachClient::new(&settings(server.url())).unwrap();
        let err = client.request_upload_url("key", &file).await.unwrap_err();
        assert!(matches!(err, AttachError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_full_upload_returns_public_url() {
        let mut server = Server::new_async().await;
        let put_url = format!("{}/bucket/a.json?sig=abc", server.url());
        let _get = server
            .mock("GET", "/upload_url")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(serde_json::json!({ "url": put_url }).to_string())
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/bucket/a.json")
            .match_query(Matcher::UrlEncoded("sig".into(), "abc".into()))
            .match_header("attachment-key", "key-1")
            .match_header("content-length", "4")
            .match_body("mock")
            .with_status(200)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = upload_file(dir.path(), "a.json", b"mock");
        let client = HttpAttachClient::new(&settings(server.url())).unwrap();
        let urls = upload_files(&client, "key-1", &[file]).await.unwrap();

        put.assert_async().await;
        assert_eq!(urls, vec![format!("{}/bucket/a.json", server.url())]);
    }

    #[tokio::test]
    async fn test_transfer_status_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("PUT", "/bucket/a.json")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = upload_file(dir.path(), "a.json", b"mock");
        let client = HttpAttachClient::new(&settings(server.url())).unwrap();
        let err = client
            .transfer(&format!("{}/bucket/a.json", server.url()), "key", &file)
            .await
            .unwrap_err();
        assert!(matches!(err, AttachError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_second_url_failure_reports_no_urls() {
        let mut server = Server::new_async().await;
        let put_url = format!("{}/bucket/a.json", server.url());
        let _first = server
            .mock("GET", "/upload_url")
            .match_query(Matcher::UrlEncoded("filename".into(), "a.json".into()))
            .with_status(200)
            .with_body(serde_json::json!({ "url": put_url }).to_string())
            .create_async()
            .await;
        let _second = server
            .mock("GET", "/upload_url")
            .match_query(Matcher::UrlEncoded("filename".into(), "b.zip".into()))
            .with_status(500)
            .with_body("unavailable")
            .create_async()
            .await;
        let _put = server
            .mock("PUT", "/bucket/a.json")
            .with_status(200)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            upload_file(dir.path(), "a.json", b"mock"),
            upload_file(dir.path(), "b.zip", b"zipzip"),
        ];
        let client = HttpAttachClient::new(&settings(server.url())).unwrap();
        let err = upload_files(&client, "key", &files).await.unwrap_err();
        assert!(matches!(err, AttachError::UploadUrl { ref filename, .. } if filename == "b.zip"));
    }

    #[tokio::test]
    async fn test_unreadable_file_is_a_reader_error() {
        let client = HttpAttachClient::new(&settings("http://127.0.0.1:9".into())).unwrap();
        let file = UploadFile {
            filename: "gone.zip".into(),
            size: 1,
            path: "/nonexistent/gone.zip".into(),
        };
        let err = client
            .transfer("http://127.0.0.1:9/x", "key", &file)
            .await
            .unwrap_err();
        assert!(matches!(err, AttachError::Reader { .. }));
    }
}
