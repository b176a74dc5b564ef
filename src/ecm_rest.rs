//! HTTP [`ContentServer`] client.
//!
//! Talks JSON to the content server's REST API. A session starts with
//! [`RestContentServer::connect`], which posts the credentials to `/auth`
//! and keeps the returned ticket; every later request carries it in the
//! `OTCSTicket` header. [`ContentServer::close`] deletes the session.
//!
//! | Operation | Request |
//! |-----------|---------|
//! | category template | `GET /categories/{id}/template` |
//! | node | `GET /nodes/{id}` |
//! | node by path | `GET /nodes/{root}/path?segment=..` |
//! | child by name | `GET /nodes/{parent}/children?name=..` |
//! | create folder | `POST /nodes/{parent}/folders` |
//! | document context | `POST /nodes/{parent}/documents` |
//! | version context | `POST /nodes/{doc}/versions` |
//! | upload | `PUT /contexts/{ctx}/content` |
//! | download | `GET /nodes/{doc}/content` |
//!
//! Lookups answer `404` with `None`. Any other non-success status becomes
//! [`Error::Transport`] carrying the status and the start of the body.
//! There are no retries.

use std::io::SeekFrom;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use permit_ecm_core::category::{Metadata, RemoteTemplate};
use permit_ecm_core::ecm::ContentServer;
use permit_ecm_core::models::{ContentReader, FileAttributes, FileContent, FolderNode, NodeId};
use permit_ecm_core::{Error, Result};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncSeekExt, AsyncWriteExt, ReadBuf};
use tokio_util::io::ReaderStream;

use crate::config::EcmConfig;

/// Header carrying the session ticket.
pub const TICKET_HEADER: &str = "OTCSTicket";
pub const FILE_NAME_HEADER: &str = "X-File-Name";
pub const FILE_SIZE_HEADER: &str = "X-File-Size";
pub const FILE_CREATED_HEADER: &str = "X-File-Created";
pub const FILE_MODIFIED_HEADER: &str = "X-File-Modified";

#[derive(Serialize)]
struct AuthRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct AuthResponse {
    ticket: String,
}

#[derive(Serialize)]
struct CreateFolderRequest<'a> {
    name: &'a str,
    comment: &'a str,
    metadata: &'a Metadata,
}

#[derive(Serialize)]
struct CreateDocumentRequest<'a> {
    name: &'a str,
    comment: &'a str,
    advanced_versioning: bool,
    metadata: &'a Metadata,
}

#[derive(Serialize)]
struct AddVersionRequest<'a> {
    metadata: &'a Metadata,
}

#[derive(Deserialize)]
struct ContextResponse {
    context_id: String,
}

#[derive(Deserialize)]
struct ObjectResponse {
    id: NodeId,
}

/// Authenticated REST session.
pub struct RestContentServer {
    client: reqwest::Client,
    base_url: String,
    ticket: String,
}

impl RestContentServer {
    /// Authenticate and open a session.
    pub async fn connect(config: &EcmConfig, password: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(Error::transport)?;
        let base_url = config.base_url.trim_end_matches('/').to_string();

        let resp = client
            .post(format!("{}/auth", base_url))
            .json(&AuthRequest {
                username: &config.username,
                password,
            })
            .send()
            .await
            .map_err(Error::transport)?;
        let auth: AuthResponse = check(resp, "ECM authentication")
            .await?
            .json()
            .await
            .map_err(Error::transport)?;

        tracing::debug!(base_url = %base_url, username = %config.username, "ECM session opened");
        Ok(Self {
            client,
            base_url,
            ticket: auth.ticket,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(self.url(path))
            .header(TICKET_HEADER, &self.ticket)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(self.url(path))
            .header(TICKET_HEADER, &self.ticket)
    }

    /// Send and decode a JSON body.
    async fn fetch<T: DeserializeOwned>(&self, req: RequestBuilder, what: &str) -> Result<T> {
        let resp = req.send().await.map_err(Error::transport)?;
        check(resp, what)
            .await?
            .json()
            .await
            .map_err(Error::transport)
    }

    /// Like [`fetch`](Self::fetch), with `404` mapped to `None`.
    async fn fetch_optional<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        what: &str,
    ) -> Result<Option<T>> {
        let resp = req.send().await.map_err(Error::transport)?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let value = check(resp, what)
            .await?
            .json()
            .await
            .map_err(Error::transport)?;
        Ok(Some(value))
    }
}

async fn check(resp: Response, what: &str) -> Result<Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    Err(Error::transport(format!(
        "{} failed (HTTP {}): {}",
        what,
        status,
        body.chars().take(500).collect::<String>()
    )))
}

/// Reader that traces each frame pulled by the upload stream.
struct TracedReader {
    inner: ContentReader,
    frames: usize,
    bytes: u64,
}

impl AsyncRead for TracedReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let before = buf.filled().len();
        let poll = Pin::new(&mut self.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = poll {
            let n = buf.filled().len() - before;
            if n > 0 {
                self.frames += 1;
                self.bytes += n as u64;
                tracing::trace!(frame = self.frames, bytes = self.bytes, "upload chunk");
            }
        }
        poll
    }
}

#[async_trait]
impl ContentServer for RestContentServer {
    async fn category_template(&self, category_id: i64) -> Result<RemoteTemplate> {
        let path = format!("/categories/{}/template", category_id);
        self.fetch(self.get(&path), "category template fetch")
            .await
            .map_err(|e| Error::Template {
                category_id,
                source: Box::new(e),
            })
    }

    async fn node(&self, node_id: NodeId) -> Result<Option<FolderNode>> {
        self.fetch_optional(self.get(&format!("/nodes/{}", node_id)), "node lookup")
            .await
    }

    async fn node_by_path(
        &self,
        root_id: NodeId,
        segments: &[String],
    ) -> Result<Option<FolderNode>> {
        let query: Vec<(&str, &str)> = segments.iter().map(|s| ("segment", s.as_str())).collect();
        let req = self
            .get(&format!("/nodes/{}/path", root_id))
            .query(&query);
        self.fetch_optional(req, "path lookup").await
    }

    async fn child_by_name(&self, parent_id: NodeId, name: &str) -> Result<Option<FolderNode>> {
        let req = self
            .get(&format!("/nodes/{}/children", parent_id))
            .query(&[("name", name)]);
        self.fetch_optional(req, "child lookup").await
    }

    async fn create_folder(
        &self,
        parent_id: NodeId,
        name: &str,
        comment: &str,
        metadata: &Metadata,
    ) -> Result<FolderNode> {
        let req = self
            .post(&format!("/nodes/{}/folders", parent_id))
            .json(&CreateFolderRequest {
                name,
                comment,
                metadata,
            });
        self.fetch(req, "folder create").await
    }

    async fn create_document_context(
        &self,
        parent_id: NodeId,
        name: &str,
        comment: &str,
        advanced_versioning: bool,
        metadata: &Metadata,
    ) -> Result<String> {
        let req = self
            .post(&format!("/nodes/{}/documents", parent_id))
            .json(&CreateDocumentRequest {
                name,
                comment,
                advanced_versioning,
                metadata,
            });
        let resp: ContextResponse = self.fetch(req, "document create").await?;
        Ok(resp.context_id)
    }

    async fn add_major_version_context(
        &self,
        document_id: NodeId,
        metadata: &Metadata,
    ) -> Result<String> {
        let req = self
            .post(&format!("/nodes/{}/versions", document_id))
            .json(&AddVersionRequest { metadata });
        let resp: ContextResponse = self.fetch(req, "version add").await?;
        Ok(resp.context_id)
    }

    async fn upload_content(
        &self,
        context_id: &str,
        attributes: FileAttributes,
        reader: ContentReader,
        chunk_size: usize,
    ) -> Result<NodeId> {
        let traced = TracedReader {
            inner: reader,
            frames: 0,
            bytes: 0,
        };
        let body = reqwest::Body::wrap_stream(ReaderStream::with_capacity(traced, chunk_size));
        let req = self
            .client
            .put(self.url(&format!("/contexts/{}/content", context_id)))
            .header(TICKET_HEADER, &self.ticket)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, attributes.size)
            .header(FILE_NAME_HEADER, &attributes.file_name)
            .header(FILE_SIZE_HEADER, attributes.size)
            .header(FILE_CREATED_HEADER, attributes.created.to_rfc3339())
            .header(FILE_MODIFIED_HEADER, attributes.modified.to_rfc3339())
            .body(body);
        let resp: ObjectResponse = self.fetch(req, "content upload").await?;
        Ok(resp.id)
    }

    async fn download_content(&self, document_id: NodeId) -> Result<FileContent> {
        let resp = self
            .get(&format!("/nodes/{}/content", document_id))
            .send()
            .await
            .map_err(Error::transport)?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("content of document {}", document_id)));
        }
        let mut resp = check(resp, "content download").await?;

        let mime_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let file_name = resp
            .headers()
            .get(FILE_NAME_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| format!("document-{}", document_id));

        // Anonymous temp file: removed by the OS once the handle is dropped.
        let mut file = tokio::fs::File::from_std(tempfile::tempfile()?);
        let mut size = 0u64;
        while let Some(chunk) = resp.chunk().await.map_err(Error::transport)? {
            file.write_all(&chunk).await?;
            size += chunk.len() as u64;
        }
        file.flush().await?;
        file.seek(SeekFrom::Start(0)).await?;

        Ok(FileContent {
            file_name,
            mime_type,
            size,
            reader: Box::new(file),
        })
    }

    async fn close(&self) -> Result<()> {
        let resp = self
            .client
            .delete(self.url("/auth"))
            .header(TICKET_HEADER, &self.ticket)
            .send()
            .await
            .map_err(Error::transport)?;
        check(resp, "ECM sign-out").await?;
        tracing::debug!("ECM session closed");
        Ok(())
    }
}
