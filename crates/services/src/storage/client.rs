use std::sync::atomic::{AtomicBool, Ordering};

use reqwest::{header, Method, RequestBuilder};
use serde::Deserialize;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::session::SessionReader;
use crate::transport::{join_path, parse_endpoint, SharedTransport, Transport};

/// File upload input
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub bucket_id: Option<String>,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Stored file description returned by the storage service
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub bucket_id: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub etag: Option<String>,
}

/// Storage sub-client. Reads the shared session to authorize requests.
#[derive(Debug)]
pub struct StorageClient {
    instance_id: Uuid,
    endpoint: String,
    session: SessionReader,
    transport: SharedTransport,
    closed: AtomicBool,
}

impl StorageClient {
    /// Wire the client; performs no I/O.
    pub fn new(endpoint: &str, session: SessionReader, transport: SharedTransport) -> Result<Self, ServiceError> {
        parse_endpoint(endpoint)?;
        Ok(Self {
            instance_id: Uuid::new_v4(),
            endpoint: endpoint.to_string(),
            session,
            transport,
            closed: AtomicBool::new(false),
        })
    }

    pub fn instance_id(&self) -> Uuid { self.instance_id }
    pub fn endpoint(&self) -> &str { &self.endpoint }
    pub fn session(&self) -> &SessionReader { &self.session }
    pub fn transport(&self) -> &SharedTransport { &self.transport }

    /// Public URL of a stored file.
    pub fn file_url(&self, file_id: &str) -> String {
        join_path(&self.endpoint, &format!("files/{file_id}"))
    }

    #[instrument(skip(self, upload), fields(instance_id = %self.instance_id, file_name = %upload.file_name))]
    pub async fn upload(&self, upload: UploadRequest) -> Result<FileMetadata, ServiceError> {
        let url = join_path(&self.endpoint, "files");
        let mut req = self
            .authorized(Method::POST, &url)?
            .header(header::CONTENT_TYPE, upload.content_type)
            .header("x-file-name", upload.file_name);
        if let Some(bucket) = upload.bucket_id {
            req = req.header("x-bucket-id", bucket);
        }
        let response = req.body(upload.bytes).send().await?;
        let meta: FileMetadata = Transport::handle_response(response).await?;
        debug!(file_id = %meta.id, "file uploaded");
        Ok(meta)
    }

    #[instrument(skip(self), fields(instance_id = %self.instance_id))]
    pub async fn download(&self, file_id: &str) -> Result<Vec<u8>, ServiceError> {
        let response = self.authorized(Method::GET, &self.file_url(file_id))?.send().await?;
        let response = Transport::check_response(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    #[instrument(skip(self), fields(instance_id = %self.instance_id))]
    pub async fn delete(&self, file_id: &str) -> Result<(), ServiceError> {
        let response = self.authorized(Method::DELETE, &self.file_url(file_id))?.send().await?;
        Transport::check_response(response).await?;
        Ok(())
    }

    /// Refuse further calls. Returns `true` only for the first call.
    /// The shared transport is left open.
    pub fn close(&self) -> bool {
        let first = !self.closed.swap(true, Ordering::AcqRel);
        if first {
            debug!(instance_id = %self.instance_id, "storage client closed");
        }
        first
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn authorized(&self, method: Method, url: &str) -> Result<RequestBuilder, ServiceError> {
        if self.is_closed() {
            return Err(ServiceError::ClientClosed("storage"));
        }
        let req = self.transport.request(method, url)?;
        Ok(match self.session.bearer() {
            Some(bearer) => req.header(header::AUTHORIZATION, bearer),
            None => req,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Session, SessionData};
    use crate::transport::TransportConfig;
    use std::sync::Arc;

    fn setup() -> Result<(Arc<Session>, StorageClient), ServiceError> {
        let session = Arc::new(Session::volatile());
        let transport = Arc::new(Transport::new(&TransportConfig::default())?);
        let storage = StorageClient::new("https://myapp.storage.eu-west-1.nhost.run/v1", session.reader(), transport)?;
        Ok((session, storage))
    }

    #[test]
    fn attaches_current_session_token() -> Result<(), anyhow::Error> {
        let (session, storage) = setup()?;
        let req = storage.authorized(Method::GET, &storage.file_url("f1"))?.build()?;
        assert!(req.headers().get(header::AUTHORIZATION).is_none());

        session.set(SessionData::new("tok"))?;
        let req = storage.authorized(Method::GET, &storage.file_url("f1"))?.build()?;
        assert_eq!(req.headers().get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()), Some("Bearer tok"));
        assert_eq!(req.url().as_str(), "https://myapp.storage.eu-west-1.nhost.run/v1/files/f1");
        Ok(())
    }

    #[tokio::test]
    async fn closed_client_refuses_calls() -> Result<(), ServiceError> {
        let (_session, storage) = setup()?;
        assert!(storage.close());
        assert!(!storage.close());
        assert!(matches!(storage.download("f1").await, Err(ServiceError::ClientClosed("storage"))));
        assert!(!storage.transport().is_closed());
        Ok(())
    }
}
