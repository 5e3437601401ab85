//! Functions sub-client. Holds no closable resource of its own.

use reqwest::{header, Method, Request};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::session::SessionReader;
use crate::transport::{join_path, parse_endpoint, SharedTransport, Transport};

#[derive(Debug)]
pub struct FunctionsClient {
    instance_id: Uuid,
    endpoint: String,
    session: SessionReader,
    transport: SharedTransport,
}

impl FunctionsClient {
    /// Wire the client; performs no I/O.
    pub fn new(endpoint: &str, session: SessionReader, transport: SharedTransport) -> Result<Self, ServiceError> {
        parse_endpoint(endpoint)?;
        Ok(Self { instance_id: Uuid::new_v4(), endpoint: endpoint.to_string(), session, transport })
    }

    pub fn instance_id(&self) -> Uuid { self.instance_id }
    pub fn endpoint(&self) -> &str { &self.endpoint }
    pub fn session(&self) -> &SessionReader { &self.session }
    pub fn transport(&self) -> &SharedTransport { &self.transport }

    /// Build the JSON POST for function `name` without sending it.
    pub fn build_call<B: Serialize + ?Sized>(&self, name: &str, body: &B) -> Result<Request, ServiceError> {
        let url = join_path(&self.endpoint, name);
        let mut req = self.transport.request(Method::POST, &url)?.json(body);
        if let Some(bearer) = self.session.bearer() {
            req = req.header(header::AUTHORIZATION, bearer);
        }
        Ok(req.build()?)
    }

    #[instrument(skip(self, body), fields(instance_id = %self.instance_id))]
    pub async fn call<B, R>(&self, name: &str, body: &B) -> Result<R, ServiceError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let request = self.build_call(name, body)?;
        let response = self.transport.execute(request).await?;
        Transport::handle_response(response).await
    }
}
