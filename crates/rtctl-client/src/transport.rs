//! HTTP transport that carries XML-RPC documents to the daemon endpoint.

use std::fmt;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use rtctl_core::{Transport, TransportError, Value};
use tracing::{debug, warn};

use crate::xmlrpc::{MethodResponse, decode_response, encode_call};

const XML_CONTENT_TYPE: &str = "text/xml";

#[derive(Clone)]
struct Credentials {
    username: String,
    password: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// [`Transport`] that POSTs XML-RPC documents over HTTP(S).
///
/// Credentials embedded in the endpoint URL are moved into a basic-auth
/// header so they never appear in logged URLs.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
    credentials: Option<Credentials>,
    max_request_bytes: usize,
}

impl HttpTransport {
    /// Wrap an HTTP client targeting `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidEndpoint`] when credentials embedded in
    /// `endpoint` cannot be removed from it.
    pub fn new(
        client: Client,
        mut endpoint: Url,
        max_request_bytes: usize,
    ) -> Result<Self, TransportError> {
        let credentials = (!endpoint.username().is_empty()).then(|| Credentials {
            username: endpoint.username().to_string(),
            password: endpoint.password().map(str::to_string),
        });
        if credentials.is_some()
            && (endpoint.set_username("").is_err() || endpoint.set_password(None).is_err())
        {
            return Err(TransportError::InvalidEndpoint {
                reason: "credentials cannot be removed from the endpoint",
            });
        }
        Ok(Self {
            client,
            endpoint,
            credentials,
            max_request_bytes,
        })
    }

    /// Endpoint the transport posts to, without credentials.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Largest encoded request this transport will send.
    #[must_use]
    pub const fn max_request_bytes(&self) -> usize {
        self.max_request_bytes
    }
}

fn request_failed<E>(method: &str, source: E) -> TransportError
where
    E: std::error::Error + Send + Sync + 'static,
{
    TransportError::Request {
        method: method.to_string(),
        source: Box::new(source),
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, TransportError> {
        let body = encode_call(method, &params);
        let request_bytes = body.len();
        if request_bytes > self.max_request_bytes {
            warn!(
                method,
                size = request_bytes,
                limit = self.max_request_bytes,
                "request exceeds payload ceiling"
            );
            return Err(TransportError::PayloadTooLarge {
                size: request_bytes,
                limit: self.max_request_bytes,
            });
        }

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, XML_CONTENT_TYPE)
            .body(body);
        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(&credentials.username, credentials.password.as_deref());
        }

        let response = request
            .send()
            .await
            .map_err(|source| request_failed(method, source))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                method: method.to_string(),
                status: status.as_u16(),
            });
        }
        let text = response
            .text()
            .await
            .map_err(|source| request_failed(method, source))?;
        debug!(
            method,
            request_bytes,
            response_bytes = text.len(),
            "xml-rpc call completed"
        );

        match decode_response(&text).map_err(|source| request_failed(method, source))? {
            MethodResponse::Success(value) => Ok(value),
            MethodResponse::Fault(fault) => Err(TransportError::Fault {
                code: fault.code,
                message: fault.message,
            }),
        }
    }
}
