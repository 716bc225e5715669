//! Aidbox portal RPC client.
//!
//! Every call is one YAML document POSTed to a single endpoint:
//!
//! ```text
//! {"method":"portal.portal/get-license","params":{"id":"lic-42","token":"<api token>"}}
//! ```
//!
//! Requests are written in YAML's flow style so every parameter is a quoted
//! scalar. A license named `yes` or `on` stays a string for YAML 1.1 readers.
//!
//! Successful responses are decoded from `{result: {license, jwt}}`. Any
//! non-2xx status is surfaced as [`ClientError::Api`] with the status line
//! and raw body. Nothing is retried.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tracing::{debug, error};

use crate::error::ClientError;
use crate::types::{LicenseResponse, RpcRequest, RpcResponse};

/// Media type of request and response bodies.
pub const YAML_MEDIA_TYPE: &str = "text/yaml";

/// RPC method issuing a new license.
pub const ISSUE_LICENSE: &str = "portal.portal/issue-license";
/// RPC method fetching a license by id.
pub const GET_LICENSE: &str = "portal.portal/get-license";
/// RPC method removing a license.
pub const REMOVE_LICENSE: &str = "portal.portal/remove-license";

/// Error text the portal returns for a license the caller cannot see.
///
/// The portal reports a deleted license the same way it reports a license
/// from a foreign project, so this phrase is the only signal for "gone".
const NOT_A_MEMBER: &str = "You are not a member of the project";

/// The operations the provider needs from the license portal.
///
/// Implemented by [`HttpClient`] and by
/// [`MockLicenseClient`](crate::testing::MockLicenseClient) in tests.
#[async_trait]
pub trait LicenseClient: Send + Sync {
    /// Issue a new license.
    async fn create_license(
        &self,
        name: &str,
        product: &str,
        license_type: &str,
    ) -> Result<LicenseResponse, ClientError>;

    /// Fetch a license. `Ok(None)` means it no longer exists.
    async fn get_license(&self, id: &str) -> Result<Option<LicenseResponse>, ClientError>;

    /// Remove a license.
    async fn delete_license(&self, id: &str) -> Result<(), ClientError>;
}

/// Returns true if a failed get should be read as "license does not exist".
pub fn is_not_found(err: &ClientError) -> bool {
    err.to_string().contains(NOT_A_MEMBER)
}

/// HTTP implementation of [`LicenseClient`].
#[derive(Clone)]
pub struct HttpClient {
    endpoint: String,
    token: String,
    client: reqwest::Client,
}

impl HttpClient {
    /// Create a client for `endpoint` authenticating with `token`.
    ///
    /// Uses a pooled transport with reqwest's default timeout policy.
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_http_client(endpoint, token, reqwest::Client::new())
    }

    /// Create a client on top of an existing transport.
    pub fn with_http_client(
        endpoint: impl Into<String>,
        token: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: token.into(),
            client,
        }
    }

    /// The endpoint every call is POSTed to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call(
        &self,
        method: &str,
        params: BTreeMap<&str, &str>,
    ) -> Result<String, ClientError> {
        let request = RpcRequest { method, params };
        let body = encode_request(&request).map_err(|e| {
            error!(error = %e, "Failed to create YAML request body");
            ClientError::Encode(e)
        })?;

        debug!(method, endpoint = %self.endpoint, "Calling Aidbox RPC");

        let resp = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, YAML_MEDIA_TYPE)
            .header(ACCEPT, YAML_MEDIA_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                error!(method, error = %e, "API call failed");
                ClientError::Transport(e)
            })?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| {
            error!(method, error = %e, "Failed to read response body");
            ClientError::Body(e)
        })?;

        if !status.is_success() {
            error!(method, status = %status, body = %text, "API response error");
            return Err(ClientError::Api {
                status: status.to_string(),
                body: text,
            });
        }

        Ok(text)
    }
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("endpoint", &self.endpoint)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Encode a request envelope as flow-style YAML with every string quoted.
fn encode_request(request: &RpcRequest<'_>) -> Result<String, serde_json::Error> {
    serde_json::to_string(request)
}

fn parse_response(body: &str) -> Result<LicenseResponse, ClientError> {
    serde_yaml::from_str::<RpcResponse>(body)
        .map(LicenseResponse::from)
        .map_err(|e| {
            error!(error = %e, body, "Failed to parse YAML response");
            ClientError::Decode(e)
        })
}

#[async_trait]
impl LicenseClient for HttpClient {
    async fn create_license(
        &self,
        name: &str,
        product: &str,
        license_type: &str,
    ) -> Result<LicenseResponse, ClientError> {
        let params = BTreeMap::from([
            ("token", self.token.as_str()),
            ("name", name),
            ("product", product),
            ("type", license_type),
        ]);

        let body = self.call(ISSUE_LICENSE, params).await?;
        parse_response(&body)
    }

    async fn get_license(&self, id: &str) -> Result<Option<LicenseResponse>, ClientError> {
        let params = BTreeMap::from([("token", self.token.as_str()), ("id", id)]);

        match self.call(GET_LICENSE, params).await {
            Ok(body) => parse_response(&body).map(Some),
            Err(e) if is_not_found(&e) => {
                debug!(id, "License not visible to caller, treating as removed");
                Ok(None)
            },
            Err(e) => Err(e),
        }
    }

    async fn delete_license(&self, id: &str) -> Result<(), ClientError> {
        let params = BTreeMap::from([("token", self.token.as_str()), ("id", id)]);
        self.call(REMOVE_LICENSE, params).await.map(|_| ())
    }
}
