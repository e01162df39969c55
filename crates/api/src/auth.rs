use crate::api::{error_headers, http_client};
use crate::error::AuthError;
use crate::types::{AccessCredential, ConsumerKey, RequestToken};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// The three calls of the Pocket authorization protocol.
///
/// Implementations carry the application identity themselves; the flow controller
/// only supplies the per-attempt values.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn obtain_request_token(&self, redirect_target: &Url) -> Result<RequestToken, AuthError>;

    fn authorization_url(&self, token: &RequestToken, redirect_target: &Url) -> Url;

    async fn exchange_request_token(&self, token: RequestToken)
        -> Result<AccessCredential, AuthError>;
}

/// Builds the page the user opens to approve access.
pub fn authorization_url(base: &Url, token: &RequestToken, redirect_target: &Url) -> Url {
    let mut url = base.clone();
    url.set_path("/auth/authorize");
    url.query_pairs_mut()
        .clear()
        .append_pair("request_token", token.as_str())
        .append_pair("redirect_uri", redirect_target.as_str());
    url
}

#[derive(Serialize)]
struct RequestTokenBody<'a> {
    consumer_key: &'a str,
    redirect_uri: &'a str,
}

#[derive(Deserialize)]
struct RequestTokenResponse {
    code: String,
}

#[derive(Serialize)]
struct AuthorizeBody<'a> {
    consumer_key: &'a str,
    code: &'a str,
}

#[derive(Deserialize)]
struct AuthorizeResponse {
    access_token: String,
    username: String,
}

#[derive(Clone)]
pub struct PocketAuth {
    client: Client,
    base_url: Url,
    consumer_key: ConsumerKey,
}

impl PocketAuth {
    pub fn new(consumer_key: ConsumerKey, base_url: Url) -> Self {
        Self {
            client: http_client(),
            base_url,
            consumer_key,
        }
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, AuthError>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let url = self.base_url.join(path)?;
        let response = self
            .client
            .post(url)
            .header("X-Accept", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let (code, message) = error_headers(&response);
            debug!(status = status.as_u16(), ?code, "Authorization call to {path} rejected");
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                code,
                message,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl Authorizer for PocketAuth {
    async fn obtain_request_token(&self, redirect_target: &Url) -> Result<RequestToken, AuthError> {
        let body = RequestTokenBody {
            consumer_key: self.consumer_key.as_str(),
            redirect_uri: redirect_target.as_str(),
        };
        let data: RequestTokenResponse = self.post("/v3/oauth/request", &body).await?;
        Ok(RequestToken::new(data.code))
    }

    fn authorization_url(&self, token: &RequestToken, redirect_target: &Url) -> Url {
        authorization_url(&self.base_url, token, redirect_target)
    }

    async fn exchange_request_token(
        &self,
        token: RequestToken,
    ) -> Result<AccessCredential, AuthError> {
        let body = AuthorizeBody {
            consumer_key: self.consumer_key.as_str(),
            code: token.as_str(),
        };
        let data: AuthorizeResponse = self.post("/v3/oauth/authorize", &body).await?;
        Ok(AccessCredential::new(data.access_token, data.username))
    }
}
