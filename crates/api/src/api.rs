use crate::error::{ApiError, ApiResult};
use crate::types::{AccessCredential, ConsumerKey, Item, RetrieveOptions};
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://getpocket.com";
const DEFAULT_RATE_LIMIT_WAIT: u64 = 3600;

pub(crate) fn http_client() -> Client {
    Client::builder()
        .user_agent(concat!("pocket/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(20))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Pocket reports failures through `X-Error-Code` / `X-Error` headers rather than the body.
pub(crate) fn error_headers(response: &Response) -> (Option<String>, String) {
    let header = |name: &str| {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let message = header("X-Error").unwrap_or_else(|| {
        response
            .status()
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    });
    (header("X-Error-Code"), message)
}

#[derive(Serialize)]
struct RetrieveBody<'a> {
    consumer_key: &'a str,
    access_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    domain: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    search: Option<&'a str>,
    #[serde(rename = "detailType")]
    detail_type: &'a str,
}

#[derive(Clone)]
pub struct PocketApi {
    client: Client,
    base_url: Url,
    consumer_key: ConsumerKey,
}

impl PocketApi {
    pub fn new(consumer_key: ConsumerKey, base_url: Url) -> Self {
        Self {
            client: http_client(),
            base_url,
            consumer_key,
        }
    }

    pub async fn retrieve(
        &self,
        credential: &AccessCredential,
        options: &RetrieveOptions,
    ) -> ApiResult<Vec<Item>> {
        let url = self
            .base_url
            .join("/v3/get")
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        let body = RetrieveBody {
            consumer_key: self.consumer_key.as_str(),
            access_token: credential.access_token(),
            domain: options.domain.as_deref(),
            search: options.search.as_deref(),
            detail_type: "simple",
        };

        let response = self
            .client
            .post(url)
            .header("X-Accept", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(rejection(&response));
        }

        let data: Value = response.json().await?;
        let items = parse_item_list(&data)?;
        debug!(count = items.len(), "Retrieved items");
        Ok(items)
    }
}

fn rejection(response: &Response) -> ApiError {
    let status = response.status();
    let (_, message) = error_headers(response);
    if status == StatusCode::UNAUTHORIZED {
        return ApiError::Unauthorized(message);
    }
    let rate_limited = status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN
            && response
                .headers()
                .get("X-Limit-User-Remaining")
                .and_then(|v| v.to_str().ok())
                == Some("0"));
    if rate_limited {
        let retry_after = response
            .headers()
            .get("X-Limit-User-Reset")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_RATE_LIMIT_WAIT);
        return ApiError::RateLimited { retry_after };
    }
    ApiError::Api {
        status: status.as_u16(),
        message,
    }
}

/// `list` is an object keyed by item id, or an empty array when nothing matched.
pub(crate) fn parse_item_list(data: &Value) -> ApiResult<Vec<Item>> {
    let mut items = match data.get("list") {
        Some(Value::Object(map)) => map
            .values()
            .map(|v| serde_json::from_value::<Item>(v.clone()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ApiError::Decode(e.to_string()))?,
        Some(Value::Array(entries)) if entries.is_empty() => Vec::new(),
        None | Some(Value::Null) => Vec::new(),
        Some(other) => {
            return Err(ApiError::Decode(format!(
                "expected item list, got {}",
                other
            )))
        }
    };

    items.sort_by(|a, b| {
        a.sort_id
            .cmp(&b.sort_id)
            .then_with(|| a.item_id.cmp(&b.item_id))
    });
    Ok(items)
}
