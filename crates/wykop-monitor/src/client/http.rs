//! HTTP implementation of the Wykop API (v3 REST routes).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::Credentials;
use crate::feed::{FeedResult, Item};

use super::{ClientError, Connector, Listing, ProfileFeed, SharedClient, TagContent, WykopApi};

/// API root used when no environment is configured.
pub const DEFAULT_ENVIRONMENT: &str = "https://wykop.pl/api/v3";

const AUTH_PATH: &str = "auth";
const REFRESH_PATH: &str = "refresh-token";
const LOGIN_PATH: &str = "login";

/// Request timeout for every API call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Every v3 response wraps its payload in `data`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct TokenData {
    token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Default)]
struct Tokens {
    token: Option<String>,
    refresh_token: Option<String>,
}

/// Wykop API client over HTTPS.
pub struct HttpClient {
    client: reqwest::Client,
    base_url: Url,
    tokens: RwLock<Tokens>,
    debug_api: bool,
}

impl HttpClient {
    /// Build a client and make sure it holds a token.
    ///
    /// A supplied token is used as-is; otherwise an application token is
    /// requested with the appkey and secret.
    pub async fn connect(credentials: &Credentials, debug_api: bool) -> Result<Self, ClientError> {
        let environment = credentials
            .environment
            .as_deref()
            .unwrap_or(DEFAULT_ENVIRONMENT);
        let base_url = Url::parse(environment)
            .map_err(|e| ClientError::Other(format!("Invalid environment URL {environment}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Other(format!(
                "Invalid environment URL {environment}: not a base URL"
            )));
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("wykop-monitor/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let this = Self {
            client,
            base_url,
            tokens: RwLock::new(Tokens {
                token: credentials.token.clone(),
                refresh_token: credentials.refresh_token.clone(),
            }),
            debug_api,
        };

        if credentials.token.is_none() {
            let (Some(key), Some(secret)) = (&credentials.appkey, &credentials.secret) else {
                return Err(ClientError::Other(
                    "appkey and secret are required when no token is given".to_string(),
                ));
            };
            let data: TokenData = this
                .post(&[AUTH_PATH], json!({ "data": { "key": key, "secret": secret } }))
                .await?;
            this.store_tokens(data).await;
            debug!("Obtained application token");
        }

        Ok(this)
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::Other("Environment URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn store_tokens(&self, data: TokenData) {
        let mut tokens = self.tokens.write().await;
        tokens.token = Some(data.token);
        if data.refresh_token.is_some() {
            tokens.refresh_token = data.refresh_token;
        }
    }

    async fn post<T: DeserializeOwned>(&self, segments: &[&str], body: Value) -> Result<T, ClientError> {
        let url = self.url(segments)?;
        let mut request = self.client.post(url.clone()).json(&body);
        if let Some(token) = self.tokens.read().await.token.as_deref() {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        self.trace("POST", &url, response.status());
        let envelope: Envelope<T> = Self::decode(response).await?;
        Ok(envelope.data)
    }

    async fn authorized_get(
        &self,
        url: &Url,
        query: &[(&str, &str)],
    ) -> Result<reqwest::Response, ClientError> {
        let token = self
            .tokens
            .read()
            .await
            .token
            .clone()
            .ok_or(ClientError::NotAuthenticated)?;
        let response = self
            .client
            .get(url.clone())
            .query(query)
            .bearer_auth(token)
            .send()
            .await?;
        self.trace("GET", url, response.status());
        Ok(response)
    }

    /// Exchange the refresh token for a new token. Returns `false` when no
    /// refresh token is held.
    async fn refresh(&self) -> Result<bool, ClientError> {
        let Some(refresh_token) = self.tokens.read().await.refresh_token.clone() else {
            return Ok(false);
        };
        let data: TokenData = self
            .post(
                &[REFRESH_PATH],
                json!({ "data": { "refresh_token": refresh_token } }),
            )
            .await?;
        self.store_tokens(data).await;
        info!("Access token refreshed");
        Ok(true)
    }

    async fn get(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Value, ClientError> {
        let url = self.url(segments)?;
        let mut response = self.authorized_get(&url, query).await?;
        if response.status() == StatusCode::UNAUTHORIZED && self.refresh().await? {
            response = self.authorized_get(&url, query).await?;
        }
        let envelope: Envelope<Value> = Self::decode(response).await?;
        Ok(envelope.data)
    }

    async fn list(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<FeedResult, ClientError> {
        let data = self.get(segments, query).await?;
        let items: Vec<Item> = serde_json::from_value(data)?;
        Ok(FeedResult::with_items(items))
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }
        Ok(serde_json::from_str(&body)?)
    }

    fn trace(&self, method: &str, url: &Url, status: StatusCode) {
        if self.debug_api {
            debug!(method, url = %url, status = %status, "API request");
        }
    }
}

/// Pull a readable message out of an error body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

fn listing_query<'a>(listing: &'a Listing, extra: &[(&'a str, &'a str)]) -> Vec<(&'a str, &'a str)> {
    let mut query = extra.to_vec();
    query.push(("sort", "newest"));
    if let Some(category) = listing.category.as_deref() {
        query.push(("category", category));
    }
    if let Some(bucket) = listing.bucket.as_deref() {
        query.push(("bucket", bucket));
    }
    query
}

#[async_trait]
impl WykopApi for HttpClient {
    async fn login(&self, username: &str, password: &str) -> Result<(), ClientError> {
        let data: TokenData = self
            .post(
                &[LOGIN_PATH],
                json!({ "data": { "username": username, "password": password } }),
            )
            .await?;
        self.store_tokens(data).await;
        Ok(())
    }

    async fn links(&self, listing: &Listing) -> Result<FeedResult, ClientError> {
        self.list(&["links"], &listing_query(listing, &[("type", "upcoming")]))
            .await
    }

    async fn entries(&self, listing: &Listing) -> Result<FeedResult, ClientError> {
        self.list(&["entries"], &listing_query(listing, &[])).await
    }

    async fn link_comments(&self, link_id: u64) -> Result<FeedResult, ClientError> {
        let id = link_id.to_string();
        self.list(&["links", id.as_str(), "comments"], &[("sort", "newest")])
            .await
    }

    async fn related_links(&self, link_id: u64) -> Result<FeedResult, ClientError> {
        let id = link_id.to_string();
        self.list(&["links", id.as_str(), "related"], &[("sort", "newest")])
            .await
    }

    async fn entry_comments(&self, entry_id: u64) -> Result<FeedResult, ClientError> {
        let id = entry_id.to_string();
        let mut result = self.list(&["entries", id.as_str(), "comments"], &[]).await?;
        // Entry comments come back oldest-first.
        result.items.reverse();
        Ok(result)
    }

    async fn tag_stream(
        &self,
        tag: &str,
        content: Option<TagContent>,
    ) -> Result<FeedResult, ClientError> {
        let mut query = vec![("sort", "all")];
        if let Some(content) = content {
            query.push(("type", content.as_str()));
        }
        self.list(&["tags", tag, "stream"], &query).await
    }

    async fn profile(&self, username: &str, feed: ProfileFeed) -> Result<FeedResult, ClientError> {
        let mut segments = vec!["profile", "users", username];
        segments.extend(feed.path().split('/'));
        self.list(&segments, &[]).await
    }

    async fn notifications(&self) -> Result<FeedResult, ClientError> {
        self.list(&["notifications", "entries"], &[]).await
    }

    async fn conversations(&self) -> Result<FeedResult, ClientError> {
        self.list(&["pm", "conversations"], &[]).await
    }

    async fn conversation(&self, username: &str) -> Result<FeedResult, ClientError> {
        let data = self.get(&["pm", "conversations", username], &[]).await?;
        Ok(serde_json::from_value(data)?)
    }
}

/// Connects [`HttpClient`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpConnector;

#[async_trait]
impl Connector for HttpConnector {
    async fn connect(
        &self,
        credentials: &Credentials,
        debug_api: bool,
    ) -> Result<SharedClient, ClientError> {
        let client = HttpClient::connect(credentials, debug_api).await?;
        Ok(Arc::new(client))
    }
}
