//! Live endpoint tests against the upstream API

use reqwest::header::{ACCEPT, AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::{Client, Method, Request, StatusCode};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use url::Url;

use crate::core::settings::HarnessSettings;
use crate::core::{Error, Result};
use crate::domain::{
    Endpoint, EndpointKind, HttpMethod, ParameterLocation, ServerConfig, TestResult,
};
use crate::harness::auth::{self, TokenCache};
use crate::harness::store::TestResultStore;

/// Parameter name to value for one test call
pub type ParameterValues = Map<String, JsonValue>;

/// Issues real requests for configured endpoints, treating headers and
/// credentials the way the generated server does.
pub struct EndpointTester {
    client: Client,
    timeout: Duration,
    delay: Duration,
    store: TestResultStore,
    tokens: TokenCache,
}

impl EndpointTester {
    pub fn new(settings: &HarnessSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| Error::fetch(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout: settings.timeout(),
            delay: settings.inter_request_delay(),
            store: TestResultStore::new(),
            tokens: TokenCache::new(),
        })
    }

    /// Results recorded by this tester, shared with any clone of the store
    pub fn results(&self) -> &TestResultStore {
        &self.store
    }

    /// Test one endpoint. Failures are reported in the result, never as an error.
    pub async fn test_endpoint(
        &self,
        config: &ServerConfig,
        endpoint: &Endpoint,
        params: &ParameterValues,
    ) -> TestResult {
        let started = Instant::now();
        let result = match self.prepare(config, endpoint, params).await {
            Ok((client, request, url)) => {
                self.execute(config, endpoint, &client, request, url, started)
                    .await
            }
            Err(e) => {
                tracing::warn!(endpoint = %endpoint.tool_name, error = %e, "endpoint test not sent");
                TestResult::failure(&endpoint.id, "", e.to_string(), elapsed_ms(started))
            }
        };
        self.store.record(result.clone());
        result
    }

    /// Test every enabled endpoint one after another, pausing between calls.
    ///
    /// `params` is keyed by endpoint id; endpoints without an entry are called
    /// with their parameter examples.
    pub async fn test_all(
        &self,
        config: &ServerConfig,
        params: &HashMap<String, ParameterValues>,
    ) -> Vec<TestResult> {
        let mut results = Vec::new();
        for (index, endpoint) in config.enabled_endpoints().enumerate() {
            if index > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let values = params
                .get(&endpoint.id)
                .cloned()
                .unwrap_or_else(|| example_values(endpoint));
            results.push(self.test_endpoint(config, endpoint, &values).await);
        }

        let passed = results.iter().filter(|r| r.success).count();
        tracing::info!(total = results.len(), passed, "endpoint tests finished");
        results
    }

    /// Pick the client, build the request and attach credentials.
    ///
    /// The returned URL is the one reported in results, taken before any
    /// query-placed credential is added.
    async fn prepare(
        &self,
        config: &ServerConfig,
        endpoint: &Endpoint,
        params: &ParameterValues,
    ) -> Result<(Client, Request, Url)> {
        let client = auth::client_certificate_client(config, self.timeout)
            .await?
            .unwrap_or_else(|| self.client.clone());
        let mut request = build_request(&client, config, endpoint, params)?;
        let url = request.url().clone();
        auth::apply(config, &client, &self.tokens, &mut request).await?;
        Ok((client, request, url))
    }

    async fn execute(
        &self,
        config: &ServerConfig,
        endpoint: &Endpoint,
        client: &Client,
        request: Request,
        url: Url,
        started: Instant,
    ) -> TestResult {
        let retry = auth::digest_credentials(config).and_then(|creds| {
            request.try_clone().map(|clone| (creds, clone))
        });

        let mut outcome = client.execute(request).await;
        if let Some(((username, password), retry)) = retry {
            let challenge = outcome.as_ref().ok().and_then(digest_challenge);
            if let Some(challenge) = challenge {
                tracing::debug!(endpoint = %endpoint.tool_name, "answering digest challenge");
                match answer_digest(retry, &challenge, &username, &password) {
                    Ok(retry) => outcome = client.execute(retry).await,
                    Err(e) => {
                        return TestResult::failure(&endpoint.id, url.as_str(), e.to_string(), elapsed_ms(started));
                    }
                }
            }
        }

        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                let error = if e.is_timeout() {
                    Error::fetch(format!("timed out calling {url}"))
                } else {
                    Error::fetch(format!("request to {url} failed: {e}"))
                };
                tracing::warn!(endpoint = %endpoint.tool_name, error = %error, "endpoint test failed");
                return TestResult::failure(&endpoint.id, url.as_str(), error.to_string(), elapsed_ms(started));
            }
        };

        let status = response.status();
        let accepted = endpoint
            .response_mapping
            .as_ref()
            .is_some_and(|m| m.status_codes.contains(&status.as_u16()));
        let success = status.is_success() || accepted;

        let body = response.text().await.unwrap_or_default();
        let data = if body.is_empty() {
            None
        } else {
            Some(serde_json::from_str(&body).unwrap_or(JsonValue::String(body)))
        };
        let response_time_ms = elapsed_ms(started);

        tracing::info!(
            endpoint = %endpoint.tool_name,
            method = %endpoint.method,
            url = %url,
            status = status.as_u16(),
            elapsed_ms = response_time_ms,
            "endpoint test finished"
        );

        TestResult {
            endpoint_id: endpoint.id.clone(),
            success,
            status: Some(status.as_u16()),
            data,
            error: (!success).then(|| format!("HTTP {status}")),
            response_time_ms,
            timestamp: chrono::Utc::now(),
            request_url: url.to_string(),
        }
    }
}

fn build_request(
    client: &Client,
    config: &ServerConfig,
    endpoint: &Endpoint,
    params: &ParameterValues,
) -> Result<Request> {
    if endpoint.kind() == EndpointKind::WebSocket {
        return Err(Error::validation(
            "WebSocket endpoints cannot be tested over plain HTTP",
        ));
    }

    let placeholders = endpoint.path_placeholders();
    let mut url = resolve_url(&config.base_url, &endpoint.path, params)?;

    let header_names: Vec<&str> = endpoint
        .parameters
        .iter()
        .filter(|p| p.location == ParameterLocation::Header)
        .map(|p| p.name.as_str())
        .collect();

    let mut headers: Vec<(String, String)> = config
        .headers
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let mut remaining = Map::new();
    for (name, value) in params {
        if placeholders.contains(&name.as_str()) {
            continue;
        }
        if header_names.contains(&name.as_str()) {
            headers.push((name.clone(), value_to_string(value)));
        } else {
            remaining.insert(name.clone(), value.clone());
        }
    }

    let send_as_query = endpoint.method == HttpMethod::Get;
    if send_as_query && !remaining.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in &remaining {
            match value {
                JsonValue::Array(items) => {
                    for item in items {
                        pairs.append_pair(key, &value_to_string(item));
                    }
                }
                other => {
                    pairs.append_pair(key, &value_to_string(other));
                }
            }
        }
    }

    let mut request = client
        .request(reqwest_method(endpoint.method), url)
        .header(ACCEPT, "application/json");
    for (name, value) in headers {
        request = request.header(name, value);
    }
    if !send_as_query && !remaining.is_empty() {
        request = request.json(&JsonValue::Object(remaining));
    }

    request
        .build()
        .map_err(|e| Error::validation(format!("cannot build request: {e}")))
}

/// Copy of the original request carrying the answer to `challenge`
fn answer_digest(mut request: Request, challenge: &str, username: &str, password: &str) -> Result<Request> {
    let uri = match request.url().query() {
        Some(query) => format!("{}?{query}", request.url().path()),
        None => request.url().path().to_string(),
    };
    let cnonce = uuid::Uuid::new_v4().simple().to_string();
    let answer = auth::digest_authorization(
        challenge,
        username,
        password,
        request.method().as_str(),
        &uri,
        &cnonce,
    )?;
    let value = answer
        .parse()
        .map_err(|_| Error::validation("digest answer is not a valid header value"))?;
    request.headers_mut().insert(AUTHORIZATION, value);
    Ok(request)
}

/// The `WWW-Authenticate` digest challenge of a 401 response
fn digest_challenge(response: &reqwest::Response) -> Option<String> {
    if response.status() != StatusCode::UNAUTHORIZED {
        return None;
    }
    response
        .headers()
        .get_all(WWW_AUTHENTICATE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.trim_start().starts_with("Digest"))
        .map(str::to_string)
}

/// Values taken from each parameter's example, for calls with no explicit input
pub fn example_values(endpoint: &Endpoint) -> ParameterValues {
    endpoint
        .parameters
        .iter()
        .filter_map(|p| p.example.clone().map(|example| (p.name.clone(), example)))
        .collect()
}

/// Join the route onto the base URL, filling `:name` segments from `params`
fn resolve_url(base_url: &str, path: &str, params: &ParameterValues) -> Result<Url> {
    let mut url = Url::parse(base_url)
        .map_err(|e| Error::validation(format!("invalid base URL '{base_url}': {e}")))?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| Error::validation(format!("base URL '{base_url}' cannot carry a path")))?;
        segments.pop_if_empty();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            match segment.strip_prefix(':') {
                Some(name) => {
                    let value = params.get(name).map(value_to_string).ok_or_else(|| {
                        Error::validation(format!("missing value for path parameter '{name}'"))
                    })?;
                    segments.push(&value);
                }
                None => {
                    segments.push(segment);
                }
            }
        }
    }
    Ok(url)
}

fn reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get | HttpMethod::WebSocket => Method::GET,
        HttpMethod::Post | HttpMethod::GraphQl => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
        HttpMethod::Patch => Method::PATCH,
    }
}

fn value_to_string(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
