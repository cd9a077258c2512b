// crates/client/src/client.rs
//! HTTP client for the PerfOps API

use perfops_common::{
    City, Country, PerfOpsError, PerfOpsResult, RunOutput, TestId, TestKind, TestRequest,
};
use perfops_validator::validate_request;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Request, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument};

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.perfops.net";

const CREDITS_PATH: &str = "/remaining-credits";
const COUNTRIES_PATH: &str = "/analytics/dns/countries";
const CITIES_PATH: &str = "/analytics/dns/city";

/// Body returned when a test is submitted.
#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    id: String,
    #[serde(default, alias = "Error")]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreditsResponse {
    #[serde(alias = "remaining-credits")]
    remaining_credits: u64,
}

/// Client for the PerfOps API.
///
/// Requests are built and sent in separate steps so the exact request a
/// call would make can be inspected without any network access.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    user_agent: Option<String>,
}

impl ApiClient {
    /// Create a client for the public endpoint without an API key.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the API key sent in the `Authorization` header.
    pub fn with_api_key<S: Into<String>>(mut self, key: S) -> Self {
        let key = key.into();
        self.api_key = if key.is_empty() { None } else { Some(key) };
        self
    }

    /// Point the client at another endpoint.
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Add a fragment in front of the default User-Agent.
    pub fn with_user_agent<S: Into<String>>(mut self, fragment: S) -> Self {
        self.user_agent = Some(fragment.into());
        self
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Whether requests carry an API key, lifting the free node cap.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn user_agent(&self) -> String {
        let base = default_user_agent();
        match &self.user_agent {
            Some(fragment) if !fragment.is_empty() => format!("{} {}", fragment, base),
            _ => base,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn prepare(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder
            .header(CONTENT_TYPE, "application/json")
            .header(USER_AGENT, self.user_agent());
        match &self.api_key {
            Some(key) => builder.header(AUTHORIZATION, key),
            None => builder,
        }
    }

    /// Build the POST that submits `request` as a `kind` test.
    ///
    /// Fails with an invalid-argument error before anything is built when
    /// the target, DNS parameters or limit do not pass validation.
    pub fn submit_request(&self, kind: TestKind, request: &TestRequest) -> PerfOpsResult<Request> {
        validate_request(request, self.has_api_key())?;
        self.prepare(self.http.post(self.url(&kind.run_path())))
            .json(request)
            .build()
            .map_err(transport)
    }

    /// Build the GET that polls the output of test `id`.
    pub fn output_request(&self, kind: TestKind, id: &TestId) -> PerfOpsResult<Request> {
        self.get_request(&kind.output_path(id))
    }

    fn get_request(&self, path: &str) -> PerfOpsResult<Request> {
        self.prepare(self.http.get(self.url(path)))
            .build()
            .map_err(transport)
    }

    /// Submit a test and return its identifier.
    #[instrument(skip(self, request), fields(target = %request.target))]
    pub async fn submit(&self, kind: TestKind, request: &TestRequest) -> PerfOpsResult<TestId> {
        let http_request = self.submit_request(kind, request)?;
        let body = self.execute(http_request).await?;
        let raw: SubmitResponse = serde_json::from_slice(&body)?;
        if let Some(error) = raw.error.filter(|e| !e.is_empty()) {
            return Err(PerfOpsError::Api(error));
        }
        Ok(TestId::new(raw.id))
    }

    /// Fetch the current snapshot of test `id`.
    pub async fn fetch(&self, kind: TestKind, id: &TestId) -> PerfOpsResult<RunOutput> {
        let body = self.execute(self.output_request(kind, id)?).await?;
        Ok(kind.decode_output(&body)?)
    }

    /// Credits left on the account the key belongs to.
    pub async fn remaining_credits(&self) -> PerfOpsResult<u64> {
        let credits: CreditsResponse = self.get_json(CREDITS_PATH).await?;
        Ok(credits.remaining_credits)
    }

    /// Countries PerfOps nodes are located in.
    pub async fn countries(&self) -> PerfOpsResult<Vec<Country>> {
        self.get_json(COUNTRIES_PATH).await
    }

    /// Cities PerfOps nodes are located in.
    pub async fn cities(&self) -> PerfOpsResult<Vec<City>> {
        self.get_json(CITIES_PATH).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> PerfOpsResult<T> {
        let body = self.execute(self.get_request(path)?).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Send a request, turning any status of 400 or above into an error
    /// carrying the status code and raw body.
    async fn execute(&self, request: Request) -> PerfOpsResult<Vec<u8>> {
        debug!(method = %request.method(), url = %request.url(), "sending request");
        let response = self.http.execute(request).await.map_err(transport)?;
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.map_err(transport)?;
            return Err(PerfOpsError::Http {
                status: status.as_u16(),
                body,
            });
        }
        let body = response.bytes().await.map_err(transport)?;
        Ok(body.to_vec())
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            user_agent: None,
        }
    }
}

fn default_user_agent() -> String {
    format!(
        "perfops-cli/{} ({}/{})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

fn transport(err: reqwest::Error) -> PerfOpsError {
    PerfOpsError::Transport(err.to_string())
}
