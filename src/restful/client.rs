//! Core HTTP client for RESTful services

use std::{fmt, sync::Arc, time::Duration};

use chrono::{Local, Utc};
use compact_str::CompactString;
use reqwest::{
    header::{
        HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE, LOCATION, RETRY_AFTER,
        WWW_AUTHENTICATE,
    },
    multipart::{Form, Part},
    redirect, Certificate, Client, Method, RequestBuilder, Response, StatusCode,
};
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};
use url::{Position, Url};

use super::{
    auth::is_digest_challenge,
    config::{ClientConfig, SslVerify},
    error::{RestfulError, Result},
    utils::QueryParams,
};

const RATE_LIMIT_RESET: &str = "ratelimit-reset";
const MAX_REDIRECTS: u32 = 10;

/// 500, 502, 503, 504 and 520 through 530
pub fn is_transient_status(code: u16) -> bool {
    matches!(code, 500 | 502 | 503 | 504 | 520..=530)
}

/// Turns a response body into JSON.
///
/// Services that wrap their JSON (Gerrit's XSSI guard, for instance) plug
/// their own decoder into the client.
pub trait BodyDecoder: fmt::Debug + Send + Sync {
    fn decode(&self, body: &[u8]) -> serde_json::Result<Value>;
}

/// Plain `serde_json` decoding
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonDecoder;

impl BodyDecoder for JsonDecoder {
    fn decode(&self, body: &[u8]) -> serde_json::Result<Value> {
        serde_json::from_slice(body)
    }
}

/// Request payload
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    None,
    /// Serialized as JSON
    Json(Value),
    /// Sent verbatim as `application/octet-stream`
    Raw(Vec<u8>),
}

/// File uploaded as part of a multipart form
#[derive(Debug, Clone)]
pub struct FilePart {
    pub field: String,
    pub file_name: Option<String>,
    pub mime: Option<String>,
    pub content: Vec<u8>,
}

impl FilePart {
    pub fn new(field: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            field: field.into(),
            file_name: None,
            mime: None,
            content: content.into(),
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}

/// Per-request options
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Query string parameters, merged over any already in the path
    pub query: QueryParams,
    /// Request payload
    pub body: RequestBody,
    /// Files to upload; switches the body to a multipart form
    pub files: Vec<FilePart>,
    /// Return the response body without decoding it
    pub raw: bool,
    /// Overrides the client timeout
    pub timeout: Option<Duration>,
    /// Overrides the client rate limit setting
    pub obey_rate_limit: Option<bool>,
    /// Overrides the client transient error setting
    pub retry_transient_errors: Option<bool>,
    /// Overrides the client retry limit
    pub max_retries: Option<i32>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }

    pub fn with_json(mut self, data: Value) -> Self {
        self.body = RequestBody::Json(data);
        self
    }

    pub fn with_raw_body(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.body = RequestBody::Raw(data.into());
        self
    }

    pub fn with_file(mut self, file: FilePart) -> Self {
        self.files.push(file);
        self
    }

    pub fn with_raw_response(mut self, raw: bool) -> Self {
        self.raw = raw;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_obey_rate_limit(mut self, enabled: bool) -> Self {
        self.obey_rate_limit = Some(enabled);
        self
    }

    pub fn with_retry_transient_errors(mut self, enabled: bool) -> Self {
        self.retry_transient_errors = Some(enabled);
        self
    }

    pub fn with_max_retries(mut self, max_retries: i32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }
}

/// Decoded response body
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Raw {
        content_type: Option<String>,
        body: Vec<u8>,
    },
}

impl Payload {
    /// The JSON value, or a parsing error for raw payloads
    pub fn into_json(self) -> Result<Value> {
        match self {
            Payload::Json(value) => Ok(value),
            Payload::Raw { content_type, .. } => Err(RestfulError::parsing(format!(
                "Expected a JSON response, got {}",
                content_type.as_deref().unwrap_or("no content type")
            ))),
        }
    }
}

/// Body as it goes on the wire
#[derive(Debug)]
enum PreparedBody {
    Empty,
    Json(Value),
    Raw(Vec<u8>),
    Multipart {
        fields: Vec<(String, String)>,
        files: Vec<FilePart>,
    },
}

impl PreparedBody {
    fn prepare(body: &RequestBody, files: &[FilePart]) -> Result<Self> {
        if !files.is_empty() {
            let data = match body {
                RequestBody::None => Map::new(),
                RequestBody::Json(Value::Object(map)) => map.clone(),
                _ => {
                    return Err(RestfulError::attribute(
                        "Data sent along with files must be a JSON object",
                    ))
                },
            };

            // multipart has no booleans
            let fields = data
                .into_iter()
                .map(|(key, value)| {
                    let value = match value {
                        Value::Bool(b) => i32::from(b).to_string(),
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    (key, value)
                })
                .collect();

            return Ok(PreparedBody::Multipart { fields, files: files.to_vec() });
        }

        Ok(match body {
            RequestBody::Raw(data) if !data.is_empty() => PreparedBody::Raw(data.clone()),
            RequestBody::Raw(_) => PreparedBody::Json(Value::Object(Map::new())),
            RequestBody::Json(value) => PreparedBody::Json(value.clone()),
            RequestBody::None => PreparedBody::Empty,
        })
    }

    /// A multipart form can only be sent once, so it is rebuilt per attempt
    fn attach(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        Ok(match self {
            PreparedBody::Empty => request,
            PreparedBody::Json(value) => request.json(value),
            PreparedBody::Raw(data) => request
                .header(CONTENT_TYPE, "application/octet-stream")
                .body(data.clone()),
            PreparedBody::Multipart { fields, files } => {
                let mut form = Form::new();
                for (key, value) in fields {
                    form = form.text(key.clone(), value.clone());
                }
                for file in files {
                    let mut part = Part::bytes(file.content.clone());
                    if let Some(name) = &file.file_name {
                        part = part.file_name(name.clone());
                    }
                    if let Some(mime) = &file.mime {
                        part = part.mime_str(mime)?;
                    }
                    form = form.part(file.field.clone(), part);
                }
                request.multipart(form)
            },
        })
    }
}

/// HTTP connection to a RESTful API server
#[derive(Debug, Clone)]
pub struct RestfulClient {
    client: Client,
    config: ClientConfig,
    url: CompactString,
    headers: HeaderMap,
    decoder: Arc<dyn BodyDecoder>,
}

impl RestfulClient {
    /// Create a new client
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = Client::builder()
            .redirect(redirect::Policy::none())
            .user_agent(config.user_agent.as_str());

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        builder = match &config.ssl_verify {
            SslVerify::Enabled => builder,
            SslVerify::Disabled => builder.danger_accept_invalid_certs(true),
            SslVerify::CaFile(path) => {
                let pem = std::fs::read(path)?;
                builder.add_root_certificate(Certificate::from_pem(&pem)?)
            },
        };

        let client = builder.build().map_err(RestfulError::Http)?;
        let url = config.base_url.trim_end_matches('/').into();

        Ok(Self {
            client,
            config,
            url,
            headers: HeaderMap::new(),
            decoder: Arc::new(JsonDecoder),
        })
    }

    /// Send `name: value` with every request
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replace the JSON body decoder
    pub fn with_decoder(mut self, decoder: impl BodyDecoder + 'static) -> Self {
        self.decoder = Arc::new(decoder);
        self
    }

    /// Base URL without trailing slash
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get current configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Full URL for `path`; absolute URLs are returned unchanged
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_owned()
        } else {
            format!("{}{}", self.url, path)
        }
    }

    /// Decode a response body with the configured decoder
    pub fn decode(&self, body: &[u8]) -> Result<Value> {
        self.decoder
            .decode(body)
            .map_err(RestfulError::server_message)
    }

    /// Make an HTTP request to the server.
    ///
    /// Returns the response of the first 2xx answer. 429 answers are retried
    /// when rate limits are obeyed; connection errors and transient 5xx
    /// answers are retried when transient retries are enabled.
    #[instrument(skip(self, options))]
    pub async fn http_request(
        &self,
        method: Method,
        path: &str,
        options: &RequestOptions,
    ) -> Result<Response> {
        let (mut url, mut params) = self.split_url(&self.build_url(path))?;
        params.extend(&options.query);

        let retry_transient_errors = options
            .retry_transient_errors
            .unwrap_or(self.config.retry.retry_transient_errors);
        let obey_rate_limit = options
            .obey_rate_limit
            .unwrap_or(self.config.retry.obey_rate_limit);
        let max_retries = options
            .max_retries
            .unwrap_or(self.config.retry.max_retries);
        let mut body = PreparedBody::prepare(&options.body, &options.files)?;
        let mut method = method;
        // credentials stay with the origin the request was made to
        let auth_origin = url.origin();

        let mut retries: i32 = 0;
        let mut redirects: u32 = 0;
        let mut digest_answer: Option<String> = None;
        loop {
            let mut request = self
                .client
                .request(method.clone(), url.clone())
                .headers(self.headers.clone());
            if !params.is_empty() {
                request = request.query(params.pairs());
            }
            if let Some(auth) = &self.config.auth {
                if url.origin() == auth_origin {
                    request = auth.apply(request);
                    if let Some(answer) = &digest_answer {
                        request = request.header(AUTHORIZATION, answer.as_str());
                    }
                } else {
                    debug!(url = %url, "Not sending credentials to another origin");
                }
            }
            if let Some(timeout) = options.timeout {
                request = request.timeout(timeout);
            }
            request = body.attach(request)?;

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) if e.is_connect()
                    && retry_transient_errors
                    && can_retry(max_retries, retries) =>
                {
                    let wait = backoff(retries);
                    retries += 1;
                    warn!(
                        error = %e,
                        retries,
                        wait_ms = wait.as_millis() as u64,
                        "Connection failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                    continue;
                },
                Err(e) => return Err(RestfulError::Http(e)),
            };

            let status = response.status();
            if status.is_redirection() {
                check_redirect(&method, &response)?;
                if let Some(target) = redirect_target(&response) {
                    if is_followed_redirect(status) && redirects < MAX_REDIRECTS {
                        debug!(status = status.as_u16(), target = %target, "Following redirect");
                        redirects += 1;
                        if status == StatusCode::SEE_OTHER && method != Method::GET {
                            method = Method::GET;
                            body = PreparedBody::Empty;
                        }
                        digest_answer = None;
                        (url, params) = self.split_url(target.as_str())?;
                        continue;
                    }
                }
            }

            if status.is_success() {
                return Ok(response);
            }

            if status == StatusCode::UNAUTHORIZED && digest_answer.is_none() && url.origin() == auth_origin {
                if let Some(answer) = self.answer_digest_challenge(&method, &url, &params, &response) {
                    debug!(url = %url, "Answering digest challenge");
                    digest_answer = Some(answer);
                    continue;
                }
            }

            let code = status.as_u16();
            let retryable = (code == 429 && obey_rate_limit)
                || (is_transient_status(code) && retry_transient_errors);
            if retryable && can_retry(max_retries, retries) {
                let wait = retry_wait(response.headers(), retries);
                retries += 1;
                warn!(status = code, retries, wait_ms = wait.as_millis() as u64, "Retrying request");
                tokio::time::sleep(wait).await;
                continue;
            }

            let body = response.bytes().await?.to_vec();
            let message = self.error_message(&body);
            debug!(status = code, message = %message, "Request failed");

            if status == StatusCode::UNAUTHORIZED {
                return Err(RestfulError::Authentication { code, message, body });
            }

            return Err(RestfulError::HttpStatus { code, message, body });
        }
    }

    /// Make a GET request to the server.
    ///
    /// JSON responses are decoded unless `options.raw` is set.
    pub async fn http_get(&self, path: &str, options: &RequestOptions) -> Result<Payload> {
        let response = self.http_request(Method::GET, path, options).await?;
        self.read_payload(response, !options.raw).await
    }

    /// Make a POST request to the server.
    ///
    /// An empty JSON object is sent when no body is given.
    pub async fn http_post(&self, path: &str, options: &RequestOptions) -> Result<Payload> {
        let options = with_default_body(options);
        let response = self.http_request(Method::POST, path, &options).await?;
        self.read_payload(response, !options.raw).await
    }

    /// Make a PUT request to the server; the response is always decoded
    pub async fn http_put(&self, path: &str, options: &RequestOptions) -> Result<Value> {
        let options = with_default_body(options);
        let response = self.http_request(Method::PUT, path, &options).await?;
        self.read_json(response).await
    }

    /// Make a DELETE request to the server
    pub async fn http_delete(&self, path: &str, options: &RequestOptions) -> Result<Payload> {
        let response = self.http_request(Method::DELETE, path, options).await?;
        self.read_payload(response, true).await
    }

    /// Make a GET request for a list-oriented query; the response is always
    /// decoded
    pub async fn http_list(&self, path: &str, options: &RequestOptions) -> Result<Value> {
        let response = self.http_request(Method::GET, path, options).await?;
        self.read_json(response).await
    }

    // Private helper methods

    /// Split a URL into its query-less form and the parameters it carried
    fn answer_digest_challenge(
        &self,
        method: &Method,
        url: &Url,
        params: &QueryParams,
        response: &Response,
    ) -> Option<String> {
        let auth = self.config.auth.as_ref()?;
        let challenge = response
            .headers()
            .get_all(WWW_AUTHENTICATE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find(|value| is_digest_challenge(value))?;

        let mut target = url.clone();
        if !params.is_empty() {
            target.query_pairs_mut().extend_pairs(params.pairs());
        }
        let uri = &target[Position::BeforePath..Position::AfterQuery];
        auth.answer_challenge(method, uri, challenge)
    }

    fn split_url(&self, raw_url: &str) -> Result<(Url, QueryParams)> {
        let mut url = Url::parse(raw_url).map_err(|e| RestfulError::invalid_url(raw_url, e))?;
        let params = url.query().map(QueryParams::parse).unwrap_or_default();
        url.set_query(None);
        Ok((url, params))
    }

    async fn read_payload(&self, response: Response, decode_json: bool) -> Result<Payload> {
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let url_path = response.url().path().to_owned();
        let body = response.bytes().await?;
        self.log_response(&url_path, &body);

        let is_json = content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .is_some_and(|mime| mime.trim() == "application/json");

        if is_json && decode_json {
            Ok(Payload::Json(self.decode(&body)?))
        } else {
            Ok(Payload::Raw { content_type, body: body.to_vec() })
        }
    }

    async fn read_json(&self, response: Response) -> Result<Value> {
        let url_path = response.url().path().to_owned();
        let body = response.bytes().await?;
        self.log_response(&url_path, &body);
        self.decode(&body)
    }

    /// Prefer the `message`, then `error`, field of a JSON error body
    fn error_message(&self, body: &[u8]) -> String {
        let mut message = String::from_utf8_lossy(body).trim().to_owned();
        if let Ok(Value::Object(error)) = self.decoder.decode(body) {
            for key in ["message", "error"] {
                if let Some(value) = error.get(key) {
                    message = value
                        .as_str()
                        .map(str::to_owned)
                        .unwrap_or_else(|| value.to_string());
                }
            }
        }
        message
    }

    /// Log HTTP response to file for debugging
    fn log_response(&self, path: &str, body: &[u8]) {
        if !self.config.debug.log_responses {
            return;
        }

        if let Some(log_dir) = &self.config.debug.log_directory {
            if !log_dir.exists() {
                if let Err(e) = std::fs::create_dir_all(log_dir) {
                    warn!("Failed to create log directory: {}", e);
                    return;
                }
            }

            let filename = format!(
                "{}_{}.json",
                Local::now().format("%Y-%m-%d_%H-%M-%S"),
                path.replace('/', "_")
            );

            let log_path = log_dir.join(filename);

            if let Err(e) = std::fs::write(&log_path, body) {
                warn!("Failed to write response log to {:?}: {}", log_path, e);
            } else {
                debug!("Response logged to {:?}", log_path);
            }
        }
    }
}

fn with_default_body(options: &RequestOptions) -> RequestOptions {
    let mut options = options.clone();
    if matches!(options.body, RequestBody::None) {
        options.body = RequestBody::Json(Value::Object(Map::new()));
    }
    options
}

fn can_retry(max_retries: i32, retries: i32) -> bool {
    max_retries == -1 || retries < max_retries
}

/// 0.1s, 0.2s, 0.4s, ...
fn backoff(retries: i32) -> Duration {
    Duration::from_secs_f64(2f64.powi(retries.min(16)) * 0.1)
}

/// `Retry-After` seconds, else `RateLimit-Reset` epoch seconds, else backoff
fn retry_wait(headers: &HeaderMap, retries: i32) -> Duration {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
    };

    if let Some(seconds) = header(RETRY_AFTER.as_str()) {
        return Duration::from_secs(seconds.max(0) as u64);
    }

    if let Some(reset) = header(RATE_LIMIT_RESET) {
        let seconds = reset - Utc::now().timestamp();
        return Duration::from_secs(seconds.max(0) as u64);
    }

    backoff(retries)
}

/// 301, 302 and 303 are followed with GET; 307 and 308 keep the method and body
fn is_followed_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

/// A 301/302 downgrades POST and PUT to GET, so only GET may be redirected
/// by them
fn check_redirect(method: &Method, response: &Response) -> Result<()> {
    let status = response.status();
    if *method == Method::GET
        || !matches!(status, StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND)
    {
        return Ok(());
    }

    let target = response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    Err(RestfulError::Redirect(format!(
        "{} detected a {} ({:?}) redirection. You must update your url to the correct url \
         to avoid issues. The redirection was from: {:?} to {:?}",
        crate::TITLE,
        status.as_u16(),
        status.canonical_reason().unwrap_or_default(),
        response.url().as_str(),
        target,
    )))
}

fn redirect_target(response: &Response) -> Option<Url> {
    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    response.url().join(location).ok()
}
