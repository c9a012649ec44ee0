//! Reqwest-backed transport implementation.

use std::sync::Arc;

use serde_json::Value;

use crate::endpoint::{FormValue, HttpMethod, RequestBody, RequestDescriptor};

use super::{ApiResponse, SendFuture, Transport, TransportResult};

/// External auth store pass-through: yields the current bearer token,
/// if any. Token lifecycle (login, refresh, storage) is out of scope.
pub trait TokenSource: Send + Sync + 'static {
    /// Current bearer token, or `None` when logged out.
    fn token(&self) -> Option<String>;
}

impl<F> TokenSource for F
where
    F: Fn() -> Option<String> + Send + Sync + 'static,
{
    fn token(&self) -> Option<String> {
        self()
    }
}

/// HTTP implementation of [`Transport`] over reqwest.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    token_source: Option<Arc<dyn TokenSource>>,
}

impl HttpTransport {
    /// Creates a transport rooted at `base_url` (no trailing slash).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            token_source: None,
        }
    }

    /// Attaches the external token source for authenticated endpoints.
    pub fn with_token_source(mut self, source: Arc<dyn TokenSource>) -> Self {
        self.token_source = Some(source);
        self
    }

    fn build(&self, request: &RequestDescriptor) -> reqwest::RequestBuilder {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.client.request(method, url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        if request.requires_auth
            && let Some(token) = self.token_source.as_ref().and_then(|s| s.token())
        {
            builder = builder.bearer_auth(token);
        }

        match &request.body {
            RequestBody::None => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(parts) => {
                let mut form = reqwest::multipart::Form::new();
                for part in parts {
                    form = match &part.value {
                        FormValue::Text(text) => form.text(part.name.clone(), text.clone()),
                        FormValue::File(image) => {
                            let file = reqwest::multipart::Part::bytes(image.bytes.clone())
                                .file_name(image.filename.clone());
                            let file = match file.mime_str(&image.content_type) {
                                Ok(file) => file,
                                Err(_) => reqwest::multipart::Part::bytes(image.bytes.clone())
                                    .file_name(image.filename.clone()),
                            };
                            form.part(part.name.clone(), file)
                        }
                    };
                }
                builder.multipart(form)
            }
        }
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: RequestDescriptor) -> SendFuture {
        let builder = self.build(&request);
        Box::pin(async move {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let text = response.text().await?;
            let body = parse_body(&text);
            TransportResult::Ok(ApiResponse { status, body })
        })
    }
}

fn parse_body(text: &str) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
