#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use hr_docflow::app::{self, AppState};
use hr_docflow::config::AppConfig;
use hr_docflow::crypto::CryptoVault;
use hr_docflow::database::Backend;
use hr_docflow::services::{NewUser, TracingNotifier};

pub const TEST_KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";
pub const INTERNAL_KEY: &str = "test-internal-key";
pub const PASSWORD: &str = "clave-segura-123";

pub const PDF_BYTES: &[u8] = b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\n%%EOF\n";
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0, 0, 0];

/// Caller identity attached to a request.
#[derive(Clone, Debug)]
pub enum Auth {
    Anonymous,
    Bearer(String),
    Internal,
}

/// In-process application over the in-memory backend.
pub struct TestApp {
    pub state: AppState,
    router: Router,
}

pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestApp {
    pub fn new() -> Result<Self> {
        Self::with_backend(Backend::in_memory())
    }

    /// Same application over a caller-built backend.
    pub fn with_backend(backend: Backend) -> Result<Self> {
        let mut config = AppConfig::development();
        config.security.encryption_key = Some(TEST_KEY.to_string());
        config.security.internal_api_key = Some(INTERNAL_KEY.to_string());

        let vault = CryptoVault::from_hex(TEST_KEY)?;
        let state = AppState::new(config, backend, vault, Arc::new(TracingNotifier))?;
        let router = app::router(state.clone());
        Ok(Self { state, router })
    }

    pub async fn send_raw(&self, request: Request<Body>) -> Result<RawResponse> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await?.to_bytes().to_vec();
        Ok(RawResponse { status, headers, body })
    }

    pub async fn send(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let raw = self.send_raw(request).await?;
        let body = if raw.body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&raw.body).context("response body is not JSON")?
        };
        Ok((raw.status, body))
    }

    pub async fn get(&self, uri: &str, auth: &Auth) -> Result<(StatusCode, Value)> {
        self.send(json_request(Method::GET, uri, auth, None)?).await
    }

    pub async fn post(&self, uri: &str, auth: &Auth, body: Value) -> Result<(StatusCode, Value)> {
        self.send(json_request(Method::POST, uri, auth, Some(body))?).await
    }

    pub async fn upload(&self, uri: &str, auth: &Auth, file_name: &str, mime: &str, bytes: &[u8]) -> Result<(StatusCode, Value)> {
        self.send(multipart_request(Method::POST, uri, auth, file_name, mime, bytes)?)
            .await
    }

    /// Create a user directly through the service and log in over HTTP.
    pub async fn login_as(&self, name: &str, email: &str, role: &str, company: Option<&str>) -> Result<String> {
        self.state
            .users
            .create(NewUser {
                name: name.to_string(),
                email: email.to_string(),
                password: PASSWORD.to_string(),
                role: role.to_string(),
                company: company.map(str::to_string),
            })
            .await?;

        let (status, body) = self
            .post(
                "/auth/login",
                &Auth::Anonymous,
                json!({ "email": email, "password": PASSWORD }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "login failed: {} {}", status, body);
        body["data"]["token"]
            .as_str()
            .map(str::to_string)
            .context("login response has no token")
    }

    /// Create a form and return its id.
    pub async fn form(&self, title: &str, section: Option<&str>) -> Result<String> {
        let (status, body) = self
            .post("/api/forms", &Auth::Internal, json!({ "title": title, "section": section }))
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "form creation failed: {} {}", status, body);
        body["data"]["_id"]
            .as_str()
            .map(str::to_string)
            .context("form has no id")
    }
}

fn with_auth(builder: axum::http::request::Builder, auth: &Auth) -> axum::http::request::Builder {
    match auth {
        Auth::Anonymous => builder,
        Auth::Bearer(token) => builder.header(header::AUTHORIZATION, format!("Bearer {}", token)),
        Auth::Internal => builder.header("x-internal-request", INTERNAL_KEY),
    }
}

pub fn json_request(method: Method, uri: &str, auth: &Auth, body: Option<Value>) -> Result<Request<Body>> {
    let builder = with_auth(Request::builder().method(method).uri(uri), auth);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body)?))?,
        None => builder.body(Body::empty())?,
    };
    Ok(request)
}

pub fn multipart_request(
    method: Method,
    uri: &str,
    auth: &Auth,
    file_name: &str,
    mime: &str,
    bytes: &[u8],
) -> Result<Request<Body>> {
    let boundary = "docflow-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
            file_name, mime
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    let request = with_auth(Request::builder().method(method).uri(uri), auth)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", boundary))
        .body(Body::from(body))?;
    Ok(request)
}
