//! Client-side contracts for the two external collaborators: the identity
//! provider and the product store. The panel only ever talks to these
//! traits; [`HttpGateway`] is the production implementation against the
//! Stockroom API, and tests substitute in-memory fakes.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::RwLock;
use uuid::Uuid;

use crate::database::models::{Product, ProductPage};
use crate::validation::{FieldErrors, ProductForm};

use super::{PanelUser, Session};

/// Client-side error taxonomy. Variants carry messages suitable for direct
/// user display.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    #[error("{0}")]
    Auth(String),

    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Unavailable(String),
}

/// Parameters of a list read, as sent over the wire. Owner scoping is
/// implied by the session and enforced by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    pub page: u32,
    pub limit: u32,
    pub search: String,
}

#[async_trait]
pub trait IdentityGateway: Send + Sync {
    /// Request an account. Success means the request was accepted, not that
    /// a session now exists.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<String, GatewayError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, GatewayError>;

    /// Always succeeds from the caller's point of view: transport failures
    /// are swallowed and the local session is cleared either way.
    async fn sign_out(&self);

    /// `None` when there is no valid session.
    async fn current_user(&self) -> Result<Option<PanelUser>, GatewayError>;
}

#[async_trait]
pub trait ProductGateway: Send + Sync {
    async fn list(&self, request: &ListRequest) -> Result<ProductPage, GatewayError>;
    async fn get(&self, id: Uuid) -> Result<Product, GatewayError>;
    async fn create(&self, form: &ProductForm) -> Result<Product, GatewayError>;
    async fn update(&self, id: Uuid, form: &ProductForm) -> Result<(), GatewayError>;
    async fn delete(&self, id: Uuid) -> Result<(), GatewayError>;
}

/// HTTP implementation of both gateways against a running Stockroom API.
pub struct HttpGateway {
    http: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    field_errors: Option<FieldErrors>,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: RwLock::new(token),
        }
    }

    pub fn set_token(&self, token: Option<String>) {
        if let Ok(mut slot) = self.token.write() {
            *slot = token;
        }
    }

    fn bearer(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(method, self.url(path));
        if let Some(token) = self.bearer() {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Map a response onto the error taxonomy, or extract `data` on success.
    async fn parse_data(response: reqwest::Response) -> Result<Value, GatewayError> {
        let status = response.status();
        if status.is_success() {
            if status == reqwest::StatusCode::NO_CONTENT {
                return Ok(Value::Null);
            }
            let mut body: Value = response
                .json()
                .await
                .map_err(|e| GatewayError::Unavailable(format!("Malformed response: {}", e)))?;
            return Ok(body.get_mut("data").map(Value::take).unwrap_or(Value::Null));
        }

        let envelope: ErrorEnvelope = response.json().await.unwrap_or(ErrorEnvelope {
            error: None,
            field_errors: None,
        });
        let message = envelope
            .error
            .unwrap_or_else(|| format!("Request failed with status {}", status));

        Err(match status.as_u16() {
            400 | 422 => match envelope.field_errors {
                Some(field_errors) if !field_errors.is_empty() => {
                    GatewayError::Validation(field_errors)
                }
                _ => GatewayError::Unavailable(message),
            },
            401 => GatewayError::Auth(message),
            403 => GatewayError::Forbidden(message),
            404 => GatewayError::NotFound(message),
            _ => GatewayError::Unavailable(message),
        })
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<Value, GatewayError> {
        let response = builder
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("Connection failed: {}", e)))?;
        Self::parse_data(response).await
    }

    fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, GatewayError> {
        serde_json::from_value(value)
            .map_err(|e| GatewayError::Unavailable(format!("Malformed response: {}", e)))
    }
}

#[async_trait]
impl IdentityGateway for HttpGateway {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<String, GatewayError> {
        let data = self
            .send(self.request(reqwest::Method::POST, "/auth/register").json(&json!({
                "email": email,
                "password": password,
                "display_name": display_name,
            })))
            .await?;

        Ok(data
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Registration successful")
            .to_string())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, GatewayError> {
        let data = self
            .send(self.request(reqwest::Method::POST, "/auth/login").json(&json!({
                "email": email,
                "password": password,
            })))
            .await?;

        let token = data
            .get("token")
            .and_then(Value::as_str)
            .ok_or_else(|| GatewayError::Unavailable("Malformed response: missing token".into()))?
            .to_string();
        let user: PanelUser = Self::decode(
            data.get("user")
                .cloned()
                .ok_or_else(|| GatewayError::Unavailable("Malformed response: missing user".into()))?,
        )?;

        self.set_token(Some(token.clone()));
        Ok(Session { token, user })
    }

    async fn sign_out(&self) {
        let request = self.request(reqwest::Method::DELETE, "/api/auth/session");
        if let Err(e) = self.send(request).await {
            tracing::warn!("Sign-out request failed, clearing local session anyway: {}", e);
        }
        self.set_token(None);
    }

    async fn current_user(&self) -> Result<Option<PanelUser>, GatewayError> {
        if self.bearer().is_none() {
            return Ok(None);
        }
        match self.send(self.request(reqwest::Method::GET, "/api/auth/whoami")).await {
            Ok(data) => Ok(Some(Self::decode(data)?)),
            // An invalid or expired token is "no session", not an error.
            Err(GatewayError::Auth(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl ProductGateway for HttpGateway {
    async fn list(&self, request: &ListRequest) -> Result<ProductPage, GatewayError> {
        let mut query: Vec<(&str, String)> = vec![
            ("page", request.page.to_string()),
            ("limit", request.limit.to_string()),
        ];
        if !request.search.is_empty() {
            query.push(("search", request.search.clone()));
        }

        let data = self
            .send(self.request(reqwest::Method::GET, "/api/products").query(&query))
            .await?;
        Self::decode(data)
    }

    async fn get(&self, id: Uuid) -> Result<Product, GatewayError> {
        let data = self
            .send(self.request(reqwest::Method::GET, &format!("/api/products/{}", id)))
            .await?;
        Self::decode(data)
    }

    async fn create(&self, form: &ProductForm) -> Result<Product, GatewayError> {
        let data = self
            .send(self.request(reqwest::Method::POST, "/api/products").json(form))
            .await?;
        Self::decode(data)
    }

    async fn update(&self, id: Uuid, form: &ProductForm) -> Result<(), GatewayError> {
        self.send(
            self.request(reqwest::Method::PUT, &format!("/api/products/{}", id))
                .json(form),
        )
        .await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), GatewayError> {
        self.send(self.request(reqwest::Method::DELETE, &format!("/api/products/{}", id)))
            .await?;
        Ok(())
    }
}
