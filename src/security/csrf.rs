//! Double-submit CSRF tokens.
//!
//! A token is `base64url(nonce) "." base64url(HMAC-SHA256(secret, nonce))`.
//! Validity is recomputed from the secret on every check, so nothing is
//! stored per token.
//!
//! # Data Flow
//! ```text
//! request without cookie → create_token() → Set-Cookie on the response
//! POST/PUT/PATCH/DELETE  → cookie present? → verify() → next stage
//!                               │ no            │ bad
//!                               ▼               ▼
//!                          403 csrf_missing  403 csrf_invalid
//! ```

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use cookie::{Cookie, SameSite};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::config::CsrfConfig;
use crate::observability::metrics;
use crate::security::rejection::Rejection;

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 18;
const RECOMMENDED_SECRET_LEN: usize = 32;

/// Methods that must present a valid token.
pub const STATE_CHANGING_METHODS: [Method; 4] =
    [Method::POST, Method::PUT, Method::PATCH, Method::DELETE];

pub fn is_state_changing(method: &Method) -> bool {
    STATE_CHANGING_METHODS.contains(method)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SecretError {
    #[error("CSRF secret must not be empty")]
    Empty,
}

/// Process-wide signing key. Immutable once built; clones share storage.
#[derive(Clone)]
pub struct Secret(Arc<[u8]>);

impl Secret {
    pub fn new(bytes: impl AsRef<[u8]>) -> Result<Self, SecretError> {
        let bytes = bytes.as_ref();
        if bytes.is_empty() {
            return Err(SecretError::Empty);
        }
        Ok(Self(Arc::from(bytes)))
    }

    /// 32 random bytes.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(Arc::from(&bytes[..]))
    }

    /// URL-safe text form, suitable for `CSRF_SECRET`.
    pub fn to_base64(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(..)")
    }
}

/// An issued token, exactly as it travels in the cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken(String);

impl CsrfToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CsrfToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Issues and verifies tokens bound to one [`Secret`].
#[derive(Clone)]
pub struct CsrfTokenManager {
    mac: HmacSha256,
    cookie_name: String,
    secure_cookies: bool,
}

impl CsrfTokenManager {
    pub fn new(secret: &Secret, config: &CsrfConfig) -> Result<Self, SecretError> {
        let mac = HmacSha256::new_from_slice(&secret.0).map_err(|_| SecretError::Empty)?;
        if secret.len() < RECOMMENDED_SECRET_LEN {
            tracing::warn!(
                length = secret.len(),
                recommended = RECOMMENDED_SECRET_LEN,
                "CSRF secret is shorter than recommended"
            );
        }
        Ok(Self {
            mac,
            cookie_name: config.cookie_name.clone(),
            secure_cookies: config.secure_cookies,
        })
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    fn sign(&self, nonce: &[u8]) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(nonce);
        mac
    }

    /// Mint a fresh token.
    pub fn create_token(&self) -> CsrfToken {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);
        let tag = self.sign(&nonce).finalize().into_bytes();
        CsrfToken(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(nonce),
            URL_SAFE_NO_PAD.encode(tag)
        ))
    }

    /// True iff `token` was produced by [`create_token`](Self::create_token)
    /// under this manager's secret.
    pub fn verify(&self, token: &str) -> bool {
        let Some((nonce, tag)) = token.split_once('.') else {
            return false;
        };
        let (Ok(nonce), Ok(tag)) = (URL_SAFE_NO_PAD.decode(nonce), URL_SAFE_NO_PAD.decode(tag))
        else {
            return false;
        };
        if nonce.len() != NONCE_LEN {
            return false;
        }
        // Constant-time comparison.
        self.sign(&nonce).verify_slice(&tag).is_ok()
    }

    /// Token carried in the request's cookies, if any. Empty values count as
    /// absent and do not hide a later non-empty one.
    pub fn read_cookie(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(Cookie::split_parse)
            .filter_map(Result::ok)
            .find(|cookie| cookie.name() == self.cookie_name && !cookie.value().is_empty())
            .map(|cookie| cookie.value().to_string())
    }

    /// Cookie delivering `token` to the client.
    pub fn token_cookie(&self, token: &CsrfToken) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), token.to_string()))
            .path("/")
            .http_only(true)
            .secure(self.secure_cookies)
            .same_site(SameSite::Strict)
            .build()
    }

    /// Decide whether a request with `method` carrying `presented` may proceed.
    pub fn check(&self, method: &Method, presented: Option<&str>) -> Result<(), Rejection> {
        if !is_state_changing(method) {
            return Ok(());
        }
        match presented {
            None => Err(Rejection::CsrfMissing),
            Some(token) if self.verify(token) => Ok(()),
            Some(_) => Err(Rejection::CsrfInvalid),
        }
    }
}

/// Middleware issuing a token on first contact and verifying it on
/// state-changing requests.
pub async fn csrf_middleware(
    State(manager): State<Arc<CsrfTokenManager>>,
    request: Request,
    next: Next,
) -> Response {
    let presented = manager.read_cookie(request.headers());
    let issued = presented.is_none().then(|| manager.create_token());

    let mut response = match manager.check(request.method(), presented.as_deref()) {
        Ok(()) => next.run(request).await,
        Err(rejection) => {
            tracing::info!(
                method = %request.method(),
                path = %request.uri().path(),
                reason = rejection.code(),
                "CSRF check failed"
            );
            metrics::record_csrf_rejected(rejection.code());
            rejection.into_response()
        }
    };

    if let Some(token) = issued {
        match HeaderValue::from_str(&manager.token_cookie(&token).to_string()) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
                metrics::record_csrf_issued();
            }
            Err(e) => tracing::error!(error = %e, "Failed to encode CSRF cookie"),
        }
    }

    response
}
