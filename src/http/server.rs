//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Assemble the protective pipeline around the site router
//! - Wire up ambient middleware (request ID, tracing, metrics, timeout, body limit)
//! - Bind server to listener, plain or TLS
//! - Stop accepting on shutdown and drain within the grace period
//!
//! # Pipeline
//! ```text
//! request ID → trace span → metrics
//!   → HeaderGuard (applies to every response below)
//!   → timeout → body limit
//!   → OriginGate (CORS)
//!   → RateLimiter
//!   → CSRF tokens
//!   → SiteRouter (API namespace | assets + entry document)
//! ```

use axum::{
    http::header::InvalidHeaderValue,
    middleware::{from_fn, from_fn_with_state},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use std::future::IntoFuture;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::http::request::{RequestIdGenerator, X_REQUEST_ID};
use crate::lifecycle::shutdown::{triggered, Shutdown};
use crate::observability::{metrics, tracing::make_request_span};
use crate::routing::{asset_service, EntryDocument, NamespaceMatcher, SiteRouter};
use crate::security::csrf::{csrf_middleware, CsrfTokenManager, Secret, SecretError};
use crate::security::headers::{security_headers_middleware, HeaderPolicy};
use crate::security::origin::{cors_layer, OriginAllowList};
use crate::security::rate_limit::{rate_limit_middleware, RateLimiter};

/// Errors that prevent the server from being assembled.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("no CSRF secret configured (set CSRF_SECRET or csrf.secret)")]
    MissingSecret,

    #[error("invalid CSRF secret: {0}")]
    Secret(#[from] SecretError),

    #[error("invalid security header value: {0}")]
    Header(#[from] InvalidHeaderValue),

    #[error("failed to read entry document {path:?}: {source}")]
    EntryDocument {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    limiter: Option<Arc<RateLimiter>>,
}

impl HttpServer {
    /// Build the server with the secret from `config` and `api` as the
    /// handler set for the API namespace.
    pub fn new(config: GatewayConfig, api: Router) -> Result<Self, StartupError> {
        let secret = config
            .csrf
            .secret
            .as_deref()
            .ok_or(StartupError::MissingSecret)?;
        let secret = Secret::new(secret)?;
        Self::with_secret(config, secret, api)
    }

    /// Build the server with an explicit signing secret.
    pub fn with_secret(
        config: GatewayConfig,
        secret: Secret,
        api: Router,
    ) -> Result<Self, StartupError> {
        let headers = Arc::new(HeaderPolicy::from_config(
            &config.headers,
            config.https_active(),
        )?);
        let csrf = Arc::new(CsrfTokenManager::new(&secret, &config.csrf)?);
        let limiter = config
            .rate_limit
            .enabled
            .then(|| Arc::new(RateLimiter::new(&config.rate_limit)));

        let entry_path = config.assets.entry_path();
        let entry = EntryDocument::load(&entry_path).map_err(|source| {
            StartupError::EntryDocument {
                path: entry_path.clone(),
                source,
            }
        })?;
        let site = SiteRouter::new(
            NamespaceMatcher::new(config.api.prefix.as_str()),
            api,
            asset_service(&config.assets.root, entry),
        );

        let origins = OriginAllowList::from_config(&config.cors);
        tracing::debug!(
            allowed_origins = origins.len(),
            rate_limit_enabled = limiter.is_some(),
            https = config.https_active(),
            "Pipeline assembled"
        );
        let router = Self::build_router(&config, site, headers, origins, csrf, limiter.clone());

        Ok(Self {
            router,
            config,
            limiter,
        })
    }

    /// Layer the guards around the site router. The last layer added is the
    /// outermost.
    #[allow(deprecated)]
    fn build_router(
        config: &GatewayConfig,
        site: SiteRouter,
        headers: Arc<HeaderPolicy>,
        origins: OriginAllowList,
        csrf: Arc<CsrfTokenManager>,
        limiter: Option<Arc<RateLimiter>>,
    ) -> Router {
        let mut router = site
            .into_router()
            .layer(from_fn_with_state(csrf, csrf_middleware));

        if let Some(limiter) = limiter {
            router = router.layer(from_fn_with_state(limiter, rate_limit_middleware));
        }

        router
            .layer(cors_layer(origins))
            .layer(RequestBodyLimitLayer::new(config.limits.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(from_fn_with_state(headers, security_headers_middleware))
            .layer(from_fn(metrics::track_requests))
            .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, RequestIdGenerator))
    }

    /// The assembled pipeline, for embedding or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn rate_limiter(&self) -> Option<&Arc<RateLimiter>> {
        self.limiter.as_ref()
    }

    fn spawn_janitor(&self, shutdown: &Shutdown) -> Option<JoinHandle<()>> {
        self.limiter
            .clone()
            .map(|limiter| limiter.spawn_janitor(shutdown.subscribe()))
    }

    fn grace_period(&self) -> Duration {
        Duration::from_secs(self.config.timeouts.shutdown_grace_secs)
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: &Shutdown) -> Result<(), io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let janitor = self.spawn_janitor(shutdown);
        let grace = self.grace_period();
        let deadline = shutdown.subscribe();

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();
        let server = axum::serve(listener, app)
            .with_graceful_shutdown(triggered(shutdown.subscribe()))
            .into_future();

        tokio::select! {
            result = server => result?,
            _ = async {
                triggered(deadline).await;
                tokio::time::sleep(grace).await;
            } => {
                tracing::warn!(
                    grace_secs = grace.as_secs(),
                    "Connections still open after grace period, closing"
                );
            }
        }

        if let Some(janitor) = janitor {
            let _ = janitor.await;
        }
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server over TLS on `addr` until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        shutdown: &Shutdown,
    ) -> Result<(), io::Error> {
        tracing::info!(address = %addr, "HTTPS server starting");

        let janitor = self.spawn_janitor(shutdown);
        let grace = self.grace_period();

        let handle = axum_server::Handle::new();
        let stop = shutdown.subscribe();
        let signal_handle = handle.clone();
        tokio::spawn(async move {
            triggered(stop).await;
            signal_handle.graceful_shutdown(Some(grace));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(
                self.router
                    .into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await?;

        if let Some(janitor) = janitor {
            let _ = janitor.await;
        }
        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}
