//! Security layer application for the router
//!
//! Wraps the router with transport hardening: request timeout, body-size
//! limit, security headers, CORS, and HTTP tracing. The timeout also bounds
//! stalled storage calls, so a hung backend fails the one request instead
//! of pinning it forever.

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;

/// Extension trait applying the hardening layers to an Axum router.
pub trait SecureRouter {
    /// Apply timeout, body limit, security headers, CORS, and tracing.
    fn with_security(self, config: &AppConfig) -> Self;
}

impl<S> SecureRouter for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_security(self, config: &AppConfig) -> Self {
        self.layer(TimeoutLayer::new(config.request_timeout))
            .layer(RequestBodyLimitLayer::new(config.max_request_size))
            .layer(SetResponseHeaderLayer::overriding(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::X_FRAME_OPTIONS,
                HeaderValue::from_static("DENY"),
            ))
            // Token responses must never land in a shared cache.
            .layer(SetResponseHeaderLayer::overriding(
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-store, no-cache, must-revalidate, private"),
            ))
            .layer(build_cors_layer(config))
            .layer(TraceLayer::new_for_http())
    }
}

/// Build the CORS layer from the configured origin allowlist.
fn build_cors_layer(config: &AppConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    if config.cors_origins.iter().any(|o| o == "*") {
        // Any origin - development only.
        base.allow_origin(Any)
    } else if config.cors_origins.is_empty() {
        // Same-origin only.
        base
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|s| HeaderValue::from_str(s).ok())
            .collect();
        base.allow_origin(origins).allow_credentials(true)
    }
}
