//! Security response-header middleware.
//!
//! Adds the standard security headers (`X-Content-Type-Options`,
//! `X-Frame-Options`, `X-XSS-Protection`, and `Strict-Transport-Security`
//! when the listener terminates TLS) to every non-streaming response.
//! Multipart live-view responses are exempt: their body is an open-ended
//! frame sequence consumed inside dashboard tiles, so frame-options and
//! sniffing headers do not apply.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderValue, Response, header},
};
use tower::{Layer, Service};

use crate::config::HstsSettings;

/// Header policy for one listener.
#[derive(Debug, Clone)]
pub struct SecurityHeadersConfig {
    /// Precomputed HSTS header, present only when serving TLS.
    hsts: Option<HeaderValue>,
}

impl SecurityHeadersConfig {
    /// Build the policy; `serving_tls` gates the HSTS header.
    pub fn new(settings: &HstsSettings, serving_tls: bool) -> Self {
        let hsts = serving_tls.then(|| build_hsts_value(settings));
        Self { hsts }
    }
}

fn build_hsts_value(settings: &HstsSettings) -> HeaderValue {
    let mut directives = vec![format!("max-age={}", settings.max_age)];
    if settings.include_subdomains {
        directives.push("includeSubDomains".to_string());
    }
    if settings.preload {
        directives.push("preload".to_string());
    }
    HeaderValue::from_str(&directives.join("; "))
        .unwrap_or_else(|_| HeaderValue::from_static("max-age=31536000"))
}

/// Layer applying [`SecurityHeadersConfig`].
#[derive(Debug, Clone)]
pub struct SecurityHeadersLayer {
    config: SecurityHeadersConfig,
}

impl SecurityHeadersLayer {
    pub fn new(settings: &HstsSettings, serving_tls: bool) -> Self {
        Self {
            config: SecurityHeadersConfig::new(settings, serving_tls),
        }
    }
}

impl<S> Layer<S> for SecurityHeadersLayer {
    type Service = SecurityHeadersMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SecurityHeadersMiddleware {
            inner,
            config: self.config.clone(),
        }
    }
}

/// The middleware service.
#[derive(Debug, Clone)]
pub struct SecurityHeadersMiddleware<S> {
    inner: S,
    config: SecurityHeadersConfig,
}

fn is_streaming(response: &Response<Body>) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/x-mixed-replace"))
}

impl<S> Service<Request<Body>> for SecurityHeadersMiddleware<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<
        Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let config = self.config.clone();
        let future = self.inner.call(request);

        Box::pin(async move {
            let mut response = future.await?;

            if !is_streaming(&response) {
                let headers = response.headers_mut();
                headers.insert(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                );
                headers.insert(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY"),
                );
                headers.insert(
                    header::X_XSS_PROTECTION,
                    HeaderValue::from_static("1; mode=block"),
                );
                if let Some(hsts) = config.hsts {
                    headers
                        .insert(header::STRICT_TRANSPORT_SECURITY, hsts);
                }
            }

            Ok(response)
        })
    }
}
