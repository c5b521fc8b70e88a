//! HTTP server
//!
//! A thin hyper/http1 front end over [`StatsPipeline`]. Routes:
//!
//! - `GET /v{N}/stats/{platform}/{tag}/complete`
//! - `GET /v{N}/stats/{platform}/{tag}/profile`
//! - `GET /v{N}/stats/{platform}/{tag}/heroes/{hero,hero,...}`
//! - `GET /v{N}/version`
//! - `GET /health`
//! - `GET /metrics` (Prometheus text, when enabled)
//!
//! Every JSON response carries `Access-Control-Allow-Origin: *`. Failures are
//! returned as `{"error": "<message>"}` with the status from
//! [`StatsError::to_http_status`].

use crate::error::{Result, StatsError};
use crate::metrics::format_prometheus_metrics;
use crate::models::{ApiVersion, HeroSelection, StatsRequest, View};
use crate::pipeline::{error_body, StatsPipeline};
use http::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
use http::{Method, StatusCode};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use serde_json::json;
use std::borrow::Cow;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

const JSON: &str = "application/json";
const PROMETHEUS_TEXT: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Parsed request path
#[derive(Debug, PartialEq, Eq)]
enum Route<'a> {
    Health,
    Metrics,
    Version {
        version: &'a str,
    },
    Stats {
        version: &'a str,
        platform: &'a str,
        tag: &'a str,
        view: ViewSegment<'a>,
    },
    NotFound,
}

#[derive(Debug, PartialEq, Eq)]
enum ViewSegment<'a> {
    Complete,
    Profile,
    Heroes(&'a str),
}

fn route(path: &str) -> Route<'_> {
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();

    match segments.as_slice() {
        ["health"] => Route::Health,
        ["metrics"] => Route::Metrics,
        [version, "version"] if version.starts_with('v') => Route::Version { version: *version },
        [version, "stats", platform, tag, rest @ ..] if version.starts_with('v') => {
            let view = match rest {
                ["complete"] => ViewSegment::Complete,
                ["profile"] => ViewSegment::Profile,
                ["heroes", list] => ViewSegment::Heroes(*list),
                _ => return Route::NotFound,
            };
            Route::Stats {
                version: *version,
                platform: *platform,
                tag: *tag,
                view,
            }
        }
        _ => Route::NotFound,
    }
}

fn decode(segment: &str) -> Result<Cow<'_, str>> {
    urlencoding::decode(segment)
        .map_err(|_| StatsError::InvalidTag(format!("'{}' is not valid UTF-8", segment)))
}

/// Validate raw route parameters into a request
///
/// Nothing here touches the cache or the upstream source.
fn parse_stats_request(
    version: &str,
    platform: &str,
    tag: &str,
    view: &ViewSegment<'_>,
) -> Result<StatsRequest> {
    let view = match view {
        ViewSegment::Complete => View::Complete,
        ViewSegment::Profile => View::Profile,
        ViewSegment::Heroes(list) => View::Heroes(HeroSelection::parse(&decode(list)?)?),
    };

    StatsRequest::parse(version, platform, &decode(tag)?, view)
}

/// Stats HTTP server
pub struct StatsServer {
    pipeline: Arc<StatsPipeline>,
    metrics_enabled: bool,
}

impl StatsServer {
    pub fn new(pipeline: Arc<StatsPipeline>) -> Self {
        StatsServer {
            pipeline,
            metrics_enabled: false,
        }
    }

    /// Serve `/metrics` in Prometheus format
    pub fn with_metrics_endpoint(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }

    /// Bind to `addr` and serve until the process is terminated
    pub async fn start(self, addr: SocketAddr) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serve connections accepted from an already bound listener
    pub async fn serve(self, listener: TcpListener) -> std::io::Result<()> {
        info!("Stats server listening on http://{}", listener.local_addr()?);
        if self.metrics_enabled {
            info!("Metrics available at /metrics");
        }

        let server = Arc::new(self);

        loop {
            let (stream, peer) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let server = Arc::clone(&server);

            tokio::task::spawn(async move {
                let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                    let server = Arc::clone(&server);
                    async move {
                        Ok::<_, Infallible>(server.respond(req.method(), req.uri().path()).await)
                    }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Error serving connection from {}: {:?}", peer, err);
                }
            });
        }
    }

    /// Produce the response for a request line
    pub async fn respond(&self, method: &Method, path: &str) -> Response<Full<Bytes>> {
        debug!("{} {}", method, path);

        if method != Method::GET {
            return json_response(
                StatusCode::METHOD_NOT_ALLOWED,
                Bytes::from(json!({ "error": "method not allowed" }).to_string()),
            );
        }

        match route(path) {
            Route::Health => json_response(
                StatusCode::OK,
                Bytes::from_static(br#"{"status":"healthy"}"#),
            ),
            Route::Metrics if self.metrics_enabled => {
                let snapshot = self.pipeline.metrics().get_stats();
                response(
                    StatusCode::OK,
                    PROMETHEUS_TEXT,
                    Bytes::from(format_prometheus_metrics(&snapshot)),
                )
            }
            Route::Version { version } => match version.parse::<ApiVersion>() {
                Ok(_) => json_response(
                    StatusCode::OK,
                    Bytes::from(json!({ "version": env!("CARGO_PKG_VERSION") }).to_string()),
                ),
                Err(e) => error_response(&e),
            },
            Route::Stats {
                version,
                platform,
                tag,
                view,
            } => match parse_stats_request(version, platform, tag, &view) {
                Ok(request) => match self.pipeline.handle(&request).await {
                    Ok(body) => json_response(StatusCode::OK, body),
                    Err(e) => error_response(&e),
                },
                Err(e) => {
                    self.pipeline.metrics().record_client_error();
                    error_response(&e)
                }
            },
            Route::Metrics | Route::NotFound => not_found_response(),
        }
    }
}

fn response(status: StatusCode, content_type: &'static str, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

fn json_response(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
    response(status, JSON, body)
}

fn error_response(err: &StatsError) -> Response<Full<Bytes>> {
    let status =
        StatusCode::from_u16(err.to_http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    json_response(status, error_body(err))
}

fn not_found_response() -> Response<Full<Bytes>> {
    json_response(
        StatusCode::NOT_FOUND,
        Bytes::from(json!({ "error": "not found" }).to_string()),
    )
}
