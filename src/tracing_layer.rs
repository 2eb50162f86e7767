//! Request tracing for the dispatcher.
//!
//! [`McpTracingLayer`] wraps the [`Dispatcher`](crate::Dispatcher) and opens
//! one `mcp_request` span per dispatched request. The span carries the method,
//! request id, tool name for `tools/call` and the caller's subject; the
//! outcome and duration are recorded on it when the request finishes. Bearer
//! tokens never reach this layer.
//!
//! # Log Levels
//!
//! - `INFO`: request completion
//! - `WARN`: error responses, and requests slower than the configured
//!   threshold

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use tower::Layer;
use tower_service::Service;
use tracing::field::Empty;
use tracing::{Instrument, Span};

use crate::dispatch::{DispatchRequest, DispatchResponse};
use crate::protocol::McpMethod;

/// Tower layer that adds structured tracing to dispatched requests.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use greeting_mcp::{Dispatcher, McpTracingLayer, ToolRegistry};
/// use tower::Layer;
///
/// let dispatcher = Dispatcher::new(Arc::new(ToolRegistry::new()));
/// let traced = McpTracingLayer::new()
///     .slow_request_threshold(Duration::from_millis(500))
///     .layer(dispatcher);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct McpTracingLayer {
    slow_threshold: Option<Duration>,
}

impl McpTracingLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Warn about requests that take longer than `threshold`.
    pub fn slow_request_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = Some(threshold);
        self
    }
}

impl<S> Layer<S> for McpTracingLayer {
    type Service = McpTracingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        McpTracingService {
            inner,
            slow_threshold: self.slow_threshold,
        }
    }
}

/// Service created by [`McpTracingLayer`].
#[derive(Debug, Clone)]
pub struct McpTracingService<S> {
    inner: S,
    slow_threshold: Option<Duration>,
}

impl<S> Service<DispatchRequest> for McpTracingService<S>
where
    S: Service<DispatchRequest, Response = DispatchResponse, Error = Infallible>
        + Clone
        + Send
        + 'static,
    S::Future: Send,
{
    type Response = DispatchResponse;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<DispatchResponse, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: DispatchRequest) -> Self::Future {
        let method = req.method.method_name().to_string();
        let span = request_span(&req);
        let slow_threshold = self.slow_threshold;

        let start = Instant::now();
        let fut = self.inner.call(req);

        Box::pin(
            async move {
                let result = fut.await;
                let elapsed = start.elapsed();
                let duration_ms = elapsed.as_secs_f64() * 1000.0;

                let span = Span::current();
                span.record("duration_ms", duration_ms);

                if let Ok(response) = &result {
                    match &response.inner {
                        Ok(_) => {
                            span.record("outcome", "ok");
                            tracing::info!(
                                method = %method,
                                duration_ms,
                                "MCP request completed"
                            );
                        }
                        Err(err) => {
                            span.record("outcome", "error");
                            span.record("error_code", err.code);
                            tracing::warn!(
                                method = %method,
                                error_code = err.code,
                                error_message = %err.message,
                                duration_ms,
                                "MCP request failed"
                            );
                        }
                    }
                }

                if slow_threshold.is_some_and(|limit| elapsed > limit) {
                    tracing::warn!(method = %method, duration_ms, "Slow MCP request");
                }

                result
            }
            .instrument(span),
        )
    }
}

fn request_span(req: &DispatchRequest) -> Span {
    let tool = match &req.method {
        McpMethod::CallTool(params) => Some(params.name.as_str()),
        _ => None,
    };
    let caller = req.claims.as_ref().and_then(|c| c.sub.as_deref());

    tracing::info_span!(
        "mcp_request",
        method = %req.method.method_name(),
        request_id = %req.id,
        tool,
        caller,
        outcome = Empty,
        error_code = Empty,
        duration_ms = Empty,
    )
}
