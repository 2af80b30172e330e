use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub(crate) struct RequestInfo {
    pub(crate) id: Uuid,
    pub(crate) method: Method,
    pub(crate) path: String,
}

/// Hook points for an observability layer. Handlers and the request
/// middleware call these; nothing in the remediation path depends on them.
pub(crate) trait RequestObserver: Send + Sync {
    fn on_request_start(&self, req: &RequestInfo);
    fn on_request_end(&self, req: &RequestInfo, status: StatusCode, elapsed: Duration);
    /// A request ended in a failure the caller will see.
    fn on_error(&self, route: &str, message: &str);
}

/// Default observer: structured log lines only.
pub(crate) struct TracingObserver;

impl RequestObserver for TracingObserver {
    fn on_request_start(&self, req: &RequestInfo) {
        info!("request start id={} {} {}", req.id, req.method, req.path);
    }

    fn on_request_end(&self, req: &RequestInfo, status: StatusCode, elapsed: Duration) {
        info!(
            "request end id={} {} {} status={} elapsed_ms={}",
            req.id,
            req.method,
            req.path,
            status.as_u16(),
            elapsed.as_millis()
        );
    }

    fn on_error(&self, route: &str, message: &str) {
        warn!("request error route={route}: {message}");
    }
}

pub(crate) async fn observe_requests(
    State(observer): State<Arc<dyn RequestObserver>>,
    req: Request,
    next: Next,
) -> Response {
    let info = RequestInfo {
        id: Uuid::new_v4(),
        method: req.method().clone(),
        path: req.uri().path().to_string(),
    };
    observer.on_request_start(&info);
    let started = Instant::now();
    let resp = next.run(req).await;
    observer.on_request_end(&info, resp.status(), started.elapsed());
    resp
}

#[cfg(test)]
pub(crate) mod fake {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub(crate) struct RecordingObserver {
        pub(crate) events: Mutex<Vec<String>>,
    }

    impl RecordingObserver {
        pub(crate) fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl RequestObserver for RecordingObserver {
        fn on_request_start(&self, req: &RequestInfo) {
            self.events
                .lock()
                .unwrap()
                .push(format!("start {} {}", req.method, req.path));
        }

        fn on_request_end(&self, req: &RequestInfo, status: StatusCode, _elapsed: Duration) {
            self.events
                .lock()
                .unwrap()
                .push(format!("end {} {}", req.path, status.as_u16()));
        }

        fn on_error(&self, route: &str, message: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("error {route}: {message}"));
        }
    }
}
