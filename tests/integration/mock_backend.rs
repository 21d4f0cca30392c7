use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

pub const INTERNAL_KEY: &str = "internal-secret";

/// Captures what the service sends to the partner backend.
#[derive(Clone)]
pub struct MockBackendServer {
    notifications: Arc<Mutex<Vec<serde_json::Value>>>,
    kyc_updates: Arc<Mutex<Vec<(String, serde_json::Value)>>>,
}

impl MockBackendServer {
    pub fn new() -> Self {
        Self {
            notifications: Arc::new(Mutex::new(Vec::new())),
            kyc_updates: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn start(&self) -> String {
        let notifications = self.notifications.clone();
        let kyc_updates = self.kyc_updates.clone();

        let make_svc = make_service_fn(move |_conn| {
            let notifications = notifications.clone();
            let kyc_updates = kyc_updates.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |req| {
                    handle_request(req, notifications.clone(), kyc_updates.clone())
                }))
            }
        });

        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let server = Server::bind(&addr).serve(make_svc);
        let actual_addr = server.local_addr();

        tokio::spawn(async move {
            if let Err(e) = server.await {
                eprintln!("Mock backend server error: {}", e);
            }
        });

        format!("http://{}", actual_addr)
    }

    pub fn notifications(&self) -> Vec<serde_json::Value> {
        self.notifications.lock().unwrap().clone()
    }

    /// Captured mirror updates as (token path segment, payload).
    pub fn kyc_updates(&self) -> Vec<(String, serde_json::Value)> {
        self.kyc_updates.lock().unwrap().clone()
    }
}

async fn handle_request(
    req: Request<Body>,
    notifications: Arc<Mutex<Vec<serde_json::Value>>>,
    kyc_updates: Arc<Mutex<Vec<(String, serde_json::Value)>>>,
) -> Result<Response<Body>, Infallible> {
    let authorized = req
        .headers()
        .get("x-internal-key")
        .and_then(|v| v.to_str().ok())
        .map(|key| key == INTERNAL_KEY)
        .unwrap_or(false);
    if !authorized {
        return Ok(status_only(StatusCode::UNAUTHORIZED));
    }

    let method = req.method().clone();
    let path = req.uri().path().trim_matches('/').to_string();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let body_bytes = hyper::body::to_bytes(req.into_body())
        .await
        .unwrap_or_default();
    let payload: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap_or_default();

    let response = match (&method, segments.as_slice()) {
        (&Method::POST, ["notification", "internal"]) => {
            notifications.lock().unwrap().push(payload);
            status_only(StatusCode::CREATED)
        }
        (&Method::PATCH, ["kyc", "internal", token_id, "status"]) => {
            kyc_updates
                .lock()
                .unwrap()
                .push((token_id.to_string(), payload));
            status_only(StatusCode::OK)
        }
        _ => status_only(StatusCode::NOT_FOUND),
    };

    Ok(response)
}

fn status_only(status: StatusCode) -> Response<Body> {
    Response::builder()
        .status(status)
        .body(Body::empty())
        .unwrap()
}
