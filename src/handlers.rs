// HTTP routing for the intake and admin endpoints. Exposed from the lib so
// integration tests can drive requests without binding a socket.

use crate::application::{
    DocumentResponse, ErrorResponse, LifecycleError, LifecycleManager, LogListResponse,
    ReviewRequest, SignRequest, UploadRequest,
};
use base64::Engine;
use hyper::{Body, Method, Request, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

pub struct AppState {
    pub lifecycle: LifecycleManager,
    pub admin_api_key: Option<String>,
}

pub async fn route(state: Arc<AppState>, req: Request<Body>) -> Response<Body> {
    let (parts, body) = req.into_parts();
    let path = parts.uri.path().trim_matches('/').to_string();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match (&parts.method, segments.as_slice()) {
        (&Method::GET, ["health"]) => handle_health(&state),
        (&Method::POST, ["documents"]) => handle_upload(&state, body).await,
        (&Method::GET, ["documents"]) => handle_list(&state),
        (&Method::GET, ["documents", id]) => handle_get(&state, id),
        (&Method::GET, ["documents", id, "logs"]) => handle_logs(&state, id),
        (&Method::POST, ["documents", id, "review"]) => {
            if !authorized(&state, &parts) {
                return unauthorized();
            }
            handle_review(&state, id, body).await
        }
        (&Method::POST, ["documents", id, "sign"]) => {
            if !authorized(&state, &parts) {
                return unauthorized();
            }
            handle_sign(&state, id, body).await
        }
        _ => json_response(StatusCode::NOT_FOUND, &ErrorResponse::new("no such route")),
    }
}

fn handle_health(state: &AppState) -> Response<Body> {
    match state.lifecycle.document_count() {
        Ok(count) => json_response(
            StatusCode::OK,
            &serde_json::json!({ "status": "ok", "documents": count }),
        ),
        Err(e) => lifecycle_error(&e),
    }
}

async fn handle_upload(state: &AppState, body: Body) -> Response<Body> {
    let request: UploadRequest = match read_json(body).await {
        Ok(request) => request,
        Err(response) => return response,
    };

    let content = match base64::engine::general_purpose::STANDARD.decode(&request.content) {
        Ok(content) => content,
        Err(e) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                &ErrorResponse::new(format!("invalid base64 content: {e}")),
            )
        }
    };

    match state
        .lifecycle
        .ingest(&request.wallet_address, &request.file_name, &content)
        .await
    {
        Ok(doc) => json_response(StatusCode::CREATED, &DocumentResponse::from(&doc)),
        Err(e) => lifecycle_error(&e),
    }
}

fn handle_list(state: &AppState) -> Response<Body> {
    match state.lifecycle.documents() {
        Ok(docs) => {
            let docs: Vec<DocumentResponse> = docs.iter().map(DocumentResponse::from).collect();
            json_response(StatusCode::OK, &docs)
        }
        Err(e) => lifecycle_error(&e),
    }
}

fn handle_get(state: &AppState, id: &str) -> Response<Body> {
    match state.lifecycle.document(id) {
        Ok(doc) => json_response(StatusCode::OK, &DocumentResponse::from(&doc)),
        Err(e) => lifecycle_error(&e),
    }
}

fn handle_logs(state: &AppState, id: &str) -> Response<Body> {
    match state.lifecycle.logs(id) {
        Ok(logs) => json_response(
            StatusCode::OK,
            &LogListResponse {
                document_id: id.to_string(),
                logs,
            },
        ),
        Err(e) => lifecycle_error(&e),
    }
}

async fn handle_review(state: &AppState, id: &str, body: Body) -> Response<Body> {
    let request: ReviewRequest = match read_json_or_default(body).await {
        Ok(request) => request,
        Err(response) => return response,
    };

    match state.lifecycle.review(id, request.reviewed_by).await {
        Ok(doc) => json_response(StatusCode::OK, &DocumentResponse::from(&doc)),
        Err(e) => lifecycle_error(&e),
    }
}

async fn handle_sign(state: &AppState, id: &str, body: Body) -> Response<Body> {
    let request: SignRequest = match read_json_or_default(body).await {
        Ok(request) => request,
        Err(response) => return response,
    };

    match state.lifecycle.sign(id, request.signed_by).await {
        Ok(doc) => json_response(StatusCode::OK, &DocumentResponse::from(&doc)),
        Err(e) => lifecycle_error(&e),
    }
}

fn authorized(state: &AppState, parts: &hyper::http::request::Parts) -> bool {
    match state.admin_api_key.as_deref() {
        None => true,
        Some(expected) => parts
            .headers
            .get("x-admin-key")
            .and_then(|v| v.to_str().ok())
            .map(|presented| presented == expected)
            .unwrap_or(false),
    }
}

fn unauthorized() -> Response<Body> {
    json_response(
        StatusCode::UNAUTHORIZED,
        &ErrorResponse::new("missing or invalid admin key"),
    )
}

async fn read_json<T: serde::de::DeserializeOwned>(body: Body) -> Result<T, Response<Body>> {
    let bytes = hyper::body::to_bytes(body).await.map_err(|e| {
        json_response(
            StatusCode::BAD_REQUEST,
            &ErrorResponse::new(format!("failed to read request body: {e}")),
        )
    })?;

    serde_json::from_slice(&bytes).map_err(|e| {
        json_response(
            StatusCode::BAD_REQUEST,
            &ErrorResponse::new(format!("invalid request body: {e}")),
        )
    })
}

async fn read_json_or_default<T>(body: Body) -> Result<T, Response<Body>>
where
    T: serde::de::DeserializeOwned + Default,
{
    let bytes = hyper::body::to_bytes(body).await.map_err(|e| {
        json_response(
            StatusCode::BAD_REQUEST,
            &ErrorResponse::new(format!("failed to read request body: {e}")),
        )
    })?;

    if bytes.is_empty() {
        return Ok(T::default());
    }
    serde_json::from_slice(&bytes).map_err(|e| {
        json_response(
            StatusCode::BAD_REQUEST,
            &ErrorResponse::new(format!("invalid request body: {e}")),
        )
    })
}

fn lifecycle_error(err: &LifecycleError) -> Response<Body> {
    let status = match err {
        LifecycleError::NotFound => StatusCode::NOT_FOUND,
        LifecycleError::InvalidState(_) => StatusCode::CONFLICT,
        LifecycleError::EmptyContent | LifecycleError::EmptyFilename => StatusCode::BAD_REQUEST,
        LifecycleError::Ledger(_) => StatusCode::BAD_GATEWAY,
        LifecycleError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    json_response(status, &ErrorResponse::new(err.to_string()))
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Body> {
    let encoded = match serde_json::to_string(body) {
        Ok(encoded) => encoded,
        Err(e) => {
            error!(error = %e, "failed to encode response body");
            return Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Body::from("{\"error\":\"internal error\"}"))
                .unwrap_or_default();
        }
    };

    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(encoded))
        .unwrap_or_default()
}
