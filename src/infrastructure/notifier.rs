use hyper::client::HttpConnector;
use hyper::{Body, Client, Method, Request};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Mirror update for the partner backend's KYC record.
#[derive(Debug, Clone, Default, Serialize)]
pub struct KycMirrorUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(rename = "reviewedBy", skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(rename = "txHash", skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

#[derive(Serialize)]
struct NotificationPayload<'a> {
    #[serde(rename = "userId")]
    user_id: &'a str,
    #[serde(rename = "executorId")]
    executor_id: &'a str,
    #[serde(rename = "type")]
    notif_type: &'a str,
    title: &'a str,
    message: &'a str,
    #[serde(rename = "extraData")]
    extra_data: serde_json::Value,
}

/// Best-effort delivery of lifecycle events to the partner backend.
///
/// Delivery failures are logged and swallowed; they must never fail or roll
/// back the state transition that triggered them. With no backend configured
/// every send is a no-op that reports failure.
pub struct Notifier {
    client: Client<HttpConnector>,
    backend_url: Option<String>,
    api_key: Option<String>,
    timeout: Duration,
}

impl Notifier {
    pub fn new(backend_url: Option<String>, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            backend_url: backend_url.map(|u| u.trim_end_matches('/').to_string()),
            api_key,
            timeout,
        }
    }

    /// A notifier with no backend, for deployments without the partner
    /// integration and for tests.
    pub fn disabled() -> Self {
        Self::new(None, None, Duration::from_secs(10))
    }

    fn endpoint(&self) -> Option<(&str, &str)> {
        match (self.backend_url.as_deref(), self.api_key.as_deref()) {
            (Some(url), Some(key)) => Some((url, key)),
            _ => {
                warn!("partner backend not configured, dropping outbound call");
                None
            }
        }
    }

    pub async fn send_notification(
        &self,
        user_id: &str,
        executor_id: &str,
        notif_type: &str,
        title: &str,
        message: &str,
        extra_data: serde_json::Value,
    ) -> bool {
        let (base, key) = match self.endpoint() {
            Some(pair) => pair,
            None => return false,
        };

        let payload = NotificationPayload {
            user_id,
            executor_id,
            notif_type,
            title,
            message,
            extra_data,
        };
        let body = match serde_json::to_string(&payload) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "failed to encode notification payload");
                return false;
            }
        };

        let url = format!("{base}/notification/internal");
        let delivered = self.post_json(Method::POST, &url, key, body).await;
        if delivered {
            debug!(user_id, notif_type, "notification delivered");
        }
        delivered
    }

    pub async fn update_external_kyc(&self, token_id: u64, update: &KycMirrorUpdate) -> bool {
        let (base, key) = match self.endpoint() {
            Some(pair) => pair,
            None => return false,
        };

        let body = match serde_json::to_string(update) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "failed to encode kyc mirror payload");
                return false;
            }
        };

        let url = format!("{base}/kyc/internal/{token_id}/status");
        let delivered = self.post_json(Method::PATCH, &url, key, body).await;
        if delivered {
            debug!(token_id, "kyc mirror updated");
        }
        delivered
    }

    async fn post_json(&self, method: Method, url: &str, api_key: &str, body: String) -> bool {
        let request = match Request::builder()
            .method(method)
            .uri(url)
            .header("content-type", "application/json")
            .header("x-internal-key", api_key)
            .body(Body::from(body))
        {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, url, "failed to build outbound request");
                return false;
            }
        };

        match tokio::time::timeout(self.timeout, self.client.request(request)).await {
            Ok(Ok(response)) if response.status().is_success() => true,
            Ok(Ok(response)) => {
                warn!(url, status = %response.status(), "partner backend rejected call");
                false
            }
            Ok(Err(e)) => {
                warn!(url, error = %e, "partner backend unreachable");
                false
            }
            Err(_) => {
                warn!(url, "partner backend call timed out");
                false
            }
        }
    }
}
