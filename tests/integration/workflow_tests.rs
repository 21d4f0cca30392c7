use super::helpers::*;
use super::mock_backend::MockBackendServer;
use super::mock_ledger::MockLedgerServer;
use hyper::StatusCode;
use kyc_attest::domain::Document;
use kyc_attest::handlers;

#[tokio::test]
async fn test_upload_review_sign_workflow() {
    let ledger = MockLedgerServer::new();
    let ledger_url = ledger.start().await;
    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

    let temp = tempfile::tempdir().unwrap();
    let state = test_state(&ledger_url, None, &temp);
    let content = FULL_KTP.as_bytes();

    // Upload: all required fields parse, so the document auto-verifies and
    // the attestation token is minted eagerly.
    let response = handlers::route(state.clone(), upload_request("0xowner", "ktp.txt", content)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let doc = json_body(response).await;
    let doc_id = doc["id"].as_str().unwrap().to_string();
    assert_eq!(doc["status"], "Verified");
    assert_eq!(doc["file_hash"], Document::hash_bytes(content));
    let token_id = doc["token_id"].as_u64().expect("token minted at intake");

    // Review
    let response = handlers::route(
        state.clone(),
        admin_request(
            &format!("/documents/{doc_id}/review"),
            Some(ADMIN_KEY),
            serde_json::json!({"reviewed_by": "ops@kyc"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let reviewed = json_body(response).await;
    assert_eq!(reviewed["status"], "Reviewed");
    assert_eq!(reviewed["token_id"].as_u64(), Some(token_id));

    // Sign
    let response = handlers::route(
        state.clone(),
        admin_request(
            &format!("/documents/{doc_id}/sign"),
            Some(ADMIN_KEY),
            serde_json::json!({"signed_by": "ops@kyc"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let signed = json_body(response).await;
    assert_eq!(signed["status"], "Signed");

    // Final read-back
    let response = handlers::route(state.clone(), get_request(&format!("/documents/{doc_id}"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = json_body(response).await;
    assert_eq!(fetched["status"], "Signed");
    assert_eq!(fetched["token_id"].as_u64(), Some(token_id));
    assert_eq!(fetched["file_hash"], Document::hash_bytes(content));

    // One of each write hit the chain, and the contract agrees on the state.
    assert_eq!(ledger.submissions("verifyAndMint"), 1);
    assert_eq!(ledger.submissions("reviewDocument"), 1);
    assert_eq!(ledger.submissions("signDocument"), 1);
    assert_eq!(ledger.status_of(token_id), Some(2));
}

#[tokio::test]
async fn test_sign_before_review_is_rejected_without_ledger_call() {
    let ledger = MockLedgerServer::new();
    let ledger_url = ledger.start().await;
    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

    let temp = tempfile::tempdir().unwrap();
    let state = test_state(&ledger_url, None, &temp);

    let response =
        handlers::route(state.clone(), upload_request("0xowner", "ktp.txt", FULL_KTP.as_bytes()))
            .await;
    let doc = json_body(response).await;
    let doc_id = doc["id"].as_str().unwrap().to_string();

    let response = handlers::route(
        state.clone(),
        admin_request(
            &format!("/documents/{doc_id}/sign"),
            Some(ADMIN_KEY),
            serde_json::json!({}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(ledger.submissions("signDocument"), 0);

    let response = handlers::route(state.clone(), get_request(&format!("/documents/{doc_id}"))).await;
    let fetched = json_body(response).await;
    assert_eq!(fetched["status"], "Verified");
}

#[tokio::test]
async fn test_review_revert_leaves_document_unchanged() {
    let ledger = MockLedgerServer::new();
    let ledger_url = ledger.start().await;
    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

    let temp = tempfile::tempdir().unwrap();
    let state = test_state(&ledger_url, None, &temp);

    let response =
        handlers::route(state.clone(), upload_request("0xowner", "ktp.txt", FULL_KTP.as_bytes()))
            .await;
    let doc = json_body(response).await;
    let doc_id = doc["id"].as_str().unwrap().to_string();
    let token_id = doc["token_id"].as_u64().unwrap();

    ledger.set_revert("reviewDocument");
    let response = handlers::route(
        state.clone(),
        admin_request(
            &format!("/documents/{doc_id}/review"),
            Some(ADMIN_KEY),
            serde_json::json!({}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(ledger.submissions("reviewDocument"), 1);

    let response = handlers::route(state.clone(), get_request(&format!("/documents/{doc_id}"))).await;
    let fetched = json_body(response).await;
    assert_eq!(fetched["status"], "Verified");
    assert_eq!(fetched["token_id"].as_u64(), Some(token_id));
}

#[tokio::test]
async fn test_review_lazily_mints_after_failed_intake_mint() {
    let ledger = MockLedgerServer::new();
    let ledger_url = ledger.start().await;
    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

    let temp = tempfile::tempdir().unwrap();
    let state = test_state(&ledger_url, None, &temp);

    // Intake mint reverts: the document stays Verified with no token.
    ledger.set_revert("verifyAndMint");
    let response =
        handlers::route(state.clone(), upload_request("0xowner", "ktp.txt", FULL_KTP.as_bytes()))
            .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let doc = json_body(response).await;
    let doc_id = doc["id"].as_str().unwrap().to_string();
    assert_eq!(doc["status"], "Verified");
    assert!(doc["token_id"].is_null());

    // Review mints lazily, then reviews.
    ledger.clear_revert("verifyAndMint");
    let response = handlers::route(
        state.clone(),
        admin_request(
            &format!("/documents/{doc_id}/review"),
            Some(ADMIN_KEY),
            serde_json::json!({}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let reviewed = json_body(response).await;
    assert_eq!(reviewed["status"], "Reviewed");
    assert!(reviewed["token_id"].as_u64().is_some());

    assert_eq!(ledger.submissions("verifyAndMint"), 2);
    assert_eq!(ledger.submissions("reviewDocument"), 1);
}

#[tokio::test]
async fn test_admin_endpoints_require_the_key() {
    let ledger = MockLedgerServer::new();
    let ledger_url = ledger.start().await;
    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

    let temp = tempfile::tempdir().unwrap();
    let state = test_state(&ledger_url, None, &temp);

    let response =
        handlers::route(state.clone(), upload_request("0xowner", "ktp.txt", FULL_KTP.as_bytes()))
            .await;
    let doc = json_body(response).await;
    let doc_id = doc["id"].as_str().unwrap().to_string();

    let missing = handlers::route(
        state.clone(),
        admin_request(&format!("/documents/{doc_id}/review"), None, serde_json::json!({})),
    )
    .await;
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let wrong = handlers::route(
        state.clone(),
        admin_request(
            &format!("/documents/{doc_id}/review"),
            Some("not-the-key"),
            serde_json::json!({}),
        ),
    )
    .await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(ledger.submissions("reviewDocument"), 0);
}

#[tokio::test]
async fn test_upload_with_invalid_base64_is_bad_request() {
    let ledger = MockLedgerServer::new();
    let ledger_url = ledger.start().await;

    let temp = tempfile::tempdir().unwrap();
    let state = test_state(&ledger_url, None, &temp);

    let body = serde_json::json!({
        "wallet_address": "0xowner",
        "file_name": "ktp.txt",
        "content": "!!!not-base64!!!",
    });
    let request = hyper::Request::builder()
        .method(hyper::Method::POST)
        .uri("/documents")
        .header("content-type", "application/json")
        .body(hyper::Body::from(body.to_string()))
        .unwrap();

    let response = handlers::route(state.clone(), request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = json_body(response).await;
    assert!(error["error"].as_str().unwrap().contains("base64"));
}

#[tokio::test]
async fn test_unknown_document_and_route_are_not_found() {
    let ledger = MockLedgerServer::new();
    let ledger_url = ledger.start().await;

    let temp = tempfile::tempdir().unwrap();
    let state = test_state(&ledger_url, None, &temp);

    let response = handlers::route(state.clone(), get_request("/documents/no-such-id")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = handlers::route(state.clone(), get_request("/nope")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_and_list_and_logs_endpoints() {
    let ledger = MockLedgerServer::new();
    let ledger_url = ledger.start().await;
    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

    let temp = tempfile::tempdir().unwrap();
    let state = test_state(&ledger_url, None, &temp);

    let response = handlers::route(state.clone(), get_request("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let health = json_body(response).await;
    assert_eq!(health["documents"].as_u64(), Some(0));

    let response =
        handlers::route(state.clone(), upload_request("0xowner", "ktp.txt", FULL_KTP.as_bytes()))
            .await;
    let doc = json_body(response).await;
    let doc_id = doc["id"].as_str().unwrap().to_string();

    let response = handlers::route(state.clone(), get_request("/documents")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let listed = json_body(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let response =
        handlers::route(state.clone(), get_request(&format!("/documents/{doc_id}/logs"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let logs = json_body(response).await;
    let entries = logs["logs"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["verification_result"], "Verified");
    assert_eq!(entries[0]["parsed_fields"]["NIK"], "3171234567890001");
}

#[tokio::test]
async fn test_review_notifies_partner_backend() {
    let ledger = MockLedgerServer::new();
    let ledger_url = ledger.start().await;
    let backend = MockBackendServer::new();
    let backend_url = backend.start().await;
    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

    let temp = tempfile::tempdir().unwrap();
    let state = test_state(&ledger_url, Some(backend_url), &temp);

    let response =
        handlers::route(state.clone(), upload_request("0xowner", "ktp.txt", FULL_KTP.as_bytes()))
            .await;
    let doc = json_body(response).await;
    let doc_id = doc["id"].as_str().unwrap().to_string();
    let token_id = doc["token_id"].as_u64().unwrap();

    let response = handlers::route(
        state.clone(),
        admin_request(
            &format!("/documents/{doc_id}/review"),
            Some(ADMIN_KEY),
            serde_json::json!({"reviewed_by": "ops@kyc"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Delivery is fire-and-forget; give the spawned tasks a moment.
    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    let notifications = backend.notifications();
    assert!(!notifications.is_empty(), "expected at least one notification");
    assert!(notifications
        .iter()
        .any(|n| n["extraData"]["status"] == "Reviewed"));

    let updates = backend.kyc_updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].0, token_id.to_string());
    assert_eq!(updates[0].1["status"], "Reviewed");
    assert_eq!(updates[0].1["reviewedBy"], "ops@kyc");
    assert!(updates[0].1["txHash"].as_str().unwrap().starts_with("0xtx"));
    assert!(updates[0].1["signature"].as_str().is_some());
}
