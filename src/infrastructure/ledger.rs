use crate::domain::{OnChainStatus, TxReceipt};
use async_trait::async_trait;
use hyper::client::HttpConnector;
use hyper::{Body, Client, Method, Request, StatusCode};
use json::JsonValue;
use sha2::{Digest, Sha256};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Fixed per-operation gas budgets; not negotiated per call.
const GAS_MINT: u64 = 350_000;
const GAS_REVIEW: u64 = 200_000;
const GAS_SIGN: u64 = 200_000;
const GAS_ADD_MINTER: u64 = 100_000;

/// 10 gwei.
const GAS_PRICE_WEI: u64 = 10_000_000_000;

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("ledger request failed: {0}")]
    Transport(String),

    #[error("transaction rejected at submission: {0}")]
    Rejected(String),

    #[error("transaction reverted: {0}")]
    Reverted(String),

    #[error("timed out waiting for receipt of {0}")]
    ConfirmationTimeout(String),

    #[error("malformed ledger response: {0}")]
    BadResponse(String),

    #[error("no token minted for content hash {0}")]
    TokenNotFound(String),
}

/// Operations the lifecycle manager needs from the attestation contract.
///
/// Every write is a two-step commit: submit a signed, nonce-sequenced
/// transaction, then block until a receipt is observed. The receipt, not
/// submission acceptance, decides success.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Mint an attestation token bound to `content_hash` and resolve its id.
    ///
    /// Minting is idempotent by lookup: a content hash maps to at most one
    /// token, so callers may retry safely even if an earlier attempt's
    /// outcome was lost.
    async fn mint(
        &self,
        owner: &str,
        content_hash: &str,
        token_uri: &str,
    ) -> Result<u64, LedgerError>;

    async fn review(&self, token_id: u64) -> Result<TxReceipt, LedgerError>;

    async fn sign(&self, token_id: u64) -> Result<TxReceipt, LedgerError>;

    async fn status_of(&self, token_id: u64) -> Result<OnChainStatus, LedgerError>;

    async fn token_id_of_hash(&self, content_hash: &str) -> Result<Option<u64>, LedgerError>;

    async fn add_minter(&self, address: &str) -> Result<TxReceipt, LedgerError>;

    async fn is_minter(&self, address: &str) -> Result<bool, LedgerError>;
}

/// Gateway speaking the registry node's JSON-over-HTTP transaction API.
pub struct HttpLedgerGateway {
    client: Client<HttpConnector>,
    rpc_url: String,
    contract_address: String,
    operator_key: String,
    operator_address: String,
    timeout: Duration,
    /// Next nonce for the operating account. All writes from this service
    /// share one account, so acquire-and-increment is a single critical
    /// section per outgoing transaction. `None` until first fetched.
    nonce: Mutex<Option<u64>>,
}

impl HttpLedgerGateway {
    pub fn new(
        rpc_url: String,
        contract_address: String,
        operator_key: String,
        timeout: Duration,
    ) -> Self {
        let operator_address = derive_address(&operator_key);
        Self {
            client: Client::new(),
            rpc_url: rpc_url.trim_end_matches('/').to_string(),
            contract_address,
            operator_key,
            operator_address,
            timeout,
            nonce: Mutex::new(None),
        }
    }

    pub fn operator_address(&self) -> &str {
        &self.operator_address
    }

    async fn http(&self, req: Request<Body>) -> Result<(StatusCode, Vec<u8>), LedgerError> {
        let response = tokio::time::timeout(self.timeout, self.client.request(req))
            .await
            .map_err(|_| LedgerError::Transport("request timed out".to_string()))?
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        let status = response.status();
        let body = hyper::body::to_bytes(response.into_body())
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;
        Ok((status, body.to_vec()))
    }

    async fn get_json(&self, path: &str) -> Result<(StatusCode, JsonValue), LedgerError> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(format!("{}{}", self.rpc_url, path))
            .body(Body::empty())
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        let (status, body) = self.http(request).await?;
        let text = String::from_utf8_lossy(&body).to_string();
        let parsed = if text.is_empty() {
            JsonValue::Null
        } else {
            json::parse(&text).map_err(|e| LedgerError::BadResponse(e.to_string()))?
        };
        Ok((status, parsed))
    }

    async fn fetch_nonce(&self) -> Result<u64, LedgerError> {
        let path = format!("/accounts/{}/nonce", self.operator_address);
        let (status, body) = self.get_json(&path).await?;
        if !status.is_success() {
            return Err(LedgerError::Transport(format!(
                "nonce query returned HTTP {status}"
            )));
        }
        body["nonce"]
            .as_u64()
            .ok_or_else(|| LedgerError::BadResponse("nonce missing from response".to_string()))
    }

    /// Build, sign, and submit one transaction under the nonce lock.
    ///
    /// The lock covers nonce acquisition through submission so concurrent
    /// writes cannot race on the same counter value; it is released before
    /// the receipt wait so confirmation of one transaction does not stall
    /// the next submission.
    async fn submit(&self, call: JsonValue, gas: u64) -> Result<String, LedgerError> {
        let mut slot = self.nonce.lock().await;
        let nonce = match *slot {
            Some(n) => n,
            None => self.fetch_nonce().await?,
        };

        let call_dump = call.dump();
        let signature = self.sign_payload(nonce, &call_dump);
        let tx = json::object! {
            "from" => self.operator_address.as_str(),
            "to" => self.contract_address.as_str(),
            "nonce" => nonce,
            "gas" => gas,
            "gas_price" => GAS_PRICE_WEI,
            "call" => call,
            "signature" => signature.as_str()
        };

        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("{}/transactions", self.rpc_url))
            .header("content-type", "application/json")
            .body(Body::from(tx.dump()))
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        let (status, body) = self.http(request).await?;
        if !status.is_success() {
            return Err(LedgerError::Rejected(format!(
                "HTTP {status}: {}",
                String::from_utf8_lossy(&body)
            )));
        }

        let parsed = json::parse(&String::from_utf8_lossy(&body))
            .map_err(|e| LedgerError::BadResponse(e.to_string()))?;
        let tx_hash = parsed["tx_hash"]
            .as_str()
            .ok_or_else(|| LedgerError::BadResponse("tx_hash missing from response".to_string()))?
            .to_string();

        *slot = Some(nonce + 1);
        debug!(%tx_hash, nonce, "transaction submitted");
        Ok(tx_hash)
    }

    /// Poll for the receipt until it appears or the confirmation window
    /// lapses. A missing receipt within the window is a timeout failure,
    /// never an indefinite block.
    async fn wait_receipt(&self, tx_hash: &str) -> Result<TxReceipt, LedgerError> {
        let poll = async {
            loop {
                let path = format!("/receipts/{tx_hash}");
                let (status, body) = self.get_json(&path).await?;
                if status == StatusCode::NOT_FOUND {
                    tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
                    continue;
                }
                if !status.is_success() {
                    return Err(LedgerError::Transport(format!(
                        "receipt query returned HTTP {status}"
                    )));
                }

                let block_number = body["block_number"].as_u64().ok_or_else(|| {
                    LedgerError::BadResponse("block_number missing from receipt".to_string())
                })?;
                let receipt_status = body["status"].as_str().unwrap_or("");
                return match receipt_status {
                    "success" => Ok(TxReceipt {
                        tx_hash: tx_hash.to_string(),
                        block_number,
                        reverted: false,
                    }),
                    "reverted" => Err(LedgerError::Reverted(tx_hash.to_string())),
                    other => Err(LedgerError::BadResponse(format!(
                        "unknown receipt status: {other}"
                    ))),
                };
            }
        };

        tokio::time::timeout(self.timeout, poll)
            .await
            .map_err(|_| LedgerError::ConfirmationTimeout(tx_hash.to_string()))?
    }

    async fn submit_and_confirm(
        &self,
        call: JsonValue,
        gas: u64,
    ) -> Result<TxReceipt, LedgerError> {
        let tx_hash = self.submit(call, gas).await?;
        self.wait_receipt(&tx_hash).await
    }

    fn sign_payload(&self, nonce: u64, call_dump: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.operator_key.as_bytes());
        hasher.update(nonce.to_be_bytes());
        hasher.update(call_dump.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[async_trait]
impl LedgerGateway for HttpLedgerGateway {
    async fn mint(
        &self,
        owner: &str,
        content_hash: &str,
        token_uri: &str,
    ) -> Result<u64, LedgerError> {
        let call = json::object! {
            "method" => "verifyAndMint",
            "to" => owner,
            "file_hash" => content_hash,
            "token_uri" => token_uri
        };
        let receipt = self.submit_and_confirm(call, GAS_MINT).await?;
        debug!(tx_hash = receipt.tx_hash.as_str(), "mint confirmed");

        // The contract maps each hash to at most one token; resolving after
        // confirmation also recovers the id when an earlier mint succeeded
        // but its result was lost.
        self.token_id_of_hash(content_hash)
            .await?
            .ok_or_else(|| LedgerError::TokenNotFound(content_hash.to_string()))
    }

    async fn review(&self, token_id: u64) -> Result<TxReceipt, LedgerError> {
        let call = json::object! {
            "method" => "reviewDocument",
            "token_id" => token_id
        };
        self.submit_and_confirm(call, GAS_REVIEW).await
    }

    async fn sign(&self, token_id: u64) -> Result<TxReceipt, LedgerError> {
        let call = json::object! {
            "method" => "signDocument",
            "token_id" => token_id
        };
        self.submit_and_confirm(call, GAS_SIGN).await
    }

    async fn status_of(&self, token_id: u64) -> Result<OnChainStatus, LedgerError> {
        let path = format!("/contracts/{}/status/{token_id}", self.contract_address);
        let (status, body) = self.get_json(&path).await?;
        if !status.is_success() {
            return Err(LedgerError::Transport(format!(
                "status query returned HTTP {status}"
            )));
        }
        let code = body["status"]
            .as_u64()
            .ok_or_else(|| LedgerError::BadResponse("status missing from response".to_string()))?;
        OnChainStatus::from_code(code)
            .ok_or_else(|| LedgerError::BadResponse(format!("unknown status code: {code}")))
    }

    async fn token_id_of_hash(&self, content_hash: &str) -> Result<Option<u64>, LedgerError> {
        let path = format!("/contracts/{}/tokens/{content_hash}", self.contract_address);
        let (status, body) = self.get_json(&path).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(LedgerError::Transport(format!(
                "token query returned HTTP {status}"
            )));
        }
        let token_id = body["token_id"]
            .as_u64()
            .ok_or_else(|| LedgerError::BadResponse("token_id missing from response".to_string()))?;
        Ok(Some(token_id))
    }

    async fn add_minter(&self, address: &str) -> Result<TxReceipt, LedgerError> {
        let call = json::object! {
            "method" => "addMinter",
            "minter" => address
        };
        let receipt = self.submit_and_confirm(call, GAS_ADD_MINTER).await?;
        warn!(minter = address, "minter added to registry");
        Ok(receipt)
    }

    async fn is_minter(&self, address: &str) -> Result<bool, LedgerError> {
        let path = format!("/contracts/{}/minters/{address}", self.contract_address);
        let (status, body) = self.get_json(&path).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !status.is_success() {
            return Err(LedgerError::Transport(format!(
                "minter query returned HTTP {status}"
            )));
        }
        Ok(body["is_minter"].as_bool().unwrap_or(false))
    }
}

/// Address of the operating account, derived from its credential.
fn derive_address(operator_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(operator_key.as_bytes());
    let digest = hasher.finalize();
    format!("0x{}", hex::encode(&digest[..20]))
}
