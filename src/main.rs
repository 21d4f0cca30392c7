use hyper::service::{make_service_fn, service_fn};
use hyper::Server;
use kyc_attest::application::LifecycleManager;
use kyc_attest::config::Config;
use kyc_attest::handlers::{self, AppState};
use kyc_attest::infrastructure::database::{DocumentStore, SqliteStore};
use kyc_attest::infrastructure::ledger::{HttpLedgerGateway, LedgerGateway};
use kyc_attest::infrastructure::notifier::Notifier;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let store = match SqliteStore::new(&config.db_path) {
        Ok(store) => store,
        Err(e) => {
            warn!(path = config.db_path.as_str(), error = %e, "persistent database unavailable, falling back to in-memory");
            SqliteStore::new_in_memory()?
        }
    };
    let store: Arc<dyn DocumentStore> = Arc::new(store);
    let documents = store.count_documents()?;
    info!(documents, "record store initialized");

    let ledger = Arc::new(HttpLedgerGateway::new(
        config.ledger_rpc_url.clone(),
        config.contract_address.clone(),
        config.operator_key.clone(),
        config.ledger_timeout,
    ));
    info!(
        rpc_url = config.ledger_rpc_url.as_str(),
        operator = ledger.operator_address(),
        "ledger gateway configured"
    );

    if let Some(minter) = &config.register_minter {
        match ledger.add_minter(minter).await {
            Ok(receipt) => info!(minter = minter.as_str(), tx_hash = receipt.tx_hash.as_str(), "minter registered"),
            Err(e) => warn!(minter = minter.as_str(), error = %e, "minter registration failed"),
        }
    }
    match ledger.is_minter(ledger.operator_address()).await {
        Ok(true) => {}
        Ok(false) => warn!("operating account is not a registered minter; mint calls will revert"),
        Err(e) => warn!(error = %e, "could not check minter role at startup"),
    }

    let notifier = Arc::new(Notifier::new(
        config.backend_url.clone(),
        config.internal_api_key.clone(),
        config.notify_timeout,
    ));

    let lifecycle = LifecycleManager::new(store, ledger, notifier, config.temp_dir.clone());
    let state = Arc::new(AppState {
        lifecycle,
        admin_api_key: config.admin_api_key.clone(),
    });

    let make_svc = make_service_fn(move |_conn| {
        let state = state.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req| {
                let state = state.clone();
                async move { Ok::<_, Infallible>(handlers::route(state, req).await) }
            }))
        }
    });

    info!(addr = %config.bind_addr, "kyc intake service listening");
    Server::bind(&config.bind_addr).serve(make_svc).await?;

    Ok(())
}
