use crate::auth::JwtVerifier;
use crate::config::Config;
use async_trait::async_trait;
use ledger_reader::{
    BalanceCache, CacheError, FanOut, HistoryCache, HistoryConfig, LedgerReader, ReaderMetrics, ScheduledTaskHealth,
};
use ledger_store::LedgerStore;
use ledger_writer::{BalanceLookupError, BalanceSource, HttpBalanceClient, LedgerWriter};
use std::collections::BTreeMap;
use std::sync::Arc;
use types::ids::AccountNumber;

/// Balance lookups served from this process's balance cache
pub struct CachedBalances(pub Arc<BalanceCache>);

#[async_trait]
impl BalanceSource for CachedBalances {
    async fn available_balance(&self, _bearer_token: &str, account: &AccountNumber) -> Result<i64, BalanceLookupError> {
        self.0.get_balance(account).await.map_err(|err| match err {
            CacheError::StoreUnavailable(e) => BalanceLookupError::Unavailable(e.to_string()),
            CacheError::Load(e) => BalanceLookupError::Failed(e.to_string()),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub verifier: Arc<JwtVerifier>,
    pub balances: Arc<BalanceCache>,
    pub history: Arc<HistoryCache>,
    pub reader: Arc<LedgerReader>,
    pub poller_health: Arc<ScheduledTaskHealth>,
    pub writer: Arc<LedgerWriter>,
}

impl AppState {
    /// Wire caches, poller and writer around `store`.
    pub fn new(config: Config, store: Arc<dyn LedgerStore>, verifier: JwtVerifier) -> Result<Self, anyhow::Error> {
        let balances = Arc::new(BalanceCache::new(
            store.clone(),
            config.local_routing.clone(),
            config.cache_size,
        ));
        let history = Arc::new(HistoryCache::new(
            store.clone(),
            config.local_routing.clone(),
            HistoryConfig {
                history_limit: config.history_limit,
                max_size: config.cache_size,
                expire_after_write: Some(config.cache_expiry),
            },
        ));

        let callbacks = FanOut::new().with(balances.clone()).with(history.clone());
        let mut reader = LedgerReader::new(store.clone(), Arc::new(callbacks), Arc::new(ReaderMetrics::new()));
        if let Some(start_after) = config.start_after {
            tracing::info!(start_after = %start_after, "Backfilling caches from explicit cursor");
            reader = reader.starting_after(start_after);
        }

        let balance_source: Arc<dyn BalanceSource> = match &config.balances_api_addr {
            Some(addr) => {
                let client = HttpBalanceClient::new(addr)?;
                tracing::info!(uri = client.balances_uri(), "Using remote balance service");
                Arc::new(client)
            }
            None => Arc::new(CachedBalances(balances.clone())),
        };
        let writer = LedgerWriter::new(store, balance_source, config.local_routing.clone(), config.dedup_window);

        Ok(Self {
            poller_health: Arc::new(ScheduledTaskHealth::for_poller(config.poll_interval)),
            config: Arc::new(config),
            verifier: Arc::new(verifier),
            balances,
            history,
            reader: Arc::new(reader),
            writer: Arc::new(writer),
        })
    }

    /// Every exported counter, keyed by metric name
    pub fn export_metrics(&self) -> BTreeMap<String, i64> {
        let mut m = self.reader.metrics().export();
        m.extend(self.balances.export_metrics());
        m.extend(self.history.export_metrics());
        m.extend(self.writer.export_metrics());
        m
    }
}
