//! Available-balance lookups for local senders
//!
//! The writer asks the balance service for the sender's current balance
//! before accepting an intra-bank debit. The service is reached over HTTP
//! with the caller's own bearer token; in a single-process deployment the
//! lookup can be served from the local balance cache instead.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;
use types::ids::AccountNumber;

const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);
const REQUEST_TIMEOUT: Duration = Duration::from_millis(1_500);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BalanceLookupError {
    /// The balance service could not be reached or is itself unavailable
    #[error("remote resource unavailable: {0}")]
    Unavailable(String),

    /// The request could not be built, or the service answered without a balance
    #[error("unable to read available balance: {0}")]
    Failed(String),
}

/// Source of a local account's available balance
#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn available_balance(&self, bearer_token: &str, account: &AccountNumber) -> Result<i64, BalanceLookupError>;
}

/// Balance lookups against `GET {base}/balances/{account}`
#[derive(Clone)]
pub struct HttpBalanceClient {
    client: Client,
    balances_uri: String,
}

impl HttpBalanceClient {
    /// `addr` is `host:port` or a full base URL.
    pub fn new(addr: &str) -> Result<Self, BalanceLookupError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BalanceLookupError::Failed(format!("http client: {e}")))?;
        Ok(Self::with_client(client, addr))
    }

    pub fn with_client(client: Client, addr: &str) -> Self {
        let base = if addr.starts_with("http://") || addr.starts_with("https://") {
            addr.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", addr.trim_end_matches('/'))
        };
        Self {
            client,
            balances_uri: format!("{base}/balances"),
        }
    }

    pub fn balances_uri(&self) -> &str {
        &self.balances_uri
    }
}

#[async_trait]
impl BalanceSource for HttpBalanceClient {
    async fn available_balance(&self, bearer_token: &str, account: &AccountNumber) -> Result<i64, BalanceLookupError> {
        let uri = format!("{}/{}", self.balances_uri, account);
        debug!(uri = %uri, "Retrieving balance for transaction sender");

        // Only a malformed request or an empty answer is our own failure;
        // anything else the remote end does counts as it being unavailable.
        let response = self
            .client
            .get(&uri)
            .bearer_auth(bearer_token)
            .send()
            .await
            .map_err(|e| {
                if e.is_builder() {
                    BalanceLookupError::Failed(format!("[uri={uri}] {e}"))
                } else {
                    BalanceLookupError::Unavailable(format!("[uri={uri}] {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(BalanceLookupError::Unavailable(format!("[uri={uri}] status {status}")));
        }

        response
            .json::<Option<i64>>()
            .await
            .map_err(|e| BalanceLookupError::Unavailable(format!("[uri={uri}] invalid body: {e}")))?
            .ok_or_else(|| BalanceLookupError::Failed(format!("[uri={uri}] empty balance")))
    }
}
