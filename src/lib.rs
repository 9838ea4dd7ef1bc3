//! Conviction Core Library
//!
//! Client core for confidential conviction markets: market lifecycle state
//! machine, encrypted stake-and-reveal protocol, computation finalization
//! waiter, and the time-weighted reward engine. The ledger and the
//! multiparty-computation cluster are external collaborators reached through
//! the RPC-backed [`ledger::LedgerClient`].

pub mod addresses;
pub mod config;
pub mod crypto;
pub mod dispatch;
pub mod error;
pub mod finalization;
pub mod ledger;
pub mod models;
pub mod rewards;
pub mod services;
pub mod telemetry;

// Re-export commonly used types
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use models::MarketPhase;

use config::ClientConfig as Config;
use finalization::FinalizationWaiter;
use ledger::LedgerClient;
use services::{CreditService, MarketService, ShareService};
use std::sync::Arc;

/// Application state containing the ledger client and all services
pub struct ClientState {
    pub ledger: Arc<LedgerClient>,
    pub market_service: Arc<MarketService>,
    pub share_service: Arc<ShareService>,
    pub credit_service: Arc<CreditService>,
}

impl ClientState {
    /// Create a new ClientState with initialized services
    pub fn new(ledger: LedgerClient, config: &Config) -> Self {
        let ledger = Arc::new(ledger);
        let waiter = Arc::new(FinalizationWaiter::new(
            ledger.clone(),
            ledger.program_id(),
            config.finalization.clone(),
        ));

        Self {
            ledger: ledger.clone(),
            market_service: Arc::new(MarketService::new(ledger.clone(), config.policy)),
            share_service: Arc::new(ShareService::new(
                ledger.clone(),
                waiter.clone(),
                config.policy,
            )),
            credit_service: Arc::new(CreditService::new(ledger, waiter)),
        }
    }
}
