pub mod credit_service;
pub mod market_service;
pub mod share_service;

pub use credit_service::{BalanceSnapshot, CreditService};
pub use market_service::{MarketService, MarketSnapshot, OptionSnapshot};
pub use share_service::{CloseOutcome, ShareService, ShareSnapshot, TallySnapshot};
