pub mod balance;
pub mod codec;
pub mod market;
pub mod option;
pub mod share;

pub use balance::CreditBalance;
pub use market::{Market, MarketPhase, Operation};
pub use option::MarketOption;
pub use share::{ShareRecord, ShareState};

/// Current wall-clock time as unix seconds
pub fn unix_now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}
