pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    Bankroll, BankrollId, Bet, BetId, BetStatus, Currency, Decimal, Role, User, UserId,
    VerificationStatus, Visibility,
};
pub use engine::{calculate_bankroll_stats, BankrollReport, BankrollStats, NormalizedBet};
pub use error::AppError;
