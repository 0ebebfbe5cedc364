//! Domain types for the bankroll tracker.
//!
//! This module provides:
//! - Lossless money handling via the Decimal wrapper
//! - Identifiers and roles
//! - User, Bankroll and Bet records as stored and served

pub mod bankroll;
pub mod bet;
pub mod decimal;
pub mod primitives;
pub mod user;

pub use bankroll::{Bankroll, Currency, Visibility};
pub use bet::{Bet, BetStatus, VerificationStatus};
pub use decimal::Decimal;
pub use primitives::{datetime_from_ms, BankrollId, BetId, Role, UserId};
pub use user::{Subscription, SubscriptionStatus, User};
