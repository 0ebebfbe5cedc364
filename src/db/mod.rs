//! Database module for SQLite operations.
//!
//! This module provides:
//! - Database initialization and migrations
//! - SQLite pragma configuration
//! - Repository layer for users, bankrolls and bets

pub mod migrations;
pub mod repo;

pub use migrations::init_db;
pub use repo::{AdminBetRow, AdminUserRow, PageQuery, Repository};
