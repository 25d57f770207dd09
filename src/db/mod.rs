//! SQLite persistence for finished sessions.

pub mod connection;
pub mod helpers;
pub mod migrations;
pub mod repositories;

pub use connection::Database;
