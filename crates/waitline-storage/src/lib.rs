// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Waitline engine.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a
//! single-writer concurrency model via `tokio-rusqlite`, and typed query
//! modules for waitlist entries, claim offers, and the lifecycle audit
//! trail. The conditional-update primitive the engine's concurrency model
//! rests on lives in [`queries::entries::conditional_transition`].

pub mod database;
pub mod migrations;
pub mod queries;
pub mod store;
pub mod timefmt;

pub use database::Database;
pub use store::SqliteStore;
