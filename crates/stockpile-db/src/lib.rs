//! Stockpile DB - Database repository layer for PostgreSQL / CockroachDB
//!
//! This crate provides the repository the sync engine writes through.
//!
//! # Overview
//!
//! The main component is [`StockRepository`], which implements
//! [`RecordStore`](stockpile_core::traits::RecordStore) with one multi-row
//! upsert per batch, plus schema migration and read-back helpers.

mod repository;

pub use repository::StockRepository;
