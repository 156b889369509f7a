//! Stockpile Client - HTTP client for the stock ratings API
//!
//! This crate provides [`StockApiClient`], the [`PageProvider`] the sync
//! engine pulls ratings from.
//!
//! # Overview
//!
//! The client handles authentication, cursor query parameters, response
//! parsing, retries on transient failures, and error mapping to
//! [`AppError`](stockpile_core::AppError).
//!
//! [`PageProvider`]: stockpile_core::traits::PageProvider

pub mod stock_api;

// Re-export main client type
pub use stock_api::StockApiClient;
