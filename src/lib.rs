//! A Rust client for the Arlula imagery marketplace API.
//!
//! The crate covers the order-fulfilment side of the API: checking
//! credentials, listing and fetching orders, campaigns, datasets and
//! resources, and streaming delivered imagery to disk. It also carries the
//! helpers the rest of the API leans on: an RFC 3339 timestamp parser for
//! payload fields and scene price calculation.
//!
//! ## Quick start
//! - Configure credentials via environment variables (`ARLULA_API_KEY`,
//!   `ARLULA_API_SECRET`, optionally `ARLULA_URL`) or a `.arlularc` file
//!   (current directory or home directory).
//! - Download a dataset with [`Client::download_dataset`].
//!
//! ```no_run
//! use anyhow::Result;
//! use arlula::Client;
//! use std::path::Path;
//!
//! fn main() -> Result<()> {
//!     let client = Client::from_env()?;
//!     client.validate_credentials()?;
//!     for dataset in client.datasets(None) {
//!         let dataset = dataset?;
//!         println!("{} {} {}", dataset.id, dataset.supplier, dataset.status);
//!     }
//!     client.download_dataset("dataset-id", Some(Path::new("imagery")))?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

mod client;
mod config;
mod download;
mod error;
mod list;
mod model;
mod price;
pub mod rfc3339;
mod util;

pub use client::{API_VERSION, Client, ClientConfig};
pub use error::ApiError;
pub use list::{ListRequest, ListResponse};
pub use model::{Campaign, Dataset, Order, Resource};
pub use price::{Loading, calculate_price};
pub use rfc3339::{ParseFailure, ParsedTimestamp, parse_datetime, parse as parse_rfc3339};
