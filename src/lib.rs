//! # Elpris - hourly electricity prices on a local-time hour grid
//!
//! Fetches hourly spot prices from a remote price service for a lookahead
//! window that starts at the current civil hour (Europe/Copenhagen by default),
//! projects them into display records and keeps the latest result available
//! over a small HTTP API.
//!
//! ## Architecture
//!
//! - `clock`: current instant and local-hour flooring on the civil grid
//! - `prices`: wire types, range building, the fetcher and the display projector
//! - `format`: Danish display formatting
//! - `refresh`: single-flight refresh coordination and signal sources
//! - `pipeline`: the fetch-and-project unit of work and the snapshot store
//! - `web`: HTTP server and REST API
//! - `config`: YAML configuration with validation
//! - `logging`: structured logging and tracing

pub mod clock;
pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod pipeline;
pub mod prices;
pub mod refresh;
pub mod web;

pub use config::Config;
pub use error::{ElprisError, Result};
