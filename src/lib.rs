pub mod builder;
pub mod cli;
pub mod config;
pub mod db;
pub mod embed;
pub mod error;
pub mod index;
mod metrics;
pub mod search;
mod server;
pub mod utils;

pub use config::Opts;
pub use error::{Error, Result};
pub use search::SearchEngine;
