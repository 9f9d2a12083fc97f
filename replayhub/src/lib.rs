//! replayhub library crate.
//!
//! Core of the community video portal: the change-feed notification pipeline
//! and the resumable upload transfer.

pub mod cache;
pub mod database;
pub mod dispatcher;
pub mod error;
pub mod feed;
pub mod logging;
pub mod notification;
pub mod provider;
pub mod services;
pub mod settings;
pub mod upload;
pub mod utils;

pub use error::{Error, Result};
