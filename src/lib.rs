#![allow(clippy::multiple_crate_versions)]

pub mod app;
pub mod check;
pub mod config;
pub mod error;
pub mod models;
pub mod registry;
pub mod update;

pub use error::{CheckError, Result, SyncError, UpdateError};
