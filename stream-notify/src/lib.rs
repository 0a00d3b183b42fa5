//! stream-notify library crate.
//!
//! Polls live rooms on streaming platforms and pushes a notification when a
//! room goes live or offline.

pub mod app;
pub mod config;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod notification;
pub mod panic_hook;
pub mod rooms;

pub use error::{Error, Result};
