//! The `relief` terrain previewer.
//!
//! Loads configuration, generates a square of terrain chunks on worker
//! threads, drives their delivery from a fixed-interval loop, and writes a
//! PNG preview of the origin chunk.

pub mod app;
pub mod consumer_loop;
pub mod platform;
pub mod preview;
pub mod session;

pub use app::{AppError, RunSummary, run};
