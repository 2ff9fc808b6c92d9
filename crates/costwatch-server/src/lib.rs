//! HTTP API, weekly report job, and scheduler for costwatch.

pub mod api;
pub mod app;
pub mod config;
pub mod job;
pub mod logging;
pub mod middleware;
pub mod scheduler;
pub mod state;
