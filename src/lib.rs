//! `agri-credit` library crate.
//!
//! The binary (`credit`) is a thin wrapper around this library so that:
//!
//! - the ETL, training and scoring code is testable without spawning processes
//! - the server and the offline commands share one feature pipeline

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod features;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
pub mod scoring;
pub mod server;
