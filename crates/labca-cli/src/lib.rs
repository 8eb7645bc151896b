//! # labca-cli
//!
//! Command-line interface for per-lab certificate authorities.
//!
//! ## Features
//!
//! - **CA bootstrap**: create a lab root CA once, reuse it afterwards
//! - **Node certificates**: issue, store and inspect leaf certificates
//! - **Topology provisioning**: policy-gated bootstrap plus parallel issuance
//! - **Output formats**: colored text or JSON

pub mod cli;
pub mod config;
pub mod output;

pub use cli::run;
