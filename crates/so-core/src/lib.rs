//! # so-core
//!
//! Core types, traits, and utilities for the service-order backend.
//!
//! This crate provides the foundational building blocks used across all other crates:
//! - Validation error collection shared by contracts, services and the API
//! - The shared identifier type
//! - Application configuration

pub mod config;
pub mod error;
pub mod traits;

pub use error::*;
pub use traits::*;
