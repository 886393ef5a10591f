//! Core types and trait definitions for the campus student-affairs backend.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::CampusStore`]; media hosts implement
//! [`media::MediaStore`]. Role resolution, permission provisioning plans,
//! attendance CSV parsing and statistics summarising live here as plain
//! functions over those types.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod access;
pub mod activity;
pub mod attendance;
pub mod error;
pub mod interact;
pub mod media;
pub mod provision;
pub mod role;
pub mod school;
pub mod statistics;
pub mod store;
pub mod user;

pub use error::{Error, Result};
