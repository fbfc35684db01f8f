//! Geoservice Backend Library
//!
//! Authentication core (credential store, token codec, revocation list and
//! the pipeline tying them together) plus the thin HTTP shell around it.

pub mod app;
pub mod auth;
pub mod config;
pub mod middleware;
