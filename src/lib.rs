//! Command-line client for the Scaleway compute API
//!
//! Servers, images, snapshots and bootscripts can be designated by any
//! fragment of their name or a prefix of their identifier. The mapping is
//! kept in a local [`cache::Cache`] that is warmed by every API read and
//! refreshed from the API on a miss.

pub mod api;
pub mod cache;
pub mod commands;
pub mod config;
