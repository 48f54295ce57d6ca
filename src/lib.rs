//! MyTune - a music review client
//!
//! This library talks to the MyTune review backend and the Spotify catalog:
//! an authenticated request gateway with refresh-and-retry, domain
//! gateways and services on top of it, and a memoized review feed.

pub mod cache;
pub mod cli;
pub mod config;
pub mod feed;
pub mod gateways;
pub mod http;
pub mod models;
pub mod services;
pub mod storage;
