// smartsports-edge - Offline-first caching router for the SmartSports web app
// Author: kelexine (https://github.com/kelexine)

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod router;
pub mod server;
pub mod utils;
pub mod worker;
