// Cache router module
// Author: kelexine (https://github.com/kelexine)

pub mod classify;
pub mod network;
mod strategy;

pub use classify::{Classifier, RequestClass};
pub use network::{HttpNetwork, Network};
pub use strategy::{
    offline_json, offline_text, CacheRouter, PartitionSet, Routed, OFFLINE_API_ERROR, OFFLINE_TEXT,
};
