//! Worker-side event flows riding alongside the cache router.
//!
//! # Components
//!
//! - `lifecycle`: install / activate and page control messages.
//! - `clients`: open pages and router → page delivery.
//! - `push`: push payloads turned into notifications, and notification clicks.
//! - `sync`: background sync triggers that refresh and broadcast data.
//! - `messages`: the message protocol in both directions.
//!
//! Author: kelexine (<https://github.com/kelexine>)

pub mod clients;
pub mod lifecycle;
pub mod messages;
pub mod push;
pub mod sync;

pub use clients::{ClientInfo, ClientRegistry};
pub use lifecycle::{InstallOutcome, Lifecycle, WorkerState};
pub use messages::{ControlMessage, PageMessage};
pub use push::{ClickOutcome, Notification, NotificationAction, PushBridge, PushPayload};
pub use sync::{SyncBridge, SyncOutcome, SyncTag};
