#![forbid(unsafe_code)]

//! irdash-sync — real-time status synchronization for the IR remote
//! appliance dashboard.
//!
//! The server pushes command status transitions over a server-sent-event
//! stream; two independent pollers recover anything the stream misses. All
//! sources converge on one reconciler that owns the entity store and fans
//! changes out to a render target:
//!
//! 1. **Push channel** — SSE reader with fixed-delay, unlimited reconnect
//! 2. **Pollers** — periodic stats and device-fleet snapshots
//! 3. **Reconciler** — idempotent last-write-wins merge, one thread
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use irdash_sync::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use irdash_sync::core::config::Config;
//! use irdash_sync::sync::runtime::SyncRuntime;
//! ```

pub mod prelude;

pub mod client;
pub mod core;
pub mod logger;
pub mod model;
pub mod store;
pub mod sync;
pub mod view;
