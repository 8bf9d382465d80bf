//! Blindstick - remote monitoring for a smart blind stick.
//!
//! # Overview
//!
//! The stick (or the simulator) writes its state into a realtime key-value
//! store under four sections: `location`, `alerts`, `sensors` and `system`.
//! Blindstick polls those sections, normalizes whatever it finds into a
//! complete [`model::Snapshot`], forwards emergencies to a messaging bot at
//! most once per cooldown window, and serves the resulting dashboard view
//! over HTTP for a renderer to draw.
//!
//! The dashboard keeps working when the store is partly or entirely
//! unreachable: missing fields are replaced by defaults, and a total outage
//! shows a fully defaulted snapshot instead of an error.
//!
//! # Modules
//!
//! - [`model`]: Snapshot, history entry and distance band types
//! - [`store`]: Firebase and SQLite backends behind the [`store::Store`] trait
//! - [`normalize`]: Per-field defaulting of raw store data
//! - [`notifier`]: Emergency detection with cooldown, Telegram channel
//! - [`history`]: Alert feed reduction
//! - [`dashboard`]: The view served to renderers
//! - [`monitor`]: The polling loop that owns the notifier
//! - [`simulator`]: Synthetic readings and emergency events
//! - [`api`]: HTTP API handlers
//! - [`config`]: Environment configuration

pub mod api;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod history;
pub mod model;
pub mod monitor;
pub mod normalize;
pub mod notifier;
pub mod simulator;
pub mod store;

pub use error::{Error, Result};
