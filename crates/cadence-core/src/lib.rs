//! Cadence Core - Shared types for the Cadence runtime
//!
//! This crate provides the types that the runtime components share:
//! - `KeyCode`, `Edge`, `KeyEvent` - raw input vocabulary
//! - `BindingContext` - grouping tag for bulk unbinding
//! - `Pressable`, `Triggerable` - handler capabilities
//! - `BindingId`, `TriggerId`, `TimerId` - stable identifiers
//! - `RuntimeConfig` - TOML-backed configuration
//! - Error types and Result alias

mod config;
mod error;
mod id;
mod types;

pub use config::{ClockConfig, RuntimeConfig, TimerConfig};
pub use error::{CadenceError, Result};
pub use id::{BindingId, IdAllocator, TimerId, TriggerId};
pub use types::{BindingContext, Edge, KeyCode, KeyEvent, Pressable, Triggerable};
