//! Background Tasks Module
//!
//! Optional helpers for long-lived stores. The store itself never spawns
//! anything; callers opt in.
//!
//! # Tasks
//! - Expiry sweep: purges expired records at a fixed interval

mod sweep;

pub use sweep::spawn_sweep_task;
