//! irqmon - interactive interrupt activity sampler
//!
//! This library provides the core of the monitor: snapshot capture of the
//! `/proc/interrupts` counter table, delta computation between consecutive
//! snapshots against a monotonic cycle clock, and the interactive session
//! loop that drives sampling and rendering.

pub mod cli;
pub mod clock;
pub mod delta;
pub mod render;
pub mod session;
pub mod signal;
pub mod snapshot;
