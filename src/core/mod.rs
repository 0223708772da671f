//! # Core Infrastructure Module
//!
//! The data the rest of the engine is built on: pixel buffers, the adjustment
//! parameters with their snapshot store, and the three-role scratch buffer pool.

pub mod buffer_pool;
pub mod frame;
pub mod params;
