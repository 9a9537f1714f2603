//! Utility modules for bucketsync.

pub mod capacity_manager;

pub use capacity_manager::{CapacityManager, UsedCapacity};
