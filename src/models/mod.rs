// src/models/mod.rs

pub mod booking;
pub mod budget;
pub mod campus;
pub mod inventory;
pub mod lab;
pub mod money;

// Re-export so that structs are reachable as crate::models::StructName
pub use booking::*;
pub use budget::*;
pub use campus::*;
pub use inventory::*;
pub use lab::*;
pub use money::*;
