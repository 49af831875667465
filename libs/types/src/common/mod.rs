//! Common numeric types shared across the bridge

pub mod errors;
pub mod fixed_point;
