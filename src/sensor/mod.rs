// Sensor domain: frame sources, geometry, and availability.

pub mod backend;
pub mod dummy;
pub mod error;
pub mod types;
