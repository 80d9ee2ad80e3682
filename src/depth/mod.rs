// Depth domain: raw sample to intensity mapping.

pub mod mapper;
