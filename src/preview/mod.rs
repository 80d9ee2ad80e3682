// Preview pipeline: validation, mapping, and surface publication.

pub mod error;
pub mod pipeline;
pub mod session;
pub mod surface;
