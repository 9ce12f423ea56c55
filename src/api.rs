//! API descriptors and response strategies consumed by issuers and clients.

pub mod descriptor;
pub mod strategy;

pub use descriptor::*;
pub use strategy::*;
