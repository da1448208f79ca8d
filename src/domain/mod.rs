//! Domain layer: entities, ports (trait seams to external
//! collaborators), and error types. No I/O lives here.

pub mod error;
pub mod models;
pub mod ports;
