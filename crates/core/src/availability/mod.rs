//! Availability expressions compiled into unit timeslots

pub mod compiler;
pub mod service;

pub use compiler::AvailabilityCompiler;
pub use service::AvailabilityService;
