//! Job submission and background execution.

pub mod request;
pub mod service;
pub mod single_flight;

pub use request::{Collaborators, ExtractionRequest, ServiceOptions};
pub use service::ExtractionService;
pub use single_flight::InFlightLocks;
