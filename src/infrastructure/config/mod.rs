//! Configuration loading (`settings`) and tracing setup (`logging`).

pub mod logging;
pub mod settings;
