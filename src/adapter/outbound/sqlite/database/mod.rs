//! Diesel plumbing for the market store: pool setup and migrations, the
//! generated table definitions, and row structs.

pub mod connection;
pub mod model;
pub mod schema;
