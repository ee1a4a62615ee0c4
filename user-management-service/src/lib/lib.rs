pub mod config;
pub mod domain;
pub mod inbound;
pub mod outbound;
pub mod telemetry;

pub use domain::auth;
pub use domain::user;
pub use outbound::repositories;
