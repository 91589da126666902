pub mod api;
pub mod config;
pub mod doctor;
pub mod network;
pub mod runner;
pub mod scenario;

pub use api::*;
pub use config::*;
pub use doctor::*;
pub use network::*;
pub use runner::*;
