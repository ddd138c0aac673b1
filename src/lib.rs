pub mod actor;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod metrics;
pub mod simulation;
pub mod sync;

pub use config::SimConfig;
pub use error::{SimError, SimResult};
pub use simulation::{run_simulation, Population, RunReport};
