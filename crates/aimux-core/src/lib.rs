pub mod bootstrap;
pub mod orchestrator;

pub use bootstrap::{Bootstrap, bootstrap};
pub use orchestrator::{Clock, Orchestrator, system_clock};
