pub mod bootstrap;
pub mod executor;
pub mod orchestrator;
pub mod source;
pub mod target;
