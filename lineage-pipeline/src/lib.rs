pub mod subsystems;

pub use subsystems::executor::{
    create_executor, BatchExecutor, ParallelExecutor, SequentialExecutor,
};
pub use subsystems::orchestrator::{run, Pipeline, RunReport};
pub use subsystems::source::{LogSource, SqliteLogSource};
pub use subsystems::target::{MappingSink, SqliteMappingSink};
