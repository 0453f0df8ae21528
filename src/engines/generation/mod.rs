pub mod crossover;
pub mod duplicates;
pub mod individual;
pub mod mutation;
pub mod operators;
pub mod pareto;
pub mod progress;
pub mod sampler;
pub mod search_engine;
pub mod state;

pub use crossover::{breed, crossover, merge_parents, Donors};
pub use duplicates::{eliminate_duplicates, is_duplicate};
pub use individual::Individual;
pub use mutation::{mutate, MutationLocus};
pub use operators::OperatorReport;
pub use pareto::{dominates, MultiObjectiveIndividual, OptimizationDirection};
pub use progress::{
    ChannelProgressCallback, ConsoleProgressCallback, GenerationSummary, ProgressCallback,
    ProgressMessage, SilentProgress,
};
pub use sampler::{sample, sample_one};
pub use search_engine::{CancellationToken, SearchEngine, SearchOutcome, SearchStats};
pub use state::{LockedFilters, SearchState};
