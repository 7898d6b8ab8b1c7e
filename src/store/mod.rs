pub mod counter;
pub mod links;
pub mod snapshot;
pub mod tally;

pub use counter::{format_sequential_uuid, CounterStore};
pub use links::{valid_short_path, LinkError, LinkStore};
pub use tally::TallyStore;
