pub mod engine;
pub mod reference;

pub use engine::{Lane, Observer, SearchStats, SearchVariant, Transition};
pub use reference::count_solutions;
