pub mod constellation;
pub mod enumerate;
pub mod forbidden;
pub mod mask;
pub mod workload;

pub use constellation::{BorderQueens, Constellation, ConstellationRecord, Jkl, SENTINEL_START};
pub use enumerate::{enumerate, is_consistent};
pub use forbidden::{ForbiddenTable, TableSet};
pub use mask::{bits, Mask, MAX_BOARD};
pub use workload::{create_example_workloads, pad_to_workgroups, Workload};
