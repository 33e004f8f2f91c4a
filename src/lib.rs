//! N-Queens solution counter over pre-split constellations
//!
//! This library counts completions of partial N-Queens boards ("constellations") with a
//! bit-parallel backtracking engine, distributing the constellations over cooperating lanes
//! either statically or through a shared job pool.

pub mod board;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod search;
pub mod utils;

pub use board::{Constellation, ForbiddenTable, Mask, Workload};
pub use config::Settings;
pub use dispatch::{Launch, LaunchReport, ResultBuffer};
pub use error::LaunchError;

use anyhow::Result;
use config::MaskWidth;

/// Enumerate every constellation of the configured board and count all of them
pub fn count_board(settings: &Settings) -> Result<LaunchReport> {
    match settings.board.mask_width.resolve(settings.board.n) {
        MaskWidth::Bits32 => count_board_with::<u32>(settings),
        _ => count_board_with::<u64>(settings),
    }
}

fn count_board_with<M: Mask>(settings: &Settings) -> Result<LaunchReport> {
    let constellations = board_constellations::<M>(settings)?;
    Ok(Launch::from_settings(settings).run(&constellations, None)?)
}

/// The constellations of the configured board, padded into batches when groups share tables
pub fn board_constellations<M: Mask>(settings: &Settings) -> Result<Vec<Constellation<M>>> {
    let launch = Launch::from_settings(settings);
    launch.validate::<M>()?;

    let constellations = board::enumerate::<M>(settings.board.n, settings.input.preset_rows)?;
    if launch.table_sharing == dispatch::TableSharing::GroupLeader {
        Ok(board::pad_to_workgroups(constellations, launch.workgroup_size))
    } else {
        Ok(constellations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_board() {
        let mut settings = Settings::default();
        for (n, expected) in [(6, 4), (8, 92), (9, 352)] {
            settings.board.n = n;
            assert_eq!(count_board(&settings).unwrap().total(), expected);
        }

        settings.board.mask_width = MaskWidth::Bits64;
        settings.input.preset_rows = 0;
        assert_eq!(count_board(&settings).unwrap().total(), 352);
    }
}
