//! Write-once per-constellation result cells

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Marker of a cell that has not been written
pub const UNSOLVED: u64 = u64::MAX;

/// One 64-bit count per unit of work, each written exactly once
///
/// Lanes write their own pre-assigned cell without coordination. A second write to the same
/// cell means two lanes processed the same constellation and is treated as a bug.
#[derive(Debug)]
pub struct ResultBuffer {
    cells: Vec<AtomicU64>,
    solved: AtomicUsize,
}

impl ResultBuffer {
    pub fn new(len: usize) -> Self {
        Self {
            cells: (0..len).map(|_| AtomicU64::new(UNSOLVED)).collect(),
            solved: AtomicUsize::new(0),
        }
    }

    /// Buffer pre-filled with the counts of an earlier, interrupted launch
    pub fn resume(previous: &[Option<u64>]) -> Self {
        let solved = previous.iter().filter(|count| count.is_some()).count();
        Self {
            cells: previous
                .iter()
                .map(|count| AtomicU64::new(count.unwrap_or(UNSOLVED)))
                .collect(),
            solved: AtomicUsize::new(solved),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn is_solved(&self, index: usize) -> bool {
        self.cells[index].load(Ordering::Acquire) != UNSOLVED
    }

    /// Number of cells written so far
    pub fn solved(&self) -> usize {
        self.solved.load(Ordering::Relaxed)
    }

    pub fn is_complete(&self) -> bool {
        self.solved() == self.len()
    }

    /// Store the count of cell `index`
    ///
    /// # Panics
    ///
    /// If the cell was already written or `count` collides with the unsolved marker.
    pub fn write(&self, index: usize, count: u64) {
        assert_ne!(count, UNSOLVED, "count of constellation {index} overflows the result cell");
        if let Err(previous) =
            self.cells[index].compare_exchange(UNSOLVED, count, Ordering::AcqRel, Ordering::Acquire)
        {
            panic!("result cell {index} written twice (held {previous}, got {count})");
        }
        self.solved.fetch_add(1, Ordering::Relaxed);
    }

    /// Current contents, `None` for cells still unwritten
    pub fn snapshot(&self) -> Vec<Option<u64>> {
        self.cells
            .iter()
            .map(|cell| match cell.load(Ordering::Acquire) {
                UNSOLVED => None,
                count => Some(count),
            })
            .collect()
    }

    /// Consume a completely written buffer
    ///
    /// # Panics
    ///
    /// If any cell was never written.
    pub fn into_counts(self) -> Vec<u64> {
        self.cells
            .into_iter()
            .enumerate()
            .map(|(index, cell)| {
                let count = cell.into_inner();
                assert_ne!(count, UNSOLVED, "result cell {index} was never written");
                count
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_once() {
        let results = ResultBuffer::new(3);
        results.write(1, 92);
        results.write(0, 0);

        assert!(results.is_solved(1));
        assert!(!results.is_solved(2));
        assert_eq!(results.solved(), 2);
        assert_eq!(results.snapshot(), vec![Some(0), Some(92), None]);
    }

    #[test]
    #[should_panic(expected = "written twice")]
    fn test_double_write_panics() {
        let results = ResultBuffer::new(2);
        results.write(1, 4);
        results.write(1, 4);
    }

    #[test]
    #[should_panic(expected = "never written")]
    fn test_incomplete_buffer_panics() {
        ResultBuffer::new(2).into_counts();
    }

    #[test]
    fn test_resume_counts_earlier_results() {
        let results = ResultBuffer::resume(&[Some(3), None, Some(0)]);
        assert_eq!(results.solved(), 2);
        assert!(!results.is_complete());

        results.write(1, 7);
        assert!(results.is_complete());
        assert_eq!(results.into_counts(), vec![3, 7, 0]);
    }

    #[test]
    fn test_concurrent_writes_to_distinct_cells() {
        let results = ResultBuffer::new(64);
        std::thread::scope(|scope| {
            for t in 0..4 {
                let results = &results;
                scope.spawn(move || {
                    for index in (t..64).step_by(4) {
                        results.write(index, index as u64);
                    }
                });
            }
        });
        assert_eq!(results.into_counts(), (0..64).collect::<Vec<u64>>());
    }
}
