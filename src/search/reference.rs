//! Plain recursive solution counter for whole boards

/// Count every solution of the `n`-board
pub fn count_solutions(n: u32) -> u64 {
    assert!((1..=64).contains(&n), "board size {n} outside 1..=64");
    let board = if n == 64 { u64::MAX } else { (1u64 << n) - 1 };
    backtrack(n, board, 0, 0, 0, 0)
}

fn backtrack(n: u32, board: u64, row: u32, ld: u64, rd: u64, col: u64) -> u64 {
    if row == n {
        return 1;
    }
    let mut free = !(ld | rd | col) & board;
    let mut solutions = 0;
    while free != 0 {
        let bit = free & free.wrapping_neg();
        free ^= bit;
        solutions += backtrack(n, board, row + 1, (ld | bit) << 1, (rd | bit) >> 1, col | bit);
    }
    solutions
}
