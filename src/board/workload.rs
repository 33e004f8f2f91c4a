//! Workload files and batch padding

use super::constellation::{Constellation, ConstellationRecord};
use super::enumerate::enumerate;
use super::mask::Mask;
use crate::error::LaunchError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A set of constellations for one board, with the counts found so far
///
/// `solutions` is either empty (nothing solved yet) or holds one entry per record, `None`
/// marking a record that still has to be searched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workload {
    pub n: u32,
    pub constellations: Vec<ConstellationRecord>,
    #[serde(default)]
    pub solutions: Vec<Option<u64>>,
}

impl Workload {
    pub fn new<M: Mask>(n: u32, constellations: &[Constellation<M>]) -> Result<Self, LaunchError> {
        let records = constellations
            .iter()
            .map(|c| c.to_record(n))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { n, constellations: records, solutions: Vec::new() })
    }

    /// Unpack the records for a launch
    pub fn unpack<M: Mask>(&self) -> Vec<Constellation<M>> {
        self.constellations.iter().map(Constellation::from_record).collect()
    }

    /// Previous results, if any were recorded
    pub fn previous(&self) -> Option<&[Option<u64>]> {
        if self.solutions.is_empty() {
            None
        } else {
            Some(&self.solutions)
        }
    }

    pub fn record(&mut self, counts: &[u64]) {
        self.solutions = counts.iter().copied().map(Some).collect();
    }

    /// Fraction of real (non-sentinel) records with a recorded count
    pub fn progress(&self) -> f64 {
        let real = self.constellations.iter().filter(|r| !r.is_sentinel()).count();
        if real == 0 {
            return 0.0;
        }
        let solved = self
            .constellations
            .iter()
            .zip(&self.solutions)
            .filter(|(r, s)| !r.is_sentinel() && s.is_some())
            .count();
        solved as f64 / real as f64
    }

    /// Plain sum of every recorded count
    pub fn total(&self) -> u64 {
        self.solutions.iter().flatten().sum()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read workload file: {}", path.display()))?;
        let workload: Workload = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse workload file: {}", path.display()))?;

        if !workload.solutions.is_empty() && workload.solutions.len() != workload.constellations.len() {
            anyhow::bail!(
                "Workload {} has {} results for {} constellations",
                path.display(),
                workload.solutions.len(),
                workload.constellations.len()
            );
        }
        Ok(workload)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self).context("Failed to serialize workload")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write workload file: {}", path.display()))?;
        Ok(())
    }
}

/// Group constellations by their `(j, k, l)` triple and pad every group with sentinels to a
/// multiple of `workgroup_size`, so that each batch of the job pool shares one table
pub fn pad_to_workgroups<M: Mask>(
    mut constellations: Vec<Constellation<M>>,
    workgroup_size: usize,
) -> Vec<Constellation<M>> {
    constellations.retain(|c| !c.is_sentinel());
    constellations.sort_by_key(|c| c.jkl());

    let mut padded = Vec::with_capacity(constellations.len() + workgroup_size);
    let mut current = constellations.first().and_then(|c| c.jkl());
    for c in constellations {
        if c.jkl() != current {
            pad(&mut padded, workgroup_size);
            current = c.jkl();
        }
        padded.push(c);
    }
    pad(&mut padded, workgroup_size);
    padded
}

fn pad<M: Mask>(constellations: &mut Vec<Constellation<M>>, workgroup_size: usize) {
    while constellations.len() % workgroup_size != 0 {
        constellations.push(Constellation::sentinel());
    }
}

/// Write small example workloads into a directory
pub fn create_example_workloads<P: AsRef<Path>>(output_dir: P) -> Result<()> {
    let dir = output_dir.as_ref();
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    for (n, preset_rows) in [(6, 1), (8, 2), (10, 3)] {
        let constellations = enumerate::<u32>(n, preset_rows)?;
        Workload::new(n, &constellations)?
            .save(dir.join(format!("board_{n}.json")))
            .with_context(|| format!("Failed to write example workload for n = {n}"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BorderQueens;
    use tempfile::tempdir;

    #[test]
    fn test_padding_groups_by_triple() {
        let a = BorderQueens::new(1, 2, 3, 4);
        let b = BorderQueens::new(2, 5, 1, 6);
        let constellations = vec![
            Constellation::<u32>::new(0, 0, 0, 1, b),
            Constellation::<u32>::new(0, 0, 0, 1, a),
            Constellation::<u32>::sentinel(),
            Constellation::<u32>::new(0, 0, 1, 1, b),
            Constellation::<u32>::new(0, 0, 2, 1, b),
        ];
        let padded = pad_to_workgroups(constellations, 2);

        assert_eq!(padded.len(), 6);
        for batch in padded.chunks(2) {
            let keys: Vec<_> = batch.iter().filter(|c| !c.is_sentinel()).map(|c| c.jkl()).collect();
            assert!(keys.windows(2).all(|w| w[0] == w[1]));
        }
        assert_eq!(padded.iter().filter(|c| c.is_sentinel()).count(), 2);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("nested/workload.json");

        let constellations = enumerate::<u32>(6, 1).unwrap();
        let mut workload = Workload::new(6, &constellations).unwrap();
        workload.save(&path).unwrap();

        let loaded = Workload::load(&path).unwrap();
        assert_eq!(loaded, workload);
        assert!(loaded.previous().is_none());
        assert_eq!(loaded.unpack::<u32>(), constellations);

        workload.record(&vec![1; constellations.len()]);
        assert_eq!(workload.total(), constellations.len() as u64);
        assert_eq!(workload.progress(), 1.0);
    }

    #[test]
    fn test_rejects_mismatched_results() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("broken.json");
        std::fs::write(
            &path,
            r#"{"n": 6, "constellations": [{"ld": 0, "rd": 0, "col": 0, "start_ijkl": 1048576}], "solutions": [1, 2]}"#,
        )
        .unwrap();
        assert!(Workload::load(&path).is_err());
    }

    #[test]
    fn test_create_example_workloads() {
        let temp_dir = tempdir().unwrap();
        create_example_workloads(temp_dir.path()).unwrap();

        let workload = Workload::load(temp_dir.path().join("board_8.json")).unwrap();
        assert_eq!(workload.n, 8);
        assert!(!workload.constellations.is_empty());
    }
}
