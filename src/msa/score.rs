use crate::util::protein::GAP;

/// Identity and coverage of one aligned row against a reference row, both
/// given as match-state projections of equal length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordScore {
    /// Columns where neither row has a gap.
    pub aligned: usize,
    /// Aligned columns with identical residues.
    pub matches: usize,
    /// Non-gap columns of the reference.
    pub reference_len: usize,
}

impl RecordScore {
    /// matches / aligned，百分比；无对齐残基时为 0。
    pub fn identity(&self) -> f64 {
        if self.aligned == 0 {
            0.0
        } else {
            100.0 * self.matches as f64 / self.aligned as f64
        }
    }

    /// aligned / 参考序列非 gap 列数，百分比。
    pub fn coverage(&self) -> f64 {
        if self.reference_len == 0 {
            0.0
        } else {
            100.0 * self.aligned as f64 / self.reference_len as f64
        }
    }
}

/// Scores `row` against `reference` column by column.
///
/// Both slices are match-state projections; extra columns on either side are
/// ignored, callers validate lengths beforehand.
pub fn score_against(row: &[u8], reference: &[u8]) -> RecordScore {
    let mut aligned = 0usize;
    let mut matches = 0usize;
    for (&a, &r) in row.iter().zip(reference) {
        if a == GAP || r == GAP {
            continue;
        }
        aligned += 1;
        if a == r {
            matches += 1;
        }
    }
    let reference_len = reference.iter().filter(|&&b| b != GAP).count();
    RecordScore { aligned, matches, reference_len }
}
