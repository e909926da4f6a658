use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::score::{score_against, RecordScore};
use super::{Alignment, SeqRecord};
use crate::error::{MsaError, MsaResult};

/// Reference set for the identity (redundancy) test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Redundancy {
    /// Identity against the query only.
    Query,
    /// Identity against the query and every record already retained.
    Pairwise,
}

/// 过滤参数，单次调用内不可变。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Maximum allowed identity in percent; records at or above it are dropped.
    pub min_identity: f64,
    /// Minimum required coverage of the query in percent.
    pub min_coverage: f64,
    /// Retained records (query included) below this count flag low diversity.
    pub min_sequences: usize,
    /// Upper bound on output records, query included.
    pub max_sequences: usize,
    pub redundancy: Redundancy,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            min_identity: 90.0,
            min_coverage: 75.0,
            min_sequences: 2000,
            max_sequences: 1_000_000,
            redundancy: Redundancy::Query,
        }
    }
}

impl FilterCriteria {
    pub fn validate(&self) -> MsaResult<()> {
        for (name, v) in [("min_identity", self.min_identity), ("min_coverage", self.min_coverage)] {
            if !(0.0..=100.0).contains(&v) {
                return Err(MsaError::InvalidCriteria(format!("{} = {} is outside 0-100", name, v)));
            }
        }
        if self.max_sequences == 0 {
            return Err(MsaError::InvalidCriteria("max_sequences must be at least 1".to_string()));
        }
        if self.min_sequences > self.max_sequences {
            return Err(MsaError::InvalidCriteria(format!(
                "min_sequences ({}) exceeds max_sequences ({})",
                self.min_sequences, self.max_sequences
            )));
        }
        Ok(())
    }

    fn passes_coverage(&self, s: &RecordScore) -> bool {
        s.aligned > 0 && s.coverage() >= self.min_coverage
    }

    fn is_redundant(&self, s: &RecordScore) -> bool {
        s.identity() >= self.min_identity
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Diversity {
    Sufficient,
    /// Fewer records than `min_sequences` survived; the alignment is still usable.
    LowDiversity { retained: usize, required: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterReport {
    /// Non-query records in the input.
    pub homologs: usize,
    pub dropped_identity: usize,
    pub dropped_coverage: usize,
    /// Records that passed both thresholds but exceeded `max_sequences`.
    pub truncated: usize,
    /// Output records, query included.
    pub retained: usize,
    pub diversity: Diversity,
}

#[derive(Debug, Clone)]
pub struct FilteredAlignment {
    pub alignment: Alignment,
    pub report: FilterReport,
}

impl FilteredAlignment {
    pub fn is_low_diversity(&self) -> bool {
        matches!(self.report.diversity, Diversity::LowDiversity { .. })
    }
}

/// 过滤比对：去除与查询（或已保留序列）一致性过高的冗余序列，以及覆盖度不足的片段。
///
/// The query is always retained first; retained homologs keep input order.
/// The input alignment is not modified.
pub fn filter(alignment: &Alignment, criteria: &FilterCriteria) -> MsaResult<FilteredAlignment> {
    criteria.validate()?;
    alignment.validate()?;

    let records = &alignment.records;
    let query_cols = records[0].match_states();
    let homologs = &records[1..];

    // 每条记录对查询的得分互不依赖，可并行计算
    let cols: Vec<Vec<u8>> = homologs.par_iter().map(SeqRecord::match_states).collect();
    let scores: Vec<RecordScore> = cols.par_iter().map(|c| score_against(c, &query_cols)).collect();

    let mut dropped_identity = 0usize;
    let mut dropped_coverage = 0usize;
    let mut kept: Vec<usize> = Vec::new();

    for (i, s) in scores.iter().enumerate() {
        if !criteria.passes_coverage(s) {
            dropped_coverage += 1;
            continue;
        }
        if criteria.is_redundant(s) {
            dropped_identity += 1;
            continue;
        }
        if criteria.redundancy == Redundancy::Pairwise {
            let dup = kept
                .iter()
                .find(|&&k| criteria.is_redundant(&score_against(&cols[i], &cols[k])));
            if let Some(&k) = dup {
                debug!("'{}' redundant with retained '{}'", homologs[i].id, homologs[k].id);
                dropped_identity += 1;
                continue;
            }
        }
        kept.push(i);
    }

    let limit = criteria.max_sequences - 1;
    let truncated = kept.len().saturating_sub(limit);
    kept.truncate(limit);

    let mut out = Vec::with_capacity(kept.len() + 1);
    out.push(records[0].clone());
    out.extend(kept.iter().map(|&i| homologs[i].clone()));

    let retained = out.len();
    let diversity = if retained < criteria.min_sequences {
        Diversity::LowDiversity { retained, required: criteria.min_sequences }
    } else {
        Diversity::Sufficient
    };

    info!(
        "filter: {} homologs -> {} records (identity -{}, coverage -{}, truncated -{})",
        homologs.len(),
        retained,
        dropped_identity,
        dropped_coverage,
        truncated
    );
    if let Diversity::LowDiversity { retained, required } = diversity {
        warn!("low diversity: {} records retained, {} required", retained, required);
    }

    Ok(FilteredAlignment {
        alignment: Alignment {
            comments: alignment.comments.clone(),
            records: out,
            line_width: alignment.line_width,
        },
        report: FilterReport {
            homologs: homologs.len(),
            dropped_identity,
            dropped_coverage,
            truncated,
            retained,
            diversity,
        },
    })
}
