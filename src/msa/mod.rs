//! 多序列比对（MSA）模型与过滤。
//!
//! - [`SeqRecord`] / [`Alignment`]：A3M 记录与比对，第一条为查询序列
//! - [`score`]：相对参考序列的一致性（identity）与覆盖度（coverage）
//! - [`filter`]：按最大一致性去冗余、按最小覆盖度去片段、按序列数截断

use std::collections::HashSet;

use log::debug;

use crate::error::{MsaError, MsaResult};
use crate::util::protein;

pub mod filter;
pub mod score;

pub use filter::{filter, Diversity, FilterCriteria, FilterReport, FilteredAlignment, Redundancy};
pub use score::{score_against, RecordScore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeqRecord {
    pub id: String,
    pub desc: Option<String>,
    /// Aligned row: uppercase/`-` match states, lowercase/`.` insertions.
    pub residues: Vec<u8>,
}

impl SeqRecord {
    pub fn new<S: Into<String>>(id: S, residues: &[u8]) -> Self {
        Self { id: id.into(), desc: None, residues: residues.to_vec() }
    }

    /// Header line content without the leading `>`.
    pub fn header(&self) -> String {
        match &self.desc {
            Some(d) => format!("{} {}", self.id, d),
            None => self.id.clone(),
        }
    }

    pub fn match_states(&self) -> Vec<u8> {
        protein::match_states(&self.residues)
    }

    pub fn match_len(&self) -> usize {
        protein::match_state_len(&self.residues)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Alignment {
    /// `#` lines preceding the first record.
    pub comments: Vec<String>,
    pub records: Vec<SeqRecord>,
    /// Residue line width of the source file; `None` means one line per record.
    pub line_width: Option<usize>,
}

impl Alignment {
    /// Single-sequence alignment holding only the query.
    pub fn from_query(query: SeqRecord) -> Self {
        Self { comments: Vec::new(), records: vec![query], line_width: None }
    }

    pub fn query(&self) -> Option<&SeqRecord> {
        self.records.first()
    }

    pub fn homologs(&self) -> &[SeqRecord] {
        self.records.get(1..).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 校验查询序列存在且每条同源序列的匹配列数与查询一致。
    pub fn validate(&self) -> MsaResult<()> {
        let query = self
            .query()
            .ok_or_else(|| MsaError::empty("alignment has no query record"))?;
        let expected = query.match_len();
        if !query.match_states().iter().any(|&b| b != protein::GAP) {
            return Err(MsaError::empty(format!(
                "query record '{}' has no match-state residues",
                query.id
            )));
        }
        for rec in self.homologs() {
            let found = rec.match_len();
            if found != expected {
                return Err(MsaError::MalformedAlignment {
                    id: rec.id.clone(),
                    query: query.id.clone(),
                    expected,
                    found,
                });
            }
        }
        Ok(())
    }

    /// Appends the homologs of `other` (e.g. hits from a second database).
    ///
    /// Both alignments must share the same query match states. Homologs whose
    /// identifier or row is already present are skipped. Returns the number
    /// of records added.
    pub fn merge(&mut self, other: Alignment) -> MsaResult<usize> {
        let Some(query) = self.query() else {
            *self = other;
            return Ok(self.homologs().len());
        };
        let Some(other_query) = other.query() else {
            return Ok(0);
        };
        if query.match_states() != other_query.match_states() {
            return Err(MsaError::MalformedAlignment {
                id: other_query.id.clone(),
                query: query.id.clone(),
                expected: query.match_len(),
                found: other_query.match_len(),
            });
        }

        let mut ids: HashSet<String> = self.records.iter().map(|r| r.id.clone()).collect();
        // query copies are homologs like any other; the filter decides on them
        let mut rows: HashSet<Vec<u8>> = self.homologs().iter().map(|r| r.residues.clone()).collect();
        let mut added = 0usize;
        for rec in other.records.into_iter().skip(1) {
            if ids.contains(&rec.id) || rows.contains(&rec.residues) {
                debug!("merge: skipping duplicate record '{}'", rec.id);
                continue;
            }
            ids.insert(rec.id.clone());
            rows.insert(rec.residues.clone());
            self.records.push(rec);
            added += 1;
        }
        if self.line_width != other.line_width {
            self.line_width = None;
        }
        Ok(added)
    }
}
