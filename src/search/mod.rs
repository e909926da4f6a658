//! 序列搜索协作者（外部子系统）。
//!
//! The homology search itself runs outside this crate; [`SequenceSearch`] is
//! the seam through which a raw, unfiltered alignment enters the pipeline.

use std::path::PathBuf;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{MsaError, MsaResult};
use crate::io::a3m;
use crate::msa::{Alignment, SeqRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Database {
    Uniref30,
    Bfd,
    #[value(name = "colabfold_envdb")]
    ColabfoldEnvdb,
}

impl std::fmt::Display for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Database::Uniref30 => write!(f, "uniref30"),
            Database::Bfd => write!(f, "bfd"),
            Database::ColabfoldEnvdb => write!(f, "colabfold_envdb"),
        }
    }
}

/// Advisory resource hints forwarded to the search backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResources {
    pub cpu: usize,
    pub mem_gb: usize,
}

impl Default for SearchResources {
    fn default() -> Self {
        Self { cpu: 8, mem_gb: 64 }
    }
}

pub trait SequenceSearch {
    fn name(&self) -> &'static str;

    /// Returns the raw alignment for `query`; the query must be its first record.
    fn search(
        &self,
        query: &SeqRecord,
        databases: &[Database],
        resources: &SearchResources,
    ) -> MsaResult<Alignment>;
}

/// Stand-in backend: the alignment holds the query alone.
pub struct QueryOnlySearch;

impl SequenceSearch for QueryOnlySearch {
    fn name(&self) -> &'static str {
        "query-only"
    }

    fn search(
        &self,
        query: &SeqRecord,
        databases: &[Database],
        _resources: &SearchResources,
    ) -> MsaResult<Alignment> {
        if !databases.is_empty() {
            warn!(
                "no search backend configured, databases {:?} not searched; using single-sequence alignment",
                databases.iter().map(ToString::to_string).collect::<Vec<_>>()
            );
        }
        Ok(Alignment::from_query(query.clone()))
    }
}

/// Reads raw A3M hits produced elsewhere (one file per database) and merges them.
pub struct PrecomputedSearch {
    pub paths: Vec<PathBuf>,
}

impl PrecomputedSearch {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }
}

impl SequenceSearch for PrecomputedSearch {
    fn name(&self) -> &'static str {
        "precomputed"
    }

    fn search(
        &self,
        query: &SeqRecord,
        _databases: &[Database],
        _resources: &SearchResources,
    ) -> MsaResult<Alignment> {
        let mut merged = Alignment::from_query(query.clone());
        let query_cols = query.match_states();
        for path in &self.paths {
            let mut hits = a3m::read(path)?;
            let Some(first) = hits.records.first_mut() else {
                warn!("'{}' holds no records, skipped", path.display());
                continue;
            };
            if first.match_states() != query_cols {
                return Err(MsaError::format(
                    path,
                    format!("first record '{}' does not match the query sequence", first.id),
                ));
            }
            // the query header follows the run tag, not the search output
            *first = query.clone();
            if merged.comments.is_empty() {
                merged.comments = std::mem::take(&mut hits.comments);
            }
            let line_width = hits.line_width;
            let added = merged.merge(hits)?;
            if merged.len() == added + 1 {
                merged.line_width = line_width;
            }
            info!("'{}': {} homologs merged", path.display(), added);
        }
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_only_returns_single_sequence() {
        let q = SeqRecord::new("tag", b"MKTV");
        let aln = QueryOnlySearch
            .search(&q, &[Database::Uniref30, Database::Bfd], &SearchResources::default())
            .unwrap();
        assert_eq!(aln.records, vec![q]);
    }

    #[test]
    fn precomputed_merges_databases() {
        let dir = tempfile::tempdir().unwrap();
        let uniref = dir.path().join("uniref.a3m");
        let bfd = dir.path().join("bfd.a3m");
        std::fs::write(&uniref, "#4\t1\n>101\nMKTV\n>u1\nMRSV\n").unwrap();
        std::fs::write(&bfd, ">101\nMKTV\n>b1\nARSV\n>u1\nMRSV\n").unwrap();

        let q = SeqRecord::new("tag", b"MKTV");
        let search = PrecomputedSearch::new(vec![uniref, bfd]);
        let aln = search.search(&q, &[], &SearchResources::default()).unwrap();
        let ids: Vec<&str> = aln.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["tag", "u1", "b1"]);
        assert_eq!(aln.comments, vec!["#4\t1".to_string()]);
    }

    #[test]
    fn precomputed_rejects_foreign_query() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.a3m");
        std::fs::write(&path, ">x\nAAAA\n").unwrap();
        let q = SeqRecord::new("tag", b"MKTV");
        let err = PrecomputedSearch::new(vec![path])
            .search(&q, &[], &SearchResources::default())
            .unwrap_err();
        assert!(matches!(err, MsaError::FormatError { .. }));
    }

    #[test]
    fn database_names() {
        assert_eq!(Database::ColabfoldEnvdb.to_string(), "colabfold_envdb");
    }
}
