//! MSA stage driver: query FASTA → search → staged raw A3M → filtered A3M.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::MsaResult;
use crate::io::{a3m, fasta};
use crate::msa::{self, FilterCriteria, FilterReport, FilteredAlignment};
use crate::search::{Database, SearchResources, SequenceSearch};

/// 流水线参数，由命令行参数构建。
#[derive(Debug, Clone)]
pub struct PipelineOpt {
    pub in_fasta: PathBuf,
    pub out_dir: PathBuf,
    pub tag: String,
    pub databases: Vec<Database>,
    pub resources: SearchResources,
    pub criteria: FilterCriteria,
    pub fail_on_low_diversity: bool,
}

impl PipelineOpt {
    pub fn output_a3m(&self) -> PathBuf {
        self.out_dir.join(format!("{}.msa0.a3m", self.tag))
    }

    pub fn report_path(&self) -> PathBuf {
        self.out_dir.join(format!("{}.msa0.json", self.tag))
    }

    /// Raw search output, kept for inspection next to the final alignment.
    pub fn raw_a3m(&self) -> PathBuf {
        self.out_dir.join("colabfold").join(format!("{}.a3m", self.tag))
    }
}

/// Run metadata written next to the alignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub input_fasta: String,
    pub tag: String,
    pub query_length: usize,
    pub search_backend: String,
    pub databases: Vec<Database>,
    pub resources: SearchResources,
    pub criteria: FilterCriteria,
    pub filter: FilterReport,
    pub output: String,
    pub command_line: String,
    pub timestamp: String,
}

/// Reads `src`, filters it and writes the result to `dst`.
///
/// `src` and `dst` may be the same file. Nothing is written if reading or
/// filtering fails.
pub fn filter_file<P: AsRef<Path>, Q: AsRef<Path>>(
    src: P,
    dst: Q,
    criteria: &FilterCriteria,
) -> MsaResult<FilteredAlignment> {
    let aln = a3m::read(src)?;
    let filtered = msa::filter(&aln, criteria)?;
    a3m::write_atomic(&filtered.alignment, dst)?;
    Ok(filtered)
}

pub fn run(opt: &PipelineOpt, search: &dyn SequenceSearch) -> Result<RunReport> {
    std::fs::create_dir_all(opt.out_dir.join("colabfold"))
        .with_context(|| format!("cannot create output directory '{}'", opt.out_dir.display()))?;

    let mut query = fasta::load(&opt.in_fasta)?;
    info!("Processing sequence: {} (length: {})", opt.tag, query.residues.len());
    // output header follows the run tag
    query.id = opt.tag.clone();
    query.desc = None;

    info!("Running {} MSA search for {}", search.name(), opt.tag);
    let raw = search.search(&query, &opt.databases, &opt.resources)?;
    let raw_path = opt.raw_a3m();
    a3m::write_atomic(&raw, &raw_path)?;
    info!("raw alignment: {} ({} records)", raw_path.display(), raw.len());

    let out_path = opt.output_a3m();
    let filtered = filter_file(&raw_path, &out_path, &opt.criteria)
        .with_context(|| format!("filtering '{}'", raw_path.display()))?;
    let written = a3m::count_sequences(&out_path)?;
    info!("MSA generation completed: {} ({} sequences)", out_path.display(), written);

    let report = RunReport {
        input_fasta: opt.in_fasta.display().to_string(),
        tag: opt.tag.clone(),
        query_length: query.residues.len(),
        search_backend: search.name().to_string(),
        databases: opt.databases.clone(),
        resources: opt.resources,
        criteria: opt.criteria,
        filter: filtered.report.clone(),
        output: out_path.display().to_string(),
        command_line: std::env::args().collect::<Vec<_>>().join(" "),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };
    let report_path = opt.report_path();
    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(&report_path, json + "\n")
        .with_context(|| format!("cannot write report '{}'", report_path.display()))?;

    if filtered.is_low_diversity() {
        if opt.fail_on_low_diversity {
            anyhow::bail!(
                "low diversity: {} sequences retained in '{}', {} required",
                filtered.report.retained,
                out_path.display(),
                opt.criteria.min_sequences
            );
        }
        warn!("continuing with a low-diversity alignment: {}", out_path.display());
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msa::Diversity;
    use crate::search::{PrecomputedSearch, QueryOnlySearch};

    fn opt(dir: &Path, in_fasta: PathBuf) -> PipelineOpt {
        PipelineOpt {
            in_fasta,
            out_dir: dir.join("out"),
            tag: "test_protein".to_string(),
            databases: vec![Database::Uniref30, Database::Bfd],
            resources: SearchResources { cpu: 1, mem_gb: 8 },
            criteria: FilterCriteria { min_sequences: 1, ..FilterCriteria::default() },
            fail_on_low_diversity: false,
        }
    }

    #[test]
    fn query_only_run_writes_tagged_alignment() {
        let dir = tempfile::tempdir().unwrap();
        let fa = dir.path().join("in.fa");
        std::fs::write(&fa, ">input desc\nMKTVRQ\nERLK\n").unwrap();
        let o = opt(dir.path(), fa);

        let report = run(&o, &QueryOnlySearch).unwrap();
        assert_eq!(report.filter.retained, 1);
        assert_eq!(report.query_length, 10);
        assert_eq!(std::fs::read_to_string(o.output_a3m()).unwrap(), ">test_protein\nMKTVRQERLK\n");
        assert!(o.raw_a3m().exists());

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(o.report_path()).unwrap()).unwrap();
        assert_eq!(json["tag"], "test_protein");
        assert_eq!(json["filter"]["diversity"]["status"], "sufficient");
    }

    #[test]
    fn precomputed_hits_are_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let fa = dir.path().join("in.fa");
        std::fs::write(&fa, ">input\nMKTVRQERLK\n").unwrap();
        let hits = dir.path().join("hits.a3m");
        std::fs::write(
            &hits,
            ">101\nMKTVRQERLK\n>dup\nMKTVRQERLK\n>frag\nMRSV------\n>keep\nMRSVKQDRIK\n",
        )
        .unwrap();
        let o = opt(dir.path(), fa);

        let report = run(&o, &PrecomputedSearch::new(vec![hits])).unwrap();
        assert_eq!(report.filter.homologs, 3);
        assert_eq!(report.filter.dropped_identity, 1);
        assert_eq!(report.filter.dropped_coverage, 1);
        assert_eq!(
            std::fs::read_to_string(o.output_a3m()).unwrap(),
            ">test_protein\nMKTVRQERLK\n>keep\nMRSVKQDRIK\n"
        );
    }

    #[test]
    fn low_diversity_is_fatal_only_on_request() {
        let dir = tempfile::tempdir().unwrap();
        let fa = dir.path().join("in.fa");
        std::fs::write(&fa, ">input\nMKTV\n").unwrap();
        let mut o = opt(dir.path(), fa);
        o.criteria.min_sequences = 2;

        let report = run(&o, &QueryOnlySearch).unwrap();
        assert_eq!(report.filter.diversity, Diversity::LowDiversity { retained: 1, required: 2 });

        o.fail_on_low_diversity = true;
        let err = run(&o, &QueryOnlySearch).unwrap_err();
        assert!(err.to_string().contains("low diversity"));
        // the alignment is still on disk
        assert!(o.output_a3m().exists());
    }

    #[test]
    fn missing_input_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let o = opt(dir.path(), dir.path().join("non_existent_file.fa"));
        let err = run(&o, &QueryOnlySearch).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<crate::error::MsaError>(),
            Some(crate::error::MsaError::NotFound { .. })
        ));
        assert!(!o.output_a3m().exists());
    }

    #[test]
    fn filter_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("msa.a3m");
        std::fs::write(&path, ">q\nMKT-VRQ\n>h1\nMKTAVRQ\n").unwrap();
        let criteria = FilterCriteria { min_sequences: 1, min_coverage: 0.0, ..FilterCriteria::default() };

        let f = filter_file(&path, &path, &criteria).unwrap();
        assert_eq!(f.report.retained, 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), ">q\nMKT-VRQ\n");
    }

    #[test]
    fn filter_file_error_leaves_destination_alone() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("bad.a3m");
        let dst = dir.path().join("out.a3m");
        std::fs::write(&src, ">q\nMKTV\n>h1\nMKT\n").unwrap();
        std::fs::write(&dst, "previous\n").unwrap();

        let err = filter_file(&src, &dst, &FilterCriteria::default()).unwrap_err();
        assert!(matches!(err, crate::error::MsaError::MalformedAlignment { .. }));
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "previous\n");
    }
}
