use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use protein_msa::msa::{FilterCriteria, Redundancy};
use protein_msa::pipeline::{self, PipelineOpt};
use protein_msa::search::{Database, PrecomputedSearch, QueryOnlySearch, SearchResources, SequenceSearch};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(
    name = "protein-msa",
    author,
    version,
    about = "Protein MSA generation: query FASTA -> filtered A3M (<out_dir>/<tag>.msa0.a3m)",
    arg_required_else_help = true
)]
struct Cli {
    /// Input FASTA file (single protein sequence)
    in_fasta: PathBuf,
    /// Output directory
    out_dir: PathBuf,
    /// Output tag, used as file stem and query header
    tag: String,
    /// Number of CPUs (hint for the search backend)
    #[arg(long, default_value_t = 8)]
    cpu: usize,
    /// Memory limit in GB (hint for the search backend)
    #[arg(long, default_value_t = 64)]
    mem: usize,
    /// Databases to search
    #[arg(long = "db", value_enum, default_values_t = [Database::Uniref30, Database::Bfd])]
    databases: Vec<Database>,
    /// Precomputed raw A3M hits (one per database); without it the alignment holds the query only
    #[arg(long = "raw-a3m")]
    raw_a3m: Vec<PathBuf>,
    /// Maximum pairwise identity (%) kept; more similar records are dropped
    #[arg(long = "min-identity", value_parser = parse_percent, default_value_t = 90.0)]
    min_identity: f64,
    /// Minimum coverage (%) of the query
    #[arg(long = "min-coverage", value_parser = parse_percent, default_value_t = 75.0)]
    min_coverage: f64,
    /// Fewer retained sequences than this is reported as low diversity
    #[arg(long = "min-sequences", default_value_t = 2000)]
    min_sequences: usize,
    /// Maximum number of output sequences, query included
    #[arg(long = "max-sequences", default_value_t = 1_000_000)]
    max_sequences: usize,
    /// Identity reference: the query only, or every retained record
    #[arg(long, value_enum, default_value_t = Redundancy::Query)]
    redundancy: Redundancy,
    /// Exit with an error when the alignment has low diversity
    #[arg(long = "fail-on-low-diversity")]
    fail_on_low_diversity: bool,
}

fn parse_percent(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|_| format!("'{}' is not a number", s))?;
    if (0.0..=100.0).contains(&v) {
        Ok(v)
    } else {
        Err(format!("{} is not in the range 0 - 100", v))
    }
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
                record.level(),
                record.args()
            )
        })
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let opt = PipelineOpt {
        in_fasta: cli.in_fasta,
        out_dir: cli.out_dir,
        tag: cli.tag,
        databases: cli.databases,
        resources: SearchResources { cpu: cli.cpu, mem_gb: cli.mem },
        criteria: FilterCriteria {
            min_identity: cli.min_identity,
            min_coverage: cli.min_coverage,
            min_sequences: cli.min_sequences,
            max_sequences: cli.max_sequences,
            redundancy: cli.redundancy,
        },
        fail_on_low_diversity: cli.fail_on_low_diversity,
    };
    opt.criteria.validate()?;

    let search: Box<dyn SequenceSearch> = if cli.raw_a3m.is_empty() {
        Box::new(QueryOnlySearch)
    } else {
        Box::new(PrecomputedSearch::new(cli.raw_a3m))
    };

    pipeline::run(&opt, search.as_ref())?;
    Ok(())
}
