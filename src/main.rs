use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser};
use rayon::prelude::*;
use tracing::info;

use spotter_dtw::{
    AlignConfig, Kernel, Policy, SearchGrid, SearchInput, SegmentConfig, TimeSpan, search_all,
};
use spotter_io::{
    ExperimentName, FeatureFile, FeatureReader, ResultWriter, expand_feature_arg, read_time_spans,
};

#[derive(Parser)]
#[command(name = "spotter")]
#[command(about = "Query-by-example search over acoustic feature sequences with DTW")]
#[command(version)]
struct Cli {
    /// Query features: a feature file (.mfc, .fbank, .htk, .plp, .csv) or a .lst/.scp list
    #[arg(long = "f1")]
    queries: PathBuf,

    /// Document features: a feature file (.mfc, .fbank, .htk, .plp, .csv) or a .lst/.scp list
    #[arg(long = "f2")]
    documents: PathBuf,

    /// Query time span "start-end" (first query only) or a .txt file with one span per query
    #[arg(long = "t1", default_value = "")]
    query_spans: String,

    /// Document time span "start-end" (first document only) or a .txt file with one span per document
    #[arg(long = "t2", default_value = "")]
    document_spans: String,

    /// Alignment policy: 0 segmental, 1 slope-constrained, 2 free-frame, 3 fix-frame, 4 diagonal-band
    #[arg(long = "type", default_value_t = 1)]
    policy: u8,

    /// Local distance: 0 Euclidean, 1 log inner-product
    #[arg(long = "dist", default_value_t = 0)]
    kernel: u8,

    /// Print a frame-count table and every hypothesis for each pair
    #[arg(long, default_value_t = false)]
    detail: bool,

    /// Number of non-overlapping hypotheses per pair
    #[arg(long, default_value_t = 5)]
    nsnippet: usize,

    /// Longest run of consecutive vertical or horizontal steps (slope-constrained)
    #[arg(long, default_value_t = 2)]
    slope_limit: usize,

    /// Largest distance from the start diagonal (diagonal-band)
    #[arg(long, default_value_t = 10)]
    band_radius: usize,

    /// Spacing of allowed start columns (diagonal-band)
    #[arg(long, default_value_t = 1)]
    band_stride: usize,

    /// Recover a frame-level warping path for every hypothesis
    #[arg(long, default_value_t = false)]
    backtrack: bool,

    #[command(flatten)]
    segment: SegmentArgs,

    /// Experiment name; when set, results are also written to {experiment}_search.json
    #[arg(long)]
    experiment: Option<String>,

    /// Output directory for the JSON artifact
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Enable verbose (debug-level) logging
    #[arg(long)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long)]
    threads: Option<usize>,
}

/// Segment builder parameters (segmental policy).
#[derive(Args, Debug, Clone)]
struct SegmentArgs {
    /// Basic segments per frame
    #[arg(long, default_value_t = 0.5)]
    bseg_ratio: f64,

    /// Basic segments per super-segment
    #[arg(long, default_value_t = 4.0)]
    superseg_ratio: f64,

    /// Largest super-segment, in basic-segment widths
    #[arg(long, default_value_t = 3)]
    gran: usize,

    /// Largest basic segment, in frames
    #[arg(long, default_value_t = 3)]
    width: usize,
}

fn build_config(cli: &Cli) -> Result<AlignConfig> {
    let policy = Policy::from_code(cli.policy).context("invalid --type")?;
    let kernel = Kernel::from_code(cli.kernel).context("invalid --dist")?;
    let segment = SegmentConfig::new(cli.segment.bseg_ratio, cli.segment.superseg_ratio)
        .context("invalid segment ratios")?
        .with_gran(cli.segment.gran)
        .with_width(cli.segment.width);

    info!(%policy, %kernel, "alignment configured");
    Ok(AlignConfig::new(policy)
        .with_kernel(kernel)
        .with_n_hypotheses(cli.nsnippet)
        .with_backtrack(cli.backtrack)
        .with_slope_limit(cli.slope_limit)
        .with_band_radius(cli.band_radius)
        .with_band_stride(cli.band_stride)
        .with_segment(segment))
}

fn load_features(arg: &Path, role: &str) -> Result<Vec<FeatureFile>> {
    let paths = expand_feature_arg(arg).with_context(|| format!("failed to expand {role} argument {}", arg.display()))?;
    let files = paths
        .par_iter()
        .map(|path| {
            FeatureReader::new(path)
                .read()
                .with_context(|| format!("failed to read {role} features"))
        })
        .collect::<Result<Vec<_>>>()?;
    info!(role, n_files = files.len(), "features loaded");
    Ok(files)
}

fn search_inputs<'a>(files: &'a [FeatureFile], spans: &[Option<TimeSpan>]) -> Vec<SearchInput<'a>> {
    files
        .iter()
        .zip(spans)
        .map(|(f, &span)| SearchInput::new(f.sequence(), span))
        .collect()
}

fn print_summary(grid: &SearchGrid) {
    for q in 0..grid.n_queries() {
        let line: Vec<String> = grid.row(q).iter().map(|a| a.best_score().to_string()).collect();
        println!("{}", line.join(" "));
    }
}

fn print_detail(queries: &[FeatureFile], documents: &[FeatureFile], grid: &SearchGrid) {
    for (qi, di, alignment) in grid.iter() {
        let (q, d) = (&queries[qi], &documents[di]);
        println!();
        println!("+-------------------------------+--------+");
        println!("|            Filename           | frames |");
        println!("+-------------------------------+--------+");
        println!("| {:>29} | {:>6} |", q.name(), q.sequence().len());
        println!("| {:>29} | {:>6} |", d.name(), d.sequence().len());
        println!("+-------------------------------+--------+");
        for (i, h) in alignment.hypotheses.iter().enumerate() {
            let path_len = alignment
                .paths
                .as_ref()
                .and_then(|paths| paths.get(i))
                .map(|p| format!(", path length = {}", p.len()))
                .unwrap_or_default();
            println!(
                "hypothesized region[{i}]: score = {}, time span = ({}, {}){path_len}",
                h.score(),
                h.start(),
                h.end()
            );
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    let config = build_config(&cli)?;
    let experiment = cli
        .experiment
        .clone()
        .map(ExperimentName::new)
        .transpose()
        .context("invalid --experiment")?;

    let queries = load_features(&cli.queries, "query")?;
    let documents = load_features(&cli.documents, "document")?;
    let query_spans = read_time_spans(&cli.query_spans, queries.len()).context("failed to read query time spans")?;
    let document_spans =
        read_time_spans(&cli.document_spans, documents.len()).context("failed to read document time spans")?;

    let grid = search_all(
        &search_inputs(&queries, &query_spans),
        &search_inputs(&documents, &document_spans),
        &config,
    )
    .context("search failed")?;

    if cli.detail {
        print_detail(&queries, &documents, &grid);
    } else {
        print_summary(&grid);
    }

    if let Some(experiment) = experiment {
        let writer = ResultWriter::new(&cli.output_dir, experiment)?;
        writer
            .write_search(&queries, &documents, &config, &grid)
            .context("failed to write search result")?;
    }

    Ok(())
}
