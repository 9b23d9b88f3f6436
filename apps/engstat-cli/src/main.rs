//! engstat CLI - Statistics over engine telemetry files
//!
//! Reads a CSV (or TSV) file of sensor readings and reports:
//! - Per-column moments (`stats`)
//! - The Pearson correlation matrix (`corr`)
//! - Statistics per engine condition (`condition`)
//! - Histograms (`hist`)
//! - All of the above from a single pass (`all`)

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use engstat_core::{report, Analysis, AnalysisConfig};
use engstat_io::{BoxedSource, CsvRowSource};
use engstat_stats::BinMethod;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod settings;

use settings::Overrides;

/// engstat command line
#[derive(Parser)]
#[command(name = "engstat")]
#[command(about = "Streaming statistics for engine telemetry", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (TOML or JSON)
    #[arg(short, long, env = "ENGSTAT_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Mean, variance, skewness and kurtosis of every column
    #[command(alias = "stat")]
    Stats(InputArgs),

    /// Pearson correlation matrix
    Corr {
        #[command(flatten)]
        input: InputArgs,

        /// Leave a column out of the matrix (repeatable)
        #[arg(long = "exclude", value_name = "COL")]
        exclude: Vec<String>,
    },

    /// Statistics per engine condition
    Condition {
        #[command(flatten)]
        input: InputArgs,

        /// Discrete column to group by
        #[arg(long = "group", value_name = "COL")]
        group: Option<String>,
    },

    /// Histogram of one column, or of every column
    #[command(alias = "graph")]
    Hist {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        histogram: HistogramArgs,
    },

    /// Every statistic from a single pass
    All {
        #[command(flatten)]
        input: InputArgs,

        /// Discrete column to group by
        #[arg(long = "group", value_name = "COL")]
        group: Option<String>,

        /// Leave a column out of the correlation matrix (repeatable)
        #[arg(long = "exclude", value_name = "COL")]
        exclude: Vec<String>,

        #[command(flatten)]
        histogram: HistogramArgs,
    },

    /// Show the effective configuration
    Config,
}

#[derive(Args)]
struct InputArgs {
    /// Input file
    file: PathBuf,

    /// Field delimiter
    #[arg(short, long)]
    delimiter: Option<char>,

    /// Drop a column when reading, such as a timestamp (repeatable)
    #[arg(long = "skip", value_name = "COL")]
    skip: Vec<String>,
}

#[derive(Args)]
struct HistogramArgs {
    /// Target column; every column when omitted
    #[arg(long)]
    column: Option<String>,

    /// Number of bins
    #[arg(long)]
    bins: Option<usize>,

    /// Bin method (auto, sturges, sqrt, fd, fixed_width)
    #[arg(long)]
    method: Option<BinMethod>,

    /// Lower edge of the bin range
    #[arg(long, requires = "max", allow_negative_numbers = true)]
    min: Option<f64>,

    /// Upper edge of the bin range
    #[arg(long, requires = "min", allow_negative_numbers = true)]
    max: Option<f64>,

    /// Bin width (implies the fixed_width method)
    #[arg(long)]
    bin_width: Option<f64>,

    /// Fail on values outside the bin range instead of counting them
    #[arg(long)]
    reject_out_of_range: bool,

    /// Do not measure the range with an extra pass
    #[arg(long)]
    no_prescan: bool,
}

impl InputArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            delimiter: self.delimiter,
            skip_columns: self.skip.clone(),
            ..Overrides::default()
        }
    }
}

impl HistogramArgs {
    fn apply(self, overrides: Overrides) -> Overrides {
        Overrides {
            histogram_column: self.column,
            num_bins: self.bins,
            method: self.method,
            min_value: self.min,
            max_value: self.max,
            bin_width: self.bin_width,
            reject_out_of_range: self.reject_out_of_range,
            no_prescan: self.no_prescan,
            ..overrides
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "engstat=debug" } else { "engstat=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let (file_config, config_path) = settings::load(cli.config.as_deref())?;
    match &config_path {
        Some(path) => tracing::debug!("Using configuration file {}", path.display()),
        None => tracing::debug!("Using default configuration"),
    }

    let (input, analysis) = match cli.command {
        Commands::Stats(input) => {
            let config = input.overrides().apply(file_config);
            (input, Analysis::new(config).with_moments())
        }
        Commands::Corr { input, exclude } => {
            let overrides = Overrides {
                exclude_columns: exclude,
                ..input.overrides()
            };
            (input, Analysis::new(overrides.apply(file_config)).with_correlation())
        }
        Commands::Condition { input, group } => {
            let overrides = Overrides {
                group_column: group,
                ..input.overrides()
            };
            let config = overrides.apply(file_config);
            let group = config.group_column.clone();
            (input, Analysis::new(config).with_grouped(group))
        }
        Commands::Hist { input, histogram } => {
            let config = histogram.apply(input.overrides()).apply(file_config);
            let analysis = match config.histogram.column.clone() {
                Some(column) => Analysis::new(config).with_histogram(column),
                None => Analysis::new(config).with_all_histograms(),
            };
            (input, analysis)
        }
        Commands::All {
            input,
            group,
            exclude,
            histogram,
        } => {
            // An explicit --group must exist in the file
            let required = group.is_some();
            let overrides = histogram.apply(Overrides {
                group_column: group,
                exclude_columns: exclude,
                ..input.overrides()
            });
            let config = overrides.apply(file_config);
            let group = config.group_column.clone();
            let analysis = Analysis::everything(config);
            let analysis = if required {
                analysis.with_grouped(group)
            } else {
                analysis
            };
            (input, analysis)
        }
        Commands::Config => {
            file_config.validate()?;
            match &config_path {
                Some(path) => println!("# {}", path.display()),
                None => println!("# defaults"),
            }
            print!("{}", file_config.to_toml()?);
            return Ok(());
        }
    };

    let mut source = open(&input.file, analysis.config())?;
    let result = analysis.run(&mut source)?;

    if cli.json {
        println!("{}", report::to_json(&result)?);
    } else {
        print!("{}", report::render_text(&result));
    }

    Ok(())
}

/// Open the input with the configured reader options
///
/// `.tsv` files default to a tab delimiter unless one is configured.
fn open(path: &Path, config: &AnalysisConfig) -> Result<BoxedSource, Box<dyn std::error::Error>> {
    let path_str = path
        .to_str()
        .ok_or_else(|| format!("path is not valid UTF-8: {}", path.display()))?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let mut options = config.source.csv_options();
    match extension.as_str() {
        "csv" => {}
        "tsv" if config.source.delimiter == ',' => options.delimiter = b'\t',
        "tsv" => {}
        _ => return Ok(engstat_io::open_source(path_str)?),
    }

    Ok(Box::new(CsvRowSource::open_with_options(path_str, options)?))
}
