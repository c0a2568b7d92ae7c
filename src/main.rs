use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use rayon::prelude::*;
use serde_json::Value;

use fractal_family_lib::arbitration::arbitrate_with;
use fractal_family_lib::classifier::{ClassificationResult, ClusterScorer, FeatureVector};
use fractal_family_lib::knowledge_base::{describe_cluster, CLUSTERS};
use fractal_family_lib::output::{write_classifications_csv, write_json};
use fractal_family_lib::Config;

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "Fractal family classification from box-counting features")]
struct Args {
    /// Path to configuration file (defaults are used when it does not exist)
    #[clap(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify JSON feature records (one object or an array of objects)
    Classify {
        /// Input file, or "-" for stdin
        input: String,

        /// Output format
        #[clap(short, long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// Output file (stdout when omitted)
        #[clap(short, long)]
        output: Option<PathBuf>,

        /// Also print the three most similar clusters per record
        #[clap(long)]
        similar: bool,
    },
    /// Combine a K-means label with the rule-based result of one record
    Arbitrate {
        /// Input file holding one JSON feature object, or "-" for stdin
        input: String,

        /// Cluster id assigned by the external K-means model
        #[clap(short, long)]
        kmeans: usize,
    },
    /// List the built-in cluster definitions
    Clusters,
    /// Print the effective configuration as TOML
    Config {
        /// Only validate the configuration
        #[clap(long)]
        check: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = if args.config.exists() {
        Config::from_file(&args.config)
            .with_context(|| format!("loading {}", args.config.display()))?
    } else {
        info!("No configuration at {}, using defaults", args.config.display());
        Config::default()
    };
    config.validate().context("invalid configuration")?;

    match args.command {
        Command::Classify { input, format, output, similar } => {
            classify(&config, &input, format, output, similar)
        }
        Command::Arbitrate { input, kmeans } => {
            let value = read_json(&input)?;
            let scorer = ClusterScorer::new(config.scoring.clone());
            let result = scorer.classify_json(&value);
            let outcome = arbitrate_with(kmeans, &result, &config.arbitration);
            write_json(&outcome, io::stdout().lock(), true)?;
            Ok(())
        }
        Command::Clusters => {
            let mut stdout = io::stdout().lock();
            for def in CLUSTERS.iter() {
                writeln!(
                    stdout,
                    "{:>2}  {:<22} D {:.1}-{:.1}  {}",
                    def.id,
                    def.visual_pattern.as_str(),
                    def.hausdorff_range.0,
                    def.hausdorff_range.1,
                    describe_cluster(def.id)
                )?;
            }
            Ok(())
        }
        Command::Config { check } => {
            if check {
                println!("Configuration is valid");
            } else {
                print!("{}", config.to_toml()?);
            }
            Ok(())
        }
    }
}

fn classify(
    config: &Config,
    input: &str,
    format: OutputFormat,
    output: Option<PathBuf>,
    similar: bool,
) -> Result<()> {
    let start_time = Instant::now();
    let scorer = ClusterScorer::new(config.scoring.clone());

    let records = match read_json(input)? {
        Value::Array(items) => items,
        object @ Value::Object(_) => vec![object],
        other => bail!("expected a JSON object or array, got {}", other),
    };
    info!("Classifying {} feature records", records.len());

    let classify_one = |(index, value): (usize, &Value)| -> (String, ClassificationResult) {
        let label = value
            .get("label")
            .and_then(Value::as_str)
            .map(String::from)
            .unwrap_or_else(|| format!("record_{}", index));
        (label, scorer.classify_json(value))
    };
    let results: Vec<(String, ClassificationResult)> = if config.use_parallel {
        records.par_iter().enumerate().map(classify_one).collect()
    } else {
        records.iter().enumerate().map(classify_one).collect()
    };

    let sink: Box<dyn Write> = match &output {
        Some(path) => Box::new(
            fs::File::create(path).with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };

    match format {
        OutputFormat::Csv => write_classifications_csv(&results, sink)?,
        OutputFormat::Json if similar => {
            let detailed: Vec<Value> = results
                .iter()
                .zip(&records)
                .map(|((label, result), value)| {
                    let suggestions = FeatureVector::from_json_value(value)
                        .map(|features| scorer.suggest_similar_clusters(result.cluster_id, &features))
                        .unwrap_or_default();
                    serde_json::json!({
                        "label": label,
                        "result": result,
                        "similar_clusters": suggestions,
                    })
                })
                .collect();
            write_json(&detailed, sink, true)?
        }
        OutputFormat::Json => {
            let map: serde_json::Map<String, Value> = results
                .iter()
                .map(|(label, result)| Ok((label.clone(), serde_json::to_value(result)?)))
                .collect::<std::result::Result<_, serde_json::Error>>()?;
            write_json(&map, sink, true)?
        }
    }

    let failed = results.iter().filter(|(_, r)| r.is_failed_closed()).count();
    info!(
        "Classified {} records ({} failed closed) in {:.2} seconds",
        results.len(),
        failed,
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}

fn read_json(input: &str) -> Result<Value> {
    let text = if input == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer).context("reading stdin")?;
        buffer
    } else {
        fs::read_to_string(input).with_context(|| format!("reading {}", input))?
    };
    serde_json::from_str(&text).context("parsing feature JSON")
}
