use std::io::BufRead;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info, warn};

use exoura_classifier::{
    ChatSession, ClassProbabilities, ClassifierError, FeatureVector, FormState, FormView, Label,
    Predictor, ProportionChart, RangePolicy, Trainer, TrainerConfig,
};
use exoura_io::{ExperimentName, KoiReader, PredictionRow, ReportWriter};

#[derive(Parser)]
#[command(name = "exoura")]
#[command(about = "Kepler transit candidate false-positive classifier")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for the split, the folds, and the forests
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Model location and input checks shared by the inference commands.
#[derive(Args, Debug, Clone)]
struct ModelArgs {
    /// Path to the trained model artifact
    #[arg(long, default_value = "rf_model.bin")]
    model: PathBuf,

    /// Reject negative feature values instead of classifying them
    #[arg(long, default_value_t = false)]
    non_negative: bool,
}

impl ModelArgs {
    fn load(&self) -> Result<Predictor> {
        let policy = if self.non_negative {
            RangePolicy::NonNegative
        } else {
            RangePolicy::Permissive
        };
        let predictor = Predictor::load(&self.model)
            .with_context(|| format!("failed to load model {}", self.model.display()))?
            .with_range_policy(policy);
        let forest = predictor.artifact().forest();
        info!(
            n_trees = forest.n_trees(),
            n_features = forest.n_features(),
            params = %predictor.artifact().params(),
            "model loaded"
        );
        Ok(predictor)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Grid-search a random forest on a labeled KOI export and save the best model
    Train {
        /// Path to the KOI CSV export
        #[arg(long)]
        data: PathBuf,

        /// Where to write the model artifact
        #[arg(long, default_value = "rf_model.bin")]
        model: PathBuf,

        /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Number of cross-validation folds
        #[arg(long, default_value_t = 3)]
        cv_folds: usize,

        /// Fraction of rows held out for the final evaluation
        #[arg(long, default_value_t = 0.2)]
        test_fraction: f64,
    },

    /// Classify one candidate from five feature values (all 0.0 = not submitted)
    Predict {
        #[command(flatten)]
        model: ModelArgs,

        /// Orbital period (days)
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        koi_period: f64,

        /// Transit duration (hours)
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        koi_duration: f64,

        /// Transit depth (ppm)
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        koi_depth: f64,

        /// Planet radius (Earth radii)
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        koi_prad: f64,

        /// Transit model signal-to-noise ratio
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        koi_model_snr: f64,
    },

    /// Classify every complete row of a KOI CSV export
    Classify {
        #[command(flatten)]
        model: ModelArgs,

        /// Path to the KOI CSV export (disposition column optional)
        #[arg(long)]
        data: PathBuf,

        /// Experiment name for output files
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Answer five questions on stdin, one value per line, and get a verdict
    Chat {
        #[command(flatten)]
        model: ModelArgs,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct TrainOutput {
    experiment: String,
    model: String,
    n_rows: usize,
    n_train: usize,
    n_test: usize,
    best_params: String,
    best_cv_accuracy: f64,
    test_accuracy: f64,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum PredictOutput {
    NotSubmitted {
        message: &'static str,
    },
    Predicted {
        label: Label,
        probabilities: ClassProbabilities,
        chart: ProportionChart,
    },
}

#[derive(Serialize)]
struct ClassifyOutput {
    experiment: String,
    n_rows: usize,
    n_rejected: usize,
    n_false_positive: usize,
    model_n_trees: usize,
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

    match cli.command {
        Command::Train {
            data,
            model,
            experiment,
            output_dir,
            cv_folds,
            test_fraction,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;
            let writer = ReportWriter::new(&output_dir, experiment_name)?;

            let config = TrainerConfig::new()
                .with_seed(cli.seed)
                .with_cv_folds(cv_folds)
                .with_test_fraction(test_fraction);
            let dataset = KoiReader::new(&data)
                .read_labeled()
                .context("failed to read KOI CSV")?;
            let outcome = Trainer::new(config)
                .fit(&dataset)
                .context("training failed")?;
            let report = &outcome.report;
            // The model is only replaced once its report is on disk.
            writer.write_training(report)?;
            outcome
                .artifact
                .save(&model)
                .with_context(|| format!("failed to write model {}", model.display()))?;
            info!(path = %model.display(), "model artifact written");

            if !cli.quiet {
                eprint!("{}", report.classification_report);
            }

            let output = TrainOutput {
                experiment,
                model: model.display().to_string(),
                n_rows: report.rows.used,
                n_train: report.rows.train,
                n_test: report.rows.test,
                best_params: report.best_params.to_string(),
                best_cv_accuracy: report.best_cv_accuracy,
                test_accuracy: report.test_accuracy,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Predict {
            model,
            koi_period,
            koi_duration,
            koi_depth,
            koi_prad,
            koi_model_snr,
        } => {
            let predictor = model.load()?;
            let values = FeatureVector::from_values(&[
                koi_period,
                koi_duration,
                koi_depth,
                koi_prad,
                koi_model_snr,
            ])?;
            let output = match FormState::with_values(values).rerun(&predictor)? {
                FormView::NotSubmitted => PredictOutput::NotSubmitted {
                    message: "all inputs are at their 0.0 default; change at least one",
                },
                FormView::Result { prediction, chart } => {
                    if !cli.quiet {
                        eprint!("{chart}");
                    }
                    PredictOutput::Predicted {
                        label: prediction.label,
                        probabilities: prediction.probabilities,
                        chart,
                    }
                }
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Classify {
            model,
            data,
            experiment,
            output_dir,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;
            let predictor = model.load()?;
            let dataset = KoiReader::new(&data)
                .read_features()
                .context("failed to read KOI CSV")?;

            let mut rows = Vec::with_capacity(dataset.len());
            let mut n_rejected = 0usize;
            for record in dataset.records() {
                let prediction = match predictor.predict_values(&record.features) {
                    Ok(p) => p,
                    Err(ClassifierError::Input(err)) => {
                        warn!(line = record.line, %err, "row rejected");
                        n_rejected += 1;
                        continue;
                    }
                    Err(err) => return Err(err).context("prediction failed"),
                };
                rows.push(PredictionRow {
                    line: record.line,
                    name: record.name.clone(),
                    label: prediction.label.to_string(),
                    class: usize::from(prediction.label == Label::FalsePositive),
                    probabilities: prediction.probabilities.as_array().to_vec(),
                    disposition: record.disposition.as_ref().map(ToString::to_string),
                });
            }

            let writer = ReportWriter::new(&output_dir, experiment_name)?;
            writer.write_predictions(&model.model, dataset.rows_dropped(), &rows)?;

            let output = ClassifyOutput {
                experiment,
                n_rows: rows.len(),
                n_rejected,
                n_false_positive: rows.iter().filter(|r| r.class == 1).count(),
                model_n_trees: predictor.artifact().forest().n_trees(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Chat { model } => {
            let predictor = model.load()?;
            let mut session = ChatSession::new();
            for message in session.greet() {
                println!("{message}");
            }
            for line in std::io::stdin().lock().lines() {
                let line = line.context("failed to read stdin")?;
                match session.submit(&line, &predictor) {
                    Ok(reply) => {
                        for message in reply.messages {
                            println!("{message}");
                        }
                    }
                    Err(err) => {
                        error!(%err, "prediction failed");
                        println!("Exoura: Sorry, I could not classify that.");
                        println!("Exoura: Let's start over. Please input koi_period");
                    }
                }
            }
        }
    }

    Ok(())
}
