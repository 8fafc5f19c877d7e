#[macro_use]
extern crate log;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use vision_prep::prelude::*;

use crate::params::ModelArgs;

mod params;
mod report;

#[derive(Parser, Debug)]
#[command(name = "vision-prep", version, about = "Preprocess images and run vision models")]
struct Cli {
    /// Sets the level of verbosity.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a model on each image, one at a time.
    Run {
        #[command(flatten)]
        model: ModelArgs,

        /// ONNX model file.
        #[arg(long)]
        model_path: PathBuf,

        /// Class labels, one per line (classifiers only).
        #[arg(long)]
        labels: Option<PathBuf>,

        /// Number of classes to report.
        #[arg(long, default_value_t = 1)]
        top: usize,

        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// Preprocess one image and describe the resulting tensor.
    Tensor {
        #[command(flatten)]
        model: ModelArgs,

        image: PathBuf,
    },
    /// Show the inputs and outputs an ONNX model declares.
    Info {
        /// ONNX model file.
        #[arg(long)]
        model_path: PathBuf,
    },
    /// Dump the built-in model configs as JSON.
    Models,
}

/// Entrypoint for the command-line interface.
fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "vision_prep=warn",
        1 => "vision_prep=info",
        2 => "vision_prep=debug",
        _ => "vision_prep=trace",
    };
    let env = env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, level);
    env_logger::Builder::from_env(env).format_timestamp_nanos().init();

    if let Err(e) = handle(cli.command) {
        error!("{e:?}");
        process::exit(1)
    }
}

fn handle(command: Command) -> Result<()> {
    match command {
        Command::Run { model, model_path, labels, top, images } => {
            let config = model.resolve()?;
            let labels = labels
                .map(|path| load_labels(&path).with_context(|| format!("reading labels {path:?}")))
                .transpose()?;
            run(config, &model_path, labels.as_deref(), top, &images)
        }
        Command::Tensor { model, image } => {
            let config = model.resolve()?;
            let tensor = preprocess(&load_image(&image)?, &config)?;
            println!("{}: {:?} {:?}", image.display(), tensor.datum_type(), tensor.shape());
            for stats in report::channel_stats(&tensor, &config.layout)? {
                println!(
                    "    channel {}: mean {:.4} min {:.4} max {:.4}",
                    stats.channel, stats.mean, stats.min, stats.max
                );
            }
            Ok(())
        }
        Command::Info { model_path } => {
            let session = OnnxSession::inspect(&model_path)?;
            println!("{}", model_path.display());
            for line in report::model_info_lines(&session) {
                println!("{line}");
            }
            Ok(())
        }
        Command::Models => {
            println!("{}", serde_json::to_string_pretty(&ModelConfig::builtins())?);
            Ok(())
        }
    }
}

fn run(
    config: ModelConfig,
    model_path: &Path,
    labels: Option<&[String]>,
    top: usize,
    images: &[PathBuf],
) -> Result<()> {
    let pipeline = Pipeline::load(config, model_path)?;
    run_images(&pipeline, labels, top, images)
}

/// Run every image, reporting failures as they come and failing at the end
/// if any image did.
fn run_images<S: InferenceSession>(
    pipeline: &Pipeline<S>,
    labels: Option<&[String]>,
    top: usize,
    images: &[PathBuf],
) -> Result<()> {
    let mut failed = 0;
    for image in images {
        let name = image.display().to_string();
        match pipeline.run(image) {
            Ok(Outcome::Classified(classification)) => {
                report::print_classification(&name, &classification, top, labels)
            }
            Ok(Outcome::Raw(outputs)) => report::print_raw(&name, &outputs),
            Err(e) => {
                error!("{name}: {e}");
                failed += 1;
            }
        }
    }
    if failed > 0 {
        bail!("{failed} of {} image(s) failed", images.len());
    }
    Ok(())
}
