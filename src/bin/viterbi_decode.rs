use std::collections::HashMap;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use viterbi_rs::config::{
    PARAM_ACOUSTIC_WEIGHT, PARAM_ALIGN, PARAM_AUDIO_FILE, PARAM_GRAPH_FILE, PARAM_OUTPUT_FILE,
};
use viterbi_rs::{BatchDecoderBuilder, DecoderConfig};

/// Batch Viterbi decoding / forced alignment over a set of utterances.
#[derive(Debug, Parser)]
#[command(name = "viterbi_decode")]
#[command(about = "Frame-synchronous Viterbi decoding over an HMM search graph")]
struct Args {
    /// Utterance source (JSON array of utterances).
    #[arg(long, env = "VITERBI_AUDIO_FILE")]
    audio_file: String,
    /// Decoding graph, or per-utterance graph list with --align.
    #[arg(long, env = "VITERBI_GRAPH_FILE")]
    graph_file: String,
    /// Destination for per-utterance output records.
    #[arg(long, env = "VITERBI_OUTPUT_FILE")]
    output_file: String,
    /// Scalar applied to acoustic log likelihoods.
    #[arg(long, env = "VITERBI_ACOUSTIC_WEIGHT")]
    acoustic_weight: Option<f64>,
    /// Forced alignment instead of free decoding.
    #[arg(long, env = "VITERBI_ALIGN", default_value_t = false)]
    align: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut params: HashMap<String, String> = HashMap::from([
        (PARAM_AUDIO_FILE.to_string(), args.audio_file),
        (PARAM_GRAPH_FILE.to_string(), args.graph_file),
        (PARAM_OUTPUT_FILE.to_string(), args.output_file),
        (PARAM_ALIGN.to_string(), args.align.to_string()),
    ]);
    if let Some(weight) = args.acoustic_weight {
        params.insert(PARAM_ACOUSTIC_WEIGHT.to_string(), weight.to_string());
    }

    let config = match DecoderConfig::from_params(&params) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "invalid configuration");
            return ExitCode::from(2);
        }
    };

    let mut decoder = match BatchDecoderBuilder::new(config).build() {
        Ok(decoder) => decoder,
        Err(err) => {
            tracing::error!(error = %err, "failed to build decoder");
            return ExitCode::from(2);
        }
    };

    match decoder.run() {
        Ok(stats) if stats.failed > 0 => {
            tracing::warn!(failed = stats.failed, "run finished with failed utterances");
            ExitCode::from(1)
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "decoding run aborted");
            ExitCode::from(2)
        }
    }
}
