use std::collections::HashMap;

use crate::error::DecodeError;

/// Recognized option names for [`DecoderConfig::from_params`].
pub const PARAM_AUDIO_FILE: &str = "audio_file";
pub const PARAM_GRAPH_FILE: &str = "graph_file";
pub const PARAM_OUTPUT_FILE: &str = "output_file";
pub const PARAM_ACOUSTIC_WEIGHT: &str = "acoustic_weight";
pub const PARAM_ALIGN: &str = "align";

#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Path to the utterance source (JSON array of utterances).
    pub audio_file: String,
    /// Path to the decoding graph, or to the per-utterance graph list when
    /// `align_mode` is set.
    pub graph_file: String,
    /// Path the per-utterance output records are written to.
    pub output_file: String,
    /// Scalar applied to acoustic log likelihoods before they are combined
    /// with graph transition weights.
    pub acoustic_weight: f64,
    /// Forced alignment instead of free decoding.
    pub align_mode: bool,
}

impl DecoderConfig {
    pub const DEFAULT_ACOUSTIC_WEIGHT: f64 = 1.0;

    /// Builds a config from a mapping of named string options. Missing
    /// required options and unparsable values are fatal.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, DecodeError> {
        for key in params.keys() {
            if !matches!(
                key.as_str(),
                PARAM_AUDIO_FILE
                    | PARAM_GRAPH_FILE
                    | PARAM_OUTPUT_FILE
                    | PARAM_ACOUSTIC_WEIGHT
                    | PARAM_ALIGN
            ) {
                tracing::warn!(option = key.as_str(), "ignoring unrecognized option");
            }
        }

        let acoustic_weight = match params.get(PARAM_ACOUSTIC_WEIGHT) {
            Some(raw) => {
                let value: f64 = raw.trim().parse().map_err(|_| {
                    DecodeError::config(format!("{PARAM_ACOUSTIC_WEIGHT}='{raw}' is not a number"))
                })?;
                if !value.is_finite() {
                    return Err(DecodeError::config(format!(
                        "{PARAM_ACOUSTIC_WEIGHT}='{raw}' must be finite"
                    )));
                }
                value
            }
            None => Self::DEFAULT_ACOUSTIC_WEIGHT,
        };

        let align_mode = match params.get(PARAM_ALIGN) {
            Some(raw) => parse_bool(raw).ok_or_else(|| {
                DecodeError::config(format!("{PARAM_ALIGN}='{raw}' is not a boolean"))
            })?,
            None => false,
        };

        Ok(Self {
            audio_file: required(params, PARAM_AUDIO_FILE)?,
            graph_file: required(params, PARAM_GRAPH_FILE)?,
            output_file: required(params, PARAM_OUTPUT_FILE)?,
            acoustic_weight,
            align_mode,
        })
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            audio_file: String::new(),
            graph_file: String::new(),
            output_file: String::new(),
            acoustic_weight: Self::DEFAULT_ACOUSTIC_WEIGHT,
            align_mode: false,
        }
    }
}

fn required(params: &HashMap<String, String>, key: &'static str) -> Result<String, DecodeError> {
    match params.get(key) {
        Some(value) if !value.trim().is_empty() => Ok(value.clone()),
        _ => Err(DecodeError::config(format!("missing required option '{key}'"))),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
