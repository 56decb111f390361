use crate::error::DecodeError;
use crate::graph::Graph;
use crate::types::{ScoreMatrix, Utterance, UtteranceRecord};

/// Maps raw audio samples to feature frames. Feature extraction proper lives
/// outside this crate; implementations here adapt upstream output.
pub trait FrontEnd: Send + Sync {
    fn extract(&self, samples: &[f32]) -> Result<Vec<Vec<f64>>, DecodeError>;
}

/// Maps feature frames to per-frame, per-distribution log likelihoods,
/// written into the controller-owned score buffer.
pub trait AcousticScorer: Send + Sync {
    fn score(&self, features: &[Vec<f64>], scores: &mut ScoreMatrix) -> Result<(), DecodeError>;
}

/// Sequential source of utterances. `Ok(None)` signals normal exhaustion.
pub trait UtteranceSource {
    fn next_utterance(&mut self) -> Result<Option<Utterance>, DecodeError>;
}

/// Per-utterance graph source for forced alignment: each graph is
/// pre-restricted to the paths consistent with that utterance's reference
/// transcript.
pub trait GraphSource {
    fn next_graph(&mut self) -> Result<Option<Graph>, DecodeError>;
}

/// Downstream consumer of per-utterance output records.
pub trait OutputSink {
    fn write_record(&mut self, record: &UtteranceRecord) -> Result<(), DecodeError>;

    /// Called once at the end of the run.
    fn finish(&mut self) -> Result<(), DecodeError> {
        Ok(())
    }
}
