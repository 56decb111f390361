use crate::error::DecodeError;
use crate::graph::Graph;
use crate::pipeline::traits::{AcousticScorer, FrontEnd, GraphSource, OutputSink, UtteranceSource};
use crate::search::backtrace::backtrace;
use crate::search::chart::Chart;
use crate::search::forward::forward_pass;
use crate::types::{RunStats, ScoreMatrix, Utterance, UtteranceOutput, UtteranceRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    UtteranceActive,
    Done,
}

/// Handle to a successfully decoded utterance, consumed by
/// [`BatchDecoder::finish_utt`].
#[derive(Debug, Clone, Copy)]
pub struct DecodedUtterance {
    pub log_prob: f64,
    pub frames: usize,
}

/// Sequential utterance loop controller.
///
/// Drives one decoding run: per utterance it sequences front end, acoustic
/// scorer, forward pass and backtrace, reusing its chart and score buffers.
/// Owns the run-wide accumulators (total frames, total log prob) for the
/// lifetime of the run; they are initialized at construction and never reset
/// by an in-flight utterance.
pub struct BatchDecoder {
    front_end: Box<dyn FrontEnd>,
    scorer: Box<dyn AcousticScorer>,
    source: Box<dyn UtteranceSource>,
    graph_source: Option<Box<dyn GraphSource>>,
    sink: Box<dyn OutputSink>,
    acoustic_weight: f64,
    align_mode: bool,
    /// Decode-mode graph, fixed for the run; replaced per utterance in
    /// alignment mode.
    graph: Option<Graph>,
    state: LoopState,
    current: Option<Utterance>,
    pending: Option<UtteranceRecord>,
    chart: Chart,
    scores: ScoreMatrix,
    total_frames: u64,
    total_log_prob: f64,
    utterances_done: usize,
    failed: usize,
}

pub(crate) struct BatchDecoderParts {
    pub front_end: Box<dyn FrontEnd>,
    pub scorer: Box<dyn AcousticScorer>,
    pub source: Box<dyn UtteranceSource>,
    pub graph_source: Option<Box<dyn GraphSource>>,
    pub sink: Box<dyn OutputSink>,
    pub acoustic_weight: f64,
    pub align_mode: bool,
    pub graph: Option<Graph>,
}

impl BatchDecoder {
    pub(crate) fn from_parts(parts: BatchDecoderParts) -> Self {
        Self {
            front_end: parts.front_end,
            scorer: parts.scorer,
            source: parts.source,
            graph_source: parts.graph_source,
            sink: parts.sink,
            acoustic_weight: parts.acoustic_weight,
            align_mode: parts.align_mode,
            graph: parts.graph,
            state: LoopState::Idle,
            current: None,
            pending: None,
            chart: Chart::new(),
            scores: ScoreMatrix::new(),
            total_frames: 0,
            total_log_prob: 0.0,
            utterances_done: 0,
            failed: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Reads the next utterance (and its reference graph in alignment mode).
    /// Returns `true` at source exhaustion, which ends the run normally.
    pub fn init_utt(&mut self) -> Result<bool, DecodeError> {
        if self.state == LoopState::UtteranceActive {
            return Err(DecodeError::runtime(
                "init_utt",
                "previous utterance still active",
            ));
        }

        let Some(utterance) = self.source.next_utterance()? else {
            self.state = LoopState::Done;
            return Ok(true);
        };

        if self.align_mode {
            let graph_source = self.graph_source.as_mut().ok_or_else(|| {
                DecodeError::runtime("init_utt", "alignment mode without a graph source")
            })?;
            let Some(graph) = graph_source.next_graph()? else {
                return Err(DecodeError::malformed(format!(
                    "graph source exhausted before utterance '{}'",
                    utterance.id
                )));
            };
            self.graph = Some(graph);
        }

        // Buffers are sized in decode_utt once the frame count is known.
        self.scores.reset(0, 0);
        self.pending = None;
        self.current = Some(utterance);
        self.state = LoopState::UtteranceActive;
        Ok(false)
    }

    /// Runs front end, scorer, forward pass and backtrace for the active
    /// utterance and stages its output record. An unreachable final state
    /// surfaces as [`DecodeError::UnreachableFinal`].
    pub fn decode_utt(&mut self) -> Result<DecodedUtterance, DecodeError> {
        if self.state != LoopState::UtteranceActive {
            return Err(DecodeError::runtime("decode_utt", "no active utterance"));
        }
        let utterance = self
            .current
            .as_ref()
            .ok_or_else(|| DecodeError::runtime("decode_utt", "no active utterance"))?;

        if let Some(rows) = &utterance.scores {
            self.scores.load_rows(rows)?;
        } else {
            let features = match &utterance.features {
                Some(features) => features.clone(),
                None => self.front_end.extract(&utterance.samples)?,
            };
            self.scorer.score(&features, &mut self.scores)?;
        }
        let frames = self.scores.frames();

        let graph = self
            .graph
            .as_ref()
            .ok_or_else(|| DecodeError::runtime("decode_utt", "no graph loaded"))?;
        forward_pass(graph, &self.scores, self.acoustic_weight, &mut self.chart)?;

        let Some(path) = backtrace(graph, &self.chart)? else {
            return Err(DecodeError::UnreachableFinal {
                utterance_id: utterance.id.clone(),
                frames,
            });
        };

        tracing::debug!(
            utterance_id = utterance.id.as_str(),
            frames,
            log_prob = path.log_prob,
            "decoded utterance"
        );

        let output = if self.align_mode {
            UtteranceOutput::Alignment(path.states)
        } else {
            UtteranceOutput::Labels(path.labels)
        };
        self.pending = Some(UtteranceRecord {
            utterance_id: utterance.id.clone(),
            log_prob: path.log_prob,
            output,
        });
        Ok(DecodedUtterance {
            log_prob: path.log_prob,
            frames,
        })
    }

    /// Emits the staged record downstream and folds the utterance into the
    /// run accumulators.
    pub fn finish_utt(&mut self, decoded: DecodedUtterance) -> Result<(), DecodeError> {
        let record = self
            .pending
            .take()
            .ok_or_else(|| DecodeError::runtime("finish_utt", "no decoded utterance staged"))?;
        self.sink.write_record(&record)?;
        self.total_frames += decoded.frames as u64;
        self.total_log_prob += decoded.log_prob;
        self.utterances_done += 1;
        self.current = None;
        self.state = LoopState::Idle;
        Ok(())
    }

    /// Abandons the active utterance after a recoverable decode failure,
    /// leaving the run accumulators untouched.
    pub fn fail_utt(&mut self) {
        self.failed += 1;
        self.pending = None;
        self.current = None;
        self.state = LoopState::Idle;
    }

    /// Called once after the stream is exhausted: reports aggregates and
    /// flushes the sink.
    pub fn finish(&mut self) -> Result<RunStats, DecodeError> {
        self.sink.finish()?;
        let stats = RunStats {
            utterances: self.utterances_done,
            failed: self.failed,
            total_frames: self.total_frames,
            total_log_prob: self.total_log_prob,
        };
        tracing::info!(
            utterances = stats.utterances,
            failed = stats.failed,
            total_frames = stats.total_frames,
            total_log_prob = stats.total_log_prob,
            avg_log_prob_per_frame = stats.avg_log_prob_per_frame(),
            "decoding run finished"
        );
        Ok(stats)
    }

    /// Drives the whole run. Unreachable-final-state failures are reported
    /// and skipped; every other error is fatal and aborts the run.
    pub fn run(&mut self) -> Result<RunStats, DecodeError> {
        loop {
            if self.init_utt()? {
                break;
            }
            match self.decode_utt() {
                Ok(decoded) => self.finish_utt(decoded)?,
                Err(DecodeError::UnreachableFinal {
                    utterance_id,
                    frames,
                }) => {
                    tracing::warn!(
                        utterance_id = utterance_id.as_str(),
                        frames,
                        "no path to a final state; skipping utterance"
                    );
                    self.fail_utt();
                }
                Err(err) => return Err(err),
            }
        }
        self.finish()
    }
}
