use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::DecodeError;
use crate::graph::{Graph, GraphSpec};
use crate::pipeline::traits::{AcousticScorer, FrontEnd, GraphSource, OutputSink, UtteranceSource};
use crate::types::{ScoreMatrix, Utterance, UtteranceOutput, UtteranceRecord};

/// Chops samples into fixed-length non-overlapping windows, one feature row
/// per window. Trailing samples that do not fill a window are dropped.
pub struct WindowFrontEnd {
    pub frame_len: usize,
}

impl WindowFrontEnd {
    /// 10 ms at 16 kHz.
    pub const DEFAULT_FRAME_LEN: usize = 160;
}

impl Default for WindowFrontEnd {
    fn default() -> Self {
        Self {
            frame_len: Self::DEFAULT_FRAME_LEN,
        }
    }
}

impl FrontEnd for WindowFrontEnd {
    fn extract(&self, samples: &[f32]) -> Result<Vec<Vec<f64>>, DecodeError> {
        if self.frame_len == 0 {
            return Err(DecodeError::runtime("front end", "frame_len must be > 0"));
        }
        Ok(samples
            .chunks_exact(self.frame_len)
            .map(|chunk| chunk.iter().map(|&s| s as f64).collect())
            .collect())
    }
}

/// Treats each feature row as an already computed log-likelihood row, for
/// pipelines whose acoustic model runs upstream.
pub struct PassThroughScorer;

impl AcousticScorer for PassThroughScorer {
    fn score(&self, features: &[Vec<f64>], scores: &mut ScoreMatrix) -> Result<(), DecodeError> {
        scores.load_rows(features)
    }
}

#[derive(Debug, serde::Deserialize)]
struct UtteranceSpec {
    id: String,
    #[serde(default)]
    samples: Vec<f32>,
    #[serde(default)]
    features: Option<Vec<Vec<f64>>>,
    #[serde(default)]
    scores: Option<Vec<Vec<f64>>>,
}

/// Reads a JSON array of utterances and yields them in file order.
pub struct JsonUtteranceSource {
    utterances: std::vec::IntoIter<UtteranceSpec>,
}

impl JsonUtteranceSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DecodeError> {
        let data = std::fs::read_to_string(path.as_ref())
            .map_err(|e| DecodeError::io("read utterance file", e))?;
        let specs: Vec<UtteranceSpec> =
            serde_json::from_str(&data).map_err(|e| DecodeError::json("parse utterance file", e))?;
        Ok(Self {
            utterances: specs.into_iter(),
        })
    }
}

impl UtteranceSource for JsonUtteranceSource {
    fn next_utterance(&mut self) -> Result<Option<Utterance>, DecodeError> {
        Ok(self.utterances.next().map(|spec| Utterance {
            id: spec.id,
            samples: spec.samples,
            features: spec.features,
            scores: spec.scores,
        }))
    }
}

/// Reads a JSON array of graphs, one per utterance, for forced alignment.
/// Every graph is validated up front so malformed input fails the run before
/// any utterance is processed.
pub struct JsonGraphSource {
    graphs: std::vec::IntoIter<Graph>,
}

impl JsonGraphSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DecodeError> {
        let data = std::fs::read_to_string(path.as_ref())
            .map_err(|e| DecodeError::io("read graph file", e))?;
        let specs: Vec<GraphSpec> =
            serde_json::from_str(&data).map_err(|e| DecodeError::json("parse graph file", e))?;
        let graphs = specs
            .into_iter()
            .map(Graph::from_spec)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            graphs: graphs.into_iter(),
        })
    }
}

impl GraphSource for JsonGraphSource {
    fn next_graph(&mut self) -> Result<Option<Graph>, DecodeError> {
        Ok(self.graphs.next())
    }
}

/// Writes one plain-text line per utterance: the utterance id followed by the
/// decoded labels, or by one state id per frame in alignment mode.
pub struct TextOutputSink {
    out: BufWriter<File>,
}

impl TextOutputSink {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, DecodeError> {
        let file =
            File::create(path.as_ref()).map_err(|e| DecodeError::io("create output file", e))?;
        Ok(Self {
            out: BufWriter::new(file),
        })
    }
}

impl OutputSink for TextOutputSink {
    fn write_record(&mut self, record: &UtteranceRecord) -> Result<(), DecodeError> {
        let mut line = record.utterance_id.clone();
        match &record.output {
            UtteranceOutput::Labels(labels) => {
                for label in labels {
                    line.push(' ');
                    line.push_str(label);
                }
            }
            UtteranceOutput::Alignment(states) => {
                for state in states {
                    line.push(' ');
                    line.push_str(&state.to_string());
                }
            }
        }
        line.push('\n');
        self.out
            .write_all(line.as_bytes())
            .map_err(|e| DecodeError::io("write output record", e))
    }

    fn finish(&mut self) -> Result<(), DecodeError> {
        self.out
            .flush()
            .map_err(|e| DecodeError::io("flush output file", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_front_end_drops_partial_frames() {
        let front_end = WindowFrontEnd { frame_len: 2 };
        let features = front_end.extract(&[0.5, 1.0, -1.0, 0.25, 0.125]).unwrap();
        assert_eq!(features, vec![vec![0.5, 1.0], vec![-1.0, 0.25]]);
    }

    #[test]
    fn pass_through_scorer_copies_rows() {
        let mut scores = ScoreMatrix::new();
        PassThroughScorer
            .score(&[vec![-1.0, -2.0]], &mut scores)
            .unwrap();
        assert_eq!(scores.frames(), 1);
        assert_eq!(scores.get(0, 1), -2.0);
    }

    #[test]
    fn json_utterance_source_yields_in_order() {
        let dir = std::env::temp_dir();
        let path = dir.join("viterbi_rs_defaults_utts.json");
        std::fs::write(
            &path,
            r#"[{"id": "utt1", "scores": [[-1.0]]}, {"id": "utt2", "samples": [0.0, 0.5]}]"#,
        )
        .expect("write utterances");

        let mut source = JsonUtteranceSource::open(&path).unwrap();
        let first = source.next_utterance().unwrap().unwrap();
        assert_eq!(first.id, "utt1");
        assert_eq!(first.scores, Some(vec![vec![-1.0]]));
        let second = source.next_utterance().unwrap().unwrap();
        assert_eq!(second.id, "utt2");
        assert_eq!(second.samples, vec![0.0, 0.5]);
        assert!(source.next_utterance().unwrap().is_none());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn json_graph_source_rejects_bad_graph_up_front() {
        let dir = std::env::temp_dir();
        let path = dir.join("viterbi_rs_defaults_bad_graphs.json");
        std::fs::write(
            &path,
            r#"[{"num_nodes": 1, "start": [{"node": 0}], "final": [9], "arcs": []}]"#,
        )
        .expect("write graphs");
        let result = JsonGraphSource::open(&path);
        assert!(matches!(result, Err(DecodeError::Malformed { .. })));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn text_sink_formats_labels_and_alignments() {
        let dir = std::env::temp_dir();
        let path = dir.join("viterbi_rs_defaults_out.txt");
        {
            let mut sink = TextOutputSink::create(&path).unwrap();
            sink.write_record(&UtteranceRecord {
                utterance_id: "utt1".to_string(),
                log_prob: -4.0,
                output: UtteranceOutput::Labels(vec!["A".to_string(), "B".to_string()]),
            })
            .unwrap();
            sink.write_record(&UtteranceRecord {
                utterance_id: "utt2".to_string(),
                log_prob: -2.0,
                output: UtteranceOutput::Alignment(vec![0, 1, 1]),
            })
            .unwrap();
            sink.finish().unwrap();
        }
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "utt1 A B\nutt2 0 1 1\n");
        let _ = std::fs::remove_file(&path);
    }
}
