use crate::error::DecodeError;
use crate::graph::NodeId;

/// One independent unit of audio and its decoding context.
///
/// `features` and `scores` are optional precomputed stages: when present they
/// skip the front end and the acoustic scorer respectively, so pipelines whose
/// acoustic model runs upstream can feed log-likelihood matrices directly.
#[derive(Debug, Clone)]
pub struct Utterance {
    pub id: String,
    pub samples: Vec<f32>,
    pub features: Option<Vec<Vec<f64>>>,
    pub scores: Option<Vec<Vec<f64>>>,
}

/// Dense per-utterance table of acoustic log likelihoods, indexed by
/// `(frame, output distribution)`. Row-major; resized and reused across
/// utterances by the loop controller.
#[derive(Debug, Clone, Default)]
pub struct ScoreMatrix {
    frames: usize,
    dists: usize,
    data: Vec<f64>,
}

impl ScoreMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn num_dists(&self) -> usize {
        self.dists
    }

    pub fn reset(&mut self, frames: usize, dists: usize) {
        self.frames = frames;
        self.dists = dists;
        self.data.clear();
        self.data.resize(frames * dists, 0.0);
    }

    pub fn get(&self, frame: usize, dist: usize) -> f64 {
        debug_assert!(frame < self.frames && dist < self.dists);
        self.data[frame * self.dists + dist]
    }

    pub fn set(&mut self, frame: usize, dist: usize, value: f64) {
        debug_assert!(frame < self.frames && dist < self.dists);
        self.data[frame * self.dists + dist] = value;
    }

    /// Replaces the contents with the given rows. All rows must have the same
    /// width; ragged input is malformed.
    pub fn load_rows(&mut self, rows: &[Vec<f64>]) -> Result<(), DecodeError> {
        let dists = rows.first().map(Vec::len).unwrap_or(0);
        if rows.iter().any(|row| row.len() != dists) {
            return Err(DecodeError::malformed("ragged score matrix rows"));
        }
        self.frames = rows.len();
        self.dists = dists;
        self.data.clear();
        for row in rows {
            self.data.extend_from_slice(row);
        }
        Ok(())
    }

    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, DecodeError> {
        let mut matrix = Self::new();
        matrix.load_rows(rows)?;
        Ok(matrix)
    }
}

/// Per-utterance decoding result, one of the two output modes.
#[derive(Debug, Clone, PartialEq)]
pub enum UtteranceOutput {
    /// Decoded label sequence in forward order.
    Labels(Vec<String>),
    /// Frame-to-state alignment, one state id per frame.
    Alignment(Vec<NodeId>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct UtteranceRecord {
    pub utterance_id: String,
    pub log_prob: f64,
    pub output: UtteranceOutput,
}

/// Run-wide totals owned by the loop controller for the lifetime of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunStats {
    pub utterances: usize,
    pub failed: usize,
    pub total_frames: u64,
    pub total_log_prob: f64,
}

impl RunStats {
    pub fn avg_log_prob_per_frame(&self) -> f64 {
        if self.total_frames == 0 {
            return 0.0;
        }
        self.total_log_prob / self.total_frames as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_matrix_round_trips_rows() {
        let matrix = ScoreMatrix::from_rows(&[vec![-1.0, -2.0], vec![-3.0, -4.0]]).unwrap();
        assert_eq!(matrix.frames(), 2);
        assert_eq!(matrix.num_dists(), 2);
        assert_eq!(matrix.get(0, 1), -2.0);
        assert_eq!(matrix.get(1, 0), -3.0);
    }

    #[test]
    fn score_matrix_rejects_ragged_rows() {
        let result = ScoreMatrix::from_rows(&[vec![-1.0, -2.0], vec![-3.0]]);
        assert!(matches!(result, Err(DecodeError::Malformed { .. })));
    }

    #[test]
    fn score_matrix_reset_reuses_for_new_shape() {
        let mut matrix = ScoreMatrix::from_rows(&vec![vec![-1.0; 4]; 8]).unwrap();
        matrix.reset(2, 3);
        assert_eq!(matrix.frames(), 2);
        assert_eq!(matrix.num_dists(), 3);
        assert_eq!(matrix.get(1, 2), 0.0);
    }

    #[test]
    fn empty_run_stats_have_zero_average() {
        assert_eq!(RunStats::default().avg_log_prob_per_frame(), 0.0);
    }
}
