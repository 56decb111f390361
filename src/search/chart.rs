use crate::graph::ArcId;

/// Sentinel log probability for unreached cells. Finite so sums stay finite
/// and never propagate NaN, yet far below any attainable cumulative score.
pub const ZERO_LOG_PROB: f64 = -1.0e30;

/// Cell in the dynamic programming chart: cumulative Viterbi log probability
/// and the best incoming arc for backtrace (`None` for unreached cells and
/// start cells).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VitCell {
    pub log_prob: f64,
    pub arc_id: Option<ArcId>,
}

impl VitCell {
    pub fn is_reached(&self) -> bool {
        self.log_prob > ZERO_LOG_PROB
    }
}

impl Default for VitCell {
    fn default() -> Self {
        Self {
            log_prob: ZERO_LOG_PROB,
            arc_id: None,
        }
    }
}

/// DP chart indexed by `(frame 0..=T, node)`. One controller-owned instance
/// is resized and reused per utterance.
#[derive(Debug, Clone, Default)]
pub struct Chart {
    frames: usize,
    nodes: usize,
    cells: Vec<VitCell>,
}

impl Chart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of acoustic frames T; the chart itself has T+1 rows.
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn nodes(&self) -> usize {
        self.nodes
    }

    /// Resizes for a new utterance and marks every cell unreached.
    pub fn reset(&mut self, frames: usize, nodes: usize) {
        self.frames = frames;
        self.nodes = nodes;
        self.cells.clear();
        self.cells.resize((frames + 1) * nodes, VitCell::default());
    }

    pub fn get(&self, frame: usize, node: usize) -> VitCell {
        debug_assert!(frame <= self.frames && node < self.nodes);
        self.cells[frame * self.nodes + node]
    }

    pub fn set(&mut self, frame: usize, node: usize, cell: VitCell) {
        debug_assert!(frame <= self.frames && node < self.nodes);
        self.cells[frame * self.nodes + node] = cell;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_cells_are_unreached() {
        let mut chart = Chart::new();
        chart.reset(2, 3);
        for frame in 0..=2 {
            for node in 0..3 {
                let cell = chart.get(frame, node);
                assert!(!cell.is_reached());
                assert_eq!(cell.arc_id, None);
            }
        }
    }

    #[test]
    fn reset_clears_previous_utterance() {
        let mut chart = Chart::new();
        chart.reset(1, 2);
        chart.set(
            1,
            1,
            VitCell {
                log_prob: -4.0,
                arc_id: Some(7),
            },
        );
        chart.reset(1, 2);
        assert!(!chart.get(1, 1).is_reached());
    }

    #[test]
    fn zero_frame_chart_keeps_one_row() {
        let mut chart = Chart::new();
        chart.reset(0, 2);
        assert_eq!(chart.frames(), 0);
        assert!(!chart.get(0, 1).is_reached());
    }
}
