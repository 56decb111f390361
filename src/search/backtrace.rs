use crate::error::DecodeError;
use crate::graph::{Graph, NodeId};
use crate::search::chart::Chart;

/// Optimal path recovered from a filled chart.
#[derive(Debug, Clone, PartialEq)]
pub struct BestPath {
    /// Viterbi log probability of the best final cell.
    pub log_prob: f64,
    /// Emitted labels in forward order (emitting and epsilon arc labels).
    pub labels: Vec<String>,
    /// State occupied at each frame `0..T` along the path: the destination
    /// node of the emitting arc that consumed that frame.
    pub states: Vec<NodeId>,
}

/// Best final cell at the last chart row, or `None` when no final node is
/// reachable. Ties between equal maxima go to the lowest node id.
pub fn best_final_cell(graph: &Graph, chart: &Chart) -> Option<(NodeId, f64)> {
    let last = chart.frames();
    let mut best: Option<(NodeId, f64)> = None;
    for &node in graph.finals() {
        let cell = chart.get(last, node);
        if !cell.is_reached() {
            continue;
        }
        // finals() is sorted ascending, strict > keeps the lowest node id.
        if best.map_or(true, |(_, log_prob)| cell.log_prob > log_prob) {
            best = Some((node, cell.log_prob));
        }
    }
    best
}

/// Follows stored arc ids backward from the best final cell to a start cell.
///
/// Returns `Ok(None)` when no final node is reachable at the last frame.
/// Epsilon hops per frame are bounded by the node count; exceeding the bound
/// means the chart references an epsilon cycle and the input is malformed.
pub fn backtrace(graph: &Graph, chart: &Chart) -> Result<Option<BestPath>, DecodeError> {
    let Some((mut node, log_prob)) = best_final_cell(graph, chart) else {
        return Ok(None);
    };

    let frames = chart.frames();
    let mut t = frames;
    let mut labels = Vec::new();
    let mut states = vec![0; frames];
    let mut eps_hops = 0usize;

    loop {
        let Some(arc_id) = chart.get(t, node).arc_id else {
            break;
        };
        let arc = graph.arc(arc_id);
        if let Some(label) = &arc.label {
            labels.push(label.clone());
        }
        if arc.is_emitting() {
            states[t - 1] = node;
            t -= 1;
            eps_hops = 0;
        } else {
            eps_hops += 1;
            if eps_hops > graph.num_nodes() {
                return Err(DecodeError::malformed(
                    "epsilon hop bound exceeded during backtrace",
                ));
            }
        }
        node = arc.src;
    }

    labels.reverse();
    Ok(Some(BestPath {
        log_prob,
        labels,
        states,
    }))
}
