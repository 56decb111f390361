use crate::error::DecodeError;
use crate::graph::Graph;
use crate::search::chart::{Chart, VitCell};
use crate::types::ScoreMatrix;

/// Frame-synchronous Viterbi forward pass.
///
/// Fills `chart` with the maximum cumulative log probability for every
/// reachable `(frame, node)` cell. An emitting arc into node `n` at chart row
/// `t` consumes acoustic frame `t-1`:
///
/// ```text
/// chart[t][n] = max over arcs a=(p -> n):
///     emitting: chart[t-1][p] + weight(a) + acoustic_weight * score(t-1, dist(a))
///     epsilon:  chart[t][p]   + weight(a)
/// ```
///
/// Epsilon arcs are relaxed after the emitting arcs of each row, in
/// topological order over the epsilon-only subgraph. Tie break: a candidate
/// replaces the incumbent only when strictly greater, and arcs are scanned in
/// ascending arc id, so at equal scores the earliest-relaxed candidate wins
/// (emitting before epsilon, then lowest arc id). This makes repeated runs on
/// identical input bit-identical.
pub fn forward_pass(
    graph: &Graph,
    scores: &ScoreMatrix,
    acoustic_weight: f64,
    chart: &mut Chart,
) -> Result<(), DecodeError> {
    let frames = scores.frames();
    if frames > 0 && graph.num_output_dists() > scores.num_dists() {
        return Err(DecodeError::malformed(format!(
            "graph references {} output distributions but score matrix has {}",
            graph.num_output_dists(),
            scores.num_dists()
        )));
    }

    chart.reset(frames, graph.num_nodes());

    for &(node, weight) in graph.starts() {
        if weight > chart.get(0, node).log_prob {
            chart.set(
                0,
                node,
                VitCell {
                    log_prob: weight,
                    arc_id: None,
                },
            );
        }
    }
    relax_epsilon(graph, chart, 0);

    for t in 1..=frames {
        for node in 0..graph.num_nodes() {
            let mut best = chart.get(t, node);
            for &arc_id in graph.arcs_into(node) {
                let arc = graph.arc(arc_id);
                let Some(dist) = arc.output_dist else {
                    continue;
                };
                let src_cell = chart.get(t - 1, arc.src);
                if !src_cell.is_reached() {
                    continue;
                }
                let candidate =
                    src_cell.log_prob + arc.weight + acoustic_weight * scores.get(t - 1, dist);
                if candidate > best.log_prob {
                    best = VitCell {
                        log_prob: candidate,
                        arc_id: Some(arc_id),
                    };
                }
            }
            chart.set(t, node, best);
        }
        relax_epsilon(graph, chart, t);
    }

    Ok(())
}

/// Relaxes epsilon arcs at chart row `t`. Processing nodes in epsilon
/// topological order guarantees every source cell is already final.
fn relax_epsilon(graph: &Graph, chart: &mut Chart, t: usize) {
    for &node in graph.epsilon_order() {
        let mut best = chart.get(t, node);
        for &arc_id in graph.arcs_into(node) {
            let arc = graph.arc(arc_id);
            if arc.is_emitting() {
                continue;
            }
            let src_cell = chart.get(t, arc.src);
            if !src_cell.is_reached() {
                continue;
            }
            let candidate = src_cell.log_prob + arc.weight;
            if candidate > best.log_prob {
                best = VitCell {
                    log_prob: candidate,
                    arc_id: Some(arc_id),
                };
            }
        }
        chart.set(t, node, best);
    }
}
