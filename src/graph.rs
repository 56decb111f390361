use std::collections::VecDeque;
use std::path::Path;

use crate::error::DecodeError;

pub type NodeId = usize;
pub type ArcId = usize;

/// Directed, weighted arc of the search graph. An arc without an output
/// distribution id is an epsilon arc and consumes no frame.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct GraphArc {
    pub src: NodeId,
    pub dst: NodeId,
    /// Log-domain transition weight.
    pub weight: f64,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub output_dist: Option<usize>,
}

impl GraphArc {
    pub fn is_emitting(&self) -> bool {
        self.output_dist.is_some()
    }
}

/// Raw JSON shape of a graph file.
#[derive(Debug, Clone, serde::Deserialize)]
pub(crate) struct GraphSpec {
    pub num_nodes: usize,
    #[serde(default)]
    pub start: Vec<StartSpec>,
    #[serde(default, rename = "final")]
    pub finals: Vec<NodeId>,
    #[serde(default)]
    pub arcs: Vec<GraphArc>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub(crate) struct StartSpec {
    pub node: NodeId,
    #[serde(default)]
    pub weight: f64,
}

/// Search graph encoding the HMM topology (and any composed lexicon or
/// grammar). Construction validates ids and weights, indexes incoming arcs
/// per node, and precomputes a topological order of the epsilon-only
/// subgraph; an epsilon cycle is rejected as malformed input.
#[derive(Debug, Clone)]
pub struct Graph {
    num_nodes: usize,
    arcs: Vec<GraphArc>,
    arcs_into: Vec<Vec<ArcId>>,
    starts: Vec<(NodeId, f64)>,
    finals: Vec<NodeId>,
    epsilon_order: Vec<NodeId>,
}

impl Graph {
    pub fn new(
        num_nodes: usize,
        starts: Vec<(NodeId, f64)>,
        finals: Vec<NodeId>,
        arcs: Vec<GraphArc>,
    ) -> Result<Self, DecodeError> {
        for &(node, weight) in &starts {
            if node >= num_nodes {
                return Err(DecodeError::malformed(format!(
                    "start node {node} out of range (num_nodes={num_nodes})"
                )));
            }
            if !weight.is_finite() {
                return Err(DecodeError::malformed(format!(
                    "start node {node} has non-finite weight"
                )));
            }
        }
        for &node in &finals {
            if node >= num_nodes {
                return Err(DecodeError::malformed(format!(
                    "final node {node} out of range (num_nodes={num_nodes})"
                )));
            }
        }
        for (arc_id, arc) in arcs.iter().enumerate() {
            if arc.src >= num_nodes || arc.dst >= num_nodes {
                return Err(DecodeError::malformed(format!(
                    "arc {arc_id} references node out of range (num_nodes={num_nodes})"
                )));
            }
            if !arc.weight.is_finite() {
                return Err(DecodeError::malformed(format!(
                    "arc {arc_id} has non-finite weight"
                )));
            }
        }

        let mut arcs_into: Vec<Vec<ArcId>> = vec![Vec::new(); num_nodes];
        for (arc_id, arc) in arcs.iter().enumerate() {
            arcs_into[arc.dst].push(arc_id);
        }

        let mut finals = finals;
        finals.sort_unstable();
        finals.dedup();

        let epsilon_order = epsilon_topo_order(num_nodes, &arcs)?;

        Ok(Self {
            num_nodes,
            arcs,
            arcs_into,
            starts,
            finals,
            epsilon_order,
        })
    }

    pub(crate) fn from_spec(spec: GraphSpec) -> Result<Self, DecodeError> {
        let starts = spec.start.iter().map(|s| (s.node, s.weight)).collect();
        Self::new(spec.num_nodes, starts, spec.finals, spec.arcs)
    }

    pub fn from_json_str(data: &str) -> Result<Self, DecodeError> {
        let spec: GraphSpec =
            serde_json::from_str(data).map_err(|e| DecodeError::json("parse graph", e))?;
        Self::from_spec(spec)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DecodeError> {
        let data = std::fs::read_to_string(path.as_ref())
            .map_err(|e| DecodeError::io("read graph file", e))?;
        Self::from_json_str(&data)
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn num_arcs(&self) -> usize {
        self.arcs.len()
    }

    pub fn arc(&self, arc_id: ArcId) -> &GraphArc {
        &self.arcs[arc_id]
    }

    /// Incoming arc ids for `node`, in ascending arc id order.
    pub fn arcs_into(&self, node: NodeId) -> &[ArcId] {
        &self.arcs_into[node]
    }

    /// Start nodes with their designated initial weights.
    pub fn starts(&self) -> &[(NodeId, f64)] {
        &self.starts
    }

    /// Final nodes, sorted ascending.
    pub fn finals(&self) -> &[NodeId] {
        &self.finals
    }

    /// All nodes in a topological order of the epsilon-only subgraph.
    pub fn epsilon_order(&self) -> &[NodeId] {
        &self.epsilon_order
    }

    /// One past the largest output distribution id referenced by any arc.
    pub fn num_output_dists(&self) -> usize {
        self.arcs
            .iter()
            .filter_map(|arc| arc.output_dist)
            .map(|dist| dist + 1)
            .max()
            .unwrap_or(0)
    }
}

/// Kahn's algorithm over epsilon arcs only. Nodes with no epsilon arcs are
/// included so the returned order covers the whole graph.
fn epsilon_topo_order(num_nodes: usize, arcs: &[GraphArc]) -> Result<Vec<NodeId>, DecodeError> {
    let mut indegree = vec![0usize; num_nodes];
    let mut eps_out: Vec<Vec<NodeId>> = vec![Vec::new(); num_nodes];
    for arc in arcs.iter().filter(|arc| !arc.is_emitting()) {
        indegree[arc.dst] += 1;
        eps_out[arc.src].push(arc.dst);
    }

    let mut queue: VecDeque<NodeId> = (0..num_nodes).filter(|&n| indegree[n] == 0).collect();
    let mut order = Vec::with_capacity(num_nodes);
    while let Some(node) = queue.pop_front() {
        order.push(node);
        for &next in &eps_out[node] {
            indegree[next] -= 1;
            if indegree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    if order.len() != num_nodes {
        return Err(DecodeError::malformed(
            "epsilon-arc cycle in search graph (must be epsilon-acyclic)",
        ));
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emit(src: NodeId, dst: NodeId, dist: usize) -> GraphArc {
        GraphArc {
            src,
            dst,
            weight: 0.0,
            label: None,
            output_dist: Some(dist),
        }
    }

    fn eps(src: NodeId, dst: NodeId) -> GraphArc {
        GraphArc {
            src,
            dst,
            weight: 0.0,
            label: None,
            output_dist: None,
        }
    }

    #[test]
    fn parses_graph_json() {
        let graph = Graph::from_json_str(
            r#"{
                "num_nodes": 3,
                "start": [{"node": 0}],
                "final": [2],
                "arcs": [
                    {"src": 0, "dst": 1, "weight": -0.5, "label": "a", "output_dist": 0},
                    {"src": 1, "dst": 2, "weight": 0.0}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(graph.num_nodes(), 3);
        assert_eq!(graph.starts(), &[(0, 0.0)]);
        assert_eq!(graph.finals(), &[2]);
        assert!(graph.arc(0).is_emitting());
        assert!(!graph.arc(1).is_emitting());
        assert_eq!(graph.num_output_dists(), 1);
    }

    #[test]
    fn rejects_out_of_range_arc() {
        let result = Graph::new(2, vec![(0, 0.0)], vec![1], vec![emit(0, 5, 0)]);
        assert!(matches!(result, Err(DecodeError::Malformed { .. })));
    }

    #[test]
    fn rejects_non_finite_weight() {
        let mut arc = emit(0, 1, 0);
        arc.weight = f64::NEG_INFINITY;
        let result = Graph::new(2, vec![(0, 0.0)], vec![1], vec![arc]);
        assert!(matches!(result, Err(DecodeError::Malformed { .. })));
    }

    #[test]
    fn rejects_epsilon_cycle() {
        let result = Graph::new(2, vec![(0, 0.0)], vec![1], vec![eps(0, 1), eps(1, 0)]);
        assert!(matches!(result, Err(DecodeError::Malformed { .. })));
    }

    #[test]
    fn emitting_cycle_is_fine() {
        let graph = Graph::new(2, vec![(0, 0.0)], vec![1], vec![emit(0, 1, 0), emit(1, 0, 1)])
            .unwrap();
        assert_eq!(graph.epsilon_order().len(), 2);
    }

    #[test]
    fn epsilon_order_puts_sources_first() {
        let graph = Graph::new(3, vec![(0, 0.0)], vec![2], vec![eps(1, 2), eps(0, 1)]).unwrap();
        let pos = |n: NodeId| {
            graph
                .epsilon_order()
                .iter()
                .position(|&x| x == n)
                .unwrap()
        };
        assert!(pos(0) < pos(1));
        assert!(pos(1) < pos(2));
    }

    #[test]
    fn incoming_arcs_stay_in_arc_id_order() {
        let graph = Graph::new(
            3,
            vec![(0, 0.0)],
            vec![2],
            vec![emit(0, 2, 0), emit(1, 2, 0), emit(0, 2, 1)],
        )
        .unwrap();
        assert_eq!(graph.arcs_into(2), &[0, 1, 2]);
    }
}
