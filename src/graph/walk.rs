use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use super::memory::MemoryGraph;
use super::{Direction, EdgeId, NodeId};

/// Walks longer than this are abandoned as cycling.
pub const MAX_WALK_EDGES: usize = 128;
/// Consecutive failed walks before a search reports exhaustion.
pub const MAX_WALK_FAILURES: usize = 8;

/// Weighted random walk from `start` to `end`, re-run on each advance.
///
/// Weights are learned edge counts, so frequent transitions are followed more often.
/// Paths are emitted in traversal order: a reverse walk lists the edge touching `start`
/// first.
pub struct RandomWalk<'a> {
    graph: &'a MemoryGraph,
    start: NodeId,
    end: NodeId,
    direction: Direction,
    exhausted: bool,
}

impl<'a> RandomWalk<'a> {
    pub fn new(graph: &'a MemoryGraph, start: NodeId, end: NodeId, direction: Direction) -> Self {
        let exhausted = start != end && graph.adjacent(start, direction).is_empty();
        Self {
            graph,
            start,
            end,
            direction,
            exhausted,
        }
    }

    fn walk_once(&self, rng: &mut impl Rng) -> Option<Vec<EdgeId>> {
        let mut path = Vec::new();
        let mut node = self.start;

        while node != self.end {
            if path.len() >= MAX_WALK_EDGES {
                return None;
            }

            let choices = self.graph.adjacent(node, self.direction);
            let edge = weighted_edge(self.graph, choices, rng)?;
            let record = self.graph.edge_record(edge)?;

            path.push(edge);
            node = match self.direction {
                Direction::Forward => record.next,
                Direction::Reverse => record.prev,
            };
        }

        Some(path)
    }
}

impl Iterator for RandomWalk<'_> {
    type Item = Vec<EdgeId>;

    fn next(&mut self) -> Option<Vec<EdgeId>> {
        if self.exhausted {
            return None;
        }

        let mut rng = self.graph.rng();
        for _ in 0..MAX_WALK_FAILURES {
            if let Some(path) = self.walk_once(&mut *rng) {
                return Some(path);
            }
        }

        self.exhausted = true;
        None
    }
}

fn weighted_edge(graph: &MemoryGraph, choices: &[EdgeId], rng: &mut impl Rng) -> Option<EdgeId> {
    match choices {
        [] => None,
        [only] => Some(*only),
        _ => {
            let weights: Vec<u64> = choices
                .iter()
                .map(|&e| graph.edge_record(e).map_or(0, |r| r.count))
                .collect();
            let dist = WeightedIndex::new(&weights).ok()?;
            Some(choices[dist.sample(rng)])
        }
    }
}
