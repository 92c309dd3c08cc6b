//! Pivot selection and the paired reverse/forward search that yields reply paths.

use rand::seq::SliceRandom;
use rand::Rng;
use rustc_hash::FxHashSet;

use crate::graph::{Direction, EdgeId, GraphStore, PathSearch, TokenId};

/// Tokens a reply may be anchored on: known input words plus anything sharing a stem
/// with an input word. Falls back to babbling when the input offers nothing.
pub fn pivot_candidates(graph: &dyn GraphStore, tokens: &[String], babble_count: usize) -> Vec<TokenId> {
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let unique: Vec<String> = tokens
        .iter()
        .filter(|t| seen.insert(t.as_str()))
        .cloned()
        .collect();

    let mut pivots = graph.filter_pivots(&unique);
    for token in &unique {
        for id in graph.tokens_by_stem(token) {
            if !pivots.contains(&id) {
                pivots.push(id);
            }
        }
    }

    if pivots.is_empty() {
        pivots = babble(graph, babble_count);
    }
    pivots
}

/// Sample up to `count` random vocabulary tokens.
pub fn babble(graph: &dyn GraphStore, count: usize) -> Vec<TokenId> {
    let end = graph.end_token();
    (0..count)
        .filter_map(|_| graph.random_token())
        .filter(|&t| t != end && !t.is_space())
        .collect()
}

/// Join a reverse path (pivot back to start) with a forward path (pivot to end) into
/// one path that reads start to end.
pub fn join(rev: &[EdgeId], fwd: &[EdgeId]) -> Vec<EdgeId> {
    let mut edges = Vec::with_capacity(rev.len() + fwd.len());
    edges.extend(rev.iter().rev());
    edges.extend_from_slice(fwd);
    edges
}

/// One search attempt anchored on a randomly chosen pivot node. Yields complete
/// reply paths until either direction is exhausted; after that it stays empty and the
/// caller starts a new one.
pub struct ReplySearch<'g> {
    paths: Option<(PathSearch<'g>, PathSearch<'g>)>,
}

impl<'g> ReplySearch<'g> {
    pub fn start(graph: &'g dyn GraphStore, pivots: &[TokenId], rng: &mut impl Rng) -> Self {
        let node = pivots
            .choose(rng)
            .and_then(|&pivot| graph.random_node_with_token(pivot));

        let paths = node.map(|node| {
            let end = graph.end_context();
            (
                graph.search(node, end, Direction::Reverse),
                graph.search(node, end, Direction::Forward),
            )
        });

        Self { paths }
    }
}

impl Iterator for ReplySearch<'_> {
    type Item = Vec<EdgeId>;

    fn next(&mut self) -> Option<Vec<EdgeId>> {
        let (reverse, forward) = self.paths.as_mut()?;
        let rev = reverse.next();
        let fwd = rev.as_ref().and_then(|_| forward.next());

        match (rev, fwd) {
            (Some(rev), Some(fwd)) => Some(join(&rev, &fwd)),
            _ => {
                self.paths = None;
                None
            }
        }
    }
}
