//! Reply values and the deadline-bounded loop that picks the best one.

use rand::Rng;
use std::time::{Duration, Instant};
use tracing::warn;

use crate::config::BrainConfig;
use crate::graph::{EdgeId, GraphStore, TokenId};
use crate::scorer::Scorer;
use crate::search::ReplySearch;

#[derive(Debug, Clone, PartialEq, Eq)]
enum CachedText {
    Pending,
    Rendered(String),
}

/// A candidate reply: a path of edges from the start of context, through a pivot, to
/// the end of context. Its text is rendered on first request and kept.
pub struct Reply<'g> {
    graph: &'g dyn GraphStore,
    edges: Vec<EdgeId>,
    text: CachedText,
}

impl<'g> Reply<'g> {
    pub fn new(graph: &'g dyn GraphStore, edges: Vec<EdgeId>) -> Self {
        Self {
            graph,
            edges,
            text: CachedText::Pending,
        }
    }

    pub fn graph(&self) -> &'g dyn GraphStore {
        self.graph
    }

    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }

    pub fn is_rendered(&self) -> bool {
        matches!(self.text, CachedText::Rendered(_))
    }

    pub fn text(&mut self) -> &str {
        if let CachedText::Pending = self.text {
            self.text = CachedText::Rendered(self.render());
        }
        match &self.text {
            CachedText::Rendered(text) => text,
            CachedText::Pending => "",
        }
    }

    pub fn into_text(mut self) -> String {
        self.text();
        match self.text {
            CachedText::Rendered(text) => text,
            CachedText::Pending => String::new(),
        }
    }

    fn render(&self) -> String {
        let mut out = String::new();
        for &edge in &self.edges {
            match self.graph.text_by_edge(edge) {
                Ok((word, has_space)) => {
                    out.push_str(&word);
                    if has_space {
                        out.push(' ');
                    }
                }
                Err(err) => warn!(%edge, error = %err, "could not render reply edge"),
            }
        }
        out
    }
}

/// What one reply call produced, with counters for observability.
#[derive(Debug, Clone)]
pub struct ReplyReport {
    /// Text of the best-scoring candidate, if any candidate was scored
    pub text: Option<String>,
    pub score: Option<f64>,
    /// Candidates scored
    pub attempts: usize,
    /// Searches started (one per pivot node tried)
    pub searches: usize,
    pub elapsed: Duration,
}

/// Pull candidates from successive searches until the budget measured from `started`
/// runs out, keeping the best score.
///
/// The deadline is polled between advances; one slow advance may overrun it.
pub fn select_reply(
    graph: &dyn GraphStore,
    scorer: &dyn Scorer,
    config: &BrainConfig,
    pivots: &[TokenId],
    rng: &mut impl Rng,
    started: Instant,
) -> ReplyReport {
    let deadline = started + config.reply_budget;
    let mut best: Option<(Reply<'_>, f64)> = None;
    let mut attempts = 0;
    let mut searches = 0;

    if !pivots.is_empty() {
        let mut search = ReplySearch::start(graph, pivots, &mut *rng);
        searches += 1;

        while Instant::now() < deadline {
            let Some(edges) = search.next() else {
                search = ReplySearch::start(graph, pivots, &mut *rng);
                searches += 1;
                continue;
            };

            let mut reply = Reply::new(graph, edges);
            if let Some(max) = config.max_reply_len {
                if reply.text().chars().count() > max {
                    continue;
                }
            }

            let score = scorer.score(&reply);
            if score.is_nan() {
                continue;
            }
            attempts += 1;

            let replaces = match &best {
                Some((_, best_score)) => config.tie_break.replaces(score, *best_score),
                None => true,
            };
            if replaces {
                best = Some((reply, score));
            }
        }
    }

    let (text, score) = match best {
        Some((reply, score)) => (Some(reply.into_text()), Some(score)),
        None => (None, None),
    };

    ReplyReport {
        text,
        score,
        attempts,
        searches,
        elapsed: started.elapsed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{MemoryGraph, NodeId};

    #[test]
    fn text_is_rendered_once_and_cached() {
        let mut g = MemoryGraph::in_memory(1, "Cobe").expect("graph");
        let hi = g.get_or_create_token("hi");
        let there = g.get_or_create_token("there");
        let n1 = g.get_or_create_node(&[hi]);
        let n2 = g.get_or_create_node(&[there]);
        let e0 = g.add_edge(NodeId::END_CONTEXT, n1, false);
        let e1 = g.add_edge(n1, n2, true);
        let e2 = g.add_edge(n2, NodeId::END_CONTEXT, false);

        let mut reply = Reply::new(&g, vec![e0, e1, e2]);
        assert!(!reply.is_rendered());
        assert_eq!(reply.text(), "hi there");
        assert!(reply.is_rendered());
        assert_eq!(reply.into_text(), "hi there");
    }

    #[test]
    fn unknown_edges_render_as_empty() {
        let mut g = MemoryGraph::in_memory(1, "Cobe").expect("graph");
        let hi = g.get_or_create_token("hi");
        let n1 = g.get_or_create_node(&[hi]);
        let e0 = g.add_edge(NodeId::END_CONTEXT, n1, false);
        let e1 = g.add_edge(n1, NodeId::END_CONTEXT, false);

        let reply = Reply::new(&g, vec![e0, EdgeId(404), e1]);
        assert_eq!(reply.into_text(), "hi");
    }
}
