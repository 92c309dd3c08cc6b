use crate::reply::Reply;

/// Rates a candidate reply; higher is better. Must be a pure function of the reply's
/// edges and the (unchanging) store.
pub trait Scorer {
    fn score(&self, reply: &Reply<'_>) -> f64;
}

/// Information content of a reply: how surprising each transition is, measured both
/// forward (given the previous context) and backward (given the next context).
///
/// Long replies are damped so the search doesn't simply favor rambling.
#[derive(Debug, Default, Clone, Copy)]
pub struct CobeScorer;

impl Scorer for CobeScorer {
    fn score(&self, reply: &Reply<'_>) -> f64 {
        let graph = reply.graph();
        let mut info = 0.0;

        for &edge in reply.edges() {
            let Some(weight) = graph.edge_weight(edge) else {
                continue;
            };
            if weight.count == 0 {
                continue;
            }
            let count = weight.count as f64;

            let out = graph.out_weight(weight.prev);
            if out > 0 {
                info -= (count / out as f64).log2();
            }

            let inbound = graph.in_weight(weight.next);
            if inbound > 0 {
                info -= (count / inbound as f64).log2();
            }
        }

        let n = reply.edges().len() as f64;
        if n > 16.0 {
            info /= (n - 1.0).sqrt();
        }
        if n > 32.0 {
            info /= n;
        }

        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphStore, MemoryGraph, NodeId};

    #[test]
    fn certain_transitions_carry_no_information() {
        let mut g = MemoryGraph::in_memory(1, "Cobe").expect("graph");
        let a = g.get_or_create_token("a");
        let na = g.get_or_create_node(&[a]);
        let e1 = g.add_edge(NodeId::END_CONTEXT, na, false);
        let e2 = g.add_edge(na, NodeId::END_CONTEXT, false);

        let reply = Reply::new(&g, vec![e1, e2]);
        assert_eq!(CobeScorer.score(&reply), 0.0);
    }

    #[test]
    fn rarer_branches_score_higher() {
        let mut g = MemoryGraph::in_memory(1, "Cobe").expect("graph");
        let a = g.get_or_create_token("a");
        let b = g.get_or_create_token("b");
        let na = g.get_or_create_node(&[a]);
        let nb = g.get_or_create_node(&[b]);
        let end = NodeId::END_CONTEXT;
        let common = g.add_edge(end, na, false);
        g.add_edge(end, na, false);
        g.add_edge(end, na, false);
        let rare = g.add_edge(end, nb, false);
        let a_end = g.add_edge(na, end, false);
        let b_end = g.add_edge(nb, end, false);

        let usual = Reply::new(&g, vec![common, a_end]);
        let unusual = Reply::new(&g, vec![rare, b_end]);
        assert!(CobeScorer.score(&unusual) > CobeScorer.score(&usual));
    }

    #[test]
    fn empty_reply_scores_zero() {
        let g = MemoryGraph::in_memory(1, "Cobe").expect("graph");
        assert_eq!(CobeScorer.score(&Reply::new(&g, Vec::new())), 0.0);
    }
}
