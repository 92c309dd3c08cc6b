//! Turning a learned token stream into n-gram edges.

use std::collections::VecDeque;

use crate::graph::TokenId;

/// One transition between two `order`-wide windows of a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainEdge {
    pub prev: Vec<TokenId>,
    pub next: Vec<TokenId>,
    /// A space separates the last two tokens of `next`
    pub has_space: bool,
}

/// Pad `ids` with `order` end tokens on both sides, so every real token sits in at
/// least one full context and replies can start and stop at the boundary.
pub fn to_chain(order: usize, ids: &[TokenId], end: TokenId) -> Vec<TokenId> {
    let mut chain = Vec::with_capacity(ids.len() + 2 * order);
    chain.extend(std::iter::repeat(end).take(order));
    chain.extend_from_slice(ids);
    chain.extend(std::iter::repeat(end).take(order));
    chain
}

/// Slide an `order`-wide window over `ids`, one edge per step.
///
/// `TokenId::SPACE` entries are removed first; each run of them becomes a flag on the
/// edge whose `next` window ends with the token that followed the run.
pub fn to_edges(order: usize, ids: &[TokenId]) -> Vec<ChainEdge> {
    let mut tokens: Vec<TokenId> = Vec::with_capacity(ids.len());
    // positions in `tokens` that were preceded by a space
    let mut spaces: VecDeque<usize> = VecDeque::new();

    let mut stream = ids.iter().copied().peekable();
    while let Some(id) = stream.next() {
        if id.is_space() {
            continue;
        }
        tokens.push(id);

        if stream.peek().is_some_and(|t| t.is_space()) {
            spaces.push_back(tokens.len());
            while stream.peek().is_some_and(|t| t.is_space()) {
                stream.next();
            }
        }
    }

    if order == 0 || tokens.len() < order + 1 {
        return Vec::new();
    }

    let mut edges = Vec::with_capacity(tokens.len() - order);
    for i in 1..=tokens.len() - order {
        let last = i + order - 1;
        while spaces.front().is_some_and(|&p| p < last) {
            spaces.pop_front();
        }
        let has_space = spaces.front() == Some(&last);
        if has_space {
            spaces.pop_front();
        }

        edges.push(ChainEdge {
            prev: tokens[i - 1..i - 1 + order].to_vec(),
            next: tokens[i..i + order].to_vec(),
            has_space,
        });
    }

    edges
}
