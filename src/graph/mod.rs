//! The graph store seam: identities for tokens, nodes and edges, and the capabilities
//! the learner and reply engine consume from a store.

pub mod memory;
pub mod walk;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

pub use memory::MemoryGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenId(pub u32);

impl TokenId {
    /// Marks "a space follows the previous token" in a learning stream. Never stored.
    pub const SPACE: TokenId = TokenId(u32::MAX);
    /// The empty end-of-token text, padding both ends of every chain.
    pub const END: TokenId = TokenId(0);

    pub fn is_space(self) -> bool {
        self == Self::SPACE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The node made of `order` end tokens: every reply starts and stops here.
    pub const END_CONTEXT: NodeId = NodeId(0);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(pub u32);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Follow outgoing edges toward the end of a reply
    Forward,
    /// Follow incoming edges back toward the start of a reply
    Reverse,
}

/// Stored view of one edge, used by scorers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeWeight {
    pub prev: NodeId,
    pub next: NodeId,
    pub has_space: bool,
    pub count: u64,
}

/// A lazy, possibly infinite producer of edge paths. `None` means the search is
/// exhausted and will not produce again.
pub type PathSearch<'a> = Box<dyn Iterator<Item = Vec<EdgeId>> + 'a>;

/// Everything the brain needs from persistent graph storage.
///
/// Read operations take `&self`: replies never mutate the store, and path searches
/// borrow it for their lifetime. Stores that sample randomly keep their own source.
pub trait GraphStore {
    fn info(&self, key: &str) -> Result<String>;

    fn set_info(&mut self, key: &str, value: &str);

    fn order(&self) -> usize;

    fn get_or_create_token(&mut self, text: &str) -> TokenId;

    fn get_or_create_node(&mut self, tokens: &[TokenId]) -> NodeId;

    /// Create the edge, or bump its weight if it already exists.
    fn add_edge(&mut self, prev: NodeId, next: NodeId, has_space: bool) -> EdgeId;

    fn end_token(&self) -> TokenId {
        TokenId::END
    }

    fn end_context(&self) -> NodeId {
        NodeId::END_CONTEXT
    }

    /// Known tokens from `tokens` that may anchor a reply.
    fn filter_pivots(&self, tokens: &[String]) -> Vec<TokenId>;

    fn tokens_by_stem(&self, word: &str) -> Vec<TokenId>;

    fn random_token(&self) -> Option<TokenId>;

    fn random_node_with_token(&self, token: TokenId) -> Option<NodeId>;

    fn search(&self, start: NodeId, end: NodeId, direction: Direction) -> PathSearch<'_>;

    /// The word an edge contributes to a reply, and whether a space follows it.
    fn text_by_edge(&self, edge: EdgeId) -> Result<(String, bool)>;

    fn edge_weight(&self, edge: EdgeId) -> Option<EdgeWeight>;

    /// Total weight of edges leaving `node`.
    fn out_weight(&self, node: NodeId) -> u64;

    /// Total weight of edges entering `node`.
    fn in_weight(&self, node: NodeId) -> u64;

    /// Flush and release the store.
    fn close(&mut self) -> Result<()>;
}
