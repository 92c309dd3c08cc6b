//! In-memory graph store with single-file persistence (bincode, zstd-compressed).

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::cell::{RefCell, RefMut};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::walk::RandomWalk;
use super::{Direction, EdgeId, EdgeWeight, GraphStore, NodeId, PathSearch, TokenId};
use crate::config::BRAIN_VERSION;
use crate::error::{BrainError, Result};
use crate::stem::Stemmer;
use crate::tokenizer::is_word_token;

const COMPRESSION_LEVEL: i32 = 10;

#[derive(Serialize, Deserialize, Clone, Copy, Debug)]
pub(crate) struct EdgeRecord {
    pub prev: NodeId,
    pub next: NodeId,
    pub has_space: bool,
    pub count: u64,
}

/// The persisted part of the graph. Lookup indexes are rebuilt on load.
#[derive(Serialize, Deserialize, Clone, Default)]
struct GraphData {
    order: usize,
    info: BTreeMap<String, String>,
    tokens: Vec<String>,
    nodes: Vec<Vec<TokenId>>,
    edges: Vec<EdgeRecord>,
    stemmer: Option<Stemmer>,
}

pub struct MemoryGraph {
    data: GraphData,
    path: Option<PathBuf>,
    dirty: bool,

    token_index: FxHashMap<String, TokenId>,
    node_index: FxHashMap<Vec<TokenId>, NodeId>,
    edge_index: FxHashMap<(NodeId, NodeId, bool), EdgeId>,
    outgoing: Vec<Vec<EdgeId>>,
    incoming: Vec<Vec<EdgeId>>,
    out_totals: Vec<u64>,
    in_totals: Vec<u64>,
    nodes_by_token: Vec<Vec<NodeId>>,
    word_tokens: Vec<TokenId>,
    stems: FxHashMap<String, Vec<TokenId>>,

    rng: RefCell<StdRng>,
}

impl MemoryGraph {
    /// A fresh graph holding only the end token and the end-of-context node.
    pub fn in_memory(order: usize, tokenizer: &str) -> Result<Self> {
        if order == 0 {
            return Err(BrainError::InvalidOrder { order });
        }

        let mut info = BTreeMap::new();
        info.insert("version".to_string(), BRAIN_VERSION.to_string());
        info.insert("tokenizer".to_string(), tokenizer.to_string());
        info.insert("order".to_string(), order.to_string());

        let mut graph = Self::blank(order, info, None, None);
        let end = graph.get_or_create_token("");
        let end_context = graph.get_or_create_node(&vec![end; order]);
        debug_assert_eq!(end, TokenId::END);
        debug_assert_eq!(end_context, NodeId::END_CONTEXT);
        Ok(graph)
    }

    /// Create a new brain file at `path`, replacing any existing one.
    pub fn create(path: impl AsRef<Path>, order: usize, tokenizer: &str) -> Result<Self> {
        let mut graph = Self::in_memory(order, tokenizer)?;
        graph.path = Some(path.as_ref().to_path_buf());
        graph.save()?;
        info!(path = %path.as_ref().display(), order, tokenizer, "created brain");
        Ok(graph)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let compressed = fs::read(path)?;
        let serialized = zstd::decode_all(&compressed[..])?;
        let data: GraphData = bincode::deserialize(&serialized)?;
        let graph = Self::from_data(data, Some(path.to_path_buf()))?;
        info!(
            path = %path.display(),
            tokens = graph.token_count(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "opened brain"
        );
        Ok(graph)
    }

    /// Reseed the sampling source (pivot nodes, babbling, walks).
    pub fn with_seed(self, seed: u64) -> Self {
        self.rng.replace(StdRng::seed_from_u64(seed));
        self
    }

    fn blank(
        order: usize,
        info: BTreeMap<String, String>,
        stemmer: Option<Stemmer>,
        path: Option<PathBuf>,
    ) -> Self {
        Self {
            data: GraphData {
                order,
                info,
                stemmer,
                ..GraphData::default()
            },
            path,
            dirty: false,
            token_index: FxHashMap::default(),
            node_index: FxHashMap::default(),
            edge_index: FxHashMap::default(),
            outgoing: Vec::new(),
            incoming: Vec::new(),
            out_totals: Vec::new(),
            in_totals: Vec::new(),
            nodes_by_token: Vec::new(),
            word_tokens: Vec::new(),
            stems: FxHashMap::default(),
            rng: RefCell::new(StdRng::from_entropy()),
        }
    }

    /// Rebuild a graph and its indexes from loaded data. Ids in the data are checked
    /// before they are used as indexes.
    fn from_data(data: GraphData, path: Option<PathBuf>) -> Result<Self> {
        let order = data.order;
        if order == 0 {
            return Err(BrainError::InvalidOrder { order });
        }
        if data.tokens.first().map(String::as_str) != Some("") {
            return Err(corrupt("missing end token"));
        }
        if data.nodes.first() != Some(&vec![TokenId::END; order]) {
            return Err(corrupt("missing end-of-context node"));
        }

        let mut graph = Self::blank(order, data.info, data.stemmer, path);

        for text in &data.tokens {
            if graph.token_index.contains_key(text.as_str()) {
                return Err(corrupt(format!("duplicate token {text:?}")));
            }
            graph.insert_token(text);
        }

        let token_count = graph.data.tokens.len();
        for tokens in &data.nodes {
            if tokens.len() != order {
                return Err(corrupt(format!(
                    "node of {} tokens in an order {order} brain",
                    tokens.len()
                )));
            }
            if let Some(token) = tokens.iter().find(|t| t.0 as usize >= token_count) {
                return Err(corrupt(format!("node refers to unknown token {}", token.0)));
            }
            if graph.node_index.contains_key(tokens.as_slice()) {
                return Err(corrupt("duplicate node"));
            }
            graph.insert_node(tokens);
        }

        let node_count = graph.data.nodes.len();
        for record in &data.edges {
            if record.prev.0 as usize >= node_count || record.next.0 as usize >= node_count {
                return Err(corrupt(format!(
                    "edge {} -> {} refers to an unknown node",
                    record.prev.0, record.next.0
                )));
            }
            if graph
                .edge_index
                .contains_key(&(record.prev, record.next, record.has_space))
            {
                return Err(corrupt("duplicate edge"));
            }
            let id = graph.insert_edge(record.prev, record.next, record.has_space);
            graph.bump_edge(id, record.count);
        }

        Ok(graph)
    }

    /// Write the brain to its file, if it has one.
    pub fn save(&mut self) -> Result<()> {
        if let Some(path) = self.path.clone() {
            self.save_to(&path)?;
            self.dirty = false;
        }
        Ok(())
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let serialized = bincode::serialize(&self.data)?;
        let compressed = zstd::encode_all(&serialized[..], COMPRESSION_LEVEL)?;
        let size = compressed.len();
        fs::write(path.as_ref(), compressed)?;
        debug!(path = %path.as_ref().display(), size, "saved brain");
        Ok(())
    }

    pub fn stemmer(&self) -> Option<Stemmer> {
        self.data.stemmer
    }

    /// Install (or remove) the stemmer and rebuild the stem index over all word tokens.
    pub fn set_stemmer(&mut self, stemmer: Option<Stemmer>) {
        self.data.stemmer = stemmer;
        self.stems.clear();
        if stemmer.is_some() {
            for id in 1..self.data.tokens.len() {
                let token = TokenId(id as u32);
                self.index_stem(token);
            }
        }
        self.dirty = true;
    }

    /// Number of tokens, including the end token.
    pub fn token_count(&self) -> usize {
        self.data.tokens.len()
    }

    /// Number of nodes, including the end-of-context node.
    pub fn node_count(&self) -> usize {
        self.data.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.data.edges.len()
    }

    pub fn token_id(&self, text: &str) -> Option<TokenId> {
        self.token_index.get(text).copied()
    }

    pub fn token_text(&self, token: TokenId) -> Option<&str> {
        self.data.tokens.get(token.0 as usize).map(String::as_str)
    }

    pub fn node_id(&self, tokens: &[TokenId]) -> Option<NodeId> {
        self.node_index.get(tokens).copied()
    }

    pub fn node_tokens(&self, node: NodeId) -> Option<&[TokenId]> {
        self.data.nodes.get(node.0 as usize).map(Vec::as_slice)
    }

    pub fn edge_id(&self, prev: NodeId, next: NodeId, has_space: bool) -> Option<EdgeId> {
        self.edge_index.get(&(prev, next, has_space)).copied()
    }

    pub(crate) fn edge_record(&self, edge: EdgeId) -> Option<&EdgeRecord> {
        self.data.edges.get(edge.0 as usize)
    }

    pub(crate) fn adjacent(&self, node: NodeId, direction: Direction) -> &[EdgeId] {
        let lists = match direction {
            Direction::Forward => &self.outgoing,
            Direction::Reverse => &self.incoming,
        };
        lists.get(node.0 as usize).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn rng(&self) -> RefMut<'_, StdRng> {
        self.rng.borrow_mut()
    }

    fn insert_token(&mut self, text: &str) -> TokenId {
        let id = TokenId(self.data.tokens.len() as u32);
        self.data.tokens.push(text.to_string());
        self.token_index.insert(text.to_string(), id);
        self.nodes_by_token.push(Vec::new());
        if is_word_token(text) {
            self.word_tokens.push(id);
        }
        self.index_stem(id);
        id
    }

    fn index_stem(&mut self, token: TokenId) {
        let Some(stemmer) = self.data.stemmer else {
            return;
        };
        let Some(text) = self.data.tokens.get(token.0 as usize) else {
            return;
        };
        if !is_word_token(text) {
            return;
        }
        self.stems.entry(stemmer.stem(text)).or_default().push(token);
    }

    fn insert_node(&mut self, tokens: &[TokenId]) -> NodeId {
        let id = NodeId(self.data.nodes.len() as u32);
        self.data.nodes.push(tokens.to_vec());
        self.node_index.insert(tokens.to_vec(), id);
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        self.out_totals.push(0);
        self.in_totals.push(0);

        let mut seen: Vec<TokenId> = Vec::with_capacity(tokens.len());
        for &token in tokens {
            if seen.contains(&token) {
                continue;
            }
            seen.push(token);
            if let Some(list) = self.nodes_by_token.get_mut(token.0 as usize) {
                list.push(id);
            }
        }
        id
    }

    fn insert_edge(&mut self, prev: NodeId, next: NodeId, has_space: bool) -> EdgeId {
        let id = EdgeId(self.data.edges.len() as u32);
        self.data.edges.push(EdgeRecord {
            prev,
            next,
            has_space,
            count: 0,
        });
        self.edge_index.insert((prev, next, has_space), id);
        self.outgoing[prev.0 as usize].push(id);
        self.incoming[next.0 as usize].push(id);
        id
    }

    fn bump_edge(&mut self, edge: EdgeId, by: u64) {
        let record = &mut self.data.edges[edge.0 as usize];
        record.count += by;
        self.out_totals[record.prev.0 as usize] += by;
        self.in_totals[record.next.0 as usize] += by;
    }
}

fn corrupt(reason: impl Into<String>) -> BrainError {
    BrainError::Corrupt {
        reason: reason.into(),
    }
}

impl GraphStore for MemoryGraph {
    fn info(&self, key: &str) -> Result<String> {
        self.data
            .info
            .get(key)
            .cloned()
            .ok_or_else(|| BrainError::MissingInfo {
                key: key.to_string(),
            })
    }

    fn set_info(&mut self, key: &str, value: &str) {
        self.data.info.insert(key.to_string(), value.to_string());
        self.dirty = true;
    }

    fn order(&self) -> usize {
        self.data.order
    }

    fn get_or_create_token(&mut self, text: &str) -> TokenId {
        if let Some(&id) = self.token_index.get(text) {
            return id;
        }
        self.dirty = true;
        self.insert_token(text)
    }

    fn get_or_create_node(&mut self, tokens: &[TokenId]) -> NodeId {
        debug_assert_eq!(tokens.len(), self.data.order);
        if let Some(&id) = self.node_index.get(tokens) {
            return id;
        }
        self.dirty = true;
        self.insert_node(tokens)
    }

    fn add_edge(&mut self, prev: NodeId, next: NodeId, has_space: bool) -> EdgeId {
        let id = match self.edge_index.get(&(prev, next, has_space)) {
            Some(&id) => id,
            None => self.insert_edge(prev, next, has_space),
        };
        self.bump_edge(id, 1);
        self.dirty = true;
        id
    }

    fn filter_pivots(&self, tokens: &[String]) -> Vec<TokenId> {
        let mut pivots = Vec::new();
        for text in tokens {
            if !is_word_token(text) {
                continue;
            }
            if let Some(&id) = self.token_index.get(text.as_str()) {
                if !pivots.contains(&id) {
                    pivots.push(id);
                }
            }
        }
        pivots
    }

    fn tokens_by_stem(&self, word: &str) -> Vec<TokenId> {
        match self.data.stemmer {
            Some(stemmer) if is_word_token(word) => self
                .stems
                .get(&stemmer.stem(word))
                .cloned()
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    fn random_token(&self) -> Option<TokenId> {
        self.word_tokens.choose(&mut *self.rng()).copied()
    }

    fn random_node_with_token(&self, token: TokenId) -> Option<NodeId> {
        let nodes = self.nodes_by_token.get(token.0 as usize)?;
        nodes.choose(&mut *self.rng()).copied()
    }

    fn search(&self, start: NodeId, end: NodeId, direction: Direction) -> PathSearch<'_> {
        Box::new(RandomWalk::new(self, start, end, direction))
    }

    fn text_by_edge(&self, edge: EdgeId) -> Result<(String, bool)> {
        let record = self
            .edge_record(edge)
            .ok_or(BrainError::UnknownEdge(edge.0))?;
        let text = self
            .node_tokens(record.prev)
            .and_then(|tokens| tokens.last())
            .and_then(|&token| self.token_text(token))
            .ok_or(BrainError::UnknownEdge(edge.0))?;
        Ok((text.to_string(), record.has_space))
    }

    fn edge_weight(&self, edge: EdgeId) -> Option<EdgeWeight> {
        self.edge_record(edge).map(|r| EdgeWeight {
            prev: r.prev,
            next: r.next,
            has_space: r.has_space,
            count: r.count,
        })
    }

    fn out_weight(&self, node: NodeId) -> u64 {
        self.out_totals.get(node.0 as usize).copied().unwrap_or(0)
    }

    fn in_weight(&self, node: NodeId) -> u64 {
        self.in_totals.get(node.0 as usize).copied().unwrap_or(0)
    }

    fn close(&mut self) -> Result<()> {
        if self.dirty {
            self.save()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> MemoryGraph {
        MemoryGraph::in_memory(2, "Cobe").expect("graph").with_seed(1)
    }

    #[test]
    fn fresh_graph_has_end_token_and_context() {
        let g = graph();
        assert_eq!(g.token_count(), 1);
        assert_eq!(g.node_count(), 1);
        assert_eq!(g.edge_count(), 0);
        assert_eq!(g.token_text(TokenId::END), Some(""));
        assert_eq!(g.node_tokens(NodeId::END_CONTEXT), Some(&[TokenId::END, TokenId::END][..]));
        assert_eq!(g.info("version").ok().as_deref(), Some("2"));
        assert_eq!(g.info("tokenizer").ok().as_deref(), Some("Cobe"));
        assert!(matches!(g.info("nope"), Err(BrainError::MissingInfo { .. })));
    }

    #[test]
    fn zero_order_is_rejected() {
        assert!(matches!(
            MemoryGraph::in_memory(0, "Cobe"),
            Err(BrainError::InvalidOrder { order: 0 })
        ));
    }

    #[test]
    fn tokens_and_nodes_are_interned() {
        let mut g = graph();
        let a = g.get_or_create_token("a");
        assert_eq!(g.get_or_create_token("a"), a);
        let b = g.get_or_create_token("b");
        assert_ne!(a, b);

        let ab = g.get_or_create_node(&[a, b]);
        assert_eq!(g.get_or_create_node(&[a, b]), ab);
        assert_ne!(g.get_or_create_node(&[b, a]), ab);
    }

    #[test]
    fn repeated_edges_increment_weight() {
        let mut g = graph();
        let a = g.get_or_create_token("a");
        let n = g.get_or_create_node(&[a, a]);
        let e1 = g.add_edge(NodeId::END_CONTEXT, n, false);
        let e2 = g.add_edge(NodeId::END_CONTEXT, n, false);
        let spaced = g.add_edge(NodeId::END_CONTEXT, n, true);
        assert_eq!(e1, e2);
        assert_ne!(e1, spaced);
        assert_eq!(g.edge_weight(e1).map(|w| w.count), Some(2));
        assert_eq!(g.out_weight(NodeId::END_CONTEXT), 3);
        assert_eq!(g.in_weight(n), 3);
    }

    #[test]
    fn pivots_are_known_word_tokens() {
        let mut g = graph();
        let hello = g.get_or_create_token("hello");
        g.get_or_create_token("!");
        let tokens: Vec<String> = ["hello", " ", "!", "unknown", "hello"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(g.filter_pivots(&tokens), vec![hello]);
    }

    #[test]
    fn stems_are_indexed_before_and_after_install() {
        let mut g = graph();
        let run = g.get_or_create_token("run");
        assert!(g.tokens_by_stem("running").is_empty());

        g.set_stemmer(Some(Stemmer::English));
        let runs = g.get_or_create_token("Runs");
        let mut found = g.tokens_by_stem("running");
        found.sort();
        assert_eq!(found, vec![run, runs]);

        g.set_stemmer(None);
        assert!(g.tokens_by_stem("running").is_empty());
    }

    #[test]
    fn random_sampling_respects_vocabulary() {
        let mut g = graph();
        assert_eq!(g.random_token(), None);

        g.get_or_create_token(".");
        g.get_or_create_token("?!");
        assert_eq!(g.random_token(), None);

        let a = g.get_or_create_token("a");
        for _ in 0..20 {
            assert_eq!(g.random_token(), Some(a));
        }

        let b = g.get_or_create_token("b");
        assert_eq!(g.random_node_with_token(b), None);
        let node = g.get_or_create_node(&[a, b]);
        assert_eq!(g.random_node_with_token(b), Some(node));
        assert_eq!(g.random_node_with_token(a), Some(node));
    }

    #[test]
    fn edge_text_is_last_token_of_prev_node() {
        let mut g = graph();
        let a = g.get_or_create_token("a");
        let b = g.get_or_create_token("b");
        let n1 = g.get_or_create_node(&[TokenId::END, a]);
        let n2 = g.get_or_create_node(&[a, b]);
        let e = g.add_edge(n1, n2, true);
        assert_eq!(g.text_by_edge(e).ok(), Some(("a".to_string(), true)));
        assert!(matches!(g.text_by_edge(EdgeId(99)), Err(BrainError::UnknownEdge(99))));
    }

    #[test]
    fn persists_and_reloads() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("test.brain");

        let mut g = MemoryGraph::create(&path, 2, "MegaHAL").expect("create");
        g.set_stemmer(Some(Stemmer::English));
        let a = g.get_or_create_token("walking");
        let n = g.get_or_create_node(&[TokenId::END, a]);
        g.add_edge(NodeId::END_CONTEXT, n, true);
        g.add_edge(NodeId::END_CONTEXT, n, true);
        g.close().expect("close");

        let loaded = MemoryGraph::open(&path).expect("open");
        assert_eq!(loaded.order(), 2);
        assert_eq!(loaded.info("tokenizer").ok().as_deref(), Some("MegaHAL"));
        assert_eq!(loaded.token_id("walking"), Some(a));
        assert_eq!(loaded.node_id(&[TokenId::END, a]), Some(n));
        assert_eq!(loaded.stemmer(), Some(Stemmer::English));
        assert_eq!(loaded.tokens_by_stem("walked"), vec![a]);
        let e = loaded.edge_id(NodeId::END_CONTEXT, n, true).expect("edge");
        assert_eq!(loaded.edge_weight(e).map(|w| w.count), Some(2));
        assert_eq!(loaded.out_weight(NodeId::END_CONTEXT), 2);
        assert_eq!(loaded.random_node_with_token(a), Some(n));
    }

    fn write_raw(path: &Path, data: &GraphData) {
        let serialized = bincode::serialize(data).expect("serialize");
        let compressed = zstd::encode_all(&serialized[..], COMPRESSION_LEVEL).expect("compress");
        fs::write(path, compressed).expect("write");
    }

    fn raw_data() -> GraphData {
        let mut info = BTreeMap::new();
        info.insert("version".to_string(), BRAIN_VERSION.to_string());
        info.insert("tokenizer".to_string(), "Cobe".to_string());
        GraphData {
            order: 1,
            info,
            tokens: vec![String::new(), "a".to_string()],
            nodes: vec![vec![TokenId::END], vec![TokenId(1)]],
            edges: vec![EdgeRecord {
                prev: NodeId::END_CONTEXT,
                next: NodeId(1),
                has_space: false,
                count: 1,
            }],
            stemmer: None,
        }
    }

    #[test]
    fn malformed_files_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.brain");

        write_raw(&path, &raw_data());
        assert!(MemoryGraph::open(&path).is_ok());

        let mut dangling = raw_data();
        dangling.edges[0].next = NodeId(7);
        let mut no_end = raw_data();
        no_end.tokens.remove(0);
        let mut short_node = raw_data();
        short_node.nodes.push(Vec::new());
        let mut unknown_token = raw_data();
        unknown_token.nodes.push(vec![TokenId(9)]);
        let mut duplicate = raw_data();
        duplicate.tokens.push("a".to_string());

        for data in [dangling, no_end, short_node, unknown_token, duplicate] {
            write_raw(&path, &data);
            assert!(matches!(
                MemoryGraph::open(&path),
                Err(BrainError::Corrupt { .. })
            ));
        }

        fs::write(&path, b"not a brain").expect("write");
        assert!(MemoryGraph::open(&path).is_err());
    }
}
