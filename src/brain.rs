use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

use crate::chain::{to_chain, to_edges};
use crate::config::{BrainConfig, BRAIN_VERSION, NO_REPLY};
use crate::error::{BrainError, Result};
use crate::graph::{GraphStore, MemoryGraph, NodeId, TokenId};
use crate::reply::{select_reply, ReplyReport};
use crate::scorer::{CobeScorer, Scorer};
use crate::search::pivot_candidates;
use crate::stem::Stemmer;
use crate::tokenizer::{tokenizer_by_name, Tokenizer, SPACE};

/// A Markov chain text generator over a learned n-gram graph.
///
/// `learn` grows the graph; `reply` searches it for the best-scoring path through a
/// pivot word from the input within a fixed time budget. Not synchronized: a brain
/// owns its store exclusively.
pub struct Brain<S: GraphStore = MemoryGraph> {
    graph: S,
    tokenizer: Box<dyn Tokenizer>,
    scorer: Box<dyn Scorer>,
    config: BrainConfig,
    rng: StdRng,
}

impl Brain<MemoryGraph> {
    /// Create a new, empty brain file.
    pub fn init(path: impl AsRef<Path>, order: usize, tokenizer: &str) -> Result<()> {
        let tokenizer = tokenizer_by_name(tokenizer)?;
        let mut graph = MemoryGraph::create(path, order, tokenizer.name())?;
        graph.close()
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, BrainConfig::default())
    }

    pub fn open_with(path: impl AsRef<Path>, config: BrainConfig) -> Result<Self> {
        let mut graph = MemoryGraph::open(path)?;
        if let Some(seed) = config.seed {
            graph = graph.with_seed(seed);
        }
        Self::with_store(graph, config)
    }

    /// Install a stemmer by name (`None` removes it) and re-index the vocabulary.
    pub fn set_stemmer(&mut self, name: Option<&str>) -> Result<()> {
        let stemmer = name.map(Stemmer::from_name).transpose()?;
        self.graph.set_stemmer(stemmer);
        Ok(())
    }
}

impl<S: GraphStore> Brain<S> {
    /// Bind to an opened store, checking its schema version and tokenizer.
    pub fn with_store(graph: S, config: BrainConfig) -> Result<Self> {
        let version = graph.info("version")?;
        if version != BRAIN_VERSION {
            return Err(BrainError::UnsupportedVersion { found: version });
        }

        let tokenizer = tokenizer_by_name(&graph.info("tokenizer")?)?;
        let rng = config
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);

        info!(order = graph.order(), tokenizer = tokenizer.name(), "brain ready");
        Ok(Self {
            graph,
            tokenizer,
            scorer: Box::new(CobeScorer),
            config,
            rng,
        })
    }

    pub fn with_scorer(mut self, scorer: impl Scorer + 'static) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    pub fn graph(&self) -> &S {
        &self.graph
    }

    pub fn config_mut(&mut self) -> &mut BrainConfig {
        &mut self.config
    }

    pub fn tokenizer(&self) -> &dyn Tokenizer {
        self.tokenizer.as_ref()
    }

    /// Release the store, flushing anything it buffers.
    pub fn close(mut self) -> Result<()> {
        self.graph.close()
    }

    /// Learn the transitions in `text`. Inputs with no more real tokens than the
    /// brain's order are ignored.
    pub fn learn(&mut self, text: &str) {
        let tokens = self.tokenizer.split(text);
        let order = self.graph.order();

        let words = tokens.iter().filter(|t| t.as_str() != SPACE).count();
        if words <= order {
            debug!(words, order, "input too short to learn");
            return;
        }

        let ids: Vec<TokenId> = tokens
            .iter()
            .map(|token| {
                if token == SPACE {
                    TokenId::SPACE
                } else {
                    self.graph.get_or_create_token(token)
                }
            })
            .collect();

        let chain = to_chain(order, &ids, self.graph.end_token());
        let mut prev_node: Option<NodeId> = None;
        for edge in to_edges(order, &chain) {
            let prev = match prev_node {
                Some(node) => node,
                None => self.graph.get_or_create_node(&edge.prev),
            };
            let next = self.graph.get_or_create_node(&edge.next);
            self.graph.add_edge(prev, next, edge.has_space);
            prev_node = Some(next);
        }
    }

    /// Best reply to `text` found within the reply budget, or `NO_REPLY`.
    pub fn reply(&mut self, text: &str) -> String {
        self.reply_report(text)
            .text
            .unwrap_or_else(|| NO_REPLY.to_string())
    }

    pub fn reply_report(&mut self, text: &str) -> ReplyReport {
        let started = Instant::now();
        let tokens = self.tokenizer.split(text);

        let graph: &dyn GraphStore = &self.graph;
        let pivots = pivot_candidates(graph, &tokens, self.config.babble_count);
        if pivots.is_empty() {
            debug!("no pivot candidates");
        }

        let report = select_reply(
            graph,
            self.scorer.as_ref(),
            &self.config,
            &pivots,
            &mut self.rng,
            started,
        );

        debug!(
            pivots = pivots.len(),
            attempts = report.attempts,
            searches = report.searches,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "reply finished"
        );
        report
    }
}
