//! Markov chain reply engine.
//!
//! A [`Brain`] learns token transitions from text into an n-gram graph and replies by
//! walking that graph outward from a pivot word of the input: backward to the start of
//! context, forward to its end. Candidates are scored and the best one found within a
//! time budget wins.

pub mod brain;
pub mod chain;
pub mod config;
pub mod corpus;
pub mod error;
pub mod graph;
pub mod reply;
pub mod scorer;
pub mod search;
pub mod stem;
pub mod tokenizer;

pub use brain::Brain;
pub use config::{BrainConfig, TieBreak, NO_REPLY};
pub use error::{BrainError, Result};
pub use graph::{Direction, EdgeId, GraphStore, MemoryGraph, NodeId, PathSearch, TokenId};
pub use reply::{Reply, ReplyReport};
pub use scorer::{CobeScorer, Scorer};
pub use stem::Stemmer;
pub use tokenizer::{CobeTokenizer, MegaHalTokenizer, Tokenizer};
