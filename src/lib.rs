pub mod config;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod search;
pub mod types;

pub use config::DecoderConfig;
pub use error::DecodeError;
pub use graph::{ArcId, Graph, GraphArc, NodeId};
pub use pipeline::builder::BatchDecoderBuilder;
pub use pipeline::runtime::{BatchDecoder, DecodedUtterance, LoopState};
pub use pipeline::traits::{AcousticScorer, FrontEnd, GraphSource, OutputSink, UtteranceSource};
pub use search::backtrace::{backtrace, best_final_cell, BestPath};
pub use search::chart::{Chart, VitCell, ZERO_LOG_PROB};
pub use search::forward::forward_pass;
pub use types::{RunStats, ScoreMatrix, Utterance, UtteranceOutput, UtteranceRecord};
