use crate::config::DecoderConfig;
use crate::error::DecodeError;
use crate::graph::Graph;
use crate::pipeline::defaults::{
    JsonGraphSource, JsonUtteranceSource, PassThroughScorer, TextOutputSink, WindowFrontEnd,
};
use crate::pipeline::runtime::{BatchDecoder, BatchDecoderParts};
use crate::pipeline::traits::{AcousticScorer, FrontEnd, GraphSource, OutputSink, UtteranceSource};

/// Builds a [`BatchDecoder`] from a config, with injection points for every
/// pipeline seam. Components not supplied fall back to the file-backed
/// defaults derived from the config paths.
pub struct BatchDecoderBuilder {
    config: DecoderConfig,
    front_end: Option<Box<dyn FrontEnd>>,
    scorer: Option<Box<dyn AcousticScorer>>,
    source: Option<Box<dyn UtteranceSource>>,
    graph_source: Option<Box<dyn GraphSource>>,
    sink: Option<Box<dyn OutputSink>>,
}

impl BatchDecoderBuilder {
    pub fn new(config: DecoderConfig) -> Self {
        Self {
            config,
            front_end: None,
            scorer: None,
            source: None,
            graph_source: None,
            sink: None,
        }
    }

    pub fn with_front_end(mut self, front_end: Box<dyn FrontEnd>) -> Self {
        self.front_end = Some(front_end);
        self
    }

    pub fn with_scorer(mut self, scorer: Box<dyn AcousticScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    pub fn with_source(mut self, source: Box<dyn UtteranceSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_graph_source(mut self, graph_source: Box<dyn GraphSource>) -> Self {
        self.graph_source = Some(graph_source);
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn OutputSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> Result<BatchDecoder, DecodeError> {
        if !self.config.acoustic_weight.is_finite() {
            return Err(DecodeError::config("acoustic_weight must be finite"));
        }

        let source: Box<dyn UtteranceSource> = match self.source {
            Some(source) => source,
            None => Box::new(JsonUtteranceSource::open(&self.config.audio_file)?),
        };

        let (graph, graph_source) = if self.config.align_mode {
            let graph_source: Box<dyn GraphSource> = match self.graph_source {
                Some(graph_source) => graph_source,
                None => Box::new(JsonGraphSource::open(&self.config.graph_file)?),
            };
            (None, Some(graph_source))
        } else {
            (Some(Graph::from_file(&self.config.graph_file)?), None)
        };

        let sink: Box<dyn OutputSink> = match self.sink {
            Some(sink) => sink,
            None => Box::new(TextOutputSink::create(&self.config.output_file)?),
        };

        Ok(BatchDecoder::from_parts(BatchDecoderParts {
            front_end: self
                .front_end
                .unwrap_or_else(|| Box::new(WindowFrontEnd::default())),
            scorer: self.scorer.unwrap_or_else(|| Box::new(PassThroughScorer)),
            source,
            graph_source,
            sink,
            acoustic_weight: self.config.acoustic_weight,
            align_mode: self.config.align_mode,
            graph,
        }))
    }
}
