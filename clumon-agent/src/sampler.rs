//! Status sampler: fetch, classify, update, repeat
//!
//! `StatusSampler` owns the node map and the status source. One sample runs
//! the source to completion, parses its stdout and applies the result; the
//! loop in [`StatusSampler::run`] then sleeps a fixed interval before the
//! next one.

use crate::execution::{SampleError, StatusSource};
use crate::parser::{parse_status, MatchMode};
use crate::status::{NodeStatusMap, Transition};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// Outcome of one sampling iteration
#[derive(Debug, Clone)]
pub struct SampleReport {
    /// Classifications found in the output, overridden ones included
    pub observations: usize,
    pub transitions: Vec<Transition>,
    pub exit_code: Option<i32>,
    pub command_succeeded: bool,
    pub sampled_at: DateTime<Utc>,
}

impl SampleReport {
    /// True when the output mentioned no node at all
    pub fn is_empty(&self) -> bool {
        self.observations == 0
    }
}

pub struct StatusSampler<S> {
    source: S,
    mode: MatchMode,
    nodes: NodeStatusMap,
    stale_after: Option<chrono::Duration>,
    samples_taken: u64,
}

impl<S> StatusSampler<S> {
    pub fn new(source: S, mode: MatchMode) -> Self {
        Self {
            source,
            mode,
            nodes: NodeStatusMap::new(),
            stale_after: None,
            samples_taken: 0,
        }
    }

    /// Start from an existing map instead of an empty one
    pub fn with_nodes(mut self, nodes: NodeStatusMap) -> Self {
        self.nodes = nodes;
        self
    }

    /// Warn about nodes not reported for longer than `max_age`
    pub fn with_stale_after(mut self, max_age: Option<chrono::Duration>) -> Self {
        self.stale_after = max_age;
        self
    }

    pub fn nodes(&self) -> &NodeStatusMap {
        &self.nodes
    }

    pub fn into_nodes(self) -> NodeStatusMap {
        self.nodes
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn samples_taken(&self) -> u64 {
        self.samples_taken
    }

    /// Parse status text and fold it into the node map.
    ///
    /// Nodes not mentioned in `text` keep their previous entry.
    pub fn ingest(&mut self, text: &str, at: DateTime<Utc>) -> SampleReport {
        let observations = parse_status(text, self.mode);

        for observation in &observations {
            debug!("Node {} is {}", observation.node, observation.section.describe());
        }
        if observations.is_empty() {
            debug!("No node sections matched in status output");
        }

        let transitions = self.nodes.apply(
            observations.iter().map(|o| (o.node.as_str(), o.status)),
            at,
        );
        for transition in &transitions {
            match transition.from {
                Some(from) => info!("Node {} changed from {} to {}", transition.node, from, transition.to),
                None => info!("Node {} first seen as {}", transition.node, transition.to),
            }
        }

        if let Some(max_age) = self.stale_after {
            let stale = self.nodes.stale_nodes(at, max_age);
            if !stale.is_empty() {
                warn!(
                    "{} node(s) not reported for more than {}s: {}",
                    stale.len(),
                    max_age.num_seconds(),
                    stale.join(", ")
                );
            }
        }

        self.samples_taken += 1;

        SampleReport {
            observations: observations.len(),
            transitions,
            exit_code: None,
            command_succeeded: true,
            sampled_at: at,
        }
    }
}

impl<S: StatusSource> StatusSampler<S> {
    /// Run the status source once and apply its output.
    ///
    /// A non-zero exit is logged and its stdout parsed anyway. On error the
    /// node map is left untouched.
    pub async fn sample(&mut self) -> Result<SampleReport, SampleError> {
        let output = self.source.fetch().await?;

        if !output.success {
            warn!(
                "Status command exited with {:?}: {}",
                output.exit_code,
                output.stderr.trim()
            );
        }

        let mut report = self.ingest(&output.stdout, Utc::now());
        report.exit_code = output.exit_code;
        report.command_succeeded = output.success;

        let summary = self.nodes.summary();
        info!(
            "Sample #{} done in {}ms - online: {}, standby: {}, offline: {}, changed: {}",
            self.samples_taken,
            output.execution_time_ms,
            summary.online,
            summary.standby,
            summary.offline,
            report.transitions.len()
        );
        match serde_json::to_string(&self.nodes) {
            Ok(snapshot) => trace!("Node map: {}", snapshot),
            Err(e) => debug!("Failed to serialize node map: {}", e),
        }

        Ok(report)
    }

    /// Sample every `interval` until `shutdown` resolves.
    ///
    /// Each sample completes before the sleep starts. Fatal errors end the
    /// loop and are returned; other errors skip the iteration.
    pub async fn run<F>(&mut self, interval: Duration, shutdown: F) -> Result<(), SampleError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!("Starting sampling loop (interval: {}s)", interval.as_secs());

        loop {
            let outcome = tokio::select! {
                outcome = self.sample() => outcome,
                _ = &mut shutdown => {
                    info!("Shutdown requested during sample, stopping sampler");
                    return Ok(());
                }
            };

            match outcome {
                Ok(_) => {}
                Err(e) if e.is_fatal() => {
                    error!("Sampling aborted: {}", e);
                    return Err(e);
                }
                Err(e) => warn!("Sample skipped: {}", e),
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping sampler after {} samples", self.samples_taken);
                    return Ok(());
                }
            }
        }
    }
}
