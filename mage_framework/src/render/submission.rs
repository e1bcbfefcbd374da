//! Declared per-frame submission chain
//!
//! All inter-submission ordering on the GPU is expressed through semaphores.
//! This module declares the wait/signal pairs of the standard frame as data
//! so the chain can be validated (single linear chain, no cycles, nothing
//! dangling) before the backend creates a single semaphore. The frame
//! scheduler executes exactly this plan every frame.

use crate::error::{Error, Result};

/// Semaphore names used by the standard frame
pub mod semaphore {
    /// Signaled by the swapchain acquire (external to the chain)
    pub const IMAGE_AVAILABLE: &str = "image_available";
    /// Signaled by the compute submission
    pub const COMPUTE_FINISHED: &str = "compute_finished";
    /// Signaled by the forward raster submission
    pub const FORWARD_RENDER_FINISHED: &str = "forward_render_finished";
    /// Signaled by the post-process submission
    pub const POST_PROCESS_FINISHED: &str = "post_process_finished";
    /// Signaled by the UI submission; present waits on it
    pub const RENDER_FINISHED: &str = "render_finished";
}

/// One queue submission (or the present operation) with its declared
/// semaphore waits and signals
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitNode {
    pub name: String,
    pub waits: Vec<String>,
    pub signals: Vec<String>,
}

impl SubmitNode {
    fn new(name: &str, waits: &[&str], signals: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            waits: waits.iter().map(|s| s.to_string()).collect(),
            signals: signals.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// The declared wait/signal graph of one frame
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionPlan {
    /// Semaphores signaled outside the chain (swapchain acquire)
    external_signals: Vec<String>,
    nodes: Vec<SubmitNode>,
}

impl SubmissionPlan {
    /// The standard frame: compute → graphics → post-process → UI → present.
    ///
    /// The post-process submission is the first to touch the swapchain image
    /// (final composite), so it additionally waits on the acquire semaphore.
    pub fn standard() -> Self {
        use semaphore::*;
        Self {
            external_signals: vec![IMAGE_AVAILABLE.to_string()],
            nodes: vec![
                SubmitNode::new("compute", &[], &[COMPUTE_FINISHED]),
                SubmitNode::new("graphics", &[COMPUTE_FINISHED], &[FORWARD_RENDER_FINISHED]),
                SubmitNode::new(
                    "post_process",
                    &[FORWARD_RENDER_FINISHED, IMAGE_AVAILABLE],
                    &[POST_PROCESS_FINISHED],
                ),
                SubmitNode::new("ui", &[POST_PROCESS_FINISHED], &[RENDER_FINISHED]),
                SubmitNode::new("present", &[RENDER_FINISHED], &[]),
            ],
        }
    }

    /// Submissions in execution order
    pub fn nodes(&self) -> &[SubmitNode] {
        &self.nodes
    }

    /// Semaphores signaled outside the chain
    pub fn external_signals(&self) -> &[String] {
        &self.external_signals
    }

    /// Validate that the declared waits and signals form a single linear
    /// chain with no cycles.
    ///
    /// Checks, in order:
    /// - every semaphore is signaled at most once
    /// - every wait is satisfied by an earlier signal (or an external one),
    ///   which also proves the graph is acyclic
    /// - every signaled semaphore is waited on exactly once (nothing dangles)
    /// - consecutive submissions are linked: each node after the first waits
    ///   on something signaled by the node immediately before it
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` describing the first violation found.
    pub fn validate(&self) -> Result<()> {
        use rustc_hash::FxHashMap;

        // Semaphore -> index of the signaling node (external = usize::MAX)
        let mut signaled_by: FxHashMap<&str, usize> = FxHashMap::default();
        for name in &self.external_signals {
            signaled_by.insert(name.as_str(), usize::MAX);
        }
        for (index, node) in self.nodes.iter().enumerate() {
            for signal in &node.signals {
                if signaled_by.insert(signal.as_str(), index).is_some() {
                    return Err(Error::Configuration(format!(
                        "Semaphore '{}' is signaled more than once",
                        signal
                    )));
                }
            }
        }

        // Waits must reference earlier signals; count consumers
        let mut wait_counts: FxHashMap<&str, usize> = FxHashMap::default();
        for (index, node) in self.nodes.iter().enumerate() {
            for wait in &node.waits {
                match signaled_by.get(wait.as_str()) {
                    None => {
                        return Err(Error::Configuration(format!(
                            "Submission '{}' waits on '{}' which nothing signals",
                            node.name, wait
                        )));
                    }
                    Some(&producer) if producer != usize::MAX && producer >= index => {
                        return Err(Error::Configuration(format!(
                            "Submission '{}' waits on '{}' signaled by a later submission (cycle)",
                            node.name, wait
                        )));
                    }
                    Some(_) => {
                        *wait_counts.entry(wait.as_str()).or_insert(0) += 1;
                    }
                }
            }
        }

        for (semaphore, &producer) in &signaled_by {
            let consumers = wait_counts.get(semaphore).copied().unwrap_or(0);
            if consumers == 0 {
                return Err(Error::Configuration(format!(
                    "Semaphore '{}' is signaled but never waited on",
                    semaphore
                )));
            }
            if consumers > 1 {
                return Err(Error::Configuration(format!(
                    "Binary semaphore '{}' is waited on {} times",
                    semaphore, consumers
                )));
            }
            let _ = producer;
        }

        // Linearity: node N+1 must consume something node N signals
        for window in self.nodes.windows(2) {
            let (producer, consumer) = (&window[0], &window[1]);
            let linked = consumer
                .waits
                .iter()
                .any(|wait| producer.signals.iter().any(|signal| signal == wait));
            if !linked {
                return Err(Error::Configuration(format!(
                    "Submission '{}' is not linked to its predecessor '{}'",
                    consumer.name, producer.name
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "submission_tests.rs"]
mod tests;
