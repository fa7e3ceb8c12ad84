//! Cross-resource import graph
//!
//! Maps a provider resource to the consumers that pulled in its files via
//! `$provider/...` references. Edges are recorded as a side effect of path
//! resolution and are append-only for the process lifetime: a removed import
//! leaves a stale edge behind, which can only cause an extra rebuild, never
//! a missed one.

use std::collections::BTreeMap;

/// Provider name -> ordered set of consumer names
#[derive(Debug, Default)]
pub struct ImportGraph {
    edges: BTreeMap<String, Vec<String>>,
}

impl ImportGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `consumer` imported a file from `provider`.
    ///
    /// Deduplicated by consumer identity: rebuilding the same consumer never
    /// creates a second edge.
    pub fn record(&mut self, provider: &str, consumer: &str) {
        let consumers = self.edges.entry(provider.to_string()).or_default();
        if !consumers.iter().any(|name| name == consumer) {
            consumers.push(consumer.to_string());
        }
    }

    /// Direct consumers of a provider
    pub fn consumers_of(&self, provider: &str) -> &[String] {
        self.edges
            .get(provider)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every resource reachable from `provider` through consumer edges, in
    /// breadth-first order, excluding `provider` itself.
    ///
    /// Used by watch mode to cascade rebuilds when a provider's file changes.
    pub fn dependents_of(&self, provider: &str) -> Vec<String> {
        let mut seen = vec![provider.to_string()];
        let mut queue = vec![provider.to_string()];
        let mut out = Vec::new();

        while let Some(current) = queue.pop() {
            for consumer in self.consumers_of(&current) {
                if !seen.iter().any(|name| name == consumer) {
                    seen.push(consumer.clone());
                    queue.insert(0, consumer.clone());
                    out.push(consumer.clone());
                }
            }
        }

        out
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Iterate (provider, consumers) pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.edges.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_deduplicates_by_consumer() {
        let mut graph = ImportGraph::new();
        graph.record("core", "banking");
        graph.record("core", "banking");
        graph.record("core", "garage");

        assert_eq!(graph.consumers_of("core"), ["banking", "garage"]);
    }

    #[test]
    fn unknown_provider_has_no_consumers() {
        let graph = ImportGraph::new();
        assert!(graph.consumers_of("nothing").is_empty());
        assert!(graph.dependents_of("nothing").is_empty());
    }

    #[test]
    fn dependents_are_transitive_and_breadth_first() {
        let mut graph = ImportGraph::new();
        graph.record("core", "banking");
        graph.record("core", "garage");
        graph.record("banking", "atm");

        assert_eq!(graph.dependents_of("core"), ["banking", "garage", "atm"]);
    }

    #[test]
    fn dependents_tolerate_cycles() {
        let mut graph = ImportGraph::new();
        graph.record("a", "b");
        graph.record("b", "a");

        assert_eq!(graph.dependents_of("a"), ["b"]);
        assert_eq!(graph.dependents_of("b"), ["a"]);
    }
}
