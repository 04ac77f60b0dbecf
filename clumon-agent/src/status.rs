//! Node membership state tracked across samples
//!
//! The map keeps the last classification of every node ever reported:
//! - Nodes are only ever updated, never removed
//! - A node missing from a sample keeps its previous entry untouched
//! - `observed_at` tells how fresh each entry is

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{BTreeMap, Entry};
use std::collections::HashMap;
use std::fmt;

/// Membership state as reported by the cluster resource manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Online,
    Standby,
    Offline,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Online => "online",
            NodeStatus::Standby => "standby",
            NodeStatus::Offline => "offline",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest known state of a single node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEntry {
    pub status: NodeStatus,
    pub observed_at: DateTime<Utc>,
}

/// Status change of a node between two samples
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub node: String,
    /// `None` on first sighting
    pub from: Option<NodeStatus>,
    pub to: NodeStatus,
}

/// Node counts per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub online: usize,
    pub standby: usize,
    pub offline: usize,
}

impl StatusSummary {
    pub fn total(&self) -> usize {
        self.online + self.standby + self.offline
    }
}

/// Node name -> latest entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeStatusMap {
    nodes: BTreeMap<String, NodeEntry>,
}

impl NodeStatusMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn status(&self, node: &str) -> Option<NodeStatus> {
        self.nodes.get(node).map(|entry| entry.status)
    }

    pub fn entry(&self, node: &str) -> Option<&NodeEntry> {
        self.nodes.get(node)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NodeEntry)> {
        self.nodes.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    /// Apply `(node, status)` updates in order, last one wins for a given node.
    ///
    /// Every updated node gets `observed_at = at`, even when its status is
    /// unchanged. Returns the nodes whose status after the batch differs from
    /// their status before it, sorted by name.
    pub fn apply<'a, I>(&mut self, updates: I, at: DateTime<Utc>) -> Vec<Transition>
    where
        I: IntoIterator<Item = (&'a str, NodeStatus)>,
    {
        let mut before: HashMap<String, Option<NodeStatus>> = HashMap::new();

        for (node, status) in updates {
            let entry = NodeEntry { status, observed_at: at };
            let previous = match self.nodes.entry(node.to_string()) {
                Entry::Occupied(mut slot) => Some(slot.insert(entry).status),
                Entry::Vacant(slot) => {
                    slot.insert(entry);
                    None
                }
            };
            before.entry(node.to_string()).or_insert(previous);
        }

        let mut transitions: Vec<Transition> = before
            .into_iter()
            .filter_map(|(node, from)| {
                let to = self.nodes.get(&node)?.status;
                (from != Some(to)).then_some(Transition { node, from, to })
            })
            .collect();
        transitions.sort_by(|a, b| a.node.cmp(&b.node));
        transitions
    }

    pub fn summary(&self) -> StatusSummary {
        let mut summary = StatusSummary::default();
        for entry in self.nodes.values() {
            match entry.status {
                NodeStatus::Online => summary.online += 1,
                NodeStatus::Standby => summary.standby += 1,
                NodeStatus::Offline => summary.offline += 1,
            }
        }
        summary
    }

    /// Nodes whose last observation is older than `max_age` at `now`
    pub fn stale_nodes(&self, now: DateTime<Utc>, max_age: Duration) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|(_, entry)| now - entry.observed_at > max_age)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_status_display_is_lowercase() {
        assert_eq!(NodeStatus::Online.to_string(), "online");
        assert_eq!(NodeStatus::Standby.to_string(), "standby");
        assert_eq!(serde_json::to_string(&NodeStatus::Offline).unwrap(), "\"offline\"");
    }

    #[test]
    fn test_apply_last_observation_wins() {
        let mut map = NodeStatusMap::new();
        let batch = vec![
            ("node1", NodeStatus::Online),
            ("node1", NodeStatus::Standby),
            ("node1", NodeStatus::Offline),
        ];
        let transitions = map.apply(batch, t(0));

        assert_eq!(map.status("node1"), Some(NodeStatus::Offline));
        assert_eq!(
            transitions,
            vec![Transition { node: "node1".into(), from: None, to: NodeStatus::Offline }]
        );
    }

    #[test]
    fn test_apply_reports_only_real_changes() {
        let mut map = NodeStatusMap::new();
        map.apply([("a", NodeStatus::Online), ("b", NodeStatus::Online)], t(0));

        // b flips away and back within one batch: no net change
        let transitions = map.apply(
            [
                ("a", NodeStatus::Offline),
                ("b", NodeStatus::Standby),
                ("b", NodeStatus::Online),
            ],
            t(30),
        );

        assert_eq!(
            transitions,
            vec![Transition { node: "a".into(), from: Some(NodeStatus::Online), to: NodeStatus::Offline }]
        );
        assert_eq!(map.entry("b").unwrap().observed_at, t(30));
    }

    #[test]
    fn test_absent_nodes_keep_previous_entry() {
        let mut map = NodeStatusMap::new();
        map.apply([("a", NodeStatus::Online), ("b", NodeStatus::Standby)], t(0));
        map.apply([("a", NodeStatus::Online)], t(30));

        let b = map.entry("b").unwrap();
        assert_eq!(b.status, NodeStatus::Standby);
        assert_eq!(b.observed_at, t(0));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let mut map = NodeStatusMap::new();
        map.apply([("a", NodeStatus::Online)], t(0));
        let snapshot = map.clone();

        let transitions = map.apply(Vec::<(&str, NodeStatus)>::new(), t(30));
        assert!(transitions.is_empty());
        assert_eq!(map, snapshot);
    }

    #[test]
    fn test_summary_counts() {
        let mut map = NodeStatusMap::new();
        map.apply(
            [
                ("a", NodeStatus::Online),
                ("b", NodeStatus::Online),
                ("c", NodeStatus::Standby),
                ("d", NodeStatus::Offline),
            ],
            t(0),
        );
        let summary = map.summary();
        assert_eq!(summary, StatusSummary { online: 2, standby: 1, offline: 1 });
        assert_eq!(summary.total(), 4);
    }

    #[test]
    fn test_stale_nodes() {
        let mut map = NodeStatusMap::new();
        map.apply([("old", NodeStatus::Online)], t(0));
        map.apply([("fresh", NodeStatus::Online)], t(90));

        let stale = map.stale_nodes(t(100), Duration::seconds(60));
        assert_eq!(stale, vec!["old"]);
        assert!(map.stale_nodes(t(100), Duration::seconds(120)).is_empty());
    }
}
