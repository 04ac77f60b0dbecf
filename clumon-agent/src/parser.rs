//! `crm status` output classifier
//!
//! Four patterns are recognised, applied in this fixed order so that later
//! ones override earlier ones for the same node:
//! 1. `Online: [ n1 n2 ]`            -> online
//! 2. `Node n: standby`              -> standby
//! 3. `OFFLINE: [ n1 n2 ]`           -> offline
//! 4. `Node n: OFFLINE (standby)`    -> offline
//!
//! With [`MatchMode::FirstMatch`] each pattern only looks at its first
//! matching line, like a single regex search over the whole output.
//! [`MatchMode::AllLines`] collects every matching line instead.

use crate::status::NodeStatus;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static ONLINE_LIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Online:\s+\[(.*)\]").expect("online list regex is a compile-time constant")
});

static STANDBY_NODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Node\s+([^\s:]+): standby").expect("standby regex is a compile-time constant")
});

static OFFLINE_LIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"OFFLINE:\s+\[(.*)\]").expect("offline list regex is a compile-time constant")
});

static OFFLINE_STANDBY_NODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Node\s+([^\s:]+): OFFLINE \(standby\)")
        .expect("offline standby regex is a compile-time constant")
});

/// How many lines each pattern may match in one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Only the first matching line of each pattern
    #[default]
    FirstMatch,
    /// Every matching line of each pattern
    AllLines,
}

/// Which part of the status output produced an observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    OnlineList,
    Standby,
    OfflineList,
    OfflineStandby,
}

impl Section {
    /// Application order, later sections override earlier ones
    pub const ORDER: [Section; 4] = [
        Section::OnlineList,
        Section::Standby,
        Section::OfflineList,
        Section::OfflineStandby,
    ];

    pub fn status(self) -> NodeStatus {
        match self {
            Section::OnlineList => NodeStatus::Online,
            Section::Standby => NodeStatus::Standby,
            Section::OfflineList | Section::OfflineStandby => NodeStatus::Offline,
        }
    }

    /// Human wording used in log lines ("Node x is ...")
    pub fn describe(self) -> &'static str {
        match self {
            Section::OnlineList => "online",
            Section::Standby => "in standby",
            Section::OfflineList => "offline",
            Section::OfflineStandby => "offline and standby",
        }
    }

    fn pattern(self) -> &'static Regex {
        match self {
            Section::OnlineList => &ONLINE_LIST,
            Section::Standby => &STANDBY_NODE,
            Section::OfflineList => &OFFLINE_LIST,
            Section::OfflineStandby => &OFFLINE_STANDBY_NODE,
        }
    }

    /// Bracketed lists carry several names, `Node` lines exactly one
    fn is_list(self) -> bool {
        matches!(self, Section::OnlineList | Section::OfflineList)
    }
}

/// One node classified by one section of the output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub node: String,
    pub status: NodeStatus,
    pub section: Section,
}

/// Classify every node mentioned in `text`, in application order.
///
/// The result is meant to be applied front to back; a node may appear more
/// than once and the last occurrence decides its status.
pub fn parse_status(text: &str, mode: MatchMode) -> Vec<Observation> {
    let mut observations = Vec::new();

    for section in Section::ORDER {
        for captured in section_matches(section.pattern(), text, mode) {
            let names: Vec<&str> = if section.is_list() {
                captured.split_whitespace().collect()
            } else {
                vec![captured]
            };

            observations.extend(names.into_iter().map(|name| Observation {
                node: name.to_string(),
                status: section.status(),
                section,
            }));
        }
    }

    observations
}

fn section_matches<'t>(pattern: &Regex, text: &'t str, mode: MatchMode) -> Vec<&'t str> {
    match mode {
        MatchMode::FirstMatch => pattern.captures(text).and_then(first_group).into_iter().collect(),
        MatchMode::AllLines => pattern.captures_iter(text).filter_map(first_group).collect(),
    }
}

fn first_group(captures: Captures<'_>) -> Option<&str> {
    captures.get(1).map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classified(text: &str, mode: MatchMode) -> Vec<(String, NodeStatus)> {
        parse_status(text, mode)
            .into_iter()
            .map(|o| (o.node, o.status))
            .collect()
    }

    #[test]
    fn test_online_list() {
        let result = classified("Online: [ a b c ]\n", MatchMode::FirstMatch);
        assert_eq!(
            result,
            vec![
                ("a".to_string(), NodeStatus::Online),
                ("b".to_string(), NodeStatus::Online),
                ("c".to_string(), NodeStatus::Online),
            ]
        );
    }

    #[test]
    fn test_list_without_inner_padding() {
        let result = classified("OFFLINE: [x y]", MatchMode::FirstMatch);
        assert_eq!(
            result,
            vec![("x".to_string(), NodeStatus::Offline), ("y".to_string(), NodeStatus::Offline)]
        );
    }

    #[test]
    fn test_list_split_on_whitespace_runs() {
        let result = classified("Online: [  node1 \t  node2   ]", MatchMode::FirstMatch);
        let names: Vec<_> = result.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["node1", "node2"]);
    }

    #[test]
    fn test_empty_brackets_yield_nothing() {
        assert!(parse_status("Online: [  ]\nOFFLINE: []\n", MatchMode::FirstMatch).is_empty());
    }

    #[test]
    fn test_unrecognised_text_yields_nothing() {
        let text = "Stack: corosync\nCurrent DC: node1 - partition with quorum\n";
        assert!(parse_status(text, MatchMode::AllLines).is_empty());
        assert!(parse_status("", MatchMode::FirstMatch).is_empty());
    }

    #[test]
    fn test_sections_follow_fixed_order() {
        // Text order is deliberately the reverse of application order
        let text = "Node d: OFFLINE (standby)\nOFFLINE: [ c ]\nNode b: standby\nOnline: [ a ]\n";
        let sections: Vec<Section> = parse_status(text, MatchMode::FirstMatch)
            .into_iter()
            .map(|o| o.section)
            .collect();
        assert_eq!(sections, Section::ORDER.to_vec());
    }

    #[test]
    fn test_offline_standby_is_not_plain_standby() {
        let result = parse_status("Node foo: OFFLINE (standby)\n", MatchMode::FirstMatch);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].section, Section::OfflineStandby);
        assert_eq!(result[0].status, NodeStatus::Offline);
    }

    #[test]
    fn test_offline_standby_comes_after_standby() {
        let text = "Node foo: OFFLINE (standby)\nNode foo: standby\n";
        let result = classified(text, MatchMode::FirstMatch);
        assert_eq!(
            result,
            vec![
                ("foo".to_string(), NodeStatus::Standby),
                ("foo".to_string(), NodeStatus::Offline),
            ]
        );
    }

    #[test]
    fn test_first_match_ignores_later_lines() {
        let text = "Node n1: standby\nNode n2: standby\nOnline: [ a ]\nOnline: [ b ]\n";
        let result = classified(text, MatchMode::FirstMatch);
        assert_eq!(
            result,
            vec![("a".to_string(), NodeStatus::Online), ("n1".to_string(), NodeStatus::Standby)]
        );
    }

    #[test]
    fn test_all_lines_collects_every_match() {
        let text = "Node n1: standby\nNode n2: standby\nOnline: [ a ]\nOnline: [ b ]\n";
        let result = classified(text, MatchMode::AllLines);
        assert_eq!(
            result,
            vec![
                ("a".to_string(), NodeStatus::Online),
                ("b".to_string(), NodeStatus::Online),
                ("n1".to_string(), NodeStatus::Standby),
                ("n2".to_string(), NodeStatus::Standby),
            ]
        );
    }

    #[test]
    fn test_hyphenated_and_dotted_names() {
        let text = "Node ganeti-02.example.org: standby\n";
        let result = classified(text, MatchMode::FirstMatch);
        assert_eq!(result, vec![("ganeti-02.example.org".to_string(), NodeStatus::Standby)]);
    }

    #[test]
    fn test_standby_with_trailing_detail() {
        // Newer pacemaker appends resource details after the state
        let text = "  * Node node4: standby (with active resources)\n";
        let result = classified(text, MatchMode::FirstMatch);
        assert_eq!(result, vec![("node4".to_string(), NodeStatus::Standby)]);
    }

    #[test]
    fn test_list_does_not_span_lines() {
        let result = classified("Online: [ a b\n c ]\n", MatchMode::FirstMatch);
        assert!(result.is_empty());
    }

    #[test]
    fn test_match_mode_serde_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: MatchMode,
        }
        let parsed: Wrapper = toml::from_str("mode = \"all_lines\"").unwrap();
        assert_eq!(parsed.mode, MatchMode::AllLines);
        assert_eq!(MatchMode::default(), MatchMode::FirstMatch);
    }
}
