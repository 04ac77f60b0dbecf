//! clumon agent - Corosync/Pacemaker node status sampler
//!
//! Polls the cluster resource manager (`crm status`) on a fixed interval and
//! keeps the latest membership state of every node:
//! - Classification of `crm status` output into online / standby / offline
//! - Owned node map with explicit no-clear-on-absence policy
//! - Bounded external command execution (timeout + reap)
//! - TOML configuration with defaults matching plain `crm status` polling

pub mod config;
pub mod execution;
pub mod logging;
pub mod parser;
pub mod sampler;
pub mod status;

pub use config::ClumonConfig;
pub use execution::{CommandOutput, CommandSource, SampleError, StatusSource};
pub use parser::{parse_status, MatchMode, Observation, Section};
pub use sampler::{SampleReport, StatusSampler};
pub use status::{NodeEntry, NodeStatus, NodeStatusMap, StatusSummary, Transition};
