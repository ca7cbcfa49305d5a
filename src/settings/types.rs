use std::fmt;

use serde::Deserialize;

/// Order in which replicas are tried when a command is routed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Replica {
    /// Always the master partition owner
    Master,
    /// Master and prole replicas in round-robin
    MasterProles,
    /// Master first, then proles in sequence on retry
    Sequence,
    /// Nodes in the client's rack first
    PreferRack,
    /// Any replica at random
    Random,
}

/// How many replicas must acknowledge a write before it is reported committed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitLevel {
    All,
    Master,
}

/// Read consistency for namespaces in availability (AP) mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadModeAp {
    One,
    All,
}

/// Read consistency for namespaces in strong consistency (CP) mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadModeSc {
    Session,
    Linearize,
    AllowReplica,
    AllowUnavailable,
}

impl fmt::Display for Replica {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let s = match self {
            Replica::Master => "master",
            Replica::MasterProles => "master_proles",
            Replica::Sequence => "sequence",
            Replica::PreferRack => "prefer_rack",
            Replica::Random => "random",
        };
        f.write_str(s)
    }
}

impl fmt::Display for CommitLevel {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            CommitLevel::All => f.write_str("all"),
            CommitLevel::Master => f.write_str("master"),
        }
    }
}

impl fmt::Display for ReadModeAp {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            ReadModeAp::One => f.write_str("one"),
            ReadModeAp::All => f.write_str("all"),
        }
    }
}

impl fmt::Display for ReadModeSc {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let s = match self {
            ReadModeSc::Session => "session",
            ReadModeSc::Linearize => "linearize",
            ReadModeSc::AllowReplica => "allow_replica",
            ReadModeSc::AllowUnavailable => "allow_unavailable",
        };
        f.write_str(s)
    }
}
