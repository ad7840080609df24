//! Reaction counters and comments

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::CommentId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Heart,
    Love,
    Fire,
    Clap,
}

impl ReactionKind {
    pub const ALL: [ReactionKind; 4] = [
        ReactionKind::Heart,
        ReactionKind::Love,
        ReactionKind::Fire,
        ReactionKind::Clap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionKind::Heart => "heart",
            ReactionKind::Love => "love",
            ReactionKind::Fire => "fire",
            ReactionKind::Clap => "clap",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().to_lowercase();
        Self::ALL.into_iter().find(|k| k.as_str() == raw)
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One counter per reaction kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Reactions {
    pub heart: u64,
    pub love: u64,
    pub fire: u64,
    pub clap: u64,
}

impl Reactions {
    pub fn get(&self, kind: ReactionKind) -> u64 {
        match kind {
            ReactionKind::Heart => self.heart,
            ReactionKind::Love => self.love,
            ReactionKind::Fire => self.fire,
            ReactionKind::Clap => self.clap,
        }
    }

    pub fn get_mut(&mut self, kind: ReactionKind) -> &mut u64 {
        match kind {
            ReactionKind::Heart => &mut self.heart,
            ReactionKind::Love => &mut self.love,
            ReactionKind::Fire => &mut self.fire,
            ReactionKind::Clap => &mut self.clap,
        }
    }

    pub fn total(&self) -> u64 {
        ReactionKind::ALL.iter().map(|k| self.get(*k)).sum()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub author: String,
    /// Picture shown next to the author; viewers fall back to a placeholder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}
