//! Enumeration types shared across the Kudos ledger.

use serde::{Deserialize, Serialize};

/// A verifiable social action on a tracked tweet.
///
/// Completing all three actions on the same tweet is a "triple action"
/// and earns the configured bonus on top of the per-action rewards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TwitterAction {
    /// The user liked the tweet.
    Like,
    /// The user retweeted the tweet.
    Retweet,
    /// The user replied to the tweet.
    Reply,
}

impl TwitterAction {
    /// The actions that make up a completed triple action.
    pub const ALL: [Self; 3] = [Self::Like, Self::Retweet, Self::Reply];

    /// Database string representation.
    pub const fn as_db(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Retweet => "retweet",
            Self::Reply => "reply",
        }
    }

    /// Parse from the database string representation.
    pub fn from_db(raw: &str) -> Option<Self> {
        match raw {
            "like" => Some(Self::Like),
            "retweet" => Some(Self::Retweet),
            "reply" => Some(Self::Reply),
            _ => None,
        }
    }
}

impl core::fmt::Display for TwitterAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_db())
    }
}

/// The kind of administrative point mutation being audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminOperation {
    /// An operator granted points to a member.
    AddPoints,
    /// An operator deducted points from a member.
    RemovePoints,
    /// An operator overwrote a member's balance.
    SetPoints,
}

impl AdminOperation {
    /// Database string representation.
    pub const fn as_db(self) -> &'static str {
        match self {
            Self::AddPoints => "add_points",
            Self::RemovePoints => "remove_points",
            Self::SetPoints => "set_points",
        }
    }
}

impl core::fmt::Display for AdminOperation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_db())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn action_db_roundtrip() {
        for action in TwitterAction::ALL {
            assert_eq!(TwitterAction::from_db(action.as_db()), Some(action));
        }
        assert_eq!(TwitterAction::from_db("quote"), None);
    }

    #[test]
    fn action_serde_uses_lowercase() {
        let json = serde_json::to_string(&TwitterAction::Retweet).unwrap();
        assert_eq!(json, "\"retweet\"");
    }

    #[test]
    fn admin_operation_db_strings() {
        assert_eq!(AdminOperation::AddPoints.as_db(), "add_points");
        assert_eq!(AdminOperation::RemovePoints.as_db(), "remove_points");
        assert_eq!(AdminOperation::SetPoints.as_db(), "set_points");
    }
}
