//! Type-safe identifier wrappers around Discord snowflakes.
//!
//! Users and tenants are identified by 64-bit snowflakes, stored as
//! `BIGINT` columns. Wrapping them in newtypes prevents accidental
//! mixing of user and server ids at compile time.
//!
//! The reserved value [`ServerId::GLOBAL`] (`0`) denotes the
//! cross-server scope used for global point totals and for
//! server-then-global fallback resolution. Real snowflakes encode a
//! timestamp and are strictly positive, so the reserved id cannot
//! collide with a live tenant.

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around a snowflake (`i64`) with standard derives.
macro_rules! define_snowflake_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Wrap a raw snowflake value.
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Return the inner snowflake value.
            pub const fn into_inner(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_snowflake_id! {
    /// Unique identifier for a member (Discord user).
    UserId
}

define_snowflake_id! {
    /// Unique identifier for a tenant (Discord server/guild).
    ServerId
}

impl ServerId {
    /// Reserved tenant identifier for the cross-server ("global") scope.
    ///
    /// Used for cross-server point totals and as the fallback scope when
    /// no server-specific configuration, binding, or verification row
    /// exists.
    pub const GLOBAL: Self = Self(0);

    /// Whether this identifier is the reserved global scope.
    pub const fn is_global(self) -> bool {
        self.0 == 0
    }
}

/// Identifier of a tweet tracked for social-action rewards.
///
/// Tweet ids originate from the Twitter API and are never used
/// arithmetically, so they are kept as strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TweetId(pub String);

impl TweetId {
    /// Wrap a raw tweet id.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Return the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for TweetId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TweetId {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}

impl From<String> for TweetId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let user = UserId::new(123_456_789);
        let server = ServerId::new(987_654_321);
        // These are different types -- the compiler enforces no mixing.
        assert_eq!(user.into_inner(), 123_456_789);
        assert_eq!(server.into_inner(), 987_654_321);
    }

    #[test]
    fn global_scope_is_reserved_zero() {
        assert!(ServerId::GLOBAL.is_global());
        assert!(!ServerId::new(42).is_global());
        assert_eq!(ServerId::GLOBAL.into_inner(), 0);
    }

    #[test]
    fn id_serde_is_transparent() {
        let user = UserId::new(42);
        let json = serde_json::to_string(&user).unwrap();
        assert_eq!(json, "42");
        let restored: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, user);
    }

    #[test]
    fn tweet_id_display_matches_inner() {
        let tweet = TweetId::from("1780000000000000000");
        assert_eq!(tweet.to_string(), "1780000000000000000");
        assert_eq!(tweet.as_str(), "1780000000000000000");
    }
}
