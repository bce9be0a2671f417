//! Identifier types for the chat client.
//!
//! Record identifiers (`MessageId`, `TermId`) are UUID newtypes. User
//! identifiers come from the external identity provider and are kept as a
//! validated string newtype. Session identifiers stay plain strings because
//! the gateway may replace a client-generated id with a server-assigned one.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declare a UUID newtype with a consistent API.
macro_rules! define_uuid_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[repr(transparent)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl Default for $name {
            #[inline]
            fn default() -> Self {
                Self::new()
            }
        }

        impl $name {
            /// Create a new random identifier.
            #[inline]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            #[inline]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Borrow the underlying UUID.
            #[inline]
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            #[inline]
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            #[inline]
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

define_uuid_id!(
    /// Identifier for a single chat message.
    MessageId
);

define_uuid_id!(
    /// Identifier for a user-configured excluded term.
    TermId
);

/// Identifier of an authenticated user.
///
/// The identity provider assigns opaque string ids, so this is a validated
/// string newtype rather than a UUID.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Hard ceiling to prevent pathological payloads.
    pub const MAX_LEN: usize = 128;

    /// Build a validated `UserId`.
    ///
    /// Rules: non-empty after trimming, length limited, conservative ASCII
    /// set `[A-Za-z0-9._:@-]`.
    ///
    /// # Errors
    /// Returns `ChatError::InvalidId` if the input is empty, too long, or
    /// contains invalid characters.
    pub fn new(raw: impl AsRef<str>) -> super::errors::ChatResult<Self> {
        let s = raw.as_ref().trim();

        if s.is_empty() {
            return Err(super::errors::ChatError::InvalidId(
                "user id must not be empty".to_string(),
            ));
        }
        if s.len() > Self::MAX_LEN {
            return Err(super::errors::ChatError::InvalidId(format!(
                "user id too long: got {}, max {}",
                s.len(),
                Self::MAX_LEN
            )));
        }

        for (i, ch) in s.chars().enumerate() {
            let ok = ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | ':' | '@' | '-');
            if !ok {
                return Err(super::errors::ChatError::InvalidId(format!(
                    "user id contains invalid character {ch:?} at index {i}"
                )));
            }
        }

        Ok(Self(s.to_owned()))
    }

    /// Borrow as `&str`.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into `String`.
    #[inline]
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for UserId {
    type Err = super::errors::ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

mod rusqlite_impl {
    use super::{MessageId, TermId, UserId};

    use rusqlite::types::{
        FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef,
    };

    macro_rules! impl_rusqlite_uuid_newtype {
        ($t:ty) => {
            impl ToSql for $t {
                fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                    // Store UUIDs as TEXT for compatibility
                    Ok(ToSqlOutput::Owned(Value::Text(self.0.to_string())))
                }
            }

            impl FromSql for $t {
                fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                    match value {
                        ValueRef::Text(t) => {
                            let s = std::str::from_utf8(t)
                                .map_err(|e| FromSqlError::Other(Box::new(e)))?;
                            uuid::Uuid::parse_str(s)
                                .map(Self)
                                .map_err(|e| FromSqlError::Other(Box::new(e)))
                        }
                        _ => Err(FromSqlError::InvalidType),
                    }
                }
            }
        };
    }

    impl_rusqlite_uuid_newtype!(MessageId);
    impl_rusqlite_uuid_newtype!(TermId);

    impl ToSql for UserId {
        fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
            Ok(ToSqlOutput::Owned(Value::Text(self.as_str().to_owned())))
        }
    }

    impl FromSql for UserId {
        fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
            match value {
                ValueRef::Text(t) => {
                    let s = std::str::from_utf8(t).map_err(|e| FromSqlError::Other(Box::new(e)))?;
                    Self::new(s).map_err(|e| FromSqlError::Other(Box::new(e)))
                }
                _ => Err(FromSqlError::InvalidType),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_rejects_empty_and_bad_chars() {
        assert!(UserId::new("  ").is_err());
        assert!(UserId::new("user with spaces").is_err());
        assert!(UserId::new("a".repeat(129)).is_err());
    }

    #[test]
    fn user_id_accepts_provider_style_ids() {
        let id = UserId::new("kX9fJ2mQ8RhT4vLpW0aZcD6yBn1e").expect("valid id");
        assert_eq!(id.as_str(), "kX9fJ2mQ8RhT4vLpW0aZcD6yBn1e");
    }

    #[test]
    fn message_id_roundtrips_through_display() {
        let id = MessageId::new();
        let parsed: MessageId = id.to_string().parse().expect("parse back");
        assert_eq!(id, parsed);
    }
}
