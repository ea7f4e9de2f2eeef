//! String identifiers.
//!
//! Room and user ids are assigned by the server; correlation tokens are
//! generated locally. All three are opaque strings on the wire, wrapped in
//! newtypes so they cannot be mixed up.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::env::Environment;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Server-assigned chat room identifier.
    RoomId
);

string_id!(
    /// Server-assigned user identifier.
    UserId
);

string_id!(
    /// Client-generated correlation token.
    ///
    /// Matches an optimistic entry (message or attachment) to its
    /// server-confirmed counterpart.
    UniqueId
);

impl UniqueId {
    /// Generate a fresh token (UUID v4) from environment randomness.
    ///
    /// Deterministic under a seeded environment.
    pub fn generate<E: Environment>(env: &E) -> Self {
        let mut bytes = [0u8; 16];
        env.random_bytes(&mut bytes);
        Self(uuid::Builder::from_random_bytes(bytes).into_uuid().to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicU8, Ordering},
        },
        time::Instant,
    };

    use super::*;

    #[derive(Clone, Default)]
    struct CountingEnv {
        next: Arc<AtomicU8>,
    }

    impl Environment for CountingEnv {
        type Instant = Instant;

        #[allow(clippy::disallowed_methods)]
        fn now(&self) -> Instant {
            Instant::now()
        }

        fn wall_clock_millis(&self) -> u64 {
            0
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            let seed = self.next.fetch_add(1, Ordering::Relaxed);
            for (i, byte) in buffer.iter_mut().enumerate() {
                *byte = seed.wrapping_add(i as u8);
            }
        }
    }

    #[test]
    fn generated_tokens_are_uuid_v4() {
        let env = CountingEnv::default();
        let id = UniqueId::generate(&env);

        let parsed = uuid::Uuid::parse_str(id.as_str()).map(|u| u.get_version_num());
        assert_eq!(parsed, Ok(4));
    }

    #[test]
    fn generated_tokens_differ() {
        let env = CountingEnv::default();
        let a = UniqueId::generate(&env);
        let b = UniqueId::generate(&env);
        assert_ne!(a, b);
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let room = RoomId::from("room-7");
        assert_eq!(serde_json::to_string(&room).ok().as_deref(), Some("\"room-7\""));
    }
}
