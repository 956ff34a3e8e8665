//! Record keys and digests
//!
//! A [`Key`] names one record as `(namespace, set, user key)`. The store never
//! looks records up by the user key itself; it uses a fixed-size [`Digest`]
//! derived from the set name and the user key.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

/// Number of partitions per namespace
pub const PARTITION_COUNT: usize = 4096;

/// Digest length in bytes
pub const DIGEST_SIZE: usize = 20;

/// The caller-supplied part of a key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserKey {
    Integer(i64),
    String(String),
    Bytes(Vec<u8>),
}

impl UserKey {
    /// Type byte folded into the digest so that `1` and `"1"` never collide
    fn type_byte(&self) -> u8 {
        match self {
            UserKey::Integer(_) => 1,
            UserKey::String(_) => 3,
            UserKey::Bytes(_) => 4,
        }
    }
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserKey::Integer(i) => write!(f, "{}", i),
            UserKey::String(s) => write!(f, "{}", s),
            UserKey::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
        }
    }
}

impl From<i64> for UserKey {
    fn from(v: i64) -> Self {
        UserKey::Integer(v)
    }
}

impl From<&str> for UserKey {
    fn from(v: &str) -> Self {
        UserKey::String(v.to_string())
    }
}

impl From<String> for UserKey {
    fn from(v: String) -> Self {
        UserKey::String(v)
    }
}

impl From<Vec<u8>> for UserKey {
    fn from(v: Vec<u8>) -> Self {
        UserKey::Bytes(v)
    }
}

/// Fixed-size record identifier derived from set name and user key
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Digest(pub [u8; DIGEST_SIZE]);

impl Digest {
    /// Compute the digest of `set || type || key bytes`
    pub fn compute(set: &str, user_key: &UserKey) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(set.as_bytes());
        hasher.update([user_key.type_byte()]);
        match user_key {
            UserKey::Integer(i) => hasher.update(i.to_be_bytes()),
            UserKey::String(s) => hasher.update(s.as_bytes()),
            UserKey::Bytes(b) => hasher.update(b),
        }
        let full = hasher.finalize();

        let mut digest = [0u8; DIGEST_SIZE];
        digest.copy_from_slice(&full[..DIGEST_SIZE]);
        Digest(digest)
    }

    /// Partition this digest belongs to (0..PARTITION_COUNT)
    pub fn partition_id(&self) -> usize {
        u16::from_le_bytes([self.0[0], self.0[1]]) as usize & (PARTITION_COUNT - 1)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({}...)", &self.to_hex()[..8])
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Identifies exactly one record
///
/// Immutable once constructed. The digest is computed up front and is
/// recomputed, never trusted, when a key arrives off the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "KeyParts", into = "KeyParts")]
pub struct Key {
    namespace: String,
    set: String,
    user_key: UserKey,
    digest: Digest,
}

/// Serialized form of a [`Key`]
#[derive(Clone, Serialize, Deserialize)]
struct KeyParts {
    namespace: String,
    set: String,
    user_key: UserKey,
}

impl From<KeyParts> for Key {
    fn from(parts: KeyParts) -> Self {
        Key::new(parts.namespace, parts.set, parts.user_key)
    }
}

impl From<Key> for KeyParts {
    fn from(key: Key) -> Self {
        KeyParts {
            namespace: key.namespace,
            set: key.set,
            user_key: key.user_key,
        }
    }
}

impl Key {
    pub fn new(
        namespace: impl Into<String>,
        set: impl Into<String>,
        user_key: impl Into<UserKey>,
    ) -> Self {
        let namespace = namespace.into();
        let set = set.into();
        let user_key = user_key.into();
        let digest = Digest::compute(&set, &user_key);
        Self {
            namespace,
            set,
            user_key,
            digest,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn set(&self) -> &str {
        &self.set
    }

    pub fn user_key(&self) -> &UserKey {
        &self.user_key
    }

    pub fn digest(&self) -> Digest {
        self.digest
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.namespace, self.set, self.user_key)
    }
}
