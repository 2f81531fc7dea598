//! Opaque node identifiers.
//!
//! Stored documents carry ids in more than one encoding: plain strings,
//! numbers from legacy imports, and extended-JSON object ids
//! (`{"$oid": "..."}`). `NodeId` accepts all three and compares by a
//! normalized string so the same identity matches regardless of encoding.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Stable identifier of a category node
///
/// Equality and hashing use the normalized form (trimmed, ASCII lowercase);
/// the original text is what gets serialized back.
///
/// # Example
///
/// ```
/// use repertoire::NodeId;
///
/// let a = NodeId::from("65F1A2B3C4D5E6F708091011");
/// let b: NodeId = serde_json::from_value(serde_json::json!({"$oid": "65f1a2b3c4d5e6f708091011"})).unwrap();
/// assert_eq!(a, b);
/// ```
#[derive(Clone)]
pub struct NodeId(String);

impl NodeId {
    /// Generate a fresh identifier
    pub fn generate() -> Self {
        NodeId(uuid::Uuid::new_v4().simple().to_string())
    }

    /// The identifier as originally supplied
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Normalized comparison key
    pub fn normalized(&self) -> String {
        self.0.trim().to_ascii_lowercase()
    }

    /// `true` when the id is blank after trimming
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    fn key_bytes(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.trim().bytes().map(|b| b.to_ascii_lowercase())
    }
}

impl PartialEq for NodeId {
    fn eq(&self, other: &Self) -> bool {
        self.key_bytes().eq(other.key_bytes())
    }
}

impl Eq for NodeId {}

impl Hash for NodeId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.key_bytes() {
            state.write_u8(b);
        }
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        NodeId(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        NodeId(value)
    }
}

impl Serialize for NodeId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, MapAccess, Visitor};

        struct NodeIdVisitor;

        impl<'de> Visitor<'de> for NodeIdVisitor {
            type Value = NodeId;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string, an integer, or an object id of the form {\"$oid\": \"...\"}")
            }

            fn visit_str<E>(self, value: &str) -> Result<NodeId, E>
            where
                E: de::Error,
            {
                Ok(NodeId(value.to_string()))
            }

            fn visit_string<E>(self, value: String) -> Result<NodeId, E>
            where
                E: de::Error,
            {
                Ok(NodeId(value))
            }

            fn visit_i64<E>(self, value: i64) -> Result<NodeId, E>
            where
                E: de::Error,
            {
                Ok(NodeId(value.to_string()))
            }

            fn visit_u64<E>(self, value: u64) -> Result<NodeId, E>
            where
                E: de::Error,
            {
                Ok(NodeId(value.to_string()))
            }

            fn visit_map<A>(self, mut map: A) -> Result<NodeId, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut oid: Option<String> = None;
                while let Some(key) = map.next_key::<String>()? {
                    if key == "$oid" {
                        oid = Some(map.next_value()?);
                    } else {
                        map.next_value::<de::IgnoredAny>()?;
                    }
                }
                oid.map(NodeId).ok_or_else(|| de::Error::missing_field("$oid"))
            }
        }

        deserializer.deserialize_any(NodeIdVisitor)
    }
}
