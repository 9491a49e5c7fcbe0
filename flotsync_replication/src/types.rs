use flotsync_utils::IString;
use std::fmt;

/// A process-local monotonically increasing id for an in-flight client operation.
pub type RequestId = u64;

/// The coordinator's clock reading. `-1` is the sentinel for "never written",
/// matching the "never written" sentinel of the cell it timestamps.
pub type Timestamp = i64;

/// Sentinel timestamp for a key that has never been written on this node.
pub const NEVER_WRITTEN: Timestamp = -1;

/// Opaque node identifier. Nodes are totally ordered by string comparison,
/// which is exactly what [`placement::replicas_of`](crate::placement::replicas_of)
/// relies on to make placement independent of the caller's own identity.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(IString);

impl NodeId {
    pub fn as_str(&self) -> &str {
        self.0.as_ref()
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(IString::from(value))
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(IString::new(value))
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An opaque byte-string key. Typically UTF-8 text, but the store never assumes so.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(Box<[u8]>);

impl Key {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self(Box::from(value.as_bytes()))
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self(value.into_bytes().into_boxed_slice())
    }
}

impl From<Vec<u8>> for Key {
    fn from(value: Vec<u8>) -> Self {
        Self(value.into_boxed_slice())
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(s) => write!(f, "Key({s:?})"),
            Err(_) => write!(f, "Key({:?})", self.0),
        }
    }
}
