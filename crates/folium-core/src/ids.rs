//! Identifiers for primitives, parts and remote objects.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Arena key of a primitive inside the open part. Never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocalId(pub u64);

/// Identifier assigned by the document service once a primitive is saved.
pub type RemoteId = u64;

/// Identifier of a document part (page).
pub type PartId = u64;

/// Key of any primitive held by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PrimitiveKey {
    Line(LocalId),
    Region(LocalId),
}

impl PrimitiveKey {
    pub fn local_id(&self) -> LocalId {
        match self {
            PrimitiveKey::Line(id) | PrimitiveKey::Region(id) => *id,
        }
    }

    pub fn is_line(&self) -> bool {
        matches!(self, PrimitiveKey::Line(_))
    }

    pub fn is_region(&self) -> bool {
        matches!(self, PrimitiveKey::Region(_))
    }
}

impl fmt::Display for PrimitiveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveKey::Line(id) => write!(f, "line#{}", id.0),
            PrimitiveKey::Region(id) => write!(f, "region#{}", id.0),
        }
    }
}

/// Monotonic generator for [`LocalId`]s.
///
/// Ids are handed out in creation order, which the hit-testing tie-break
/// relies on.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    next: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next_id(&mut self) -> LocalId {
        let id = LocalId(self.next);
        self.next += 1;
        id
    }

    /// Peeks at the id the next call will return.
    pub fn peek(&self) -> LocalId {
        LocalId(self.next)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic() {
        let mut gen = IdGenerator::new();
        let a = gen.next_id();
        let b = gen.next_id();
        assert!(a < b);
        assert_eq!(gen.peek(), LocalId(3));
    }

    #[test]
    fn test_key_display() {
        assert_eq!(PrimitiveKey::Region(LocalId(9)).to_string(), "region#9");
        assert!(PrimitiveKey::Line(LocalId(1)).is_line());
    }
}
