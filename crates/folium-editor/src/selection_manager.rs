use folium_core::PrimitiveKey;

/// Set of selected primitives, kept in selection order.
///
/// A primitive appears at most once. A non-additive [`select`](Self::select)
/// replaces the whole selection.
///
/// # Examples
///
/// ```
/// use folium_core::{LocalId, PrimitiveKey};
/// use folium_editor::selection_manager::Selection;
///
/// let mut selection = Selection::new();
/// selection.select(PrimitiveKey::Line(LocalId(1)), false);
/// selection.select(PrimitiveKey::Line(LocalId(2)), true);
/// selection.select(PrimitiveKey::Region(LocalId(3)), false);
/// assert_eq!(selection.keys(), &[PrimitiveKey::Region(LocalId(3))]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    items: Vec<PrimitiveKey>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `key`, first clearing the selection unless `additive`.
    ///
    /// Returns true if the selection changed.
    pub fn select(&mut self, key: PrimitiveKey, additive: bool) -> bool {
        if !additive {
            if self.is_sole(key) {
                return false;
            }
            self.items.clear();
            self.items.push(key);
            return true;
        }
        if self.items.contains(&key) {
            return false;
        }
        self.items.push(key);
        true
    }

    pub fn unselect(&mut self, key: PrimitiveKey) -> bool {
        let before = self.items.len();
        self.items.retain(|k| *k != key);
        before != self.items.len()
    }

    pub fn toggle(&mut self, key: PrimitiveKey) -> bool {
        if !self.unselect(key) {
            self.items.push(key);
        }
        self.contains(key)
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.items.is_empty();
        self.items.clear();
        changed
    }

    pub fn contains(&self, key: PrimitiveKey) -> bool {
        self.items.contains(&key)
    }

    /// Whether `key` is the only selected primitive.
    pub fn is_sole(&self, key: PrimitiveKey) -> bool {
        self.items.len() == 1 && self.items[0] == key
    }

    pub fn keys(&self) -> &[PrimitiveKey] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
