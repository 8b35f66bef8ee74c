//! Ordered thumbnail cards of a document's parts and their drag-and-drop
//! reordering.

use folium_core::PartId;
use serde::{Deserialize, Serialize};

use crate::commands::{CommandSender, EditorCommand};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartCard {
    pub pk: PartId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub thumbnail_uri: Option<String>,
}

impl PartCard {
    pub fn new(pk: PartId, title: impl Into<String>) -> Self {
        Self {
            pk,
            title: title.into(),
            thumbnail_uri: None,
        }
    }
}

/// A card being dragged. Lives only between pick-up and drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragSession {
    pub part: PartId,
    pub from: usize,
}

#[derive(Debug, Clone, Default)]
pub struct PartCards {
    cards: Vec<PartCard>,
}

impl PartCards {
    pub fn new(cards: Vec<PartCard>) -> Self {
        Self { cards }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cards(&self) -> &[PartCard] {
        &self.cards
    }

    pub fn order(&self) -> Vec<PartId> {
        self.cards.iter().map(|c| c.pk).collect()
    }

    pub fn index_of(&self, pk: PartId) -> Option<usize> {
        self.cards.iter().position(|c| c.pk == pk)
    }

    /// Appends a card, e.g. after an upload completed.
    pub fn push(&mut self, card: PartCard) {
        self.cards.push(card);
    }

    pub fn remove(&mut self, pk: PartId) -> Option<PartCard> {
        let index = self.index_of(pk)?;
        Some(self.cards.remove(index))
    }

    pub fn begin_drag(&self, pk: PartId) -> Option<DragSession> {
        self.index_of(pk).map(|from| DragSession { part: pk, from })
    }

    /// Whether dropping `session` at `target` would move anything.
    pub fn accepts(&self, session: &DragSession, target: usize) -> bool {
        target < self.cards.len()
            && target != session.from
            && self.index_of(session.part) == Some(session.from)
    }

    /// Moves the dragged card to `target` and asks the host to persist the
    /// new index. Rejected drops change nothing.
    pub fn drop(&mut self, session: DragSession, target: usize, commands: &CommandSender) -> bool {
        if !self.accepts(&session, target) {
            tracing::debug!("Rejected drop of part {} at {}", session.part, target);
            return false;
        }
        self.move_card(session.part, target);
        let command = EditorCommand::MovePart {
            part: session.part,
            from: session.from,
            to: target,
        };
        if commands.send(command).is_err() {
            tracing::warn!("Command channel closed, part order will not be persisted");
        }
        true
    }

    /// Moves a card to `to` (clamped). Returns its previous index.
    pub fn move_card(&mut self, pk: PartId, to: usize) -> Option<usize> {
        let from = self.index_of(pk)?;
        let card = self.cards.remove(from);
        let to = to.min(self.cards.len());
        self.cards.insert(to, card);
        Some(from)
    }
}
