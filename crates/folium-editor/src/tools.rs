//! Active tool and keyboard-shortcut suppression.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Interaction tool of the segmentation editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolMode {
    #[default]
    Select,
    Pan,
    Cut,
    AddLines,
    AddRegions,
}

impl ToolMode {
    pub fn is_drawing(&self) -> bool {
        matches!(self, ToolMode::AddLines | ToolMode::AddRegions)
    }
}

impl fmt::Display for ToolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ToolMode::Select => "select",
            ToolMode::Pan => "pan",
            ToolMode::Cut => "cut",
            ToolMode::AddLines => "add-lines",
            ToolMode::AddRegions => "add-regions",
        };
        f.write_str(name)
    }
}

impl FromStr for ToolMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "select" => Ok(ToolMode::Select),
            "pan" => Ok(ToolMode::Pan),
            "cut" => Ok(ToolMode::Cut),
            "add-lines" => Ok(ToolMode::AddLines),
            "add-regions" => Ok(ToolMode::AddRegions),
            other => Err(format!("unknown tool '{}'", other)),
        }
    }
}

/// Shared switch that disables editor shortcuts while any holder is active.
///
/// Clones share the same counter, so several embedding contexts (a modal
/// transcription editor, a dialog) can suppress shortcuts independently.
#[derive(Debug, Clone, Default)]
pub struct ShortcutSuppression {
    holders: Rc<Cell<u32>>,
}

impl ShortcutSuppression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn suppress(&self) {
        self.holders.set(self.holders.get() + 1);
    }

    pub fn release(&self) {
        self.holders.set(self.holders.get().saturating_sub(1));
    }

    pub fn is_suppressed(&self) -> bool {
        self.holders.get() > 0
    }
}

/// Active tool plus the shortcut switch.
#[derive(Debug, Clone, Default)]
pub struct ToolState {
    active: ToolMode,
    suppression: ShortcutSuppression,
}

impl ToolState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> ToolMode {
        self.active
    }

    /// Activates `mode`. Returns the previous tool if it changed.
    pub fn set(&mut self, mode: ToolMode) -> Option<ToolMode> {
        if self.active == mode {
            return None;
        }
        Some(std::mem::replace(&mut self.active, mode))
    }

    /// Activates `mode`, or falls back to select when it is already active.
    /// Returns the tool now active.
    pub fn toggle(&mut self, mode: ToolMode) -> ToolMode {
        let next = if self.active == mode {
            ToolMode::Select
        } else {
            mode
        };
        self.active = next;
        next
    }

    /// Handle for embedding contexts that need to suppress shortcuts.
    pub fn suppression(&self) -> ShortcutSuppression {
        self.suppression.clone()
    }

    pub fn shortcuts_enabled(&self) -> bool {
        !self.suppression.is_suppressed()
    }
}
