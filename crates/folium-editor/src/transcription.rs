//! Line transcriptions and the line-by-line transcription editor.

use chrono::{DateTime, Utc};
use folium_core::{LocalId, PrimitiveKey, RemoteId};
use serde::{Deserialize, Serialize};

use crate::commands::{CommandSender, EditorCommand, FieldValue};
use crate::editor::{Key, KeyEvent};
use crate::model::PartModel;
use crate::tools::ShortcutSuppression;

/// Identifier of a transcription layer.
pub type LayerId = u64;

/// Snapshot of a transcription at one point in its history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionVersion {
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub content: String,
}

/// Text of one line in one layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LineTranscription {
    pub pk: Option<RemoteId>,
    pub content: String,
    /// Oldest first.
    #[serde(default)]
    pub versions: Vec<TranscriptionVersion>,
}

/// Opaque rich-text widget the transcription editor drives.
pub trait RichTextInput {
    fn content(&self) -> String;
    fn set_content(&mut self, content: &str);
    fn focus(&mut self);
}

/// Edits one line at a time in a given layer.
///
/// While open it suppresses segmentation shortcuts. Saving applies the text
/// to the model immediately and emits [`EditorCommand::SaveTranscription`];
/// a failed save is rolled back by the sync layer through the same field.
pub struct TranscriptionEditor<I: RichTextInput> {
    input: I,
    layer: LayerId,
    line: Option<LocalId>,
    loaded: String,
    next_binding: KeyEvent,
    suppression: ShortcutSuppression,
    commands: CommandSender,
}

impl<I: RichTextInput> TranscriptionEditor<I> {
    pub fn new(
        input: I,
        layer: LayerId,
        suppression: ShortcutSuppression,
        commands: CommandSender,
    ) -> Self {
        Self {
            input,
            layer,
            line: None,
            loaded: String::new(),
            next_binding: KeyEvent::plain(Key::Enter),
            suppression,
            commands,
        }
    }

    /// Replaces the "save and move to next line" key binding.
    pub fn with_next_binding(mut self, binding: KeyEvent) -> Self {
        self.next_binding = binding;
        self
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut I {
        &mut self.input
    }

    pub fn layer(&self) -> LayerId {
        self.layer
    }

    pub fn current_line(&self) -> Option<LocalId> {
        self.line
    }

    pub fn is_open(&self) -> bool {
        self.line.is_some()
    }

    /// Whether the input differs from the last loaded or saved text.
    pub fn is_dirty(&self) -> bool {
        self.is_open() && self.input.content() != self.loaded
    }

    /// Loads `line` into the input and focuses it.
    pub fn open(&mut self, model: &PartModel, line: LocalId) -> bool {
        let Some(l) = model.line(line) else {
            return false;
        };
        if self.line.is_none() {
            self.suppression.suppress();
        }
        self.loaded = l.content(self.layer).unwrap_or_default().to_string();
        self.input.set_content(&self.loaded);
        self.input.focus();
        self.line = Some(line);
        tracing::debug!("Transcribing line#{} in layer {}", line.0, self.layer);
        true
    }

    pub fn close(&mut self) {
        if self.line.take().is_some() {
            self.suppression.release();
        }
    }

    /// Switches layer and reloads the open line.
    pub fn set_layer(&mut self, model: &PartModel, layer: LayerId) {
        self.layer = layer;
        if let Some(line) = self.line {
            if !self.open(model, line) {
                self.close();
            }
        }
    }

    /// Reloads the open line unless the user has unsaved edits.
    pub fn refresh(&mut self, model: &PartModel) {
        if let Some(line) = self.line {
            if !self.is_dirty() && !self.open(model, line) {
                self.close();
            }
        }
    }

    /// Saves the input if it changed. Returns true when a save was emitted.
    pub fn save(&mut self, model: &mut PartModel) -> bool {
        let Some(line) = self.line else {
            return false;
        };
        let content = self.input.content();
        if content == self.loaded {
            return false;
        }
        let value = FieldValue::Content {
            layer: self.layer,
            content: content.clone(),
        };
        if !value.apply(model, PrimitiveKey::Line(line)) {
            tracing::warn!("Line#{} vanished before its transcription was saved", line.0);
            self.close();
            return false;
        }
        let previous = std::mem::replace(&mut self.loaded, content.clone());
        if self
            .commands
            .send(EditorCommand::SaveTranscription {
                line,
                layer: self.layer,
                previous,
                content,
            })
            .is_err()
        {
            tracing::warn!("Command channel closed, transcription of line#{} not sent", line.0);
        }
        true
    }

    /// Saves, then opens the next line in reading order. Closes the editor
    /// after the last line.
    pub fn save_and_next(&mut self, model: &mut PartModel) -> Option<LocalId> {
        let line = self.line?;
        self.save(model);
        match model.next_line(line) {
            Some(next) => {
                self.open(model, next);
                Some(next)
            }
            None => {
                self.close();
                None
            }
        }
    }

    /// Handles the configured binding. Returns true if the key was consumed.
    pub fn handle_key(&mut self, event: &KeyEvent, model: &mut PartModel) -> bool {
        if !self.is_open() || *event != self.next_binding {
            return false;
        }
        self.save_and_next(model);
        true
    }

    /// Version history of the open line, oldest first.
    pub fn versions<'a>(&self, model: &'a PartModel) -> &'a [TranscriptionVersion] {
        self.line
            .and_then(|line| model.line(line))
            .and_then(|l| l.transcriptions.get(&self.layer))
            .map(|t| t.versions.as_slice())
            .unwrap_or(&[])
    }

    /// Loads a historical version into the input; it is persisted on the
    /// next save.
    pub fn revert_to(&mut self, model: &PartModel, version: usize) -> bool {
        let Some(snapshot) = self.versions(model).get(version) else {
            return false;
        };
        let content = snapshot.content.clone();
        self.input.set_content(&content);
        true
    }
}

impl<I: RichTextInput> Drop for TranscriptionEditor<I> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::command_channel;
    use chrono::TimeZone;
    use folium_core::Point;

    #[derive(Default)]
    struct FakeInput {
        text: String,
        focused: usize,
    }

    impl RichTextInput for FakeInput {
        fn content(&self) -> String {
            self.text.clone()
        }

        fn set_content(&mut self, content: &str) {
            self.text = content.to_string();
        }

        fn focus(&mut self) {
            self.focused += 1;
        }
    }

    fn model() -> (PartModel, Vec<LocalId>) {
        let mut model = PartModel::new();
        let ids = (0..3)
            .map(|i| model.create_line(Point::new(0.0, i as f64 * 20.0)))
            .collect();
        (model, ids)
    }

    #[test]
    fn test_open_suppresses_shortcuts() {
        let (model, ids) = model();
        let (tx, _rx) = command_channel();
        let suppression = ShortcutSuppression::new();
        let mut editor = TranscriptionEditor::new(FakeInput::default(), 1, suppression.clone(), tx);

        assert!(editor.open(&model, ids[0]));
        assert!(suppression.is_suppressed());
        assert_eq!(editor.input().focused, 1);
        editor.close();
        assert!(!suppression.is_suppressed());
    }

    #[test]
    fn test_save_and_next_emits_and_advances() {
        let (mut model, ids) = model();
        let (tx, mut rx) = command_channel();
        let mut editor = TranscriptionEditor::new(FakeInput::default(), 1, ShortcutSuppression::new(), tx);

        editor.open(&model, ids[0]);
        editor.input_mut().set_content("In principio");
        assert_eq!(editor.save_and_next(&mut model), Some(ids[1]));

        assert_eq!(model.line(ids[0]).unwrap().content(1), Some("In principio"));
        assert_eq!(
            rx.try_recv().unwrap(),
            EditorCommand::SaveTranscription {
                line: ids[0],
                layer: 1,
                previous: String::new(),
                content: "In principio".to_string(),
            }
        );

        // Unchanged text is not re-sent.
        assert_eq!(editor.save_and_next(&mut model), Some(ids[2]));
        assert!(rx.try_recv().is_err());
        assert_eq!(editor.save_and_next(&mut model), None);
        assert!(!editor.is_open());
    }

    #[test]
    fn test_handle_key_uses_binding() {
        let (mut model, ids) = model();
        let (tx, _rx) = command_channel();
        let mut editor = TranscriptionEditor::new(FakeInput::default(), 1, ShortcutSuppression::new(), tx);
        editor.open(&model, ids[0]);

        assert!(!editor.handle_key(&KeyEvent::plain(Key::Char('a')), &mut model));
        assert!(editor.handle_key(&KeyEvent::plain(Key::Enter), &mut model));
        assert_eq!(editor.current_line(), Some(ids[1]));
    }

    #[test]
    fn test_revert_to_loads_history() {
        let (mut model, ids) = model();
        model
            .line_mut(ids[0])
            .unwrap()
            .transcriptions
            .insert(
                1,
                LineTranscription {
                    pk: Some(5),
                    content: "second".to_string(),
                    versions: vec![TranscriptionVersion {
                        author: "ana".to_string(),
                        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
                        content: "first".to_string(),
                    }],
                },
            );
        let (tx, _rx) = command_channel();
        let mut editor = TranscriptionEditor::new(FakeInput::default(), 1, ShortcutSuppression::new(), tx);
        editor.open(&model, ids[0]);
        assert_eq!(editor.input().text, "second");

        assert!(editor.revert_to(&model, 0));
        assert_eq!(editor.input().text, "first");
        assert!(editor.is_dirty());
        assert!(!editor.revert_to(&model, 4));
    }
}
