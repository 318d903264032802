// Toolbar Command Dispatcher
// Every toolbar action and text mutation enters through a single apply()
// path so that history tracking and change notification stay uniform

use super::markdown::{document_to_markdown, markdown_to_document};
use super::structured_document::{DocumentPosition, ImageRef, StructuredDocument};
use super::structured_editor::{EditResult, StructuredEditor};

const MAX_UNDO_DEPTH: usize = 100;

/// A toolbar command targeting the current selection
#[derive(Debug, Clone, PartialEq)]
pub enum EditorCommand {
    ToggleBold,
    ToggleItalic,
    ToggleHeading { level: u8 },
    ToggleBulletList,
    ToggleOrderedList,
    ToggleBlockquote,
    SetLink { url: String },
    InsertImage { url: String },
    Undo,
    Redo,
}

/// Whether a command changed the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied,
    Ignored,
}

impl CommandOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, CommandOutcome::Applied)
    }
}

/// Document state captured before a mutation, sufficient to restore
/// both content and selection exactly
#[derive(Debug, Clone)]
struct EditorSnapshot {
    markup: String,
    cursor: DocumentPosition,
    selection: Option<(DocumentPosition, DocumentPosition)>,
}

/// Rich text editor for tutorial content with undo/redo history
/// and change notification
pub struct TutorialEditor {
    editor: StructuredEditor,
    undo_stack: Vec<EditorSnapshot>,
    redo_stack: Vec<EditorSnapshot>,
    change_cb: Option<Box<dyn FnMut(&str) + 'static>>,
}

impl TutorialEditor {
    pub fn new() -> Self {
        Self::from_markup("")
    }

    pub fn from_markup(markup: &str) -> Self {
        TutorialEditor {
            editor: StructuredEditor::with_document(markdown_to_document(markup)),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            change_cb: None,
        }
    }

    /// Register a callback invoked with the serialized markup after
    /// every applied mutation
    pub fn on_change(&mut self, f: Box<dyn FnMut(&str) + 'static>) {
        self.change_cb = Some(f);
    }

    pub fn document(&self) -> &StructuredDocument {
        self.editor.document()
    }

    pub fn serialize(&self) -> String {
        document_to_markdown(self.editor.document())
    }

    pub fn cursor(&self) -> DocumentPosition {
        self.editor.cursor()
    }

    pub fn selection(&self) -> Option<(DocumentPosition, DocumentPosition)> {
        self.editor.selection()
    }

    pub fn set_cursor(&mut self, position: DocumentPosition) {
        self.editor.set_cursor(position);
    }

    pub fn set_selection(&mut self, anchor: DocumentPosition, focus: DocumentPosition) {
        self.editor.set_selection(anchor, focus);
    }

    pub fn clear_selection(&mut self) {
        self.editor.clear_selection();
    }

    pub fn select_all(&mut self) {
        self.editor.select_all();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Apply a toolbar command
    /// Returns Ignored for no-ops: empty URLs, inline style toggles
    /// without a selection, undo/redo at a history boundary
    pub fn apply(&mut self, command: EditorCommand) -> CommandOutcome {
        match command {
            EditorCommand::ToggleBold => self.track(|ed| ed.toggle_bold()),
            EditorCommand::ToggleItalic => self.track(|ed| ed.toggle_italic()),
            EditorCommand::ToggleHeading { level } => self.track(|ed| ed.toggle_heading(level)),
            EditorCommand::ToggleBulletList => self.track(|ed| ed.toggle_bullet_list()),
            EditorCommand::ToggleOrderedList => self.track(|ed| ed.toggle_ordered_list()),
            EditorCommand::ToggleBlockquote => self.track(|ed| ed.toggle_blockquote()),
            EditorCommand::SetLink { url } => {
                if url.is_empty() {
                    return CommandOutcome::Ignored;
                }
                self.track(|ed| ed.set_link(&url))
            }
            EditorCommand::InsertImage { url } => {
                if url.is_empty() {
                    return CommandOutcome::Ignored;
                }
                self.track(|ed| {
                    ed.insert_image(ImageRef {
                        source: url,
                        alt: String::new(),
                        title: None,
                    })
                })
            }
            EditorCommand::Undo => self.undo(),
            EditorCommand::Redo => self.redo(),
        }
    }

    pub fn insert_text(&mut self, text: &str) -> CommandOutcome {
        self.track(|ed| ed.insert_text(text))
    }

    pub fn insert_newline(&mut self) -> CommandOutcome {
        self.track(|ed| ed.insert_newline())
    }

    pub fn delete_backward(&mut self) -> CommandOutcome {
        self.track(|ed| ed.delete_backward())
    }

    pub fn delete_forward(&mut self) -> CommandOutcome {
        self.track(|ed| ed.delete_forward())
    }

    /// Replace the whole document, recorded as a single history entry
    pub fn replace_content(&mut self, markup: &str) -> CommandOutcome {
        self.track(|ed| {
            ed.set_document(markdown_to_document(markup));
            Ok(())
        })
    }

    /// Run a mutation against the editor, recording one history entry
    /// when it changed the serialized document
    fn track<F>(&mut self, mutation: F) -> CommandOutcome
    where
        F: FnOnce(&mut StructuredEditor) -> EditResult,
    {
        let before = self.snapshot();

        if mutation(&mut self.editor).is_err() {
            return CommandOutcome::Ignored;
        }
        self.editor.clamp_cursor_and_selection();

        let after = self.serialize();
        if after == before.markup {
            // Selection-only effects make no history entry
            return CommandOutcome::Ignored;
        }

        self.undo_stack.push(before);
        if self.undo_stack.len() > MAX_UNDO_DEPTH {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
        self.emit_change(&after);
        CommandOutcome::Applied
    }

    fn undo(&mut self) -> CommandOutcome {
        let Some(entry) = self.undo_stack.pop() else {
            return CommandOutcome::Ignored;
        };
        let current = self.snapshot();
        self.redo_stack.push(current);
        let markup = entry.markup.clone();
        self.restore(entry);
        self.emit_change(&markup);
        CommandOutcome::Applied
    }

    fn redo(&mut self) -> CommandOutcome {
        let Some(entry) = self.redo_stack.pop() else {
            return CommandOutcome::Ignored;
        };
        let current = self.snapshot();
        self.undo_stack.push(current);
        let markup = entry.markup.clone();
        self.restore(entry);
        self.emit_change(&markup);
        CommandOutcome::Applied
    }

    fn snapshot(&self) -> EditorSnapshot {
        EditorSnapshot {
            markup: self.serialize(),
            cursor: self.editor.cursor(),
            selection: self.editor.selection(),
        }
    }

    fn restore(&mut self, entry: EditorSnapshot) {
        self.editor.set_document(markdown_to_document(&entry.markup));
        self.editor.set_cursor(entry.cursor);
        match entry.selection {
            Some((anchor, focus)) => self.editor.set_selection(anchor, focus),
            None => self.editor.clear_selection(),
        }
    }

    fn emit_change(&mut self, markup: &str) {
        if let Some(cb) = &mut self.change_cb {
            cb(markup);
        }
    }
}

impl Default for TutorialEditor {
    fn default() -> Self {
        Self::new()
    }
}
