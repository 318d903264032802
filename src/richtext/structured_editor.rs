// Structured Editor
// Provides editing operations on a StructuredDocument
// Completely independent of markdown syntax

use super::structured_document::*;

/// Result of an editing operation
pub type EditResult = Result<(), EditError>;

/// Errors that can occur during editing
#[derive(Debug, Clone, PartialEq)]
pub enum EditError {
    InvalidBlockIndex,
    EmptyDocument,
}

impl std::fmt::Display for EditError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EditError::InvalidBlockIndex => write!(f, "block index out of range"),
            EditError::EmptyDocument => write!(f, "document has no blocks"),
        }
    }
}

impl std::error::Error for EditError {}

/// The structured editor with cursor state
pub struct StructuredEditor {
    document: StructuredDocument,
    cursor: DocumentPosition,
    selection: Option<(DocumentPosition, DocumentPosition)>, // (anchor, focus)
}

impl StructuredEditor {
    /// Create a new editor with an empty document
    pub fn new() -> Self {
        StructuredEditor {
            document: StructuredDocument::new(),
            cursor: DocumentPosition::start(),
            selection: None,
        }
    }

    /// Create an editor with an existing document
    pub fn with_document(document: StructuredDocument) -> Self {
        StructuredEditor {
            document,
            cursor: DocumentPosition::start(),
            selection: None,
        }
    }

    /// Get the document
    pub fn document(&self) -> &StructuredDocument {
        &self.document
    }

    /// Get mutable document
    pub fn document_mut(&mut self) -> &mut StructuredDocument {
        &mut self.document
    }

    /// Replace the document, clamping cursor and selection into the new bounds
    pub fn set_document(&mut self, document: StructuredDocument) {
        self.document = document;
        self.clamp_cursor_and_selection();
    }

    /// Get cursor position
    pub fn cursor(&self) -> DocumentPosition {
        self.cursor
    }

    /// Set cursor position (will be clamped to valid range)
    pub fn set_cursor(&mut self, pos: DocumentPosition) {
        self.cursor = self.document.clamp_position(pos);
        self.selection = None; // Clear selection when moving cursor
    }

    /// Get selection range
    pub fn selection(&self) -> Option<(DocumentPosition, DocumentPosition)> {
        self.selection
    }

    /// Set selection range
    pub fn set_selection(&mut self, anchor: DocumentPosition, focus: DocumentPosition) {
        let anchor = self.document.clamp_position(anchor);
        let focus = self.document.clamp_position(focus);
        self.selection = Some((anchor, focus));
        self.cursor = focus;
    }

    /// Clear selection
    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Select all content in the document
    pub fn select_all(&mut self) {
        if self.document.block_count() == 0 {
            self.selection = None;
            return;
        }
        let start = DocumentPosition::new(0, 0);
        let last_idx = self.document.block_count() - 1;
        let end = {
            let blocks = self.document.blocks();
            let last_len = blocks[last_idx].text_len();
            DocumentPosition::new(last_idx, last_len)
        };
        self.selection = Some((start, end));
        self.cursor = end;
    }

    /// Re-clamp cursor and selection into document bounds.
    /// Called after every mutation so the next command always sees a valid range.
    pub fn clamp_cursor_and_selection(&mut self) {
        self.cursor = self.document.clamp_position(self.cursor);
        if let Some((anchor, focus)) = self.selection {
            let anchor = self.document.clamp_position(anchor);
            let focus = self.document.clamp_position(focus);
            self.selection = Some((anchor, focus));
        }
    }

    /// Selection normalized to document order, if any
    fn ordered_selection(&self) -> Option<(DocumentPosition, DocumentPosition)> {
        let (a, b) = self.selection?;
        if b.block_index < a.block_index || (b.block_index == a.block_index && b.offset < a.offset)
        {
            Some((b, a))
        } else {
            Some((a, b))
        }
    }

    /// The block range covered by the selection, or the cursor's block
    fn selected_block_range(&self) -> Result<(usize, usize), EditError> {
        if self.document.block_count() == 0 {
            return Err(EditError::EmptyDocument);
        }
        match self.ordered_selection() {
            Some((start, end)) => {
                if end.block_index >= self.document.block_count() {
                    return Err(EditError::InvalidBlockIndex);
                }
                Ok((start.block_index, end.block_index))
            }
            None => {
                if self.cursor.block_index >= self.document.block_count() {
                    return Err(EditError::InvalidBlockIndex);
                }
                Ok((self.cursor.block_index, self.cursor.block_index))
            }
        }
    }

    /// Insert text at cursor position
    pub fn insert_text(&mut self, text: &str) -> EditResult {
        if self.document.is_empty() {
            // Create a new paragraph if document is empty
            let block = Block::paragraph(0).with_plain_text(text);
            self.document.add_block(block);
            self.cursor = DocumentPosition::new(0, text.len());
            return Ok(());
        }

        // Delete selection first if there is one
        if self.selection.is_some() {
            self.delete_selection()?;
        }

        let block_index = self.cursor.block_index;
        if block_index >= self.document.block_count() {
            return Err(EditError::InvalidBlockIndex);
        }

        let offset = self.cursor.offset;

        // Find the inline content and offset within it before borrowing mutably
        let (content_idx, content_offset) = {
            let block = &self.document.blocks()[block_index];
            Self::find_content_at_offset(&block.content, offset)
        };

        // Precompute inner indices if we're inside a link to avoid borrow issues
        let inner_within_link: Option<(usize, usize)> = {
            let block = &self.document.blocks()[block_index];
            if let Some(InlineContent::Link { content, .. }) = block.content.get(content_idx) {
                Some(Self::find_content_at_offset(content, content_offset))
            } else {
                None
            }
        };

        let blocks = self.document.blocks_mut();
        let block = &mut blocks[block_index];

        if content_idx >= block.content.len() {
            // Append to end
            block.content.push(InlineContent::Text(TextRun::plain(text)));
        } else {
            match &mut block.content[content_idx] {
                InlineContent::Text(run) => {
                    run.insert_text(content_offset, text);
                }
                InlineContent::Link { content, .. } => {
                    // At link edges, insert outside the link rather than into its
                    // inner content; inside, typing stays within the link.
                    let link_len: usize = content.iter().map(|c| c.text_len()).sum();

                    if content_offset == 0 {
                        // Insert before the link. If there is a previous text run,
                        // append into it; otherwise insert a fresh text run.
                        if content_idx > 0 {
                            if let InlineContent::Text(prev_run) =
                                &mut block.content[content_idx - 1]
                            {
                                let prev_len = prev_run.len();
                                prev_run.insert_text(prev_len, text);
                            } else {
                                block
                                    .content
                                    .insert(content_idx, InlineContent::Text(TextRun::plain(text)));
                            }
                        } else {
                            block
                                .content
                                .insert(content_idx, InlineContent::Text(TextRun::plain(text)));
                        }
                    } else if content_offset >= link_len {
                        // Insert after the link. If there is a following text run,
                        // prepend into it; otherwise insert a fresh text run.
                        if content_idx + 1 < block.content.len() {
                            if let InlineContent::Text(next_run) =
                                &mut block.content[content_idx + 1]
                            {
                                next_run.insert_text(0, text);
                            } else {
                                block.content.insert(
                                    content_idx + 1,
                                    InlineContent::Text(TextRun::plain(text)),
                                );
                            }
                        } else {
                            block.content.push(InlineContent::Text(TextRun::plain(text)));
                        }
                    } else {
                        // Insert within the link's inner content so typing stays inside the link
                        let (inner_idx, inner_off) =
                            inner_within_link.unwrap_or((content.len(), 0));
                        if inner_idx >= content.len() {
                            content.push(InlineContent::Text(TextRun::plain(text)));
                        } else {
                            match &mut content[inner_idx] {
                                InlineContent::Text(run) => run.insert_text(inner_off, text),
                                _ => content
                                    .insert(inner_idx, InlineContent::Text(TextRun::plain(text))),
                            }
                        }
                    }
                }
                InlineContent::Image(_) | InlineContent::LineBreak | InlineContent::HardBreak => {
                    // Insert new text run before this element
                    block
                        .content
                        .insert(content_idx, InlineContent::Text(TextRun::plain(text)));
                }
            }
        }

        // Move cursor forward
        self.cursor.offset += text.len();

        Ok(())
    }

    /// Insert a newline at cursor (creates new paragraph or continues list)
    pub fn insert_newline(&mut self) -> EditResult {
        if self.document.is_empty() {
            self.document.add_block(Block::paragraph(0));
            self.document.add_block(Block::paragraph(0));
            self.cursor = DocumentPosition::new(1, 0);
            return Ok(());
        }

        if self.selection.is_some() {
            self.delete_selection()?;
        }

        let block_index = self.cursor.block_index;
        if block_index >= self.document.block_count() {
            return Err(EditError::InvalidBlockIndex);
        }

        let offset = self.cursor.offset;

        let (block_type, is_empty) = {
            let current_block = &self.document.blocks()[block_index];
            (current_block.block_type.clone(), current_block.is_empty())
        };

        if let BlockType::ListItem { ordered, number } = &block_type {
            // An empty list item exits the list
            if is_empty {
                let blocks = self.document.blocks_mut();
                blocks[block_index].block_type = BlockType::Paragraph;
                self.cursor.offset = 0;
                return Ok(());
            }

            // Split the current list item at the cursor, preserving link structure
            let right_content = {
                let blocks = self.document.blocks_mut();
                blocks[block_index].split_content_at(offset)
            };

            let new_number = if *ordered { number.map(|n| n + 1) } else { None };
            let mut new_item = Block::list_item(0, *ordered, new_number);
            new_item.content = right_content;

            self.document.insert_block(block_index + 1, new_item);
            self.cursor = DocumentPosition::new(block_index + 1, 0);
        } else {
            let right_content = {
                let blocks = self.document.blocks_mut();
                blocks[block_index].split_content_at(offset)
            };

            let mut new_para = Block::paragraph(0);
            new_para.content = right_content;

            self.document.insert_block(block_index + 1, new_para);
            self.cursor = DocumentPosition::new(block_index + 1, 0);
        }

        Ok(())
    }

    /// Delete grapheme before cursor (backspace)
    pub fn delete_backward(&mut self) -> EditResult {
        if self.document.is_empty() {
            return Err(EditError::EmptyDocument);
        }

        if self.selection.is_some() {
            return self.delete_selection();
        }

        let block_index = self.cursor.block_index;
        let offset = self.cursor.offset;

        if offset == 0 {
            // At start of block - merge with previous block
            if block_index == 0 {
                return Ok(()); // At start of document, nothing to delete
            }

            if let Some(current_block) = self.document.remove_block(block_index) {
                let blocks = self.document.blocks_mut();
                let prev_block = &mut blocks[block_index - 1];
                let prev_len = prev_block.text_len();

                prev_block.content.extend(current_block.content);
                prev_block.normalize_content();

                self.cursor = DocumentPosition::new(block_index - 1, prev_len);
            }
        } else {
            let prev = self.document.previous_grapheme_position(self.cursor);
            if prev.offset < offset {
                let blocks = self.document.blocks_mut();
                let block = &mut blocks[block_index];
                block.delete_text_range(prev.offset, offset);
                block.normalize_content();
                self.cursor.offset = prev.offset;
            }
        }
        Ok(())
    }

    /// Delete grapheme at cursor (delete key)
    pub fn delete_forward(&mut self) -> EditResult {
        if self.document.is_empty() {
            return Err(EditError::EmptyDocument);
        }

        if self.selection.is_some() {
            return self.delete_selection();
        }

        let block_index = self.cursor.block_index;
        let offset = self.cursor.offset;
        let block_len = self.document.blocks()[block_index].text_len();

        if offset >= block_len {
            // At end of block - merge with next block; past the last block
            // there is nothing to remove and the delete is a no-op
            if let Some(next_block) = self.document.remove_block(block_index + 1) {
                let blocks = self.document.blocks_mut();
                let block = &mut blocks[block_index];
                block.content.extend(next_block.content);
                block.normalize_content();
            }
        } else {
            let next = self.document.next_grapheme_position(self.cursor);
            if next.offset > offset {
                let blocks = self.document.blocks_mut();
                let block = &mut blocks[block_index];
                block.delete_text_range(offset, next.offset);
                block.normalize_content();
            }
        }
        Ok(())
    }

    /// Delete the current selection, if any
    pub fn delete_selection(&mut self) -> EditResult {
        let Some((start, end)) = self.ordered_selection() else {
            return Ok(());
        };

        // Delegate range deletion to document, which handles intra- and inter-block cases
        self.document.delete_range(start, end);

        self.cursor = self.document.clamp_position(start);
        self.selection = None;

        Ok(())
    }

    /// Move cursor left by one grapheme
    pub fn move_cursor_left(&mut self) {
        if self.cursor.offset > 0 {
            self.cursor = self.document.previous_grapheme_position(self.cursor);
        } else if self.cursor.block_index > 0 {
            // Move to end of previous block
            self.cursor.block_index -= 1;
            let blocks = self.document.blocks();
            self.cursor.offset = blocks[self.cursor.block_index].text_len();
        }
        self.cursor = self.document.clamp_position(self.cursor);
        self.selection = None;
    }

    /// Move cursor right by one grapheme
    pub fn move_cursor_right(&mut self) {
        let blocks = self.document.blocks();
        if self.cursor.block_index >= blocks.len() {
            return;
        }

        let block_len = blocks[self.cursor.block_index].text_len();

        if self.cursor.offset < block_len {
            self.cursor = self.document.next_grapheme_position(self.cursor);
        } else if self.cursor.block_index < blocks.len() - 1 {
            // Move to start of next block
            self.cursor.block_index += 1;
            self.cursor.offset = 0;
        }
        self.cursor = self.document.clamp_position(self.cursor);
        self.selection = None;
    }

    /// Move cursor up (to previous block)
    pub fn move_cursor_up(&mut self) {
        if self.cursor.block_index > 0 {
            self.cursor.block_index -= 1;
            let blocks = self.document.blocks();
            let new_block_len = blocks[self.cursor.block_index].text_len();
            self.cursor.offset = self.cursor.offset.min(new_block_len);
            self.cursor = self.document.clamp_position(self.cursor);
        }
        self.selection = None;
    }

    /// Move cursor down (to next block)
    pub fn move_cursor_down(&mut self) {
        let blocks = self.document.blocks();
        if !blocks.is_empty() && self.cursor.block_index < blocks.len() - 1 {
            self.cursor.block_index += 1;
            let new_block_len = blocks[self.cursor.block_index].text_len();
            self.cursor.offset = self.cursor.offset.min(new_block_len);
            self.cursor = self.document.clamp_position(self.cursor);
        }
        self.selection = None;
    }

    /// Toggle heading at the given level on every block covered by the selection.
    /// All blocks already at that level turn back into paragraphs; otherwise the
    /// whole range becomes headings of that level.
    pub fn toggle_heading(&mut self, level: u8) -> EditResult {
        let level = level.clamp(1, 6);
        let (first, last) = self.selected_block_range()?;
        let target = BlockType::Heading { level };

        let all_match = self.document.blocks()[first..=last]
            .iter()
            .all(|b| b.block_type == target);

        let blocks = self.document.blocks_mut();
        for block in &mut blocks[first..=last] {
            block.block_type = if all_match {
                BlockType::Paragraph
            } else {
                target.clone()
            };
        }

        Ok(())
    }

    /// Toggle bulleted list on the selected block range
    pub fn toggle_bullet_list(&mut self) -> EditResult {
        self.toggle_list_kind(false)
    }

    /// Toggle numbered list on the selected block range
    pub fn toggle_ordered_list(&mut self) -> EditResult {
        self.toggle_list_kind(true)
    }

    fn toggle_list_kind(&mut self, ordered: bool) -> EditResult {
        let (first, last) = self.selected_block_range()?;

        let all_match = self.document.blocks()[first..=last].iter().all(|b| {
            matches!(&b.block_type, BlockType::ListItem { ordered: o, .. } if *o == ordered)
        });

        let blocks = self.document.blocks_mut();
        for block in &mut blocks[first..=last] {
            block.block_type = if all_match {
                BlockType::Paragraph
            } else {
                BlockType::ListItem {
                    ordered,
                    number: None,
                }
            };
        }

        Ok(())
    }

    /// Toggle blockquote on the selected block range
    pub fn toggle_blockquote(&mut self) -> EditResult {
        let (first, last) = self.selected_block_range()?;

        let all_match = self.document.blocks()[first..=last]
            .iter()
            .all(|b| b.block_type == BlockType::BlockQuote);

        let blocks = self.document.blocks_mut();
        for block in &mut blocks[first..=last] {
            block.block_type = if all_match {
                BlockType::Paragraph
            } else {
                BlockType::BlockQuote
            };
        }

        Ok(())
    }

    /// Toggle bold style on the current selection
    pub fn toggle_bold(&mut self) -> EditResult {
        self.toggle_style_attribute(|style| {
            style.bold = !style.bold;
        })
    }

    /// Toggle italic style on the current selection
    pub fn toggle_italic(&mut self) -> EditResult {
        self.toggle_style_attribute(|style| {
            style.italic = !style.italic;
        })
    }

    /// Toggle a style attribute on the current selection.
    /// Each run's flag is flipped individually, so applying the same toggle
    /// twice restores the exact prior styling even over mixed selections.
    fn toggle_style_attribute<F>(&mut self, mut apply_style: F) -> EditResult
    where
        F: FnMut(&mut TextStyle),
    {
        let Some((start, end)) = self.ordered_selection() else {
            return Ok(());
        };

        // Single-block selection
        if start.block_index == end.block_index {
            let block_index = start.block_index;
            if block_index >= self.document.block_count() {
                return Err(EditError::InvalidBlockIndex);
            }

            let (content_before, selected_content, content_after) = {
                let block = &self.document.blocks()[block_index];
                Self::split_content_for_style(&block.content, start.offset, end.offset)
            };

            let styled_content = Self::map_style_on_runs(selected_content, &mut apply_style);

            let blocks = self.document.blocks_mut();
            let block = &mut blocks[block_index];
            block.content = content_before;
            block.content.extend(styled_content);
            block.content.extend(content_after);
            block.normalize_content();
            return Ok(());
        }

        // Multi-block selection: style tail of start, all middle, head of end
        let blocks_len = self.document.block_count();
        if start.block_index >= blocks_len || end.block_index >= blocks_len {
            return Err(EditError::InvalidBlockIndex);
        }

        // Start block: from start.offset to end of block
        {
            let (before, selected, after) = {
                let block = &self.document.blocks()[start.block_index];
                let block_len = block.text_len();
                Self::split_content_for_style(&block.content, start.offset, block_len)
            };
            let styled = Self::map_style_on_runs(selected, &mut apply_style);
            let blocks = self.document.blocks_mut();
            let block_mut = &mut blocks[start.block_index];
            block_mut.content = before
                .into_iter()
                .chain(styled.into_iter())
                .chain(after.into_iter())
                .collect();
            block_mut.normalize_content();
        }

        // Middle blocks
        for i in (start.block_index + 1)..end.block_index {
            let styled = {
                let b = &self.document.blocks()[i];
                Self::map_style_on_runs(b.content.clone(), &mut apply_style)
            };
            let blocks = self.document.blocks_mut();
            blocks[i].content = styled;
            blocks[i].normalize_content();
        }

        // End block: from 0 to end.offset
        {
            let (before, selected, after) = {
                let block = &self.document.blocks()[end.block_index];
                Self::split_content_for_style(&block.content, 0, end.offset)
            };
            let styled = Self::map_style_on_runs(selected, &mut apply_style);
            let blocks = self.document.blocks_mut();
            let block_mut = &mut blocks[end.block_index];
            block_mut.content = before
                .into_iter()
                .chain(styled.into_iter())
                .chain(after.into_iter())
                .collect();
            block_mut.normalize_content();
        }

        Ok(())
    }

    /// Wrap the current selection in a link, preserving styled runs.
    /// Any link already inside the selection is unwrapped first; links never nest.
    /// With no selection the destination itself is inserted as link text.
    pub fn set_link(&mut self, destination: &str) -> EditResult {
        let Some((start, end)) = self.ordered_selection() else {
            return self.insert_link_at_cursor(destination, destination);
        };

        if start == end {
            return self.insert_link_at_cursor(destination, destination);
        }

        // Only single-block selections can be wrapped into one link; a spanning
        // selection wraps the portion in each covered block separately.
        let link = Link {
            destination: destination.to_string(),
            title: None,
        };

        let (first, last) = (start.block_index, end.block_index);
        if last >= self.document.block_count() {
            return Err(EditError::InvalidBlockIndex);
        }

        for block_index in first..=last {
            let block_len = self.document.blocks()[block_index].text_len();
            let from = if block_index == first { start.offset } else { 0 };
            let to = if block_index == last { end.offset } else { block_len };
            if from >= to {
                continue;
            }

            let (before, selected, after) = {
                let block = &self.document.blocks()[block_index];
                Self::split_content_for_style(&block.content, from, to)
            };

            let inner = Self::unwrap_links(selected);
            if inner.is_empty() {
                continue;
            }

            let blocks = self.document.blocks_mut();
            let block = &mut blocks[block_index];
            block.content = before;
            block.content.push(InlineContent::Link {
                link: link.clone(),
                content: inner,
            });
            block.content.extend(after);
            block.normalize_content();
        }

        Ok(())
    }

    /// Insert a link at the cursor
    pub fn insert_link_at_cursor(&mut self, destination: &str, text: &str) -> EditResult {
        let link_inline = InlineContent::Link {
            link: Link {
                destination: destination.to_string(),
                title: None,
            },
            content: vec![InlineContent::Text(TextRun::plain(text))],
        };
        self.insert_inline_at_cursor(link_inline)
    }

    /// Insert an inline image at the cursor, replacing any selection
    pub fn insert_image(&mut self, image: ImageRef) -> EditResult {
        self.insert_inline_at_cursor(InlineContent::Image(image))
    }

    /// Insert an inline element at the current cursor position
    pub fn insert_inline_at_cursor(&mut self, inline: InlineContent) -> EditResult {
        let inserted_len = inline.text_len();

        if self.document.is_empty() {
            let mut block = Block::paragraph(0);
            block.content.push(inline);
            self.document.add_block(block);
            self.cursor = DocumentPosition::new(0, inserted_len);
            return Ok(());
        }

        // Delete selection first if there is one
        if self.selection.is_some() {
            self.delete_selection()?;
        }

        let block_index = self.cursor.block_index;
        if block_index >= self.document.block_count() {
            return Err(EditError::InvalidBlockIndex);
        }

        let offset = self.cursor.offset;
        let right = {
            let blocks = self.document.blocks_mut();
            blocks[block_index].split_content_at(offset)
        };

        let blocks = self.document.blocks_mut();
        let block = &mut blocks[block_index];
        block.content.push(inline);
        block.content.extend(right);

        self.cursor.offset = offset + inserted_len;
        self.selection = None;
        Ok(())
    }

    /// Find the content element and offset within it for a given block offset
    fn find_content_at_offset(content: &[InlineContent], offset: usize) -> (usize, usize) {
        let mut current_offset = 0;

        for (idx, item) in content.iter().enumerate() {
            let item_len = item.text_len();
            // Use >= so that cursor at end of a run can still delete backward
            if current_offset + item_len >= offset {
                return (idx, offset - current_offset);
            }
            current_offset += item_len;
        }

        // Past the end - return position after last element
        (content.len(), 0)
    }

    /// Split content into three parts: before selection, within selection, after selection
    fn split_content_for_style(
        content: &[InlineContent],
        start_offset: usize,
        end_offset: usize,
    ) -> (Vec<InlineContent>, Vec<InlineContent>, Vec<InlineContent>) {
        let mut before = Vec::new();
        let mut selected = Vec::new();
        let mut after = Vec::new();

        let mut current_offset = 0;

        for item in content {
            let item_len = item.text_len();
            let item_start = current_offset;
            let item_end = current_offset + item_len;

            if item_end <= start_offset {
                // Entirely before selection
                before.push(item.clone());
            } else if item_start >= end_offset {
                // Entirely after selection
                after.push(item.clone());
            } else if item_start >= start_offset && item_end <= end_offset {
                // Entirely within selection
                selected.push(item.clone());
            } else {
                // Partially overlaps - need to split
                match item {
                    InlineContent::Text(run) => {
                        let text = &run.text;

                        let sel_start_in_run = start_offset.saturating_sub(item_start);
                        let sel_end_in_run = end_offset.saturating_sub(item_start).min(item_len);

                        if sel_start_in_run > 0 {
                            let mut before_run = run.clone();
                            before_run.text = text[..sel_start_in_run].to_string();
                            before.push(InlineContent::Text(before_run));
                        }

                        if sel_end_in_run > sel_start_in_run {
                            let mut selected_run = run.clone();
                            selected_run.text = text[sel_start_in_run..sel_end_in_run].to_string();
                            selected.push(InlineContent::Text(selected_run));
                        }

                        if sel_end_in_run < item_len {
                            let mut after_run = run.clone();
                            after_run.text = text[sel_end_in_run..].to_string();
                            after.push(InlineContent::Text(after_run));
                        }
                    }
                    InlineContent::Link {
                        link,
                        content: inner,
                    } => {
                        // Split the link's inner content; each non-empty part keeps the link
                        let inner_start = start_offset.saturating_sub(item_start);
                        let inner_end = end_offset.saturating_sub(item_start).min(item_len);
                        let (i_before, i_sel, i_after) =
                            Self::split_content_for_style(inner, inner_start, inner_end);
                        for (part, bucket) in [
                            (i_before, &mut before),
                            (i_sel, &mut selected),
                            (i_after, &mut after),
                        ] {
                            if !part.is_empty() {
                                bucket.push(InlineContent::Link {
                                    link: link.clone(),
                                    content: part,
                                });
                            }
                        }
                    }
                    _ => {
                        // Single-character items land in whichever section holds their start
                        if item_start < start_offset {
                            before.push(item.clone());
                        } else if item_start < end_offset {
                            selected.push(item.clone());
                        } else {
                            after.push(item.clone());
                        }
                    }
                }
            }

            current_offset += item_len;
        }

        (before, selected, after)
    }

    /// Recursively apply a style-mapping function to all text runs in a vector of inline content
    fn map_style_on_runs<F>(items: Vec<InlineContent>, apply: &mut F) -> Vec<InlineContent>
    where
        F: FnMut(&mut TextStyle),
    {
        items
            .into_iter()
            .map(|item| match item {
                InlineContent::Text(mut run) => {
                    apply(&mut run.style);
                    InlineContent::Text(run)
                }
                InlineContent::Link { link, content } => {
                    let mapped = Self::map_style_on_runs(content, apply);
                    InlineContent::Link {
                        link,
                        content: mapped,
                    }
                }
                other => other,
            })
            .collect()
    }

    /// Replace links by their inner content, recursively
    fn unwrap_links(items: Vec<InlineContent>) -> Vec<InlineContent> {
        let mut result = Vec::with_capacity(items.len());
        for item in items {
            match item {
                InlineContent::Link { content, .. } => {
                    result.extend(Self::unwrap_links(content));
                }
                other => result.push(other),
            }
        }
        result
    }
}

impl Default for StructuredEditor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_text() {
        let mut editor = StructuredEditor::new();
        editor.insert_text("Hello").unwrap();
        assert_eq!(editor.document().to_plain_text(), "Hello");
        assert_eq!(editor.cursor().offset, 5);
    }

    #[test]
    fn test_insert_text_multiple() {
        let mut editor = StructuredEditor::new();
        editor.insert_text("Hello").unwrap();
        editor.insert_text(" world").unwrap();
        assert_eq!(editor.document().to_plain_text(), "Hello world");
    }

    #[test]
    fn test_delete_backward() {
        let mut editor = StructuredEditor::new();
        editor.insert_text("Hello").unwrap();
        editor.delete_backward().unwrap();
        assert_eq!(editor.document().to_plain_text(), "Hell");
        assert_eq!(editor.cursor().offset, 4);
    }

    #[test]
    fn test_delete_backward_removes_whole_grapheme() {
        let mut editor = StructuredEditor::new();
        editor.insert_text("aé").unwrap();
        editor.delete_backward().unwrap();
        assert_eq!(editor.document().to_plain_text(), "a");
    }

    #[test]
    fn test_delete_backward_merges_blocks() {
        let mut editor = StructuredEditor::new();
        editor.insert_text("Hello").unwrap();
        editor.insert_newline().unwrap();
        editor.insert_text("World").unwrap();
        editor.set_cursor(DocumentPosition::new(1, 0));
        editor.delete_backward().unwrap();

        assert_eq!(editor.document().block_count(), 1);
        assert_eq!(editor.document().to_plain_text(), "HelloWorld");
    }

    #[test]
    fn test_insert_newline() {
        let mut editor = StructuredEditor::new();
        editor.insert_text("Hello").unwrap();
        editor.insert_newline().unwrap();
        editor.insert_text("World").unwrap();

        assert_eq!(editor.document().block_count(), 2);
        assert_eq!(editor.document().blocks()[0].to_plain_text(), "Hello");
        assert_eq!(editor.document().blocks()[1].to_plain_text(), "World");
    }

    #[test]
    fn test_list_continues_on_newline() {
        let mut editor = StructuredEditor::new();
        editor.insert_text("item one").unwrap();
        editor.toggle_bullet_list().unwrap();
        editor.insert_newline().unwrap();

        assert!(matches!(
            editor.document().blocks()[1].block_type,
            BlockType::ListItem { ordered: false, .. }
        ));
    }

    #[test]
    fn test_empty_list_item_exits_list() {
        let mut editor = StructuredEditor::new();
        editor.insert_text("item").unwrap();
        editor.toggle_bullet_list().unwrap();
        editor.insert_newline().unwrap();
        // Cursor is now in an empty list item; another newline leaves the list
        editor.insert_newline().unwrap();

        assert_eq!(
            editor.document().blocks()[1].block_type,
            BlockType::Paragraph
        );
    }

    #[test]
    fn test_cursor_movement() {
        let mut editor = StructuredEditor::new();
        editor.insert_text("Hi").unwrap();
        editor.move_cursor_left();
        assert_eq!(editor.cursor().offset, 1);
        editor.move_cursor_right();
        assert_eq!(editor.cursor().offset, 2);
    }

    #[test]
    fn test_cursor_moves_between_blocks() {
        let mut editor = StructuredEditor::new();
        editor.insert_text("first").unwrap();
        editor.insert_newline().unwrap();
        editor.insert_text("second").unwrap();

        editor.set_cursor(DocumentPosition::new(1, 3));
        editor.move_cursor_up();
        assert_eq!(editor.cursor(), DocumentPosition::new(0, 3));
        editor.move_cursor_down();
        assert_eq!(editor.cursor(), DocumentPosition::new(1, 3));
    }

    #[test]
    fn test_vertical_cursor_movement_clamps_offset() {
        let mut editor = StructuredEditor::new();
        editor.insert_text("ab").unwrap();
        editor.insert_newline().unwrap();
        editor.insert_text("longer line").unwrap();

        // Cursor sits at the end of the longer second block
        editor.move_cursor_up();
        assert_eq!(editor.cursor(), DocumentPosition::new(0, 2));
        editor.move_cursor_down();
        assert_eq!(editor.cursor(), DocumentPosition::new(1, 2));
    }

    #[test]
    fn test_toggle_bold_applies_to_selection() {
        let mut editor = StructuredEditor::new();
        editor.insert_text("Hello world").unwrap();
        editor.set_selection(DocumentPosition::new(0, 0), DocumentPosition::new(0, 5));
        editor.toggle_bold().unwrap();

        let block = &editor.document().blocks()[0];
        assert_eq!(block.content.len(), 2);
        match &block.content[0] {
            InlineContent::Text(run) => {
                assert_eq!(run.text, "Hello");
                assert!(run.style.bold);
            }
            other => panic!("expected text run, got {:?}", other),
        }
    }

    #[test]
    fn test_toggle_bold_twice_restores_mixed_styles() {
        let mut editor = StructuredEditor::new();
        editor.insert_text("plain ").unwrap();
        editor
            .document_mut()
            .blocks_mut()[0]
            .content
            .push(InlineContent::Text(TextRun::new("bold", TextStyle::bold())));

        let before = editor.document().blocks()[0].content.clone();
        editor.set_selection(DocumentPosition::new(0, 0), DocumentPosition::new(0, 10));
        editor.toggle_bold().unwrap();
        editor.toggle_bold().unwrap();

        assert_eq!(editor.document().blocks()[0].content, before);
    }

    #[test]
    fn test_toggle_bold_across_blocks() {
        let mut editor = StructuredEditor::new();
        editor.insert_text("one").unwrap();
        editor.insert_newline().unwrap();
        editor.insert_text("two").unwrap();
        editor.set_selection(DocumentPosition::new(0, 1), DocumentPosition::new(1, 2));
        editor.toggle_bold().unwrap();

        let first = &editor.document().blocks()[0];
        let second = &editor.document().blocks()[1];
        assert!(matches!(&first.content[1], InlineContent::Text(r) if r.style.bold));
        assert!(matches!(&second.content[0], InlineContent::Text(r) if r.style.bold));
        assert!(matches!(&second.content[1], InlineContent::Text(r) if !r.style.bold));
    }

    #[test]
    fn test_toggle_heading_on_off() {
        let mut editor = StructuredEditor::new();
        editor.insert_text("Title").unwrap();
        editor.toggle_heading(1).unwrap();
        assert_eq!(
            editor.document().blocks()[0].block_type,
            BlockType::Heading { level: 1 }
        );

        editor.toggle_heading(1).unwrap();
        assert_eq!(
            editor.document().blocks()[0].block_type,
            BlockType::Paragraph
        );
    }

    #[test]
    fn test_toggle_heading_switches_level() {
        let mut editor = StructuredEditor::new();
        editor.insert_text("Title").unwrap();
        editor.toggle_heading(2).unwrap();
        editor.toggle_heading(1).unwrap();
        assert_eq!(
            editor.document().blocks()[0].block_type,
            BlockType::Heading { level: 1 }
        );
    }

    #[test]
    fn test_toggle_bullet_then_ordered() {
        let mut editor = StructuredEditor::new();
        editor.insert_text("item").unwrap();
        editor.toggle_bullet_list().unwrap();
        editor.toggle_ordered_list().unwrap();

        assert!(matches!(
            editor.document().blocks()[0].block_type,
            BlockType::ListItem { ordered: true, .. }
        ));
    }

    #[test]
    fn test_toggle_blockquote_over_selection() {
        let mut editor = StructuredEditor::new();
        editor.insert_text("one").unwrap();
        editor.insert_newline().unwrap();
        editor.insert_text("two").unwrap();
        editor.set_selection(DocumentPosition::new(0, 0), DocumentPosition::new(1, 3));
        editor.toggle_blockquote().unwrap();

        assert!(
            editor
                .document()
                .blocks()
                .iter()
                .all(|b| b.block_type == BlockType::BlockQuote)
        );
    }

    #[test]
    fn test_set_link_wraps_selection_preserving_styles() {
        let mut editor = StructuredEditor::new();
        editor.insert_text("read the docs").unwrap();
        editor.set_selection(DocumentPosition::new(0, 5), DocumentPosition::new(0, 8));
        editor.set_link("https://example.org").unwrap();

        let block = &editor.document().blocks()[0];
        let link = block
            .content
            .iter()
            .find_map(|c| match c {
                InlineContent::Link { link, content } => Some((link, content)),
                _ => None,
            })
            .expect("link inserted");
        assert_eq!(link.0.destination, "https://example.org");
        assert_eq!(link.1[0].to_plain_text(), "the");
    }

    #[test]
    fn test_set_link_unwraps_nested_links() {
        let mut editor = StructuredEditor::new();
        editor
            .insert_link_at_cursor("https://old.example.org", "old")
            .unwrap();
        editor.set_selection(DocumentPosition::new(0, 0), DocumentPosition::new(0, 3));
        editor.set_link("https://new.example.org").unwrap();

        let block = &editor.document().blocks()[0];
        assert_eq!(block.content.len(), 1);
        match &block.content[0] {
            InlineContent::Link { link, content } => {
                assert_eq!(link.destination, "https://new.example.org");
                assert!(matches!(&content[0], InlineContent::Text(_)));
            }
            other => panic!("expected link, got {:?}", other),
        }
    }

    #[test]
    fn test_set_link_without_selection_inserts_url_text() {
        let mut editor = StructuredEditor::new();
        editor.set_link("https://example.org").unwrap();

        let block = &editor.document().blocks()[0];
        assert_eq!(block.to_plain_text(), "https://example.org");
    }

    #[test]
    fn test_insert_image_at_cursor() {
        let mut editor = StructuredEditor::new();
        editor.insert_text("ab").unwrap();
        editor.set_cursor(DocumentPosition::new(0, 1));
        editor
            .insert_image(ImageRef {
                source: "https://example.org/pic.png".to_string(),
                alt: String::new(),
                title: None,
            })
            .unwrap();

        let block = &editor.document().blocks()[0];
        assert_eq!(block.content.len(), 3);
        assert!(matches!(&block.content[1], InlineContent::Image(_)));
        assert_eq!(editor.cursor().offset, 2);
    }

    #[test]
    fn test_insert_image_replaces_selection() {
        let mut editor = StructuredEditor::new();
        editor.insert_text("delete me").unwrap();
        editor.set_selection(DocumentPosition::new(0, 0), DocumentPosition::new(0, 9));
        editor
            .insert_image(ImageRef {
                source: "https://example.org/pic.png".to_string(),
                alt: String::new(),
                title: None,
            })
            .unwrap();

        let block = &editor.document().blocks()[0];
        assert_eq!(block.content.len(), 1);
        assert!(matches!(&block.content[0], InlineContent::Image(_)));
    }

    #[test]
    fn test_insert_text_inside_link_stays_inside() {
        let mut editor = StructuredEditor::new();
        editor
            .insert_link_at_cursor("https://example.org", "link")
            .unwrap();
        editor.set_cursor(DocumentPosition::new(0, 2));
        editor.insert_text("X").unwrap();

        let block = &editor.document().blocks()[0];
        match &block.content[0] {
            InlineContent::Link { content, .. } => {
                assert_eq!(content[0].to_plain_text(), "liXnk");
            }
            other => panic!("expected link, got {:?}", other),
        }
    }

    #[test]
    fn test_insert_text_at_start_of_link_inserts_before() {
        let mut editor = StructuredEditor::new();
        editor
            .insert_link_at_cursor("https://example.org", "link")
            .unwrap();
        editor.set_cursor(DocumentPosition::new(0, 0));
        editor.insert_text("pre ").unwrap();

        let block = &editor.document().blocks()[0];
        assert!(matches!(&block.content[0], InlineContent::Text(r) if r.text == "pre "));
        assert!(matches!(&block.content[1], InlineContent::Link { .. }));
    }

    #[test]
    fn test_selection_cleared_after_delete() {
        let mut editor = StructuredEditor::new();
        editor.insert_text("Hello world").unwrap();
        editor.set_selection(DocumentPosition::new(0, 5), DocumentPosition::new(0, 11));
        editor.delete_selection().unwrap();

        assert_eq!(editor.document().to_plain_text(), "Hello");
        assert!(editor.selection().is_none());
        assert_eq!(editor.cursor().offset, 5);
    }

    #[test]
    fn test_reversed_selection_is_normalized() {
        let mut editor = StructuredEditor::new();
        editor.insert_text("Hello world").unwrap();
        editor.set_selection(DocumentPosition::new(0, 11), DocumentPosition::new(0, 5));
        editor.delete_selection().unwrap();

        assert_eq!(editor.document().to_plain_text(), "Hello");
    }

    #[test]
    fn test_select_all() {
        let mut editor = StructuredEditor::new();
        editor.insert_text("one").unwrap();
        editor.insert_newline().unwrap();
        editor.insert_text("two").unwrap();
        editor.select_all();

        let (start, end) = editor.selection().unwrap();
        assert_eq!(start, DocumentPosition::new(0, 0));
        assert_eq!(end, DocumentPosition::new(1, 3));
    }
}
