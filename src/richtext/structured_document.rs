// Structured Document Model
// A document representation completely independent of markdown syntax
// Markdown is only used as a storage/serialization format

use std::cmp::min;
use std::fmt;

use unicode_segmentation::UnicodeSegmentation;

/// Unique identifier for document elements
pub type ElementId = usize;

/// Text styling (semantic, not syntactic)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextStyle {
    pub bold: bool,
    pub italic: bool,
}

impl TextStyle {
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn bold() -> Self {
        TextStyle {
            bold: true,
            ..Default::default()
        }
    }

    pub fn italic() -> Self {
        TextStyle {
            italic: true,
            ..Default::default()
        }
    }
}

/// A run of styled text (a contiguous piece of text with uniform styling)
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub style: TextStyle,
}

impl TextRun {
    pub fn new(text: impl Into<String>, style: TextStyle) -> Self {
        TextRun {
            text: text.into(),
            style,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, TextStyle::plain())
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Split this text run at the given character offset
    /// Returns (left_run, right_run)
    pub fn split_at(&self, offset: usize) -> (TextRun, TextRun) {
        let (left, right) = self.text.split_at(offset);
        (
            TextRun::new(left, self.style),
            TextRun::new(right, self.style),
        )
    }

    /// Insert text at the given offset
    pub fn insert_text(&mut self, offset: usize, text: &str) {
        self.text.insert_str(offset, text);
    }
}

/// Link destination
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub destination: String,
    pub title: Option<String>,
}

/// Inline image reference; the source URL points into external object storage
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRef {
    pub source: String,
    pub alt: String,
    pub title: Option<String>,
}

/// Inline content (can appear within a block)
#[derive(Debug, Clone, PartialEq)]
pub enum InlineContent {
    Text(TextRun),
    Link {
        link: Link,
        content: Vec<InlineContent>,
    },
    Image(ImageRef),
    LineBreak, // Soft break (becomes space on wrap)
    HardBreak, // Hard break (explicit newline)
}

impl InlineContent {
    /// Get the plain text length of this inline content
    pub fn text_len(&self) -> usize {
        match self {
            InlineContent::Text(run) => run.len(),
            InlineContent::Link { content, .. } => content.iter().map(|c| c.text_len()).sum(),
            InlineContent::Image(_) => 1, // Treated as single character
            InlineContent::LineBreak => 1,
            InlineContent::HardBreak => 1,
        }
    }

    /// Flatten to plain text
    pub fn to_plain_text(&self) -> String {
        match self {
            InlineContent::Text(run) => run.text.clone(),
            InlineContent::Link { content, .. } => {
                content.iter().map(|c| c.to_plain_text()).collect()
            }
            InlineContent::Image(_) => " ".to_string(),
            InlineContent::LineBreak => " ".to_string(),
            InlineContent::HardBreak => "\n".to_string(),
        }
    }
}

/// Block-level content types
#[derive(Debug, Clone, PartialEq)]
pub enum BlockType {
    Paragraph,
    Heading {
        level: u8,
    }, // 1-6
    BlockQuote,
    ListItem {
        ordered: bool,
        number: Option<u64>,
    },
}

/// A block of content
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: ElementId,
    pub block_type: BlockType,
    pub content: Vec<InlineContent>,
}

impl Block {
    pub fn new(id: ElementId, block_type: BlockType) -> Self {
        Block {
            id,
            block_type,
            content: Vec::new(),
        }
    }

    pub fn paragraph(id: ElementId) -> Self {
        Self::new(id, BlockType::Paragraph)
    }

    pub fn heading(id: ElementId, level: u8) -> Self {
        Self::new(
            id,
            BlockType::Heading {
                level: level.clamp(1, 6),
            },
        )
    }

    pub fn list_item(id: ElementId, ordered: bool, number: Option<u64>) -> Self {
        Self::new(id, BlockType::ListItem { ordered, number })
    }

    pub fn with_text(mut self, text: impl Into<String>, style: TextStyle) -> Self {
        self.content
            .push(InlineContent::Text(TextRun::new(text, style)));
        self
    }

    pub fn with_plain_text(mut self, text: impl Into<String>) -> Self {
        self.content.push(InlineContent::Text(TextRun::plain(text)));
        self
    }

    /// Get the total text length of this block
    pub fn text_len(&self) -> usize {
        self.content.iter().map(|c| c.text_len()).sum()
    }

    /// Get plain text content
    pub fn to_plain_text(&self) -> String {
        self.content.iter().map(|c| c.to_plain_text()).collect()
    }

    /// Check if this block is empty (no content)
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
            || self.content.iter().all(|c| match c {
                InlineContent::Text(run) => run.text.trim().is_empty(),
                _ => false,
            })
    }

    /// Delete text in [start..end) within this block's flattened content
    pub fn delete_text_range(&mut self, start: usize, end: usize) {
        if start >= end {
            return;
        }

        fn delete_in_vec(content: &mut Vec<InlineContent>, start: usize, end: usize) {
            let mut new_content: Vec<InlineContent> = Vec::new();
            let mut pos = 0usize;

            for mut item in content.drain(..) {
                let len = item.text_len();

                // Completely before deletion range
                if pos + len <= start {
                    new_content.push(item);
                    pos += len;
                    continue;
                }

                // Completely after deletion range
                if pos >= end {
                    new_content.push(item);
                    pos += len;
                    continue;
                }

                // Overlap exists
                match &mut item {
                    InlineContent::Text(run) => {
                        let local_start = start.saturating_sub(pos);
                        let local_end = min(len, end.saturating_sub(pos));

                        if local_start > 0 {
                            let (left, right) = run.split_at(local_start);
                            let del_len = local_end.saturating_sub(local_start);
                            if del_len >= right.len() {
                                // delete entire right
                                new_content.push(InlineContent::Text(left));
                            } else {
                                // delete middle from right
                                let (_deleted, kept) = right.split_at(del_len);
                                if !left.is_empty() {
                                    new_content.push(InlineContent::Text(left));
                                }
                                if !kept.is_empty() {
                                    new_content.push(InlineContent::Text(kept));
                                }
                            }
                        } else {
                            // Deletion starts at or before this item; keep the suffix
                            let del_in_this = min(len, end.saturating_sub(pos));
                            if del_in_this < len {
                                let (_deleted, leftover) = run.split_at(del_in_this);
                                if !leftover.is_empty() {
                                    new_content.push(InlineContent::Text(leftover));
                                }
                            }
                        }
                    }
                    InlineContent::Link {
                        link,
                        content: inner,
                    } => {
                        let local_start = start.saturating_sub(pos);
                        let local_end = min(len, end.saturating_sub(pos));
                        // Recurse inside link content for the overlapping region
                        delete_in_vec(inner, local_start, local_end);
                        if inner.iter().map(|c| c.text_len()).sum::<usize>() > 0 {
                            new_content.push(InlineContent::Link {
                                link: link.clone(),
                                content: inner.clone(),
                            });
                        }
                    }
                    InlineContent::Image(_)
                    | InlineContent::LineBreak
                    | InlineContent::HardBreak => {
                        // Single-character item; drop it when inside the range
                        let local_start = start.saturating_sub(pos);
                        if local_start >= 1 {
                            new_content.push(item);
                        }
                    }
                }

                pos += len;
            }

            *content = new_content;
        }

        let len = self.text_len();
        let start = min(start, len);
        let end = min(end, len);
        let mut content = std::mem::take(&mut self.content);
        delete_in_vec(&mut content, start, end);
        self.content = content;
    }

    /// Split this block's content at a flattened text offset, returning the right part.
    /// The left part remains in self.
    pub fn split_content_at(&mut self, offset: usize) -> Vec<InlineContent> {
        fn split_vec(
            content: &Vec<InlineContent>,
            offset: usize,
        ) -> (Vec<InlineContent>, Vec<InlineContent>) {
            let mut left: Vec<InlineContent> = Vec::new();
            let mut right: Vec<InlineContent> = Vec::new();
            let mut pos = 0usize;
            let mut done = false;

            for item in content.iter() {
                if done {
                    right.push(item.clone());
                    continue;
                }
                let len = item.text_len();
                if pos + len < offset {
                    left.push(item.clone());
                    pos += len;
                    continue;
                }
                if pos + len == offset {
                    left.push(item.clone());
                    pos += len;
                    done = true;
                    continue;
                }
                // offset falls within this item
                match item {
                    InlineContent::Text(run) => {
                        let local = offset - pos;
                        let (l, r) = run.split_at(local);
                        if !l.is_empty() {
                            left.push(InlineContent::Text(l));
                        }
                        if !r.is_empty() {
                            right.push(InlineContent::Text(r));
                        }
                    }
                    InlineContent::Link {
                        link,
                        content: inner,
                    } => {
                        let local = offset - pos;
                        let (l_inner, r_inner) = split_vec(inner, local);
                        if !l_inner.is_empty() {
                            left.push(InlineContent::Link {
                                link: link.clone(),
                                content: l_inner,
                            });
                        }
                        if !r_inner.is_empty() {
                            right.push(InlineContent::Link {
                                link: link.clone(),
                                content: r_inner,
                            });
                        }
                    }
                    InlineContent::Image(_)
                    | InlineContent::LineBreak
                    | InlineContent::HardBreak => {
                        let local = offset - pos; // 0..1
                        if local == 0 {
                            right.push(item.clone());
                        } else {
                            left.push(item.clone());
                        }
                    }
                }
                done = true;
            }

            (left, right)
        }

        let offset = min(offset, self.text_len());
        let (left, right) = split_vec(&self.content, offset);
        self.content = left;
        right
    }

    /// Insert plain text at a flattened text offset
    pub fn insert_plain_text(&mut self, offset: usize, text: &str) {
        let right = self.split_content_at(offset);
        if !text.is_empty() {
            self.content.push(InlineContent::Text(TextRun::plain(text)));
        }
        self.content.extend(right);
        self.normalize_content();
    }

    /// Merge adjacent runs with identical style and drop empty ones
    pub fn normalize_content(&mut self) {
        let content = std::mem::take(&mut self.content);
        self.content = Self::normalize_inline_vec(content);
    }

    fn normalize_inline_vec(content: Vec<InlineContent>) -> Vec<InlineContent> {
        let mut normalized: Vec<InlineContent> = Vec::with_capacity(content.len());
        for item in content.into_iter() {
            match item {
                InlineContent::Text(run) => {
                    if run.text.is_empty() {
                        continue;
                    }
                    match normalized.last_mut() {
                        Some(InlineContent::Text(prev_run)) if prev_run.style == run.style => {
                            prev_run.text.push_str(&run.text);
                        }
                        _ => normalized.push(InlineContent::Text(run)),
                    }
                }
                InlineContent::Link {
                    link,
                    content: inner,
                } => {
                    let normalized_inner = Self::normalize_inline_vec(inner);
                    if normalized_inner.is_empty() {
                        continue;
                    }
                    normalized.push(InlineContent::Link {
                        link,
                        content: normalized_inner,
                    });
                }
                other => normalized.push(other),
            }
        }
        normalized
    }
}

/// Position within a document
/// This represents a logical cursor position in the structured content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentPosition {
    pub block_index: usize,
    pub offset: usize, // Character offset within the block's flattened text
}

impl DocumentPosition {
    pub fn new(block_index: usize, offset: usize) -> Self {
        DocumentPosition {
            block_index,
            offset,
        }
    }

    pub fn start() -> Self {
        DocumentPosition::new(0, 0)
    }
}

/// The structured document
pub struct StructuredDocument {
    blocks: Vec<Block>,
    next_id: ElementId,
}

impl StructuredDocument {
    pub fn new() -> Self {
        StructuredDocument {
            blocks: Vec::new(),
            next_id: 1,
        }
    }

    /// Get a unique element ID
    fn next_id(&mut self) -> ElementId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Get blocks
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Get mutable blocks
    pub fn blocks_mut(&mut self) -> &mut Vec<Block> {
        &mut self.blocks
    }

    /// Add a block
    pub fn add_block(&mut self, mut block: Block) {
        if block.id == 0 {
            block.id = self.next_id();
        }
        self.blocks.push(block);
    }

    /// Insert a block at a specific position
    pub fn insert_block(&mut self, index: usize, mut block: Block) {
        if block.id == 0 {
            block.id = self.next_id();
        }
        self.blocks.insert(index, block);
    }

    /// Remove a block
    pub fn remove_block(&mut self, index: usize) -> Option<Block> {
        if index < self.blocks.len() {
            Some(self.blocks.remove(index))
        } else {
            None
        }
    }

    /// Get block count
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Validate and clamp a position to document bounds
    pub fn clamp_position(&self, pos: DocumentPosition) -> DocumentPosition {
        if self.blocks.is_empty() {
            return DocumentPosition::start();
        }

        let block_index = pos.block_index.min(self.blocks.len() - 1);
        let text = self.blocks[block_index].to_plain_text();
        let offset = grapheme_offset_at_or_before(&text, pos.offset);

        DocumentPosition::new(block_index, offset)
    }

    /// Get the previous grapheme position within the same block.
    pub fn previous_grapheme_position(&self, pos: DocumentPosition) -> DocumentPosition {
        if self.blocks.is_empty() {
            return DocumentPosition::start();
        }

        let block_index = pos.block_index.min(self.blocks.len() - 1);
        let text = self.blocks[block_index].to_plain_text();
        let offset = grapheme_offset_before(&text, pos.offset);

        DocumentPosition::new(block_index, offset)
    }

    /// Get the next grapheme position within the same block.
    pub fn next_grapheme_position(&self, pos: DocumentPosition) -> DocumentPosition {
        if self.blocks.is_empty() {
            return DocumentPosition::start();
        }

        let block_index = pos.block_index.min(self.blocks.len() - 1);
        let text = self.blocks[block_index].to_plain_text();
        let offset = grapheme_offset_after(&text, pos.offset);

        DocumentPosition::new(block_index, offset)
    }

    /// Convert to plain text
    pub fn to_plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.to_plain_text())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Check if document is empty
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Create a simple document with one paragraph
    pub fn with_paragraph(text: impl Into<String>) -> Self {
        let mut doc = Self::new();
        let id = doc.next_id();
        let block = Block::paragraph(id).with_plain_text(text);
        doc.add_block(block);
        doc
    }

    /// Delete content in [start..end) across blocks.
    /// If the range spans multiple blocks, merges the tail of the end block into the start block
    /// and removes all fully-covered blocks in between.
    pub fn delete_range(&mut self, start: DocumentPosition, end: DocumentPosition) {
        if self.blocks.is_empty() {
            return;
        }
        let mut a = self.clamp_position(start);
        let mut b = self.clamp_position(end);
        // Ensure a <= b
        if (b.block_index < a.block_index)
            || (b.block_index == a.block_index && b.offset < a.offset)
        {
            std::mem::swap(&mut a, &mut b);
        }

        if a.block_index == b.block_index {
            let block = &mut self.blocks[a.block_index];
            block.delete_text_range(a.offset, b.offset);
            block.normalize_content();
            return;
        }

        // Delete tail of start block
        {
            let block = &mut self.blocks[a.block_index];
            let len = block.text_len();
            block.delete_text_range(a.offset, len);
        }

        // Delete head of end block and capture its remaining content
        let mut tail_content: Vec<InlineContent> = {
            let block = &mut self.blocks[b.block_index];
            block.split_content_at(b.offset)
        };

        // Remove blocks between start+1 and end inclusive of the original end head block
        // After split, the end block now contains only head we deleted; we can remove it.
        let remove_start = a.block_index + 1;
        let remove_count = b.block_index - a.block_index;
        for _ in 0..remove_count {
            if remove_start < self.blocks.len() {
                self.blocks.remove(remove_start);
            }
        }

        // Append tail_content to the (now) start block
        if !tail_content.is_empty() {
            self.blocks[a.block_index].content.append(&mut tail_content);
        }
        self.blocks[a.block_index].normalize_content();
    }
}

impl Default for StructuredDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StructuredDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "StructuredDocument ({} blocks):", self.blocks.len())?;
        for (i, block) in self.blocks.iter().enumerate() {
            write!(f, "  [{}] ", i)?;
            match &block.block_type {
                BlockType::Paragraph => write!(f, "Paragraph")?,
                BlockType::Heading { level } => write!(f, "Heading(h{})", level)?,
                BlockType::BlockQuote => write!(f, "BlockQuote")?,
                BlockType::ListItem { ordered, number } => write!(
                    f,
                    "ListItem({}{})",
                    if *ordered { "ordered" } else { "unordered" },
                    if let Some(n) = number {
                        format!(", #{}", n)
                    } else {
                        String::new()
                    }
                )?,
            }
            writeln!(f, ": {:?}", block.to_plain_text())?;
        }
        Ok(())
    }
}

fn grapheme_boundaries(text: &str) -> Vec<usize> {
    let mut boundaries: Vec<usize> = text.grapheme_indices(true).map(|(idx, _)| idx).collect();
    if boundaries.is_empty() {
        boundaries.push(0);
        return boundaries;
    }
    if boundaries[0] != 0 {
        boundaries.insert(0, 0);
    }
    if boundaries.last() != Some(&text.len()) {
        boundaries.push(text.len());
    }
    boundaries
}

/// Return the nearest grapheme boundary at or before the provided offset.
pub fn grapheme_offset_at_or_before(text: &str, offset: usize) -> usize {
    let boundaries = grapheme_boundaries(text);
    let mut result = 0usize;
    let max_offset = offset.min(text.len());
    for boundary in boundaries {
        if boundary > max_offset {
            break;
        }
        result = boundary;
    }
    result
}

/// Return the previous grapheme boundary strictly before the provided offset.
pub fn grapheme_offset_before(text: &str, offset: usize) -> usize {
    if offset == 0 {
        return 0;
    }
    let boundaries = grapheme_boundaries(text);
    let mut result = 0usize;
    let max_offset = offset.min(text.len());
    for boundary in boundaries {
        if boundary >= max_offset {
            break;
        }
        result = boundary;
    }
    result
}

/// Return the next grapheme boundary strictly after the provided offset.
pub fn grapheme_offset_after(text: &str, offset: usize) -> usize {
    let boundaries = grapheme_boundaries(text);
    let max_offset = offset.min(text.len());
    for boundary in boundaries {
        if boundary > max_offset {
            return boundary;
        }
    }
    text.len()
}
