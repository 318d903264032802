// Markdown Converter
// Converts between StructuredDocument and Markdown text format
// Markdown is used purely as a storage/serialization format

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

use super::structured_document::*;

/// Convert markdown text to a StructuredDocument
pub fn markdown_to_document(markdown: &str) -> StructuredDocument {
    let options = Options::empty();
    let parser = Parser::new_ext(markdown, options);

    let mut builder = DocumentBuilder::new();
    for event in parser {
        builder.handle(event);
    }
    builder.finish()
}

/// Convert a StructuredDocument to markdown text
pub fn document_to_markdown(doc: &StructuredDocument) -> String {
    let mut output = String::new();
    let mut ordered_run: Option<u64> = None;

    for (i, block) in doc.blocks().iter().enumerate() {
        if i > 0 {
            output.push_str("\n\n");
        }

        match &block.block_type {
            BlockType::Paragraph => {
                ordered_run = None;
                output.push_str(&inline_content_to_markdown(&block.content));
            }
            BlockType::Heading { level } => {
                ordered_run = None;
                output.push_str(&"#".repeat(*level as usize));
                output.push(' ');
                output.push_str(&inline_content_to_markdown(&block.content));
            }
            BlockType::BlockQuote => {
                ordered_run = None;
                output.push_str("> ");
                output.push_str(&inline_content_to_markdown(&block.content));
            }
            BlockType::ListItem { ordered, number } => {
                if *ordered {
                    // Contiguous ordered items number sequentially from the
                    // first item's stored number
                    let n = match ordered_run {
                        Some(prev) => prev + 1,
                        None => number.unwrap_or(1),
                    };
                    ordered_run = Some(n);
                    output.push_str(&format!("{}. ", n));
                } else {
                    ordered_run = None;
                    output.push_str("- ");
                }
                output.push_str(&inline_content_to_markdown(&block.content));
            }
        }
    }

    output
}

/// Convert inline content to markdown
fn inline_content_to_markdown(content: &[InlineContent]) -> String {
    let mut output = String::new();

    for item in content {
        match item {
            InlineContent::Text(run) => {
                output.push_str(&styled_run_to_markdown(run));
            }
            InlineContent::Link { link, content } => {
                output.push('[');
                output.push_str(&inline_content_to_markdown(content));
                output.push_str("](");
                output.push_str(&link.destination);
                if let Some(title) = &link.title {
                    output.push_str(" \"");
                    output.push_str(title);
                    output.push('"');
                }
                output.push(')');
            }
            InlineContent::Image(image) => {
                output.push_str("![");
                output.push_str(&image.alt);
                output.push_str("](");
                output.push_str(&image.source);
                if let Some(title) = &image.title {
                    output.push_str(" \"");
                    output.push_str(title);
                    output.push('"');
                }
                output.push(')');
            }
            InlineContent::LineBreak => {
                output.push(' ');
            }
            InlineContent::HardBreak => {
                output.push_str("  \n");
            }
        }
    }

    output
}

/// Emphasis markers cannot open or close against whitespace in
/// CommonMark, so boundary whitespace is emitted outside the markers
fn styled_run_to_markdown(run: &TextRun) -> String {
    let marker = if run.style.bold && run.style.italic {
        "***"
    } else if run.style.bold {
        "**"
    } else if run.style.italic {
        "*"
    } else {
        return run.text.clone();
    };

    let trimmed_start = run.text.trim_start();
    let leading = &run.text[..run.text.len() - trimmed_start.len()];
    let trimmed = trimmed_start.trim_end();
    let trailing = &trimmed_start[trimmed.len()..];

    if trimmed.is_empty() {
        return run.text.clone();
    }
    format!("{}{}{}{}{}", leading, marker, trimmed, marker, trailing)
}

/// What opened the block currently being filled
#[derive(PartialEq)]
enum BlockOrigin {
    Paragraph,
    Heading,
    ListItem,
}

/// An open inline container capturing nested content
enum InlineFrame {
    Link(Link),
    Image { source: String, title: Option<String> },
}

/// Builds a StructuredDocument directly from pulldown-cmark events
struct DocumentBuilder {
    doc: StructuredDocument,
    block: Option<(Block, BlockOrigin)>,
    frames: Vec<(InlineFrame, Vec<InlineContent>)>,
    style_stack: Vec<TextStyle>,
    // (ordered, next number) per open list
    list_stack: Vec<(bool, u64)>,
    quote_depth: usize,
}

impl DocumentBuilder {
    fn new() -> Self {
        DocumentBuilder {
            doc: StructuredDocument::new(),
            block: None,
            frames: Vec::new(),
            style_stack: vec![TextStyle::default()],
            list_stack: Vec::new(),
            quote_depth: 0,
        }
    }

    fn handle(&mut self, event: Event) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag_end) => self.end_tag(tag_end),
            Event::Text(text) => self.push_text(&text),
            Event::Code(code) => self.push_text(&code),
            Event::Html(html) | Event::InlineHtml(html) => self.push_text(&html),
            Event::SoftBreak => self.push_inline(InlineContent::LineBreak),
            Event::HardBreak => self.push_inline(InlineContent::HardBreak),
            Event::Rule => self.finish_block(),
            _ => {}
        }
    }

    fn start_tag(&mut self, tag: Tag) {
        match tag {
            Tag::Paragraph => {
                // Inside a list item the paragraph content flows into the item
                if self.block.is_none() {
                    let block_type = if self.quote_depth > 0 {
                        BlockType::BlockQuote
                    } else {
                        BlockType::Paragraph
                    };
                    self.begin_block(block_type, BlockOrigin::Paragraph);
                }
            }
            Tag::Heading { level, .. } => {
                self.finish_block();
                self.begin_block(
                    BlockType::Heading { level: level as u8 },
                    BlockOrigin::Heading,
                );
            }
            Tag::BlockQuote(_) => {
                self.finish_block();
                self.quote_depth += 1;
            }
            Tag::List(start_number) => {
                self.list_stack
                    .push((start_number.is_some(), start_number.unwrap_or(1)));
            }
            Tag::Item => {
                self.finish_block();
                let (ordered, number) = match self.list_stack.last_mut() {
                    Some((ordered, next)) => {
                        let number = if *ordered { Some(*next) } else { None };
                        *next += 1;
                        (*ordered, number)
                    }
                    None => (false, None),
                };
                self.begin_block(
                    BlockType::ListItem { ordered, number },
                    BlockOrigin::ListItem,
                );
            }
            Tag::Emphasis => {
                let mut new_style = self.current_style();
                new_style.italic = true;
                self.style_stack.push(new_style);
            }
            Tag::Strong => {
                let mut new_style = self.current_style();
                new_style.bold = true;
                self.style_stack.push(new_style);
            }
            Tag::Link { dest_url, title, .. } => {
                let link = Link {
                    destination: dest_url.to_string(),
                    title: if title.is_empty() {
                        None
                    } else {
                        Some(title.to_string())
                    },
                };
                self.frames.push((InlineFrame::Link(link), Vec::new()));
            }
            Tag::Image { dest_url, title, .. } => {
                let frame = InlineFrame::Image {
                    source: dest_url.to_string(),
                    title: if title.is_empty() {
                        None
                    } else {
                        Some(title.to_string())
                    },
                };
                self.frames.push((frame, Vec::new()));
            }
            _ => {}
        }
    }

    fn end_tag(&mut self, tag_end: TagEnd) {
        match tag_end {
            TagEnd::Paragraph => {
                if matches!(&self.block, Some((_, BlockOrigin::Paragraph))) {
                    self.finish_block();
                }
            }
            TagEnd::Heading(_) => self.finish_block(),
            TagEnd::BlockQuote(_) => {
                self.finish_block();
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }
            TagEnd::List(_) => {
                self.list_stack.pop();
            }
            TagEnd::Item => self.finish_block(),
            TagEnd::Emphasis | TagEnd::Strong => {
                if self.style_stack.len() > 1 {
                    self.style_stack.pop();
                }
            }
            TagEnd::Link => {
                if let Some((InlineFrame::Link(link), content)) = self.frames.pop() {
                    self.push_inline(InlineContent::Link { link, content });
                }
            }
            TagEnd::Image => {
                if let Some((InlineFrame::Image { source, title }, content)) = self.frames.pop() {
                    let alt: String = content.iter().map(|c| c.to_plain_text()).collect();
                    self.push_inline(InlineContent::Image(ImageRef { source, alt, title }));
                }
            }
            _ => {}
        }
    }

    fn current_style(&self) -> TextStyle {
        self.style_stack.last().copied().unwrap_or_default()
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let run = TextRun::new(text, self.current_style());
        self.push_inline(InlineContent::Text(run));
    }

    fn push_inline(&mut self, inline: InlineContent) {
        if let Some((_, content)) = self.frames.last_mut() {
            content.push(inline);
            return;
        }
        if self.block.is_none() {
            // Stray inline content outside any block opens an implicit paragraph
            self.begin_block(BlockType::Paragraph, BlockOrigin::Paragraph);
        }
        if let Some((block, _)) = &mut self.block {
            block.content.push(inline);
        }
    }

    fn begin_block(&mut self, block_type: BlockType, origin: BlockOrigin) {
        self.finish_block();
        self.block = Some((Block::new(0, block_type), origin));
    }

    fn finish_block(&mut self) {
        if let Some((mut block, _)) = self.block.take() {
            block.normalize_content();
            self.doc.add_block(block);
        }
    }

    fn finish(mut self) -> StructuredDocument {
        self.finish_block();

        // Ensure at least one block exists
        if self.doc.is_empty() {
            self.doc.add_block(Block::paragraph(0));
        }

        self.doc
    }
}
