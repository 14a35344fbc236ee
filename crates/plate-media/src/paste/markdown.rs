use plate_core::{Attrs, Marks, Node, TextNode, attrs_from};
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};
use serde_json::json;
use thiserror::Error;

use crate::media::{MediaAttrs, MediaKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error("markup produced no content")]
    Empty,
    #[error("markup nests deeper than {limit} levels")]
    TooDeep { limit: usize },
    #[error("markup events were unbalanced")]
    Unbalanced,
}

/// Translates markdown into blocks of the engine's node vocabulary.
pub fn markdown_to_fragment(text: &str, max_depth: usize) -> Result<Vec<Node>, TranslateError> {
    let mut translator = Translator::new(max_depth);
    let parser = Parser::new_ext(text, Options::ENABLE_STRIKETHROUGH);
    for event in parser {
        translator.event(event)?;
    }
    translator.finish()
}

enum Frame {
    Paragraph,
    Heading,
    BlockQuote,
    CodeBlock,
    List,
    Item,
    Emphasis,
    Strong,
    Strikethrough,
    Link,
    Image { src: String },
    Other,
}

struct ListFrame {
    ordered: bool,
    next_index: u64,
}

struct TextBlock {
    kind: &'static str,
    attrs: Attrs,
    leaves: Vec<TextNode>,
}

impl TextBlock {
    fn new(kind: &'static str, attrs: Attrs) -> Self {
        Self {
            kind,
            attrs,
            leaves: Vec::new(),
        }
    }

    fn is_blank(&self) -> bool {
        self.leaves.iter().all(|leaf| leaf.text.trim().is_empty())
    }

    fn push(&mut self, text: &str, marks: Marks) {
        if text.is_empty() {
            return;
        }
        match self.leaves.last_mut() {
            Some(last) if last.marks == marks => last.text.push_str(text),
            _ => self.leaves.push(TextNode {
                text: text.to_string(),
                marks,
            }),
        }
    }

    fn into_node(mut self) -> Node {
        if self.kind == "code_block" {
            if let Some(last) = self.leaves.last_mut() {
                let trimmed = last.text.trim_end_matches('\n').len();
                last.text.truncate(trimmed);
            }
        }
        let mut children: Vec<Node> = self.leaves.into_iter().map(Node::Text).collect();
        if children.is_empty() {
            children.push(Node::text(""));
        }
        Node::element(self.kind, self.attrs, children)
    }
}

struct Translator {
    max_depth: usize,
    frames: Vec<Frame>,
    containers: Vec<Vec<Node>>,
    lists: Vec<ListFrame>,
    current: Option<TextBlock>,
    pending_images: Vec<Node>,
    image_alt: Option<String>,
    bold: usize,
    italic: usize,
    strikethrough: usize,
    links: Vec<String>,
}

impl Translator {
    fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            frames: Vec::new(),
            containers: vec![Vec::new()],
            lists: Vec::new(),
            current: None,
            pending_images: Vec::new(),
            image_alt: None,
            bold: 0,
            italic: 0,
            strikethrough: 0,
            links: Vec::new(),
        }
    }

    fn depth(&self) -> usize {
        self.containers.len() - 1 + self.lists.len()
    }

    fn check_depth(&self) -> Result<(), TranslateError> {
        if self.depth() > self.max_depth {
            return Err(TranslateError::TooDeep {
                limit: self.max_depth,
            });
        }
        Ok(())
    }

    fn marks(&self) -> Marks {
        Marks {
            bold: self.bold > 0,
            italic: self.italic > 0,
            strikethrough: self.strikethrough > 0,
            code: false,
            link: self.links.last().cloned(),
        }
    }

    fn emit(&mut self, node: Node) {
        if let Some(container) = self.containers.last_mut() {
            container.push(node);
        }
    }

    fn flush(&mut self) {
        if let Some(block) = self.current.take() {
            let keep = block.kind != "paragraph" || !block.is_blank();
            if keep {
                self.emit(block.into_node());
            }
        }
        for image in std::mem::take(&mut self.pending_images) {
            self.emit(image);
        }
    }

    fn open(&mut self, kind: &'static str, attrs: Attrs) {
        self.flush();
        self.current = Some(TextBlock::new(kind, attrs));
    }

    fn text(&mut self, text: &str, marks: Marks) {
        if let Some(alt) = self.image_alt.as_mut() {
            alt.push_str(text);
            return;
        }
        if self.current.is_none() {
            self.current = Some(TextBlock::new("paragraph", Attrs::new()));
        }
        if let Some(block) = self.current.as_mut() {
            block.push(text, marks);
        }
    }

    fn list_item_attrs(&mut self) -> Attrs {
        let indent = self.lists.len().saturating_sub(1);
        let Some(list) = self.lists.last_mut() else {
            return attrs_from([("list_type", json!("bulleted"))]);
        };
        let mut attrs = if list.ordered {
            let index = list.next_index;
            list.next_index += 1;
            attrs_from([("list_type", json!("ordered")), ("list_index", json!(index))])
        } else {
            attrs_from([("list_type", json!("bulleted"))])
        };
        if indent > 0 {
            attrs.insert("indent".to_string(), json!(indent));
        }
        attrs
    }

    fn event(&mut self, event: Event<'_>) -> Result<(), TranslateError> {
        match event {
            Event::Start(tag) => self.start(tag)?,
            Event::End(_) => self.end()?,
            Event::Text(text) => {
                let marks = self.marks();
                self.text(&text, marks);
            }
            Event::Code(code) => {
                let mut marks = self.marks();
                marks.code = true;
                self.text(&code, marks);
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                let marks = self.marks();
                self.text(html.trim_end_matches('\n'), marks);
            }
            Event::SoftBreak => {
                let marks = self.marks();
                self.text(" ", marks);
            }
            Event::HardBreak => {
                let marks = self.marks();
                self.text("\n", marks);
            }
            Event::Rule => {
                self.flush();
                self.emit(Node::divider());
            }
            Event::TaskListMarker(checked) => {
                let marks = self.marks();
                self.text(if checked { "[x] " } else { "[ ] " }, marks);
            }
            _ => {}
        }
        Ok(())
    }

    fn start(&mut self, tag: Tag<'_>) -> Result<(), TranslateError> {
        let frame = match tag {
            Tag::Paragraph => {
                let continues_item = self
                    .current
                    .as_ref()
                    .is_some_and(|block| block.kind == "list_item" && block.leaves.is_empty());
                if !continues_item {
                    self.open("paragraph", Attrs::new());
                }
                Frame::Paragraph
            }
            Tag::Heading { level, .. } => {
                self.open("heading", attrs_from([("level", json!(level as u64))]));
                Frame::Heading
            }
            Tag::BlockQuote(_) => {
                self.flush();
                self.containers.push(Vec::new());
                self.check_depth()?;
                Frame::BlockQuote
            }
            Tag::CodeBlock(kind) => {
                let mut attrs = Attrs::new();
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        attrs.insert("language".to_string(), json!(lang.to_string()));
                    }
                }
                self.open("code_block", attrs);
                Frame::CodeBlock
            }
            Tag::List(start) => {
                self.flush();
                self.lists.push(ListFrame {
                    ordered: start.is_some(),
                    next_index: start.unwrap_or(1),
                });
                self.check_depth()?;
                Frame::List
            }
            Tag::Item => {
                let attrs = self.list_item_attrs();
                self.open("list_item", attrs);
                Frame::Item
            }
            Tag::Emphasis => {
                self.italic += 1;
                Frame::Emphasis
            }
            Tag::Strong => {
                self.bold += 1;
                Frame::Strong
            }
            Tag::Strikethrough => {
                self.strikethrough += 1;
                Frame::Strikethrough
            }
            Tag::Link { dest_url, .. } => {
                self.links.push(dest_url.to_string());
                Frame::Link
            }
            Tag::Image { dest_url, .. } => {
                self.image_alt = Some(String::new());
                Frame::Image {
                    src: dest_url.to_string(),
                }
            }
            _ => Frame::Other,
        };
        self.frames.push(frame);
        Ok(())
    }

    fn end(&mut self) -> Result<(), TranslateError> {
        let frame = self.frames.pop().ok_or(TranslateError::Unbalanced)?;
        match frame {
            Frame::Paragraph | Frame::Heading | Frame::CodeBlock | Frame::Item => self.flush(),
            Frame::BlockQuote => {
                self.flush();
                if self.containers.len() < 2 {
                    return Err(TranslateError::Unbalanced);
                }
                let children = self.containers.pop().unwrap_or_default();
                if !children.is_empty() {
                    self.emit(Node::element("blockquote", Attrs::new(), children));
                }
            }
            Frame::List => {
                self.flush();
                self.lists.pop();
            }
            Frame::Emphasis => self.italic = self.italic.saturating_sub(1),
            Frame::Strong => self.bold = self.bold.saturating_sub(1),
            Frame::Strikethrough => self.strikethrough = self.strikethrough.saturating_sub(1),
            Frame::Link => {
                self.links.pop();
            }
            Frame::Image { src } => {
                let alt = self.image_alt.take().filter(|alt| !alt.trim().is_empty());
                if !src.trim().is_empty() {
                    self.pending_images
                        .push(MediaAttrs::new(src.trim()).alt(alt).into_node(MediaKind::Image));
                }
            }
            Frame::Other => {}
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<Node>, TranslateError> {
        self.flush();
        if !self.frames.is_empty() || self.containers.len() != 1 {
            return Err(TranslateError::Unbalanced);
        }
        let nodes = self.containers.pop().unwrap_or_default();
        if nodes.is_empty() {
            return Err(TranslateError::Empty);
        }
        Ok(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translate(text: &str) -> Vec<Node> {
        markdown_to_fragment(text, 32).unwrap()
    }

    #[test]
    fn heading_carries_level() {
        let nodes = translate("## Hello");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].kind(), Some("heading"));
        assert_eq!(nodes[0].attrs().and_then(|a| a.get("level")), Some(&json!(2)));
        assert_eq!(nodes[0].plain_text(), "Hello");
    }

    #[test]
    fn inline_marks_split_leaves() {
        let nodes = translate("a **b** ~~c~~ [d](https://e.com)");
        let Node::Element(paragraph) = &nodes[0] else {
            panic!("expected paragraph");
        };
        let marks: Vec<(String, Marks)> = paragraph
            .children
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) => Some((t.text.clone(), t.marks.clone())),
                _ => None,
            })
            .collect();
        assert!(marks.iter().any(|(t, m)| t == "b" && m.bold));
        assert!(marks.iter().any(|(t, m)| t == "c" && m.strikethrough));
        assert!(
            marks
                .iter()
                .any(|(t, m)| t == "d" && m.link.as_deref() == Some("https://e.com"))
        );
    }

    #[test]
    fn ordered_list_numbers_items() {
        let nodes = translate("3. three\n4. four");
        assert_eq!(nodes.len(), 2);
        assert_eq!(
            nodes[1].attrs().and_then(|a| a.get("list_index")),
            Some(&json!(4))
        );
        assert_eq!(
            nodes[0].attrs().and_then(|a| a.get("list_type")),
            Some(&json!("ordered"))
        );
    }

    #[test]
    fn blockquote_wraps_blocks() {
        let nodes = translate("> quoted\n\nafter");
        assert_eq!(nodes[0].kind(), Some("blockquote"));
        assert_eq!(nodes[0].plain_text(), "quoted");
        assert_eq!(nodes[1].kind(), Some("paragraph"));
    }

    #[test]
    fn image_becomes_void_media_node() {
        let nodes = translate("![cat](https://e.com/cat.png)");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].kind(), Some("image"));
        assert_eq!(
            nodes[0].attrs().and_then(|a| a.get("alt")),
            Some(&json!("cat"))
        );
    }

    #[test]
    fn code_block_drops_trailing_newline() {
        let nodes = translate("```rust\nfn main() {}\n```");
        assert_eq!(nodes[0].kind(), Some("code_block"));
        assert_eq!(nodes[0].plain_text(), "fn main() {}");
    }

    #[test]
    fn nesting_past_limit_fails() {
        let err = markdown_to_fragment("> > > deep", 2).unwrap_err();
        assert_eq!(err, TranslateError::TooDeep { limit: 2 });
    }

    #[test]
    fn blank_input_is_empty() {
        assert_eq!(markdown_to_fragment("   \n\n", 32), Err(TranslateError::Empty));
    }
}
