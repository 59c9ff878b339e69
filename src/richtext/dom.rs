//! Rich-text parser – converts the editor's HTML into a small DOM tree.
//!
//! Content comes from a WYSIWYG field, so we only need the subset such
//! editors emit: paragraphs, headings, lists, emphasis, links, line breaks,
//! rules, quotes, images and simple tables. Anything else is kept as a
//! transparent container so its text still shows up.

use std::collections::HashMap;

/// Deepest element nesting kept in the tree. Elements opened below this
/// level lose their children, which are parsed as their siblings instead.
pub const MAX_DEPTH: usize = 64;

/// The tag name of a supported element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Div,
    P,
    H1,
    H2,
    H3,
    H4,
    Ul,
    Ol,
    Li,
    Strong,
    Em,
    U,
    Span,
    A,
    Br,
    Hr,
    Blockquote,
    Img,
    Table,
    Tr,
    Td,
    Th,
    Body,
    Html,
    Head,
    /// Non-rendering elements (`script`, `style`, `title`, ...).
    Hidden,
    /// Catch-all: rendered as a transparent container.
    Unknown(String),
}

impl Tag {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "div" | "section" | "article" | "header" | "footer" | "main" => Tag::Div,
            "p" => Tag::P,
            "h1" => Tag::H1,
            "h2" => Tag::H2,
            "h3" => Tag::H3,
            "h4" | "h5" | "h6" => Tag::H4,
            "ul" => Tag::Ul,
            "ol" => Tag::Ol,
            "li" => Tag::Li,
            "strong" | "b" => Tag::Strong,
            "em" | "i" => Tag::Em,
            "u" | "ins" => Tag::U,
            "span" | "font" | "small" | "mark" => Tag::Span,
            "a" => Tag::A,
            "br" => Tag::Br,
            "hr" => Tag::Hr,
            "blockquote" => Tag::Blockquote,
            "img" => Tag::Img,
            "table" => Tag::Table,
            "tr" => Tag::Tr,
            "td" => Tag::Td,
            "th" => Tag::Th,
            "body" => Tag::Body,
            "html" => Tag::Html,
            "head" => Tag::Head,
            "script" | "style" | "title" | "meta" | "link" | "template" => Tag::Hidden,
            other => Tag::Unknown(other.to_string()),
        }
    }

    /// Elements that never have children or a closing tag.
    pub fn is_void(&self) -> bool {
        matches!(self, Tag::Br | Tag::Hr | Tag::Img)
    }

    /// Elements whose content is raw text we must skip over verbatim.
    fn is_raw_text(name: &str) -> bool {
        matches!(name.to_ascii_lowercase().as_str(), "script" | "style")
    }

    /// Inline-level elements flow inside a line box.
    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            Tag::Strong | Tag::Em | Tag::U | Tag::Span | Tag::A | Tag::Br | Tag::Img
        )
    }
}

/// A node in the DOM tree.
#[derive(Debug, Clone)]
pub enum DomNode {
    Element(ElementNode),
    Text(String),
}

/// An element node carrying tag, attributes, and children.
#[derive(Debug, Clone)]
pub struct ElementNode {
    pub tag: Tag,
    pub attributes: HashMap<String, String>,
    pub children: Vec<DomNode>,
}

impl ElementNode {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            attributes: HashMap::new(),
            children: Vec::new(),
        }
    }

    pub fn inline_style(&self) -> Option<&str> {
        self.attributes.get("style").map(|s| s.as_str())
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }
}

/// Parse an HTML fragment into a list of DOM nodes.
pub fn parse_html(html: &str) -> Vec<DomNode> {
    let mut parser = Parser::new(html);
    let nodes = parser.parse_nodes(None);
    body_children(nodes)
}

/// Collect every `<img src>` in document order (duplicates removed).
pub fn image_sources(nodes: &[DomNode]) -> Vec<String> {
    fn walk(nodes: &[DomNode], out: &mut Vec<String>) {
        for node in nodes {
            if let DomNode::Element(e) = node {
                if e.tag == Tag::Img {
                    if let Some(src) = e.attr("src") {
                        let src = src.trim();
                        if !src.is_empty() && !out.iter().any(|s| s == src) {
                            out.push(src.to_string());
                        }
                    }
                }
                walk(&e.children, out);
            }
        }
    }
    let mut out = Vec::new();
    walk(nodes, &mut out);
    out
}

/// True when the fragment has nothing to render (no text, images or rules).
pub fn is_blank(nodes: &[DomNode]) -> bool {
    nodes.iter().all(|n| match n {
        DomNode::Text(t) => t.trim().is_empty(),
        DomNode::Element(e) => match e.tag {
            Tag::Img | Tag::Hr => false,
            Tag::Hidden => true,
            _ => is_blank(&e.children),
        },
    })
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
        }
    }

    /// Parse siblings until EOF or a closing tag. A closing tag for `open`
    /// ends the run; closing tags for anything else are skipped so sloppy
    /// editor markup (`<p>a</b></p>`) does not truncate the document.
    fn parse_nodes(&mut self, open: Option<&str>) -> Vec<DomNode> {
        let mut nodes = Vec::new();
        while !self.eof() {
            if self.starts_with("</") {
                let save = self.pos;
                self.advance(2);
                let name = self.parse_tag_name();
                self.skip_past('>');
                match open {
                    Some(o) if o.eq_ignore_ascii_case(&name) => return nodes,
                    // An implicitly closed element (`<li>` without `</li>`)
                    // must hand the closing tag back to its ancestors.
                    Some(_) if !name.is_empty() && self.closes_ancestor(&name) => {
                        self.pos = save;
                        return nodes;
                    }
                    _ => continue,
                }
            }
            if let Some(node) = self.parse_node() {
                nodes.push(node);
            }
        }
        nodes
    }

    fn closes_ancestor(&self, name: &str) -> bool {
        matches!(
            Tag::parse(name),
            Tag::Ul | Tag::Ol | Tag::Table | Tag::Tr | Tag::Div | Tag::Blockquote | Tag::Body
        )
    }

    fn parse_node(&mut self) -> Option<DomNode> {
        if self.starts_with("<!--") {
            self.skip_comment();
            return None;
        }
        if self.starts_with("<!") || self.starts_with("<?") {
            self.skip_past('>');
            return None;
        }
        if self.starts_with("<") && self.peek_is_tag_start() {
            self.parse_element()
        } else {
            Some(self.parse_text())
        }
    }

    fn peek_is_tag_start(&self) -> bool {
        self.input[self.pos + 1..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
    }

    fn parse_text(&mut self) -> DomNode {
        let start = self.pos;
        // Always consume at least one char so a stray '<' cannot stall us.
        self.advance(1);
        while !self.eof() && !self.starts_with("<") {
            self.advance(1);
        }
        DomNode::Text(decode_entities(&self.input[start..self.pos]))
    }

    fn parse_element(&mut self) -> Option<DomNode> {
        self.advance(1); // '<'
        let tag_name = self.parse_tag_name();
        let tag = Tag::parse(&tag_name);
        let mut elem = ElementNode::new(tag.clone());

        loop {
            self.skip_whitespace();
            if self.eof() || self.starts_with(">") || self.starts_with("/>") {
                break;
            }
            let before = self.pos;
            let (key, value) = self.parse_attribute();
            if self.pos == before {
                // Unparseable attribute character; drop it.
                self.advance(1);
                continue;
            }
            if !key.is_empty() {
                elem.attributes.insert(key.to_ascii_lowercase(), value);
            }
        }

        if self.starts_with("/>") {
            self.advance(2);
            return Some(DomNode::Element(elem));
        }
        if self.starts_with(">") {
            self.advance(1);
        }
        if tag.is_void() {
            return Some(DomNode::Element(elem));
        }
        if Tag::is_raw_text(&tag_name) {
            self.skip_raw_text(&tag_name);
            return Some(DomNode::Element(elem));
        }

        if self.depth >= MAX_DEPTH {
            return Some(DomNode::Element(elem));
        }
        self.depth += 1;
        elem.children = self.parse_nodes(Some(&tag_name));
        self.depth -= 1;
        Some(DomNode::Element(elem))
    }

    fn parse_tag_name(&mut self) -> String {
        let start = self.pos;
        while !self.eof() {
            let c = self.current_char();
            if c.is_alphanumeric() || c == '-' || c == '_' || c == ':' {
                self.advance(1);
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_string()
    }

    fn parse_attribute(&mut self) -> (String, String) {
        let key = self.parse_tag_name();
        self.skip_whitespace();
        if !self.starts_with("=") {
            return (key, String::new());
        }
        self.advance(1);
        self.skip_whitespace();
        let value = self.parse_attr_value();
        (key, value)
    }

    fn parse_attr_value(&mut self) -> String {
        for quote in ["\"", "'"] {
            if self.starts_with(quote) {
                self.advance(1);
                let start = self.pos;
                while !self.eof() && !self.starts_with(quote) {
                    self.advance(1);
                }
                let val = self.input[start..self.pos].to_string();
                if !self.eof() {
                    self.advance(1);
                }
                return decode_entities(&val);
            }
        }
        let start = self.pos;
        while !self.eof() {
            let c = self.current_char();
            if c.is_whitespace() || c == '>' {
                break;
            }
            self.advance(1);
        }
        decode_entities(&self.input[start..self.pos])
    }

    fn skip_raw_text(&mut self, name: &str) {
        let close = format!("</{}", name.to_ascii_lowercase());
        while !self.eof() {
            if self.input[self.pos..].to_ascii_lowercase().starts_with(&close) {
                self.skip_past('>');
                return;
            }
            self.advance(1);
        }
    }

    fn skip_past(&mut self, c: char) {
        while !self.eof() && self.current_char() != c {
            self.advance(1);
        }
        if !self.eof() {
            self.advance(1);
        }
    }

    fn skip_whitespace(&mut self) {
        while !self.eof() && self.current_char().is_whitespace() {
            self.advance(1);
        }
    }

    fn skip_comment(&mut self) {
        self.advance(4); // <!--
        while !self.eof() && !self.starts_with("-->") {
            self.advance(1);
        }
        if !self.eof() {
            self.advance(3);
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn current_char(&self) -> char {
        self.input[self.pos..].chars().next().unwrap_or('\0')
    }

    fn advance(&mut self, n: usize) {
        for _ in 0..n {
            if let Some(c) = self.input[self.pos..].chars().next() {
                self.pos += c.len_utf8();
            }
        }
    }
}

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail.find(';').filter(|&semi| semi <= 10).and_then(|semi| {
            let name = &tail[1..semi];
            let ch = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{00A0}'),
                "ndash" => Some('\u{2013}'),
                "mdash" => Some('\u{2014}'),
                "hellip" => Some('\u{2026}'),
                "rsquo" => Some('\u{2019}'),
                "lsquo" => Some('\u{2018}'),
                "rdquo" => Some('\u{201D}'),
                "ldquo" => Some('\u{201C}'),
                "bull" => Some('\u{2022}'),
                _ => name.strip_prefix('#').and_then(|num| {
                    let code = match num.strip_prefix(['x', 'X']) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => num.parse::<u32>().ok(),
                    };
                    code.and_then(char::from_u32)
                }),
            };
            ch.map(|c| (c, semi))
        });
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Unwrap a full document down to the children of `<body>`; fragments are
/// returned unchanged. `<head>` content is dropped.
fn body_children(nodes: Vec<DomNode>) -> Vec<DomNode> {
    let mut out = Vec::new();
    for node in nodes {
        match node {
            DomNode::Element(e) if matches!(e.tag, Tag::Html | Tag::Body) => {
                out.extend(body_children(e.children));
            }
            DomNode::Element(e) if e.tag == Tag::Head => {}
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(node: &DomNode) -> &ElementNode {
        match node {
            DomNode::Element(e) => e,
            DomNode::Text(t) => panic!("expected element, got text {t:?}"),
        }
    }

    #[test]
    fn parse_paragraph_with_emphasis() {
        let nodes = parse_html("<p>Remove <strong>old</strong> <em>shingles</em></p>");
        assert_eq!(nodes.len(), 1);
        let p = element(&nodes[0]);
        assert_eq!(p.tag, Tag::P);
        assert_eq!(p.children.len(), 4);
        assert_eq!(element(&p.children[1]).tag, Tag::Strong);
    }

    #[test]
    fn b_and_i_are_aliases() {
        let nodes = parse_html("<b>x</b><i>y</i>");
        assert_eq!(element(&nodes[0]).tag, Tag::Strong);
        assert_eq!(element(&nodes[1]).tag, Tag::Em);
    }

    #[test]
    fn void_elements_have_no_children() {
        let nodes = parse_html(r#"<p>a<br>b<img src="x.png">c</p>"#);
        let p = element(&nodes[0]);
        assert_eq!(p.children.len(), 5);
        assert_eq!(element(&p.children[1]).tag, Tag::Br);
        assert_eq!(element(&p.children[3]).attr("src"), Some("x.png"));
    }

    #[test]
    fn implicit_li_close_keeps_list_together() {
        let nodes = parse_html("<ul><li>One<li>Two</ul><p>After</p>");
        assert_eq!(nodes.len(), 2);
        let ul = element(&nodes[0]);
        assert_eq!(ul.tag, Tag::Ul);
        assert_eq!(element(&nodes[1]).tag, Tag::P);
    }

    fn max_depth(nodes: &[DomNode]) -> usize {
        nodes
            .iter()
            .map(|n| match n {
                DomNode::Element(e) => 1 + max_depth(&e.children),
                DomNode::Text(_) => 0,
            })
            .max()
            .unwrap_or(0)
    }

    #[test]
    fn deep_nesting_is_flattened_at_the_cap() {
        let html = "<div>".repeat(1000) + "Footings" + &"</div>".repeat(1000);
        let nodes = parse_html(&html);
        assert_eq!(max_depth(&nodes), MAX_DEPTH + 1);
        assert!(!is_blank(&nodes));
    }

    #[test]
    fn shallow_nesting_is_untouched() {
        let html = "<blockquote>".repeat(10) + "x";
        assert_eq!(max_depth(&parse_html(&html)), 10);
    }

    #[test]
    fn stray_closing_tags_are_ignored() {
        let nodes = parse_html("<p>a</b>b</p>");
        let p = element(&nodes[0]);
        assert_eq!(p.children.len(), 2);
    }

    #[test]
    fn scripts_and_head_are_dropped() {
        let nodes =
            parse_html("<html><head><title>x</title></head><body><script>if (a<b) {}</script><p>ok</p></body></html>");
        assert_eq!(nodes.len(), 2);
        assert_eq!(element(&nodes[0]).tag, Tag::Hidden);
        assert!(element(&nodes[0]).children.is_empty());
        assert_eq!(element(&nodes[1]).tag, Tag::P);
    }

    #[test]
    fn entities_are_decoded() {
        assert_eq!(decode_entities("a &amp; b"), "a & b");
        assert_eq!(decode_entities("&#65;&#x42;"), "AB");
        assert_eq!(decode_entities("5 & 6"), "5 & 6");
        assert_eq!(decode_entities("&bogus;"), "&bogus;");
    }

    #[test]
    fn lone_less_than_is_text() {
        let nodes = parse_html("<p>2 < 3</p>");
        let p = element(&nodes[0]);
        let text: String = p
            .children
            .iter()
            .map(|c| match c {
                DomNode::Text(t) => t.clone(),
                DomNode::Element(_) => String::new(),
            })
            .collect();
        assert_eq!(text, "2 < 3");
    }

    #[test]
    fn image_sources_deduplicated() {
        let nodes = parse_html(r#"<img src="a"><p><img src="b"><img src="a"></p>"#);
        assert_eq!(image_sources(&nodes), vec!["a", "b"]);
    }

    #[test]
    fn blank_detection() {
        assert!(is_blank(&parse_html("")));
        assert!(is_blank(&parse_html("<p> </p><p><br></p>")));
        assert!(!is_blank(&parse_html("<p>x</p>")));
        assert!(!is_blank(&parse_html("<hr>")));
    }
}
