/// Paragraph and run editing for Word documents.
///
/// A [`Paragraph`] owns its `<w:p>` element. Text offsets used throughout
/// the crate are character offsets into [`Paragraph::text`], which joins the
/// visible run content in document order: `w:t` text, `w:tab` as `\t` and
/// `w:br`/`w:cr` as `\n`. Deleted text (`w:del`) is not part of the text.
use crate::common::error::{Error, Result};
use crate::common::xml::{XmlElement, XmlNode};
use crate::ooxml::docx::format::{PPR_ORDER, RunFormat, set_ordered};
use smallvec::SmallVec;

/// Elements that may wrap runs inside a paragraph.
const RUN_CONTAINERS: &[&str] = &[
    "hyperlink", "ins", "smartTag", "sdt", "sdtContent", "fldSimple", "customXml", "moveTo", "bdo",
    "dir",
];

/// A paragraph in a Word document.
///
/// Represents a `<w:p>` element. Paragraphs contain runs which in turn
/// contain the actual text and formatting.
///
/// # Example
///
/// ```
/// use docsmith::ooxml::docx::Paragraph;
///
/// let mut para = Paragraph::with_text("Hello world");
/// para.set_style("Heading1");
/// assert_eq!(para.text(), "Hello world");
/// assert_eq!(para.style_id(), Some("Heading1"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    el: XmlElement,
}

impl Paragraph {
    /// An empty `<w:p/>`.
    pub fn new() -> Self {
        Self {
            el: XmlElement::new("w:p"),
        }
    }

    /// Wrap an existing `<w:p>` element.
    pub fn from_element(el: XmlElement) -> Self {
        Self { el }
    }

    /// A paragraph holding one plain run.
    pub fn with_text(text: &str) -> Self {
        let mut para = Self::new();
        if !text.is_empty() {
            para.push_run(make_run(text, None));
        }
        para
    }

    #[inline]
    pub fn element(&self) -> &XmlElement {
        &self.el
    }

    #[inline]
    pub fn element_mut(&mut self) -> &mut XmlElement {
        &mut self.el
    }

    #[inline]
    pub fn into_element(self) -> XmlElement {
        self.el
    }

    /// Visible text of the paragraph.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for run in self.runs() {
            out.push_str(&run_text(run));
        }
        out
    }

    /// Length of [`Paragraph::text`] in characters.
    pub fn char_len(&self) -> usize {
        self.runs().iter().map(|run| run_len(run)).sum()
    }

    /// All runs in text order, including runs nested in hyperlinks,
    /// insertions and content controls.
    pub fn runs(&self) -> SmallVec<[&XmlElement; 8]> {
        let mut runs = SmallVec::new();
        collect_runs(&self.el, &mut runs);
        runs
    }

    /// Paragraph properties (`w:pPr`), if any.
    pub fn properties(&self) -> Option<&XmlElement> {
        self.el.child("pPr")
    }

    /// Paragraph properties, created as the first child when missing.
    pub fn properties_mut(&mut self) -> &mut XmlElement {
        self.el.child_or_insert("w:pPr", &[])
    }

    /// Replace the paragraph properties.
    pub fn set_properties(&mut self, ppr: XmlElement) {
        self.el.remove_children("pPr");
        self.el.insert_ordered(ppr, &[]);
    }

    /// Style id from `w:pPr/w:pStyle`.
    pub fn style_id(&self) -> Option<&str> {
        self.properties()?.child("pStyle")?.attr("val")
    }

    /// Set `w:pStyle`.
    pub fn set_style(&mut self, style_id: &str) {
        let style = XmlElement::new("w:pStyle").with_attr("w:val", style_id);
        set_ordered(self.properties_mut(), style, PPR_ORDER);
    }

    /// Outline level set directly on the paragraph (0-based, as stored).
    pub fn outline_level(&self) -> Option<u8> {
        self.properties()?
            .child("outlineLvl")?
            .attr("val")
            .and_then(|v| atoi_simd::parse::<u8>(v.as_bytes()).ok())
    }

    /// `w:rPr` of the first run, if any.
    pub fn first_run_properties(&self) -> Option<&XmlElement> {
        let first = self.runs().first().copied()?;
        first.child("rPr")
    }

    /// Whether the paragraph carries section properties (a section break).
    pub fn has_section_break(&self) -> bool {
        self.properties().is_some_and(|ppr| ppr.child("sectPr").is_some())
    }

    /// Append a run (or any paragraph content element).
    pub fn push_run(&mut self, run: XmlElement) {
        self.el.push(run);
    }

    /// Apply formatting to the character range `[start, end)`, splitting
    /// runs at the boundaries. Returns the number of runs formatted.
    pub fn format_range(&mut self, start: usize, end: usize, format: &RunFormat) -> Result<usize> {
        let len = self.char_len();
        if start >= end || end > len {
            return Err(Error::Validation(format!(
                "invalid range {}..{} for paragraph of {} characters",
                start, end, len
            )));
        }
        format.validate()?;

        let mut offset = 0;
        let mut touched = 0;
        format_container(&mut self.el, start, end, &mut offset, format, &mut touched)?;
        Ok(touched)
    }

    /// Insert `run` at character offset `at`, splitting the run that spans
    /// it. Returns `false` when `at` is past the end of the text.
    pub fn insert_run_at(&mut self, at: usize, run: XmlElement) -> bool {
        if at == 0 {
            self.el.insert_ordered(run, &["pPr"]);
            return true;
        }
        let mut offset = 0;
        let mut slot = Some(run);
        insert_in_container(&mut self.el, at, &mut offset, &mut slot);
        slot.is_none()
    }

    /// Replace every occurrence of `find` inside individual `w:t` elements.
    /// Text split across runs is left alone. Returns the replacement count.
    pub fn replace_text(&mut self, find: &str, replace: &str) -> usize {
        if find.is_empty() {
            return 0;
        }
        let mut count = 0;
        self.el.walk_mut(&mut |el| {
            if el.is("t") {
                let text = el.text();
                let hits = text.matches(find).count();
                if hits > 0 {
                    count += hits;
                    set_t_text(el, &text.replace(find, replace));
                }
            }
        });
        count
    }
}

impl Default for Paragraph {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_runs<'a>(container: &'a XmlElement, runs: &mut SmallVec<[&'a XmlElement; 8]>) {
    for child in container.elements() {
        if child.is("r") {
            runs.push(child);
        } else if RUN_CONTAINERS.contains(&child.local_name()) {
            collect_runs(child, runs);
        }
    }
}

/// Build a `w:r` for `text`, mapping `\t` to `w:tab` and `\n` to `w:br`.
pub fn make_run(text: &str, rpr: Option<&XmlElement>) -> XmlElement {
    let mut run = XmlElement::new("w:r");
    if let Some(rpr) = rpr {
        run.push(rpr.clone());
    }
    let mut segment = String::new();
    for ch in text.chars() {
        match ch {
            '\t' | '\n' => {
                if !segment.is_empty() {
                    run.push(make_t(&segment));
                    segment.clear();
                }
                run.push(XmlElement::new(if ch == '\t' { "w:tab" } else { "w:br" }));
            },
            _ => segment.push(ch),
        }
    }
    if !segment.is_empty() {
        run.push(make_t(&segment));
    }
    run
}

/// A `w:t` element, preserving surrounding whitespace when present.
pub fn make_t(text: &str) -> XmlElement {
    let mut t = XmlElement::new("w:t");
    set_t_text(&mut t, text);
    t
}

fn set_t_text(t: &mut XmlElement, text: &str) {
    t.children.clear();
    t.push_text(text);
    if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
        t.set_attr("xml:space", "preserve");
    }
}

/// Visible text of one run.
pub fn run_text(run: &XmlElement) -> String {
    let mut out = String::new();
    for child in run.elements() {
        match child.local_name() {
            "t" => out.push_str(&child.text()),
            "tab" => out.push('\t'),
            "br" | "cr" => out.push('\n'),
            _ => {},
        }
    }
    out
}

fn piece_len(child: &XmlElement) -> usize {
    match child.local_name() {
        "t" => child.text().chars().count(),
        "tab" | "br" | "cr" => 1,
        _ => 0,
    }
}

fn run_len(run: &XmlElement) -> usize {
    run.elements().map(piece_len).sum()
}

fn empty_like(el: &XmlElement) -> XmlElement {
    let mut out = XmlElement::new(el.name());
    for (key, value) in el.attrs() {
        out.set_attr(key.clone(), value.clone());
    }
    out
}

/// Split a run at character offset `at` (0 < at < run length). Both halves
/// keep the run properties.
fn split_run(run: &XmlElement, at: usize) -> (XmlElement, XmlElement) {
    let mut left = empty_like(run);
    let mut right = empty_like(run);
    let mut pos = 0;

    for node in &run.children {
        let XmlNode::Element(child) = node else {
            continue;
        };
        if child.is("rPr") {
            left.push(child.clone());
            right.push(child.clone());
            continue;
        }
        let n = piece_len(child);
        if child.is("t") && pos < at && at < pos + n {
            let text = child.text();
            let cut = text
                .char_indices()
                .nth(at - pos)
                .map(|(i, _)| i)
                .unwrap_or(text.len());
            left.push(make_t(&text[..cut]));
            right.push(make_t(&text[cut..]));
        } else if pos + n <= at {
            left.push(child.clone());
        } else {
            right.push(child.clone());
        }
        pos += n;
    }
    (left, right)
}

fn format_container(
    container: &mut XmlElement,
    start: usize,
    end: usize,
    offset: &mut usize,
    format: &RunFormat,
    touched: &mut usize,
) -> Result<()> {
    let children = std::mem::take(&mut container.children);
    let mut out = Vec::with_capacity(children.len() + 2);

    for node in children {
        match node {
            XmlNode::Element(el) if el.is("r") => {
                let len = run_len(&el);
                let (s, e) = (*offset, *offset + len);
                *offset = e;
                if len == 0 || e <= start || s >= end {
                    out.push(XmlNode::Element(el));
                    continue;
                }

                let mut rest = el;
                let mut rest_start = s;
                if start > rest_start {
                    let (before, after) = split_run(&rest, start - rest_start);
                    out.push(XmlNode::Element(before));
                    rest = after;
                    rest_start = start;
                }
                let tail = if end < e {
                    let (inside, after) = split_run(&rest, end - rest_start);
                    rest = inside;
                    Some(after)
                } else {
                    None
                };
                format.apply_to_run(&mut rest)?;
                *touched += 1;
                out.push(XmlNode::Element(rest));
                if let Some(after) = tail {
                    out.push(XmlNode::Element(after));
                }
            },
            XmlNode::Element(mut el) if RUN_CONTAINERS.contains(&el.local_name()) => {
                format_container(&mut el, start, end, offset, format, touched)?;
                out.push(XmlNode::Element(el));
            },
            other => out.push(other),
        }
    }

    container.children = out;
    Ok(())
}

fn insert_in_container(
    container: &mut XmlElement,
    at: usize,
    offset: &mut usize,
    slot: &mut Option<XmlElement>,
) {
    let children = std::mem::take(&mut container.children);
    let mut out = Vec::with_capacity(children.len() + 2);

    for node in children {
        if slot.is_none() {
            out.push(node);
            continue;
        }
        match node {
            XmlNode::Element(el) if el.is("r") => {
                let len = run_len(&el);
                let (s, e) = (*offset, *offset + len);
                *offset = e;
                if s < at && at < e {
                    let (before, after) = split_run(&el, at - s);
                    out.push(XmlNode::Element(before));
                    out.extend(slot.take().map(XmlNode::Element));
                    out.push(XmlNode::Element(after));
                } else {
                    out.push(XmlNode::Element(el));
                    if len > 0 && e == at {
                        out.extend(slot.take().map(XmlNode::Element));
                    }
                }
            },
            XmlNode::Element(mut el) if RUN_CONTAINERS.contains(&el.local_name()) => {
                insert_in_container(&mut el, at, offset, slot);
                out.push(XmlNode::Element(el));
            },
            other => out.push(other),
        }
    }

    container.children = out;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::xml::XmlDocument;

    fn para(xml: &str) -> Paragraph {
        let doc = XmlDocument::parse(xml.as_bytes()).unwrap();
        Paragraph::from_element(doc.root)
    }

    #[test]
    fn test_text_includes_hyperlinks_and_tabs() {
        let p = para(
            r#"<w:p><w:r><w:t>One</w:t><w:tab/></w:r><w:hyperlink><w:r><w:t>Two</w:t></w:r></w:hyperlink><w:del><w:r><w:delText>gone</w:delText></w:r></w:del></w:p>"#,
        );
        assert_eq!(p.text(), "One\tTwo");
        assert_eq!(p.char_len(), 7);
        assert_eq!(p.runs().len(), 2);
    }

    #[test]
    fn test_format_range_splits_runs() {
        let mut p = para(
            r#"<w:p><w:r><w:rPr><w:i/></w:rPr><w:t>Hello world</w:t></w:r></w:p>"#,
        );
        let format = RunFormat {
            bold: Some(true),
            ..Default::default()
        };
        assert_eq!(p.format_range(6, 9, &format).unwrap(), 1);

        let runs = p.runs();
        assert_eq!(runs.len(), 3);
        let texts: Vec<_> = runs.iter().map(|r| run_text(r)).collect();
        assert_eq!(texts, ["Hello ", "wor", "ld"]);
        assert!(runs[1].child("rPr").unwrap().child("b").is_some());
        assert!(runs[1].child("rPr").unwrap().child("i").is_some());
        assert!(runs[0].child("rPr").unwrap().child("b").is_none());
        assert_eq!(p.text(), "Hello world");
    }

    #[test]
    fn test_format_range_validation() {
        let mut p = Paragraph::with_text("abc");
        let format = RunFormat::default();
        assert!(matches!(p.format_range(2, 2, &format), Err(Error::Validation(_))));
        assert!(matches!(p.format_range(0, 4, &format), Err(Error::Validation(_))));
    }

    #[test]
    fn test_insert_run_at_offset() {
        let mut p = Paragraph::with_text("abcdef");
        let marker = XmlElement::new("w:r").with_child(XmlElement::new("w:footnoteReference"));
        assert!(p.insert_run_at(3, marker));
        {
            let runs = p.runs();
            assert_eq!(runs.len(), 3);
            assert!(runs[1].child("footnoteReference").is_some());
            assert_eq!(run_text(runs[0]), "abc");
            assert_eq!(run_text(runs[2]), "def");
        }

        let extra = XmlElement::new("w:r");
        assert!(!p.insert_run_at(42, extra));
    }

    #[test]
    fn test_replace_text_is_local() {
        let mut p = para(r#"<w:p><w:r><w:t>cat cat</w:t></w:r><w:r><w:t>c</w:t></w:r><w:r><w:t>at</w:t></w:r></w:p>"#);
        assert_eq!(p.replace_text("cat", "dog"), 2);
        assert_eq!(p.text(), "dog dogcat");
    }

    #[test]
    fn test_make_run_preserves_space() {
        let run = make_run(" lead\tx", None);
        let names: Vec<_> = run.elements().map(|e| e.local_name().to_string()).collect();
        assert_eq!(names, ["t", "tab", "t"]);
        assert_eq!(run.elements().next().unwrap().attr("xml:space"), Some("preserve"));
    }
}
