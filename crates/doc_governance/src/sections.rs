//! Fence-aware section extraction.
//!
//! Illustrative code blocks are masked line-for-line before headings are scanned, so a
//! `## Decision` inside a sample never becomes document structure and line numbers in later
//! diagnostics still match the source file.

use crate::error::{DuplicateHeading, DuplicateHeadingError};
use indexmap::IndexMap;

/// Placeholder written over every line of a fenced block.
pub const MASK_LINE: &str = "\u{2591}";

/// One section at the structural depth.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Section {
    /// Heading text without the marker.
    pub heading: String,
    /// One-based line of the heading in the scanned text, after the caller's offset.
    pub line: usize,
    /// Body text up to the next heading at the same or shallower depth.
    pub body: String,
    /// Zero-based index of the heading line in the scanned text.
    pub start: usize,
    /// Zero-based index one past the last body line.
    pub end: usize,
}

impl Section {
    /// True when the body holds nothing but whitespace or masked placeholders.
    pub fn is_empty(&self) -> bool {
        self.body.trim().is_empty()
    }
}

#[derive(Clone, Copy)]
struct Fence {
    marker: u8,
    len: usize,
}

fn fence_open(line: &str) -> Option<Fence> {
    let trimmed = strip_indent(line)?;
    let marker = *trimmed.as_bytes().first()?;
    if marker != b'`' && marker != b'~' {
        return None;
    }
    let len = trimmed.bytes().take_while(|b| *b == marker).count();
    if len < 3 {
        return None;
    }
    if marker == b'`' && trimmed[len..].contains('`') {
        return None;
    }
    Some(Fence { marker, len })
}

fn fence_closes(line: &str, fence: Fence) -> bool {
    let Some(trimmed) = strip_indent(line) else {
        return false;
    };
    let len = trimmed.bytes().take_while(|b| *b == fence.marker).count();
    len >= fence.len && trimmed[len..].trim().is_empty()
}

/// Up to three spaces of indentation; four or more is an indented code line.
fn strip_indent(line: &str) -> Option<&str> {
    let indent = line.bytes().take_while(|b| *b == b' ').count();
    (indent <= 3).then(|| &line[indent..])
}

/// Replace every line of every fenced block, delimiters included, with [`MASK_LINE`].
///
/// The output has exactly as many lines as the input. An unterminated fence masks to the end.
pub fn mask_fenced_blocks(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut open: Option<Fence> = None;
    for line in text.split('\n') {
        match open {
            Some(fence) => {
                if fence_closes(line, fence) {
                    open = None;
                }
                out.push(MASK_LINE);
            }
            None => match fence_open(line) {
                Some(fence) => {
                    open = Some(fence);
                    out.push(MASK_LINE);
                }
                None => out.push(line),
            },
        }
    }
    out.join("\n")
}

/// Heading level and text, if `line` is an ATX heading.
pub fn parse_heading(line: &str) -> Option<(usize, &str)> {
    let line = strip_indent(line)?;
    let bytes = line.as_bytes();
    let mut count = 0usize;
    while count < bytes.len() && bytes[count] == b'#' {
        count += 1;
    }
    if count == 0 || count > 6 {
        return None;
    }
    match bytes.get(count) {
        None => return Some((count, "")),
        Some(b) if !b.is_ascii_whitespace() => return None,
        Some(_) => {}
    }
    let mut text = line[count..].trim();
    let closing = text.trim_end_matches('#');
    if closing.len() != text.len() && (closing.is_empty() || closing.ends_with(' ')) {
        text = closing.trim_end();
    }
    Some((count, text))
}

/// Every section at `depth`, in document order, duplicates included.
///
/// `line_offset` is added to reported line numbers so callers scanning a body that follows a
/// metadata block can report file lines.
pub fn scan_sections(text: &str, depth: usize, line_offset: usize) -> Vec<Section> {
    let masked = mask_fenced_blocks(text);
    let masked_lines: Vec<&str> = masked.split('\n').collect();
    let source_lines: Vec<&str> = text.split('\n').collect();

    let mut sections = Vec::new();
    let mut current: Option<(String, usize)> = None;

    let close = |current: &mut Option<(String, usize)>, end: usize, out: &mut Vec<Section>| {
        if let Some((heading, start)) = current.take() {
            out.push(Section {
                heading,
                line: start + 1 + line_offset,
                body: source_lines[start + 1..end].join("\n"),
                start,
                end,
            });
        }
    };

    for (idx, line) in masked_lines.iter().enumerate() {
        let Some((level, heading)) = parse_heading(line) else {
            continue;
        };
        if level > depth {
            continue;
        }
        close(&mut current, idx, &mut sections);
        if level == depth {
            current = Some((heading.to_string(), idx));
        }
    }
    close(&mut current, source_lines.len(), &mut sections);
    sections
}

/// Ordered heading -> section map. Repeated headings are an error listing every occurrence.
pub fn extract(
    text: &str,
    depth: usize,
    line_offset: usize,
) -> Result<IndexMap<String, Section>, DuplicateHeadingError> {
    let sections = scan_sections(text, depth, line_offset);
    let duplicates = find_duplicates(&sections);
    if !duplicates.is_empty() {
        return Err(DuplicateHeadingError { duplicates });
    }
    Ok(sections
        .into_iter()
        .map(|section| (section.heading.clone(), section))
        .collect())
}

/// Headings occurring more than once, in first-occurrence order.
pub fn find_duplicates(sections: &[Section]) -> Vec<DuplicateHeading> {
    let mut seen: IndexMap<&str, Vec<usize>> = IndexMap::new();
    for section in sections {
        seen.entry(section.heading.as_str())
            .or_default()
            .push(section.line);
    }
    seen.into_iter()
        .filter(|(_, lines)| lines.len() > 1)
        .map(|(heading, lines)| DuplicateHeading {
            heading: heading.to_string(),
            lines,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DOC: &str = "# Title\n\
\n\
## Context\n\
Storage grows.\n\
### Detail\n\
More.\n\
\n\
```md\n\
## Decision\n\
not real\n\
```\n\
\n\
## Decision\n\
Use a log.\n";

    #[test]
    fn mask_preserves_line_count() {
        let masked = mask_fenced_blocks(DOC);
        assert_eq!(masked.split('\n').count(), DOC.split('\n').count());
        assert!(!masked.contains("not real"));
    }

    #[test]
    fn masking_twice_matches_masking_once() {
        let once = mask_fenced_blocks(DOC);
        let twice = mask_fenced_blocks(&once);
        assert_eq!(once, twice);
        assert_eq!(
            scan_sections(&once, 2, 0),
            scan_sections(&twice, 2, 0)
        );
    }

    #[test]
    fn headings_inside_fences_are_ignored() {
        let sections = extract(DOC, 2, 0).expect("extract");
        assert_eq!(
            sections.keys().cloned().collect::<Vec<_>>(),
            vec!["Context", "Decision"]
        );
        let context = &sections["Context"];
        assert_eq!(context.line, 3);
        assert!(context.body.contains("### Detail"));
        assert!(context.body.contains("not real"), "body keeps fenced content verbatim");
        assert_eq!(sections["Decision"].line, 13);
        assert_eq!(sections["Decision"].body.trim(), "Use a log.");
    }

    #[test]
    fn shallower_heading_ends_section() {
        let text = "## A\nbody\n# Appendix\nloose\n## B\n";
        let sections = scan_sections(text, 2, 0);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].body, "body");
        assert!(sections[1].is_empty());
    }

    #[test]
    fn tilde_fences_need_matching_marker_and_length() {
        let text = "~~~~\n```\n## Hidden\n~~~\n~~~~\n## Shown\n";
        let sections = scan_sections(text, 2, 0);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].heading, "Shown");
    }

    #[test]
    fn unterminated_fence_masks_to_end() {
        let text = "## Real\n```\n## Fake\n";
        let sections = scan_sections(text, 2, 0);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].heading, "Real");
    }

    #[test]
    fn duplicate_headings_report_all_lines() {
        let text = "## Decision\nA\n## Context\nB\n## Decision\nC\n";
        let err = extract(text, 2, 10).expect_err("duplicates");
        assert_eq!(
            err.duplicates,
            vec![DuplicateHeading {
                heading: "Decision".into(),
                lines: vec![11, 15],
            }]
        );
    }

    #[test]
    fn parse_heading_strips_closing_hashes() {
        assert_eq!(parse_heading("## Decision ##"), Some((2, "Decision")));
        assert_eq!(parse_heading("##Decision"), None);
        assert_eq!(parse_heading("    ## Indented code"), None);
        assert_eq!(parse_heading("## C#"), Some((2, "C#")));
    }
}
