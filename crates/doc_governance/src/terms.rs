//! Cross-reference terms such as `ADR-00042`.
//!
//! A term is a known prefix, a separator, and a numeral. Canonical terms use `-` and the
//! domain's zero-padded width; near misses (`ADR 42`, `ADR_00042`, `ADR00042`) are reported with
//! their canonical spelling so fix mode can rewrite them. Fenced blocks are never scanned.

use crate::sections::mask_fenced_blocks;

/// Id format of one referenceable domain.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TermFormat {
    /// Domain the ids belong to.
    pub domain: String,
    /// Id prefix, e.g. `ADR`.
    pub prefix: String,
    /// Zero-padded numeral width.
    pub digits: usize,
}

impl TermFormat {
    /// Canonical spelling of a numeral, if it fits the width.
    pub fn canonical(&self, number: u64) -> Option<String> {
        let id = format!("{}-{:0width$}", self.prefix, number, width = self.digits);
        (id.len() == self.prefix.len() + 1 + self.digits).then_some(id)
    }
}

/// One term occurrence.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TermRef {
    /// Text as written.
    pub text: String,
    /// Canonical spelling, when the numeral fits the width.
    pub canonical: Option<String>,
    /// Domain whose format matched.
    pub domain: String,
    /// One-based line, after the caller's offset.
    pub line: usize,
    /// Byte offset within the line.
    pub column: usize,
}

impl TermRef {
    /// Written exactly in canonical form.
    pub fn is_canonical(&self) -> bool {
        self.canonical.as_deref() == Some(self.text.as_str())
    }
}

/// Every term in `text`, outside fenced blocks, in reading order.
pub fn scan_terms(text: &str, formats: &[TermFormat], line_offset: usize) -> Vec<TermRef> {
    let masked = mask_fenced_blocks(text);
    let mut out = Vec::new();
    for (idx, line) in masked.split('\n').enumerate() {
        let mut found: Vec<TermRef> = formats
            .iter()
            .flat_map(|format| scan_line(line, format))
            .map(|(column, text, canonical, domain)| TermRef {
                text,
                canonical,
                domain,
                line: idx + 1 + line_offset,
                column,
            })
            .collect();
        found.sort_by_key(|term| term.column);
        out.extend(found);
    }
    out
}

/// Rewrite every near-miss term with a canonical spelling.
///
/// Returns the new text and the `(written, canonical, line)` triples that were replaced.
pub fn reformat_terms(
    text: &str,
    formats: &[TermFormat],
    line_offset: usize,
) -> (String, Vec<(String, String, usize)>) {
    let masked = mask_fenced_blocks(text);
    let mut replaced = Vec::new();
    let mut lines: Vec<String> = Vec::new();
    for (idx, (source, masked)) in text.split('\n').zip(masked.split('\n')).enumerate() {
        if source != masked {
            lines.push(source.to_string());
            continue;
        }
        let mut hits: Vec<(usize, String, Option<String>, String)> = formats
            .iter()
            .flat_map(|format| scan_line(source, format))
            .collect();
        hits.sort_by_key(|hit| hit.0);

        let mut line = String::with_capacity(source.len());
        let mut cursor = 0usize;
        for (column, written, canonical, _) in hits {
            let Some(canonical) = canonical else {
                continue;
            };
            if written == canonical || column < cursor {
                continue;
            }
            line.push_str(&source[cursor..column]);
            line.push_str(&canonical);
            cursor = column + written.len();
            replaced.push((written, canonical, idx + 1 + line_offset));
        }
        line.push_str(&source[cursor..]);
        lines.push(line);
    }
    (lines.join("\n"), replaced)
}

fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-'
}

fn scan_line(line: &str, format: &TermFormat) -> Vec<(usize, String, Option<String>, String)> {
    let bytes = line.as_bytes();
    let mut out = Vec::new();
    for (start, _) in line.match_indices(format.prefix.as_str()) {
        if start > 0 && is_word_byte(bytes[start - 1]) {
            continue;
        }
        let mut pos = start + format.prefix.len();
        if matches!(bytes.get(pos), Some(b'-' | b' ' | b'_')) {
            pos += 1;
        }
        let digits_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        if pos == digits_start {
            continue;
        }
        if pos < bytes.len() && bytes[pos].is_ascii_alphanumeric() {
            continue;
        }
        let canonical = line[digits_start..pos]
            .parse::<u64>()
            .ok()
            .and_then(|number| format.canonical(number));
        out.push((
            start,
            line[start..pos].to_string(),
            canonical,
            format.domain.clone(),
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn formats() -> Vec<TermFormat> {
        vec![
            TermFormat {
                domain: "adr".into(),
                prefix: "RECORD".into(),
                digits: 5,
            },
            TermFormat {
                domain: "evidence".into(),
                prefix: "EVD".into(),
                digits: 4,
            },
        ]
    }

    #[test]
    fn canonical_terms_are_recognized() {
        let terms = scan_terms("See RECORD-26004 and EVD-0012.", &formats(), 0);
        assert_eq!(terms.len(), 2);
        assert!(terms.iter().all(TermRef::is_canonical));
        assert_eq!(terms[1].domain, "evidence");
    }

    #[test]
    fn near_misses_carry_canonical_spelling() {
        let terms = scan_terms("x\nSee RECORD 26004, RECORD_26004, RECORD26004, RECORD-42.", &formats(), 3);
        let spelled: Vec<_> = terms
            .iter()
            .map(|t| (t.text.as_str(), t.canonical.as_deref(), t.line))
            .collect();
        assert_eq!(
            spelled,
            vec![
                ("RECORD 26004", Some("RECORD-26004"), 5),
                ("RECORD_26004", Some("RECORD-26004"), 5),
                ("RECORD26004", Some("RECORD-26004"), 5),
                ("RECORD-42", Some("RECORD-00042"), 5),
            ]
        );
        assert!(terms.iter().all(|t| !t.is_canonical()));
    }

    #[test]
    fn prose_and_embedded_words_are_not_terms() {
        let terms = scan_terms("The RECORD process; XRECORD-00001; RECORD-00001a", &formats(), 0);
        assert!(terms.is_empty());
    }

    #[test]
    fn oversized_numerals_have_no_canonical_form() {
        let terms = scan_terms("EVD-123456", &formats(), 0);
        assert_eq!(terms[0].canonical, None);
    }

    #[test]
    fn fenced_terms_are_skipped() {
        let text = "```\nRECORD 26004\n```\nRECORD 26004\n";
        let terms = scan_terms(text, &formats(), 0);
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0].line, 4);
    }

    #[test]
    fn reformat_rewrites_only_near_misses_outside_fences() {
        let text = "Per RECORD 26004 and RECORD-26005.\n```\nRECORD 1\n```\n";
        let (fixed, replaced) = reformat_terms(text, &formats(), 10);
        assert_eq!(
            fixed,
            "Per RECORD-26004 and RECORD-26005.\n```\nRECORD 1\n```\n"
        );
        assert_eq!(
            replaced,
            vec![("RECORD 26004".to_string(), "RECORD-26004".to_string(), 11)]
        );
    }
}
