//! Tokenizer and recursive-descent parser for commit messages.
//!
//! ```text
//! message  := subject (NL blank body)?
//! subject  := category ("(" scope ")")? "!"? ":" SP description
//! body     := (bullet child* | justification | comment | prose | blank)*
//! bullet   := "- [" category "]" SP target ("," SP? target)* ":" SP description
//! child    := INDENT "-" text
//! justification := key ":" SP kind
//! ```
//!
//! The parser recovers line by line so that every structural problem is reported in one pass.

use crate::error::GrammarError;
use serde::Serialize;

/// Parsed subject line.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Subject {
    /// Category word before the scope.
    pub category: String,
    /// Optional parenthesised scope.
    pub scope: Option<String>,
    /// `!` marker before the colon.
    pub breaking: bool,
    /// Text after `: `.
    pub description: String,
}

/// One body bullet.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Bullet {
    /// Bracketed category tag.
    pub tag: String,
    /// Changed paths, at least one.
    pub targets: Vec<String>,
    /// Text after the target list.
    pub description: String,
    /// Nested sub-bullets, verbatim minus the shared indent.
    pub children: Vec<String>,
    /// One-based line in the message.
    pub line: usize,
}

/// Architectural-justification tag.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Justification {
    /// Kind named after the key.
    pub kind: String,
    /// One-based line in the message.
    pub line: usize,
}

/// A fully well-formed commit message.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CommitMessage {
    /// Subject line.
    pub subject: Subject,
    /// Body bullets in order.
    pub bullets: Vec<Bullet>,
    /// Justification tag, if present.
    pub justification: Option<Justification>,
}

impl CommitMessage {
    /// Strict parse; any grammar error rejects the message.
    pub fn parse(text: &str, justification_key: &str) -> Result<Self, Vec<GrammarError>> {
        parse_draft(text, justification_key).into_message()
    }
}

/// Everything the parser could recover, plus every grammar error found.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CommitDraft {
    /// Subject, when the first line parsed.
    pub subject: Option<Subject>,
    /// One-based line of the subject, after leading comment lines.
    pub subject_line: Option<usize>,
    /// Well-formed bullets.
    pub bullets: Vec<Bullet>,
    /// First justification tag.
    pub justification: Option<Justification>,
    /// Grammar errors in line order.
    pub errors: Vec<GrammarError>,
}

impl CommitDraft {
    /// Promote to a [`CommitMessage`] if nothing went wrong.
    pub fn into_message(self) -> Result<CommitMessage, Vec<GrammarError>> {
        match self.subject {
            Some(subject) if self.errors.is_empty() => Ok(CommitMessage {
                subject,
                bullets: self.bullets,
                justification: self.justification,
            }),
            _ => Err(self.errors),
        }
    }
}

/// Parse with recovery.
pub fn parse_draft(text: &str, justification_key: &str) -> CommitDraft {
    let lines: Vec<Line<'_>> = text
        .lines()
        .enumerate()
        .map(|(idx, raw)| Line::classify(idx + 1, raw, justification_key))
        .collect();
    let mut draft = CommitDraft::default();
    let mut parser = BodyParser {
        lines: &lines,
        pos: 0,
        draft: &mut draft,
    };
    parser.message();
    draft
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum LineKind<'a> {
    Blank,
    Comment,
    Bullet(&'a str),
    Child { indent: usize },
    Justification(&'a str),
    Prose,
}

#[derive(Clone, Copy, Debug)]
struct Line<'a> {
    number: usize,
    raw: &'a str,
    kind: LineKind<'a>,
}

impl<'a> Line<'a> {
    fn classify(number: usize, raw: &'a str, justification_key: &str) -> Self {
        let trimmed = raw.trim_start();
        // Counted in chars; indents may mix in multi-byte whitespace.
        let indent = raw.chars().take_while(|c| c.is_whitespace()).count();
        let kind = if trimmed.trim_end().is_empty() {
            LineKind::Blank
        } else if indent == 0 && trimmed.starts_with('#') {
            LineKind::Comment
        } else if trimmed.starts_with('-') && indent > 0 {
            LineKind::Child { indent }
        } else if let Some(rest) = raw.strip_prefix('-') {
            LineKind::Bullet(rest)
        } else if let Some(rest) = raw
            .strip_prefix(justification_key)
            .and_then(|rest| rest.strip_prefix(':'))
        {
            LineKind::Justification(rest)
        } else {
            LineKind::Prose
        };
        Self { number, raw, kind }
    }
}

struct BodyParser<'l, 'a, 'd> {
    lines: &'l [Line<'a>],
    pos: usize,
    draft: &'d mut CommitDraft,
}

impl<'a> BodyParser<'_, 'a, '_> {
    fn error(&mut self, line: usize, message: impl Into<String>) {
        self.draft.errors.push(GrammarError::new(line, message));
    }

    fn message(&mut self) {
        // Comment lines are stripped before the subject, as git does.
        while matches!(self.peek().map(|l| l.kind), Some(LineKind::Comment)) {
            self.pos += 1;
        }
        let Some(first) = self.next() else {
            self.error(1, "empty commit message");
            return;
        };
        self.draft.subject_line = Some(first.number);
        match parse_subject(first.raw) {
            Ok(subject) => self.draft.subject = Some(subject),
            Err(message) => self.error(first.number, message),
        }
        match self.peek() {
            None => return,
            Some(line) if line.kind != LineKind::Blank => {
                let number = line.number;
                self.error(number, "body must be separated from the subject by a blank line");
            }
            Some(_) => {}
        }
        self.body();
    }

    fn body(&mut self) {
        while let Some(line) = self.next() {
            match line.kind {
                LineKind::Blank | LineKind::Comment | LineKind::Prose => {}
                LineKind::Bullet(rest) => self.bullet(line.number, rest),
                LineKind::Child { .. } => {
                    self.error(line.number, "nested bullet has no parent bullet");
                }
                LineKind::Justification(rest) => self.justification(line.number, rest),
            }
        }
    }

    fn bullet(&mut self, number: usize, rest: &str) {
        let parsed = parse_bullet(rest);
        let children = self.children();
        match parsed {
            Ok((tag, targets, description)) => self.draft.bullets.push(Bullet {
                tag,
                targets,
                description,
                children,
                line: number,
            }),
            Err(message) => self.error(number, message),
        }
    }

    fn children(&mut self) -> Vec<String> {
        let mut children = Vec::new();
        let mut base = None;
        while let Some(line) = self.peek() {
            let LineKind::Child { indent } = line.kind else {
                break;
            };
            let base = *base.get_or_insert(indent);
            let cut = line
                .raw
                .char_indices()
                .nth(indent.min(base))
                .map_or(line.raw.len(), |(idx, _)| idx);
            children.push(line.raw[cut..].trim_end().to_string());
            self.pos += 1;
        }
        children
    }

    fn justification(&mut self, number: usize, rest: &str) {
        let kind = rest.trim();
        if kind.is_empty() {
            self.error(number, "justification tag names no kind");
        } else if self.draft.justification.is_some() {
            self.error(number, "justification tag appears more than once");
        } else {
            self.draft.justification = Some(Justification {
                kind: kind.to_string(),
                line: number,
            });
        }
    }

    fn peek(&self) -> Option<Line<'a>> {
        self.lines.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Line<'a>> {
        let line = self.lines.get(self.pos).copied();
        self.pos += 1;
        line
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum Token<'a> {
    Word(&'a str),
    Open,
    Close,
    Bang,
    Colon,
    Space,
    Other(char),
}

fn tokenize(text: &str) -> Vec<(usize, Token<'_>)> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some((start, ch)) = chars.next() {
        let token = match ch {
            '(' => Token::Open,
            ')' => Token::Close,
            '!' => Token::Bang,
            ':' => Token::Colon,
            ' ' => Token::Space,
            c if is_word_char(c) => {
                let mut end = start + c.len_utf8();
                while let Some(&(idx, next)) = chars.peek() {
                    if !is_word_char(next) {
                        break;
                    }
                    end = idx + next.len_utf8();
                    chars.next();
                }
                Token::Word(&text[start..end])
            }
            other => Token::Other(other),
        };
        tokens.push((start, token));
    }
    tokens
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' || c == '/'
}

struct SubjectParser<'a> {
    text: &'a str,
    tokens: Vec<(usize, Token<'a>)>,
    pos: usize,
}

impl<'a> SubjectParser<'a> {
    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos).map(|(_, token)| token)
    }

    fn bump(&mut self) -> Option<Token<'a>> {
        let token = self.tokens.get(self.pos).map(|(_, token)| token.clone());
        self.pos += 1;
        token
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(idx, _)| *idx)
            .unwrap_or(self.text.len())
    }

    fn category(&mut self) -> Result<String, String> {
        match self.bump() {
            Some(Token::Word(word)) if word.starts_with(|c: char| c.is_ascii_lowercase()) => {
                Ok(word.to_string())
            }
            _ => Err("subject must start with a lowercase category".into()),
        }
    }

    fn scope(&mut self) -> Result<Option<String>, String> {
        if self.peek() != Some(&Token::Open) {
            return Ok(None);
        }
        self.bump();
        let start = self.offset();
        loop {
            match self.bump() {
                Some(Token::Close) => break,
                Some(Token::Word(_) | Token::Other(',')) => {}
                _ => return Err("scope must be closed with `)`".into()),
            }
        }
        let end = self.tokens[self.pos - 1].0;
        let scope = &self.text[start..end];
        if scope.is_empty() {
            return Err("scope parentheses must not be empty".into());
        }
        Ok(Some(scope.to_string()))
    }

    fn subject(&mut self) -> Result<Subject, String> {
        let category = self.category()?;
        let scope = self.scope()?;
        let breaking = self.peek() == Some(&Token::Bang);
        if breaking {
            self.bump();
        }
        if self.bump() != Some(Token::Colon) {
            return Err("expected `:` after the category".into());
        }
        match self.bump() {
            Some(Token::Space) => {}
            None => return Err("subject description must not be empty".into()),
            Some(_) => return Err("expected a space after `:`".into()),
        }
        let description = self.text[self.offset()..].trim();
        if description.is_empty() {
            return Err("subject description must not be empty".into());
        }
        Ok(Subject {
            category,
            scope,
            breaking,
            description: description.to_string(),
        })
    }
}

fn parse_subject(line: &str) -> Result<Subject, String> {
    let line = line.trim_end();
    SubjectParser {
        text: line,
        tokens: tokenize(line),
        pos: 0,
    }
    .subject()
}

fn parse_bullet(rest: &str) -> Result<(String, Vec<String>, String), String> {
    let rest = rest
        .strip_prefix(' ')
        .ok_or_else(|| "expected a space after `-`".to_string())?;
    let rest = rest
        .strip_prefix('[')
        .ok_or_else(|| "bullet must start with a `[category]` tag".to_string())?;
    let (tag, rest) = rest
        .split_once(']')
        .ok_or_else(|| "bullet category tag is not closed with `]`".to_string())?;
    if tag.trim().is_empty() {
        return Err("bullet category tag is empty".into());
    }
    let (targets, description) = rest
        .split_once(": ")
        .ok_or_else(|| "bullet must separate targets from the description with `: `".to_string())?;
    let targets: Vec<String> = targets
        .split(',')
        .map(str::trim)
        .filter(|target| !target.is_empty())
        .map(str::to_string)
        .collect();
    if targets.is_empty() {
        return Err("bullet must name at least one target path".into());
    }
    let description = description.trim();
    if description.is_empty() {
        return Err("bullet description must not be empty".into());
    }
    Ok((tag.trim().to_string(), targets, description.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FULL: &str = "refactor(storage): restructure index

- [refactor] crates/store/src/index.rs: split index writer
  - keeps the on-disk format unchanged
    - even for v1 files
- [test] crates/store/tests/index.rs, crates/store/tests/compact.rs: cover split writer
Some free prose.
# a comment
Arch: boundary
";

    #[test]
    fn full_message_parses() {
        let message = CommitMessage::parse(FULL, "Arch").expect("parse");
        assert_eq!(
            message.subject,
            Subject {
                category: "refactor".into(),
                scope: Some("storage".into()),
                breaking: false,
                description: "restructure index".into(),
            }
        );
        assert_eq!(message.bullets.len(), 2);
        assert_eq!(
            message.bullets[0].children,
            vec!["- keeps the on-disk format unchanged", "  - even for v1 files"]
        );
        assert_eq!(
            message.bullets[1].targets,
            vec!["crates/store/tests/index.rs", "crates/store/tests/compact.rs"]
        );
        assert_eq!(message.bullets[1].line, 6);
        assert_eq!(
            message.justification,
            Some(Justification {
                kind: "boundary".into(),
                line: 9,
            })
        );
    }

    #[test]
    fn mixed_width_child_indent_is_cut_on_a_char_boundary() {
        let text = "fix(api): x\n\n- [fix] a.rs: y\n   - one\n\u{a0}\u{a0}- two\n";
        let message = CommitMessage::parse(text, "Arch").expect("parse");
        assert_eq!(message.bullets[0].children, vec!["- one", "- two"]);
    }

    #[test]
    fn subject_forms() {
        let plain = parse_subject("docs: fix typo").expect("plain");
        assert_eq!(plain.scope, None);
        let breaking = parse_subject("feat(api)!: drop v1").expect("breaking");
        assert!(breaking.breaking);
        assert_eq!(breaking.scope.as_deref(), Some("api"));
    }

    #[test]
    fn subject_errors_are_specific() {
        assert_eq!(
            parse_subject("feat add thing"),
            Err("expected `:` after the category".into())
        );
        assert_eq!(
            parse_subject("feat: "),
            Err("subject description must not be empty".into())
        );
        assert_eq!(
            parse_subject("feat(): x"),
            Err("scope parentheses must not be empty".into())
        );
        assert_eq!(
            parse_subject("Feat: x"),
            Err("subject must start with a lowercase category".into())
        );
        assert_eq!(parse_subject("feat:x"), Err("expected a space after `:`".into()));
    }

    #[test]
    fn every_structural_error_is_reported() {
        let text = "feat(api): add\n- [feat] : no target\n- plain bullet\n  - orphan?\nArch:\n";
        let draft = parse_draft(text, "Arch");
        let lines: Vec<usize> = draft.errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![2, 2, 3, 5]);
        assert!(draft.subject.is_some());
        assert!(draft.bullets.is_empty());
    }

    #[test]
    fn orphan_child_is_an_error() {
        let draft = parse_draft("fix: x\n\n  - orphan\n", "Arch");
        assert_eq!(draft.errors, vec![GrammarError::new(3, "nested bullet has no parent bullet")]);
    }

    #[test]
    fn leading_comments_are_skipped() {
        let message = CommitMessage::parse("# Please enter\nfix: y\n", "Arch").expect("parse");
        assert_eq!(message.subject.category, "fix");
        assert_eq!(parse_draft("# Please enter\nfix: y\n", "Arch").subject_line, Some(2));
    }

    #[test]
    fn duplicate_justification_is_rejected() {
        let errors = CommitMessage::parse("fix: y\n\nArch: boundary\nArch: layering\n", "Arch")
            .expect_err("duplicate");
        assert_eq!(errors[0].line, 4);
    }
}
