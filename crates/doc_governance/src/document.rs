//! Structured documents: a flat metadata block followed by named sections.

use crate::config::DocumentRules;
use crate::error::ParseError;
use crate::sections::{scan_sections, Section};
use indexmap::IndexMap;
use serde::Serialize;
use serde_yaml::Value as YamlValue;
use std::path::Path;

const FRONTMATTER_DELIM: &str = "---";

/// One metadata value. Nesting stops at a flat list.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetaValue {
    /// Single scalar, rendered as text.
    Scalar(String),
    /// Flat list of scalars.
    List(Vec<String>),
}

impl MetaValue {
    /// Scalar text, if this is a scalar.
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Self::Scalar(value) => Some(value),
            Self::List(_) => None,
        }
    }

    /// List items, if this is a list.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            Self::Scalar(_) => None,
        }
    }
}

/// Ordered metadata block.
pub type Metadata = IndexMap<String, MetaValue>;

/// A parsed governed document.
#[derive(Clone, Debug, PartialEq)]
pub struct StructuredDocument {
    /// Stable record id, independent of the title.
    pub id: String,
    /// Repository-relative path with `/` separators.
    pub rel_path: String,
    /// Raw frontmatter text between the delimiters.
    pub frontmatter: String,
    /// Parsed frontmatter.
    pub metadata: Metadata,
    /// Text after the closing delimiter.
    pub body: String,
    /// Number of file lines preceding the body.
    pub body_offset: usize,
    /// Sections at the configured depth, duplicates included.
    pub sections: Vec<Section>,
}

impl StructuredDocument {
    /// Parse document text.
    pub fn parse(rel_path: &str, text: &str, rules: &DocumentRules) -> Result<Self, ParseError> {
        let (frontmatter, body, body_offset) = split_frontmatter(text)?;
        let metadata = parse_metadata(&frontmatter)?;
        let sections = scan_sections(&body, rules.section_depth, body_offset);
        let id = match metadata.get("id").and_then(MetaValue::as_scalar) {
            Some(id) => id.to_string(),
            None => id_from_path(rel_path, rules),
        };
        Ok(Self {
            id,
            rel_path: rel_path.to_string(),
            frontmatter,
            metadata,
            body,
            body_offset,
            sections,
        })
    }

    /// Scalar metadata value.
    pub fn scalar(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(MetaValue::as_scalar)
    }

    /// First section with the given heading.
    pub fn section(&self, heading: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.heading == heading)
    }

    /// Title from metadata, falling back to the id.
    pub fn title(&self) -> &str {
        self.scalar("title").unwrap_or(&self.id)
    }

    /// Serialize back to file text.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.frontmatter.len() + self.body.len() + 8);
        out.push_str(FRONTMATTER_DELIM);
        out.push('\n');
        if !self.frontmatter.is_empty() {
            out.push_str(&self.frontmatter);
            out.push('\n');
        }
        out.push_str(FRONTMATTER_DELIM);
        out.push('\n');
        out.push_str(&self.body);
        out
    }

    /// Re-parse after the raw frontmatter or body changed.
    pub fn reparse(&self, rules: &DocumentRules) -> Result<Self, ParseError> {
        Self::parse(&self.rel_path, &self.render(), rules)
    }
}

/// Split `---` delimited frontmatter from the body.
///
/// Returns the raw frontmatter, the body, and the number of lines before the body.
pub fn split_frontmatter(text: &str) -> Result<(String, String, usize), ParseError> {
    let lines: Vec<&str> = text.split('\n').collect();
    if lines.first().map(|line| line.trim_end()) != Some(FRONTMATTER_DELIM) {
        return Err(ParseError::Delimiter(
            "missing frontmatter start delimiter".into(),
        ));
    }
    let end_idx = lines
        .iter()
        .enumerate()
        .skip(1)
        .find_map(|(i, line)| (line.trim_end() == FRONTMATTER_DELIM).then_some(i))
        .ok_or_else(|| ParseError::Delimiter("missing frontmatter end delimiter".into()))?;

    let frontmatter = lines[1..end_idx].join("\n");
    let body = lines[end_idx + 1..].join("\n");
    Ok((frontmatter, body, end_idx + 1))
}

/// Parse raw frontmatter into flat metadata.
pub fn parse_metadata(raw: &str) -> Result<Metadata, ParseError> {
    if raw.trim().is_empty() {
        return Ok(Metadata::new());
    }
    let value: YamlValue =
        serde_yaml::from_str(raw).map_err(|err| ParseError::Yaml(err.to_string()))?;
    let mapping = match value {
        YamlValue::Mapping(mapping) => mapping,
        YamlValue::Null => return Ok(Metadata::new()),
        _ => return Err(ParseError::Yaml("expected key/value pairs".into())),
    };

    let mut metadata = Metadata::new();
    for (key, value) in mapping {
        let key = scalar_text(&key).ok_or_else(|| ParseError::Yaml("non-scalar key".into()))?;
        let value = match value {
            YamlValue::Sequence(items) => MetaValue::List(
                items
                    .iter()
                    .map(|item| scalar_text(item).ok_or_else(|| ParseError::Nested(key.clone())))
                    .collect::<Result<_, _>>()?,
            ),
            other => MetaValue::Scalar(
                scalar_text(&other).ok_or_else(|| ParseError::Nested(key.clone()))?,
            ),
        };
        metadata.insert(key, value);
    }
    Ok(metadata)
}

fn scalar_text(value: &YamlValue) -> Option<String> {
    match value {
        YamlValue::String(text) => Some(text.clone()),
        YamlValue::Number(number) => Some(number.to_string()),
        YamlValue::Bool(flag) => Some(flag.to_string()),
        YamlValue::Null => Some(String::new()),
        YamlValue::Sequence(_) | YamlValue::Mapping(_) | YamlValue::Tagged(_) => None,
    }
}

/// Record id from a file name such as `ADR-00001-use-a-log.md`.
///
/// Falls back to the whole file stem when the name does not start with a canonical id.
pub fn id_from_path(rel_path: &str, rules: &DocumentRules) -> String {
    let stem = Path::new(rel_path)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let prefix = format!("{}-", rules.id_prefix);
    let Some(rest) = stem.strip_prefix(&prefix) else {
        return stem;
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    let boundary = rest[digits..].is_empty() || rest[digits..].starts_with('-');
    if digits == rules.id_digits && boundary {
        format!("{prefix}{}", &rest[..digits])
    } else {
        stem
    }
}
