//! Doc-block annotation parsing.
//!
//! Turns a raw doc comment into the ordered sequence of annotations it
//! declares. Recognized syntax follows the usual doc-block tag shape:
//!
//! - `@Desc` — bare marker, no fields
//! - `@Desc("Active")` — positional payload value
//! - `@Desc(text="Active", short="A")` — named fields
//!
//! Only tags declared in the [`AnnotationSchema`] are parsed; everything
//! else (`@param`, `@return`, plain prose tags, email addresses) is
//! skipped. A declared tag with a malformed body is a parse error.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::AnnotationSchema;

/// One parsed annotation: a concrete type name plus its fields in
/// declaration order. Produced fresh per parse call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub type_name: String,
    #[serde(default)]
    pub fields: IndexMap<String, String>,
}

impl Annotation {
    pub fn new(type_name: impl Into<String>) -> Self {
        Annotation {
            type_name: type_name.into(),
            fields: IndexMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }
}

// Matches a doc-block tag start: @Name. Whether the tag is an annotation
// is decided against the schema, not here.
static TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([A-Za-z_][A-Za-z0-9_]*)").unwrap());

/// Parses doc blocks into [`Annotation`] sequences.
///
/// Stateless and immutable; one instance can be shared freely across
/// threads after construction.
#[derive(Debug, Clone, Default)]
pub struct DocParser {
    _private: (),
}

impl DocParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw doc comment into its declared annotations, in source
    /// order. Tags not present in `schema` are skipped. Returns
    /// [`Error::MetadataParse`] when a declared tag has a malformed body.
    pub fn parse(&self, raw: &str, schema: &AnnotationSchema) -> Result<Vec<Annotation>> {
        let cleaned = strip_doc_markers(raw);
        let mut annotations = Vec::new();
        let mut search_from = 0;

        while let Some(m) = TAG_REGEX.find_at(&cleaned, search_from) {
            let name = &cleaned[m.start() + 1..m.end()];
            if !schema.contains(name) {
                search_from = m.end();
                continue;
            }

            let rest = &cleaned[m.end()..];
            if let Some(stripped) = rest.strip_prefix('(') {
                let (body, consumed) = scan_body(stripped, name)?;
                let fields = parse_body(body, name, schema)?;
                annotations.push(Annotation {
                    type_name: name.to_string(),
                    fields,
                });
                search_from = m.end() + 1 + consumed;
            } else {
                annotations.push(Annotation::new(name));
                search_from = m.end();
            }
        }

        Ok(annotations)
    }
}

/// Strip comment decoration: the `/** ... */` frame and per-line `*` or
/// `//` gutters, keeping line structure.
fn strip_doc_markers(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix("/**")
        .or_else(|| trimmed.strip_prefix("/*"))
        .unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix("*/").unwrap_or(trimmed);

    trimmed
        .lines()
        .map(|line| {
            let line = line.trim_start();
            line.strip_prefix("///")
                .or_else(|| line.strip_prefix("//"))
                .or_else(|| line.strip_prefix('*'))
                .unwrap_or(line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Find the body of a parenthesized tag. `input` starts just after the
/// opening paren; returns the body slice and the byte offset just past
/// the closing paren.
fn scan_body<'a>(input: &'a str, tag: &str) -> Result<(&'a str, usize)> {
    let mut quote: Option<char> = None;
    for (i, c) in input.char_indices() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => quote = Some(c),
                ')' => return Ok((&input[..i], i + 1)),
                _ => {}
            },
        }
    }
    Err(Error::MetadataParse {
        annotation: tag.to_string(),
        reason: "unterminated annotation body".to_string(),
    })
}

/// Parse a tag body into named fields. Items are comma separated; each is
/// either `name=value` or a positional value mapped to the type's payload
/// field. Values are quoted strings or bare tokens.
fn parse_body(
    body: &str,
    tag: &str,
    schema: &AnnotationSchema,
) -> Result<IndexMap<String, String>> {
    let mut fields = IndexMap::new();
    let mut cursor = Cursor::new(body, tag);
    let mut saw_positional = false;

    loop {
        cursor.skip_ws();
        if cursor.at_end() {
            break;
        }

        if let Some(value) = cursor.take_quoted()? {
            // Positional quoted value.
            record_positional(&mut fields, &mut saw_positional, value, tag, schema)?;
        } else {
            let token = cursor.take_token()?;
            cursor.skip_ws();
            if cursor.take_char('=') {
                cursor.skip_ws();
                let value = match cursor.take_quoted()? {
                    Some(quoted) => quoted,
                    None => cursor.take_token()?,
                };
                fields.insert(token, value);
            } else {
                record_positional(&mut fields, &mut saw_positional, token, tag, schema)?;
            }
        }

        cursor.skip_ws();
        if cursor.at_end() {
            break;
        }
        if !cursor.take_char(',') {
            return Err(cursor.error("expected ',' between fields"));
        }
    }

    Ok(fields)
}

fn record_positional(
    fields: &mut IndexMap<String, String>,
    saw_positional: &mut bool,
    value: String,
    tag: &str,
    schema: &AnnotationSchema,
) -> Result<()> {
    if *saw_positional {
        return Err(Error::MetadataParse {
            annotation: tag.to_string(),
            reason: "multiple positional values".to_string(),
        });
    }
    *saw_positional = true;
    let field = schema.inferred_field(tag).unwrap_or("value").to_string();
    fields.insert(field, value);
    Ok(())
}

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
    tag: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str, tag: &'a str) -> Self {
        Cursor { input, pos: 0, tag }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }

    fn take_char(&mut self, expected: char) -> bool {
        if self.rest().starts_with(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    /// Take a quoted string if one starts here. `None` when the next
    /// token is not quoted; an error for an unterminated quote.
    fn take_quoted(&mut self) -> Result<Option<String>> {
        let rest = self.rest();
        let quote = match rest.chars().next() {
            Some(c @ ('"' | '\'')) => c,
            _ => return Ok(None),
        };
        let inner = &rest[quote.len_utf8()..];
        match inner.find(quote) {
            Some(end) => {
                self.pos += quote.len_utf8() * 2 + end;
                Ok(Some(inner[..end].to_string()))
            }
            None => Err(self.error("unterminated string")),
        }
    }

    /// Take a bare token: identifier, number, or dotted path.
    fn take_token(&mut self) -> Result<String> {
        let rest = self.rest();
        let end = rest
            .find(|c: char| !c.is_alphanumeric() && !matches!(c, '_' | '.' | '-' | '+'))
            .unwrap_or(rest.len());
        if end == 0 {
            return Err(self.error("expected a field name or value"));
        }
        self.pos += end;
        Ok(rest[..end].to_string())
    }

    fn error(&self, reason: &str) -> Error {
        Error::MetadataParse {
            annotation: self.tag.to_string(),
            reason: reason.to_string(),
        }
    }
}
