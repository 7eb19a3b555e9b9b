//! Template parser
//!
//! Grammar:
//!
//! ```text
//! template := '%' '(' token (',' token)* ')'
//! token    := '**' literal            static text, emitted verbatim
//!           | path padding?           field reference
//! path     := ident ('.' ident)*
//! padding  := '[' digits ']'
//! ```
//!
//! The delimiter and both group markers must each appear exactly once.

use numera_core::TemplateError;
use std::fmt;
use std::str::FromStr;

pub const DELIMITER: char = '%';
pub const GROUP_OPEN: char = '(';
pub const GROUP_CLOSE: char = ')';
pub const TOKEN_SEPARATOR: char = ',';
pub const STATIC_MARKER: &str = "**";
pub const PATH_SEPARATOR: char = '.';

// ============================================================================
// TOKENS
// ============================================================================

/// Byte range of a token in the template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Zero-padding spec of a field token: the width and its digits as written.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Padding {
    pub width: usize,
    /// Source digits, kept so `[04]` renders back as `[04]`
    pub digits: String,
}

/// Dotted field path with optional zero-padding spec, e.g. `partner.code[4]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    pub segments: Vec<String>,
    pub padding: Option<Padding>,
}

impl FieldPath {
    /// Padding width, if the token carries a spec.
    pub fn width(&self) -> Option<usize> {
        self.padding.as_ref().map(|padding| padding.width)
    }

    /// Field declared on the template's own entity.
    pub fn root(&self) -> &str {
        self.segments.first().map(String::as_str).unwrap_or_default()
    }

    /// True when resolving requires at least one relation hop.
    pub fn is_nested(&self) -> bool {
        self.segments.len() > 1
    }

    /// Dotted path without the padding spec.
    pub fn dotted(&self) -> String {
        self.segments.join(".")
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dotted())?;
        if let Some(padding) = &self.padding {
            write!(f, "[{}]", padding.digits)?;
        }
        Ok(())
    }
}

/// One entry of the group list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateToken {
    Static { value: String, span: Span },
    Field { path: FieldPath, span: Span },
}

impl TemplateToken {
    pub fn span(&self) -> Span {
        match self {
            TemplateToken::Static { span, .. } | TemplateToken::Field { span, .. } => *span,
        }
    }
}

impl fmt::Display for TemplateToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateToken::Static { value, .. } => write!(f, "{}{}", STATIC_MARKER, value),
            TemplateToken::Field { path, .. } => write!(f, "{}", path),
        }
    }
}

// ============================================================================
// PARSED TEMPLATE
// ============================================================================

/// A parsed template: the ordered token list plus its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateExpr {
    pub source: String,
    pub tokens: Vec<TemplateToken>,
}

impl TemplateExpr {
    /// Parse a template string.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        TemplateParser::new(source).parse()
    }

    /// Field references in token order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldPath> {
        self.tokens.iter().filter_map(|token| match token {
            TemplateToken::Field { path, .. } => Some(path),
            TemplateToken::Static { .. } => None,
        })
    }

    /// First segment of every field reference, the part checked against the schema.
    pub fn field_roots(&self) -> Vec<&str> {
        self.fields().map(FieldPath::root).collect()
    }

    /// Static literals in token order, markers stripped.
    pub fn static_values(&self) -> Vec<&str> {
        self.tokens
            .iter()
            .filter_map(|token| match token {
                TemplateToken::Static { value, .. } => Some(value.as_str()),
                TemplateToken::Field { .. } => None,
            })
            .collect()
    }

    /// Rebuild the group content from the tokens.
    pub fn group_content(&self) -> String {
        self.tokens
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl FromStr for TemplateExpr {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TemplateExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}{}", DELIMITER, GROUP_OPEN, self.group_content(), GROUP_CLOSE)
    }
}

// ============================================================================
// PARSER
// ============================================================================

/// Single-pass parser over a template string.
pub struct TemplateParser<'a> {
    source: &'a str,
}

impl<'a> TemplateParser<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source }
    }

    pub fn parse(&self) -> Result<TemplateExpr, TemplateError> {
        let delimiter = self.single_marker(DELIMITER, "delimiter")?;
        let open = self.single_marker(GROUP_OPEN, "group open marker")?;
        let close = self.single_marker(GROUP_CLOSE, "group close marker")?;

        if delimiter != 0 {
            return Err(self.error(0, "unexpected text before the '%' delimiter"));
        }
        if open != delimiter + DELIMITER.len_utf8() {
            return Err(self.error(delimiter, "'%' must be immediately followed by '('"));
        }
        if close < open {
            return Err(self.error(close, "')' appears before '('"));
        }
        if close + GROUP_CLOSE.len_utf8() != self.source.len() {
            return Err(self.error(close + 1, "unexpected text after ')'"));
        }

        let content_start = open + GROUP_OPEN.len_utf8();
        let content = &self.source[content_start..close];

        let mut tokens = Vec::new();
        let mut offset = content_start;
        for raw in content.split(TOKEN_SEPARATOR) {
            tokens.push(self.parse_token(raw, offset)?);
            offset += raw.len() + TOKEN_SEPARATOR.len_utf8();
        }

        Ok(TemplateExpr {
            source: self.source.to_string(),
            tokens,
        })
    }

    /// Byte position of the only occurrence of `marker`.
    fn single_marker(&self, marker: char, what: &str) -> Result<usize, TemplateError> {
        let mut positions = self.source.match_indices(marker).map(|(pos, _)| pos);
        match (positions.next(), positions.next()) {
            (Some(pos), None) => Ok(pos),
            (None, _) => Err(self.error(
                self.source.len(),
                &format!("expected exactly one {} '{}', found none", what, marker),
            )),
            (Some(_), Some(second)) => Err(self.error(
                second,
                &format!("expected exactly one {} '{}', found several", what, marker),
            )),
        }
    }

    fn parse_token(&self, raw: &str, start: usize) -> Result<TemplateToken, TemplateError> {
        let span = Span {
            start,
            end: start + raw.len(),
        };

        if let Some(value) = raw.strip_prefix(STATIC_MARKER) {
            return Ok(TemplateToken::Static {
                value: value.to_string(),
                span,
            });
        }

        if raw.is_empty() {
            return Err(self.error(start, "empty token in group"));
        }

        let (path_text, padding) = self.split_padding(raw, start)?;
        let segments = self.parse_path(path_text, start)?;

        Ok(TemplateToken::Field {
            path: FieldPath { segments, padding },
            span,
        })
    }

    /// Separate a trailing `[digits]` spec from the path.
    fn split_padding<'t>(
        &self,
        raw: &'t str,
        start: usize,
    ) -> Result<(&'t str, Option<Padding>), TemplateError> {
        let opens = raw.matches('[').count();
        let closes = raw.matches(']').count();

        if opens == 0 && closes == 0 {
            return Ok((raw, None));
        }
        if opens > 1 || closes > 1 {
            return Err(self.error(start, "more than one padding spec"));
        }
        if opens != closes {
            return Err(self.error(start, "unmatched padding bracket"));
        }

        let open = raw.find('[').unwrap_or_default();
        let close = raw.find(']').unwrap_or_default();
        if close != raw.len() - 1 || close < open {
            return Err(self.error(start + open, "padding spec must close the token"));
        }

        let digits = &raw[open + 1..close];
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(self.error(
                start + open + 1,
                &format!("padding must be a non-negative integer, found '{}'", digits),
            ));
        }
        let width = digits.parse::<usize>().map_err(|_| {
            self.error(start + open + 1, &format!("padding '{}' is out of range", digits))
        })?;

        Ok((
            &raw[..open],
            Some(Padding {
                width,
                digits: digits.to_string(),
            }),
        ))
    }

    fn parse_path(&self, text: &str, start: usize) -> Result<Vec<String>, TemplateError> {
        let mut segments = Vec::new();
        let mut offset = start;
        for segment in text.split(PATH_SEPARATOR) {
            if !is_identifier(segment) {
                return Err(self.error(offset, &format!("invalid field name '{}'", segment)));
            }
            segments.push(segment.to_string());
            offset += segment.len() + PATH_SEPARATOR.len_utf8();
        }
        Ok(segments)
    }

    fn error(&self, position: usize, message: &str) -> TemplateError {
        TemplateError::Syntax {
            template: self.source.to_string(),
            position,
            message: message.to_string(),
        }
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parse a template string.
pub fn parse_template(source: &str) -> Result<TemplateExpr, TemplateError> {
    TemplateExpr::parse(source)
}

// ============================================================================
// TESTS
// ============================================================================


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
