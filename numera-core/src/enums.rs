//! Enum types for numera entities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// SEQUENCE KIND
// ============================================================================

/// Discriminates concrete counters from counter-generating templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceKind {
    /// A directly usable numbering bucket
    Counter,
    /// A generator of counters, keyed by rendered record fields
    Template,
}

impl SequenceKind {
    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            SequenceKind::Counter => "counter",
            SequenceKind::Template => "template",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, EnumParseError> {
        match s.to_lowercase().as_str() {
            "counter" | "sequence" => Ok(SequenceKind::Counter),
            "template" | "sequence_template" => Ok(SequenceKind::Template),
            _ => Err(EnumParseError::new("sequence kind", s)),
        }
    }
}

impl fmt::Display for SequenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for SequenceKind {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

// ============================================================================
// FIELD CATEGORY
// ============================================================================

/// Category of a field declared on an entity schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCategory {
    Text,
    Integer,
    Decimal,
    Boolean,
    Date,
    /// Reference to exactly one other record
    Relation,
    /// Reference to any number of other records
    MultiRelation,
}

impl FieldCategory {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            FieldCategory::Text => "text",
            FieldCategory::Integer => "integer",
            FieldCategory::Decimal => "decimal",
            FieldCategory::Boolean => "boolean",
            FieldCategory::Date => "date",
            FieldCategory::Relation => "relation",
            FieldCategory::MultiRelation => "multi_relation",
        }
    }

    pub fn from_db_str(s: &str) -> Result<Self, EnumParseError> {
        match s.to_lowercase().as_str() {
            "text" | "char" => Ok(FieldCategory::Text),
            "integer" | "int" => Ok(FieldCategory::Integer),
            "decimal" | "float" => Ok(FieldCategory::Decimal),
            "boolean" | "bool" => Ok(FieldCategory::Boolean),
            "date" => Ok(FieldCategory::Date),
            "relation" | "many2one" => Ok(FieldCategory::Relation),
            "multi_relation" | "one2many" | "many2many" => Ok(FieldCategory::MultiRelation),
            _ => Err(EnumParseError::new("field category", s)),
        }
    }

    /// True for single-valued relations, the only category that can be hopped through.
    pub fn is_relation(&self) -> bool {
        matches!(self, FieldCategory::Relation)
    }

    /// True for plain values that render through a canonical string conversion.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            FieldCategory::Text
                | FieldCategory::Integer
                | FieldCategory::Decimal
                | FieldCategory::Boolean
                | FieldCategory::Date
        )
    }
}

impl fmt::Display for FieldCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for FieldCategory {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

// ============================================================================
// FIELD POLICY
// ============================================================================

/// Which field categories a template position may reference.
///
/// Multi-valued relations are rejected under every policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FieldPolicy {
    /// Text and single-valued relations only
    TextOrRelation,
    /// Any scalar plus single-valued relations
    #[default]
    Scalar,
}

impl FieldPolicy {
    /// Whether a field of `category` may be referenced under this policy.
    pub fn allows(&self, category: FieldCategory) -> bool {
        match self {
            FieldPolicy::TextOrRelation => {
                matches!(category, FieldCategory::Text | FieldCategory::Relation)
            }
            FieldPolicy::Scalar => category.is_scalar() || category.is_relation(),
        }
    }
}

// ============================================================================
// TEMPLATE SLOT
// ============================================================================

/// The three template strings a sequence template carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateSlot {
    Prefix,
    Suffix,
    GeneratorKey,
}

impl TemplateSlot {
    /// Whether an absent value aborts rendering for this slot.
    ///
    /// The suffix is advisory and never blocks issuance.
    pub fn is_strict(&self) -> bool {
        !matches!(self, TemplateSlot::Suffix)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateSlot::Prefix => "prefix",
            TemplateSlot::Suffix => "suffix",
            TemplateSlot::GeneratorKey => "generator_key",
        }
    }
}

impl fmt::Display for TemplateSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// PARSE ERROR
// ============================================================================

/// Error when parsing an invalid enum string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumParseError {
    pub kind: &'static str,
    pub value: String,
}

impl EnumParseError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for EnumParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid {}: {}", self.kind, self.value)
    }
}

impl std::error::Error for EnumParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_kind_accepts_legacy_names() {
        assert_eq!(
            SequenceKind::from_db_str("sequence_template").unwrap(),
            SequenceKind::Template
        );
        assert_eq!(SequenceKind::from_db_str("Sequence").unwrap(), SequenceKind::Counter);
        assert!(SequenceKind::from_db_str("bogus").is_err());
    }

    #[test]
    fn test_field_category_round_trip() {
        for category in [
            FieldCategory::Text,
            FieldCategory::Integer,
            FieldCategory::Decimal,
            FieldCategory::Boolean,
            FieldCategory::Date,
            FieldCategory::Relation,
            FieldCategory::MultiRelation,
        ] {
            assert_eq!(category.as_db_str().parse::<FieldCategory>().unwrap(), category);
        }
    }

    #[test]
    fn test_policy_never_allows_multi_relation() {
        assert!(!FieldPolicy::Scalar.allows(FieldCategory::MultiRelation));
        assert!(!FieldPolicy::TextOrRelation.allows(FieldCategory::MultiRelation));
    }

    #[test]
    fn test_text_or_relation_policy_rejects_numbers() {
        assert!(FieldPolicy::TextOrRelation.allows(FieldCategory::Text));
        assert!(FieldPolicy::TextOrRelation.allows(FieldCategory::Relation));
        assert!(!FieldPolicy::TextOrRelation.allows(FieldCategory::Integer));
        assert!(FieldPolicy::Scalar.allows(FieldCategory::Integer));
    }

    #[test]
    fn test_only_suffix_is_lenient() {
        assert!(TemplateSlot::Prefix.is_strict());
        assert!(TemplateSlot::GeneratorKey.is_strict());
        assert!(!TemplateSlot::Suffix.is_strict());
    }
}
