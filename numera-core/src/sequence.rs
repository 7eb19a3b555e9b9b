//! Sequence definitions, counters and date-range partitions

use crate::{
    BusinessDate, SequenceId, SequenceKind, TenantId, Timestamp, ValidationError,
};
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// NUMBERING
// ============================================================================

/// Numeric settings of a counter, cloned from its template on provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberingConfig {
    /// Next value to hand out (non-partitioned counters)
    pub number_next: i64,
    pub increment: i64,
    /// Minimum width of the rendered number, zero-filled
    pub padding: usize,
    /// Keep an independent value per date range
    pub use_date_range: bool,
}

impl Default for NumberingConfig {
    fn default() -> Self {
        Self {
            number_next: 1,
            increment: 1,
            padding: 0,
            use_date_range: false,
        }
    }
}

/// Render `value` zero-filled to `padding` digits. Never truncates.
pub fn format_number(value: i64, padding: usize) -> String {
    format!("{:0width$}", value, width = padding)
}

/// Date-bounded partition of a counter with its own next value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub date_from: BusinessDate,
    pub date_to: BusinessDate,
    pub number_next: i64,
}

impl DateRange {
    pub fn new(date_from: BusinessDate, date_to: BusinessDate) -> Self {
        Self {
            date_from,
            date_to,
            number_next: 1,
        }
    }

    pub fn contains(&self, date: BusinessDate) -> bool {
        self.date_from <= date && date <= self.date_to
    }

    fn overlaps(&self, other: &DateRange) -> bool {
        self.date_from <= other.date_to && other.date_from <= self.date_to
    }

    /// Partition covering the calendar year of `as_of`, shrunk so it does not
    /// overlap any of `existing`. Only meaningful when no range contains `as_of`.
    pub fn year_partition(as_of: BusinessDate, existing: &[DateRange]) -> DateRange {
        let year = as_of.year();
        let mut date_from = NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(as_of);
        let mut date_to = NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(as_of);

        for range in existing {
            if range.date_to < as_of && range.date_to >= date_from {
                date_from = range.date_to.succ_opt().unwrap_or(as_of);
            }
            if range.date_from > as_of && range.date_from <= date_to {
                date_to = range.date_from.pred_opt().unwrap_or(as_of);
            }
        }

        DateRange::new(date_from, date_to)
    }
}

// ============================================================================
// COUNTER KEY
// ============================================================================

/// Rendered generation key identifying one provisioned counter within a tenant scope.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CounterKey {
    pub prefix: String,
    pub generator_key: Option<String>,
    pub code: Option<String>,
}

impl CounterKey {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            generator_key: None,
            code: None,
        }
    }

    pub fn with_generator_key(mut self, generator_key: Option<String>) -> Self {
        self.generator_key = generator_key;
        self
    }

    pub fn with_code(mut self, code: Option<String>) -> Self {
        self.code = code;
        self
    }
}

impl fmt::Display for CounterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.prefix)?;
        if let Some(key) = &self.generator_key {
            write!(f, "#{}", key)?;
        }
        if let Some(code) = &self.code {
            write!(f, "@{}", code)?;
        }
        Ok(())
    }
}

// ============================================================================
// SEQUENCE DEFINITION
// ============================================================================

/// A template or counter definition.
///
/// Counters hold live numbering state. Templates describe how to compute a
/// generation key from a record and spawn one counter per distinct key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceDefinition {
    pub sequence_id: SequenceId,
    /// Owning tenant, `None` for global definitions
    pub tenant_id: Option<TenantId>,
    pub name: String,
    /// Lookup code shared by definitions of the same document type
    pub code: Option<String>,
    pub kind: SequenceKind,

    // Template settings
    pub related_entity: Option<String>,
    pub prefix_template: Option<String>,
    pub suffix_template: Option<String>,
    pub generator_key_template: Option<String>,
    pub auto_create_counters: bool,
    pub default_fallback: Option<SequenceId>,

    // Counter settings
    /// Template that spawned this counter
    pub parent_id: Option<SequenceId>,
    /// Literal prefix emitted before the number
    pub prefix: Option<String>,
    /// Literal suffix emitted after the number
    pub suffix: Option<String>,
    /// Rendered generator key this counter was provisioned for
    pub generator_key: Option<String>,
    pub numbering: NumberingConfig,
    pub date_ranges: Vec<DateRange>,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl SequenceDefinition {
    fn blank(name: impl Into<String>, kind: SequenceKind) -> Self {
        let now = Utc::now();
        Self {
            sequence_id: SequenceId::now_v7(),
            tenant_id: None,
            name: name.into(),
            code: None,
            kind,
            related_entity: None,
            prefix_template: None,
            suffix_template: None,
            generator_key_template: None,
            auto_create_counters: true,
            default_fallback: None,
            parent_id: None,
            prefix: None,
            suffix: None,
            generator_key: None,
            numbering: NumberingConfig::default(),
            date_ranges: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// A plain counter.
    pub fn counter(name: impl Into<String>) -> Self {
        Self::blank(name, SequenceKind::Counter)
    }

    /// A template reading fields from records of `related_entity`.
    pub fn template(name: impl Into<String>, related_entity: impl Into<String>) -> Self {
        let mut definition = Self::blank(name, SequenceKind::Template);
        definition.related_entity = Some(related_entity.into());
        definition
    }

    pub fn with_tenant(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_prefix_template(mut self, template: impl Into<String>) -> Self {
        self.prefix_template = Some(template.into());
        self
    }

    pub fn with_suffix_template(mut self, template: impl Into<String>) -> Self {
        self.suffix_template = Some(template.into());
        self
    }

    pub fn with_generator_key_template(mut self, template: impl Into<String>) -> Self {
        self.generator_key_template = Some(template.into());
        self
    }

    pub fn with_auto_create_counters(mut self, enabled: bool) -> Self {
        self.auto_create_counters = enabled;
        self
    }

    pub fn with_fallback(mut self, fallback: SequenceId) -> Self {
        self.default_fallback = Some(fallback);
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn with_padding(mut self, padding: usize) -> Self {
        self.numbering.padding = padding;
        self
    }

    pub fn with_increment(mut self, increment: i64) -> Self {
        self.numbering.increment = increment;
        self
    }

    pub fn with_number_next(mut self, number_next: i64) -> Self {
        self.numbering.number_next = number_next;
        self
    }

    /// Enable date-range partitioning with the given ranges.
    pub fn with_date_ranges(mut self, ranges: Vec<DateRange>) -> Self {
        self.numbering.use_date_range = true;
        self.date_ranges = ranges;
        self
    }

    pub fn is_template(&self) -> bool {
        self.kind == SequenceKind::Template
    }

    /// Key under which a provisioned counter is indexed.
    pub fn counter_key(&self) -> Option<CounterKey> {
        if self.kind != SequenceKind::Counter || self.parent_id.is_none() {
            return None;
        }
        Some(CounterKey {
            prefix: self.prefix.clone().unwrap_or_default(),
            generator_key: self.generator_key.clone(),
            code: self.code.clone(),
        })
    }

    /// Build the counter this template provisions for `key`.
    ///
    /// Numeric and partition settings are cloned with every value reset to 1.
    pub fn spawn_counter(&self, key: &CounterKey) -> SequenceDefinition {
        let mut counter = Self::blank(format!("{} {}", self.name, key), SequenceKind::Counter);
        counter.tenant_id = self.tenant_id;
        counter.code = key.code.clone();
        counter.parent_id = Some(self.sequence_id);
        counter.prefix = Some(key.prefix.clone());
        counter.generator_key = key.generator_key.clone();
        counter.numbering = NumberingConfig {
            number_next: 1,
            ..self.numbering.clone()
        };
        counter.date_ranges = self
            .date_ranges
            .iter()
            .map(|range| DateRange::new(range.date_from, range.date_to))
            .collect();
        counter
    }

    /// Structural checks that need no schema access.
    pub fn validate_shape(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "name".to_string(),
            });
        }

        if self.kind == SequenceKind::Template {
            if self.related_entity.is_none() {
                return Err(ValidationError::RequiredFieldMissing {
                    field: "related_entity".to_string(),
                });
            }
            if self.prefix_template.is_none() && self.generator_key_template.is_none() {
                return Err(ValidationError::RequiredFieldMissing {
                    field: "prefix_template".to_string(),
                });
            }
        }

        if self.default_fallback == Some(self.sequence_id) {
            return Err(ValidationError::CircularReference {
                ids: vec![self.sequence_id],
            });
        }

        if self.numbering.increment < 1 {
            return Err(ValidationError::InvalidValue {
                field: "increment".to_string(),
                reason: "increment must be at least 1".to_string(),
            });
        }

        if self.numbering.number_next < 0 {
            return Err(ValidationError::InvalidValue {
                field: "number_next".to_string(),
                reason: "number_next must be non-negative".to_string(),
            });
        }

        for (i, range) in self.date_ranges.iter().enumerate() {
            if range.date_from > range.date_to {
                return Err(ValidationError::InvalidValue {
                    field: "date_ranges".to_string(),
                    reason: format!("range {} ends before it starts", i),
                });
            }
            if self.date_ranges[i + 1..].iter().any(|other| range.overlaps(other)) {
                return Err(ValidationError::ConstraintViolation {
                    constraint: "date_ranges".to_string(),
                    reason: format!(
                        "range {}..{} overlaps another range",
                        range.date_from, range.date_to
                    ),
                });
            }
        }

        Ok(())
    }
}
