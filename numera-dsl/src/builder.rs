//! Code builder
//!
//! Renders a parsed template against a record: static tokens verbatim, field
//! tokens through the [`FieldResolver`], concatenated in order.

use crate::resolver::{FieldResolver, Resolved};
use crate::template::{TemplateExpr, TemplateToken};
use numera_core::{EntitySchema, FieldPolicy, NumeraResult, RecordSnapshot, TemplateSlot};
use std::sync::Arc;

/// How a render treats its template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub slot: TemplateSlot,
    pub policy: FieldPolicy,
    /// Abort on the first absent value instead of substituting "".
    pub strict: bool,
}

impl RenderOptions {
    /// Options for one of a definition's template slots.
    ///
    /// The prefix follows the configured policy; the generator key and the
    /// suffix accept any scalar. Only the suffix renders leniently.
    pub fn for_slot(slot: TemplateSlot, prefix_policy: FieldPolicy) -> Self {
        let policy = match slot {
            TemplateSlot::Prefix => prefix_policy,
            TemplateSlot::Suffix | TemplateSlot::GeneratorKey => FieldPolicy::Scalar,
        };
        Self {
            slot,
            policy,
            strict: slot.is_strict(),
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Result of a render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered(String),
    /// Strict render hit an absent value.
    Missing { field: String },
}

impl RenderOutcome {
    pub fn into_option(self) -> Option<String> {
        match self {
            RenderOutcome::Rendered(value) => Some(value),
            RenderOutcome::Missing { .. } => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, RenderOutcome::Missing { .. })
    }
}

/// Builds code fragments from templates.
#[derive(Clone, Copy)]
pub struct CodeBuilder<'a> {
    resolver: FieldResolver<'a>,
}

impl<'a> CodeBuilder<'a> {
    pub fn new(resolver: FieldResolver<'a>) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &FieldResolver<'a> {
        &self.resolver
    }

    /// Render `template` for `record`.
    ///
    /// Schema and category errors propagate whatever the strictness; only
    /// absent values are affected by `options.strict`.
    pub fn render(
        &self,
        template: &TemplateExpr,
        schema: &Arc<EntitySchema>,
        record: &RecordSnapshot,
        options: RenderOptions,
    ) -> NumeraResult<RenderOutcome> {
        let mut output = String::new();

        for token in &template.tokens {
            match token {
                TemplateToken::Static { value, .. } => output.push_str(value),
                TemplateToken::Field { path, .. } => {
                    match self
                        .resolver
                        .resolve(schema, record, path, options.policy, options.slot)?
                    {
                        Resolved::Value(value) => output.push_str(&value),
                        Resolved::Absent { field } if options.strict => {
                            tracing::debug!(
                                slot = %options.slot,
                                template = %template.source,
                                field = %field,
                                "strict render stopped on absent value"
                            );
                            return Ok(RenderOutcome::Missing { field });
                        }
                        Resolved::Absent { .. } => {}
                    }
                }
            }
        }

        tracing::trace!(slot = %options.slot, rendered = %output, "template rendered");
        Ok(RenderOutcome::Rendered(output))
    }

    /// Parse then render a template string.
    pub fn render_str(
        &self,
        template: &str,
        schema: &Arc<EntitySchema>,
        record: &RecordSnapshot,
        options: RenderOptions,
    ) -> NumeraResult<RenderOutcome> {
        let expr = TemplateExpr::parse(template)?;
        self.render(&expr, schema, record, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use numera_core::{
        FieldCategory, FieldDescriptor, NumeraError, RecordRef, RecordResolver, SchemaProvider,
        TemplateError,
    };

    struct InvoiceOnly(Arc<EntitySchema>);

    impl SchemaProvider for InvoiceOnly {
        fn schema(&self, entity: &str) -> Option<Arc<EntitySchema>> {
            (entity == self.0.name).then(|| Arc::clone(&self.0))
        }
    }

    struct NoRecords;

    impl RecordResolver for NoRecords {
        fn resolve(&self, _reference: &RecordRef) -> NumeraResult<Option<RecordSnapshot>> {
            Ok(None)
        }
    }

    fn invoice() -> Arc<EntitySchema> {
        Arc::new(
            EntitySchema::new("invoice", "Customer Invoice")
                .with_field(FieldDescriptor::new("year", FieldCategory::Integer))
                .with_field(FieldDescriptor::new("journal", FieldCategory::Text))
                .with_field(FieldDescriptor::multi_relation("lines", "line")),
        )
    }

    fn render(template: &str, record: &RecordSnapshot, options: RenderOptions) -> NumeraResult<RenderOutcome> {
        let schemas = InvoiceOnly(invoice());
        let builder = CodeBuilder::new(FieldResolver::new(&schemas, &NoRecords));
        builder.render_str(template, &invoice(), record, options)
    }

    fn prefix() -> RenderOptions {
        RenderOptions::for_slot(TemplateSlot::Prefix, FieldPolicy::Scalar)
    }

    #[test]
    fn test_render_concatenates_tokens_in_order() {
        let record = RecordSnapshot::new().with("year", 2024).with("journal", "SAJ");
        let outcome = render("%(**INV-,journal,**/,year)", &record, prefix()).unwrap();
        assert_eq!(outcome, RenderOutcome::Rendered("INV-SAJ/2024".into()));
    }

    #[test]
    fn test_static_only_template() {
        let outcome = render("%(**CN-)", &RecordSnapshot::new(), prefix()).unwrap();
        assert_eq!(outcome.into_option(), Some("CN-".to_string()));
    }

    #[test]
    fn test_strict_render_reports_missing_field() {
        let record = RecordSnapshot::new().with("journal", "SAJ");
        let outcome = render("%(**INV-,year)", &record, prefix()).unwrap();
        assert!(outcome.is_missing());
        assert_eq!(outcome, RenderOutcome::Missing { field: "year".into() });
    }

    #[test]
    fn test_lenient_render_substitutes_empty() {
        let record = RecordSnapshot::new().with("journal", "SAJ");
        let options = RenderOptions::for_slot(TemplateSlot::Suffix, FieldPolicy::Scalar);
        assert!(!options.strict);
        let outcome = render("%(**INV-,year,**-,journal)", &record, options).unwrap();
        assert_eq!(outcome, RenderOutcome::Rendered("INV--SAJ".into()));
    }

    #[test]
    fn test_lenient_render_still_fails_on_schema_errors() {
        let options = prefix().strict(false);
        let err = render("%(**A,nope)", &RecordSnapshot::new(), options).unwrap_err();
        assert!(matches!(err, NumeraError::Template(TemplateError::FieldNotFound { .. })));

        let err = render("%(lines)", &RecordSnapshot::new(), options).unwrap_err();
        assert!(matches!(err, NumeraError::Template(TemplateError::TypeNotAuthorized { .. })));
    }

    #[test]
    fn test_render_str_surfaces_syntax_errors() {
        let err = render("(year)", &RecordSnapshot::new(), prefix()).unwrap_err();
        assert!(matches!(err, NumeraError::Template(TemplateError::Syntax { .. })));
    }

    #[test]
    fn test_slot_options() {
        let p = RenderOptions::for_slot(TemplateSlot::Prefix, FieldPolicy::TextOrRelation);
        assert_eq!(p.policy, FieldPolicy::TextOrRelation);
        assert!(p.strict);

        let g = RenderOptions::for_slot(TemplateSlot::GeneratorKey, FieldPolicy::TextOrRelation);
        assert_eq!(g.policy, FieldPolicy::Scalar);
        assert!(g.strict);

        let s = RenderOptions::for_slot(TemplateSlot::Suffix, FieldPolicy::TextOrRelation);
        assert_eq!(s.policy, FieldPolicy::Scalar);
        assert!(!s.strict);
    }
}
