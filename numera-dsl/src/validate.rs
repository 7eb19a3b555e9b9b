//! Authoring-time template checks

use crate::resolver::authorize;
use crate::template::TemplateExpr;
use numera_core::{EntitySchema, FieldPolicy, TemplateError, TemplateSlot};

/// Check a template's grammar and that every referenced root field exists
/// on `schema`.
pub fn validate_template_syntax(
    template: &str,
    schema: &EntitySchema,
) -> Result<TemplateExpr, TemplateError> {
    let expr = TemplateExpr::parse(template)?;
    for root in expr.field_roots() {
        if !schema.has_field(root) {
            return Err(TemplateError::FieldNotFound {
                field: root.to_string(),
                entity: schema.description.clone(),
            });
        }
    }
    Ok(expr)
}

/// [`validate_template_syntax`] plus the slot's category policy on root
/// fields. Categories behind relation hops are checked at render time.
pub fn validate_slot_template(
    template: &str,
    schema: &EntitySchema,
    slot: TemplateSlot,
    policy: FieldPolicy,
) -> Result<TemplateExpr, TemplateError> {
    let expr = validate_template_syntax(template, schema)?;
    for root in expr.field_roots() {
        authorize(schema, root, policy, slot)?;
    }
    Ok(expr)
}
