//! Numera DSL - Code Templates
//!
//! Templates look like `%(**INV-,partner.country.code,**/,year)`: one `%(...)`
//! group holding comma-separated tokens. `**text` is emitted verbatim; any
//! other token is a dotted field path, optionally suffixed with `[n]` to
//! zero-pad integer values to `n` digits.
//!
//! Parsing is pure. Rendering walks record snapshots through the
//! [`numera_core::SchemaProvider`] and [`numera_core::RecordResolver`]
//! collaborators.

pub mod builder;
pub mod resolver;
pub mod template;
pub mod validate;

pub use builder::{CodeBuilder, RenderOptions, RenderOutcome};
pub use resolver::{FieldResolver, Resolved};
pub use template::{
    parse_template, FieldPath, Padding, Span, TemplateExpr, TemplateParser, TemplateToken, DELIMITER,
    GROUP_CLOSE, GROUP_OPEN, PATH_SEPARATOR, STATIC_MARKER, TOKEN_SEPARATOR,
};
pub use validate::{validate_slot_template, validate_template_syntax};
