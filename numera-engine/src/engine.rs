//! Template resolution engine
//!
//! One request runs through these states:
//!
//! 1. A counter definition draws its next number directly.
//! 2. A template renders its prefix strictly; an absent value diverts to the
//!    fallback definition, or fails with `IncompleteGenerationInput`.
//! 3. With `auto_create_counters` off, the prefix is the code.
//! 4. The generator key renders strictly, same fallback rule.
//! 5. The suffix renders leniently.
//! 6. Prefix, generator key and external code select (or provision) a
//!    counter, which yields the number.
//! 7. The parts are composed per [`CompositionConfig`](numera_core::CompositionConfig).

use crate::request::{CodeRequest, GenerationRequest};
use numera_core::{
    today, BusinessDate, ConfigError, CounterKey, EntitySchema, GenerationError, NumeraConfig,
    NumeraError, NumeraResult, RecordResolver, RecordSnapshot, SchemaProvider,
    SequenceDefinition, SequenceId, TemplateSlot, ValidationError,
};
use numera_dsl::{
    validate_slot_template, CodeBuilder, FieldResolver, RenderOptions, RenderOutcome,
    TemplateExpr,
};
use numera_storage::CounterStore;
use std::sync::Arc;

/// Result of one attempt on a single definition.
#[derive(Debug)]
enum Attempt {
    Issued(String),
    /// A strict slot hit an absent value.
    Missing { slot: TemplateSlot, field: String },
}

/// Entry point for code generation and definition authoring.
pub struct NumeraEngine {
    store: Arc<dyn CounterStore>,
    schemas: Arc<dyn SchemaProvider>,
    records: Arc<dyn RecordResolver>,
    config: NumeraConfig,
}

impl NumeraEngine {
    /// Engine with the default configuration.
    pub fn new(
        store: Arc<dyn CounterStore>,
        schemas: Arc<dyn SchemaProvider>,
        records: Arc<dyn RecordResolver>,
    ) -> Self {
        Self {
            store,
            schemas,
            records,
            config: NumeraConfig::default(),
        }
    }

    /// Replace the configuration after validating it.
    pub fn with_config(mut self, config: NumeraConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn config(&self) -> &NumeraConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn CounterStore> {
        &self.store
    }

    fn builder(&self) -> CodeBuilder<'_> {
        CodeBuilder::new(FieldResolver::new(
            self.schemas.as_ref(),
            self.records.as_ref(),
        ))
    }

    fn schema_for(&self, definition: &SequenceDefinition) -> NumeraResult<Arc<EntitySchema>> {
        let entity = definition.related_entity.as_deref().ok_or_else(|| {
            ValidationError::RequiredFieldMissing {
                field: "related_entity".to_string(),
            }
        })?;
        self.builder().resolver().schema_for(entity)
    }

    /// Load a definition or fail with `DefinitionNotFound`.
    pub fn definition(&self, id: SequenceId) -> NumeraResult<SequenceDefinition> {
        self.store
            .definition_get(id)?
            .ok_or_else(|| GenerationError::DefinitionNotFound { id }.into())
    }

    // ========================================================================
    // GENERATION
    // ========================================================================

    /// Produce the next code for a definition.
    pub fn generate_next(&self, request: &GenerationRequest) -> NumeraResult<String> {
        let span = tracing::info_span!(
            "generate_next",
            definition = %request.definition_id,
            external_code = ?request.external_code,
        );
        let _enter = span.enter();

        let definition = self.definition(request.definition_id)?;
        let as_of = request.as_of.unwrap_or_else(today);
        self.generate_with_fallback(
            definition,
            request.external_code.as_deref(),
            &request.record,
            as_of,
        )
    }

    /// Produce the next code for the definition registered under a code.
    ///
    /// Candidates visible to the tenant are tried in order: tenant-owned
    /// before global, templates before counters. The code itself becomes the
    /// external code of the counter key.
    pub fn generate_next_by_code(&self, request: &CodeRequest) -> NumeraResult<String> {
        let span = tracing::info_span!(
            "generate_next_by_code",
            code = %request.code,
            tenant = ?request.tenant_id,
        );
        let _enter = span.enter();

        let mut candidates: Vec<_> = self
            .store
            .definition_find_by_code(&request.code)?
            .into_iter()
            .filter(|d| d.parent_id.is_none())
            .filter(|d| d.tenant_id.is_none() || d.tenant_id == request.tenant_id)
            .collect();
        candidates.sort_by_key(|d| (d.tenant_id.is_none(), !d.is_template(), d.sequence_id));

        let definition = candidates
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::CodeNotFound {
                code: request.code.clone(),
            })?;

        tracing::debug!(
            definition = %definition.sequence_id,
            kind = %definition.kind,
            "definition selected by code"
        );

        let as_of = request.as_of.unwrap_or_else(today);
        self.generate_with_fallback(definition, Some(&request.code), &request.record, as_of)
    }

    fn generate_with_fallback(
        &self,
        definition: SequenceDefinition,
        external_code: Option<&str>,
        record: &RecordSnapshot,
        as_of: BusinessDate,
    ) -> NumeraResult<String> {
        let mut chain: Vec<SequenceId> = Vec::new();
        let mut current = definition;

        loop {
            if chain.contains(&current.sequence_id) {
                chain.push(current.sequence_id);
                return Err(GenerationError::FallbackCycle { chain }.into());
            }
            chain.push(current.sequence_id);

            let (slot, field) = match self.attempt(&current, external_code, record, as_of)? {
                Attempt::Issued(code) => {
                    tracing::debug!(
                        definition = %current.sequence_id,
                        code = %code,
                        "code issued"
                    );
                    return Ok(code);
                }
                Attempt::Missing { slot, field } => (slot, field),
            };

            let fallback = match current.default_fallback {
                Some(fallback) if chain.len() <= self.config.max_fallback_depth as usize => {
                    fallback
                }
                Some(_) => {
                    tracing::warn!(
                        definition = %current.sequence_id,
                        depth = chain.len(),
                        "fallback depth exhausted"
                    );
                    return Err(self.incomplete(&current, slot));
                }
                None => return Err(self.incomplete(&current, slot)),
            };

            tracing::warn!(
                definition = %current.sequence_id,
                fallback = %fallback,
                slot = %slot,
                field = %field,
                "required value absent, using fallback definition"
            );
            current = self.definition(fallback)?;
        }
    }

    fn incomplete(&self, definition: &SequenceDefinition, slot: TemplateSlot) -> NumeraError {
        GenerationError::IncompleteGenerationInput {
            definition: definition.name.clone(),
            slot,
        }
        .into()
    }

    fn attempt(
        &self,
        definition: &SequenceDefinition,
        external_code: Option<&str>,
        record: &RecordSnapshot,
        as_of: BusinessDate,
    ) -> NumeraResult<Attempt> {
        let composition = &self.config.composition;

        if !definition.is_template() {
            let number = self.store.next(definition, as_of)?;
            return Ok(Attempt::Issued(composition.compose(
                definition.prefix.as_deref().unwrap_or_default(),
                &number,
                definition.suffix.as_deref().unwrap_or_default(),
            )));
        }

        let schema = self.schema_for(definition)?;

        let prefix = match self.render_slot(definition, &schema, record, TemplateSlot::Prefix)? {
            RenderOutcome::Rendered(prefix) => prefix,
            RenderOutcome::Missing { field } => {
                return Ok(Attempt::Missing {
                    slot: TemplateSlot::Prefix,
                    field,
                })
            }
        };

        if !definition.auto_create_counters {
            return Ok(Attempt::Issued(prefix));
        }

        let generator_key = match definition.generator_key_template {
            Some(_) => {
                match self.render_slot(definition, &schema, record, TemplateSlot::GeneratorKey)? {
                    RenderOutcome::Rendered(key) => Some(key),
                    RenderOutcome::Missing { field } => {
                        return Ok(Attempt::Missing {
                            slot: TemplateSlot::GeneratorKey,
                            field,
                        })
                    }
                }
            }
            None => None,
        };

        // Rendered before the draw so a failing suffix never consumes a number.
        let suffix = self
            .render_slot(definition, &schema, record, TemplateSlot::Suffix)?
            .into_option()
            .unwrap_or_default();

        let key = CounterKey::new(prefix.clone())
            .with_generator_key(generator_key)
            .with_code(external_code.map(str::to_string));
        let counter =
            self.store
                .find_or_provision(definition, &key, self.config.provisioning_retry_limit)?;
        let number = self.store.next(&counter, as_of)?;

        Ok(Attempt::Issued(composition.compose(&prefix, &number, &suffix)))
    }

    /// Render one of the definition's templates. An unset template renders empty.
    fn render_slot(
        &self,
        definition: &SequenceDefinition,
        schema: &Arc<EntitySchema>,
        record: &RecordSnapshot,
        slot: TemplateSlot,
    ) -> NumeraResult<RenderOutcome> {
        let template = match slot {
            TemplateSlot::Prefix => &definition.prefix_template,
            TemplateSlot::Suffix => &definition.suffix_template,
            TemplateSlot::GeneratorKey => &definition.generator_key_template,
        };
        let Some(template) = template else {
            return Ok(RenderOutcome::Rendered(String::new()));
        };

        let options = RenderOptions::for_slot(slot, self.config.prefix_field_policy);
        let outcome = self.builder().render_str(template, schema, record, options)?;
        tracing::debug!(
            definition = %definition.sequence_id,
            slot = %slot,
            outcome = ?outcome,
            "template slot rendered"
        );
        Ok(outcome)
    }

    // ========================================================================
    // AUTHORING
    // ========================================================================

    /// Check a template against the schema of `entity`.
    pub fn validate_template_syntax(
        &self,
        template: &str,
        entity: &str,
    ) -> NumeraResult<TemplateExpr> {
        let schema = self.builder().resolver().schema_for(entity)?;
        Ok(numera_dsl::validate_template_syntax(template, &schema)?)
    }

    /// Validate and store a definition.
    ///
    /// Templates must reference existing fields allowed for their slot. A
    /// fallback must already exist and must not lead back to the definition.
    pub fn register_definition(&self, definition: SequenceDefinition) -> NumeraResult<SequenceId> {
        definition.validate_shape()?;

        if definition.is_template() {
            let schema = self.schema_for(&definition)?;
            let slots = [
                (TemplateSlot::Prefix, &definition.prefix_template),
                (TemplateSlot::Suffix, &definition.suffix_template),
                (TemplateSlot::GeneratorKey, &definition.generator_key_template),
            ];
            for (slot, template) in slots {
                if let Some(template) = template {
                    let options = RenderOptions::for_slot(slot, self.config.prefix_field_policy);
                    validate_slot_template(template, &schema, slot, options.policy)?;
                }
            }
        }

        if let Some(fallback) = definition.default_fallback {
            self.check_fallback_chain(definition.sequence_id, fallback)?;
        }

        self.store.definition_insert(&definition)?;
        tracing::info!(
            definition = %definition.sequence_id,
            name = %definition.name,
            kind = %definition.kind,
            "sequence definition registered"
        );
        Ok(definition.sequence_id)
    }

    fn check_fallback_chain(&self, origin: SequenceId, fallback: SequenceId) -> NumeraResult<()> {
        let mut chain = vec![origin];
        let mut next = Some(fallback);

        while let Some(id) = next {
            if chain.contains(&id) {
                chain.push(id);
                return Err(ValidationError::CircularReference { ids: chain }.into());
            }
            if chain.len() > self.config.max_fallback_depth as usize {
                return Err(ValidationError::ConstraintViolation {
                    constraint: "default_fallback".to_string(),
                    reason: format!(
                        "fallback chain longer than {} definitions",
                        self.config.max_fallback_depth
                    ),
                }
                .into());
            }
            chain.push(id);
            next = self.definition(id)?.default_fallback;
        }

        Ok(())
    }

    // ========================================================================
    // CHILD COUNTERS
    // ========================================================================

    /// Counters provisioned from a template.
    pub fn children_of(&self, template_id: SequenceId) -> NumeraResult<Vec<SequenceDefinition>> {
        self.store.definition_list_children(template_id)
    }

    pub fn child_count(&self, template_id: SequenceId) -> NumeraResult<usize> {
        Ok(self.children_of(template_id)?.len())
    }
}

impl std::fmt::Debug for NumeraEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NumeraEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
