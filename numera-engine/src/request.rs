//! Generation request payloads

use numera_core::{BusinessDate, RecordSnapshot, SequenceId, TenantId};
use serde::{Deserialize, Serialize};

/// Input of [`crate::NumeraEngine::generate_next`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub definition_id: SequenceId,
    /// Caller-supplied code folded into the counter key
    pub external_code: Option<String>,
    #[serde(default)]
    pub record: RecordSnapshot,
    /// Business date selecting the date-range partition; today when unset
    pub as_of: Option<BusinessDate>,
}

impl GenerationRequest {
    pub fn new(definition_id: SequenceId) -> Self {
        Self {
            definition_id,
            external_code: None,
            record: RecordSnapshot::new(),
            as_of: None,
        }
    }

    pub fn with_external_code(mut self, code: impl Into<String>) -> Self {
        self.external_code = Some(code.into());
        self
    }

    pub fn with_record(mut self, record: RecordSnapshot) -> Self {
        self.record = record;
        self
    }

    pub fn as_of(mut self, date: BusinessDate) -> Self {
        self.as_of = Some(date);
        self
    }
}

/// Input of [`crate::NumeraEngine::generate_next_by_code`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeRequest {
    pub code: String,
    /// Tenant the caller acts for; global definitions are always visible
    pub tenant_id: Option<TenantId>,
    #[serde(default)]
    pub record: RecordSnapshot,
    pub as_of: Option<BusinessDate>,
}

impl CodeRequest {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            tenant_id: None,
            record: RecordSnapshot::new(),
            as_of: None,
        }
    }

    pub fn for_tenant(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    pub fn with_record(mut self, record: RecordSnapshot) -> Self {
        self.record = record;
        self
    }

    pub fn as_of(mut self, date: BusinessDate) -> Self {
        self.as_of = Some(date);
        self
    }
}
