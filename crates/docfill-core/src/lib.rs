//! # docfill-core
//!
//! Deterministic document-to-form extraction logic.
//!
//! This crate turns an untrusted, free-form language model reply into a
//! type-safe field-value mapping, and provides everything around that step:
//! - Field schemas and schema catalogs
//! - The extraction prompt
//! - JSON object isolation in raw replies
//! - Field-value validation and coercion
//! - Token-cost estimation
//! - Editable form state
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same reply and schema always produce the same values
//! 2. **No network**: Model calls live in `docfill-runtime`
//! 3. **Type-safe output**: Select and combo box values are always declared
//!    options, numbers are always finite
//! 4. **Stateless validation**: Each run yields a fresh value map
//!
//! ## Example
//!
//! ```rust,ignore
//! use docfill_core::{process_response, FieldList, FieldValidator};
//!
//! let fields = FieldList::from_file("schemas/invoice.yaml")?;
//! let validation = process_response(raw_reply, &fields, &FieldValidator::default())?;
//!
//! for (name, value) in &validation.values {
//!     println!("{}: {}", name, value);
//! }
//! ```

pub mod cost;
pub mod denylist;
pub mod extract;
pub mod form;
pub mod model;
pub mod prompt;
pub mod schema;
pub mod validator;

// Re-export main types at crate root
pub use cost::{compute_cost, Cost, CostError, Pricing, Usage};
pub use denylist::{Denylist, DEFAULT_UNSPECIFIED_PHRASES};
pub use extract::{extract_json_object, parse_json_object, ExtractionError};
pub use form::{FormError, FormState};
pub use model::{find_model, ModelDescriptor, ModelPricing, DEFAULT_CONTEXT_WINDOW};
pub use prompt::{build_prompt, build_prompt_with, SYSTEM_INSTRUCTION};
pub use schema::{
    ComboOption, Field, FieldList, FieldOptions, FieldType, FieldValue, SchemaCatalog,
    SchemaDocument, SchemaError, SchemaOption,
};
pub use validator::{validate, FieldValidator, Validation, ValueMap};

use tracing::debug;

/// Isolate, parse and validate a raw model reply.
///
/// This is the main entry point of the core: everything between the
/// transport returning text and the form receiving values.
///
/// # Errors
///
/// `ExtractionError::MalformedResponse` when no JSON object can be isolated
/// or parsed. Validation itself never fails; rejected values are omitted.
pub fn process_response(
    raw: &str,
    fields: &FieldList,
    validator: &FieldValidator,
) -> Result<Validation, ExtractionError> {
    let parsed = parse_json_object(raw)?;
    let validation = validator.validate(&parsed, fields);

    debug!(
        keys = parsed.len(),
        accepted = validation.values.len(),
        filled = validation.filled_count,
        "processed model reply"
    );

    Ok(validation)
}
