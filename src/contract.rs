// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Contract Layer
//!
//! Validates an external contract description before it reaches the
//! execution core. Validation failures are plain error lists: nothing is
//! logged or checkpointed for a contract that does not validate.
//!
//! A contract is a JSON object:
//! ```json
//! {
//!   "contract_id": "c-42",
//!   "contract_type": "sum",
//!   "parameters": {"x": 10, "y": 20},
//!   "safety_level": "ELEVATED",
//!   "authorized": false,
//!   "timestamp": "2025-01-01T00:00:00.000000Z",
//!   "metadata": {}
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt::Display;
use std::str::FromStr;

use crate::chain::now_timestamp;
use crate::engine::{EngineStats, ExecutionContext, ExecutionCore, Outcome};
use crate::error::ContractError;
use crate::types::{Payload, SafetyLevel};

const REQUIRED_FIELDS: [&str; 3] = ["contract_id", "contract_type", "parameters"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractValidation {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

pub struct ContractLayer {
    core: ExecutionCore,
}

impl ContractLayer {
    pub fn new(core: ExecutionCore) -> Self {
        Self { core }
    }

    pub fn core(&self) -> &ExecutionCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut ExecutionCore {
        &mut self.core
    }

    pub fn into_core(self) -> ExecutionCore {
        self.core
    }

    pub fn validate_contract(contract: &Value) -> ContractValidation {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let Some(fields) = contract.as_object() else {
            return ContractValidation {
                valid: false,
                errors: vec!["Contract must be a JSON object".to_string()],
                warnings,
            };
        };

        for field in REQUIRED_FIELDS {
            if !fields.contains_key(field) {
                errors.push(format!("Missing required field: {}", field));
            }
        }

        match fields.get("contract_id") {
            Some(Value::String(id)) if id.trim().is_empty() => {
                errors.push("contract_id must not be empty".to_string());
            }
            Some(Value::String(_)) | None => {}
            Some(_) => errors.push("contract_id must be a string".to_string()),
        }
        if matches!(fields.get("contract_type"), Some(v) if !v.is_string()) {
            errors.push("contract_type must be a string".to_string());
        }
        if matches!(fields.get("parameters"), Some(v) if !v.is_object()) {
            errors.push("parameters must be an object".to_string());
        }
        if matches!(fields.get("timestamp"), Some(v) if !v.is_string()) {
            errors.push("timestamp must be a string".to_string());
        }
        if matches!(fields.get("metadata"), Some(v) if !v.is_object()) {
            errors.push("metadata must be an object".to_string());
        }

        let level = match fields.get("safety_level") {
            None | Some(Value::Null) => {
                warnings.push("No safety_level declared, defaulting to ROUTINE".to_string());
                Some(SafetyLevel::Routine)
            }
            Some(Value::String(raw)) => match SafetyLevel::from_str(raw) {
                Ok(level) => Some(level),
                Err(_) => {
                    errors.push(format!("Invalid safety_level: {}", raw));
                    None
                }
            },
            Some(other) => {
                errors.push(format!("Invalid safety_level: {}", other));
                None
            }
        };

        let authorized = match fields.get("authorized") {
            None => false,
            Some(Value::Bool(flag)) => *flag,
            Some(_) => {
                errors.push("authorized must be a boolean".to_string());
                false
            }
        };

        if let Some(level) = level {
            if level.requires_human_oversight() && !authorized {
                errors.push(format!("Safety level {} requires authorized=true", level));
            }
        }

        ContractValidation {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Validate, build the context and delegate to the core.
    ///
    /// The result is flattened into a plain map carrying the contract id.
    pub fn execute<F, E>(
        &mut self,
        contract: &Value,
        operation: F,
        create_checkpoint: bool,
    ) -> Result<Payload, ContractError>
    where
        F: FnOnce(&Payload) -> Result<Value, E>,
        E: Display,
    {
        let validation = Self::validate_contract(contract);
        for warning in &validation.warnings {
            tracing::warn!("{}", warning);
        }
        if !validation.valid {
            tracing::warn!("Contract rejected: {}", validation.errors.join("; "));
            return Err(ContractError::Validation(validation.errors));
        }

        let context = Self::build_context(contract);
        match self.core.execute(&context, operation, create_checkpoint) {
            Outcome::Completed(result) => {
                let mut flat = result.to_payload();
                flat.insert("contract_id".into(), json!(context.contract_id));
                Ok(flat)
            }
            Outcome::Halted(violation) => Err(ContractError::Halted(violation)),
        }
    }

    // Only called on a contract that passed validation.
    fn build_context(contract: &Value) -> ExecutionContext {
        let str_field = |name: &str| contract.get(name).and_then(Value::as_str);
        let map_field = |name: &str| {
            contract
                .get(name)
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default()
        };

        let level = str_field("safety_level")
            .and_then(|raw| SafetyLevel::from_str(raw).ok())
            .unwrap_or(SafetyLevel::Routine);

        ExecutionContext::new(str_field("contract_id").unwrap_or_default(), map_field("parameters"))
            .with_safety_level(level)
            .with_authorized(contract.get("authorized").and_then(Value::as_bool).unwrap_or(false))
            .with_timestamp(str_field("timestamp").map(str::to_string).unwrap_or_else(now_timestamp))
            .with_metadata(map_field("metadata"))
    }

    pub fn get_stats(&self) -> EngineStats {
        self.core.get_stats()
    }
}
