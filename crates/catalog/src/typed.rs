// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{fmt, sync::Arc};

use moose_core::{Column, Metadata, Schema};
use serde_json::Value;

use crate::error::{CatalogError, ResourceKind};

/// User-supplied record check, run after the schema check. Returns the rejection reason.
pub type Validator = Arc<dyn Fn(&Value) -> std::result::Result<(), String> + Send + Sync>;

pub fn validator<F>(f: F) -> Validator
where
	F: Fn(&Value) -> std::result::Result<(), String> + Send + Sync + 'static,
{
	Arc::new(f)
}

/// The part every schema-carrying resource shares.
#[derive(Clone)]
pub struct TypedResource {
	pub kind: ResourceKind,
	pub name: String,
	pub schema: Schema,
	pub allow_extra_fields: bool,
	pub validators: Vec<Validator>,
	pub metadata: Metadata,
}

impl fmt::Debug for TypedResource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TypedResource")
			.field("kind", &self.kind)
			.field("name", &self.name)
			.field("columns", &self.schema.columns.len())
			.field("allow_extra_fields", &self.allow_extra_fields)
			.field("validators", &self.validators.len())
			.finish()
	}
}

impl TypedResource {
	/// Fails when the schema was not supplied or repeats a column name.
	pub fn new(kind: ResourceKind, name: &str, schema: Option<Schema>, metadata: Metadata) -> crate::Result<Self> {
		let Some(schema) = schema else {
			return Err(CatalogError::SchemaMissing {
				kind,
				name: name.to_string(),
			}
			.into());
		};
		if let Some(column) = schema.duplicate_column() {
			return Err(CatalogError::DuplicateColumn {
				kind,
				name: name.to_string(),
				column: column.to_string(),
			}
			.into());
		}
		Ok(Self {
			kind,
			name: name.to_string(),
			schema,
			allow_extra_fields: false,
			validators: vec![],
			metadata,
		})
	}

	pub fn allow_extra_fields(mut self, allow: bool) -> Self {
		self.allow_extra_fields = allow;
		self
	}

	pub fn with_validators(mut self, validators: Vec<Validator>) -> Self {
		self.validators = validators;
		self
	}

	pub fn columns(&self) -> &[Column] {
		&self.schema.columns
	}

	pub fn json_schema(&self) -> &Value {
		&self.schema.json_schema
	}

	/// Checks a record against the columns, then against each validator in order.
	pub fn validate(&self, record: &Value) -> crate::Result<()> {
		let Value::Object(fields) = record else {
			return Err(self.reject("record must be a JSON object"));
		};

		for column in self.columns() {
			if !column.accepts(fields.get(&column.name)) {
				return Err(self.reject(format!("field '{}' is missing or has the wrong type", column.name)));
			}
		}

		if !self.allow_extra_fields {
			if let Some(extra) = fields.keys().find(|key| !self.schema.has_column(key)) {
				return Err(self.reject(format!("unexpected field '{}'", extra)));
			}
		}

		for validator in &self.validators {
			validator(record).map_err(|reason| self.reject(reason))?;
		}
		Ok(())
	}

	fn reject(&self, reason: impl Into<String>) -> moose_type::Error {
		CatalogError::InvalidRecord {
			kind: self.kind,
			name: self.name.clone(),
			reason: reason.into(),
		}
		.into()
	}
}

#[cfg(test)]
mod tests {
	use moose_core::DataType;
	use serde_json::json;

	use super::*;

	fn create_test_resource() -> TypedResource {
		let schema = Schema::new(vec![
			Column::new("id", DataType::String).primary_key(),
			Column::new("amount", DataType::Float64),
			Column::new("note", DataType::String).optional(),
		]);
		TypedResource::new(ResourceKind::IngestApi, "orders", Some(schema), Metadata::default()).unwrap()
	}

	#[test]
	fn test_missing_schema() {
		let err = TypedResource::new(ResourceKind::Table, "orders", None, Metadata::default()).unwrap_err();
		assert_eq!(err.code(), "CATALOG_011");
	}

	#[test]
	fn test_duplicate_column() {
		let schema = Schema::new(vec![Column::new("id", DataType::String), Column::new("id", DataType::Int32)]);
		let err = TypedResource::new(ResourceKind::Table, "orders", Some(schema), Metadata::default()).unwrap_err();
		assert_eq!(err.code(), "CATALOG_012");
		assert!(err.message.contains("'id'"));
	}

	#[test]
	fn test_validate_checks_columns_and_extra_fields() {
		let mut resource = create_test_resource();
		assert!(resource.validate(&json!({"id": "a", "amount": 1.5})).is_ok());
		assert!(resource.validate(&json!({"id": "a"})).is_err());
		assert!(resource.validate(&json!({"id": "a", "amount": "x"})).is_err());
		assert!(resource.validate(&json!([1, 2])).is_err());

		let extra = json!({"id": "a", "amount": 1, "channel": "web"});
		assert!(resource.validate(&extra).is_err());
		resource.allow_extra_fields = true;
		assert!(resource.validate(&extra).is_ok());
	}

	#[test]
	fn test_validators_run_in_order() {
		let mut resource = create_test_resource();
		resource.validators.push(validator(|record| {
			if record["amount"].as_f64().unwrap_or(0.0) < 0.0 {
				Err("amount must not be negative".to_string())
			} else {
				Ok(())
			}
		}));
		resource.validators.push(validator(|_| Err("second".to_string())));

		let err = resource.validate(&json!({"id": "a", "amount": -1})).unwrap_err();
		assert!(err.message.contains("amount must not be negative"));
		let err = resource.validate(&json!({"id": "a", "amount": 1})).unwrap_err();
		assert!(err.message.contains("second"));
	}
}
