// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use moose_core::{DuplicatePolicy, Metadata, Model, ResourceId, Schema};
use serde_json::Value;
use tracing::instrument;

use crate::{
	Result,
	catalog::{Catalog, StreamRef, register, require_name},
	error::{CatalogError, ResourceKind},
	typed::{TypedResource, Validator},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IngestApiRef {
	pub name: String,
	pub version: Option<String>,
}

impl IngestApiRef {
	pub fn id(&self) -> ResourceId {
		ResourceId::new(self.name.clone(), self.version.clone())
	}

	pub fn key(&self) -> String {
		self.id().key()
	}
}

#[derive(Clone, Default)]
pub struct IngestApiToCreate {
	pub name: String,
	pub version: Option<String>,
	pub schema: Option<Schema>,
	/// Stream accepted records are written to. Required.
	pub destination: Option<StreamRef>,
	/// Stream receiving records that fail validation.
	pub dead_letter_queue: Option<StreamRef>,
	pub path: Option<String>,
	pub allow_extra_fields: bool,
	pub validators: Vec<Validator>,
	pub metadata: Metadata,
}

impl IngestApiToCreate {
	pub fn new(name: impl Into<String>, schema: Schema, destination: &StreamRef) -> Self {
		Self {
			name: name.into(),
			schema: Some(schema),
			destination: Some(destination.clone()),
			..Default::default()
		}
	}

	pub fn of<M: Model>(name: impl Into<String>, destination: &StreamRef) -> Self {
		Self::new(name, M::schema(), destination)
	}
}

#[derive(Debug, Clone)]
pub struct IngestApi {
	pub typed: TypedResource,
	pub id: IngestApiRef,
	pub destination: StreamRef,
	pub dead_letter_queue: Option<StreamRef>,
	pub path: Option<String>,
	pub pipeline: Option<String>,
}

impl IngestApi {
	pub fn name(&self) -> &str {
		&self.id.name
	}

	pub fn version(&self) -> Option<&str> {
		self.id.version.as_deref()
	}

	/// Runs the record through the payload schema and the declared validators.
	pub fn validate(&self, record: &Value) -> Result<()> {
		self.typed.validate(record)
	}
}

impl Catalog {
	#[instrument(name = "catalog::ingest_api::create", level = "debug", skip(self, to_create), fields(name = %to_create.name))]
	pub fn create_ingest_api(&mut self, to_create: IngestApiToCreate) -> Result<IngestApiRef> {
		self.create_ingest_api_in(to_create, None)
	}

	pub(crate) fn create_ingest_api_in(
		&mut self,
		to_create: IngestApiToCreate,
		pipeline: Option<&str>,
	) -> Result<IngestApiRef> {
		require_name(ResourceKind::IngestApi, &to_create.name)?;

		let Some(destination) = to_create.destination else {
			return Err(CatalogError::MissingField {
				kind: ResourceKind::IngestApi,
				name: to_create.name,
				field: "destination",
			}
			.into());
		};
		for stream in std::iter::once(&destination).chain(to_create.dead_letter_queue.as_ref()) {
			if !self.streams.contains_key(&stream.key()) {
				return Err(CatalogError::NotFound {
					kind: ResourceKind::Stream,
					name: stream.name.clone(),
					version: stream.version.clone(),
				}
				.into());
			}
		}

		let api_ref = IngestApiRef {
			name: to_create.name,
			version: to_create.version,
		};
		let id = api_ref.id();
		let key = id.key();

		if let Some(path) = &to_create.path {
			let claimed = path.trim_matches('/');
			let existing = self.ingest_apis.iter().find(|(existing_key, api)| {
				(self.config.duplicates == DuplicatePolicy::Reject || **existing_key != key)
					&& api.path.as_deref().map(|p| p.trim_matches('/')) == Some(claimed)
			});
			if let Some((_, existing)) = existing {
				return Err(CatalogError::PathConflict {
					kind: ResourceKind::IngestApi,
					name: api_ref.name,
					path: path.clone(),
					existing: existing.name().to_string(),
				}
				.into());
			}
		}

		let metadata = self.resolve_metadata(to_create.metadata);
		let typed = TypedResource::new(ResourceKind::IngestApi, &api_ref.name, to_create.schema, metadata)?
			.allow_extra_fields(to_create.allow_extra_fields)
			.with_validators(to_create.validators);

		let api = IngestApi {
			typed,
			id: api_ref.clone(),
			destination,
			dead_letter_queue: to_create.dead_letter_queue,
			path: to_create.path,
			pipeline: pipeline.map(str::to_string),
		};

		let duplicates = self.config.duplicates;
		register(&mut self.ingest_apis, duplicates, ResourceKind::IngestApi, &id, key, api)?;
		self.touch();
		Ok(api_ref)
	}

	pub fn find_ingest_api(&self, key: &str) -> Option<&IngestApi> {
		self.ingest_apis.get(key)
	}

	pub fn list_ingest_apis(&self) -> impl Iterator<Item = &IngestApi> {
		self.ingest_apis.values()
	}

	pub fn ingest_api_count(&self) -> usize {
		self.ingest_apis.len()
	}
}

#[cfg(test)]
mod tests {
	use moose_core::{CatalogConfig, Column, DataType};
	use serde_json::json;

	use super::*;
	use crate::{catalog::StreamToCreate, typed::validator};

	fn create_test_schema() -> Schema {
		Schema::new(vec![Column::new("id", DataType::String).primary_key(), Column::new("amount", DataType::Float64)])
	}

	fn create_test_catalog() -> (Catalog, StreamRef) {
		let mut catalog = Catalog::new(CatalogConfig::builder().capture_source_location(false).build());
		let stream = catalog.create_stream(StreamToCreate::new("orders", create_test_schema())).unwrap();
		(catalog, stream)
	}

	#[test]
	fn test_destination_required() {
		let (mut catalog, _) = create_test_catalog();
		let err = catalog
			.create_ingest_api(IngestApiToCreate {
				name: "orders".to_string(),
				schema: Some(create_test_schema()),
				..Default::default()
			})
			.unwrap_err();
		assert_eq!(err.code(), "CATALOG_005");
	}

	#[test]
	fn test_dead_letter_queue_must_exist() {
		let (mut catalog, stream) = create_test_catalog();
		let err = catalog
			.create_ingest_api(IngestApiToCreate {
				dead_letter_queue: Some(StreamRef {
					name: "ordersDeadLetterQueue".to_string(),
					version: None,
				}),
				..IngestApiToCreate::new("orders", create_test_schema(), &stream)
			})
			.unwrap_err();
		assert_eq!(err.code(), "CATALOG_014");
	}

	#[test]
	fn test_duplicate_path_rejected() {
		let (mut catalog, stream) = create_test_catalog();
		catalog
			.create_ingest_api(IngestApiToCreate {
				path: Some("orders/v1".to_string()),
				..IngestApiToCreate::new("orders", create_test_schema(), &stream)
			})
			.unwrap();
		let err = catalog
			.create_ingest_api(IngestApiToCreate {
				path: Some("/orders/v1/".to_string()),
				..IngestApiToCreate::new("orders_legacy", create_test_schema(), &stream)
			})
			.unwrap_err();
		assert_eq!(err.code(), "CATALOG_002");
	}

	#[test]
	fn test_validation_runs_validators() {
		let (mut catalog, stream) = create_test_catalog();
		let positive = validator(|record| match record.get("amount").and_then(Value::as_f64) {
			Some(amount) if amount > 0.0 => Ok(()),
			_ => Err("amount must be positive".to_string()),
		});
		let orders = catalog
			.create_ingest_api(IngestApiToCreate {
				validators: vec![positive],
				..IngestApiToCreate::new("orders", create_test_schema(), &stream)
			})
			.unwrap();

		let api = catalog.find_ingest_api(&orders.key()).unwrap();
		api.validate(&json!({"id": "a", "amount": 3.5})).unwrap();
		let err = api.validate(&json!({"id": "a", "amount": -1})).unwrap_err();
		assert!(err.message.contains("amount must be positive"));
		assert!(api.validate(&json!({"id": "a", "amount": 1, "note": "x"})).is_err());
	}
}
