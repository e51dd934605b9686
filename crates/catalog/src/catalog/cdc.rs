// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use indexmap::IndexMap;
use moose_core::{
	Column, DataType, DuplicatePolicy, EnumMember, EnumValue, LifeCycle, Metadata, ResourceId, Schema,
	identity::composite_key,
};
use tracing::instrument;

use crate::{
	Result,
	catalog::{Catalog, StreamRef, StreamToCreate, TableRef, TableToCreate, register, require_name},
	engine::EngineConfig,
	error::{CatalogError, ResourceKind},
	typed::TypedResource,
};

pub const CDC_OP: &str = "__cdc_op";
pub const CDC_LSN: &str = "__cdc_lsn";
pub const CDC_TS: &str = "__cdc_ts";
pub const CDC_IS_DELETED: &str = "__cdc_is_deleted";

const RESERVED_COLUMNS: [&str; 4] = [CDC_OP, CDC_LSN, CDC_TS, CDC_IS_DELETED];

/// Whether a composite declaration derives a component, and how.
#[derive(Debug, Clone)]
pub enum Derive<T> {
	Auto,
	Disabled,
	/// Derived from this configuration; the composite still sets name and schema.
	Custom(T),
}

impl<T> Default for Derive<T> {
	fn default() -> Self {
		Derive::Auto
	}
}

impl<T> Derive<T> {
	pub fn is_disabled(&self) -> bool {
		matches!(self, Derive::Disabled)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Snapshot {
	Initial,
	Never,
}

#[derive(Debug, Clone, Default)]
pub struct CdcSourceToCreate {
	pub name: String,
	/// Connector kind, e.g. `postgres`.
	pub kind: String,
	pub connection: String,
	pub life_cycle: Option<LifeCycle>,
	pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CdcSourceRef {
	pub name: String,
}

#[derive(Debug, Clone)]
pub struct CdcSource {
	pub name: String,
	pub kind: String,
	pub connection: String,
	pub life_cycle: Option<LifeCycle>,
	pub metadata: Metadata,
	pub tables: IndexMap<String, CdcTable>,
}

#[derive(Debug, Clone, Default)]
pub struct CdcTableToCreate {
	pub name: String,
	/// Table name in the upstream database.
	pub source_table: String,
	pub schema: Option<Schema>,
	pub primary_key: Vec<String>,
	pub stream: Derive<StreamToCreate>,
	pub table: Derive<TableToCreate>,
	pub snapshot: Option<Snapshot>,
	pub version: Option<String>,
	pub life_cycle: Option<LifeCycle>,
	pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdcTableRef {
	pub source: String,
	pub name: String,
	pub version: Option<String>,
	/// The change-event stream, unless disabled.
	pub stream: Option<StreamRef>,
	/// The snapshot table, unless disabled.
	pub table: Option<TableRef>,
}

impl CdcTableRef {
	/// Key within the source: `name` or `name_version`.
	pub fn key(&self) -> String {
		composite_key(&self.name, self.version.as_deref())
	}
}

#[derive(Debug, Clone)]
pub struct CdcTable {
	pub typed: TypedResource,
	pub source_table: String,
	pub primary_key: Vec<String>,
	pub snapshot: Option<Snapshot>,
	pub version: Option<String>,
	pub stream: Option<StreamRef>,
	pub table: Option<TableRef>,
}

impl CdcTable {
	pub fn name(&self) -> &str {
		&self.typed.name
	}
}

fn operation_type() -> DataType {
	let values = ["insert", "update", "delete"]
		.into_iter()
		.map(|op| EnumMember {
			name: op.to_string(),
			value: EnumValue::String(op.to_string()),
		})
		.collect();
	DataType::Enum {
		name: "CdcOperation".to_string(),
		values,
	}
}

/// Shape of a change event: the row before and after, plus log position.
fn event_schema(name: &str, schema: &Schema) -> Schema {
	let row = DataType::nullable(DataType::Nested {
		name: name.to_string(),
		columns: schema.columns.clone(),
		jwt: false,
	});
	Schema::new(vec![
		Column::new("op", operation_type()),
		Column::new("before", row.clone()).optional(),
		Column::new("after", row).optional(),
		Column::new("ts", DataType::DateTime {
			precision: None,
		}),
		Column::new("lsn", DataType::String),
		Column::new("source", DataType::String),
	])
}

/// Shape of a snapshot row: the user columns followed by the change markers.
fn row_schema(schema: &Schema) -> Schema {
	schema.extended([
		Column::new(CDC_OP, operation_type()),
		Column::new(CDC_LSN, DataType::String),
		Column::new(CDC_TS, DataType::DateTime {
			precision: None,
		}),
		Column::new(CDC_IS_DELETED, DataType::Boolean),
	])
}

impl Catalog {
	#[instrument(name = "catalog::cdc_source::create", level = "debug", skip(self, to_create), fields(name = %to_create.name))]
	pub fn create_cdc_source(&mut self, to_create: CdcSourceToCreate) -> Result<CdcSourceRef> {
		require_name(ResourceKind::CdcSource, &to_create.name)?;
		for (field, value) in [("kind", &to_create.kind), ("connection", &to_create.connection)] {
			if value.trim().is_empty() {
				return Err(CatalogError::MissingField {
					kind: ResourceKind::CdcSource,
					name: to_create.name,
					field,
				}
				.into());
			}
		}

		let id = ResourceId::unversioned(to_create.name.clone());
		let source = CdcSource {
			name: to_create.name,
			kind: to_create.kind,
			connection: to_create.connection,
			life_cycle: to_create.life_cycle,
			metadata: self.resolve_metadata(to_create.metadata),
			tables: IndexMap::new(),
		};
		let duplicates = self.config.duplicates;
		register(&mut self.cdc_sources, duplicates, ResourceKind::CdcSource, &id, id.key(), source)?;
		self.touch();
		Ok(CdcSourceRef {
			name: id.name,
		})
	}

	/// Binds an upstream table to `source`, deriving its change-event stream and its
	/// deduplicated snapshot table unless disabled.
	#[instrument(name = "catalog::cdc_table::create", level = "debug", skip(self, to_create), fields(source = %source.name, name = %to_create.name))]
	pub fn create_cdc_table(&mut self, source: &CdcSourceRef, to_create: CdcTableToCreate) -> Result<CdcTableRef> {
		let kind = ResourceKind::CdcTable;
		require_name(kind, &to_create.name)?;
		if !self.cdc_sources.contains_key(&source.name) {
			return Err(CatalogError::NotFound {
				kind: ResourceKind::CdcSource,
				name: source.name.clone(),
				version: None,
			}
			.into());
		}
		if to_create.primary_key.is_empty() {
			return Err(CatalogError::MissingField {
				kind,
				name: to_create.name,
				field: "primaryKey",
			}
			.into());
		}

		let metadata = self.resolve_metadata(to_create.metadata);
		let typed = TypedResource::new(kind, &to_create.name, to_create.schema, metadata)?;
		if let Some(reserved) = RESERVED_COLUMNS.iter().find(|reserved| typed.schema.has_column(reserved)) {
			return Err(CatalogError::ReservedName {
				kind,
				name: to_create.name,
				reserved: reserved.to_string(),
			}
			.into());
		}
		if let Some(missing) = to_create.primary_key.iter().find(|column| !typed.schema.has_column(column)) {
			return Err(CatalogError::InvalidValue {
				kind,
				name: to_create.name.clone(),
				field: "primaryKey",
				reason: format!("column '{}' is not declared", missing),
			}
			.into());
		}

		let name = to_create.name;
		let id = ResourceId::new(name.clone(), to_create.version.clone());
		let duplicates = self.config.duplicates;
		if duplicates == DuplicatePolicy::Reject
			&& self.cdc_sources.get(&source.name).is_some_and(|s| s.tables.contains_key(&id.key()))
		{
			return Err(CatalogError::AlreadyExists {
				kind,
				name,
				version: id.version,
			}
			.into());
		}

		let stream = match to_create.stream {
			Derive::Disabled => None,
			Derive::Auto => Some(StreamToCreate {
				life_cycle: to_create.life_cycle,
				..Default::default()
			}),
			Derive::Custom(stream) => Some(stream),
		}
		.map(|stream| StreamToCreate {
			name: name.clone(),
			version: to_create.version.clone().or(stream.version),
			schema: Some(event_schema(&name, &typed.schema)),
			metadata: if stream.metadata.is_empty() {
				typed.metadata.clone()
			} else {
				stream.metadata
			},
			..stream
		});

		let table = match to_create.table {
			Derive::Disabled => None,
			Derive::Auto => Some(TableToCreate {
				life_cycle: to_create.life_cycle,
				..Default::default()
			}),
			Derive::Custom(table) => Some(table),
		}
		.map(|table| {
			let order_by_fields = if table.order_by_fields.is_empty() && table.order_by_expression.is_none() {
				to_create.primary_key.clone()
			} else {
				table.order_by_fields
			};
			TableToCreate {
				name: name.clone(),
				version: to_create.version.clone().or(table.version),
				schema: Some(row_schema(&typed.schema)),
				engine: table.engine.or(Some(EngineConfig::ReplacingMergeTree {
					ver: Some(CDC_LSN.to_string()),
					is_deleted: Some(CDC_IS_DELETED.to_string()),
				})),
				order_by_fields,
				metadata: if table.metadata.is_empty() {
					typed.metadata.clone()
				} else {
					table.metadata
				},
				..table
			}
		});

		// name collisions fail before either component is created
		if let Some(stream) = &stream {
			let stream_id = ResourceId::new(stream.name.clone(), stream.version.clone());
			self.check_available(&self.streams, ResourceKind::Stream, &stream_id, &stream_id.key())?;
		}
		if let Some(table) = &table {
			let table_id = ResourceId::new(table.name.clone(), table.version.clone());
			self.check_available(&self.tables, ResourceKind::Table, &table_id, &table_id.key())?;
		}

		// stream, snapshot table and entry register as one unit
		self.atomically(|catalog| {
			let stream = stream.map(|stream| catalog.create_stream(stream)).transpose()?;
			let table = table.map(|table| catalog.create_table(table)).transpose()?;

			let cdc_table = CdcTable {
				typed,
				source_table: to_create.source_table,
				primary_key: to_create.primary_key,
				snapshot: to_create.snapshot,
				version: to_create.version,
				stream: stream.clone(),
				table: table.clone(),
			};
			let Some(cdc_source) = catalog.cdc_sources.get_mut(&source.name) else {
				return Err(CatalogError::NotFound {
					kind: ResourceKind::CdcSource,
					name: source.name.clone(),
					version: None,
				}
				.into());
			};
			register(&mut cdc_source.tables, duplicates, kind, &id, id.key(), cdc_table)?;
			catalog.touch();

			Ok(CdcTableRef {
				source: source.name.clone(),
				name,
				version: id.version.clone(),
				stream,
				table,
			})
		})
	}

	pub fn find_cdc_source(&self, name: &str) -> Option<&CdcSource> {
		self.cdc_sources.get(name)
	}

	/// Looks up a CDC table of `source` by its key (`name` or `name_version`).
	pub fn find_cdc_table(&self, source: &str, key: &str) -> Option<&CdcTable> {
		self.cdc_sources.get(source).and_then(|source| source.tables.get(key))
	}

	pub fn list_cdc_sources(&self) -> impl Iterator<Item = &CdcSource> {
		self.cdc_sources.values()
	}
}

#[cfg(test)]
mod tests {
	use moose_core::CatalogConfig;

	use super::*;
	use crate::catalog::OrderBy;

	fn create_test_schema() -> Schema {
		Schema::new(vec![Column::new("id", DataType::Int64).primary_key(), Column::new("email", DataType::String)])
	}

	fn create_test_catalog() -> (Catalog, CdcSourceRef) {
		let mut catalog = Catalog::new(CatalogConfig::builder().capture_source_location(false).build());
		let source = catalog
			.create_cdc_source(CdcSourceToCreate {
				name: "app_db".to_string(),
				kind: "postgres".to_string(),
				connection: "postgres://localhost/app".to_string(),
				..Default::default()
			})
			.unwrap();
		(catalog, source)
	}

	fn users(primary_key: &[&str]) -> CdcTableToCreate {
		CdcTableToCreate {
			name: "users".to_string(),
			source_table: "public.users".to_string(),
			schema: Some(create_test_schema()),
			primary_key: primary_key.iter().map(|c| c.to_string()).collect(),
			..Default::default()
		}
	}

	#[test]
	fn test_derives_stream_and_snapshot_table() {
		let (mut catalog, source) = create_test_catalog();
		let cdc = catalog.create_cdc_table(&source, users(&["id"])).unwrap();

		let stream = catalog.find_stream(&cdc.stream.unwrap().key()).unwrap();
		let columns: Vec<&str> = stream.typed.columns().iter().map(|c| c.name.as_str()).collect();
		assert_eq!(columns, vec!["op", "before", "after", "ts", "lsn", "source"]);

		let table = catalog.find_table(&cdc.table.unwrap().key()).unwrap();
		assert_eq!(table.order_by, OrderBy::Fields(vec!["id".to_string()]));
		assert_eq!(
			table.engine,
			EngineConfig::ReplacingMergeTree {
				ver: Some("__cdc_lsn".to_string()),
				is_deleted: Some("__cdc_is_deleted".to_string()),
			}
		);
		assert!(table.typed.schema.has_column(CDC_IS_DELETED));
		assert_eq!(catalog.find_cdc_table("app_db", "users").unwrap().source_table, "public.users");
	}

	#[test]
	fn test_version_propagates() {
		let (mut catalog, source) = create_test_catalog();
		let cdc = catalog
			.create_cdc_table(
				&source,
				CdcTableToCreate {
					version: Some("2".to_string()),
					stream: Derive::Disabled,
					..users(&["id"])
				},
			)
			.unwrap();
		assert!(cdc.stream.is_none());
		assert_eq!(cdc.table.unwrap().key(), "users_2");
	}

	#[test]
	fn test_custom_table_keeps_engine_and_order() {
		let (mut catalog, source) = create_test_catalog();
		let custom = TableToCreate {
			engine: Some(EngineConfig::MergeTree),
			order_by_fields: vec!["email".to_string()],
			..Default::default()
		};
		let cdc = catalog
			.create_cdc_table(
				&source,
				CdcTableToCreate {
					table: Derive::Custom(custom),
					..users(&["id"])
				},
			)
			.unwrap();
		let table = catalog.find_table(&cdc.table.unwrap().key()).unwrap();
		assert_eq!(table.engine, EngineConfig::MergeTree);
		assert_eq!(table.order_by, OrderBy::Fields(vec!["email".to_string()]));
	}

	#[test]
	fn test_primary_key_required() {
		let (mut catalog, source) = create_test_catalog();
		let err = catalog.create_cdc_table(&source, users(&[])).unwrap_err();
		assert_eq!(err.code(), "CATALOG_005");
		let err = catalog.create_cdc_table(&source, users(&["tenant_id"])).unwrap_err();
		assert_eq!(err.code(), "CATALOG_007");
	}

	#[test]
	fn test_reserved_columns_rejected() {
		let (mut catalog, source) = create_test_catalog();
		let schema = create_test_schema().extended([Column::new(CDC_LSN, DataType::String)]);
		let err = catalog
			.create_cdc_table(
				&source,
				CdcTableToCreate {
					schema: Some(schema),
					..users(&["id"])
				},
			)
			.unwrap_err();
		assert_eq!(err.code(), "CATALOG_008");
		assert!(catalog.find_stream("users").is_none());
	}

	#[test]
	fn test_rejected_snapshot_table_leaves_no_stream() {
		let (mut catalog, source) = create_test_catalog();
		let custom = TableToCreate {
			order_by_fields: vec!["id".to_string()],
			order_by_expression: Some("tuple()".to_string()),
			..Default::default()
		};
		let err = catalog
			.create_cdc_table(
				&source,
				CdcTableToCreate {
					table: Derive::Custom(custom),
					..users(&["id"])
				},
			)
			.unwrap_err();
		assert_eq!(err.code(), "CATALOG_006");
		assert_eq!(catalog.stream_count(), 0);
		assert!(catalog.find_cdc_table("app_db", "users").is_none());
	}

	#[test]
	fn test_versions_are_separate_cdc_tables() {
		let (mut catalog, source) = create_test_catalog();
		for version in ["1", "2"] {
			let cdc = catalog
				.create_cdc_table(
					&source,
					CdcTableToCreate {
						version: Some(version.to_string()),
						..users(&["id"])
					},
				)
				.unwrap();
			assert_eq!(cdc.key(), format!("users_{}", version));
		}
		assert!(catalog.find_cdc_table("app_db", "users_1").is_some());
		assert!(catalog.find_cdc_table("app_db", "users_2").is_some());
		assert_eq!(catalog.stream_count(), 2);
	}

	#[test]
	fn test_duplicate_cdc_table() {
		let (mut catalog, source) = create_test_catalog();
		catalog.create_cdc_table(&source, users(&["id"])).unwrap();
		let err = catalog.create_cdc_table(&source, users(&["id"])).unwrap_err();
		assert!(err.message.contains("CDC table 'users' already exists"));
	}

	#[test]
	fn test_unknown_source() {
		let (mut catalog, _) = create_test_catalog();
		let ghost = CdcSourceRef {
			name: "ghost".to_string(),
		};
		assert_eq!(catalog.create_cdc_table(&ghost, users(&["id"])).unwrap_err().code(), "CATALOG_014");
	}
}
