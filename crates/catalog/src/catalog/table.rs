// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use indexmap::IndexMap;
use moose_core::{LifeCycle, Metadata, Model, ResourceId, Schema};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use crate::{
	Result,
	catalog::{Catalog, register, require_name},
	engine::EngineConfig,
	error::{CatalogError, ResourceKind},
	typed::TypedResource,
};

/// Handle to a registered table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
	pub name: String,
	pub version: Option<String>,
	pub database: Option<String>,
}

impl TableRef {
	pub fn id(&self) -> ResourceId {
		ResourceId::new(self.name.clone(), self.version.clone())
	}

	pub fn key(&self) -> String {
		self.id().key()
	}

	/// Name of the table in the database: version dots become underscores.
	pub fn physical_name(&self) -> String {
		match &self.version {
			Some(version) => format!("{}_{}", self.name, version.replace('.', "_")),
			None => self.name.clone(),
		}
	}

	/// Back-quoted, database-qualified when a database is set.
	pub fn reference(&self) -> String {
		match &self.database {
			Some(database) => format!("`{}`.`{}`", database, self.physical_name()),
			None => format!("`{}`", self.physical_name()),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OrderBy {
	Fields(Vec<String>),
	Expression(String),
}

impl Default for OrderBy {
	fn default() -> Self {
		OrderBy::Fields(vec![])
	}
}

fn default_granularity() -> u64 {
	1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableIndex {
	pub name: String,
	pub expression: String,
	#[serde(rename = "type")]
	pub index_type: String,
	#[serde(default)]
	pub arguments: Vec<String>,
	#[serde(default = "default_granularity")]
	pub granularity: u64,
}

impl TableIndex {
	pub fn new(name: impl Into<String>, expression: impl Into<String>, index_type: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			expression: expression.into(),
			index_type: index_type.into(),
			arguments: vec![],
			granularity: default_granularity(),
		}
	}

	pub fn arguments(mut self, arguments: &[&str]) -> Self {
		self.arguments = arguments.iter().map(|a| a.to_string()).collect();
		self
	}

	pub fn granularity(mut self, granularity: u64) -> Self {
		self.granularity = granularity;
		self
	}
}

#[derive(Debug, Clone, Default)]
pub struct TableToCreate {
	pub name: String,
	pub version: Option<String>,
	pub database: Option<String>,
	pub schema: Option<Schema>,
	pub order_by_fields: Vec<String>,
	pub order_by_expression: Option<String>,
	pub partition_by: Option<String>,
	pub sample_by_expression: Option<String>,
	/// `None` means MergeTree.
	pub engine: Option<EngineConfig>,
	pub settings: IndexMap<String, String>,
	pub indexes: Vec<TableIndex>,
	pub ttl: Option<String>,
	pub life_cycle: Option<LifeCycle>,
	pub metadata: Metadata,
}

impl TableToCreate {
	pub fn new(name: impl Into<String>, schema: Schema) -> Self {
		Self {
			name: name.into(),
			schema: Some(schema),
			..Default::default()
		}
	}

	pub fn of<M: Model>(name: impl Into<String>) -> Self {
		Self::new(name, M::schema())
	}

	/// Reads a loosely typed declaration: camelCase keys, engine parameters inline.
	pub fn from_json(name: impl Into<String>, schema: Option<Schema>, options: &Value) -> Result<Self> {
		let name = name.into();
		let invalid = |field: &'static str, reason: &str| -> moose_type::Error {
			CatalogError::InvalidValue {
				kind: ResourceKind::Table,
				name: name.clone(),
				field,
				reason: reason.to_string(),
			}
			.into()
		};
		let string = |key: &'static str| -> Result<Option<String>> {
			match options.get(key) {
				None | Some(Value::Null) => Ok(None),
				Some(Value::String(s)) => Ok(Some(s.clone())),
				Some(_) => Err(invalid(key, "expected a string")),
			}
		};

		let version = string("version")?;
		let engine_tag = string("engine")?;
		let engine = EngineConfig::from_options(engine_tag.as_deref(), options).map_err(|source| {
			CatalogError::InvalidEngine {
				name: name.clone(),
				version: version.clone(),
				source,
			}
		})?;

		let order_by_fields = match options.get("orderByFields") {
			None | Some(Value::Null) => vec![],
			Some(value) => serde_json::from_value::<Vec<String>>(value.clone())
				.map_err(|_| invalid("orderByFields", "expected an array of column names"))?,
		};

		let settings = match options.get("settings") {
			None | Some(Value::Null) => IndexMap::new(),
			Some(value) => serde_json::from_value::<IndexMap<String, String>>(value.clone())
				.map_err(|_| invalid("settings", "expected an object of string values"))?,
		};

		let indexes = match options.get("indexes") {
			None | Some(Value::Null) => vec![],
			Some(value) => serde_json::from_value::<Vec<TableIndex>>(value.clone())
				.map_err(|err| invalid("indexes", &err.to_string()))?,
		};

		let life_cycle = match string("lifeCycle")?.as_deref() {
			None => None,
			Some("FULLY_MANAGED") => Some(LifeCycle::FullyManaged),
			Some("DELETION_PROTECTED") => Some(LifeCycle::DeletionProtected),
			Some("EXTERNALLY_MANAGED") => Some(LifeCycle::ExternallyManaged),
			Some(_) => return Err(invalid("lifeCycle", "unknown life cycle")),
		};

		Ok(Self {
			version,
			database: string("database")?,
			schema,
			order_by_fields,
			order_by_expression: string("orderByExpression")?,
			partition_by: string("partitionBy")?,
			sample_by_expression: string("sampleByExpression")?,
			engine: Some(engine),
			settings,
			indexes,
			ttl: string("ttl")?,
			life_cycle,
			metadata: Metadata {
				description: string("description")?,
				source: None,
			},
			name,
		})
	}
}

#[derive(Debug, Clone)]
pub struct OlapTable {
	pub typed: TypedResource,
	pub id: TableRef,
	pub order_by: OrderBy,
	pub partition_by: Option<String>,
	pub sample_by_expression: Option<String>,
	pub engine: EngineConfig,
	pub settings: IndexMap<String, String>,
	pub indexes: Vec<TableIndex>,
	pub ttl: Option<String>,
	pub life_cycle: Option<LifeCycle>,
	/// Name of the ingest pipeline that declared this table.
	pub pipeline: Option<String>,
}

impl OlapTable {
	pub fn name(&self) -> &str {
		&self.id.name
	}

	pub fn version(&self) -> Option<&str> {
		self.id.version.as_deref()
	}
}

impl Catalog {
	#[instrument(name = "catalog::table::create", level = "debug", skip(self, to_create), fields(name = %to_create.name))]
	pub fn create_table(&mut self, to_create: TableToCreate) -> Result<TableRef> {
		self.create_table_in(to_create, None)
	}

	pub(crate) fn create_table_in(&mut self, to_create: TableToCreate, pipeline: Option<&str>) -> Result<TableRef> {
		require_name(ResourceKind::Table, &to_create.name)?;

		let order_by = match (to_create.order_by_fields.is_empty(), to_create.order_by_expression) {
			(false, Some(_)) => {
				return Err(CatalogError::MutuallyExclusive {
					kind: ResourceKind::Table,
					name: to_create.name,
					first: "orderByFields",
					second: "orderByExpression",
				}
				.into());
			}
			(_, Some(expression)) => OrderBy::Expression(expression),
			(_, None) => OrderBy::Fields(to_create.order_by_fields),
		};

		let engine = to_create.engine.unwrap_or_default();
		engine.validate().map_err(|source| CatalogError::InvalidEngine {
			name: to_create.name.clone(),
			version: to_create.version.clone(),
			source,
		})?;

		let metadata = self.resolve_metadata(to_create.metadata);
		let typed = TypedResource::new(ResourceKind::Table, &to_create.name, to_create.schema, metadata)?;

		let table_ref = TableRef {
			name: to_create.name,
			version: to_create.version,
			database: to_create.database,
		};
		let id = table_ref.id();
		let table = OlapTable {
			typed,
			id: table_ref.clone(),
			order_by,
			partition_by: to_create.partition_by,
			sample_by_expression: to_create.sample_by_expression,
			engine,
			settings: to_create.settings,
			indexes: to_create.indexes,
			ttl: to_create.ttl,
			life_cycle: to_create.life_cycle,
			pipeline: pipeline.map(str::to_string),
		};

		let duplicates = self.config.duplicates;
		register(&mut self.tables, duplicates, ResourceKind::Table, &id, id.key(), table)?;
		self.touch();
		Ok(table_ref)
	}

	/// Looks a table up by composite key (`name` or `name_version`).
	pub fn find_table(&self, key: &str) -> Option<&OlapTable> {
		self.tables.get(key)
	}

	pub fn find_table_by_name(&self, name: &str, version: Option<&str>) -> Option<&OlapTable> {
		self.tables.get(&moose_core::identity::composite_key(name, version))
	}

	pub fn list_tables(&self) -> impl Iterator<Item = &OlapTable> {
		self.tables.values()
	}

	pub fn table_count(&self) -> usize {
		self.tables.len()
	}
}

#[cfg(test)]
mod tests {
	use moose_core::{CatalogConfig, Column, DataType};
	use serde_json::json;

	use super::*;

	fn create_test_schema() -> Schema {
		Schema::new(vec![
			Column::new("id", DataType::String).primary_key(),
			Column::new("amount", DataType::Float64),
		])
	}

	fn create_test_catalog() -> Catalog {
		Catalog::new(CatalogConfig::builder().capture_source_location(false).build())
	}

	#[test]
	fn test_create_and_find_table() {
		let mut catalog = create_test_catalog();
		let orders = catalog
			.create_table(TableToCreate {
				version: Some("1.0".to_string()),
				order_by_fields: vec!["id".to_string()],
				..TableToCreate::new("orders", create_test_schema())
			})
			.unwrap();

		assert_eq!(orders.key(), "orders_1.0");
		assert_eq!(orders.physical_name(), "orders_1_0");
		let table = catalog.find_table_by_name("orders", Some("1.0")).unwrap();
		assert_eq!(table.order_by, OrderBy::Fields(vec!["id".to_string()]));
		assert_eq!(table.engine, EngineConfig::MergeTree);
		assert!(catalog.find_table("orders").is_none());
	}

	#[test]
	fn test_duplicate_table_rejected() {
		let mut catalog = create_test_catalog();
		catalog.create_table(TableToCreate::new("orders", create_test_schema())).unwrap();
		let err = catalog.create_table(TableToCreate::new("orders", create_test_schema())).unwrap_err();
		assert_eq!(err.code(), "CATALOG_001");
		assert!(err.message.contains("table 'orders'"));

		// a different version is a different key
		catalog
			.create_table(TableToCreate {
				version: Some("2".to_string()),
				..TableToCreate::new("orders", create_test_schema())
			})
			.unwrap();
		assert_eq!(catalog.table_count(), 2);
	}

	#[test]
	fn test_duplicate_versioned_table_message_names_version() {
		let mut catalog = create_test_catalog();
		let versioned = || TableToCreate {
			version: Some("2".to_string()),
			..TableToCreate::new("orders", create_test_schema())
		};
		catalog.create_table(versioned()).unwrap();
		let err = catalog.create_table(versioned()).unwrap_err();
		assert!(err.message.contains("'orders' version 2"));
	}

	#[test]
	fn test_permissive_mode_replaces_in_place() {
		let mut catalog = Catalog::new(CatalogConfig::builder().permissive().capture_source_location(false).build());
		catalog.create_table(TableToCreate::new("a", create_test_schema())).unwrap();
		catalog.create_table(TableToCreate::new("b", create_test_schema())).unwrap();
		catalog
			.create_table(TableToCreate {
				ttl: Some("created_at + INTERVAL 30 DAY".to_string()),
				..TableToCreate::new("a", create_test_schema())
			})
			.unwrap();

		assert_eq!(catalog.table_count(), 2);
		let names: Vec<&str> = catalog.list_tables().map(|t| t.name()).collect();
		assert_eq!(names, vec!["a", "b"]);
		assert!(catalog.find_table("a").unwrap().ttl.is_some());
	}

	#[test]
	fn test_order_by_fields_and_expression_are_exclusive() {
		let mut catalog = create_test_catalog();
		let err = catalog
			.create_table(TableToCreate {
				order_by_fields: vec!["id".to_string()],
				order_by_expression: Some("(id, amount)".to_string()),
				..TableToCreate::new("orders", create_test_schema())
			})
			.unwrap_err();
		assert_eq!(err.code(), "CATALOG_006");
	}

	#[test]
	fn test_schema_is_required() {
		let mut catalog = create_test_catalog();
		let err = catalog
			.create_table(TableToCreate {
				name: "orders".to_string(),
				..Default::default()
			})
			.unwrap_err();
		assert_eq!(err.code(), "CATALOG_011");
	}

	#[test]
	fn test_invalid_engine_names_the_table() {
		let mut catalog = create_test_catalog();
		let err = catalog
			.create_table(TableToCreate {
				engine: Some(EngineConfig::Merge {
					source_database: "".to_string(),
					tables_regexp: "^events".to_string(),
				}),
				..TableToCreate::new("all_events", create_test_schema())
			})
			.unwrap_err();
		assert_eq!(err.code(), "CATALOG_010");
		assert!(err.message.contains("'all_events'"));
		assert_eq!(err.cause.as_ref().unwrap().code, "ENGINE_002");
	}

	#[test]
	fn test_from_json_normalizes_engine_and_indexes() {
		let to_create = TableToCreate::from_json(
			"events",
			Some(create_test_schema()),
			&json!({
				"version": "1.1",
				"engine": "ReplacingMergeTree",
				"ver": "updated_at",
				"orderByFields": ["id"],
				"settings": {"index_granularity": "4096"},
				"indexes": [{"name": "idx_amount", "expression": "amount", "type": "minmax"}],
				"lifeCycle": "DELETION_PROTECTED"
			}),
		)
		.unwrap();

		assert_eq!(
			to_create.engine,
			Some(EngineConfig::ReplacingMergeTree {
				ver: Some("updated_at".to_string()),
				is_deleted: None
			})
		);
		assert_eq!(to_create.indexes[0].granularity, 1);
		assert!(to_create.indexes[0].arguments.is_empty());
		assert_eq!(to_create.life_cycle, Some(LifeCycle::DeletionProtected));

		let mut catalog = create_test_catalog();
		let events = catalog.create_table(to_create).unwrap();
		assert_eq!(events.key(), "events_1.1");
	}

	#[test]
	fn test_from_json_rejects_bad_shapes() {
		let err = TableToCreate::from_json("events", None, &json!({"orderByFields": "id"})).unwrap_err();
		assert_eq!(err.code(), "CATALOG_007");
		let err = TableToCreate::from_json("events", None, &json!({"engine": "Nope"})).unwrap_err();
		assert_eq!(err.code(), "CATALOG_010");
	}

	#[test]
	fn test_reference_quotes_database() {
		let table = TableRef {
			name: "orders".to_string(),
			version: None,
			database: Some("sales".to_string()),
		};
		assert_eq!(table.reference(), "`sales`.`orders`");
	}
}
