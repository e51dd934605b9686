// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::fmt::{Display, Formatter};

use indexmap::{IndexMap, map::Entry};
use moose_catalog::{Catalog, CatalogHandle};
use moose_core::identity::composite_key;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::{
	Result,
	descriptor::{
		ApiDescriptor, IngestApiDescriptor, SqlResourceDescriptor, TableDescriptor, TopicDescriptor,
		WebAppDescriptor, WorkflowDescriptor,
	},
	error::InfraMapError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
	Tables,
	Topics,
	IngestApis,
	Apis,
	SqlResources,
	Workflows,
	WebApps,
}

impl Display for Section {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			Section::Tables => f.write_str("tables"),
			Section::Topics => f.write_str("topics"),
			Section::IngestApis => f.write_str("ingestApis"),
			Section::Apis => f.write_str("apis"),
			Section::SqlResources => f.write_str("sqlResources"),
			Section::Workflows => f.write_str("workflows"),
			Section::WebApps => f.write_str("webApps"),
		}
	}
}

/// Every section is ordered like the registry it was built from.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfraMap {
	pub tables: IndexMap<String, TableDescriptor>,
	pub topics: IndexMap<String, TopicDescriptor>,
	pub ingest_apis: IndexMap<String, IngestApiDescriptor>,
	pub apis: IndexMap<String, ApiDescriptor>,
	pub sql_resources: IndexMap<String, SqlResourceDescriptor>,
	pub workflows: IndexMap<String, WorkflowDescriptor>,
	pub web_apps: IndexMap<String, WebAppDescriptor>,
}

/// Adds `value` under `key`. `source` names the resource for collision reports.
fn insert<T>(
	section: Section,
	map: &mut IndexMap<String, T>,
	key: String,
	source: String,
	value: T,
	sources: &mut IndexMap<String, String>,
) -> Result<()> {
	match map.entry(key.clone()) {
		Entry::Occupied(_) => Err(InfraMapError::KeyCollision {
			section,
			existing: sources.get(&key).cloned().unwrap_or_else(|| key.clone()),
			key,
			incoming: source,
		}
		.into()),
		Entry::Vacant(entry) => {
			entry.insert(value);
			sources.insert(key, source);
			Ok(())
		}
	}
}

impl InfraMap {
	#[instrument(name = "infra_map::build", level = "debug", skip_all)]
	pub fn from_catalog(catalog: &Catalog) -> Result<Self> {
		let mut map = InfraMap::default();

		let mut sources = IndexMap::new();
		for table in catalog.list_tables() {
			let key = composite_key(table.name(), table.version());
			let descriptor = TableDescriptor::describe(catalog, table);
			insert(Section::Tables, &mut map.tables, key.clone(), key, descriptor, &mut sources)?;
		}

		let mut sources = IndexMap::new();
		for stream in catalog.list_streams() {
			let key = stream.id.key();
			let descriptor = TopicDescriptor::describe(catalog, stream);
			insert(Section::Topics, &mut map.topics, key.clone(), key, descriptor, &mut sources)?;
		}

		let mut sources = IndexMap::new();
		for api in catalog.list_ingest_apis() {
			let key = api.id.key();
			let descriptor = IngestApiDescriptor::describe(catalog, api);
			insert(Section::IngestApis, &mut map.ingest_apis, key.clone(), key, descriptor, &mut sources)?;
		}

		// registered as `name:version`, emitted as `name_version`
		let mut sources = IndexMap::new();
		for api in catalog.list_apis() {
			let key = composite_key(&api.id.name, api.id.version.as_deref());
			let descriptor = ApiDescriptor::describe(catalog, api);
			insert(Section::Apis, &mut map.apis, key, api.id.key(), descriptor, &mut sources)?;
		}

		let mut sources = IndexMap::new();
		for resource in catalog.list_sql_resources() {
			let descriptor = SqlResourceDescriptor::describe(resource)?;
			let key = resource.name.clone();
			insert(Section::SqlResources, &mut map.sql_resources, key.clone(), key, descriptor, &mut sources)?;
		}

		let mut sources = IndexMap::new();
		for workflow in catalog.list_workflows() {
			let key = workflow.name.clone();
			let descriptor = WorkflowDescriptor::describe(catalog, workflow);
			insert(Section::Workflows, &mut map.workflows, key.clone(), key, descriptor, &mut sources)?;
		}

		let mut sources = IndexMap::new();
		for app in catalog.list_web_apps() {
			let key = app.name.clone();
			let descriptor = WebAppDescriptor::describe(catalog, app);
			insert(Section::WebApps, &mut map.web_apps, key.clone(), key, descriptor, &mut sources)?;
		}

		debug!(
			tables = map.tables.len(),
			topics = map.topics.len(),
			ingest_apis = map.ingest_apis.len(),
			apis = map.apis.len(),
			sql_resources = map.sql_resources.len(),
			workflows = map.workflows.len(),
			web_apps = map.web_apps.len(),
			"infrastructure map built"
		);
		Ok(map)
	}

	/// Builds from the catalog currently published by `handle`. A concurrent reload
	/// is either fully visible or not at all.
	pub fn from_handle(handle: &CatalogHandle) -> Result<Self> {
		Self::from_catalog(&handle.current())
	}

	pub fn is_empty(&self) -> bool {
		self.tables.is_empty()
			&& self.topics.is_empty()
			&& self.ingest_apis.is_empty()
			&& self.apis.is_empty()
			&& self.sql_resources.is_empty()
			&& self.workflows.is_empty()
			&& self.web_apps.is_empty()
	}

	pub fn to_json(&self) -> Result<Value> {
		serde_json::to_value(self).map_err(|err| {
			InfraMapError::Encoding {
				reason: err.to_string(),
			}
			.into()
		})
	}

	pub fn to_json_string(&self) -> Result<String> {
		serde_json::to_string_pretty(self).map_err(|err| {
			InfraMapError::Encoding {
				reason: err.to_string(),
			}
			.into()
		})
	}
}

#[cfg(test)]
mod tests {
	use moose_catalog::{ApiToCreate, TableToCreate, handler::api_handler};
	use moose_core::{CatalogConfig, Column, DataType, Schema};
	use serde_json::json;

	use super::*;

	fn create_test_catalog() -> Catalog {
		Catalog::new(CatalogConfig::builder().capture_source_location(false).build())
	}

	fn schema() -> Schema {
		Schema::new(vec![Column::new("id", DataType::String).primary_key()])
	}

	#[test]
	fn test_empty_catalog() {
		let map = InfraMap::from_catalog(&create_test_catalog()).unwrap();
		assert!(map.is_empty());
		assert_eq!(
			map.to_json().unwrap(),
			json!({
				"tables": {},
				"topics": {},
				"ingestApis": {},
				"apis": {},
				"sqlResources": {},
				"workflows": {},
				"webApps": {}
			})
		);
	}

	#[test]
	fn test_api_key_collision() {
		let mut catalog = create_test_catalog();
		let handler = api_handler(|_, params| Ok(params));
		catalog
			.create_api(ApiToCreate {
				version: Some("b".to_string()),
				..ApiToCreate::new("a", schema(), handler.clone())
			})
			.unwrap();
		catalog.create_api(ApiToCreate::new("a_b", schema(), handler)).unwrap();

		let err = InfraMap::from_catalog(&catalog).unwrap_err();
		assert_eq!(err.code(), "INFRA_001");
		assert_eq!(err.message, "apis key 'a_b' is produced by both 'a:b' and 'a_b'");
	}

	#[test]
	fn test_sections_keep_registration_order() {
		let mut catalog = create_test_catalog();
		for name in ["zeta", "alpha", "mid"] {
			catalog.create_table(TableToCreate::new(name, schema())).unwrap();
		}
		let map = InfraMap::from_catalog(&catalog).unwrap();
		let keys: Vec<&str> = map.tables.keys().map(String::as_str).collect();
		assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
	}

	#[test]
	fn test_section_display() {
		assert_eq!(Section::IngestApis.to_string(), "ingestApis");
		assert_eq!(Section::SqlResources.to_string(), "sqlResources");
	}
}
