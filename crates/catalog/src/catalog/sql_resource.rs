// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use moose_core::{Metadata, ResourceId};
use serde::Serialize;
use tracing::instrument;

use crate::{
	Result,
	catalog::{Catalog, MaterializedView, StreamRef, TableRef, register, require_name},
	error::{CatalogError, ResourceKind},
};

/// A resource a SQL resource reads from or writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlDependency {
	Table(TableRef),
	SqlResource(String),
	View(String),
	MaterializedView(String),
	/// Streams cannot be SQL dependencies; kept so the mistake is reported, not hidden.
	Topic(StreamRef),
}

/// How a dependency appears in the infrastructure map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencySignature {
	pub id: String,
	pub kind: &'static str,
}

impl SqlDependency {
	pub fn table(table: &TableRef) -> Self {
		SqlDependency::Table(table.clone())
	}

	/// Tables keep their version in the id; everything SQL-defined uses its bare name.
	pub fn signature(&self, owner: &str) -> Result<DependencySignature> {
		match self {
			SqlDependency::Table(table) => Ok(DependencySignature {
				id: table.key(),
				kind: "Table",
			}),
			SqlDependency::SqlResource(name)
			| SqlDependency::View(name)
			| SqlDependency::MaterializedView(name) => Ok(DependencySignature {
				id: name.clone(),
				kind: "SqlResource",
			}),
			SqlDependency::Topic(stream) => Err(CatalogError::UnknownDependency {
				kind: ResourceKind::SqlResource,
				name: owner.to_string(),
				dependency: format!("stream '{}'", stream.key()),
			}
			.into()),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlResourceKind {
	Raw,
	View,
	MaterializedView,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SqlResourceRef {
	pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct SqlResourceToCreate {
	pub name: String,
	pub setup: Vec<String>,
	pub teardown: Vec<String>,
	pub pulls_data_from: Vec<SqlDependency>,
	pub pushes_data_to: Vec<SqlDependency>,
	pub metadata: Metadata,
}

#[derive(Debug, Clone)]
pub struct SqlResource {
	pub name: String,
	pub kind: SqlResourceKind,
	pub setup: Vec<String>,
	pub teardown: Vec<String>,
	pub pulls_data_from: Vec<SqlDependency>,
	pub pushes_data_to: Vec<SqlDependency>,
	pub metadata: Metadata,
	/// Set for materialized views.
	pub materialized: Option<MaterializedView>,
}

impl SqlResource {
	pub fn is_view(&self) -> bool {
		self.kind == SqlResourceKind::View
	}

	pub fn is_materialized_view(&self) -> bool {
		self.kind == SqlResourceKind::MaterializedView
	}
}

impl Catalog {
	#[instrument(name = "catalog::sql_resource::create", level = "debug", skip(self, to_create), fields(name = %to_create.name))]
	pub fn create_sql_resource(&mut self, to_create: SqlResourceToCreate) -> Result<SqlResourceRef> {
		let metadata = self.resolve_metadata(to_create.metadata);
		self.register_sql_resource(SqlResource {
			name: to_create.name,
			kind: SqlResourceKind::Raw,
			setup: to_create.setup,
			teardown: to_create.teardown,
			pulls_data_from: to_create.pulls_data_from,
			pushes_data_to: to_create.pushes_data_to,
			metadata,
			materialized: None,
		})
	}

	pub(crate) fn register_sql_resource(&mut self, resource: SqlResource) -> Result<SqlResourceRef> {
		let kind = match resource.kind {
			SqlResourceKind::Raw => ResourceKind::SqlResource,
			SqlResourceKind::View => ResourceKind::View,
			SqlResourceKind::MaterializedView => ResourceKind::MaterializedView,
		};
		require_name(kind, &resource.name)?;

		let owns_namesake = resource.pushes_data_to.iter().any(|dependency| match dependency {
			SqlDependency::Table(table) => table.name == resource.name,
			_ => false,
		});
		if owns_namesake {
			return Err(CatalogError::InvalidValue {
				kind,
				name: resource.name,
				field: "pushesDataTo",
				reason: "the target table must not share the resource's name".to_string(),
			}
			.into());
		}

		let id = ResourceId::unversioned(resource.name.clone());
		let resource_ref = SqlResourceRef {
			name: resource.name.clone(),
		};
		let duplicates = self.config.duplicates;
		register(&mut self.sql_resources, duplicates, kind, &id, id.key(), resource)?;
		self.touch();
		Ok(resource_ref)
	}

	pub fn find_sql_resource(&self, name: &str) -> Option<&SqlResource> {
		self.sql_resources.get(name)
	}

	pub fn list_sql_resources(&self) -> impl Iterator<Item = &SqlResource> {
		self.sql_resources.values()
	}

	pub fn sql_resource_count(&self) -> usize {
		self.sql_resources.len()
	}
}
