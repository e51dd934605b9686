// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use moose_core::Metadata;
use tracing::instrument;

use crate::{
	Result,
	catalog::{Catalog, SqlDependency, SqlResource, SqlResourceKind},
	error::{CatalogError, ResourceKind},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewRef {
	pub name: String,
}

impl ViewRef {
	pub fn reference(&self) -> String {
		format!("`{}`", self.name)
	}
}

#[derive(Debug, Clone, Default)]
pub struct ViewToCreate {
	pub name: String,
	pub select_statement: String,
	/// Tables and views the SELECT reads.
	pub base_tables: Vec<SqlDependency>,
	pub metadata: Metadata,
}

impl ViewToCreate {
	pub fn new(name: impl Into<String>, select_statement: impl Into<String>, base_tables: Vec<SqlDependency>) -> Self {
		Self {
			name: name.into(),
			select_statement: select_statement.into(),
			base_tables,
			metadata: Metadata::default(),
		}
	}
}

impl Catalog {
	/// Registers a plain view as a SQL resource with generated DDL.
	#[instrument(name = "catalog::view::create", level = "debug", skip(self, to_create), fields(name = %to_create.name))]
	pub fn create_view(&mut self, to_create: ViewToCreate) -> Result<ViewRef> {
		if to_create.select_statement.trim().is_empty() {
			return Err(CatalogError::MissingField {
				kind: ResourceKind::View,
				name: to_create.name,
				field: "selectStatement",
			}
			.into());
		}

		let view = ViewRef {
			name: to_create.name,
		};
		let metadata = self.resolve_metadata(to_create.metadata);
		self.register_sql_resource(SqlResource {
			name: view.name.clone(),
			kind: SqlResourceKind::View,
			setup: vec![format!("CREATE VIEW IF NOT EXISTS {} AS {}", view.reference(), to_create.select_statement.trim())],
			teardown: vec![format!("DROP VIEW IF EXISTS {}", view.reference())],
			pulls_data_from: to_create.base_tables,
			pushes_data_to: vec![],
			metadata,
			materialized: None,
		})?;
		Ok(view)
	}

	pub fn find_view(&self, name: &str) -> Option<&SqlResource> {
		self.sql_resources.get(name).filter(|resource| resource.is_view())
	}
}
