// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use indexmap::IndexMap;
use moose_catalog::{Catalog, OlapTable, OrderBy, TableIndex, engine::EngineConfig};
use moose_core::{Column, LifeCycle, Metadata};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDescriptor {
	pub name: String,
	pub columns: Vec<Column>,
	pub order_by: OrderBy,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub partition_by: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub sample_by_expression: Option<String>,
	pub engine_config: EngineConfig,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub version: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub metadata: Option<Metadata>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub life_cycle: Option<LifeCycle>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub table_settings: Option<IndexMap<String, String>>,
	pub indexes: Vec<TableIndex>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub ttl: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub database: Option<String>,
}

impl TableDescriptor {
	pub fn describe(catalog: &Catalog, table: &OlapTable) -> Self {
		let mut settings = table.settings.clone();
		for (key, value) in table.engine.default_settings() {
			settings.entry(key.to_string()).or_insert_with(|| value.to_string());
		}

		let (order_by, partition_by, sample_by_expression) = if table.engine.supports_ordering() {
			(table.order_by.clone(), table.partition_by.clone(), table.sample_by_expression.clone())
		} else {
			let dropped_order = table.order_by != OrderBy::default();
			if dropped_order || table.partition_by.is_some() || table.sample_by_expression.is_some() {
				debug!(
					table = %table.id.key(),
					engine = table.engine.name(),
					order_by = dropped_order,
					partition_by = table.partition_by.is_some(),
					sample_by = table.sample_by_expression.is_some(),
					"dropping clauses the engine does not support"
				);
			}
			(OrderBy::default(), None, None)
		};

		Self {
			name: table.id.name.clone(),
			columns: table.typed.columns().to_vec(),
			order_by,
			partition_by,
			sample_by_expression,
			engine_config: table.engine.clone(),
			version: table.id.version.clone(),
			metadata: super::metadata(catalog, &table.typed.metadata, table.pipeline.as_deref()),
			life_cycle: table.life_cycle,
			table_settings: (!settings.is_empty()).then_some(settings),
			indexes: table.indexes.clone(),
			ttl: table.ttl.clone(),
			database: table.id.database.clone(),
		}
	}
}
