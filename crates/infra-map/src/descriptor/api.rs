// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use moose_catalog::{Api, Catalog, lineage::Lineage};
use moose_core::{Column, Metadata};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDescriptor {
	pub name: String,
	pub query_params: Vec<Column>,
	pub response_schema: Value,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub version: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub path: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub metadata: Option<Metadata>,
	#[serde(flatten)]
	pub lineage: Lineage,
}

impl ApiDescriptor {
	pub fn describe(catalog: &Catalog, api: &Api) -> Self {
		Self {
			name: api.id.name.clone(),
			query_params: api.typed.columns().to_vec(),
			response_schema: api.response_schema.clone(),
			version: api.id.version.clone(),
			path: api.path.clone(),
			metadata: super::non_empty(&api.typed.metadata),
			lineage: catalog.api_lineage(&api.id.key()).unwrap_or_default(),
		}
	}
}
