// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use moose_catalog::{Catalog, IngestApi, StreamRef};
use moose_core::{Column, Metadata};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamTarget {
	pub name: String,
	pub kind: &'static str,
}

impl From<&StreamRef> for StreamTarget {
	fn from(stream: &StreamRef) -> Self {
		Self {
			name: stream.name.clone(),
			kind: "stream",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestApiDescriptor {
	pub name: String,
	pub columns: Vec<Column>,
	pub write_to: StreamTarget,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub dead_letter_queue: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub version: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub path: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub metadata: Option<Metadata>,
	/// JSON schema of accepted payloads.
	pub schema: Value,
	pub allow_extra_fields: bool,
}

impl IngestApiDescriptor {
	pub fn describe(catalog: &Catalog, api: &IngestApi) -> Self {
		Self {
			name: api.id.name.clone(),
			columns: api.typed.columns().to_vec(),
			write_to: StreamTarget::from(&api.destination),
			dead_letter_queue: api.dead_letter_queue.as_ref().map(|dlq| dlq.name.clone()),
			version: api.id.version.clone(),
			path: api.path.clone(),
			metadata: super::metadata(catalog, &api.typed.metadata, api.pipeline.as_deref()),
			schema: api.typed.json_schema().clone(),
			allow_extra_fields: api.typed.allow_extra_fields,
		}
	}
}
