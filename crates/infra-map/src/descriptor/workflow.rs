// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use moose_catalog::{Catalog, Workflow, lineage::Lineage};
use moose_core::Metadata;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDescriptor {
	pub name: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub retries: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub timeout: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub schedule: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub metadata: Option<Metadata>,
	#[serde(flatten)]
	pub lineage: Lineage,
}

impl WorkflowDescriptor {
	pub fn describe(catalog: &Catalog, workflow: &Workflow) -> Self {
		Self {
			name: workflow.name.clone(),
			retries: workflow.retries,
			timeout: workflow.timeout.clone(),
			schedule: workflow.schedule.clone(),
			metadata: super::non_empty(&workflow.metadata),
			lineage: catalog.workflow_lineage(&workflow.name).unwrap_or_default(),
		}
	}
}
