// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use moose_catalog::{DependencySignature, SqlResource};
use moose_core::Metadata;
use serde::Serialize;

use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlResourceDescriptor {
	pub name: String,
	pub setup: Vec<String>,
	pub teardown: Vec<String>,
	pub pulls_data_from: Vec<DependencySignature>,
	pub pushes_data_to: Vec<DependencySignature>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub metadata: Option<Metadata>,
}

impl SqlResourceDescriptor {
	/// Fails when a dependency is of a kind SQL cannot reference.
	pub fn describe(resource: &SqlResource) -> Result<Self> {
		let signatures = |dependencies: &[moose_catalog::SqlDependency]| {
			dependencies.iter().map(|dependency| dependency.signature(&resource.name)).collect::<Result<Vec<_>>>()
		};
		Ok(Self {
			name: resource.name.clone(),
			setup: resource.setup.clone(),
			teardown: resource.teardown.clone(),
			pulls_data_from: signatures(&resource.pulls_data_from)?,
			pushes_data_to: signatures(&resource.pushes_data_to)?,
			metadata: super::non_empty(&resource.metadata),
		})
	}
}
