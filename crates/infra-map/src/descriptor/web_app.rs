// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use moose_catalog::{Catalog, WebApp, lineage::Lineage};
use moose_core::Metadata;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebAppDescriptor {
	pub name: String,
	pub mount_path: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub metadata: Option<Metadata>,
	#[serde(flatten)]
	pub lineage: Lineage,
}

impl WebAppDescriptor {
	pub fn describe(catalog: &Catalog, app: &WebApp) -> Self {
		Self {
			name: app.name.clone(),
			mount_path: app.mount_path.clone(),
			metadata: super::non_empty(&app.metadata),
			lineage: catalog.web_app_lineage(&app.name).unwrap_or_default(),
		}
	}
}
