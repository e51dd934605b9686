// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! One plain descriptor per resource kind, shaped exactly as the provisioner reads it.

mod api;
mod ingest_api;
mod sql_resource;
mod table;
mod topic;
mod web_app;
mod workflow;

pub use api::ApiDescriptor;
pub use ingest_api::{IngestApiDescriptor, StreamTarget};
use moose_catalog::{Catalog, IngestPipeline};
use moose_core::Metadata;
pub use sql_resource::SqlResourceDescriptor;
pub use table::TableDescriptor;
pub use topic::{ConsumerDescriptor, TopicDescriptor, TransformationTarget};
pub use web_app::WebAppDescriptor;
pub use workflow::WorkflowDescriptor;

fn pipeline<'a>(catalog: &'a Catalog, name: Option<&str>) -> Option<&'a IngestPipeline> {
	let name = name?;
	catalog.list_pipelines().find(|pipeline| pipeline.name == name)
}

/// A component without a description of its own takes the description of the
/// pipeline that declared it. Empty metadata is omitted.
pub(crate) fn metadata(catalog: &Catalog, own: &Metadata, pipeline_name: Option<&str>) -> Option<Metadata> {
	let mut metadata = own.clone();
	if metadata.description.is_none() {
		if let Some(pipeline) = pipeline(catalog, pipeline_name) {
			metadata.description = pipeline.metadata.description.clone();
			if metadata.source.is_none() {
				metadata.source = pipeline.metadata.source.clone();
			}
		}
	}
	(!metadata.is_empty()).then_some(metadata)
}

fn non_empty(metadata: &Metadata) -> Option<Metadata> {
	(!metadata.is_empty()).then(|| metadata.clone())
}
