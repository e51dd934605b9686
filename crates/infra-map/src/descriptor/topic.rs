// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use moose_catalog::{Catalog, SchemaRegistryConfig, Stream};
use moose_core::{Column, LifeCycle, Metadata};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformationTarget {
	pub name: String,
	pub kind: &'static str,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub version: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsumerDescriptor {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicDescriptor {
	pub name: String,
	pub columns: Vec<Column>,
	pub retention_period: u64,
	pub partition_count: u32,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub target_table: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub target_table_version: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub version: Option<String>,
	pub transformation_targets: Vec<TransformationTarget>,
	pub has_multi_transform: bool,
	pub consumers: Vec<ConsumerDescriptor>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub metadata: Option<Metadata>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub life_cycle: Option<LifeCycle>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub schema_config: Option<SchemaRegistryConfig>,
}

impl TopicDescriptor {
	pub fn describe(catalog: &Catalog, stream: &Stream) -> Self {
		let transformation_targets = stream
			.transforms
			.iter()
			.map(|transform| TransformationTarget {
				name: transform.destination.name.clone(),
				kind: "stream",
				version: transform.version.clone().or_else(|| transform.destination.version.clone()),
				metadata: super::non_empty(&transform.metadata),
			})
			.collect();
		let consumers = stream
			.consumers
			.iter()
			.map(|consumer| ConsumerDescriptor {
				version: consumer.version.clone(),
			})
			.collect();

		Self {
			name: stream.id.name.clone(),
			columns: stream.typed.columns().to_vec(),
			retention_period: stream.retention_period,
			partition_count: stream.partition_count,
			target_table: stream.destination.as_ref().map(|table| table.name.clone()),
			target_table_version: stream.destination.as_ref().and_then(|table| table.version.clone()),
			version: stream.id.version.clone(),
			transformation_targets,
			has_multi_transform: stream.has_multi_transform(),
			consumers,
			metadata: super::metadata(catalog, &stream.typed.metadata, stream.pipeline.as_deref()),
			life_cycle: stream.life_cycle,
			schema_config: stream.schema_config.clone(),
		}
	}
}
