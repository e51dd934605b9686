// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::fmt;

use moose_core::{LifeCycle, Metadata, Model, ResourceId, Schema};
use serde::Serialize;
use tracing::{instrument, warn};

use crate::{
	Result,
	catalog::{Catalog, TableRef, register, require_name},
	error::{CatalogError, ResourceKind},
	handler::{ConsumerHandler, MultiTransformHandler, TransformHandler},
	typed::TypedResource,
};

pub const DEFAULT_RETENTION_PERIOD: u64 = 60 * 60 * 24 * 7;
pub const DEFAULT_PARTITION_COUNT: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamRef {
	pub name: String,
	pub version: Option<String>,
}

impl StreamRef {
	pub fn id(&self) -> ResourceId {
		ResourceId::new(self.name.clone(), self.version.clone())
	}

	pub fn key(&self) -> String {
		self.id().key()
	}

	/// Name of the topic on the broker: version dots become underscores.
	pub fn physical_name(&self) -> String {
		match &self.version {
			Some(version) => format!("{}_{}", self.name, version.replace('.', "_")),
			None => self.name.clone(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SchemaKind {
	Json,
	Avro,
	Protobuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SchemaReference {
	SubjectLatest(String),
	SubjectVersion {
		subject: String,
		version: u32,
	},
	Id(u32),
}

/// Where the broker's schema registry keeps the record schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaRegistryConfig {
	pub kind: SchemaKind,
	pub reference: SchemaReference,
}

#[derive(Debug, Clone, Default)]
pub struct StreamToCreate {
	pub name: String,
	pub version: Option<String>,
	pub schema: Option<Schema>,
	/// Seconds; defaults to seven days.
	pub retention_period: Option<u64>,
	pub partition_count: Option<u32>,
	/// Table the stream syncs into.
	pub destination: Option<TableRef>,
	pub schema_config: Option<SchemaRegistryConfig>,
	pub life_cycle: Option<LifeCycle>,
	pub metadata: Metadata,
}

impl StreamToCreate {
	pub fn new(name: impl Into<String>, schema: Schema) -> Self {
		Self {
			name: name.into(),
			schema: Some(schema),
			..Default::default()
		}
	}

	pub fn of<M: Model>(name: impl Into<String>) -> Self {
		Self::new(name, M::schema())
	}
}

#[derive(Clone)]
pub struct Transform {
	pub destination: StreamRef,
	pub version: Option<String>,
	pub metadata: Metadata,
	pub handler: TransformHandler,
}

impl fmt::Debug for Transform {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Transform")
			.field("destination", &self.destination)
			.field("version", &self.version)
			.field("metadata", &self.metadata)
			.finish_non_exhaustive()
	}
}

pub struct TransformToCreate {
	pub destination: StreamRef,
	pub version: Option<String>,
	pub metadata: Metadata,
	pub handler: TransformHandler,
}

impl TransformToCreate {
	pub fn new(destination: &StreamRef, handler: TransformHandler) -> Self {
		Self {
			destination: destination.clone(),
			version: None,
			metadata: Metadata::default(),
			handler,
		}
	}
}

#[derive(Clone)]
pub struct Consumer {
	pub version: Option<String>,
	pub handler: ConsumerHandler,
}

impl fmt::Debug for Consumer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Consumer").field("version", &self.version).finish_non_exhaustive()
	}
}

pub struct ConsumerToCreate {
	pub version: Option<String>,
	pub handler: ConsumerHandler,
}

impl ConsumerToCreate {
	pub fn new(handler: ConsumerHandler) -> Self {
		Self {
			version: None,
			handler,
		}
	}
}

#[derive(Clone)]
pub struct Stream {
	pub typed: TypedResource,
	pub id: StreamRef,
	pub retention_period: u64,
	pub partition_count: u32,
	pub destination: Option<TableRef>,
	pub transforms: Vec<Transform>,
	pub multi_transform: Option<MultiTransformHandler>,
	pub consumers: Vec<Consumer>,
	pub schema_config: Option<SchemaRegistryConfig>,
	pub life_cycle: Option<LifeCycle>,
	pub pipeline: Option<String>,
}

impl fmt::Debug for Stream {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Stream")
			.field("id", &self.id)
			.field("retention_period", &self.retention_period)
			.field("partition_count", &self.partition_count)
			.field("destination", &self.destination)
			.field("transforms", &self.transforms)
			.field("has_multi_transform", &self.multi_transform.is_some())
			.field("consumers", &self.consumers)
			.finish_non_exhaustive()
	}
}

impl Stream {
	pub fn name(&self) -> &str {
		&self.id.name
	}

	pub fn version(&self) -> Option<&str> {
		self.id.version.as_deref()
	}

	pub fn has_multi_transform(&self) -> bool {
		self.multi_transform.is_some()
	}
}

impl Catalog {
	#[instrument(name = "catalog::stream::create", level = "debug", skip(self, to_create), fields(name = %to_create.name))]
	pub fn create_stream(&mut self, to_create: StreamToCreate) -> Result<StreamRef> {
		self.create_stream_in(to_create, None)
	}

	pub(crate) fn create_stream_in(&mut self, to_create: StreamToCreate, pipeline: Option<&str>) -> Result<StreamRef> {
		require_name(ResourceKind::Stream, &to_create.name)?;

		if to_create.partition_count == Some(0) {
			return Err(CatalogError::InvalidValue {
				kind: ResourceKind::Stream,
				name: to_create.name,
				field: "partitionCount",
				reason: "must be at least 1".to_string(),
			}
			.into());
		}

		if let Some(destination) = &to_create.destination {
			if !self.tables.contains_key(&destination.key()) {
				return Err(CatalogError::NotFound {
					kind: ResourceKind::Table,
					name: destination.name.clone(),
					version: destination.version.clone(),
				}
				.into());
			}
		}

		let metadata = self.resolve_metadata(to_create.metadata);
		let typed = TypedResource::new(ResourceKind::Stream, &to_create.name, to_create.schema, metadata)?;

		let stream_ref = StreamRef {
			name: to_create.name,
			version: to_create.version,
		};
		let id = stream_ref.id();
		let stream = Stream {
			typed,
			id: stream_ref.clone(),
			retention_period: to_create.retention_period.unwrap_or(DEFAULT_RETENTION_PERIOD),
			partition_count: to_create.partition_count.unwrap_or(DEFAULT_PARTITION_COUNT),
			destination: to_create.destination,
			transforms: vec![],
			multi_transform: None,
			consumers: vec![],
			schema_config: to_create.schema_config,
			life_cycle: to_create.life_cycle,
			pipeline: pipeline.map(str::to_string),
		};

		let duplicates = self.config.duplicates;
		register(&mut self.streams, duplicates, ResourceKind::Stream, &id, id.key(), stream)?;
		self.touch();
		Ok(stream_ref)
	}

	/// Forwards records of `source` into `to_create.destination` through the handler.
	#[instrument(name = "catalog::stream::add_transform", level = "debug", skip(self, to_create), fields(source = %source.name, destination = %to_create.destination.name))]
	pub fn add_transform(&mut self, source: &StreamRef, to_create: TransformToCreate) -> Result<()> {
		if !self.streams.contains_key(&to_create.destination.key()) {
			return Err(stream_not_found(&to_create.destination));
		}
		let metadata = self.resolve_metadata(to_create.metadata);
		let duplicates = self.config.duplicates;
		let stream = self.streams.get_mut(&source.key()).ok_or_else(|| stream_not_found(source))?;

		let transform = Transform {
			destination: to_create.destination,
			version: to_create.version,
			metadata,
			handler: to_create.handler,
		};
		let existing = stream
			.transforms
			.iter()
			.position(|t| t.destination == transform.destination && t.version == transform.version);
		match existing {
			Some(_) if duplicates == moose_core::DuplicatePolicy::Reject => {
				return Err(CatalogError::AlreadyExists {
					kind: ResourceKind::Transform,
					name: format!("{} -> {}", source.name, transform.destination.name),
					version: transform.version,
				}
				.into());
			}
			Some(position) => {
				warn!(source = %source.name, destination = %transform.destination.name, "replacing existing transform");
				stream.transforms[position] = transform;
			}
			None => stream.transforms.push(transform),
		}
		self.touch();
		Ok(())
	}

	#[instrument(name = "catalog::stream::add_consumer", level = "debug", skip(self, to_create), fields(stream = %stream.name))]
	pub fn add_consumer(&mut self, stream: &StreamRef, to_create: ConsumerToCreate) -> Result<()> {
		let duplicates = self.config.duplicates;
		let target = self.streams.get_mut(&stream.key()).ok_or_else(|| stream_not_found(stream))?;

		let consumer = Consumer {
			version: to_create.version,
			handler: to_create.handler,
		};
		match target.consumers.iter().position(|c| c.version == consumer.version) {
			Some(_) if duplicates == moose_core::DuplicatePolicy::Reject => {
				return Err(CatalogError::AlreadyExists {
					kind: ResourceKind::Consumer,
					name: stream.name.clone(),
					version: consumer.version,
				}
				.into());
			}
			Some(position) => target.consumers[position] = consumer,
			None => target.consumers.push(consumer),
		}
		self.touch();
		Ok(())
	}

	/// Installs the fan-out function of `stream`, replacing any previous one.
	pub fn set_multi_transform(&mut self, stream: &StreamRef, handler: MultiTransformHandler) -> Result<()> {
		let target = self.streams.get_mut(&stream.key()).ok_or_else(|| stream_not_found(stream))?;
		target.multi_transform = Some(handler);
		self.touch();
		Ok(())
	}

	pub fn find_stream(&self, key: &str) -> Option<&Stream> {
		self.streams.get(key)
	}

	pub fn find_stream_by_name(&self, name: &str, version: Option<&str>) -> Option<&Stream> {
		self.streams.get(&moose_core::identity::composite_key(name, version))
	}

	pub fn list_streams(&self) -> impl Iterator<Item = &Stream> {
		self.streams.values()
	}

	pub fn stream_count(&self) -> usize {
		self.streams.len()
	}
}

fn stream_not_found(stream: &StreamRef) -> moose_type::Error {
	CatalogError::NotFound {
		kind: ResourceKind::Stream,
		name: stream.name.clone(),
		version: stream.version.clone(),
	}
	.into()
}
