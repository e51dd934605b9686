// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use moose_core::{Column, DataType, LifeCycle, Metadata, Model, ResourceId, Schema};
use tracing::{debug, instrument};

use crate::{
	Result,
	catalog::{
		Catalog, Derive, IngestApiRef, IngestApiToCreate, StreamRef, StreamToCreate, TableRef, TableToCreate,
		register, require_name,
	},
	engine::EngineConfig,
	error::{CatalogError, ResourceKind},
};

pub const DEAD_LETTER_QUEUE_SUFFIX: &str = "DeadLetterQueue";

/// Records that failed ingestion, with the reason they failed.
pub fn dead_letter_schema() -> Schema {
	Schema::new(vec![
		Column::new("originalRecord", DataType::Json),
		Column::new("errorMessage", DataType::String),
		Column::new("errorType", DataType::String),
		Column::new("failedAt", DataType::DateTime {
			precision: None,
		}),
		Column::new("source", DataType::String),
	])
}

/// One declaration for table, stream, dead-letter queue and ingest endpoint, all
/// named after the pipeline. Every component is derived unless disabled.
#[derive(Clone, Default)]
pub struct PipelineToCreate {
	pub name: String,
	pub version: Option<String>,
	pub schema: Option<Schema>,
	pub table: Derive<TableToCreate>,
	pub stream: Derive<StreamToCreate>,
	pub dead_letter_queue: Derive<StreamToCreate>,
	pub ingest_api: Derive<IngestApiToCreate>,
	pub life_cycle: Option<LifeCycle>,
	/// Inherited by components that carry no description of their own.
	pub metadata: Metadata,
}

impl PipelineToCreate {
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

#[derive(Debug, Clone)]
pub struct IngestPipeline {
	pub name: String,
	pub version: Option<String>,
	pub life_cycle: Option<LifeCycle>,
	pub metadata: Metadata,
	pub table: Option<TableRef>,
	pub stream: Option<StreamRef>,
	pub dead_letter_queue: Option<StreamRef>,
	pub ingest_api: Option<IngestApiRef>,
}

impl IngestPipeline {
	pub fn id(&self) -> ResourceId {
		ResourceId::new(self.name.clone(), self.version.clone())
	}
}

fn derived<T: Default>(derive: Derive<T>) -> Option<T> {
	match derive {
		Derive::Auto => Some(T::default()),
		Derive::Disabled => None,
		Derive::Custom(config) => Some(config),
	}
}

impl Catalog {
	#[instrument(name = "catalog::pipeline::create", level = "debug", skip(self, to_create), fields(name = %to_create.name))]
	pub fn create_pipeline(&mut self, to_create: PipelineToCreate) -> Result<IngestPipeline> {
		let kind = ResourceKind::IngestPipeline;
		require_name(kind, &to_create.name)?;
		let Some(schema) = to_create.schema else {
			return Err(CatalogError::SchemaMissing {
				kind,
				name: to_create.name,
			}
			.into());
		};

		let name = to_create.name;
		let version = to_create.version;
		let life_cycle = to_create.life_cycle;
		let id = ResourceId::new(name.clone(), version.clone());
		self.check_available(&self.pipelines, kind, &id, &id.key())?;

		let table = derived(to_create.table).map(|table| TableToCreate {
			name: name.clone(),
			version: version.clone().or(table.version),
			schema: Some(schema.clone()),
			life_cycle: table.life_cycle.or(life_cycle),
			..table
		});
		if let Some(EngineConfig::Merge {
			..
		}) = table.as_ref().and_then(|table| table.engine.as_ref())
		{
			return Err(CatalogError::UnsupportedEngine {
				kind,
				name,
				engine: "Merge".to_string(),
				reason: "Merge tables are read-only views over other tables".to_string(),
			}
			.into());
		}
		let table_ref = table.as_ref().map(|table| TableRef {
			name: table.name.clone(),
			version: table.version.clone(),
			database: table.database.clone(),
		});

		let stream = derived(to_create.stream).map(|stream| StreamToCreate {
			name: name.clone(),
			version: version.clone().or(stream.version),
			schema: Some(schema.clone()),
			destination: table_ref.clone(),
			life_cycle: stream.life_cycle.or(life_cycle),
			..stream
		});
		let dead_letter_queue = derived(to_create.dead_letter_queue).map(|dlq| StreamToCreate {
			name: format!("{}{}", name, DEAD_LETTER_QUEUE_SUFFIX),
			version: version.clone().or(dlq.version),
			schema: Some(dead_letter_schema()),
			life_cycle: dlq.life_cycle.or(life_cycle),
			..dlq
		});
		let stream_ref = |stream: &StreamToCreate| StreamRef {
			name: stream.name.clone(),
			version: stream.version.clone(),
		};
		let stream_ref_value = stream.as_ref().map(stream_ref);
		let dead_letter_ref = dead_letter_queue.as_ref().map(stream_ref);

		let ingest_api = match (derived(to_create.ingest_api), &stream_ref_value) {
			(None, _) => None,
			(Some(_), None) => {
				return Err(CatalogError::InvalidValue {
					kind,
					name,
					field: "ingestApi",
					reason: "an ingest API needs the pipeline's stream".to_string(),
				}
				.into());
			}
			(Some(api), Some(destination)) => Some(IngestApiToCreate {
				name: name.clone(),
				version: version.clone().or(api.version),
				schema: Some(schema.clone()),
				destination: Some(destination.clone()),
				dead_letter_queue: dead_letter_ref.clone(),
				..api
			}),
		};

		// name collisions fail before anything is created
		if let Some(table) = &table {
			let table_id = ResourceId::new(table.name.clone(), table.version.clone());
			self.check_available(&self.tables, ResourceKind::Table, &table_id, &table_id.key())?;
		}
		for stream in stream.iter().chain(dead_letter_queue.iter()) {
			let stream_id = ResourceId::new(stream.name.clone(), stream.version.clone());
			self.check_available(&self.streams, ResourceKind::Stream, &stream_id, &stream_id.key())?;
		}
		if let Some(api) = &ingest_api {
			let api_id = ResourceId::new(api.name.clone(), api.version.clone());
			self.check_available(&self.ingest_apis, ResourceKind::IngestApi, &api_id, &api_id.key())?;
		}

		let metadata = self.resolve_metadata(to_create.metadata);
		self.atomically(|catalog| {
			let table = table.map(|table| catalog.create_table_in(table, Some(&name))).transpose()?;
			let stream = stream.map(|stream| catalog.create_stream_in(stream, Some(&name))).transpose()?;
			let dead_letter_queue =
				dead_letter_queue.map(|dlq| catalog.create_stream_in(dlq, Some(&name))).transpose()?;
			let ingest_api = ingest_api.map(|api| catalog.create_ingest_api_in(api, Some(&name))).transpose()?;
			debug!(
				table = table.is_some(),
				stream = stream.is_some(),
				dead_letter_queue = dead_letter_queue.is_some(),
				ingest_api = ingest_api.is_some(),
				"pipeline components created"
			);

			let pipeline = IngestPipeline {
				name: name.clone(),
				version,
				life_cycle,
				metadata,
				table,
				stream,
				dead_letter_queue,
				ingest_api,
			};
			let duplicates = catalog.config.duplicates;
			register(&mut catalog.pipelines, duplicates, kind, &id, id.key(), pipeline.clone())?;
			catalog.touch();
			Ok(pipeline)
		})
	}

	pub fn find_pipeline(&self, key: &str) -> Option<&IngestPipeline> {
		self.pipelines.get(key)
	}

	pub fn list_pipelines(&self) -> impl Iterator<Item = &IngestPipeline> {
		self.pipelines.values()
	}
}
