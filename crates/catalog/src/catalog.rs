// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{collections::HashMap, sync::Arc};

use indexmap::IndexMap;
use moose_core::{
	CatalogConfig, DuplicatePolicy, Metadata, ResourceId,
	env::RuntimeEnv,
	location::{BacktraceLocation, LocationProvider, NoLocation},
};
use parking_lot::Mutex;
use tracing::{debug, instrument, warn};

use crate::{
	error::{CatalogError, ResourceKind},
	lineage::{Lineage, LineageSubject},
};

mod api;
mod cdc;
mod handle;
mod ingest_api;
mod materialized_view;
mod pipeline;
mod sql_resource;
mod stream;
mod table;
mod trace;
mod view;
mod web_app;
mod workflow;

pub use api::{Api, ApiRef, ApiToCreate};
use api::ApiIndex;
pub use cdc::{
	CDC_IS_DELETED, CDC_LSN, CDC_OP, CDC_TS, CdcSource, CdcSourceRef, CdcSourceToCreate, CdcTable, CdcTableRef,
	CdcTableToCreate, Derive, Snapshot,
};
pub use handle::CatalogHandle;
pub use ingest_api::{IngestApi, IngestApiRef, IngestApiToCreate};
pub use materialized_view::{
	MaterializedView, MaterializedViewRef, MaterializedViewToCreate, MvTarget, RefreshConfig, RefreshInterval,
	TimeSpan, TimeUnit,
};
pub use pipeline::{DEAD_LETTER_QUEUE_SUFFIX, IngestPipeline, PipelineToCreate, dead_letter_schema};
pub use sql_resource::{
	DependencySignature, SqlDependency, SqlResource, SqlResourceKind, SqlResourceRef, SqlResourceToCreate,
};
pub use stream::{
	Consumer, ConsumerToCreate, SchemaKind, SchemaReference, SchemaRegistryConfig, Stream, StreamRef, StreamToCreate, Transform,
	TransformToCreate,
};
pub use table::{OlapTable, OrderBy, TableIndex, TableRef, TableToCreate};
pub use view::{ViewRef, ViewToCreate};
pub use web_app::{
	AdapterKind, ExpressHandle, FastifyRouting, FrameworkApp, KoaCallback, KoaContext, RESERVED_MOUNT_PATHS,
	RequestHandler, WebApp, WebAppHandler, WebAppRef, WebAppToCreate, WebRequest, WebResponse,
};
pub use workflow::{Task, TaskToCreate, Workflow, WorkflowRef, WorkflowToCreate};

/// The registry of every declared resource.
///
/// One ordered collection per resource kind, keyed by composite key. Iteration order
/// is insertion order, and an overwrite under [`DuplicatePolicy::Replace`] keeps the
/// original position. Lookup indexes and lineage are derived lazily and dropped on
/// every mutation.
pub struct Catalog {
	config: CatalogConfig,
	location: Arc<dyn LocationProvider>,

	pub(crate) tables: IndexMap<String, OlapTable>,
	pub(crate) streams: IndexMap<String, Stream>,
	pub(crate) ingest_apis: IndexMap<String, IngestApi>,
	pub(crate) apis: IndexMap<String, Api>,
	pub(crate) sql_resources: IndexMap<String, SqlResource>,
	pub(crate) cdc_sources: IndexMap<String, CdcSource>,
	pub(crate) workflows: IndexMap<String, Workflow>,
	pub(crate) web_apps: IndexMap<String, WebApp>,
	pub(crate) pipelines: IndexMap<String, IngestPipeline>,

	api_index: Mutex<Option<Arc<ApiIndex>>>,
	lineage_cache: Mutex<HashMap<LineageSubject, Lineage>>,
}

impl Catalog {
	pub fn new(config: CatalogConfig) -> Self {
		let location: Arc<dyn LocationProvider> = if config.capture_source_location {
			Arc::new(BacktraceLocation::new())
		} else {
			Arc::new(NoLocation)
		};
		Self::with_location_provider(config, location)
	}

	pub fn from_env() -> Self {
		Self::new(CatalogConfig::from_env())
	}

	pub fn with_location_provider(config: CatalogConfig, location: Arc<dyn LocationProvider>) -> Self {
		Self {
			config,
			location,
			tables: IndexMap::new(),
			streams: IndexMap::new(),
			ingest_apis: IndexMap::new(),
			apis: IndexMap::new(),
			sql_resources: IndexMap::new(),
			cdc_sources: IndexMap::new(),
			workflows: IndexMap::new(),
			web_apps: IndexMap::new(),
			pipelines: IndexMap::new(),
			api_index: Mutex::new(None),
			lineage_cache: Mutex::new(HashMap::new()),
		}
	}

	/// An empty catalog sharing this one's configuration and location provider.
	pub fn fresh(&self) -> Self {
		Self::with_location_provider(self.config.clone(), self.location.clone())
	}

	pub fn config(&self) -> &CatalogConfig {
		&self.config
	}

	/// Environment accessor for declarations: markers while the infrastructure map is
	/// built, live values at runtime.
	pub fn runtime_env(&self) -> RuntimeEnv {
		RuntimeEnv::new(self.config.mode)
	}

	/// Drops every registered resource and every derived index.
	pub fn clear(&mut self) {
		self.tables.clear();
		self.streams.clear();
		self.ingest_apis.clear();
		self.apis.clear();
		self.sql_resources.clear();
		self.cdc_sources.clear();
		self.workflows.clear();
		self.web_apps.clear();
		self.pipelines.clear();
		self.touch();
		debug!("catalog cleared");
	}

	pub fn is_empty(&self) -> bool {
		self.tables.is_empty()
			&& self.streams.is_empty()
			&& self.ingest_apis.is_empty()
			&& self.apis.is_empty()
			&& self.sql_resources.is_empty()
			&& self.cdc_sources.is_empty()
			&& self.workflows.is_empty()
			&& self.web_apps.is_empty()
			&& self.pipelines.is_empty()
	}

	/// Invalidates everything derived from the collections.
	pub(crate) fn touch(&mut self) {
		*self.api_index.get_mut() = None;
		self.lineage_cache.get_mut().clear();
	}

	pub(crate) fn resolve_metadata(&self, mut metadata: Metadata) -> Metadata {
		if metadata.source.is_none() && self.config.capture_source_location {
			metadata.source = self.location.locate();
		}
		metadata
	}

	/// Runs a composite declaration as one unit. When `declare` fails, every table,
	/// stream, ingest API, CDC source and pipeline registration it made is undone.
	#[instrument(name = "catalog::atomically", level = "trace", skip_all)]
	pub(crate) fn atomically<T>(&mut self, declare: impl FnOnce(&mut Self) -> crate::Result<T>) -> crate::Result<T> {
		let savepoint = Savepoint {
			tables: self.tables.clone(),
			streams: self.streams.clone(),
			ingest_apis: self.ingest_apis.clone(),
			cdc_sources: self.cdc_sources.clone(),
			pipelines: self.pipelines.clone(),
		};
		let result = declare(self);
		if let Err(err) = &result {
			self.tables = savepoint.tables;
			self.streams = savepoint.streams;
			self.ingest_apis = savepoint.ingest_apis;
			self.cdc_sources = savepoint.cdc_sources;
			self.pipelines = savepoint.pipelines;
			self.touch();
			debug!(code = %err.code(), "declaration rolled back");
		}
		result
	}

	pub(crate) fn check_available<T>(
		&self,
		map: &IndexMap<String, T>,
		kind: ResourceKind,
		id: &ResourceId,
		key: &str,
	) -> crate::Result<()> {
		if map.contains_key(key) && self.config.duplicates == DuplicatePolicy::Reject {
			return Err(CatalogError::AlreadyExists {
				kind,
				name: id.name.clone(),
				version: id.version.clone(),
			}
			.into());
		}
		Ok(())
	}
}

/// The collections a composite declaration writes to, as they were before it ran.
struct Savepoint {
	tables: IndexMap<String, OlapTable>,
	streams: IndexMap<String, Stream>,
	ingest_apis: IndexMap<String, IngestApi>,
	cdc_sources: IndexMap<String, CdcSource>,
	pipelines: IndexMap<String, IngestPipeline>,
}

/// Inserts under `key`, honoring the duplicate policy.
pub(crate) fn register<T>(
	map: &mut IndexMap<String, T>,
	duplicates: DuplicatePolicy,
	kind: ResourceKind,
	id: &ResourceId,
	key: String,
	value: T,
) -> crate::Result<()> {
	if map.contains_key(&key) {
		match duplicates {
			DuplicatePolicy::Reject => {
				return Err(CatalogError::AlreadyExists {
					kind,
					name: id.name.clone(),
					version: id.version.clone(),
				}
				.into());
			}
			DuplicatePolicy::Replace => {
				warn!(%kind, %key, "replacing existing registration");
			}
		}
	}
	map.insert(key, value);
	Ok(())
}

pub(crate) fn require_name(kind: ResourceKind, name: &str) -> crate::Result<()> {
	if name.trim().is_empty() {
		return Err(CatalogError::MissingField {
			kind,
			name: name.to_string(),
			field: "name",
		}
		.into());
	}
	Ok(())
}
