// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{collections::HashMap, fmt, sync::Arc};

use moose_core::{Metadata, Model, ResourceId, Schema};
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::{
	Result,
	catalog::{Catalog, register, require_name},
	error::{CatalogError, ResourceKind},
	handler::ApiHandler,
	typed::TypedResource,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApiRef {
	pub name: String,
	pub version: Option<String>,
}

impl ApiRef {
	pub fn id(&self) -> ResourceId {
		ResourceId::new(self.name.clone(), self.version.clone())
	}

	/// `name` or `name:version`.
	pub fn key(&self) -> String {
		self.id().api_key()
	}
}

#[derive(Clone)]
pub struct ApiToCreate {
	pub name: String,
	pub version: Option<String>,
	pub query_params: Option<Schema>,
	pub response_schema: Value,
	/// Custom URL path. A versioned endpoint also gets the version appended.
	pub path: Option<String>,
	pub metadata: Metadata,
	pub handler: Option<ApiHandler>,
}

impl Default for ApiToCreate {
	fn default() -> Self {
		Self {
			name: String::new(),
			version: None,
			query_params: None,
			response_schema: json!({}),
			path: None,
			metadata: Metadata::default(),
			handler: None,
		}
	}
}

impl ApiToCreate {
	pub fn new(name: impl Into<String>, query_params: Schema, handler: ApiHandler) -> Self {
		Self {
			name: name.into(),
			query_params: Some(query_params),
			handler: Some(handler),
			..Default::default()
		}
	}

	pub fn of<M: Model>(name: impl Into<String>, handler: ApiHandler) -> Self {
		Self::new(name, M::schema(), handler)
	}
}

#[derive(Clone)]
pub struct Api {
	pub typed: TypedResource,
	pub id: ApiRef,
	pub response_schema: Value,
	pub path: Option<String>,
	pub handler: ApiHandler,
}

impl fmt::Debug for Api {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Api")
			.field("id", &self.id)
			.field("path", &self.path)
			.field("typed", &self.typed)
			.finish_non_exhaustive()
	}
}

impl Api {
	pub fn name(&self) -> &str {
		&self.id.name
	}

	pub fn version(&self) -> Option<&str> {
		self.id.version.as_deref()
	}

	/// The path this endpoint answers on besides its key, if it has a custom one.
	pub fn claimed_path(&self) -> Option<String> {
		self.path.as_deref().map(|path| claimed_path(path, self.version()))
	}

	fn claims(&self) -> Vec<String> {
		let mut claims = vec![normalize(&self.id.key())];
		if let Some(path) = self.claimed_path() {
			claims.push(normalize(&path));
		}
		claims
	}
}

fn claimed_path(path: &str, version: Option<&str>) -> String {
	let Some(version) = version else {
		return path.to_string();
	};
	let trimmed = path.trim_end_matches('/');
	if trimmed == version || trimmed.ends_with(&format!("/{}", version)) {
		trimmed.to_string()
	} else {
		format!("{}/{}", trimmed, version)
	}
}

fn normalize(path: &str) -> String {
	path.trim_matches('/').to_string()
}

/// Lookup forms derived from the endpoint collection. Rebuilt after any mutation.
#[derive(Debug, Default)]
pub(crate) struct ApiIndex {
	by_path: HashMap<String, String>,
	aliases: HashMap<String, String>,
}

impl ApiIndex {
	fn build(apis: &indexmap::IndexMap<String, Api>) -> Self {
		let mut by_path = HashMap::new();
		let mut versions: HashMap<&str, Vec<&str>> = HashMap::new();
		let mut unversioned = std::collections::HashSet::new();

		for (key, api) in apis {
			if let Some(path) = api.claimed_path() {
				by_path.insert(normalize(&path), key.clone());
			}
			match api.version() {
				Some(_) => versions.entry(api.name()).or_default().push(key),
				None => {
					unversioned.insert(api.name());
				}
			}
		}

		// a bare name resolves to its only version, unless the name is taken unversioned
		let aliases = versions
			.into_iter()
			.filter(|(name, keys)| keys.len() == 1 && !unversioned.contains(name))
			.map(|(name, keys)| (name.to_string(), keys[0].to_string()))
			.collect();

		Self {
			by_path,
			aliases,
		}
	}
}

impl Catalog {
	#[instrument(name = "catalog::api::create", level = "debug", skip(self, to_create), fields(name = %to_create.name))]
	pub fn create_api(&mut self, to_create: ApiToCreate) -> Result<ApiRef> {
		require_name(ResourceKind::Api, &to_create.name)?;
		let Some(handler) = to_create.handler else {
			return Err(CatalogError::MissingField {
				kind: ResourceKind::Api,
				name: to_create.name,
				field: "handler",
			}
			.into());
		};

		let metadata = self.resolve_metadata(to_create.metadata);
		let typed = TypedResource::new(ResourceKind::Api, &to_create.name, to_create.query_params, metadata)?;

		let api_ref = ApiRef {
			name: to_create.name,
			version: to_create.version,
		};
		let id = api_ref.id();
		let key = api_ref.key();
		let api = Api {
			typed,
			id: api_ref.clone(),
			response_schema: to_create.response_schema,
			path: to_create.path,
			handler,
		};

		let claims = api.claims();
		for (existing_key, existing) in &self.apis {
			if *existing_key == key {
				continue;
			}
			if let Some(conflict) = existing.claims().into_iter().find(|claim| claims.contains(claim)) {
				return Err(CatalogError::PathConflict {
					kind: ResourceKind::Api,
					name: api_ref.name,
					path: conflict,
					existing: existing_key.clone(),
				}
				.into());
			}
		}

		let duplicates = self.config.duplicates;
		register(&mut self.apis, duplicates, ResourceKind::Api, &id, key, api)?;
		self.touch();
		Ok(api_ref)
	}

	/// Resolves a registry key (`name` or `name:version`), falling back to the bare name
	/// of an endpoint that exists in exactly one version.
	pub fn find_api(&self, name_or_key: &str) -> Option<&Api> {
		if let Some(api) = self.apis.get(name_or_key) {
			return Some(api);
		}
		let index = self.api_index();
		index.aliases.get(name_or_key).and_then(|key| self.apis.get(key))
	}

	pub fn find_api_by_path(&self, path: &str) -> Option<&Api> {
		let index = self.api_index();
		index.by_path.get(&normalize(path)).and_then(|key| self.apis.get(key))
	}

	pub fn list_apis(&self) -> impl Iterator<Item = &Api> {
		self.apis.values()
	}

	pub fn api_count(&self) -> usize {
		self.apis.len()
	}

	fn api_index(&self) -> Arc<ApiIndex> {
		let mut cached = self.api_index.lock();
		if let Some(index) = cached.as_ref() {
			return index.clone();
		}
		debug!(apis = self.apis.len(), "rebuilding api index");
		let index = Arc::new(ApiIndex::build(&self.apis));
		*cached = Some(index.clone());
		index
	}
}
