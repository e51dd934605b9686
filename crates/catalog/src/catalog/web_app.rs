// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{fmt, sync::Arc};

use indexmap::IndexMap;
use moose_core::{DuplicatePolicy, Metadata, ResourceId};
use serde_json::{Value, json};
use tracing::instrument;

use crate::{
	Result,
	catalog::{Catalog, register, require_name},
	error::{CatalogError, ResourceKind},
	lineage::{DataPlane, HandlerContext},
};

/// Prefixes served by the platform itself.
pub const RESERVED_MOUNT_PATHS: [&str; 8] =
	["/admin", "/api", "/consumption", "/health", "/ingest", "/moose", "/ready", "/workflows"];

#[derive(Debug, Clone, PartialEq)]
pub struct WebRequest {
	pub method: String,
	pub path: String,
	pub query: IndexMap<String, String>,
	pub headers: IndexMap<String, String>,
	pub body: Option<Value>,
}

impl WebRequest {
	pub fn get(path: impl Into<String>) -> Self {
		Self {
			method: "GET".to_string(),
			path: path.into(),
			query: IndexMap::new(),
			headers: IndexMap::new(),
			body: None,
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebResponse {
	pub status: u16,
	pub headers: IndexMap<String, String>,
	pub body: Value,
}

impl WebResponse {
	pub fn ok(body: Value) -> Self {
		Self {
			status: 200,
			headers: IndexMap::new(),
			body,
		}
	}

	pub fn not_found() -> Self {
		Self {
			status: 404,
			headers: IndexMap::new(),
			body: json!({"error": "not found"}),
		}
	}
}

impl Default for WebResponse {
	fn default() -> Self {
		Self::not_found()
	}
}

pub type RequestHandler = Arc<dyn Fn(&HandlerContext, &WebRequest) -> Result<WebResponse> + Send + Sync>;

/// `(req, res)` style: fills in the response it is handed.
pub type ExpressHandle = Arc<dyn Fn(&HandlerContext, &WebRequest, &mut WebResponse) -> Result<()> + Send + Sync>;

pub struct KoaContext {
	pub request: WebRequest,
	pub response: WebResponse,
}

/// Middleware over a combined request/response context.
pub type KoaCallback = Arc<dyn Fn(&HandlerContext, &mut KoaContext) -> Result<()> + Send + Sync>;

/// A router: `None` when no route matches.
pub type FastifyRouting = Arc<dyn Fn(&HandlerContext, &WebRequest) -> Result<Option<WebResponse>> + Send + Sync>;

/// An application object from a web framework. Implement the one entry point the
/// framework exposes; the others stay `None`.
pub trait FrameworkApp {
	fn handle(&self) -> Option<ExpressHandle> {
		None
	}

	fn callback(&self) -> Option<KoaCallback> {
		None
	}

	fn routing(&self) -> Option<FastifyRouting> {
		None
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
	Raw,
	Express,
	Koa,
	Fastify,
}

#[derive(Clone)]
pub enum WebAppHandler {
	Raw(RequestHandler),
	Express(ExpressHandle),
	Koa(KoaCallback),
	Fastify(FastifyRouting),
}

impl fmt::Debug for WebAppHandler {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "WebAppHandler::{:?}", self.kind())
	}
}

impl WebAppHandler {
	pub fn raw<F>(f: F) -> Self
	where
		F: Fn(&HandlerContext, &WebRequest) -> Result<WebResponse> + Send + Sync + 'static,
	{
		WebAppHandler::Raw(Arc::new(f))
	}

	/// Picks the adapter for `app`, trying `handle`, then `callback`, then `routing`.
	pub fn detect(app: &dyn FrameworkApp) -> Option<Self> {
		if let Some(handle) = app.handle() {
			return Some(WebAppHandler::Express(handle));
		}
		if let Some(callback) = app.callback() {
			return Some(WebAppHandler::Koa(callback));
		}
		app.routing().map(WebAppHandler::Fastify)
	}

	pub fn kind(&self) -> AdapterKind {
		match self {
			WebAppHandler::Raw(_) => AdapterKind::Raw,
			WebAppHandler::Express(_) => AdapterKind::Express,
			WebAppHandler::Koa(_) => AdapterKind::Koa,
			WebAppHandler::Fastify(_) => AdapterKind::Fastify,
		}
	}

	pub fn into_request_handler(self) -> RequestHandler {
		match self {
			WebAppHandler::Raw(handler) => handler,
			WebAppHandler::Express(handle) => Arc::new(move |ctx, request| {
				let mut response = WebResponse::default();
				handle(ctx, request, &mut response)?;
				Ok(response)
			}),
			WebAppHandler::Koa(callback) => Arc::new(move |ctx, request| {
				let mut koa = KoaContext {
					request: request.clone(),
					response: WebResponse::default(),
				};
				callback(ctx, &mut koa)?;
				Ok(koa.response)
			}),
			WebAppHandler::Fastify(routing) => {
				Arc::new(move |ctx, request| Ok(routing(ctx, request)?.unwrap_or_else(WebResponse::not_found)))
			}
		}
	}
}

pub struct WebAppToCreate {
	pub name: String,
	pub mount_path: String,
	pub handler: Option<WebAppHandler>,
	pub metadata: Metadata,
	/// Hand the platform's query and write utilities to the handler.
	pub inject_utils: bool,
}

impl Default for WebAppToCreate {
	fn default() -> Self {
		Self {
			name: String::new(),
			mount_path: String::new(),
			handler: None,
			metadata: Metadata::default(),
			inject_utils: true,
		}
	}
}

impl WebAppToCreate {
	pub fn new(name: impl Into<String>, mount_path: impl Into<String>, handler: WebAppHandler) -> Self {
		Self {
			name: name.into(),
			mount_path: mount_path.into(),
			handler: Some(handler),
			..Default::default()
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WebAppRef {
	pub name: String,
	pub mount_path: String,
}

#[derive(Clone)]
pub struct WebApp {
	pub name: String,
	pub mount_path: String,
	pub adapter: AdapterKind,
	pub handler: RequestHandler,
	pub inject_utils: bool,
	pub metadata: Metadata,
}

impl fmt::Debug for WebApp {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WebApp")
			.field("name", &self.name)
			.field("mount_path", &self.mount_path)
			.field("adapter", &self.adapter)
			.field("inject_utils", &self.inject_utils)
			.finish_non_exhaustive()
	}
}

impl WebApp {
	/// Serves one request. The data plane is withheld unless utilities are injected.
	pub fn call(&self, plane: Option<Arc<dyn DataPlane>>, request: &WebRequest) -> Result<WebResponse> {
		let ctx = match plane {
			Some(plane) if self.inject_utils => HandlerContext::new(plane),
			_ => HandlerContext::without_utils(),
		};
		(self.handler)(&ctx, request)
	}
}

fn validate_mount_path(name: &str, mount_path: &str) -> Result<()> {
	let invalid = |reason: &str| -> moose_type::Error {
		CatalogError::InvalidMountPath {
			name: name.to_string(),
			mount_path: mount_path.to_string(),
			reason: reason.to_string(),
		}
		.into()
	};

	if mount_path.is_empty() {
		return Err(CatalogError::MissingField {
			kind: ResourceKind::WebApp,
			name: name.to_string(),
			field: "mountPath",
		}
		.into());
	}
	if mount_path == "/" {
		return Err(invalid("the root path cannot be mounted"));
	}
	if !mount_path.starts_with('/') {
		return Err(invalid("must start with '/'"));
	}
	if mount_path.ends_with('/') {
		return Err(invalid("must not end with '/'"));
	}
	if let Some(reserved) = RESERVED_MOUNT_PATHS
		.iter()
		.find(|reserved| mount_path == **reserved || mount_path.starts_with(&format!("{}/", reserved)))
	{
		return Err(invalid(&format!("'{}' is reserved", reserved)));
	}
	Ok(())
}

impl Catalog {
	#[instrument(name = "catalog::web_app::create", level = "debug", skip(self, to_create), fields(name = %to_create.name, mount_path = %to_create.mount_path))]
	pub fn create_web_app(&mut self, to_create: WebAppToCreate) -> Result<WebAppRef> {
		require_name(ResourceKind::WebApp, &to_create.name)?;
		validate_mount_path(&to_create.name, &to_create.mount_path)?;
		let Some(handler) = to_create.handler else {
			return Err(CatalogError::MissingField {
				kind: ResourceKind::WebApp,
				name: to_create.name,
				field: "handler",
			}
			.into());
		};

		let replacing = self.config.duplicates == DuplicatePolicy::Replace;
		let existing = self
			.web_apps
			.values()
			.find(|app| app.mount_path == to_create.mount_path && !(replacing && app.name == to_create.name));
		if let Some(existing) = existing {
			return Err(CatalogError::MountPathConflict {
				name: to_create.name,
				mount_path: to_create.mount_path,
				existing: existing.name.clone(),
			}
			.into());
		}

		let id = ResourceId::unversioned(to_create.name.clone());
		let web_app_ref = WebAppRef {
			name: to_create.name,
			mount_path: to_create.mount_path,
		};
		let web_app = WebApp {
			name: web_app_ref.name.clone(),
			mount_path: web_app_ref.mount_path.clone(),
			adapter: handler.kind(),
			handler: handler.into_request_handler(),
			inject_utils: to_create.inject_utils,
			metadata: self.resolve_metadata(to_create.metadata),
		};
		let duplicates = self.config.duplicates;
		register(&mut self.web_apps, duplicates, ResourceKind::WebApp, &id, id.key(), web_app)?;
		self.touch();
		Ok(web_app_ref)
	}

	pub fn find_web_app(&self, name: &str) -> Option<&WebApp> {
		self.web_apps.get(name)
	}

	pub fn list_web_apps(&self) -> impl Iterator<Item = &WebApp> {
		self.web_apps.values()
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use moose_core::CatalogConfig;

	use super::*;
	use crate::lineage::NoopDataPlane;

	fn create_test_catalog() -> Catalog {
		Catalog::new(CatalogConfig::builder().capture_source_location(false).build())
	}

	fn hello() -> WebAppHandler {
		WebAppHandler::raw(|_, request| Ok(WebResponse::ok(json!({"path": request.path}))))
	}

	#[test]
	fn test_reserved_and_malformed_paths() {
		let mut catalog = create_test_catalog();
		for path in ["/api", "/api/v1", "/health", "/", "/custom/", "custom", ""] {
			assert!(catalog.create_web_app(WebAppToCreate::new("app", path, hello())).is_err(), "{}", path);
		}
		catalog.create_web_app(WebAppToCreate::new("custom", "/custom", hello())).unwrap();
		catalog.create_web_app(WebAppToCreate::new("users", "/v1/users", hello())).unwrap();
		// a reserved word as a prefix of a longer segment is fine
		catalog.create_web_app(WebAppToCreate::new("apis", "/apis", hello())).unwrap();
	}

	#[test]
	fn test_mount_path_unique_across_names() {
		let mut catalog = create_test_catalog();
		catalog.create_web_app(WebAppToCreate::new("first", "/dashboard", hello())).unwrap();
		let err = catalog.create_web_app(WebAppToCreate::new("second", "/dashboard", hello())).unwrap_err();
		assert_eq!(err.code(), "CATALOG_003");
		assert!(err.message.contains("'first'"));
	}

	#[test]
	fn test_replace_keeps_own_mount_path() {
		let mut catalog = Catalog::new(CatalogConfig::builder().permissive().capture_source_location(false).build());
		catalog.create_web_app(WebAppToCreate::new("dash", "/dashboard", hello())).unwrap();
		catalog.create_web_app(WebAppToCreate::new("dash", "/dashboard", hello())).unwrap();
		assert_eq!(catalog.list_web_apps().count(), 1);
	}

	struct ExpressApp;

	impl FrameworkApp for ExpressApp {
		fn handle(&self) -> Option<ExpressHandle> {
			Some(Arc::new(|_, _, response: &mut WebResponse| {
				response.status = 201;
				response.body = json!("express");
				Ok(())
			}))
		}

		fn routing(&self) -> Option<FastifyRouting> {
			Some(Arc::new(|_, _| Ok(None)))
		}
	}

	struct KoaApp;

	impl FrameworkApp for KoaApp {
		fn callback(&self) -> Option<KoaCallback> {
			Some(Arc::new(|_, koa: &mut KoaContext| {
				koa.response = WebResponse::ok(json!({"method": koa.request.method}));
				Ok(())
			}))
		}
	}

	struct FastifyApp;

	impl FrameworkApp for FastifyApp {
		fn routing(&self) -> Option<FastifyRouting> {
			Some(Arc::new(|_, request: &WebRequest| {
				Ok((request.path == "/fast/ping").then(|| WebResponse::ok(json!("pong"))))
			}))
		}
	}

	struct Nothing;

	impl FrameworkApp for Nothing {}

	#[test]
	fn test_detect_order() {
		assert_eq!(WebAppHandler::detect(&ExpressApp).unwrap().kind(), AdapterKind::Express);
		assert_eq!(WebAppHandler::detect(&KoaApp).unwrap().kind(), AdapterKind::Koa);
		assert_eq!(WebAppHandler::detect(&FastifyApp).unwrap().kind(), AdapterKind::Fastify);
		assert!(WebAppHandler::detect(&Nothing).is_none());
	}

	#[test]
	fn test_adapters_serve_requests() {
		let mut catalog = create_test_catalog();
		let apps: [(&str, &dyn FrameworkApp); 3] = [("express", &ExpressApp), ("koa", &KoaApp), ("fast", &FastifyApp)];
		for (name, app) in apps {
			let handler = WebAppHandler::detect(app).unwrap();
			catalog.create_web_app(WebAppToCreate::new(name, format!("/{}", name), handler)).unwrap();
		}

		let express = catalog.find_web_app("express").unwrap();
		assert_eq!(express.call(None, &WebRequest::get("/express")).unwrap().status, 201);

		let koa = catalog.find_web_app("koa").unwrap();
		assert_eq!(koa.call(None, &WebRequest::get("/koa")).unwrap().body, json!({"method": "GET"}));

		let fast = catalog.find_web_app("fast").unwrap();
		assert_eq!(fast.call(None, &WebRequest::get("/fast/ping")).unwrap().body, json!("pong"));
		assert_eq!(fast.call(None, &WebRequest::get("/fast/other")).unwrap().status, 404);
	}

	#[test]
	fn test_detection_happens_once() {
		struct Counting(AtomicUsize);

		impl FrameworkApp for Counting {
			fn routing(&self) -> Option<FastifyRouting> {
				self.0.fetch_add(1, Ordering::SeqCst);
				Some(Arc::new(|_, _| Ok(Some(WebResponse::ok(json!(null))))))
			}
		}

		let app = Counting(AtomicUsize::new(0));
		let mut catalog = create_test_catalog();
		catalog.create_web_app(WebAppToCreate::new("counting", "/counting", WebAppHandler::detect(&app).unwrap())).unwrap();
		let web_app = catalog.find_web_app("counting").unwrap();
		for _ in 0..3 {
			web_app.call(None, &WebRequest::get("/counting")).unwrap();
		}
		assert_eq!(app.0.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn test_utils_injection() {
		let mut catalog = create_test_catalog();
		let handler = || WebAppHandler::raw(|ctx, _| Ok(WebResponse::ok(json!(ctx.has_utils()))));
		catalog.create_web_app(WebAppToCreate::new("with", "/with", handler())).unwrap();
		catalog
			.create_web_app(WebAppToCreate {
				inject_utils: false,
				..WebAppToCreate::new("without", "/without", handler())
			})
			.unwrap();

		let plane: Arc<dyn DataPlane> = Arc::new(NoopDataPlane);
		let with = catalog.find_web_app("with").unwrap().call(Some(plane.clone()), &WebRequest::get("/with")).unwrap();
		assert_eq!(with.body, json!(true));
		let without = catalog.find_web_app("without").unwrap().call(Some(plane), &WebRequest::get("/without")).unwrap();
		assert_eq!(without.body, json!(false));
	}
}
