// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	panic::{AssertUnwindSafe, catch_unwind},
	sync::Arc,
};

use serde_json::Value;
use tracing::{debug, warn};

use crate::{
	catalog::{Catalog, Task, WebRequest},
	lineage::{DataPlane, Edge, EdgeKind, HandlerContext, Lineage, LineageCollector, LineageSubject, NoopDataPlane},
};

fn noop_plane() -> Option<Arc<dyn DataPlane>> {
	Some(Arc::new(NoopDataPlane))
}

/// Runs `f` once with a tracing context. Errors and panics inside the handler are
/// ignored; whatever was recorded before them counts.
fn dry_run<T>(
	subject: &LineageSubject,
	collector: &Arc<LineageCollector>,
	plane: Option<Arc<dyn DataPlane>>,
	f: impl FnOnce(&HandlerContext) -> T,
) -> Option<T> {
	let ctx = HandlerContext::tracing(plane, collector.clone());
	match catch_unwind(AssertUnwindSafe(|| f(&ctx))) {
		Ok(result) => Some(result),
		Err(_) => {
			warn!(?subject, "handler panicked during lineage dry run");
			None
		}
	}
}

fn run_task(subject: &LineageSubject, collector: &Arc<LineageCollector>, task: &Task, input: Value) {
	let output = dry_run(subject, collector, noop_plane(), |ctx| (task.handler)(ctx, input))
		.and_then(|result| result.ok())
		.unwrap_or(Value::Null);
	for child in &task.on_complete {
		run_task(subject, collector, child, output.clone());
	}
}

impl Catalog {
	/// Lineage of the query endpoint under `key` (`name` or `name:version`).
	pub fn api_lineage(&self, key: &str) -> Option<Lineage> {
		let api = self.find_api(key)?;
		self.lineage(&LineageSubject::Api(api.id.key()))
	}

	pub fn workflow_lineage(&self, name: &str) -> Option<Lineage> {
		self.lineage(&LineageSubject::Workflow(name.to_string()))
	}

	pub fn web_app_lineage(&self, name: &str) -> Option<Lineage> {
		self.lineage(&LineageSubject::WebApp(name.to_string()))
	}

	/// Computes the lineage of `subject` by a dry run of its handlers, or returns the
	/// cached result. Edges that name no registered resource are dropped. `None` when
	/// the subject is not registered.
	pub fn lineage(&self, subject: &LineageSubject) -> Option<Lineage> {
		if let Some(cached) = self.lineage_cache.lock().get(subject) {
			return Some(cached.clone());
		}

		let collector = Arc::new(LineageCollector::new());
		match subject {
			LineageSubject::Api(key) => {
				let api = self.apis.get(key)?;
				let input = api.typed.schema.sample();
				dry_run(subject, &collector, noop_plane(), |ctx| (api.handler)(ctx, input));
			}
			LineageSubject::Workflow(name) => {
				let workflow = self.workflows.get(name)?;
				let task = &workflow.starting_task;
				let input = task.input_schema.as_ref().map(|schema| schema.sample()).unwrap_or(Value::Null);
				run_task(subject, &collector, task, input);
			}
			LineageSubject::WebApp(name) => {
				let app = self.web_apps.get(name)?;
				let plane = if app.inject_utils {
					noop_plane()
				} else {
					None
				};
				let request = WebRequest::get(app.mount_path.clone());
				dry_run(subject, &collector, plane, |ctx| (app.handler)(ctx, &request));
			}
		}

		let lineage = collector.finish().retain_resolved(|edge| self.resolves(edge));
		debug!(
			?subject,
			pulls = lineage.pulls_data_from.len(),
			pushes = lineage.pushes_data_to.len(),
			"lineage computed"
		);
		self.lineage_cache.lock().insert(subject.clone(), lineage.clone());
		Some(lineage)
	}

	fn resolves(&self, edge: &Edge) -> bool {
		match edge.kind {
			EdgeKind::Table => self.tables.contains_key(&edge.id),
			EdgeKind::Topic => self.streams.contains_key(&edge.id),
			EdgeKind::View => self.sql_resources.contains_key(&edge.id),
		}
	}
}

#[cfg(test)]
mod tests {
	use moose_core::{CatalogConfig, Column, DataType, Schema};
	use serde_json::json;

	use super::*;
	use crate::{
		Result,
		catalog::{
			ApiToCreate, SqlDependency, StreamRef, StreamToCreate, TableRef, TableToCreate, TaskToCreate, ViewRef, ViewToCreate,
			WebAppHandler, WebAppToCreate, WebResponse, WorkflowToCreate,
		},
		handler::{api_handler, task_handler},
	};

	fn schema() -> Schema {
		Schema::new(vec![Column::new("id", DataType::String).primary_key()])
	}

	fn params() -> Schema {
		Schema::new(vec![Column::new("limit", DataType::Int32)])
	}

	fn create_test_catalog() -> Catalog {
		Catalog::new(CatalogConfig::builder().capture_source_location(false).build())
	}

	fn table(name: &str) -> TableRef {
		TableRef {
			name: name.to_string(),
			version: None,
			database: None,
		}
	}

	fn inner_query(ctx: &HandlerContext, source: &TableRef) -> Result<Vec<Value>> {
		let sql = ctx.sql().select(&["id"]).from(source).limit(10).build();
		ctx.query(&sql)
	}

	fn outer_query(ctx: &HandlerContext, source: &TableRef) -> Result<Vec<Value>> {
		inner_query(ctx, source)
	}

	#[test]
	fn test_two_level_helper_chain() {
		let mut catalog = create_test_catalog();
		catalog.create_table(TableToCreate::new("T", schema())).unwrap();
		catalog
			.create_api(ApiToCreate::new(
				"report",
				params(),
				api_handler(|ctx, _| {
					let rows = outer_query(ctx, &table("T"))?;
					Ok(Value::from(rows))
				}),
			))
			.unwrap();

		let lineage = catalog.api_lineage("report").unwrap();
		assert_eq!(lineage.pulls_data_from, vec![Edge::new(EdgeKind::Table, "T")]);
		assert!(lineage.pushes_data_to.is_empty());
	}

	#[test]
	fn test_no_leak_after_clear() {
		let mut catalog = create_test_catalog();
		catalog.create_table(TableToCreate::new("T", schema())).unwrap();
		catalog
			.create_api(ApiToCreate::new(
				"report",
				params(),
				api_handler(|ctx, _| outer_query(ctx, &table("T")).map(Value::from)),
			))
			.unwrap();
		assert!(catalog.api_lineage("report").unwrap().pulls_from(EdgeKind::Table, "T"));

		catalog.clear();
		catalog.create_table(TableToCreate::new("T", schema())).unwrap();
		catalog.create_table(TableToCreate::new("T2", schema())).unwrap();
		catalog
			.create_api(ApiToCreate::new(
				"summary",
				params(),
				api_handler(|ctx, _| outer_query(ctx, &table("T2")).map(Value::from)),
			))
			.unwrap();

		let lineage = catalog.api_lineage("summary").unwrap();
		assert!(lineage.pulls_from(EdgeKind::Table, "T2"));
		assert!(!lineage.pulls_from(EdgeKind::Table, "T"));
		assert!(catalog.api_lineage("report").is_none());
	}

	#[test]
	fn test_unresolved_edges_dropped() {
		let mut catalog = create_test_catalog();
		catalog
			.create_api(ApiToCreate::new(
				"report",
				params(),
				api_handler(|ctx, _| outer_query(ctx, &table("missing")).map(Value::from)),
			))
			.unwrap();
		assert!(catalog.api_lineage("report").unwrap().is_empty());
	}

	#[test]
	fn test_panicking_handler_keeps_recorded_edges() {
		let mut catalog = create_test_catalog();
		catalog.create_table(TableToCreate::new("T", schema())).unwrap();
		catalog
			.create_api(ApiToCreate::new(
				"report",
				params(),
				api_handler(|ctx, _| {
					let _ = ctx.sql().from(&table("T")).build();
					panic!("handler bug");
				}),
			))
			.unwrap();
		assert!(catalog.api_lineage("report").unwrap().pulls_from(EdgeKind::Table, "T"));
	}

	#[test]
	fn test_versioned_api_lineage_by_alias() {
		let mut catalog = create_test_catalog();
		catalog.create_table(TableToCreate::new("T", schema())).unwrap();
		catalog
			.create_api(ApiToCreate {
				version: Some("2".to_string()),
				..ApiToCreate::new("report", params(), api_handler(|ctx, _| outer_query(ctx, &table("T")).map(Value::from)))
			})
			.unwrap();
		assert!(catalog.api_lineage("report").unwrap().pulls_from(EdgeKind::Table, "T"));
		assert!(catalog.api_lineage("report:2").unwrap().pulls_from(EdgeKind::Table, "T"));
	}

	#[test]
	fn test_workflow_union_in_execution_order() {
		let mut catalog = create_test_catalog();
		catalog.create_table(TableToCreate::new("raw", schema())).unwrap();
		catalog.create_table(TableToCreate::new("clean", schema())).unwrap();
		catalog.create_stream(StreamToCreate::new("done", schema())).unwrap();

		let extract = TaskToCreate::new(
			"extract",
			task_handler(|ctx, _| {
				let rows = inner_query(ctx, &table("raw"))?;
				Ok(json!({"count": rows.len()}))
			}),
		);
		let load = TaskToCreate::new(
			"load",
			task_handler(|ctx, input| {
				ctx.insert(&table("clean"), vec![input.clone()])?;
				Ok(input)
			}),
		);
		let notify = TaskToCreate::new(
			"notify",
			task_handler(|ctx, input| {
				let done = StreamRef {
					name: "done".to_string(),
					version: None,
				};
				ctx.send(&done, input.clone())?;
				Ok(input)
			}),
		);
		catalog.create_workflow(WorkflowToCreate::new("etl", extract.then(load.then(notify)))).unwrap();

		let lineage = catalog.workflow_lineage("etl").unwrap();
		assert_eq!(lineage.pulls_data_from, vec![Edge::new(EdgeKind::Table, "raw")]);
		assert_eq!(lineage.pushes_data_to, vec![Edge::new(EdgeKind::Table, "clean"), Edge::new(EdgeKind::Topic, "done")]);
	}

	#[test]
	fn test_web_app_view_lineage() {
		let mut catalog = create_test_catalog();
		catalog.create_table(TableToCreate::new("users", schema())).unwrap();
		catalog
			.create_view(ViewToCreate::new("active_users", "SELECT * FROM users", vec![SqlDependency::table(&table("users"))]))
			.unwrap();
		let handler = WebAppHandler::raw(|ctx, _| {
			let view = ViewRef {
				name: "active_users".to_string(),
			};
			let sql = ctx.sql().from_view(&view).build();
			ctx.query(&sql).map(|rows| WebResponse::ok(Value::from(rows)))
		});
		catalog.create_web_app(WebAppToCreate::new("dashboard", "/dashboard", handler)).unwrap();

		let lineage = catalog.web_app_lineage("dashboard").unwrap();
		assert!(lineage.pulls_from(EdgeKind::View, "active_users"));
	}

	#[test]
	fn test_cache_dropped_on_mutation() {
		let mut catalog = create_test_catalog();
		catalog
			.create_api(ApiToCreate::new(
				"report",
				params(),
				api_handler(|ctx, _| outer_query(ctx, &table("late")).map(Value::from)),
			))
			.unwrap();
		assert!(catalog.api_lineage("report").unwrap().is_empty());

		catalog.create_table(TableToCreate::new("late", schema())).unwrap();
		assert!(catalog.api_lineage("report").unwrap().pulls_from(EdgeKind::Table, "late"));
	}
}
