// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::sync::Arc;

use serde_json::Value;

use crate::{
	Result,
	catalog::{StreamRef, TableRef},
	error::CatalogError,
	lineage::{Edge, EdgeKind, LineageCollector, Sql, SqlBuilder},
};

/// The data operations a handler may perform. Implemented by the runtime that hosts
/// handlers; lineage dry runs use [`NoopDataPlane`].
pub trait DataPlane: Send + Sync {
	fn query(&self, sql: &Sql) -> Result<Vec<Value>>;

	fn send(&self, topic: &str, record: Value) -> Result<()>;

	fn insert(&self, table: &str, rows: Vec<Value>) -> Result<()>;
}

pub struct NoopDataPlane;

impl DataPlane for NoopDataPlane {
	fn query(&self, _sql: &Sql) -> Result<Vec<Value>> {
		Ok(vec![])
	}

	fn send(&self, _topic: &str, _record: Value) -> Result<()> {
		Ok(())
	}

	fn insert(&self, _table: &str, _rows: Vec<Value>) -> Result<()> {
		Ok(())
	}
}

/// Passed to every handler invocation.
#[derive(Clone)]
pub struct HandlerContext {
	plane: Option<Arc<dyn DataPlane>>,
	collector: Option<Arc<LineageCollector>>,
}

impl HandlerContext {
	pub fn new(plane: Arc<dyn DataPlane>) -> Self {
		Self {
			plane: Some(plane),
			collector: None,
		}
	}

	/// A context whose data operations fail with `UtilitiesUnavailable`.
	pub fn without_utils() -> Self {
		Self {
			plane: None,
			collector: None,
		}
	}

	pub(crate) fn tracing(plane: Option<Arc<dyn DataPlane>>, collector: Arc<LineageCollector>) -> Self {
		Self {
			plane,
			collector: Some(collector),
		}
	}

	pub fn is_tracing(&self) -> bool {
		self.collector.is_some()
	}

	pub fn has_utils(&self) -> bool {
		self.plane.is_some()
	}

	pub fn sql(&self) -> SqlBuilder<'_> {
		SqlBuilder::new(self)
	}

	pub fn query(&self, sql: &Sql) -> Result<Vec<Value>> {
		self.plane()?.query(sql)
	}

	/// Publishes one record to `stream`.
	pub fn send(&self, stream: &StreamRef, record: Value) -> Result<()> {
		self.record_push(Edge::new(EdgeKind::Topic, stream.key()));
		self.plane()?.send(&stream.physical_name(), record)
	}

	pub fn insert(&self, table: &TableRef, rows: Vec<Value>) -> Result<()> {
		self.record_push(Edge::new(EdgeKind::Table, table.key()));
		self.plane()?.insert(&table.physical_name(), rows)
	}

	pub(crate) fn record_pull(&self, edge: Edge) {
		if let Some(collector) = &self.collector {
			collector.record_pull(edge);
		}
	}

	pub(crate) fn record_push(&self, edge: Edge) {
		if let Some(collector) = &self.collector {
			collector.record_push(edge);
		}
	}

	fn plane(&self) -> Result<&dyn DataPlane> {
		match &self.plane {
			Some(plane) => Ok(plane.as_ref()),
			None => Err(CatalogError::UtilitiesUnavailable.into()),
		}
	}
}

#[cfg(test)]
mod tests {
	use parking_lot::Mutex;
	use serde_json::json;

	use super::*;

	#[derive(Default)]
	struct RecordingPlane {
		sent: Mutex<Vec<(String, Value)>>,
	}

	impl DataPlane for RecordingPlane {
		fn query(&self, _sql: &Sql) -> Result<Vec<Value>> {
			Ok(vec![json!({"n": 1})])
		}

		fn send(&self, topic: &str, record: Value) -> Result<()> {
			self.sent.lock().push((topic.to_string(), record));
			Ok(())
		}

		fn insert(&self, _table: &str, _rows: Vec<Value>) -> Result<()> {
			Ok(())
		}
	}

	fn stream(name: &str, version: Option<&str>) -> StreamRef {
		StreamRef {
			name: name.to_string(),
			version: version.map(str::to_string),
		}
	}

	#[test]
	fn test_send_uses_physical_topic_name() {
		let plane = Arc::new(RecordingPlane::default());
		let ctx = HandlerContext::new(plane.clone());
		ctx.send(&stream("events", Some("1.2")), json!({"id": 1})).unwrap();
		assert_eq!(plane.sent.lock()[0].0, "events_1_2");
	}

	#[test]
	fn test_edges_recorded_even_without_utils() {
		let collector = Arc::new(LineageCollector::new());
		let ctx = HandlerContext::tracing(None, collector.clone());
		assert!(ctx.is_tracing());
		assert!(ctx.send(&stream("events", None), json!({})).is_err());

		let lineage = collector.finish();
		assert!(lineage.pushes_to(EdgeKind::Topic, "events"));
	}

	#[test]
	fn test_without_utils_rejects_queries() {
		let ctx = HandlerContext::without_utils();
		let sql = Sql::raw("SELECT 1");
		assert_eq!(ctx.query(&sql).unwrap_err().code(), "CATALOG_016");
	}
}
