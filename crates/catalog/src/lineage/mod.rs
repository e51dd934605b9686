// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Data lineage of handlers.
//!
//! Handlers touch data only through [`HandlerContext`]. During a dry run the context
//! carries a [`LineageCollector`], and every tracked operation records its edge at the
//! moment it is called, whether or not the operation later completes. Helper functions
//! that receive the context are therefore covered however deeply they nest.

mod context;
mod sql;

use std::collections::HashSet;

pub use context::{DataPlane, HandlerContext, NoopDataPlane};
use parking_lot::Mutex;
use serde::Serialize;
pub use sql::{Sql, SqlBuilder};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EdgeKind {
	Table,
	Topic,
	View,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Edge {
	pub id: String,
	pub kind: EdgeKind,
}

impl Edge {
	pub fn new(kind: EdgeKind, id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			kind,
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lineage {
	pub pulls_data_from: Vec<Edge>,
	pub pushes_data_to: Vec<Edge>,
}

impl Lineage {
	pub fn is_empty(&self) -> bool {
		self.pulls_data_from.is_empty() && self.pushes_data_to.is_empty()
	}

	pub fn pulls_from(&self, kind: EdgeKind, id: &str) -> bool {
		self.pulls_data_from.iter().any(|e| e.kind == kind && e.id == id)
	}

	pub fn pushes_to(&self, kind: EdgeKind, id: &str) -> bool {
		self.pushes_data_to.iter().any(|e| e.kind == kind && e.id == id)
	}

	/// Keeps only edges accepted by `resolves`, preserving order.
	pub fn retain_resolved(mut self, resolves: impl Fn(&Edge) -> bool) -> Self {
		self.pulls_data_from.retain(|e| resolves(e));
		self.pushes_data_to.retain(|e| resolves(e));
		self
	}
}

/// Whose lineage is being computed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LineageSubject {
	Api(String),
	Workflow(String),
	WebApp(String),
}

/// Collects the edges recorded while one subject runs.
#[derive(Debug, Default)]
pub struct LineageCollector {
	pulls: Mutex<Vec<Edge>>,
	pushes: Mutex<Vec<Edge>>,
}

impl LineageCollector {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn record_pull(&self, edge: Edge) {
		trace!(id = %edge.id, kind = ?edge.kind, "lineage pull");
		self.pulls.lock().push(edge);
	}

	pub fn record_push(&self, edge: Edge) {
		trace!(id = %edge.id, kind = ?edge.kind, "lineage push");
		self.pushes.lock().push(edge);
	}

	/// The recorded edges, first occurrence wins.
	pub fn finish(&self) -> Lineage {
		let mut pulls_data_from = self.pulls.lock().clone();
		let mut pushes_data_to = self.pushes.lock().clone();
		dedup(&mut pulls_data_from);
		dedup(&mut pushes_data_to);
		Lineage {
			pulls_data_from,
			pushes_data_to,
		}
	}
}

fn dedup(edges: &mut Vec<Edge>) {
	let mut seen = HashSet::new();
	edges.retain(|edge| seen.insert(edge.clone()));
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_collector_dedupes_in_order() {
		let collector = LineageCollector::new();
		collector.record_pull(Edge::new(EdgeKind::Table, "b"));
		collector.record_pull(Edge::new(EdgeKind::Table, "a"));
		collector.record_pull(Edge::new(EdgeKind::Table, "b"));
		collector.record_push(Edge::new(EdgeKind::Topic, "events"));

		let lineage = collector.finish();
		assert_eq!(lineage.pulls_data_from, vec![Edge::new(EdgeKind::Table, "b"), Edge::new(EdgeKind::Table, "a")]);
		assert!(lineage.pushes_to(EdgeKind::Topic, "events"));
	}

	#[test]
	fn test_retain_resolved() {
		let lineage = Lineage {
			pulls_data_from: vec![Edge::new(EdgeKind::Table, "kept"), Edge::new(EdgeKind::Table, "gone")],
			pushes_data_to: vec![],
		};
		let lineage = lineage.retain_resolved(|e| e.id == "kept");
		assert_eq!(lineage.pulls_data_from, vec![Edge::new(EdgeKind::Table, "kept")]);
	}

	#[test]
	fn test_serializes_camel_case() {
		let lineage = Lineage {
			pulls_data_from: vec![Edge::new(EdgeKind::View, "v")],
			pushes_data_to: vec![],
		};
		assert_eq!(
			serde_json::to_value(&lineage).unwrap(),
			serde_json::json!({"pullsDataFrom": [{"id": "v", "kind": "View"}], "pushesDataTo": []})
		);
	}
}
