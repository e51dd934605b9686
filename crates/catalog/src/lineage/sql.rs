// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::fmt::{Display, Formatter};

use crate::{
	catalog::{TableRef, ViewRef},
	lineage::{Edge, EdgeKind, HandlerContext},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sql {
	text: String,
}

impl Sql {
	/// Untracked SQL text. Reads through it are invisible to lineage.
	pub fn raw(text: impl Into<String>) -> Self {
		Self {
			text: text.into(),
		}
	}

	pub fn text(&self) -> &str {
		&self.text
	}
}

impl Display for Sql {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.text)
	}
}

/// Builds a SELECT, recording each referenced table or view as a pull.
pub struct SqlBuilder<'a> {
	ctx: &'a HandlerContext,
	columns: Vec<String>,
	from: Option<String>,
	joins: Vec<String>,
	filters: Vec<String>,
	group_by: Vec<String>,
	order_by: Vec<String>,
	limit: Option<u64>,
}

impl<'a> SqlBuilder<'a> {
	pub(crate) fn new(ctx: &'a HandlerContext) -> Self {
		Self {
			ctx,
			columns: vec![],
			from: None,
			joins: vec![],
			filters: vec![],
			group_by: vec![],
			order_by: vec![],
			limit: None,
		}
	}

	pub fn select(mut self, columns: &[&str]) -> Self {
		self.columns.extend(columns.iter().map(|c| c.to_string()));
		self
	}

	pub fn from(mut self, table: &TableRef) -> Self {
		self.ctx.record_pull(Edge::new(EdgeKind::Table, table.key()));
		self.from = Some(table.reference());
		self
	}

	pub fn from_view(mut self, view: &ViewRef) -> Self {
		self.ctx.record_pull(Edge::new(EdgeKind::View, view.name.clone()));
		self.from = Some(view.reference());
		self
	}

	pub fn join(mut self, table: &TableRef, on: &str) -> Self {
		self.ctx.record_pull(Edge::new(EdgeKind::Table, table.key()));
		self.joins.push(format!("JOIN {} ON {}", table.reference(), on));
		self
	}

	pub fn filter(mut self, predicate: impl Into<String>) -> Self {
		self.filters.push(predicate.into());
		self
	}

	pub fn group_by(mut self, columns: &[&str]) -> Self {
		self.group_by.extend(columns.iter().map(|c| c.to_string()));
		self
	}

	pub fn order_by(mut self, expression: impl Into<String>) -> Self {
		self.order_by.push(expression.into());
		self
	}

	pub fn limit(mut self, limit: u64) -> Self {
		self.limit = Some(limit);
		self
	}

	pub fn build(self) -> Sql {
		let columns = if self.columns.is_empty() {
			"*".to_string()
		} else {
			self.columns.join(", ")
		};
		let mut text = format!("SELECT {}", columns);
		if let Some(from) = &self.from {
			text.push_str(&format!(" FROM {}", from));
		}
		for join in &self.joins {
			text.push(' ');
			text.push_str(join);
		}
		if !self.filters.is_empty() {
			text.push_str(&format!(" WHERE {}", self.filters.join(" AND ")));
		}
		if !self.group_by.is_empty() {
			text.push_str(&format!(" GROUP BY {}", self.group_by.join(", ")));
		}
		if !self.order_by.is_empty() {
			text.push_str(&format!(" ORDER BY {}", self.order_by.join(", ")));
		}
		if let Some(limit) = self.limit {
			text.push_str(&format!(" LIMIT {}", limit));
		}
		Sql {
			text,
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::*;
	use crate::lineage::{LineageCollector, NoopDataPlane};

	fn table(name: &str, version: Option<&str>, database: Option<&str>) -> TableRef {
		TableRef {
			name: name.to_string(),
			version: version.map(str::to_string),
			database: database.map(str::to_string),
		}
	}

	#[test]
	fn test_build_select() {
		let ctx = HandlerContext::new(Arc::new(NoopDataPlane));
		let sql = ctx
			.sql()
			.select(&["id", "count() AS n"])
			.from(&table("orders", Some("1.0"), Some("sales")))
			.join(&table("users", None, None), "orders.user_id = users.id")
			.filter("amount > 10")
			.filter("status = 'paid'")
			.group_by(&["id"])
			.order_by("n DESC")
			.limit(5)
			.build();
		assert_eq!(
			sql.text(),
			"SELECT id, count() AS n FROM `sales`.`orders_1_0` JOIN `users` ON orders.user_id = users.id \
			 WHERE amount > 10 AND status = 'paid' GROUP BY id ORDER BY n DESC LIMIT 5"
		);
	}

	#[test]
	fn test_from_records_pull_at_call_time() {
		let collector = Arc::new(LineageCollector::new());
		let ctx = HandlerContext::tracing(None, collector.clone());
		// never built, never executed
		let _builder = ctx.sql().from(&table("orders", Some("1.0"), None)).from_view(&ViewRef {
			name: "daily".to_string(),
		});

		let lineage = collector.finish();
		assert!(lineage.pulls_from(EdgeKind::Table, "orders_1.0"));
		assert!(lineage.pulls_from(EdgeKind::View, "daily"));
	}
}
