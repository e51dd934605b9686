// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::collections::HashSet;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::column::{Column, object_schema};

/// The shape of a resource: its ordered columns and the JSON schema derived from them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
	pub columns: Vec<Column>,
	pub json_schema: Value,
}

impl Schema {
	pub fn new(columns: Vec<Column>) -> Self {
		let json_schema = object_schema(columns.iter().map(|c| (c.name.as_str(), &c.data_type, c.required)));
		Self {
			columns,
			json_schema,
		}
	}

	pub fn column(&self, name: &str) -> Option<&Column> {
		self.columns.iter().find(|c| c.name == name)
	}

	pub fn has_column(&self, name: &str) -> bool {
		self.column(name).is_some()
	}

	/// The first column name that appears more than once, if any.
	pub fn duplicate_column(&self) -> Option<&str> {
		let mut seen = HashSet::new();
		self.columns.iter().map(|c| c.name.as_str()).find(|name| !seen.insert(*name))
	}

	pub fn primary_key(&self) -> Vec<String> {
		self.columns.iter().filter(|c| c.primary_key).map(|c| c.name.clone()).collect()
	}

	pub fn sample(&self) -> Value {
		let mut object = Map::new();
		for column in &self.columns {
			object.insert(column.name.clone(), column.data_type.sample());
		}
		Value::Object(object)
	}

	/// Returns a copy with `extra` appended after the existing columns.
	pub fn extended(&self, extra: impl IntoIterator<Item = Column>) -> Self {
		let mut columns = self.columns.clone();
		columns.extend(extra);
		Self::new(columns)
	}
}

/// A type whose schema is known statically.
///
/// Resources are generic over the record type they carry; implementing this trait is
/// how a record type supplies the columns a resource needs at construction time.
pub trait Model {
	fn schema() -> Schema;
}
