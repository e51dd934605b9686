// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::sync::Once;

use moose_catalog::{Catalog, TableRef};
use moose_core::{CatalogConfig, Column, DataType, DuplicatePolicy, Schema};
use moose_sub_tracing::TracingBuilder;

static TRACING: Once = Once::new();

/// Installs a test-captured subscriber once per process. `RUST_LOG` controls the level.
pub fn init_tracing() {
	TRACING.call_once(|| {
		TracingBuilder::new().with_filter("warn").for_tests().init();
	});
}

/// A catalog that rejects duplicates and captures no source locations.
pub fn catalog() -> Catalog {
	Catalog::new(CatalogConfig::builder().capture_source_location(false).build())
}

/// Like [`catalog`], with duplicates replacing earlier registrations.
pub fn permissive_catalog() -> Catalog {
	Catalog::new(CatalogConfig::builder().duplicates(DuplicatePolicy::Replace).capture_source_location(false).build())
}

pub fn users_schema() -> Schema {
	Schema::new(vec![
		Column::new("id", DataType::String).primary_key(),
		Column::new("email", DataType::String).unique(),
		Column::new("name", DataType::String).optional(),
		Column::new("createdAt", DataType::DateTime {
			precision: None,
		}),
	])
}

pub fn orders_schema() -> Schema {
	Schema::new(vec![
		Column::new("orderId", DataType::String).primary_key(),
		Column::new("userId", DataType::String),
		Column::new("amount", DataType::Float64),
		Column::new("items", DataType::array(DataType::String)),
		Column::new("placedAt", DataType::DateTime {
			precision: None,
		}),
	])
}

/// Query parameters of a paginated read endpoint.
pub fn page_params() -> Schema {
	Schema::new(vec![Column::new("limit", DataType::Int32), Column::new("offset", DataType::Int32).optional()])
}

pub fn table_ref(name: &str) -> TableRef {
	TableRef {
		name: name.to_string(),
		version: None,
		database: None,
	}
}
