// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::fmt::{Display, Formatter};

use moose_type::{Diagnostic, Error, IntoDiagnostic};

use crate::engine::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
	Table,
	Stream,
	IngestApi,
	Api,
	SqlResource,
	View,
	MaterializedView,
	CdcSource,
	CdcTable,
	Workflow,
	Task,
	WebApp,
	IngestPipeline,
	Transform,
	Consumer,
}

impl Display for ResourceKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			ResourceKind::Table => f.write_str("table"),
			ResourceKind::Stream => f.write_str("stream"),
			ResourceKind::IngestApi => f.write_str("ingest API"),
			ResourceKind::Api => f.write_str("API"),
			ResourceKind::SqlResource => f.write_str("SQL resource"),
			ResourceKind::View => f.write_str("view"),
			ResourceKind::MaterializedView => f.write_str("materialized view"),
			ResourceKind::CdcSource => f.write_str("CDC source"),
			ResourceKind::CdcTable => f.write_str("CDC table"),
			ResourceKind::Workflow => f.write_str("workflow"),
			ResourceKind::Task => f.write_str("task"),
			ResourceKind::WebApp => f.write_str("web app"),
			ResourceKind::IngestPipeline => f.write_str("ingest pipeline"),
			ResourceKind::Transform => f.write_str("transform"),
			ResourceKind::Consumer => f.write_str("consumer"),
		}
	}
}

fn versioned(name: &str, version: &Option<String>) -> String {
	match version {
		Some(version) => format!("'{}' version {}", name, version),
		None => format!("'{}'", name),
	}
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum CatalogError {
	#[error("{kind} {} already exists", versioned(.name, .version))]
	AlreadyExists {
		kind: ResourceKind,
		name: String,
		version: Option<String>,
	},

	#[error("path '{path}' of {kind} '{name}' is already claimed by '{existing}'")]
	PathConflict {
		kind: ResourceKind,
		name: String,
		path: String,
		existing: String,
	},

	#[error("mount path '{mount_path}' of web app '{name}' is already used by web app '{existing}'")]
	MountPathConflict {
		name: String,
		mount_path: String,
		existing: String,
	},

	#[error("invalid mount path '{mount_path}' for web app '{name}': {reason}")]
	InvalidMountPath {
		name: String,
		mount_path: String,
		reason: String,
	},

	#[error("{kind} '{name}' is missing required field '{field}'")]
	MissingField {
		kind: ResourceKind,
		name: String,
		field: &'static str,
	},

	#[error("{kind} '{name}' cannot set both '{first}' and '{second}'")]
	MutuallyExclusive {
		kind: ResourceKind,
		name: String,
		first: &'static str,
		second: &'static str,
	},

	#[error("{kind} '{name}' has an invalid '{field}': {reason}")]
	InvalidValue {
		kind: ResourceKind,
		name: String,
		field: &'static str,
		reason: String,
	},

	#[error("{kind} '{name}' uses reserved name '{reserved}'")]
	ReservedName {
		kind: ResourceKind,
		name: String,
		reserved: String,
	},

	#[error("{kind} '{name}' cannot use engine {engine}: {reason}")]
	UnsupportedEngine {
		kind: ResourceKind,
		name: String,
		engine: String,
		reason: String,
	},

	#[error("table {} has an invalid engine configuration", versioned(.name, .version))]
	InvalidEngine {
		name: String,
		version: Option<String>,
		#[source]
		source: EngineError,
	},

	#[error("{kind} '{name}' was declared without a schema")]
	SchemaMissing {
		kind: ResourceKind,
		name: String,
	},

	#[error("{kind} '{name}' declares column '{column}' more than once")]
	DuplicateColumn {
		kind: ResourceKind,
		name: String,
		column: String,
	},

	#[error("{kind} '{name}' depends on unsupported or unknown resource '{dependency}'")]
	UnknownDependency {
		kind: ResourceKind,
		name: String,
		dependency: String,
	},

	#[error("{kind} {} not found", versioned(.name, .version))]
	NotFound {
		kind: ResourceKind,
		name: String,
		version: Option<String>,
	},

	#[error("record rejected by {kind} '{name}': {reason}")]
	InvalidRecord {
		kind: ResourceKind,
		name: String,
		reason: String,
	},

	#[error("platform utilities were not injected into this handler")]
	UtilitiesUnavailable,
}

impl IntoDiagnostic for CatalogError {
	fn into_diagnostic(self) -> Diagnostic {
		let message = self.to_string();
		match self {
			CatalogError::AlreadyExists {
				kind,
				..
			} => Diagnostic {
				code: "CATALOG_001".to_string(),
				message,
				label: Some(format!("duplicate {}", kind)),
				help: Some(format!(
					"Give the {} a different name or version, or enable hot reload to replace it",
					kind
				)),
				notes: vec!["Registry keys combine the name with the optional version".to_string()],
				cause: None,
			},

			CatalogError::PathConflict {
				..
			} => Diagnostic {
				code: "CATALOG_002".to_string(),
				message,
				label: Some("conflicting endpoint path".to_string()),
				help: Some("Choose a path not used by any other endpoint name or path".to_string()),
				notes: vec![
					"A versioned endpoint with a custom path also claims '<path>/<version>'".to_string(),
				],
				cause: None,
			},

			CatalogError::MountPathConflict {
				..
			} => Diagnostic {
				code: "CATALOG_003".to_string(),
				message,
				label: Some("duplicate mount path".to_string()),
				help: Some("Every web app needs its own mount path".to_string()),
				notes: vec![],
				cause: None,
			},

			CatalogError::InvalidMountPath {
				..
			} => Diagnostic {
				code: "CATALOG_004".to_string(),
				message,
				label: Some("invalid mount path".to_string()),
				help: Some("Use a path such as '/myapp' that is not root and does not end with '/'".to_string()),
				notes: vec![
					"Reserved prefixes: /admin, /api, /consumption, /health, /ingest, /moose, /ready, /workflows"
						.to_string(),
				],
				cause: None,
			},

			CatalogError::MissingField {
				field,
				..
			} => Diagnostic {
				code: "CATALOG_005".to_string(),
				message,
				label: Some(format!("'{}' is required", field)),
				help: None,
				notes: vec![],
				cause: None,
			},

			CatalogError::MutuallyExclusive {
				first,
				second,
				..
			} => Diagnostic {
				code: "CATALOG_006".to_string(),
				message,
				label: Some("conflicting options".to_string()),
				help: Some(format!("Set either '{}' or '{}', not both", first, second)),
				notes: vec![],
				cause: None,
			},

			CatalogError::InvalidValue {
				..
			} => Diagnostic {
				code: "CATALOG_007".to_string(),
				message,
				label: Some("invalid value".to_string()),
				help: None,
				notes: vec![],
				cause: None,
			},

			CatalogError::ReservedName {
				..
			} => Diagnostic {
				code: "CATALOG_008".to_string(),
				message,
				label: Some("reserved name".to_string()),
				help: Some("Rename the conflicting field".to_string()),
				notes: vec![],
				cause: None,
			},

			CatalogError::UnsupportedEngine {
				..
			} => Diagnostic {
				code: "CATALOG_009".to_string(),
				message,
				label: Some("unsupported engine".to_string()),
				help: None,
				notes: vec![],
				cause: None,
			},

			CatalogError::InvalidEngine {
				source,
				..
			} => Diagnostic {
				code: "CATALOG_010".to_string(),
				message,
				label: Some("invalid engine configuration".to_string()),
				help: None,
				notes: vec![],
				cause: Some(Box::new(source.into_diagnostic())),
			},

			CatalogError::SchemaMissing {
				..
			} => Diagnostic {
				code: "CATALOG_011".to_string(),
				message,
				label: Some("missing schema".to_string()),
				help: Some("Construct the resource from a record type implementing Model, or pass a Schema"
					.to_string()),
				notes: vec!["This is a programming error and cannot be recovered at runtime".to_string()],
				cause: None,
			},

			CatalogError::DuplicateColumn {
				..
			} => Diagnostic {
				code: "CATALOG_012".to_string(),
				message,
				label: Some("duplicate column".to_string()),
				help: Some("Column names must be unique within a resource".to_string()),
				notes: vec![],
				cause: None,
			},

			CatalogError::UnknownDependency {
				..
			} => Diagnostic {
				code: "CATALOG_013".to_string(),
				message,
				label: Some("unknown dependency".to_string()),
				help: Some("SQL resources may only depend on tables, views and other SQL resources".to_string()),
				notes: vec![],
				cause: None,
			},

			CatalogError::NotFound {
				..
			} => Diagnostic {
				code: "CATALOG_014".to_string(),
				message,
				label: None,
				help: Some("Declare the resource before referring to it".to_string()),
				notes: vec![],
				cause: None,
			},

			CatalogError::InvalidRecord {
				..
			} => Diagnostic {
				code: "CATALOG_015".to_string(),
				message,
				label: Some("invalid record".to_string()),
				help: None,
				notes: vec![],
				cause: None,
			},

			CatalogError::UtilitiesUnavailable => Diagnostic {
				code: "CATALOG_016".to_string(),
				message,
				label: None,
				help: Some("Enable inject_utils on the web app to query or write data".to_string()),
				notes: vec![],
				cause: None,
			},
		}
	}
}

impl From<CatalogError> for Error {
	fn from(err: CatalogError) -> Self {
		moose_type::error!(err)
	}
}
