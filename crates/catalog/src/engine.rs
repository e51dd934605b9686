// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Storage engine configuration.
//!
//! A table carries exactly one [`EngineConfig`]. Loosely typed declarations are folded
//! into it by [`EngineConfig::from_options`], which dispatches on the `engine` tag and
//! falls back to `MergeTree` when no tag is given.

use indexmap::IndexMap;
use moose_type::{Diagnostic, Error, IntoDiagnostic};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const ENGINE_NAMES: &[&str] = &[
	"MergeTree",
	"ReplacingMergeTree",
	"AggregatingMergeTree",
	"SummingMergeTree",
	"ReplicatedMergeTree",
	"ReplicatedReplacingMergeTree",
	"ReplicatedAggregatingMergeTree",
	"ReplicatedSummingMergeTree",
	"S3Queue",
	"S3",
	"Buffer",
	"Distributed",
	"Kafka",
	"Merge",
];

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "engine", rename_all_fields = "camelCase")]
pub enum EngineConfig {
	#[default]
	MergeTree,
	ReplacingMergeTree {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		ver: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		is_deleted: Option<String>,
	},
	AggregatingMergeTree,
	SummingMergeTree {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		columns: Option<Vec<String>>,
	},
	ReplicatedMergeTree {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		keeper_path: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		replica_name: Option<String>,
	},
	ReplicatedReplacingMergeTree {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		keeper_path: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		replica_name: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		ver: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		is_deleted: Option<String>,
	},
	ReplicatedAggregatingMergeTree {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		keeper_path: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		replica_name: Option<String>,
	},
	ReplicatedSummingMergeTree {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		keeper_path: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		replica_name: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		columns: Option<Vec<String>>,
	},
	S3Queue {
		s3_path: String,
		format: String,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		aws_access_key_id: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		aws_secret_access_key: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		compression: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		headers: Option<IndexMap<String, String>>,
	},
	S3 {
		path: String,
		format: String,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		no_sign: Option<bool>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		aws_access_key_id: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		aws_secret_access_key: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		compression: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		partition_strategy: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		partition_columns_in_data_file: Option<String>,
	},
	Buffer {
		target_database: String,
		target_table: String,
		num_layers: u32,
		min_time: u32,
		max_time: u32,
		min_rows: u64,
		max_rows: u64,
		min_bytes: u64,
		max_bytes: u64,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		flush_time: Option<u32>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		flush_rows: Option<u64>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		flush_bytes: Option<u64>,
	},
	Distributed {
		cluster: String,
		target_database: String,
		target_table: String,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		sharding_key: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		policy_name: Option<String>,
	},
	Kafka {
		broker_list: String,
		topic_list: String,
		group_name: String,
		format: String,
	},
	Merge {
		source_database: String,
		tables_regexp: String,
	},
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
	#[error("unknown engine '{engine}'")]
	UnknownEngine {
		engine: String,
	},

	#[error("{engine} engine requires a non-empty '{parameter}'")]
	MissingParameter {
		engine: &'static str,
		parameter: &'static str,
	},

	#[error("{engine} engine requires keeperPath and replicaName together, or neither")]
	IncompleteReplication {
		engine: &'static str,
	},

	#[error("invalid {engine} engine parameters: {reason}")]
	InvalidParameters {
		engine: String,
		reason: String,
	},
}

impl IntoDiagnostic for EngineError {
	fn into_diagnostic(self) -> Diagnostic {
		let message = self.to_string();
		let (code, help) = match &self {
			EngineError::UnknownEngine {
				..
			} => ("ENGINE_001", Some(format!("Supported engines: {}", ENGINE_NAMES.join(", ")))),
			EngineError::MissingParameter {
				parameter,
				..
			} => ("ENGINE_002", Some(format!("Provide a value for '{}'", parameter))),
			EngineError::IncompleteReplication {
				..
			} => (
				"ENGINE_003",
				Some("Omit both to let the server pick defaults from its macros".to_string()),
			),
			EngineError::InvalidParameters {
				..
			} => ("ENGINE_004", None),
		};
		Diagnostic {
			code: code.to_string(),
			message,
			label: None,
			help,
			notes: vec![],
			cause: None,
		}
	}
}

impl From<EngineError> for Error {
	fn from(err: EngineError) -> Self {
		moose_type::error!(err)
	}
}

impl EngineConfig {
	/// Normalizes a loosely typed engine declaration.
	///
	/// `options` holds the engine parameters in camelCase; keys that belong to other
	/// concerns are ignored. The result has passed [`EngineConfig::validate`].
	pub fn from_options(engine: Option<&str>, options: &Value) -> Result<EngineConfig, EngineError> {
		let engine = engine.unwrap_or("MergeTree");
		if !ENGINE_NAMES.contains(&engine) {
			return Err(EngineError::UnknownEngine {
				engine: engine.to_string(),
			});
		}

		let mut object = match options {
			Value::Object(object) => object.clone(),
			_ => Map::new(),
		};
		object.insert("engine".to_string(), Value::String(engine.to_string()));

		let config: EngineConfig =
			serde_json::from_value(Value::Object(object)).map_err(|err| EngineError::InvalidParameters {
				engine: engine.to_string(),
				reason: err.to_string(),
			})?;
		config.validate()?;
		Ok(config)
	}

	pub fn name(&self) -> &'static str {
		match self {
			EngineConfig::MergeTree => "MergeTree",
			EngineConfig::ReplacingMergeTree {
				..
			} => "ReplacingMergeTree",
			EngineConfig::AggregatingMergeTree => "AggregatingMergeTree",
			EngineConfig::SummingMergeTree {
				..
			} => "SummingMergeTree",
			EngineConfig::ReplicatedMergeTree {
				..
			} => "ReplicatedMergeTree",
			EngineConfig::ReplicatedReplacingMergeTree {
				..
			} => "ReplicatedReplacingMergeTree",
			EngineConfig::ReplicatedAggregatingMergeTree {
				..
			} => "ReplicatedAggregatingMergeTree",
			EngineConfig::ReplicatedSummingMergeTree {
				..
			} => "ReplicatedSummingMergeTree",
			EngineConfig::S3Queue {
				..
			} => "S3Queue",
			EngineConfig::S3 {
				..
			} => "S3",
			EngineConfig::Buffer {
				..
			} => "Buffer",
			EngineConfig::Distributed {
				..
			} => "Distributed",
			EngineConfig::Kafka {
				..
			} => "Kafka",
			EngineConfig::Merge {
				..
			} => "Merge",
		}
	}

	pub fn validate(&self) -> Result<(), EngineError> {
		let engine = self.name();
		let require = |parameter: &'static str, value: &str| {
			if value.trim().is_empty() {
				Err(EngineError::MissingParameter {
					engine,
					parameter,
				})
			} else {
				Ok(())
			}
		};

		match self {
			EngineConfig::ReplicatedMergeTree {
				keeper_path,
				replica_name,
			}
			| EngineConfig::ReplicatedReplacingMergeTree {
				keeper_path,
				replica_name,
				..
			}
			| EngineConfig::ReplicatedAggregatingMergeTree {
				keeper_path,
				replica_name,
			}
			| EngineConfig::ReplicatedSummingMergeTree {
				keeper_path,
				replica_name,
				..
			} => {
				if keeper_path.is_some() != replica_name.is_some() {
					return Err(EngineError::IncompleteReplication {
						engine,
					});
				}
				Ok(())
			}
			EngineConfig::S3Queue {
				s3_path,
				format,
				..
			} => {
				require("s3Path", s3_path)?;
				require("format", format)
			}
			EngineConfig::S3 {
				path,
				format,
				..
			} => {
				require("path", path)?;
				require("format", format)
			}
			EngineConfig::Buffer {
				target_database,
				target_table,
				..
			} => {
				require("targetDatabase", target_database)?;
				require("targetTable", target_table)
			}
			EngineConfig::Distributed {
				cluster,
				target_database,
				target_table,
				..
			} => {
				require("cluster", cluster)?;
				require("targetDatabase", target_database)?;
				require("targetTable", target_table)
			}
			EngineConfig::Kafka {
				broker_list,
				topic_list,
				group_name,
				format,
			} => {
				require("brokerList", broker_list)?;
				require("topicList", topic_list)?;
				require("groupName", group_name)?;
				require("format", format)
			}
			EngineConfig::Merge {
				source_database,
				tables_regexp,
			} => {
				require("sourceDatabase", source_database)?;
				require("tablesRegexp", tables_regexp)
			}
			_ => Ok(()),
		}
	}

	/// Whether ORDER BY, PARTITION BY and SAMPLE BY clauses apply to this engine.
	pub fn supports_ordering(&self) -> bool {
		!matches!(
			self,
			EngineConfig::Kafka { .. }
				| EngineConfig::Buffer { .. }
				| EngineConfig::Distributed { .. }
				| EngineConfig::Merge { .. }
		)
	}

	pub fn is_default(&self) -> bool {
		matches!(self, EngineConfig::MergeTree)
	}

	/// Table settings implied by the engine, applied only when not set explicitly.
	pub fn default_settings(&self) -> Vec<(&'static str, &'static str)> {
		match self {
			EngineConfig::S3Queue {
				..
			} => vec![("mode", "unordered")],
			_ => vec![],
		}
	}
}
