// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
	pub file: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub line: Option<u32>,
}

/// Descriptive information attached to a resource. Never used for program logic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub source: Option<SourceLocation>,
}

impl Metadata {
	pub fn described(description: impl Into<String>) -> Self {
		Self {
			description: Some(description.into()),
			source: None,
		}
	}

	pub fn is_empty(&self) -> bool {
		self.description.is_none() && self.source.is_none()
	}
}

/// Who owns the physical resource once it has been provisioned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifeCycle {
	#[default]
	FullyManaged,
	DeletionProtected,
	ExternallyManaged,
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn test_lifecycle_serialization() {
		assert_eq!(serde_json::to_value(LifeCycle::FullyManaged).unwrap(), json!("FULLY_MANAGED"));
		assert_eq!(serde_json::to_value(LifeCycle::ExternallyManaged).unwrap(), json!("EXTERNALLY_MANAGED"));
	}

	#[test]
	fn test_metadata_skips_absent_fields() {
		assert_eq!(serde_json::to_value(Metadata::described("orders")).unwrap(), json!({"description": "orders"}));
		assert!(Metadata::default().is_empty());
	}
}
