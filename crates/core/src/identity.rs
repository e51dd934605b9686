// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::fmt::{Display, Formatter};

use serde::Serialize;

/// Name and optional version of a declared resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ResourceId {
	pub name: String,
	pub version: Option<String>,
}

impl ResourceId {
	pub fn new(name: impl Into<String>, version: Option<String>) -> Self {
		Self {
			name: name.into(),
			version,
		}
	}

	pub fn unversioned(name: impl Into<String>) -> Self {
		Self::new(name, None)
	}

	pub fn versioned(name: impl Into<String>, version: impl Into<String>) -> Self {
		Self::new(name, Some(version.into()))
	}

	/// `name` or `name_version`; the key used by the infrastructure map.
	pub fn key(&self) -> String {
		composite_key(&self.name, self.version.as_deref())
	}

	/// `name` or `name:version`; the registry key for query endpoints.
	pub fn api_key(&self) -> String {
		match &self.version {
			Some(version) => format!("{}:{}", self.name, version),
			None => self.name.clone(),
		}
	}
}

impl Display for ResourceId {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match &self.version {
			Some(version) => write!(f, "'{}' (version {})", self.name, version),
			None => write!(f, "'{}'", self.name),
		}
	}
}

pub fn composite_key(name: &str, version: Option<&str>) -> String {
	match version {
		Some(version) => format!("{}_{}", name, version),
		None => name.to_string(),
	}
}
