// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use tracing::debug;

pub const ENV_HOT_RELOAD: &str = "MOOSE_HOT_RELOAD";
pub const ENV_LOADING_INFRA_MAP: &str = "IS_LOADING_INFRA_MAP";
pub const ENV_CAPTURE_SOURCE_LOCATION: &str = "MOOSE_CAPTURE_SOURCE_LOCATION";

/// What a constructor does when its composite key is already registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
	#[default]
	Reject,
	/// Overwrite in place. Used when declaration code is re-executed on every change.
	Replace,
}

/// Whether declarations are being evaluated to build the infrastructure map, or
/// handlers are running for real.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionMode {
	InfraMap,
	#[default]
	Runtime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
	pub duplicates: DuplicatePolicy,
	pub mode: ExecutionMode,
	pub capture_source_location: bool,
}

impl Default for CatalogConfig {
	fn default() -> Self {
		Self {
			duplicates: DuplicatePolicy::Reject,
			mode: ExecutionMode::Runtime,
			capture_source_location: true,
		}
	}
}

impl CatalogConfig {
	pub fn builder() -> CatalogConfigBuilder {
		CatalogConfigBuilder::new()
	}

	pub fn from_env() -> Self {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
		let flag = |key: &str| lookup(key).map(|v| parse_flag(&v));

		let duplicates = match flag(ENV_HOT_RELOAD) {
			Some(true) => DuplicatePolicy::Replace,
			_ => DuplicatePolicy::Reject,
		};
		let mode = match flag(ENV_LOADING_INFRA_MAP) {
			Some(true) => ExecutionMode::InfraMap,
			_ => ExecutionMode::Runtime,
		};
		let capture_source_location = flag(ENV_CAPTURE_SOURCE_LOCATION).unwrap_or(true);

		let config = Self {
			duplicates,
			mode,
			capture_source_location,
		};
		debug!(?config, "catalog configuration resolved from environment");
		config
	}

	pub fn is_permissive(&self) -> bool {
		self.duplicates == DuplicatePolicy::Replace
	}
}

fn parse_flag(value: &str) -> bool {
	matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

pub struct CatalogConfigBuilder {
	config: CatalogConfig,
}

impl CatalogConfigBuilder {
	pub fn new() -> Self {
		Self {
			config: CatalogConfig::default(),
		}
	}

	pub fn duplicates(mut self, policy: DuplicatePolicy) -> Self {
		self.config.duplicates = policy;
		self
	}

	pub fn permissive(self) -> Self {
		self.duplicates(DuplicatePolicy::Replace)
	}

	pub fn mode(mut self, mode: ExecutionMode) -> Self {
		self.config.mode = mode;
		self
	}

	pub fn capture_source_location(mut self, enabled: bool) -> Self {
		self.config.capture_source_location = enabled;
		self
	}

	pub fn build(self) -> CatalogConfig {
		self.config
	}
}

impl Default for CatalogConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}
