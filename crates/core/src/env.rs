// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Deferred environment lookups.
//!
//! While the infrastructure map is being built, [`RuntimeEnv::get`] returns a marker
//! string instead of the live value, so secrets never end up in the serialized map.
//! The provisioner later swaps each marker for the real value with
//! [`resolve_runtime_env`]. When handlers execute for real, the same accessor reads
//! the environment directly.

use moose_type::{Diagnostic, Error, IntoDiagnostic};

use crate::config::ExecutionMode;

pub const RUNTIME_ENV_PREFIX: &str = "__MOOSE_RUNTIME_ENV__:";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeEnvError {
	#[error("environment variable name cannot be empty")]
	EmptyName,

	#[error("environment variable '{name}' is not set")]
	NotSet {
		name: String,
	},
}

impl IntoDiagnostic for RuntimeEnvError {
	fn into_diagnostic(self) -> Diagnostic {
		match self {
			RuntimeEnvError::EmptyName => Diagnostic {
				code: "ENV_001".to_string(),
				message: "Environment variable name cannot be empty".to_string(),
				label: None,
				help: Some("Pass the name of the variable to read, e.g. AWS_ACCESS_KEY_ID".to_string()),
				notes: vec![],
				cause: None,
			},
			RuntimeEnvError::NotSet {
				name,
			} => Diagnostic {
				code: "ENV_002".to_string(),
				message: format!("Environment variable '{}' is not set", name),
				label: Some(format!("required by a runtime environment reference to '{}'", name)),
				help: Some(format!("Export {} before starting the process", name)),
				notes: vec![],
				cause: None,
			},
		}
	}
}

impl From<RuntimeEnvError> for Error {
	fn from(err: RuntimeEnvError) -> Self {
		moose_type::error!(err)
	}
}

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

pub struct RuntimeEnv {
	mode: ExecutionMode,
	lookup: Lookup,
}

impl RuntimeEnv {
	pub fn new(mode: ExecutionMode) -> Self {
		Self::with_lookup(mode, |name| std::env::var(name).ok())
	}

	pub fn with_lookup<F>(mode: ExecutionMode, lookup: F) -> Self
	where
		F: Fn(&str) -> Option<String> + Send + Sync + 'static,
	{
		Self {
			mode,
			lookup: Box::new(lookup),
		}
	}

	pub fn mode(&self) -> ExecutionMode {
		self.mode
	}

	pub fn get(&self, name: &str) -> crate::Result<String> {
		match self.mode {
			ExecutionMode::InfraMap => marker(name),
			ExecutionMode::Runtime => {
				if name.trim().is_empty() {
					return Err(RuntimeEnvError::EmptyName.into());
				}
				(self.lookup)(name).ok_or_else(|| {
					RuntimeEnvError::NotSet {
						name: name.to_string(),
					}
					.into()
				})
			}
		}
	}
}

/// The marker standing in for the value of `name`.
pub fn marker(name: &str) -> crate::Result<String> {
	if name.trim().is_empty() {
		return Err(RuntimeEnvError::EmptyName.into());
	}
	Ok(format!("{}{}", RUNTIME_ENV_PREFIX, name))
}

pub fn is_marker(value: &str) -> bool {
	value.starts_with(RUNTIME_ENV_PREFIX)
}

/// Replaces a marker with the live value; any other string passes through unchanged.
pub fn resolve_runtime_env(value: &str) -> crate::Result<String> {
	resolve_runtime_env_with(value, |name| std::env::var(name).ok())
}

pub fn resolve_runtime_env_with(value: &str, lookup: impl Fn(&str) -> Option<String>) -> crate::Result<String> {
	let Some(name) = value.strip_prefix(RUNTIME_ENV_PREFIX) else {
		return Ok(value.to_string());
	};
	if name.is_empty() {
		return Err(RuntimeEnvError::EmptyName.into());
	}
	lookup(name).ok_or_else(|| {
		RuntimeEnvError::NotSet {
			name: name.to_string(),
		}
		.into()
	})
}
