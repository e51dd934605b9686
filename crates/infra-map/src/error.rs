// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use moose_type::{Diagnostic, Error, IntoDiagnostic};

use crate::map::Section;

#[derive(Debug, Clone, thiserror::Error)]
pub enum InfraMapError {
	#[error("{section} key '{key}' is produced by both '{existing}' and '{incoming}'")]
	KeyCollision {
		section: Section,
		key: String,
		existing: String,
		incoming: String,
	},

	#[error("infrastructure map could not be encoded: {reason}")]
	Encoding {
		reason: String,
	},
}

impl IntoDiagnostic for InfraMapError {
	fn into_diagnostic(self) -> Diagnostic {
		let message = self.to_string();
		match self {
			InfraMapError::KeyCollision {
				section,
				..
			} => Diagnostic {
				code: "INFRA_001".to_string(),
				message,
				label: Some(format!("duplicate {} key", section)),
				help: Some("Rename one of the resources so their map keys differ".to_string()),
				notes: vec!["Map keys join name and version with '_'".to_string()],
				cause: None,
			},
			InfraMapError::Encoding {
				..
			} => Diagnostic {
				code: "INFRA_002".to_string(),
				message,
				label: None,
				help: None,
				notes: vec![],
				cause: None,
			},
		}
	}
}

impl From<InfraMapError> for Error {
	fn from(err: InfraMapError) -> Self {
		moose_type::error!(err)
	}
}
