// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

/// Builds an [`Error`](crate::error::Error) from anything that converts into a diagnostic.
#[macro_export]
macro_rules! error {
	($diagnostic:expr) => {
		$crate::error::Error(Box::new($crate::error::IntoDiagnostic::into_diagnostic($diagnostic)))
	};
}

