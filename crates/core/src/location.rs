// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Best-effort capture of the source location a resource was declared at.
//!
//! The production provider captures a backtrace and returns the first frame whose
//! function does not belong to the registry crates or the standard library, and whose
//! file is not inside a dependency checkout. Backtrace text is not a stable format, so
//! every parse failure yields `None`.

use std::backtrace::Backtrace;

use crate::metadata::SourceLocation;

pub trait LocationProvider: Send + Sync {
	fn locate(&self) -> Option<SourceLocation>;
}

/// Crates whose frames never describe a user declaration, matched on the frame symbol.
pub const INTERNAL_CRATES: &[&str] = &["moose_catalog", "moose_core", "moose_type", "std", "core", "alloc"];

/// Path segments of checkouts whose frames never describe a user declaration.
pub const INTERNAL_PATHS: &[&str] =
	&["/moose-catalog-", "/moose-core-", "/moose-type-", "/rustc/", ".cargo/registry/", ".cargo/git/"];

pub struct BacktraceLocation {
	skip: Vec<String>,
}

impl BacktraceLocation {
	pub fn new() -> Self {
		Self {
			skip: INTERNAL_PATHS.iter().map(|p| p.to_string()).collect(),
		}
	}

	/// Additionally skip frames whose path contains `fragment`.
	pub fn skip(mut self, fragment: impl Into<String>) -> Self {
		self.skip.push(fragment.into());
		self
	}
}

impl Default for BacktraceLocation {
	fn default() -> Self {
		Self::new()
	}
}

impl LocationProvider for BacktraceLocation {
	fn locate(&self) -> Option<SourceLocation> {
		let backtrace = Backtrace::force_capture();
		parse_backtrace(&backtrace.to_string(), &self.skip)
	}
}

pub struct NoLocation;

impl LocationProvider for NoLocation {
	fn locate(&self) -> Option<SourceLocation> {
		None
	}
}

/// Always reports the same location.
pub struct FixedLocation(pub SourceLocation);

impl LocationProvider for FixedLocation {
	fn locate(&self) -> Option<SourceLocation> {
		Some(self.0.clone())
	}
}

struct Frame<'a> {
	symbol: Option<&'a str>,
	location: SourceLocation,
}

impl Frame<'_> {
	fn is_internal(&self, skip: &[String]) -> bool {
		let internal_symbol = self.symbol.is_some_and(|symbol| {
			let symbol = symbol.trim_start_matches('<');
			INTERNAL_CRATES.iter().any(|krate| symbol.strip_prefix(*krate).is_some_and(|rest| rest.starts_with("::")))
		});
		let path = self.location.file.replace('\\', "/");
		internal_symbol || skip.iter().any(|fragment| path.contains(fragment.as_str()))
	}
}

/// Returns the first frame that belongs to neither an internal crate nor a path in `skip`.
pub fn parse_backtrace(text: &str, skip: &[String]) -> Option<SourceLocation> {
	let mut symbol = None;
	for line in text.lines() {
		if let Some(location) = parse_location(line) {
			let frame = Frame {
				symbol,
				location,
			};
			if !frame.is_internal(skip) {
				return Some(frame.location);
			}
		} else if let Some(next) = parse_symbol(line) {
			symbol = Some(next);
		}
	}
	None
}

/// `  12: path::to::function`
fn parse_symbol(line: &str) -> Option<&str> {
	let (index, symbol) = line.trim().split_once(": ")?;
	index.parse::<u32>().ok()?;
	Some(symbol.trim())
}

/// `at <path>:<line>:<column>`
fn parse_location(line: &str) -> Option<SourceLocation> {
	let location = line.trim().strip_prefix("at ")?;
	let mut parts = location.rsplitn(3, ':');
	let _column = parts.next()?.parse::<u32>().ok()?;
	let line = parts.next()?.parse::<u32>().ok()?;
	let file = parts.next()?;
	if file.is_empty() {
		return None;
	}
	Some(SourceLocation {
		file: file.to_string(),
		line: Some(line),
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	const SAMPLE: &str = "   0: std::backtrace::Backtrace::force_capture
             at /rustc/abc123/library/std/src/backtrace.rs:312:13
   1: moose_catalog::catalog::Catalog::create_table
             at /home/dev/moose/crates/catalog/src/table.rs:88:24
   2: app::declare
             at /home/dev/app/src/tables.rs:14:5
   3: main
             at /home/dev/app/src/main.rs:3:5";

	fn internal() -> Vec<String> {
		INTERNAL_PATHS.iter().map(|p| p.to_string()).collect()
	}

	#[test]
	fn test_first_user_frame_is_returned() {
		let location = parse_backtrace(SAMPLE, &internal()).unwrap();
		assert_eq!(location.file, "/home/dev/app/src/tables.rs");
		assert_eq!(location.line, Some(14));
	}

	#[test]
	fn test_extra_skip_moves_to_next_frame() {
		let mut skip = internal();
		skip.push("/app/src/tables.rs".to_string());
		let location = parse_backtrace(SAMPLE, &skip).unwrap();
		assert_eq!(location.file, "/home/dev/app/src/main.rs");
	}

	#[test]
	fn test_relative_paths_of_registry_frames_are_skipped() {
		let text = "   0: moose_catalog::catalog::Catalog::create_table
             at crates/catalog/src/catalog/table.rs:88:24
   1: <moose_core::location::BacktraceLocation as moose_core::location::LocationProvider>::locate
             at crates/core/src/location.rs:60:3
   2: app::declare
             at src/tables.rs:14:5";
		let location = parse_backtrace(text, &internal()).unwrap();
		assert_eq!(location.file, "src/tables.rs");
	}

	#[test]
	fn test_user_crate_layout_is_not_mistaken_for_registry() {
		let text = "   0: app_core::declare
             at /home/dev/app/crates/core/src/tables.rs:9:1";
		let location = parse_backtrace(text, &internal()).unwrap();
		assert_eq!(location.file, "/home/dev/app/crates/core/src/tables.rs");
	}

	#[test]
	fn test_dependency_checkout_is_skipped() {
		let text = "   0: serde::de::deserialize
             at /home/dev/.cargo/registry/src/index/moose-catalog-0.1.0/src/table.rs:3:1
   1: app::main
             at src/main.rs:2:1";
		assert_eq!(parse_backtrace(text, &internal()).unwrap().file, "src/main.rs");
	}

	#[test]
	fn test_windows_paths_are_matched_normalized() {
		let text = "  at C:\\Users\\dev\\.cargo\\registry\\src\\dep\\lib.rs:1:1\n  at C:\\app\\src\\main.rs:7:2";
		let location = parse_backtrace(text, &internal()).unwrap();
		assert_eq!(location.file, "C:\\app\\src\\main.rs");
		assert_eq!(location.line, Some(7));
	}

	#[test]
	fn test_unparseable_text_yields_none() {
		assert_eq!(parse_backtrace("disabled backtrace", &internal()), None);
		assert_eq!(parse_backtrace("at nowhere", &internal()), None);
		assert_eq!(parse_backtrace("", &internal()), None);
	}

	#[test]
	fn test_providers() {
		assert_eq!(NoLocation.locate(), None);
		let fixed = FixedLocation(SourceLocation {
			file: "app.rs".to_string(),
			line: Some(1),
		});
		assert_eq!(fixed.locate().unwrap().file, "app.rs");
	}
}
