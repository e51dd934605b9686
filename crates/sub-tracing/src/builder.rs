// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
	#[default]
	Pretty,
	Compact,
	Json,
}

/// Configures the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured filter when it is set.
#[derive(Debug, Clone)]
pub struct TracingBuilder {
	filter: String,
	format: LogFormat,
	with_target: bool,
	test_writer: bool,
}

impl Default for TracingBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl TracingBuilder {
	pub fn new() -> Self {
		Self {
			filter: DEFAULT_FILTER.to_string(),
			format: LogFormat::Pretty,
			with_target: true,
			test_writer: false,
		}
	}

	/// Filter directives, e.g. `"warn,moose_catalog=debug"`.
	pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
		self.filter = filter.into();
		self
	}

	pub fn with_format(mut self, format: LogFormat) -> Self {
		self.format = format;
		self
	}

	pub fn json(self) -> Self {
		self.with_format(LogFormat::Json)
	}

	pub fn with_target(mut self, with_target: bool) -> Self {
		self.with_target = with_target;
		self
	}

	/// Writes through the test harness so output is captured per test.
	pub fn for_tests(mut self) -> Self {
		self.test_writer = true;
		self
	}

	pub fn filter(&self) -> &str {
		&self.filter
	}

	pub fn format(&self) -> LogFormat {
		self.format
	}

	fn env_filter(&self) -> EnvFilter {
		EnvFilter::try_from_default_env()
			.or_else(|_| EnvFilter::try_new(&self.filter))
			.unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
	}

	/// Installs the subscriber. Returns `false` when one was already installed, which
	/// leaves the existing subscriber in place.
	pub fn init(self) -> bool {
		let filter = self.env_filter();
		let registry = tracing_subscriber::registry().with(filter);
		let result = match (self.format, self.test_writer) {
			(LogFormat::Pretty, false) => {
				registry.with(fmt::layer().pretty().with_target(self.with_target)).try_init()
			}
			(LogFormat::Pretty, true) => registry
				.with(fmt::layer().pretty().with_target(self.with_target).with_test_writer())
				.try_init(),
			(LogFormat::Compact, false) => {
				registry.with(fmt::layer().compact().with_target(self.with_target)).try_init()
			}
			(LogFormat::Compact, true) => registry
				.with(fmt::layer().compact().with_target(self.with_target).with_test_writer())
				.try_init(),
			(LogFormat::Json, false) => {
				registry.with(fmt::layer().json().with_target(self.with_target)).try_init()
			}
			(LogFormat::Json, true) => registry
				.with(fmt::layer().json().with_target(self.with_target).with_test_writer())
				.try_init(),
		};
		result.is_ok()
	}
}
