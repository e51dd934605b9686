// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, instrument, warn};

use crate::{Result, catalog::Catalog};

/// Shared access to the active catalog.
///
/// Readers take a snapshot with [`current`](Self::current) and keep it as long as they
/// like. A reload declares everything again into a fresh catalog and publishes it only
/// once the declarations succeeded, so a snapshot is always a complete load.
#[derive(Clone)]
pub struct CatalogHandle {
	inner: Arc<RwLock<Arc<Catalog>>>,
}

impl CatalogHandle {
	pub fn new(catalog: Catalog) -> Self {
		Self {
			inner: Arc::new(RwLock::new(Arc::new(catalog))),
		}
	}

	pub fn current(&self) -> Arc<Catalog> {
		self.inner.read().clone()
	}

	/// Runs `declare` against an empty catalog with the current configuration and swaps
	/// it in. On error the previous catalog stays active.
	#[instrument(name = "catalog::handle::reload", level = "debug", skip_all)]
	pub fn reload<F>(&self, declare: F) -> Result<()>
	where
		F: FnOnce(&mut Catalog) -> Result<()>,
	{
		let mut next = self.current().fresh();
		if let Err(err) = declare(&mut next) {
			warn!(code = %err.code(), "reload failed, keeping previous catalog");
			return Err(err);
		}
		*self.inner.write() = Arc::new(next);
		debug!("catalog reloaded");
		Ok(())
	}
}

impl From<Catalog> for CatalogHandle {
	fn from(catalog: Catalog) -> Self {
		Self::new(catalog)
	}
}
