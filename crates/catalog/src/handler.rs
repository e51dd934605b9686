// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Handler callables stored by the registry. The registry never inspects them beyond
//! invoking them during a lineage dry run.

use std::sync::Arc;

use serde_json::Value;

use crate::{Result, lineage::HandlerContext};

pub type ApiHandler = Arc<dyn Fn(&HandlerContext, Value) -> Result<Value> + Send + Sync>;

pub type TaskHandler = Arc<dyn Fn(&HandlerContext, Value) -> Result<Value> + Send + Sync>;

/// Returns `None` to drop the record.
pub type TransformHandler = Arc<dyn Fn(&HandlerContext, Value) -> Result<Option<Value>> + Send + Sync>;

/// Routes one record to any number of streams through [`HandlerContext::send`].
pub type MultiTransformHandler = Arc<dyn Fn(&HandlerContext, Value) -> Result<()> + Send + Sync>;

pub type ConsumerHandler = Arc<dyn Fn(&HandlerContext, Value) -> Result<()> + Send + Sync>;

pub fn api_handler<F>(f: F) -> ApiHandler
where
	F: Fn(&HandlerContext, Value) -> Result<Value> + Send + Sync + 'static,
{
	Arc::new(f)
}

pub fn task_handler<F>(f: F) -> TaskHandler
where
	F: Fn(&HandlerContext, Value) -> Result<Value> + Send + Sync + 'static,
{
	Arc::new(f)
}

pub fn transform_handler<F>(f: F) -> TransformHandler
where
	F: Fn(&HandlerContext, Value) -> Result<Option<Value>> + Send + Sync + 'static,
{
	Arc::new(f)
}

pub fn multi_transform_handler<F>(f: F) -> MultiTransformHandler
where
	F: Fn(&HandlerContext, Value) -> Result<()> + Send + Sync + 'static,
{
	Arc::new(f)
}

pub fn consumer_handler<F>(f: F) -> ConsumerHandler
where
	F: Fn(&HandlerContext, Value) -> Result<()> + Send + Sync + 'static,
{
	Arc::new(f)
}
