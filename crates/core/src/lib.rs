// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

pub mod column;
pub mod config;
pub mod env;
pub mod identity;
pub mod location;
pub mod metadata;
pub mod schema;

pub use column::{Column, DataType, EnumMember, EnumValue};
pub use config::{CatalogConfig, DuplicatePolicy, ExecutionMode};
pub use identity::ResourceId;
pub use metadata::{LifeCycle, Metadata, SourceLocation};
pub use moose_type::{Error, Result};
pub use schema::{Model, Schema};
