// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! The moose resource registry.
//!
//! Resources are declared against a [`Catalog`], which validates each declaration,
//! rejects collisions and keeps everything in declaration order. Handlers are stored
//! as opaque callables and only ever run for a lineage dry run.

#![cfg_attr(not(debug_assertions), deny(warnings))]

pub use catalog::*;
pub use moose_type::Error;

mod catalog;
pub mod engine;
pub mod error;
pub mod handler;
pub mod lineage;
pub mod typed;

pub type Result<T> = std::result::Result<T, Error>;
