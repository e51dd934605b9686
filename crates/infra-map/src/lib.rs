// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! The infrastructure map: a flat, deterministic document describing every resource
//! in a [`Catalog`](moose_catalog::Catalog), consumed by the provisioner.

#![cfg_attr(not(debug_assertions), deny(warnings))]

pub mod descriptor;
pub mod error;
mod map;

pub use error::InfraMapError;
pub use map::{InfraMap, Section};
pub use moose_type::Error;

pub type Result<T> = std::result::Result<T, Error>;
