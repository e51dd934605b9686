// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Fixtures shared by the test suites of the moose crates.

pub mod fixture;

pub use fixture::*;
