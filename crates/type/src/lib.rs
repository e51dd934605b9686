// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Diagnostics and the shared error type.
//!
//! Every crate in the workspace raises its own `thiserror` enum and converts it into
//! [`Error`], which carries a rendered [`Diagnostic`]: a stable code, a message naming
//! the resource and the violated invariant, plus optional help and notes.

pub mod error;

pub use error::{Diagnostic, Error, IntoDiagnostic};

pub type Result<T> = std::result::Result<T, Error>;
