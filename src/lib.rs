// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! IdP Account Server - Google sign-in backed account service
//!
//! This crate verifies Google ID tokens presented as bearer tokens and keeps
//! a local account per Google subject, created on first sign-in and kept in
//! step with the provider's profile data afterwards.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token verification, claim validation and account reconciliation
//! - `config` - Environment configuration
//! - `storage` - Embedded account database (redb)

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;

#[cfg(test)]
mod test_support;
