// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::Json;

use crate::auth::Authenticated;
use crate::models::AccountResponse;

/// The signed-in account.
///
/// The extractor has already created the account or refreshed its provider
/// fields, so this only shapes the response.
pub async fn get_account(Authenticated(account): Authenticated) -> Json<AccountResponse> {
    Json(AccountResponse::from(account))
}
