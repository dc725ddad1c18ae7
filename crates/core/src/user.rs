// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User entity. Modeled here purely to round out the five DB collections
//! the broker reconciles against; authentication itself is out of scope.

use crate::id::UserId;
use serde::{Deserialize, Serialize};

/// Kind of account a [`User`] holds, distinguishing at least administrator
/// and harvester accounts from ordinary ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Administrator,
    Harvester,
    User,
}

/// A registered account. Credential hashing and auth flows are the REST
/// layer's responsibility (contract-only here); the broker only needs to
/// read/write this row's existence and approval flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub account_type: AccountType,
    pub approved: bool,
}

impl User {
    pub const UPDATABLE_FIELDS: &'static [&'static str] =
        &["username", "email", "account_type", "approved"];
}

#[cfg(test)]
#[path = "user_tests.rs"]
mod tests;
