// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn account_type_round_trips_through_json() {
    let json = serde_json::to_string(&AccountType::Harvester).unwrap();
    assert_eq!(json, "\"harvester\"");
    let back: AccountType = serde_json::from_str(&json).unwrap();
    assert_eq!(back, AccountType::Harvester);
}

#[test]
fn updatable_fields_exclude_primary_id() {
    assert!(!User::UPDATABLE_FIELDS.contains(&"user_id"));
}
