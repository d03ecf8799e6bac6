//! Database model types for Diesel ORM.
//!
//! Decimals are stored as their canonical text so the fixed scale survives
//! the round trip; `last_updated` is RFC 3339 text.

use chrono::NaiveDate;
use diesel::prelude::*;

use super::schema::{assets, daily_observations};

/// Database row for an asset (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = assets)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AssetRow {
    pub id: i32,
    pub external_id: String,
    pub name: String,
    pub price: String,
    pub market_cap: String,
    pub volume: String,
    pub circulating_supply: Option<String>,
    pub total_supply: Option<String>,
    pub max_supply: Option<String>,
    pub last_updated: String,
}

/// Database row for an asset (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = assets)]
pub struct NewAssetRow {
    pub external_id: String,
    pub name: String,
    pub price: String,
    pub market_cap: String,
    pub volume: String,
    pub circulating_supply: Option<String>,
    pub total_supply: Option<String>,
    pub max_supply: Option<String>,
    pub last_updated: String,
}

/// Snapshot fields written on update.
///
/// `None` supply fields are left out of the `SET` clause, so an absent value
/// keeps whatever the row already holds.
#[derive(AsChangeset, Debug, Clone)]
#[diesel(table_name = assets)]
pub struct AssetChangeset {
    pub name: String,
    pub price: String,
    pub market_cap: String,
    pub volume: String,
    pub circulating_supply: Option<String>,
    pub total_supply: Option<String>,
    pub max_supply: Option<String>,
    pub last_updated: String,
}

/// Database row for a daily observation (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = daily_observations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ObservationRow {
    pub id: i32,
    pub asset_id: i32,
    pub date: NaiveDate,
    pub price: String,
    pub market_cap: Option<String>,
    pub volume: Option<String>,
}

/// Database row for a daily observation (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = daily_observations)]
pub struct NewObservationRow {
    pub asset_id: i32,
    pub date: NaiveDate,
    pub price: String,
    pub market_cap: Option<String>,
    pub volume: Option<String>,
}
