//! SQLite market store implementation.
//!
//! Provides persistent storage for assets and their daily observations
//! using SQLite and Diesel ORM.

use std::collections::HashSet;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use diesel::sqlite::Sqlite;
use diesel::SqliteConnection;
use rust_decimal::Decimal;

use crate::adapter::outbound::sqlite::database::connection::DbPool;
use crate::adapter::outbound::sqlite::database::model::{
    AssetChangeset, AssetRow, NewAssetRow, NewObservationRow, ObservationRow,
};
use crate::adapter::outbound::sqlite::database::schema::{assets, daily_observations};
use crate::domain::{
    Asset, AssetId, AssetSnapshot, DailyObservation, DateRange, ExternalId, Supply,
};
use crate::error::{Error, Result};
use crate::port::outbound::store::{
    AssetBatch, AssetChange, AssetUpdate, MarketStore, ObservationBatch,
};

/// SQLite-backed market store.
///
/// Each batch is applied inside an immediate transaction, so concurrent
/// writers from other processes serialize on the database lock instead of
/// failing mid-batch.
#[derive(Clone)]
pub struct SqliteMarketStore {
    pool: DbPool,
}

type Conn = diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<SqliteConnection>>;

impl SqliteMarketStore {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<Conn> {
        self.pool
            .get()
            .map_err(|e| Error::Connection(e.to_string()))
    }

    fn new_row(snapshot: &AssetSnapshot, observed_at: DateTime<Utc>) -> NewAssetRow {
        NewAssetRow {
            external_id: snapshot.external_id.to_string(),
            name: snapshot.name.clone(),
            price: snapshot.price.to_string(),
            market_cap: snapshot.market_cap.to_string(),
            volume: snapshot.volume.to_string(),
            circulating_supply: snapshot.supply.circulating.map(|d| d.to_string()),
            total_supply: snapshot.supply.total.map(|d| d.to_string()),
            max_supply: snapshot.supply.max.map(|d| d.to_string()),
            last_updated: observed_at.to_rfc3339(),
        }
    }

    fn changeset(
        name: &str,
        price: Decimal,
        market_cap: Decimal,
        volume: Decimal,
        supply: &Supply,
        observed_at: DateTime<Utc>,
    ) -> AssetChangeset {
        AssetChangeset {
            name: name.to_string(),
            price: price.to_string(),
            market_cap: market_cap.to_string(),
            volume: volume.to_string(),
            circulating_supply: supply.circulating.map(|d| d.to_string()),
            total_supply: supply.total.map(|d| d.to_string()),
            max_supply: supply.max.map(|d| d.to_string()),
            last_updated: observed_at.to_rfc3339(),
        }
    }

    fn upsert(
        conn: &mut SqliteConnection,
        snapshot: &AssetSnapshot,
        observed_at: DateTime<Utc>,
    ) -> QueryResult<usize> {
        let changes = Self::changeset(
            &snapshot.name,
            snapshot.price,
            snapshot.market_cap,
            snapshot.volume,
            &snapshot.supply,
            observed_at,
        );
        diesel::insert_into(assets::table)
            .values(Self::new_row(snapshot, observed_at))
            .on_conflict(assets::external_id)
            .do_update()
            .set(changes)
            .execute(conn)
    }

    fn update(
        conn: &mut SqliteConnection,
        update: &AssetUpdate,
        observed_at: DateTime<Utc>,
    ) -> QueryResult<usize> {
        let changes = Self::changeset(
            &update.name,
            update.price,
            update.market_cap,
            update.volume,
            &update.supply,
            observed_at,
        );
        diesel::update(assets::table.filter(assets::external_id.eq(update.external_id.as_str())))
            .set(changes)
            .execute(conn)
    }

    fn decimal(field: &str, text: &str) -> Result<Decimal> {
        Decimal::from_str(text).map_err(|e| Error::Parse(format!("{field} '{text}': {e}")))
    }

    fn optional_decimal(field: &str, text: Option<&str>) -> Result<Option<Decimal>> {
        text.map(|t| Self::decimal(field, t)).transpose()
    }

    fn asset_from_row(row: AssetRow) -> Result<Asset> {
        let last_updated = DateTime::parse_from_rfc3339(&row.last_updated)
            .map_err(|e| Error::Parse(e.to_string()))?
            .with_timezone(&Utc);

        Ok(Asset {
            id: AssetId::new(row.id),
            price: Self::decimal("price", &row.price)?,
            market_cap: Self::decimal("market_cap", &row.market_cap)?,
            volume: Self::decimal("volume", &row.volume)?,
            supply: Supply {
                circulating: Self::optional_decimal(
                    "circulating_supply",
                    row.circulating_supply.as_deref(),
                )?,
                total: Self::optional_decimal("total_supply", row.total_supply.as_deref())?,
                max: Self::optional_decimal("max_supply", row.max_supply.as_deref())?,
            },
            external_id: ExternalId::new(row.external_id),
            name: row.name,
            last_updated,
        })
    }

    fn observation_from_row(row: ObservationRow) -> Result<DailyObservation> {
        Ok(DailyObservation {
            asset_id: AssetId::new(row.asset_id),
            date: row.date,
            price: Self::decimal("price", &row.price)?,
            market_cap: Self::optional_decimal("market_cap", row.market_cap.as_deref())?,
            volume: Self::optional_decimal("volume", row.volume.as_deref())?,
        })
    }

    fn observation_row(obs: &DailyObservation) -> NewObservationRow {
        NewObservationRow {
            asset_id: obs.asset_id.value(),
            date: obs.date,
            price: obs.price.to_string(),
            market_cap: obs.market_cap.map(|d| d.to_string()),
            volume: obs.volume.map(|d| d.to_string()),
        }
    }

    fn observations_query(
        asset: AssetId,
        range: DateRange,
    ) -> daily_observations::BoxedQuery<'static, Sqlite> {
        let mut query = daily_observations::table
            .filter(daily_observations::asset_id.eq(asset.value()))
            .into_boxed();
        if let Some(from) = range.from {
            query = query.filter(daily_observations::date.ge(from));
        }
        if let Some(to) = range.to {
            query = query.filter(daily_observations::date.le(to));
        }
        query
    }
}

impl MarketStore for SqliteMarketStore {
    async fn find_assets(&self, ids: &[ExternalId]) -> Result<Vec<Asset>> {
        let mut conn = self.conn()?;
        let keys: Vec<&str> = ids.iter().map(ExternalId::as_str).collect();

        let rows: Vec<AssetRow> = assets::table
            .filter(assets::external_id.eq_any(keys))
            .select(AssetRow::as_select())
            .load(&mut conn)?;

        rows.into_iter().map(Self::asset_from_row).collect()
    }

    async fn commit_assets(&self, batch: &AssetBatch) -> Result<Vec<Asset>> {
        let mut conn = self.conn()?;
        let observed_at = batch.observed_at;

        let rows = conn.immediate_transaction::<_, diesel::result::Error, _>(|conn| {
            let mut rows = Vec::with_capacity(batch.changes.len());
            for change in &batch.changes {
                match change {
                    AssetChange::Insert(snapshot) => {
                        Self::upsert(conn, snapshot, observed_at)?;
                    }
                    AssetChange::Update(update) => {
                        Self::update(conn, update, observed_at)?;
                    }
                    AssetChange::Unchanged(_) => {}
                }
                let row: AssetRow = assets::table
                    .filter(assets::external_id.eq(change.external_id().as_str()))
                    .select(AssetRow::as_select())
                    .first(conn)?;
                rows.push(row);
            }
            Ok(rows)
        })?;

        rows.into_iter().map(Self::asset_from_row).collect()
    }

    async fn observed_dates(&self, asset: AssetId, range: DateRange) -> Result<HashSet<NaiveDate>> {
        let mut conn = self.conn()?;
        let dates: Vec<NaiveDate> = Self::observations_query(asset, range)
            .select(daily_observations::date)
            .load(&mut conn)?;
        Ok(dates.into_iter().collect())
    }

    async fn insert_observations(&self, batch: &ObservationBatch) -> Result<usize> {
        let mut conn = self.conn()?;
        let inserted = conn.immediate_transaction::<_, diesel::result::Error, _>(|conn| {
            let mut inserted = 0;
            for obs in &batch.rows {
                inserted += diesel::insert_or_ignore_into(daily_observations::table)
                    .values(Self::observation_row(obs))
                    .execute(conn)?;
            }
            Ok(inserted)
        })?;
        Ok(inserted)
    }

    async fn asset(&self, external_id: &ExternalId) -> Result<Option<Asset>> {
        let mut conn = self.conn()?;
        let row: Option<AssetRow> = assets::table
            .filter(assets::external_id.eq(external_id.as_str()))
            .select(AssetRow::as_select())
            .first(&mut conn)
            .optional()?;
        row.map(Self::asset_from_row).transpose()
    }

    async fn assets_by_market_cap(&self, limit: usize) -> Result<Vec<Asset>> {
        let mut conn = self.conn()?;
        let rows: Vec<AssetRow> = assets::table
            .select(AssetRow::as_select())
            .load(&mut conn)?;

        // Text columns do not sort numerically; order after parsing.
        let mut assets = rows
            .into_iter()
            .map(Self::asset_from_row)
            .collect::<Result<Vec<_>>>()?;
        assets.sort_by(|a, b| {
            b.market_cap
                .cmp(&a.market_cap)
                .then_with(|| a.external_id.cmp(&b.external_id))
        });
        assets.truncate(limit);
        Ok(assets)
    }

    async fn observations(&self, asset: AssetId, range: DateRange) -> Result<Vec<DailyObservation>> {
        let mut conn = self.conn()?;
        let rows: Vec<ObservationRow> = Self::observations_query(asset, range)
            .order(daily_observations::date.asc())
            .select(ObservationRow::as_select())
            .load(&mut conn)?;
        rows.into_iter().map(Self::observation_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::sqlite::database::connection::{create_pool, run_migrations};
    use rust_decimal_macros::dec;

    fn store() -> SqliteMarketStore {
        let pool = create_pool(":memory:").unwrap();
        run_migrations(&pool).unwrap();
        SqliteMarketStore::new(pool)
    }

    fn snapshot(id: &str, price: Decimal, market_cap: Decimal) -> AssetSnapshot {
        AssetSnapshot {
            external_id: ExternalId::new(id),
            name: id.to_uppercase(),
            price,
            market_cap,
            volume: dec!(10.00),
            supply: Supply {
                circulating: Some(dec!(100)),
                total: None,
                max: Some(dec!(1000)),
            },
        }
    }

    fn batch(changes: Vec<AssetChange>) -> AssetBatch {
        AssetBatch {
            observed_at: Utc::now(),
            changes,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn observation(asset_id: AssetId, d: u32, price: Decimal) -> DailyObservation {
        DailyObservation {
            asset_id,
            date: day(d),
            price,
            market_cap: Some(dec!(5.00)),
            volume: None,
        }
    }

    #[tokio::test]
    async fn insert_round_trips_fixed_point_values() {
        let store = store();
        let committed = store
            .commit_assets(&batch(vec![AssetChange::Insert(snapshot(
                "bitcoin",
                dec!(64123.45678912),
                dec!(1262000000000.46),
            ))]))
            .await
            .unwrap();

        assert_eq!(committed.len(), 1);
        let stored = store.asset(&ExternalId::new("bitcoin")).await.unwrap().unwrap();
        assert_eq!(stored, committed[0]);
        assert_eq!(stored.price, dec!(64123.45678912));
        assert_eq!(stored.supply.total, None);
        assert_eq!(stored.supply.max, Some(dec!(1000)));
    }

    #[tokio::test]
    async fn repeated_insert_upserts_on_external_id() {
        let store = store();
        let first = snapshot("eth", dec!(1), dec!(10.00));
        store
            .commit_assets(&batch(vec![AssetChange::Insert(first.clone())]))
            .await
            .unwrap();

        let mut second = snapshot("eth", dec!(2), dec!(20.00));
        second.supply.circulating = None;
        let committed = store
            .commit_assets(&batch(vec![AssetChange::Insert(second)]))
            .await
            .unwrap();

        assert_eq!(store.assets_by_market_cap(10).await.unwrap().len(), 1);
        assert_eq!(committed[0].price, dec!(2));
        assert_eq!(committed[0].supply.circulating, Some(dec!(100)));
    }

    #[tokio::test]
    async fn update_rewrites_snapshot_fields_in_place() {
        let store = store();
        let inserted = store
            .commit_assets(&batch(vec![AssetChange::Insert(snapshot("sol", dec!(1), dec!(1.00)))]))
            .await
            .unwrap();

        let update = AssetUpdate {
            external_id: ExternalId::new("sol"),
            name: "Solana".into(),
            price: dec!(3.5),
            market_cap: dec!(7.00),
            volume: dec!(1.00),
            supply: Supply {
                circulating: Some(dec!(100)),
                total: Some(dec!(500)),
                max: Some(dec!(1000)),
            },
        };
        let updated = store
            .commit_assets(&batch(vec![AssetChange::Update(update)]))
            .await
            .unwrap();

        assert_eq!(updated[0].id, inserted[0].id);
        assert_eq!(updated[0].name, "Solana");
        assert_eq!(updated[0].supply.total, Some(dec!(500)));
    }

    #[tokio::test]
    async fn commit_returns_rows_in_batch_order() {
        let store = store();
        store
            .commit_assets(&batch(vec![AssetChange::Insert(snapshot("b", dec!(1), dec!(1.00)))]))
            .await
            .unwrap();

        let committed = store
            .commit_assets(&batch(vec![
                AssetChange::Insert(snapshot("a", dec!(1), dec!(1.00))),
                AssetChange::Unchanged(ExternalId::new("b")),
                AssetChange::Insert(snapshot("c", dec!(1), dec!(1.00))),
            ]))
            .await
            .unwrap();

        let ids: Vec<&str> = committed.iter().map(|a| a.external_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn failed_batch_leaves_no_partial_writes() {
        let store = store();
        let result = store
            .commit_assets(&batch(vec![
                AssetChange::Insert(snapshot("a", dec!(1), dec!(1.00))),
                AssetChange::Unchanged(ExternalId::new("missing")),
            ]))
            .await;

        assert!(result.is_err());
        assert!(store.asset(&ExternalId::new("a")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_observations_are_ignored() {
        let store = store();
        let asset = store
            .commit_assets(&batch(vec![AssetChange::Insert(snapshot("x", dec!(1), dec!(1.00)))]))
            .await
            .unwrap()[0]
            .id;

        let first = ObservationBatch {
            asset_id: asset,
            rows: vec![observation(asset, 1, dec!(1)), observation(asset, 2, dec!(2))],
        };
        assert_eq!(store.insert_observations(&first).await.unwrap(), 2);

        let second = ObservationBatch {
            asset_id: asset,
            rows: vec![observation(asset, 2, dec!(99)), observation(asset, 3, dec!(3))],
        };
        assert_eq!(store.insert_observations(&second).await.unwrap(), 1);

        let stored = store.observations(asset, DateRange::all()).await.unwrap();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[1].price, dec!(2));
    }

    #[tokio::test]
    async fn range_queries_are_inclusive_and_ordered() {
        let store = store();
        let asset = store
            .commit_assets(&batch(vec![AssetChange::Insert(snapshot("x", dec!(1), dec!(1.00)))]))
            .await
            .unwrap()[0]
            .id;
        let rows = [5, 1, 3, 2, 4]
            .into_iter()
            .map(|d| observation(asset, d, Decimal::from(d)))
            .collect();
        store
            .insert_observations(&ObservationBatch { asset_id: asset, rows })
            .await
            .unwrap();

        let range = DateRange::between(day(2), day(4));
        let dates = store.observed_dates(asset, range).await.unwrap();
        assert_eq!(dates, HashSet::from([day(2), day(3), day(4)]));

        let listed = store.observations(asset, range).await.unwrap();
        let listed: Vec<NaiveDate> = listed.iter().map(|o| o.date).collect();
        assert_eq!(listed, vec![day(2), day(3), day(4)]);
    }

    #[tokio::test]
    async fn assets_sort_by_numeric_market_cap() {
        let store = store();
        store
            .commit_assets(&batch(vec![
                AssetChange::Insert(snapshot("small", dec!(1), dec!(9.00))),
                AssetChange::Insert(snapshot("large", dec!(1), dec!(100.00))),
                AssetChange::Insert(snapshot("mid", dec!(1), dec!(20.00))),
            ]))
            .await
            .unwrap();

        let top = store.assets_by_market_cap(2).await.unwrap();
        let ids: Vec<&str> = top.iter().map(|a| a.external_id.as_str()).collect();
        assert_eq!(ids, vec!["large", "mid"]);
    }

    #[tokio::test]
    async fn find_assets_ignores_unknown_ids() {
        let store = store();
        store
            .commit_assets(&batch(vec![AssetChange::Insert(snapshot("a", dec!(1), dec!(1.00)))]))
            .await
            .unwrap();

        let found = store
            .find_assets(&[ExternalId::new("a"), ExternalId::new("zzz")])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }
}
