//! [`SqliteStore`] — the SQLite implementation of [`CountryStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;

use globus_core::{
  country::{Country, CountrySummary, CountryUpsert, RefreshStatus},
  query::{CountryFilter, SortKey},
  store::CountryStore,
};

use crate::{
  Error, Result,
  encode::{
    COUNTRY_COLUMNS, CountryRow, StatusRow, encode_count, encode_dt, summary_from_row,
  },
  schema::SCHEMA,
};

const SYNC_TOTAL: &str = "UPDATE refresh_metadata
   SET total_countries = (SELECT COUNT(*) FROM countries)
   WHERE id = 1";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A globus record store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

/// Positional parameters shared by the insert and upsert statements.
struct WriteParams {
  name:          String,
  capital:       Option<String>,
  region:        Option<String>,
  population:    i64,
  currency_code: Option<String>,
  exchange_rate: Option<f64>,
  estimated_gdp: Option<f64>,
  flag_url:      Option<String>,
  refreshed_at:  String,
  now:           String,
}

impl WriteParams {
  fn new(input: CountryUpsert, refreshed_at: DateTime<Utc>) -> Result<Self> {
    Ok(Self {
      population:    encode_count("population", input.population)?,
      name:          input.name,
      capital:       input.capital,
      region:        input.region,
      currency_code: input.currency_code,
      exchange_rate: input.exchange_rate,
      estimated_gdp: input.estimated_gdp,
      flag_url:      input.flag_url,
      refreshed_at:  encode_dt(refreshed_at),
      now:           encode_dt(Utc::now()),
    })
  }
}

fn select_by_name(
  conn: &rusqlite::Connection,
  name: &str,
) -> rusqlite::Result<Option<CountryRow>> {
  conn
    .query_row(
      &format!("SELECT {COUNTRY_COLUMNS} FROM countries WHERE name = ?1"),
      rusqlite::params![name],
      CountryRow::from_row,
    )
    .optional()
}

fn order_by(sort: SortKey) -> &'static str {
  match sort {
    SortKey::GdpDesc => "estimated_gdp IS NULL, estimated_gdp DESC, name ASC",
    SortKey::GdpAsc => "estimated_gdp IS NULL, estimated_gdp ASC, name ASC",
    SortKey::PopulationDesc => "population DESC, name ASC",
    SortKey::PopulationAsc => "population ASC, name ASC",
    SortKey::NameAsc => "name ASC",
    SortKey::NameDesc => "name DESC",
  }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _)
      if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

// ─── CountryStore impl ───────────────────────────────────────────────────────

impl CountryStore for SqliteStore {
  type Error = Error;

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn upsert(
    &self,
    input:        CountryUpsert,
    refreshed_at: DateTime<Utc>,
  ) -> Result<Country> {
    let p = WriteParams::new(input, refreshed_at)?;
    let name = p.name.clone();

    let row: Option<CountryRow> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO countries (
             name, capital, region, population, currency_code,
             exchange_rate, estimated_gdp, flag_url,
             last_refreshed_at, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
           ON CONFLICT(name) DO UPDATE SET
             capital           = excluded.capital,
             region            = excluded.region,
             population        = excluded.population,
             currency_code     = excluded.currency_code,
             exchange_rate     = excluded.exchange_rate,
             estimated_gdp     = excluded.estimated_gdp,
             flag_url          = excluded.flag_url,
             last_refreshed_at = excluded.last_refreshed_at,
             updated_at        = excluded.updated_at",
          rusqlite::params![
            p.name,
            p.capital,
            p.region,
            p.population,
            p.currency_code,
            p.exchange_rate,
            p.estimated_gdp,
            p.flag_url,
            p.refreshed_at,
            p.now,
          ],
        )?;
        let row = select_by_name(&tx, &p.name)?;
        tx.commit()?;
        Ok(row)
      })
      .await?;

    row.ok_or(Error::RowMissing(name))?.into_country()
  }

  async fn insert(&self, input: CountryUpsert) -> Result<Country> {
    let p = WriteParams::new(input, Utc::now())?;
    let name = p.name.clone();

    // `None` signals a uniqueness violation; the transaction rolls back on drop.
    let row: Option<CountryRow> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let inserted = tx.execute(
          "INSERT INTO countries (
             name, capital, region, population, currency_code,
             exchange_rate, estimated_gdp, flag_url,
             last_refreshed_at, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9, ?9)",
          rusqlite::params![
            p.name,
            p.capital,
            p.region,
            p.population,
            p.currency_code,
            p.exchange_rate,
            p.estimated_gdp,
            p.flag_url,
            p.now,
          ],
        );
        match inserted {
          Err(e) if is_unique_violation(&e) => return Ok(None),
          other => other?,
        };
        tx.execute(SYNC_TOTAL, [])?;
        let row = select_by_name(&tx, &p.name)?;
        tx.commit()?;
        Ok(row)
      })
      .await?;

    row.ok_or(Error::Duplicate(name))?.into_country()
  }

  async fn delete_by_name(&self, name: &str) -> Result<bool> {
    let name = name.to_owned();

    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let n = tx.execute(
          "DELETE FROM countries WHERE name = ?1",
          rusqlite::params![name],
        )?;
        if n > 0 {
          tx.execute(SYNC_TOTAL, [])?;
        }
        tx.commit()?;
        Ok(n > 0)
      })
      .await?;

    Ok(deleted)
  }

  async fn finish_refresh(
    &self,
    refreshed_at:    DateTime<Utc>,
    total_countries: u64,
  ) -> Result<()> {
    let at_str = encode_dt(refreshed_at);
    let total  = encode_count("total_countries", total_countries)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE refresh_metadata
             SET last_refreshed_at = ?1, total_countries = ?2
             WHERE id = 1",
          rusqlite::params![at_str, total],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn list(&self, filter: CountryFilter, sort: SortKey) -> Result<Vec<Country>> {
    let sql = format!(
      "SELECT {COUNTRY_COLUMNS} FROM countries
       WHERE (?1 IS NULL OR region = ?1 COLLATE NOCASE)
         AND (?2 IS NULL OR currency_code = ?2)
       ORDER BY {}",
      order_by(sort)
    );

    let rows: Vec<CountryRow> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![filter.region, filter.currency],
            CountryRow::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows.into_iter().map(CountryRow::into_country).collect()
  }

  async fn get_by_name(&self, name: &str) -> Result<Option<Country>> {
    let name = name.to_owned();

    let row = self
      .conn
      .call(move |conn| Ok(select_by_name(conn, &name)?))
      .await?;

    row.map(CountryRow::into_country).transpose()
  }

  async fn status(&self) -> Result<RefreshStatus> {
    let row: StatusRow = self
      .conn
      .call(|conn| {
        Ok(conn.query_row(
          "SELECT last_refreshed_at, total_countries FROM refresh_metadata WHERE id = 1",
          [],
          |row| {
            Ok(StatusRow {
              last_refreshed_at: row.get(0)?,
              total_countries:   row.get(1)?,
            })
          },
        )?)
      })
      .await?;

    row.into_status()
  }

  async fn top_by_gdp(&self, limit: usize) -> Result<Vec<CountrySummary>> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);

    let top = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT name, estimated_gdp FROM countries
           WHERE estimated_gdp IS NOT NULL
           ORDER BY estimated_gdp DESC, name ASC
           LIMIT ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![limit], summary_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(top)
  }
}
