//! SQL schema for the globus SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS` / `OR IGNORE`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per country. Names are unique under ASCII case folding.
CREATE TABLE IF NOT EXISTS countries (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    name              TEXT    NOT NULL COLLATE NOCASE UNIQUE,
    capital           TEXT,
    region            TEXT,
    population        INTEGER NOT NULL CHECK (population >= 0),
    currency_code     TEXT,
    exchange_rate     REAL,
    estimated_gdp     REAL,
    flag_url          TEXT,
    last_refreshed_at TEXT    NOT NULL,   -- RFC 3339 UTC
    created_at        TEXT    NOT NULL,
    updated_at        TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS countries_region_idx   ON countries(region COLLATE NOCASE);
CREATE INDEX IF NOT EXISTS countries_currency_idx ON countries(currency_code);
CREATE INDEX IF NOT EXISTS countries_gdp_idx      ON countries(estimated_gdp);

-- Singleton: exactly one row, id = 1.
CREATE TABLE IF NOT EXISTS refresh_metadata (
    id                INTEGER PRIMARY KEY CHECK (id = 1),
    last_refreshed_at TEXT,               -- NULL until the first refresh
    total_countries   INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO refresh_metadata (id, last_refreshed_at, total_countries)
VALUES (1, NULL, 0);

PRAGMA user_version = 1;
";
