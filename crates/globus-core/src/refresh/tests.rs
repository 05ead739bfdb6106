//! Pipeline tests against in-memory fakes.

use std::{
  collections::BTreeMap,
  sync::{
    Arc, Mutex,
    atomic::{AtomicI64, Ordering},
  },
};

use chrono::{DateTime, Utc};

use super::*;
use crate::{
  country::{Country, CountrySummary, RefreshStatus},
  query::{CountryFilter, SortKey},
  render::Artifact,
  source::RawCurrency,
  store::StoreError,
};

// ─── Fakes ───────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
struct FakeError {
  message:   String,
  duplicate: bool,
}

impl FakeError {
  fn new(message: &str) -> Self { Self { message: message.to_owned(), duplicate: false } }
}

impl StoreError for FakeError {
  fn is_duplicate(&self) -> bool { self.duplicate }
}

struct MemoryStore {
  rows:    Mutex<BTreeMap<String, Country>>,
  status:  Mutex<RefreshStatus>,
  fail_on: Vec<String>,
  next_id: AtomicI64,
}

impl MemoryStore {
  fn new(fail_on: &[&str]) -> Self {
    Self {
      rows:    Mutex::new(BTreeMap::new()),
      status:  Mutex::new(RefreshStatus { total_countries: 0, last_refreshed_at: None }),
      fail_on: fail_on.iter().map(|s| s.to_lowercase()).collect(),
      next_id: AtomicI64::new(1),
    }
  }

  fn row_count(&self) -> usize { self.rows.lock().unwrap().len() }

  fn row(&self, name: &str) -> Option<Country> {
    self.rows.lock().unwrap().get(&name.to_lowercase()).cloned()
  }

  fn write(&self, input: CountryUpsert, at: DateTime<Utc>) -> Country {
    let key = input.name.to_lowercase();
    let mut rows = self.rows.lock().unwrap();
    let (id, name, created_at) = match rows.get(&key) {
      Some(existing) => (existing.id, existing.name.clone(), existing.created_at),
      None => (self.next_id.fetch_add(1, Ordering::SeqCst), input.name.clone(), at),
    };
    let country = Country {
      id,
      name,
      capital: input.capital,
      region: input.region,
      population: input.population,
      currency_code: input.currency_code,
      exchange_rate: input.exchange_rate,
      estimated_gdp: input.estimated_gdp,
      flag_url: input.flag_url,
      last_refreshed_at: at,
      created_at,
      updated_at: at,
    };
    rows.insert(key, country.clone());
    country
  }
}

impl CountryStore for MemoryStore {
  type Error = FakeError;

  async fn upsert(&self, input: CountryUpsert, at: DateTime<Utc>) -> Result<Country, FakeError> {
    if self.fail_on.contains(&input.name.to_lowercase()) {
      return Err(FakeError::new("constraint violation"));
    }
    Ok(self.write(input, at))
  }

  async fn insert(&self, input: CountryUpsert) -> Result<Country, FakeError> {
    if self.row(&input.name).is_some() {
      return Err(FakeError { message: input.name, duplicate: true });
    }
    Ok(self.write(input, Utc::now()))
  }

  async fn delete_by_name<'a>(&'a self, name: &'a str) -> Result<bool, FakeError> {
    Ok(self.rows.lock().unwrap().remove(&name.to_lowercase()).is_some())
  }

  async fn finish_refresh(&self, at: DateTime<Utc>, total: u64) -> Result<(), FakeError> {
    *self.status.lock().unwrap() =
      RefreshStatus { total_countries: total, last_refreshed_at: Some(at) };
    Ok(())
  }

  async fn list(&self, filter: CountryFilter, _sort: SortKey) -> Result<Vec<Country>, FakeError> {
    Ok(
      self
        .rows
        .lock()
        .unwrap()
        .values()
        .filter(|c| match (&filter.region, &c.region) {
          (Some(want), Some(have)) => want.eq_ignore_ascii_case(have),
          (Some(_), None) => false,
          (None, _) => true,
        })
        .cloned()
        .collect(),
    )
  }

  async fn get_by_name<'a>(&'a self, name: &'a str) -> Result<Option<Country>, FakeError> {
    Ok(self.row(name))
  }

  async fn status(&self) -> Result<RefreshStatus, FakeError> {
    Ok(self.status.lock().unwrap().clone())
  }

  async fn top_by_gdp(&self, limit: usize) -> Result<Vec<CountrySummary>, FakeError> {
    let mut top: Vec<CountrySummary> = self
      .rows
      .lock()
      .unwrap()
      .values()
      .filter_map(|c| {
        c.estimated_gdp
          .map(|gdp| CountrySummary { name: c.name.clone(), estimated_gdp: gdp })
      })
      .collect();
    top.sort_by(|a, b| b.estimated_gdp.total_cmp(&a.estimated_gdp));
    top.truncate(limit);
    Ok(top)
  }
}

struct StaticSource {
  countries: Option<Vec<RawCountry>>,
  rates:     Option<ExchangeRates>,
}

impl CountrySource for StaticSource {
  type Error = FakeError;

  async fn fetch_countries(&self) -> Result<Vec<RawCountry>, FakeError> {
    self.countries.clone().ok_or_else(|| FakeError::new("connection refused"))
  }

  async fn fetch_exchange_rates(&self) -> Result<ExchangeRates, FakeError> {
    self.rates.clone().ok_or_else(|| FakeError::new("timed out"))
  }
}

#[derive(Default)]
struct RecordingRenderer {
  fail:     bool,
  rendered: Mutex<Vec<Summary>>,
}

impl ArtifactRenderer for RecordingRenderer {
  type Error = FakeError;

  async fn render<'a>(&'a self, summary: &'a Summary) -> Result<(), FakeError> {
    if self.fail {
      return Err(FakeError::new("no fonts available"));
    }
    self.rendered.lock().unwrap().push(summary.clone());
    Ok(())
  }

  async fn load(&self) -> Result<Option<Artifact>, FakeError> { Ok(None) }
}

// ─── Fixtures ────────────────────────────────────────────────────────────────

fn country(name: Option<&str>, population: Option<u64>, currency: Option<&str>) -> RawCountry {
  RawCountry {
    name: name.map(str::to_owned),
    capital: Some("Capital".into()),
    region: Some("Africa".into()),
    population,
    flag: Some("https://flagcdn.com/ng.svg".into()),
    currencies: currency
      .map(|c| vec![RawCurrency { code: Some(c.to_owned()), name: None }])
      .unwrap_or_default(),
  }
}

fn directory() -> Vec<RawCountry> {
  vec![
    country(Some("Nigeria"), Some(206_139_589), Some("NGN")),
    country(Some("Ghana"), Some(31_072_940), Some("GHS")),
    country(Some("Antarctica"), Some(1_000), None),
    country(Some("Atlantis"), Some(5), Some("ATL")),
    country(None, Some(100), Some("NGN")),
    country(Some("Nowhere"), None, Some("NGN")),
  ]
}

fn rates() -> ExchangeRates {
  ExchangeRates::from([("NGN".to_owned(), 1600.0), ("GHS".to_owned(), 15.3)])
}

fn refresher(
  store: &Arc<MemoryStore>,
  source: StaticSource,
  renderer: &Arc<RecordingRenderer>,
) -> Refresher<MemoryStore, StaticSource, RecordingRenderer> {
  Refresher::new(
    store.clone(),
    Arc::new(source),
    renderer.clone(),
    Arc::new(GdpEstimator::seeded(11)),
  )
}

fn healthy_source() -> StaticSource {
  StaticSource { countries: Some(directory()), rates: Some(rates()) }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn total_countries_counts_only_successful_upserts() {
  let store = Arc::new(MemoryStore::new(&[]));
  let renderer = Arc::new(RecordingRenderer::default());

  let report = refresher(&store, healthy_source(), &renderer).run().await.unwrap();

  assert_eq!(report.total, 6);
  assert_eq!(report.skipped, 2);
  assert_eq!(report.processed, 4);
  assert_eq!(report.succeeded, 4);
  assert_eq!(report.failed, 0);
  assert!(report.image_warning.is_none());

  let status = store.status().await.unwrap();
  assert_eq!(status.total_countries, 4);
  assert_eq!(status.last_refreshed_at, Some(report.last_refreshed_at));
}

#[tokio::test]
async fn single_upsert_failure_does_not_abort_refresh() {
  let store = Arc::new(MemoryStore::new(&["ghana"]));
  let renderer = Arc::new(RecordingRenderer::default());

  let report = refresher(&store, healthy_source(), &renderer).run().await.unwrap();

  assert_eq!(report.succeeded, 3);
  assert_eq!(report.failed, 1);
  assert_eq!(store.row_count(), 3);
  assert!(store.row("Ghana").is_none());
  assert!(store.row("Nigeria").is_some());
  assert_eq!(store.status().await.unwrap().total_countries, 3);
}

#[tokio::test]
async fn countries_fetch_failure_writes_nothing() {
  let store = Arc::new(MemoryStore::new(&[]));
  let renderer = Arc::new(RecordingRenderer::default());
  let source = StaticSource { countries: None, rates: Some(rates()) };

  let err = refresher(&store, source, &renderer).run().await.unwrap_err();

  assert!(matches!(err, Error::ExternalUnavailable(ref m) if m.contains("Countries API")));
  assert_eq!(store.row_count(), 0);
  assert_eq!(store.status().await.unwrap().last_refreshed_at, None);
  assert!(renderer.rendered.lock().unwrap().is_empty());
}

#[tokio::test]
async fn rates_fetch_failure_writes_nothing() {
  let store = Arc::new(MemoryStore::new(&[]));
  let renderer = Arc::new(RecordingRenderer::default());
  let source = StaticSource { countries: Some(directory()), rates: None };

  let err = refresher(&store, source, &renderer).run().await.unwrap_err();

  assert!(matches!(err, Error::ExternalUnavailable(ref m) if m.contains("Exchange Rates API")));
  assert_eq!(store.row_count(), 0);
}

#[tokio::test]
async fn currency_edge_cases_derive_zero_gdp() {
  let store = Arc::new(MemoryStore::new(&[]));
  let renderer = Arc::new(RecordingRenderer::default());
  refresher(&store, healthy_source(), &renderer).run().await.unwrap();

  let antarctica = store.row("Antarctica").unwrap();
  assert_eq!(antarctica.currency_code, None);
  assert_eq!(antarctica.exchange_rate, None);
  assert_eq!(antarctica.estimated_gdp, Some(0.0));

  let atlantis = store.row("Atlantis").unwrap();
  assert_eq!(atlantis.currency_code.as_deref(), Some("ATL"));
  assert_eq!(atlantis.exchange_rate, None);
  assert_eq!(atlantis.estimated_gdp, Some(0.0));

  let nigeria = store.row("Nigeria").unwrap();
  assert_eq!(nigeria.exchange_rate, Some(1600.0));
  let gdp = nigeria.estimated_gdp.unwrap();
  let low = 206_139_589.0 * 1000.0 / 1600.0;
  let high = 206_139_589.0 * 2000.0 / 1600.0;
  assert!(gdp >= low && gdp < high, "gdp {gdp} outside [{low}, {high})");
}

#[tokio::test]
async fn repeated_refresh_keeps_row_count_stable() {
  let store = Arc::new(MemoryStore::new(&[]));
  let renderer = Arc::new(RecordingRenderer::default());
  let refresher = refresher(&store, healthy_source(), &renderer);

  refresher.run().await.unwrap();
  let first = store.row("Nigeria").unwrap();
  refresher.run().await.unwrap();
  let second = store.row("Nigeria").unwrap();

  assert_eq!(store.row_count(), 4);
  assert_eq!(first.id, second.id);
  assert_eq!(first.created_at, second.created_at);
  assert_ne!(first.estimated_gdp, second.estimated_gdp);
}

#[tokio::test]
async fn renderer_receives_top_countries_and_total() {
  let store = Arc::new(MemoryStore::new(&[]));
  let renderer = Arc::new(RecordingRenderer::default());
  let report = refresher(&store, healthy_source(), &renderer).run().await.unwrap();

  let rendered = renderer.rendered.lock().unwrap();
  assert_eq!(rendered.len(), 1);
  let summary = &rendered[0];
  assert_eq!(summary.total_countries, 4);
  assert_eq!(summary.last_refreshed_at, report.last_refreshed_at);
  assert!(summary.top_by_gdp.len() <= SUMMARY_TOP_N);
  assert!(
    summary
      .top_by_gdp
      .windows(2)
      .all(|w| w[0].estimated_gdp >= w[1].estimated_gdp)
  );
}

#[tokio::test]
async fn renderer_failure_is_only_a_warning() {
  let store = Arc::new(MemoryStore::new(&[]));
  let renderer = Arc::new(RecordingRenderer { fail: true, ..Default::default() });

  let report = refresher(&store, healthy_source(), &renderer).run().await.unwrap();

  assert_eq!(report.succeeded, 4);
  assert_eq!(report.image_warning.as_deref(), Some("no fonts available"));
  assert_eq!(store.status().await.unwrap().total_countries, 4);
}

#[test]
fn to_upsert_trims_names_and_rejects_blank_ones() {
  let estimator = GdpEstimator::seeded(1);
  let rates = rates();

  let upsert = to_upsert(country(Some("  Ghana "), Some(10), Some("GHS")), &rates, &estimator)
    .unwrap();
  assert_eq!(upsert.name, "Ghana");
  assert_eq!(upsert.currency_code.as_deref(), Some("GHS"));

  assert!(to_upsert(country(Some("   "), Some(10), None), &rates, &estimator).is_none());
}

/// Holds its first `fetch_countries` call until `gate` is notified, and notes
/// whether the store had already recorded a refresh when each call began.
struct GatedSource {
  store:    Arc<MemoryStore>,
  gate:     tokio::sync::Notify,
  calls:    std::sync::atomic::AtomicUsize,
  observed: Mutex<Vec<Option<DateTime<Utc>>>>,
}

impl CountrySource for GatedSource {
  type Error = FakeError;

  async fn fetch_countries(&self) -> Result<Vec<RawCountry>, FakeError> {
    let seen = self.store.status.lock().unwrap().last_refreshed_at;
    self.observed.lock().unwrap().push(seen);
    if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
      self.gate.notified().await;
    }
    Ok(directory())
  }

  async fn fetch_exchange_rates(&self) -> Result<ExchangeRates, FakeError> { Ok(rates()) }
}

#[tokio::test]
async fn concurrent_runs_are_serialised() {
  let store = Arc::new(MemoryStore::new(&[]));
  let source = Arc::new(GatedSource {
    store:    store.clone(),
    gate:     tokio::sync::Notify::new(),
    calls:    Default::default(),
    observed: Mutex::new(Vec::new()),
  });
  let refresher = Refresher::new(
    store.clone(),
    source.clone(),
    Arc::new(RecordingRenderer::default()),
    Arc::new(GdpEstimator::seeded(3)),
  );

  let release = async {
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    source.gate.notify_one();
  };
  let (first, second, ()) = tokio::join!(refresher.run(), refresher.run(), release);
  let first = first.unwrap();
  second.unwrap();

  let observed = source.observed.lock().unwrap().clone();
  assert_eq!(observed, vec![None, Some(first.last_refreshed_at)]);
  assert_eq!(store.row_count(), 4);
}
