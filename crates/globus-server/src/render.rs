//! [`SvgRenderer`] — writes the refresh summary as an SVG file on disk.

use std::{
  io::{self, Cursor},
  path::{Path, PathBuf},
};

use globus_core::render::{Artifact, ArtifactRenderer, Summary};
use quick_xml::{
  Writer,
  events::{BytesEnd, BytesStart, BytesText, Event},
};
use thiserror::Error;
use tracing::info;

pub const CONTENT_TYPE: &str = "image/svg+xml";

const WIDTH: u32 = 800;
const BAR_MAX: f64 = 420.0;
const ROW_HEIGHT: u32 = 44;
const LIST_TOP: u32 = 170;

#[derive(Debug, Error)]
pub enum RenderError {
  #[error("failed to build summary SVG: {0}")]
  Svg(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("failed to write summary image {}: {source}", path.display())]
  Write {
    path:   PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to read summary image {}: {source}", path.display())]
  Read {
    path:   PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Renders to a single file; each render replaces the previous one
/// atomically.
#[derive(Debug, Clone)]
pub struct SvgRenderer {
  path: PathBuf,
}

impl SvgRenderer {
  pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

  pub fn path(&self) -> &Path { &self.path }

  fn write_err(&self, source: io::Error) -> RenderError {
    RenderError::Write { path: self.path.clone(), source }
  }
}

impl ArtifactRenderer for SvgRenderer {
  type Error = RenderError;

  async fn render(&self, summary: &Summary) -> Result<(), RenderError> {
    let svg = to_svg(summary)?;

    if let Some(dir) = self.path.parent()
      && !dir.as_os_str().is_empty()
    {
      tokio::fs::create_dir_all(dir).await.map_err(|e| self.write_err(e))?;
    }

    let mut tmp = self.path.clone().into_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, svg).await.map_err(|e| self.write_err(e))?;
    tokio::fs::rename(&tmp, &self.path).await.map_err(|e| self.write_err(e))?;

    info!(path = %self.path.display(), "summary image written");
    Ok(())
  }

  async fn load(&self) -> Result<Option<Artifact>, RenderError> {
    match tokio::fs::read(&self.path).await {
      Ok(bytes) => Ok(Some(Artifact { content_type: CONTENT_TYPE.to_owned(), bytes })),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
      Err(source) => Err(RenderError::Read { path: self.path.clone(), source }),
    }
  }
}

// ─── SVG ─────────────────────────────────────────────────────────────────────

/// Thin element-level wrapper over [`quick_xml::Writer`]. Attribute values
/// and text are escaped by `quick-xml`.
struct SvgWriter {
  writer: Writer<Cursor<Vec<u8>>>,
}

impl SvgWriter {
  fn new() -> Self { Self { writer: Writer::new(Cursor::new(Vec::new())) } }

  fn write(&mut self, event: Event<'_>) -> Result<(), RenderError> {
    self
      .writer
      .write_event(event)
      .map_err(|e| RenderError::Svg(Box::new(e)))
  }

  fn element(name: &str, attrs: &[(&str, &str)]) -> BytesStart<'static> {
    let mut elem = BytesStart::new(name.to_owned());
    for attr in attrs {
      elem.push_attribute(*attr);
    }
    elem
  }

  fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), RenderError> {
    self.write(Event::Start(Self::element(name, attrs)))
  }

  fn end(&mut self, name: &str) -> Result<(), RenderError> {
    self.write(Event::End(BytesEnd::new(name)))
  }

  /// A self-closing element such as `<rect .../>`.
  fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), RenderError> {
    self.write(Event::Empty(Self::element(name, attrs)))
  }

  /// `<text ...>content</text>`
  fn text(&mut self, attrs: &[(&str, &str)], content: &str) -> Result<(), RenderError> {
    self.start("text", attrs)?;
    self.write(Event::Text(BytesText::new(content)))?;
    self.end("text")
  }

  fn finish(self) -> Vec<u8> { self.writer.into_inner().into_inner() }
}

/// Lay the summary out as a standalone SVG document.
pub fn to_svg(summary: &Summary) -> Result<Vec<u8>, RenderError> {
  let rows = summary.top_by_gdp.len().max(1) as u32;
  let height = (LIST_TOP + rows * ROW_HEIGHT + 40).to_string();
  let width = WIDTH.to_string();
  let view_box = format!("0 0 {width} {height}");
  let max_gdp = summary
    .top_by_gdp
    .iter()
    .map(|c| c.estimated_gdp)
    .fold(0.0_f64, f64::max);

  let mut w = SvgWriter::new();
  w.start("svg", &[
    ("xmlns", "http://www.w3.org/2000/svg"),
    ("width", width.as_str()),
    ("height", height.as_str()),
    ("viewBox", view_box.as_str()),
    ("font-family", "Arial, sans-serif"),
  ])?;
  w.empty("rect", &[("width", "100%"), ("height", "100%"), ("fill", "#f8fafc")])?;

  w.text(
    &[("x", "40"), ("y", "56"), ("font-size", "28"), ("font-weight", "bold"), ("fill", "#0f172a")],
    "Country Summary",
  )?;
  w.text(
    &[("x", "40"), ("y", "96"), ("font-size", "18"), ("fill", "#334155")],
    &format!("Total countries: {}", summary.total_countries),
  )?;
  w.text(
    &[("x", "40"), ("y", "124"), ("font-size", "14"), ("fill", "#64748b")],
    &format!(
      "Last refreshed: {}",
      summary.last_refreshed_at.format("%Y-%m-%d %H:%M:%S UTC")
    ),
  )?;
  w.text(
    &[("x", "40"), ("y", "156"), ("font-size", "16"), ("font-weight", "bold"), ("fill", "#0f172a")],
    &format!("Top {} countries by estimated GDP", summary.top_by_gdp.len()),
  )?;

  if summary.top_by_gdp.is_empty() {
    let y = (LIST_TOP + 24).to_string();
    w.text(
      &[("x", "40"), ("y", y.as_str()), ("font-size", "14"), ("fill", "#64748b")],
      "No GDP data available",
    )?;
  }

  for (i, country) in summary.top_by_gdp.iter().enumerate() {
    let top = LIST_TOP + i as u32 * ROW_HEIGHT;
    let bar = if max_gdp > 0.0 {
      (country.estimated_gdp / max_gdp * BAR_MAX).max(1.0)
    } else {
      1.0
    };
    let label_y = (top + 22).to_string();
    let bar_y = (top + 6).to_string();
    let bar_width = format!("{bar:.1}");
    let value_x = format!("{:.1}", 248.0 + bar);

    w.text(
      &[("x", "40"), ("y", label_y.as_str()), ("font-size", "14"), ("fill", "#0f172a")],
      &format!("{}. {}", i + 1, country.name),
    )?;
    w.empty("rect", &[
      ("x", "240"),
      ("y", bar_y.as_str()),
      ("width", bar_width.as_str()),
      ("height", "22"),
      ("rx", "3"),
      ("fill", "#3b82f6"),
    ])?;
    w.text(
      &[("x", value_x.as_str()), ("y", label_y.as_str()), ("font-size", "13"), ("fill", "#334155")],
      &billions(country.estimated_gdp),
    )?;
  }

  w.end("svg")?;
  Ok(w.finish())
}

/// `1234567890.0` → `"$1.23B"`.
fn billions(gdp: f64) -> String { format!("${:.2}B", gdp / 1e9) }
