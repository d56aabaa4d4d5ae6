//! Subcommand bodies. Each prints its result as JSON on stdout.

use std::{path::Path, process::ExitCode};

use anyhow::{Context as _, bail};
use qcap_core::{
  image::Image,
  quality::assess_quality,
  validate::{
    ImageCandidate, RecognitionEventCandidate, RecordCandidate, ValidationReport, validate_image,
    validate_record, validate_recognition_event,
  },
};
use qcap_store_sqlite::{Page, StorageHandle};
use serde::{Serialize, de::DeserializeOwned};
use tracing::info;

use crate::{Command, EntityKind, config::CliConfig};

pub async fn run(store: &StorageHandle, cfg: &CliConfig, command: Command) -> anyhow::Result<ExitCode> {
  match command {
    Command::Init => {
      let version = store.schema_version().await?;
      info!(path = ?cfg.store.path, version, "store ready");
    }

    Command::Stats { from, to } => {
      if from > to {
        bail!("--from {from} is after --to {to}");
      }
      let from = from.format("%Y-%m-%d").to_string();
      let to = to.format("%Y-%m-%d").to_string();
      let stats = store.records().get_stats_by_date_range(&from, &to).await?;
      print_json(&stats)?;
    }

    Command::Validate { kind, file, template } => {
      let report = validate(store, cfg, kind, &file, template.as_deref()).await?;
      print_json(&report)?;
      if !report.is_valid {
        return Ok(ExitCode::FAILURE);
      }
    }

    Command::Quality { blur, glare, limit } => {
      let page = limit.map_or(Page::ALL, Page::limit);
      let images = store
        .images()
        .find_with_quality_issues(blur, glare, page)
        .await?;
      let rows: Vec<_> = images.iter().map(QualityRow::from).collect();
      print_json(&rows)?;
    }

    Command::Confidence { image, threshold } => {
      let threshold = threshold.unwrap_or(cfg.low_confidence_threshold);
      let stats = store
        .recognition_events()
        .get_confidence_stats(image.as_deref(), threshold)
        .await?;
      print_json(&stats)?;
    }

    Command::Verify { id } => {
      let records = store.records();
      if records.find_by_id(id).await?.is_none() {
        bail!("no record with id {id}");
      }
      records.mark_verified(id).await?;
      info!(id, "record verified");
    }

    Command::Correct { id, value } => {
      let events = store.recognition_events();
      if events.find_by_id(id).await?.is_none() {
        bail!("no recognition event with id {id}");
      }
      events.mark_corrected(id, value).await?;
      info!(id, "recognition event corrected");
    }
  }
  Ok(ExitCode::SUCCESS)
}

async fn validate(
  store: &StorageHandle,
  cfg: &CliConfig,
  kind: EntityKind,
  file: &Path,
  template_id: Option<&str>,
) -> anyhow::Result<ValidationReport> {
  let report = match kind {
    EntityKind::Record => validate_record(&read_candidate::<RecordCandidate>(file)?),
    EntityKind::Image => validate_image(&read_candidate::<ImageCandidate>(file)?),
    EntityKind::Event => {
      let event = read_candidate::<RecognitionEventCandidate>(file)?;
      let template = match template_id {
        Some(id) => Some(
          store
            .templates()
            .find_by_id(id)
            .await?
            .with_context(|| format!("no template with id {id:?}"))?,
        ),
        None => None,
      };
      validate_recognition_event(&event, template.as_ref(), cfg.low_confidence_threshold)
    }
  };
  Ok(report)
}

fn read_candidate<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
  let raw = std::fs::read_to_string(path)
    .with_context(|| format!("reading {}", path.display()))?;
  serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

/// One line of `qcap quality` output.
#[derive(Serialize)]
struct QualityRow<'a> {
  img_id:     &'a str,
  blur:       Option<f64>,
  glare:      Option<f64>,
  score:      f64,
  assessment: &'static str,
}

impl<'a> From<&'a Image> for QualityRow<'a> {
  fn from(image: &'a Image) -> Self {
    let score = image.quality_score();
    Self {
      img_id: &image.img_id,
      blur: image.blur,
      glare: image.glare,
      score,
      assessment: assess_quality(score).as_str(),
    }
  }
}
