//! [`RecognitionEventRepo`]: per-field recognition results with surrogate
//! `id`.

use qcap_core::{
  Patch,
  quality::ConfidenceStats,
  recognition::{RecognitionEvent, RecognitionEventData, RecognitionEventPatch},
};
use rusqlite::types::Value;
use tracing::debug;

use crate::{
  Page, Result, Statement, StorageHandle,
  encode::{EVENT_COLUMNS, EVENT_INSERT_COLUMNS, event_from_row, event_params, placeholders},
  update::Assignments,
};

fn insert_sql() -> String {
  format!(
    "INSERT INTO recog_events ({EVENT_INSERT_COLUMNS}) VALUES ({})",
    placeholders(7)
  )
}

#[derive(Clone)]
pub struct RecognitionEventRepo {
  db: StorageHandle,
}

impl RecognitionEventRepo {
  pub(crate) fn new(db: StorageHandle) -> Self { Self { db } }

  /// Newest first; `where_clause` must be static SQL with `?` parameters.
  async fn select(
    &self,
    where_clause: &str,
    mut params: Vec<Value>,
    page: Page,
  ) -> Result<Vec<RecognitionEvent>> {
    let limit = page.clause(&mut params);
    let rows = self
      .db
      .query(
        format!(
          "SELECT {EVENT_COLUMNS} FROM recog_events {where_clause} \
           ORDER BY created_at DESC, id DESC {limit}"
        ),
        params,
      )
      .await?;
    rows.iter().map(event_from_row).collect()
  }

  /// Insert one event and return its generated id.
  pub async fn create(&self, event: &RecognitionEventData) -> Result<i64> {
    let outcome = self.db.execute(insert_sql(), event_params(event)).await?;
    debug!(id = outcome.last_insert_id, "recognition event created");
    Ok(outcome.last_insert_id)
  }

  /// Insert all events for an image in one transaction; returns their ids
  /// in input order.
  pub async fn create_many(&self, events: &[RecognitionEventData]) -> Result<Vec<i64>> {
    if events.is_empty() {
      self.db.ensure_ready().await?;
      return Ok(vec![]);
    }
    let sql = insert_sql();
    let statements = events
      .iter()
      .map(|e| Statement::new(sql.clone(), event_params(e)))
      .collect();
    let outcomes = self.db.transaction(statements).await?;
    debug!(count = outcomes.len(), "recognition events created");
    Ok(outcomes.into_iter().map(|o| o.last_insert_id).collect())
  }

  pub async fn find_by_id(&self, id: i64) -> Result<Option<RecognitionEvent>> {
    let mut events = self.select("WHERE id = ?", vec![id.into()], Page::ALL).await?;
    Ok(events.pop())
  }

  pub async fn find_all(&self, page: Page) -> Result<Vec<RecognitionEvent>> {
    self.select("", vec![], page).await
  }

  pub async fn find_by_image(&self, img_id: &str, page: Page) -> Result<Vec<RecognitionEvent>> {
    self
      .select("WHERE img_id = ?", vec![img_id.to_owned().into()], page)
      .await
  }

  pub async fn find_by_field(
    &self,
    field_id: &str,
    page: Page,
  ) -> Result<Vec<RecognitionEvent>> {
    self
      .select("WHERE field_id = ?", vec![field_id.to_owned().into()], page)
      .await
  }

  /// Events whose confidence is strictly below `threshold`. Events without
  /// a confidence are not included.
  pub async fn find_low_confidence(
    &self,
    threshold: f64,
    page: Page,
  ) -> Result<Vec<RecognitionEvent>> {
    self.select("WHERE conf < ?", vec![threshold.into()], page).await
  }

  pub async fn find_by_corrected(
    &self,
    corrected: bool,
    page: Page,
  ) -> Result<Vec<RecognitionEvent>> {
    self
      .select("WHERE COALESCE(corrected, 0) = ?", vec![corrected.into()], page)
      .await
  }

  pub async fn count_by_corrected(&self, corrected: bool) -> Result<u64> {
    let rows = self
      .db
      .query(
        "SELECT COUNT(*) AS n FROM recog_events WHERE COALESCE(corrected, 0) = ?",
        vec![corrected.into()],
      )
      .await?;
    match rows.first() {
      Some(row) => Ok(row.get::<i64>("n")? as u64),
      None => Ok(0),
    }
  }

  pub async fn update(&self, id: i64, patch: RecognitionEventPatch) -> Result<()> {
    let mut set = Assignments::default();
    set.set("value", patch.value).set("corrected", patch.corrected);

    let Some((sql, params)) = set.into_statement("recog_events", "id", Value::Integer(id))
    else {
      return self.db.ensure_ready().await;
    };
    let outcome = self.db.execute(sql, params).await?;
    debug!(id, rows = outcome.rows_affected, "recognition event updated");
    Ok(())
  }

  /// The correction workflow: mark the event corrected and, when given,
  /// overwrite its value. `raw_text` and `conf` are left as recognised.
  pub async fn mark_corrected(&self, id: i64, value: Option<String>) -> Result<()> {
    let patch = RecognitionEventPatch {
      corrected: true.into(),
      value: value.map_or(Patch::Keep, |v| Patch::Set(Some(v))),
      ..Default::default()
    };
    self.update(id, patch).await
  }

  pub async fn delete(&self, id: i64) -> Result<()> {
    self
      .db
      .execute("DELETE FROM recog_events WHERE id = ?", vec![id.into()])
      .await?;
    debug!(id, "recognition event deleted");
    Ok(())
  }

  /// Remove every event attributed to `img_id`, so the image itself can be
  /// deleted. Returns the number of events removed.
  pub async fn delete_by_image(&self, img_id: &str) -> Result<usize> {
    let outcome = self
      .db
      .execute("DELETE FROM recog_events WHERE img_id = ?", vec![img_id.to_owned().into()])
      .await?;
    debug!(%img_id, rows = outcome.rows_affected, "recognition events deleted");
    Ok(outcome.rows_affected)
  }

  /// Confidence aggregate computed in SQL, over one image or all events.
  ///
  /// Events without a confidence count towards `total_events` only.
  pub async fn get_confidence_stats(
    &self,
    img_id: Option<&str>,
    threshold: f64,
  ) -> Result<ConfidenceStats> {
    let mut params: Vec<Value> = vec![threshold.into()];
    let where_clause = match img_id {
      Some(img_id) => {
        params.push(img_id.to_owned().into());
        "WHERE img_id = ?"
      }
      None => "",
    };
    let rows = self
      .db
      .query(
        format!(
          "SELECT
             COUNT(*)                                           AS total_events,
             COUNT(conf)                                        AS scored_events,
             AVG(conf)                                          AS avg_conf,
             MIN(conf)                                          AS min_conf,
             MAX(conf)                                          AS max_conf,
             COALESCE(SUM(CASE WHEN conf < ? THEN 1 ELSE 0 END), 0) AS below_threshold
           FROM recog_events {where_clause}"
        ),
        params,
      )
      .await?;

    let Some(row) = rows.first() else {
      return Ok(ConfidenceStats::default());
    };
    Ok(ConfidenceStats {
      total_events:    row.get::<i64>("total_events")? as u64,
      scored_events:   row.get::<i64>("scored_events")? as u64,
      average:         row.get("avg_conf")?,
      min:             row.get("min_conf")?,
      max:             row.get("max_conf")?,
      below_threshold: row.get::<i64>("below_threshold")? as u64,
    })
  }
}
