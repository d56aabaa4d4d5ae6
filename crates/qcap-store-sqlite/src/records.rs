//! [`RecordRepo`]: transaction records with surrogate `id`.

use qcap_core::record::{Record, RecordData, RecordPatch, RecordStats};
use rusqlite::types::Value;
use tracing::debug;

use crate::{
  Page, Result, StorageHandle,
  encode::{
    RECORD_COLUMNS, RECORD_INSERT_COLUMNS, placeholders, record_from_row, record_params,
  },
  update::Assignments,
};

#[derive(Clone)]
pub struct RecordRepo {
  db: StorageHandle,
}

impl RecordRepo {
  pub(crate) fn new(db: StorageHandle) -> Self { Self { db } }

  /// Newest first; `where_clause` must be static SQL with `?` parameters.
  async fn select(
    &self,
    where_clause: &str,
    mut params: Vec<Value>,
    page: Page,
  ) -> Result<Vec<Record>> {
    let limit = page.clause(&mut params);
    let rows = self
      .db
      .query(
        format!(
          "SELECT {RECORD_COLUMNS} FROM records {where_clause} \
           ORDER BY created_at DESC, id DESC {limit}"
        ),
        params,
      )
      .await?;
    rows.iter().map(record_from_row).collect()
  }

  /// Insert a record and return its generated id.
  pub async fn create(&self, record: &RecordData) -> Result<i64> {
    let params = record_params(record);
    let outcome = self
      .db
      .execute(
        format!(
          "INSERT INTO records ({RECORD_INSERT_COLUMNS}) VALUES ({})",
          placeholders(params.len())
        ),
        params,
      )
      .await?;
    debug!(id = outcome.last_insert_id, "record created");
    Ok(outcome.last_insert_id)
  }

  pub async fn find_by_id(&self, id: i64) -> Result<Option<Record>> {
    let mut records = self.select("WHERE id = ?", vec![id.into()], Page::ALL).await?;
    Ok(records.pop())
  }

  pub async fn find_all(&self, page: Page) -> Result<Vec<Record>> {
    self.select("", vec![], page).await
  }

  pub async fn find_by_source_image(&self, img_id: &str, page: Page) -> Result<Vec<Record>> {
    self
      .select("WHERE source_img_id = ?", vec![img_id.to_owned().into()], page)
      .await
  }

  /// Records whose `date` lies in `[start, end]` (both `YYYY-MM-DD`).
  pub async fn find_by_date_range(
    &self,
    start: &str,
    end: &str,
    page: Page,
  ) -> Result<Vec<Record>> {
    self
      .select(
        "WHERE date >= ? AND date <= ?",
        vec![start.to_owned().into(), end.to_owned().into()],
        page,
      )
      .await
  }

  pub async fn find_by_operator(&self, operator_id: &str, page: Page) -> Result<Vec<Record>> {
    self
      .select("WHERE operator_id = ?", vec![operator_id.to_owned().into()], page)
      .await
  }

  pub async fn find_by_batch(&self, batch_no: &str, page: Page) -> Result<Vec<Record>> {
    self
      .select("WHERE batch_no = ?", vec![batch_no.to_owned().into()], page)
      .await
  }

  /// Records by verification status; a NULL flag counts as unverified.
  pub async fn find_by_verified(&self, verified: bool, page: Page) -> Result<Vec<Record>> {
    self
      .select("WHERE COALESCE(verified, 0) = ?", vec![verified.into()], page)
      .await
  }

  pub async fn count(&self) -> Result<u64> {
    let rows = self.db.query("SELECT COUNT(*) AS n FROM records", vec![]).await?;
    match rows.first() {
      Some(row) => Ok(row.get::<i64>("n")? as u64),
      None => Ok(0),
    }
  }

  pub async fn update(&self, id: i64, patch: RecordPatch) -> Result<()> {
    let mut set = Assignments::default();
    set
      .set("date", patch.date)
      .set("hour", patch.hour)
      .set("site", patch.site)
      .set("form_type", patch.form_type)
      .set("model_code", patch.model_code)
      .set("input_L_mm", patch.input_l_mm)
      .set("input_W_mm", patch.input_w_mm)
      .set("input_T_mm", patch.input_t_mm)
      .set("input_count", patch.input_count)
      .set("output_L_mm", patch.output_l_mm)
      .set("output_W_mm", patch.output_w_mm)
      .set("output_T_mm", patch.output_t_mm)
      .set("output_count", patch.output_count)
      .set("qc_ok", patch.qc_ok)
      .set("qc_ng", patch.qc_ng)
      .set("operator_id", patch.operator_id)
      .set("batch_no", patch.batch_no)
      .set("line_id", patch.line_id)
      .set("notes", patch.notes)
      .set("img_ref", patch.img_ref)
      .set("source_img_id", patch.source_img_id)
      .set("model_version", patch.model_version)
      .set("verified", patch.verified);

    let Some((sql, params)) = set.into_statement("records", "id", Value::Integer(id)) else {
      return self.db.ensure_ready().await;
    };
    let outcome = self.db.execute(sql, params).await?;
    debug!(id, rows = outcome.rows_affected, "record updated");
    Ok(())
  }

  /// The verify workflow: flip `verified` to 1.
  pub async fn mark_verified(&self, id: i64) -> Result<()> {
    self
      .update(id, RecordPatch { verified: true.into(), ..Default::default() })
      .await
  }

  pub async fn delete(&self, id: i64) -> Result<()> {
    self
      .db
      .execute("DELETE FROM records WHERE id = ?", vec![id.into()])
      .await?;
    debug!(id, "record deleted");
    Ok(())
  }

  /// Totals over records whose `date` lies in `[start, end]`, computed in
  /// SQL. NULL counts add nothing to sums and are skipped by the average.
  pub async fn get_stats_by_date_range(&self, start: &str, end: &str) -> Result<RecordStats> {
    let rows = self
      .db
      .query(
        "SELECT
           COUNT(*)                          AS total_records,
           COALESCE(SUM(verified = 1), 0)    AS verified_records,
           COALESCE(SUM(input_count), 0)     AS total_input_count,
           COALESCE(SUM(output_count), 0)    AS total_output_count,
           COALESCE(SUM(qc_ok), 0)           AS total_qc_ok,
           COALESCE(SUM(qc_ng), 0)           AS total_qc_ng,
           AVG(output_count)                 AS avg_output_count
         FROM records
         WHERE date >= ? AND date <= ?",
        vec![start.to_owned().into(), end.to_owned().into()],
      )
      .await?;

    let Some(row) = rows.first() else {
      return Ok(RecordStats::default());
    };
    Ok(RecordStats {
      total_records:      row.get::<i64>("total_records")? as u64,
      verified_records:   row.get::<i64>("verified_records")? as u64,
      total_input_count:  row.get("total_input_count")?,
      total_output_count: row.get("total_output_count")?,
      total_qc_ok:        row.get("total_qc_ok")?,
      total_qc_ng:        row.get("total_qc_ng")?,
      avg_output_count:   row.get("avg_output_count")?,
    })
  }
}
