//! [`TemplateRepo`]: form layouts keyed by `template_id`.

use qcap_core::template::{Template, TemplatePatch};
use rusqlite::types::Value;
use tracing::debug;

use crate::{
  Page, Result, StorageHandle,
  encode::{TEMPLATE_COLUMNS, encode_roi_map, template_from_row},
  update::Assignments,
};

#[derive(Clone)]
pub struct TemplateRepo {
  db: StorageHandle,
}

impl TemplateRepo {
  pub(crate) fn new(db: StorageHandle) -> Self { Self { db } }

  pub async fn create(&self, template: &Template) -> Result<()> {
    self
      .db
      .execute(
        "INSERT INTO templates (template_id, version, roi_map_json) VALUES (?, ?, ?)",
        vec![
          template.template_id.clone().into(),
          template.version.clone().into(),
          encode_roi_map(&template.roi_map)?,
        ],
      )
      .await?;
    debug!(template_id = %template.template_id, "template created");
    Ok(())
  }

  pub async fn find_by_id(&self, template_id: &str) -> Result<Option<Template>> {
    let rows = self
      .db
      .query(
        format!("SELECT {TEMPLATE_COLUMNS} FROM templates WHERE template_id = ?"),
        vec![template_id.to_owned().into()],
      )
      .await?;
    rows.first().map(template_from_row).transpose()
  }

  pub async fn exists(&self, template_id: &str) -> Result<bool> {
    let rows = self
      .db
      .query(
        "SELECT 1 AS present FROM templates WHERE template_id = ?",
        vec![template_id.to_owned().into()],
      )
      .await?;
    Ok(!rows.is_empty())
  }

  /// All templates ordered by `template_id`.
  pub async fn find_all(&self, page: Page) -> Result<Vec<Template>> {
    let mut params = vec![];
    let limit = page.clause(&mut params);
    let rows = self
      .db
      .query(
        format!("SELECT {TEMPLATE_COLUMNS} FROM templates ORDER BY template_id {limit}"),
        params,
      )
      .await?;
    rows.iter().map(template_from_row).collect()
  }

  pub async fn find_by_version(&self, version: &str) -> Result<Vec<Template>> {
    let rows = self
      .db
      .query(
        format!(
          "SELECT {TEMPLATE_COLUMNS} FROM templates WHERE version = ? ORDER BY template_id"
        ),
        vec![version.to_owned().into()],
      )
      .await?;
    rows.iter().map(template_from_row).collect()
  }

  pub async fn update(&self, template_id: &str, patch: TemplatePatch) -> Result<()> {
    let roi_map = patch.roi_map.try_map(|m| encode_roi_map(&m))?;
    let mut set = Assignments::default();
    set.set("version", patch.version).set("roi_map_json", roi_map);

    let Some((sql, params)) =
      set.into_statement("templates", "template_id", Value::Text(template_id.to_owned()))
    else {
      return self.db.ensure_ready().await;
    };
    let outcome = self.db.execute(sql, params).await?;
    debug!(%template_id, rows = outcome.rows_affected, "template updated");
    Ok(())
  }

  /// Fails with a foreign-key violation while any image references it.
  pub async fn delete(&self, template_id: &str) -> Result<()> {
    self
      .db
      .execute(
        "DELETE FROM templates WHERE template_id = ?",
        vec![template_id.to_owned().into()],
      )
      .await?;
    debug!(%template_id, "template deleted");
    Ok(())
  }
}
