//! [`ImageRepo`]: captured images keyed by `img_id`.

use qcap_core::image::{Image, ImagePatch};
use rusqlite::types::Value;
use tracing::debug;

use crate::{
  Page, Result, Statement, StorageHandle,
  encode::{IMAGE_COLUMNS, encode_matrix, image_from_row, image_params, placeholders},
  update::Assignments,
};

#[derive(Clone)]
pub struct ImageRepo {
  db: StorageHandle,
}

impl ImageRepo {
  pub(crate) fn new(db: StorageHandle) -> Self { Self { db } }

  /// Newest first; `where_clause` must be static SQL with `?` parameters.
  async fn select(
    &self,
    where_clause: &str,
    mut params: Vec<Value>,
    page: Page,
  ) -> Result<Vec<Image>> {
    let limit = page.clause(&mut params);
    let rows = self
      .db
      .query(
        format!(
          "SELECT {IMAGE_COLUMNS} FROM images {where_clause} \
           ORDER BY created_at DESC, img_id DESC {limit}"
        ),
        params,
      )
      .await?;
    rows.iter().map(image_from_row).collect()
  }

  pub async fn create(&self, image: &Image) -> Result<()> {
    let params = image_params(image)?;
    self
      .db
      .execute(
        format!(
          "INSERT INTO images ({IMAGE_COLUMNS}) VALUES ({})",
          placeholders(params.len())
        ),
        params,
      )
      .await?;
    debug!(img_id = %image.img_id, "image created");
    Ok(())
  }

  pub async fn find_by_id(&self, img_id: &str) -> Result<Option<Image>> {
    let mut images = self
      .select("WHERE img_id = ?", vec![img_id.to_owned().into()], Page::ALL)
      .await?;
    Ok(images.pop())
  }

  pub async fn find_all(&self, page: Page) -> Result<Vec<Image>> {
    self.select("", vec![], page).await
  }

  pub async fn find_by_template(&self, template_id: &str, page: Page) -> Result<Vec<Image>> {
    self
      .select("WHERE template_id = ?", vec![template_id.to_owned().into()], page)
      .await
  }

  /// Images exceeding either supplied threshold (blur > b OR glare > g).
  ///
  /// With no thresholds at all this returns every image that carries any
  /// quality signal, i.e. blur or glare is not NULL.
  pub async fn find_with_quality_issues(
    &self,
    blur_threshold: Option<f64>,
    glare_threshold: Option<f64>,
    page: Page,
  ) -> Result<Vec<Image>> {
    let (where_clause, params) = match (blur_threshold, glare_threshold) {
      (None, None) => ("WHERE blur IS NOT NULL OR glare IS NOT NULL", vec![]),
      (Some(b), None) => ("WHERE blur > ?", vec![b.into()]),
      (None, Some(g)) => ("WHERE glare > ?", vec![g.into()]),
      (Some(b), Some(g)) => ("WHERE (blur > ? OR glare > ?)", vec![b.into(), g.into()]),
    };
    self.select(where_clause, params, page).await
  }

  /// Images that have not been rectified yet.
  pub async fn find_unrectified(&self, page: Page) -> Result<Vec<Image>> {
    self.select("WHERE rectified_uri IS NULL", vec![], page).await
  }

  pub async fn count(&self) -> Result<u64> {
    let rows = self.db.query("SELECT COUNT(*) AS n FROM images", vec![]).await?;
    match rows.first() {
      Some(row) => Ok(row.get::<i64>("n")? as u64),
      None => Ok(0),
    }
  }

  pub async fn update(&self, img_id: &str, patch: ImagePatch) -> Result<()> {
    let homography = patch
      .homography
      .try_map(|h| encode_matrix(h.as_ref()))?;
    let mut set = Assignments::default();
    set
      .set("uri", patch.uri)
      .set("rectified_uri", patch.rectified_uri)
      .set("template_id", patch.template_id)
      .set("homography", homography)
      .set("blur", patch.blur)
      .set("glare", patch.glare);

    let Some((sql, params)) =
      set.into_statement("images", "img_id", Value::Text(img_id.to_owned()))
    else {
      return self.db.ensure_ready().await;
    };
    let outcome = self.db.execute(sql, params).await?;
    debug!(%img_id, rows = outcome.rows_affected, "image updated");
    Ok(())
  }

  /// Fails with a foreign-key violation while any record or recognition
  /// event references the image.
  pub async fn delete(&self, img_id: &str) -> Result<()> {
    self
      .db
      .execute("DELETE FROM images WHERE img_id = ?", vec![img_id.to_owned().into()])
      .await?;
    debug!(%img_id, "image deleted");
    Ok(())
  }

  /// Delete the image's recognition events and then the image, in one
  /// transaction. Records still referencing the image make the whole
  /// operation fail and nothing is deleted.
  ///
  /// Returns the number of recognition events removed.
  pub async fn delete_with_events(&self, img_id: &str) -> Result<usize> {
    let key = Value::Text(img_id.to_owned());
    let outcomes = self
      .db
      .transaction(vec![
        Statement::new("DELETE FROM recog_events WHERE img_id = ?", vec![key.clone()]),
        Statement::new("DELETE FROM images WHERE img_id = ?", vec![key]),
      ])
      .await?;
    let events = outcomes.first().map_or(0, |o| o.rows_affected);
    debug!(%img_id, events, "image deleted with its recognition events");
    Ok(events)
  }
}
