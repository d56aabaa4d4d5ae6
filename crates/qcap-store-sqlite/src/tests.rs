//! Integration tests for the storage handle and repositories against an
//! in-memory database.

use chrono::{DateTime, TimeZone, Utc};
use qcap_core::{
  Patch,
  image::{Image, ImagePatch},
  recognition::{FieldRecognition, RecognitionEventData, RecognitionEventPatch},
  record::{RecordData, RecordPatch},
  template::{Region, RegionShape, RoiMap, Template, TargetKind, TemplatePatch, ValueType},
  validate::{IssueCode, RecordCandidate, validate_record},
};
use rusqlite::types::Value;

use crate::{Error, HandleState, Page, Statement, StorageHandle, schema::SCHEMA_VERSION};

async fn store() -> StorageHandle {
  StorageHandle::open_in_memory()
    .await
    .expect("in-memory store")
}

fn at(secs: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, secs).unwrap()
}

fn template(id: &str) -> Template { Template::new(id, "1.0", RoiMap::default()) }

fn image(id: &str, secs: u32) -> Image { Image::new(id, format!("file:///captures/{id}.jpg"), at(secs)) }

fn event(img_id: &str, field_id: &str, conf: Option<f64>) -> RecognitionEventData {
  RecognitionEventData::from_recognition(
    img_id,
    FieldRecognition {
      field_id: field_id.into(),
      raw_text: Some("7".into()),
      value:    Some("7".into()),
      conf,
    },
    at(30),
  )
}

// ─── Storage handle ──────────────────────────────────────────────────────────

#[tokio::test]
async fn schema_is_created_with_foreign_keys_on() {
  let db = store().await;
  assert_eq!(db.schema_version().await.unwrap(), SCHEMA_VERSION);

  let fk = db.query("PRAGMA foreign_keys", vec![]).await.unwrap();
  assert_eq!(fk[0].get::<i64>("foreign_keys").unwrap(), 1);

  let tables = db
    .query(
      "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
      vec![],
    )
    .await
    .unwrap();
  let names: Vec<String> = tables.iter().map(|r| r.get("name").unwrap()).collect();
  assert_eq!(names, ["images", "recog_events", "records", "templates"]);

  let indexes = db
    .query(
      "SELECT COUNT(*) AS n FROM sqlite_master WHERE type = 'index' AND name LIKE 'idx_%'",
      vec![],
    )
    .await
    .unwrap();
  assert_eq!(indexes[0].get::<i64>("n").unwrap(), 6);
}

#[tokio::test]
async fn execute_reports_rows_and_last_insert_id() {
  let db = store().await;
  let outcome = db
    .execute(
      "INSERT INTO records (created_at) VALUES (?)",
      vec![Value::Text("2024-01-01T00:00:00.000Z".into())],
    )
    .await
    .unwrap();
  assert_eq!(outcome.rows_affected, 1);
  assert_eq!(outcome.last_insert_id, 1);
}

#[tokio::test]
async fn parameters_are_never_interpolated() {
  let db = store().await;
  let hostile = "x'); DROP TABLE templates; --";
  db.templates().create(&template(hostile)).await.unwrap();
  let found = db.templates().find_by_id(hostile).await.unwrap();
  assert_eq!(found.map(|t| t.template_id).as_deref(), Some(hostile));
}

#[tokio::test]
async fn close_is_idempotent_and_blocks_further_use() {
  let db = store().await;
  let records = db.records();

  db.close().await.unwrap();
  db.close().await.unwrap();
  assert_eq!(db.state().await, HandleState::Closed);

  let err = records.find_all(Page::ALL).await.unwrap_err();
  assert!(err.is_not_initialized(), "{err}");
  assert!(matches!(db.query("SELECT 1", vec![]).await, Err(Error::NotInitialized)));
}

#[tokio::test]
async fn empty_update_after_close_is_not_initialized() {
  let db = store().await;
  db.templates().create(&template("T1")).await.unwrap();
  db.close().await.unwrap();

  let errs = [
    db.templates().update("T1", TemplatePatch::default()).await.unwrap_err(),
    db.images().update("I1", ImagePatch::default()).await.unwrap_err(),
    db.records().update(1, RecordPatch::default()).await.unwrap_err(),
    db.recognition_events()
      .update(1, RecognitionEventPatch::default())
      .await
      .unwrap_err(),
    db.recognition_events().create_many(&[]).await.unwrap_err(),
  ];
  for err in errs {
    assert!(err.is_not_initialized(), "{err}");
  }
}

#[tokio::test]
async fn reinitialize_reopens_a_closed_handle() {
  let db = store().await;
  db.close().await.unwrap();
  db.reinitialize().await.unwrap();
  assert_eq!(db.state().await, HandleState::Ready);
  assert_eq!(db.templates().find_all(Page::ALL).await.unwrap().len(), 0);
}

#[tokio::test]
async fn reinitialize_keeps_file_backed_data() {
  let path = std::env::temp_dir().join(format!(
    "qcap-reinit-{}-{}.db",
    std::process::id(),
    Utc::now().timestamp_nanos_opt().unwrap_or_default()
  ));
  let db = StorageHandle::open_path(&path).await.unwrap();
  db.templates().create(&template("T1")).await.unwrap();

  db.reinitialize().await.unwrap();
  assert!(db.templates().exists("T1").await.unwrap());

  db.close().await.unwrap();
  for suffix in ["", "-wal", "-shm"] {
    let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
  }
}

#[tokio::test]
async fn transaction_rolls_back_on_failure() {
  let db = store().await;
  let err = db
    .transaction(vec![
      Statement::new(
        "INSERT INTO templates (template_id, version, roi_map_json) VALUES (?, ?, ?)",
        vec!["T1".to_owned().into(), "1.0".to_owned().into(), "[]".to_owned().into()],
      ),
      // version is NOT NULL
      Statement::new(
        "INSERT INTO templates (template_id, version, roi_map_json) VALUES (?, NULL, ?)",
        vec!["T2".to_owned().into(), "[]".to_owned().into()],
      ),
    ])
    .await
    .unwrap_err();
  assert!(err.is_constraint_violation(), "{err}");
  assert!(!db.templates().exists("T1").await.unwrap());
}

// ─── Templates ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn template_round_trip_preserves_region_map() {
  let db = store().await;
  let t = Template::new(
    "T1",
    "2.1",
    RoiMap::new(vec![
      Region {
        field_id:   "qc_ok".into(),
        label:      Some("OK".into()),
        target:     TargetKind::Ocr,
        value_type: ValueType::Count,
        shape:      RegionShape::Rect { x: 1.0, y: 2.0, w: 3.0, h: 4.0, rotation: Some(90.0) },
        options:    vec![],
      },
      Region {
        field_id:   "sign".into(),
        label:      None,
        target:     TargetKind::Signature,
        value_type: ValueType::String,
        shape:      RegionShape::Polygon { points: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]] },
        options:    vec![],
      },
    ]),
  );
  db.templates().create(&t).await.unwrap();
  assert_eq!(db.templates().find_by_id("T1").await.unwrap(), Some(t));
  assert_eq!(db.templates().find_by_id("missing").await.unwrap(), None);
}

#[tokio::test]
async fn templates_list_in_key_order() {
  let db = store().await;
  for id in ["T3", "T1", "T2"] {
    db.templates().create(&template(id)).await.unwrap();
  }
  let ids: Vec<String> = db
    .templates()
    .find_all(Page::ALL)
    .await
    .unwrap()
    .into_iter()
    .map(|t| t.template_id)
    .collect();
  assert_eq!(ids, ["T1", "T2", "T3"]);

  let second: Vec<String> = db
    .templates()
    .find_all(Page::limit(1).with_offset(1))
    .await
    .unwrap()
    .into_iter()
    .map(|t| t.template_id)
    .collect();
  assert_eq!(second, ["T2"]);
}

#[tokio::test]
async fn template_update_replaces_only_given_fields() {
  let db = store().await;
  let repo = db.templates();
  repo.create(&template("T1")).await.unwrap();

  repo
    .update("T1", TemplatePatch { version: Patch::Set("1.1".into()), ..Default::default() })
    .await
    .unwrap();
  repo.update("T1", TemplatePatch::default()).await.unwrap();

  let t = repo.find_by_id("T1").await.unwrap().unwrap();
  assert_eq!(t.version, "1.1");
  assert!(t.roi_map.is_empty());
  assert_eq!(repo.find_by_version("1.1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn malformed_region_map_reads_as_empty() {
  let db = store().await;
  db.execute(
    "INSERT INTO templates (template_id, version, roi_map_json) VALUES ('T1', '1.0', '{not json')",
    vec![],
  )
  .await
  .unwrap();
  let t = db.templates().find_by_id("T1").await.unwrap().unwrap();
  assert!(t.roi_map.is_empty());
}

#[tokio::test]
async fn referenced_template_cannot_be_deleted() {
  let db = store().await;
  db.templates().create(&template("T1")).await.unwrap();
  let mut img = image("I1", 0);
  img.template_id = Some("T1".into());
  db.images().create(&img).await.unwrap();

  let err = db.templates().delete("T1").await.unwrap_err();
  assert!(err.is_foreign_key_violation(), "{err}");
}

// ─── Images ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn image_optional_fields_persist_as_null() {
  let db = store().await;
  db.images().create(&image("I1", 0)).await.unwrap();

  let rows = db
    .query(
      "SELECT rectified_uri IS NULL AS r, homography IS NULL AS h, blur IS NULL AS b FROM images",
      vec![],
    )
    .await
    .unwrap();
  assert!(rows[0].get::<bool>("r").unwrap());
  assert!(rows[0].get::<bool>("h").unwrap());
  assert!(rows[0].get::<bool>("b").unwrap());
}

#[tokio::test]
async fn image_with_unknown_template_is_rejected() {
  let db = store().await;
  let mut img = image("I1", 0);
  img.template_id = Some("nope".into());
  let err = db.images().create(&img).await.unwrap_err();
  assert!(err.is_foreign_key_violation(), "{err}");
}

#[tokio::test]
async fn images_list_newest_first_and_ignore_offset_without_limit() {
  let db = store().await;
  for (id, secs) in [("I1", 1), ("I2", 3), ("I3", 2)] {
    db.images().create(&image(id, secs)).await.unwrap();
  }
  let ids = |images: Vec<Image>| images.into_iter().map(|i| i.img_id).collect::<Vec<_>>();

  let all = db.images().find_all(Page::ALL).await.unwrap();
  assert_eq!(ids(all), ["I2", "I3", "I1"]);

  let offset_only = db
    .images()
    .find_all(Page { limit: None, offset: Some(2) })
    .await
    .unwrap();
  assert_eq!(offset_only.len(), 3);

  let page = db.images().find_all(Page::limit(2).with_offset(1)).await.unwrap();
  assert_eq!(ids(page), ["I3", "I1"]);
}

#[tokio::test]
async fn image_update_sets_and_clears_fields() {
  let db = store().await;
  let repo = db.images();
  repo.create(&image("I1", 0)).await.unwrap();

  let h = vec![vec![1.0, 0.0, 5.0], vec![0.0, 1.0, -2.5], vec![0.0, 0.0, 1.0]];
  repo
    .update("I1", ImagePatch {
      rectified_uri: Patch::Set(Some("file:///rectified/I1.png".into())),
      homography: Patch::Set(Some(h.clone())),
      blur: Patch::Set(Some(0.12)),
      glare: Patch::Set(Some(0.0)),
      ..Default::default()
    })
    .await
    .unwrap();
  let img = repo.find_by_id("I1").await.unwrap().unwrap();
  assert_eq!(img.homography, Some(h));
  assert_eq!(img.blur, Some(0.12));
  assert_eq!(img.glare, Some(0.0));
  assert!(img.is_rectified());

  repo
    .update("I1", ImagePatch { glare: Patch::Set(None), ..Default::default() })
    .await
    .unwrap();
  let img = repo.find_by_id("I1").await.unwrap().unwrap();
  assert_eq!(img.glare, None);
  assert_eq!(img.blur, Some(0.12), "untouched by the second patch");
  assert_eq!(repo.find_unrectified(Page::ALL).await.unwrap().len(), 0);
}

#[tokio::test]
async fn non_finite_homography_is_rejected_not_dropped() {
  let db = store().await;
  let repo = db.images();
  let mut img = image("I1", 0);
  img.homography = Some(vec![
    vec![f64::INFINITY, 0.0, 0.0],
    vec![0.0, 1.0, 0.0],
    vec![0.0, 0.0, 1.0],
  ]);
  let err = repo.create(&img).await.unwrap_err();
  assert!(
    matches!(err, Error::Core(qcap_core::Error::NonFiniteMatrix { row: 0, col: 0 })),
    "{err}"
  );
  assert!(repo.find_by_id("I1").await.unwrap().is_none());

  img.homography = None;
  repo.create(&img).await.unwrap();
  let err = repo
    .update("I1", ImagePatch {
      homography: Patch::Set(Some(vec![vec![1.0, f64::NAN], vec![0.0, 1.0]])),
      ..Default::default()
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(_)), "{err}");
  assert_eq!(repo.find_by_id("I1").await.unwrap().unwrap().homography, None);
}

#[tokio::test]
async fn malformed_homography_reads_as_absent() {
  let db = store().await;
  db.images().create(&image("I1", 0)).await.unwrap();
  db.execute("UPDATE images SET homography = '[[1,2],[3]]' WHERE img_id = 'I1'", vec![])
    .await
    .unwrap();
  let img = db.images().find_by_id("I1").await.unwrap().unwrap();
  assert_eq!(img.homography, None);
}

#[tokio::test]
async fn quality_issue_finder_uses_or_and_presence_fallback() {
  let db = store().await;
  let repo = db.images();
  let quality = [
    ("clean", None, None),
    ("blurry", Some(0.8), Some(0.1)),
    ("glary", Some(0.1), Some(0.9)),
    ("mild", Some(0.2), None),
    ("both", Some(0.7), Some(0.7)),
  ];
  for (i, (id, blur, glare)) in quality.into_iter().enumerate() {
    let mut img = image(id, i as u32);
    img.blur = blur;
    img.glare = glare;
    repo.create(&img).await.unwrap();
  }
  let ids = |images: Vec<Image>| {
    let mut ids: Vec<_> = images.into_iter().map(|i| i.img_id).collect();
    ids.sort();
    ids
  };

  let any_signal = repo.find_with_quality_issues(None, None, Page::ALL).await.unwrap();
  assert_eq!(ids(any_signal), ["blurry", "both", "glary", "mild"]);

  let blur_only = repo.find_with_quality_issues(Some(0.5), None, Page::ALL).await.unwrap();
  assert_eq!(ids(blur_only), ["blurry", "both"]);

  let glare_only = repo.find_with_quality_issues(None, Some(0.5), Page::ALL).await.unwrap();
  assert_eq!(ids(glare_only), ["both", "glary"]);

  let either = repo
    .find_with_quality_issues(Some(0.75), Some(0.8), Page::ALL)
    .await
    .unwrap();
  assert_eq!(ids(either), ["blurry", "glary"]);
}

#[tokio::test]
async fn image_with_record_cannot_be_deleted() {
  let db = store().await;
  db.images().create(&image("I1", 0)).await.unwrap();
  db.records()
    .create(&RecordData { source_img_id: Some("I1".into()), ..RecordData::new(at(1)) })
    .await
    .unwrap();

  let err = db.images().delete("I1").await.unwrap_err();
  assert!(err.is_foreign_key_violation(), "{err}");
  assert!(db.images().find_by_id("I1").await.unwrap().is_some());
}

#[tokio::test]
async fn image_deletes_after_its_events_are_removed() {
  let db = store().await;
  db.images().create(&image("I1", 0)).await.unwrap();
  let events = db.recognition_events();
  events
    .create_many(&[event("I1", "qc_ok", Some(0.9)), event("I1", "qc_ng", Some(0.5))])
    .await
    .unwrap();

  assert!(db.images().delete("I1").await.unwrap_err().is_foreign_key_violation());

  assert_eq!(events.delete_by_image("I1").await.unwrap(), 2);
  db.images().delete("I1").await.unwrap();
  assert_eq!(db.images().count().await.unwrap(), 0);
}

#[tokio::test]
async fn delete_with_events_is_all_or_nothing() {
  let db = store().await;
  db.images().create(&image("I1", 0)).await.unwrap();
  db.images().create(&image("I2", 1)).await.unwrap();
  let events = db.recognition_events();
  events.create(&event("I1", "qc_ok", Some(0.9))).await.unwrap();
  events.create(&event("I2", "qc_ok", Some(0.9))).await.unwrap();
  db.records()
    .create(&RecordData { source_img_id: Some("I2".into()), ..RecordData::new(at(2)) })
    .await
    .unwrap();

  assert_eq!(db.images().delete_with_events("I1").await.unwrap(), 1);
  assert!(db.images().find_by_id("I1").await.unwrap().is_none());

  let err = db.images().delete_with_events("I2").await.unwrap_err();
  assert!(err.is_foreign_key_violation(), "{err}");
  assert_eq!(events.find_by_image("I2", Page::ALL).await.unwrap().len(), 1);
}

// ─── Records ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn record_create_returns_id_and_round_trips() {
  let db = store().await;
  let data = RecordData {
    date: Some("2024-01-01".into()),
    hour: Some("08:00".into()),
    model_code: Some("PX-18".into()),
    input_l_mm: Some(2440),
    input_w_mm: Some(1220),
    input_t_mm: Some(18),
    input_count: Some(12),
    output_count: Some(10),
    qc_ok: Some(0),
    qc_ng: Some(10),
    operator_id: Some("op-7".into()),
    ..RecordData::new(at(5))
  };
  let id = db.records().create(&data).await.unwrap();
  let second = db.records().create(&RecordData::new(at(6))).await.unwrap();
  assert!(second > id);

  let record = db.records().find_by_id(id).await.unwrap().unwrap();
  assert_eq!(record.id, id);
  assert_eq!(record.data, data);
  assert_eq!(record.data.qc_ok, Some(0), "zero is not NULL");
  assert_eq!(record.data.notes, None);
  assert!(db.records().find_by_id(9999).await.unwrap().is_none());
}

#[tokio::test]
async fn record_update_distinguishes_unset_from_null() {
  let db = store().await;
  let repo = db.records();
  let id = repo
    .create(&RecordData {
      notes: Some("smudged".into()),
      site: Some("A".into()),
      ..RecordData::new(at(0))
    })
    .await
    .unwrap();

  repo
    .update(id, RecordPatch { notes: Patch::Set(None), ..Default::default() })
    .await
    .unwrap();
  let r = repo.find_by_id(id).await.unwrap().unwrap();
  assert_eq!(r.data.notes, None);
  assert_eq!(r.data.site.as_deref(), Some("A"));

  repo.update(id, RecordPatch::default()).await.unwrap();
  assert_eq!(repo.find_by_id(id).await.unwrap().unwrap(), r);
}

#[tokio::test]
async fn record_finders_filter_and_order() {
  let db = store().await;
  let repo = db.records();
  let rows = [
    ("2024-01-01", "op-1", "B1", 1),
    ("2024-01-02", "op-2", "B1", 2),
    ("2024-01-03", "op-1", "B2", 3),
    ("2024-01-05", "op-1", "B2", 4),
  ];
  for (date, op, batch, secs) in rows {
    repo
      .create(&RecordData {
        date: Some(date.into()),
        operator_id: Some(op.into()),
        batch_no: Some(batch.into()),
        ..RecordData::new(at(secs))
      })
      .await
      .unwrap();
  }
  let dates = |records: Vec<qcap_core::record::Record>| {
    records
      .into_iter()
      .filter_map(|r| r.data.date)
      .collect::<Vec<_>>()
  };

  let ranged = repo
    .find_by_date_range("2024-01-02", "2024-01-03", Page::ALL)
    .await
    .unwrap();
  assert_eq!(dates(ranged), ["2024-01-03", "2024-01-02"]);

  let op1 = repo.find_by_operator("op-1", Page::limit(2)).await.unwrap();
  assert_eq!(dates(op1), ["2024-01-05", "2024-01-03"]);

  let b1 = repo.find_by_batch("B1", Page::ALL).await.unwrap();
  assert_eq!(dates(b1), ["2024-01-02", "2024-01-01"]);
}

#[tokio::test]
async fn verify_workflow_flips_the_flag() {
  let db = store().await;
  let repo = db.records();
  let a = repo.create(&RecordData::new(at(0))).await.unwrap();
  let b = repo.create(&RecordData::new(at(1))).await.unwrap();

  repo.mark_verified(a).await.unwrap();

  let verified = repo.find_by_verified(true, Page::ALL).await.unwrap();
  let unverified = repo.find_by_verified(false, Page::ALL).await.unwrap();
  assert_eq!(verified.iter().map(|r| r.id).collect::<Vec<_>>(), [a]);
  assert_eq!(unverified.iter().map(|r| r.id).collect::<Vec<_>>(), [b]);
}

#[tokio::test]
async fn stats_treat_null_as_zero_and_skip_it_in_averages() {
  let db = store().await;
  let repo = db.records();
  let rows = [
    ("2024-01-01", Some(10), Some(7), Some(3), true),
    ("2024-01-02", None, None, Some(1), false),
    ("2024-01-02", Some(20), Some(20), None, false),
    ("2024-02-01", Some(99), Some(99), Some(0), true),
  ];
  for (i, (date, output, ok, ng, verified)) in rows.into_iter().enumerate() {
    repo
      .create(&RecordData {
        date: Some(date.into()),
        output_count: output,
        qc_ok: ok,
        qc_ng: ng,
        verified,
        ..RecordData::new(at(i as u32))
      })
      .await
      .unwrap();
  }

  let stats = repo
    .get_stats_by_date_range("2024-01-01", "2024-01-31")
    .await
    .unwrap();
  assert_eq!(stats.total_records, 3);
  assert_eq!(stats.verified_records, 1);
  assert_eq!(stats.total_output_count, 30);
  assert_eq!(stats.total_qc_ok, 27);
  assert_eq!(stats.total_qc_ng, 4);
  assert_eq!(stats.total_input_count, 0);
  assert_eq!(stats.avg_output_count, Some(15.0));

  let empty = repo
    .get_stats_by_date_range("2030-01-01", "2030-12-31")
    .await
    .unwrap();
  assert_eq!(empty.total_records, 0);
  assert_eq!(empty.avg_output_count, None);
}

#[tokio::test]
async fn end_to_end_capture_validate_correct() {
  let db = store().await;

  db.templates()
    .create(&Template::new("T1", "1.0", RoiMap::default()))
    .await
    .unwrap();

  let created_at = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
    .unwrap()
    .with_timezone(&Utc);
  let mut img = Image::new("I1", "file:///captures/I1.jpg", created_at);
  img.template_id = Some("T1".into());
  db.images().create(&img).await.unwrap();

  let id = db
    .records()
    .create(&RecordData {
      source_img_id: Some("I1".into()),
      output_count: Some(10),
      qc_ok: Some(7),
      qc_ng: Some(3),
      ..RecordData::new(created_at)
    })
    .await
    .unwrap();

  let record = db.records().find_by_id(id).await.unwrap().unwrap();
  let report = validate_record(&RecordCandidate::from(&record));
  assert_eq!(report.hard_gate_passed, Some(true));
  assert!(report.is_valid);

  db.records()
    .update(id, RecordPatch { qc_ng: Patch::Set(Some(2)), ..Default::default() })
    .await
    .unwrap();

  let record = db.records().find_by_id(id).await.unwrap().unwrap();
  let report = validate_record(&RecordCandidate::from(&record));
  assert_eq!(report.hard_gate_passed, Some(false));
  assert!(!report.is_valid);
  assert!(report.errors().any(|i| i.code == IssueCode::SumMismatch));
}

// ─── Recognition events ──────────────────────────────────────────────────────

#[tokio::test]
async fn confidence_stats_exclude_missing_confidences() {
  let db = store().await;
  db.images().create(&image("I1", 0)).await.unwrap();
  let events = db.recognition_events();
  let confs = [Some(0.9), None, Some(0.4), Some(0.2)];
  let batch: Vec<_> = confs.iter().map(|c| event("I1", "f", *c)).collect();
  events.create_many(&batch).await.unwrap();

  let stats = events.get_confidence_stats(Some("I1"), 0.8).await.unwrap();
  assert_eq!(stats.total_events, 4);
  assert_eq!(stats.scored_events, 3);
  assert_eq!(stats.below_threshold, 2);
  assert_eq!(stats.min, Some(0.2));
  assert_eq!(stats.max, Some(0.9));
  let avg = stats.average.unwrap();
  assert!((avg - (0.9 + 0.4 + 0.2) / 3.0).abs() < 1e-9);

  let none = events.get_confidence_stats(Some("other"), 0.8).await.unwrap();
  assert_eq!(none.total_events, 0);
  assert_eq!(none.average, None);
}

#[tokio::test]
async fn create_many_returns_ids_in_order() {
  let db = store().await;
  db.images().create(&image("I1", 0)).await.unwrap();
  let events = db.recognition_events();
  let ids = events
    .create_many(&[
      event("I1", "a", Some(0.1)),
      event("I1", "b", Some(0.2)),
      event("I1", "c", Some(0.3)),
    ])
    .await
    .unwrap();
  assert_eq!(ids.len(), 3);
  for (id, field) in ids.iter().zip(["a", "b", "c"]) {
    let e = events.find_by_id(*id).await.unwrap().unwrap();
    assert_eq!(e.data.field_id.as_deref(), Some(field));
  }
  assert!(events.create_many(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn low_confidence_finder_skips_nulls() {
  let db = store().await;
  db.images().create(&image("I1", 0)).await.unwrap();
  let events = db.recognition_events();
  for conf in [Some(0.95), None, Some(0.5), Some(0.8)] {
    events.create(&event("I1", "f", conf)).await.unwrap();
  }
  let low = events.find_low_confidence(0.8, Page::ALL).await.unwrap();
  assert_eq!(low.len(), 1);
  assert_eq!(low[0].data.conf, Some(0.5));
  assert_eq!(events.find_by_field("f", Page::limit(2)).await.unwrap().len(), 2);
}

#[tokio::test]
async fn correction_keeps_recogniser_output() {
  let db = store().await;
  db.images().create(&image("I1", 0)).await.unwrap();
  let events = db.recognition_events();
  let id = events.create(&event("I1", "qc_ok", Some(0.42))).await.unwrap();
  let untouched = events.create(&event("I1", "qc_ng", Some(0.99))).await.unwrap();

  events.mark_corrected(id, Some("8".into())).await.unwrap();

  let e = events.find_by_id(id).await.unwrap().unwrap();
  assert!(e.data.corrected);
  assert_eq!(e.data.value.as_deref(), Some("8"));
  assert_eq!(e.data.raw_text.as_deref(), Some("7"));
  assert_eq!(e.data.conf, Some(0.42));

  events.mark_corrected(untouched, None).await.unwrap();
  let e = events.find_by_id(untouched).await.unwrap().unwrap();
  assert!(e.data.corrected);
  assert_eq!(e.data.value.as_deref(), Some("7"));

  assert_eq!(events.count_by_corrected(true).await.unwrap(), 2);
  assert_eq!(events.find_by_corrected(false, Page::ALL).await.unwrap().len(), 0);
}

#[tokio::test]
async fn event_without_timestamp_or_image_is_storable() {
  let db = store().await;
  let events = db.recognition_events();
  let id = events
    .create(&RecognitionEventData {
      img_id:     None,
      field_id:   None,
      raw_text:   None,
      value:      None,
      conf:       None,
      corrected:  false,
      created_at: None,
    })
    .await
    .unwrap();
  let e = events.find_by_id(id).await.unwrap().unwrap();
  assert_eq!(e.data.created_at, None);
  assert_eq!(events.find_all(Page::ALL).await.unwrap().len(), 1);
}
