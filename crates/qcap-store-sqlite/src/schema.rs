//! SQL schema for the capture store.
//!
//! Executed on every connection open. `PRAGMA user_version` records the
//! schema revision; future migrations will be gated on it.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
///
/// Connection pragmas (foreign keys, journal mode, busy timeout) are applied
/// separately so each can be checked.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS templates (
    template_id  TEXT PRIMARY KEY,
    version      TEXT NOT NULL,
    roi_map_json TEXT NOT NULL        -- JSON array of regions
);

CREATE TABLE IF NOT EXISTS images (
    img_id        TEXT PRIMARY KEY,
    uri           TEXT NOT NULL,
    rectified_uri TEXT,
    template_id   TEXT REFERENCES templates(template_id),
    homography    TEXT,               -- JSON 3x3 matrix
    blur          REAL,
    glare         REAL,
    created_at    TEXT NOT NULL       -- RFC 3339 UTC, millisecond precision
);

CREATE TABLE IF NOT EXISTS records (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    date          TEXT,
    hour          TEXT,
    site          TEXT,
    form_type     TEXT,
    model_code    TEXT,
    input_L_mm    INT,
    input_W_mm    INT,
    input_T_mm    INT,
    input_count   INT,
    output_L_mm   INT,
    output_W_mm   INT,
    output_T_mm   INT,
    output_count  INT,
    qc_ok         INT,
    qc_ng         INT,
    operator_id   TEXT,
    batch_no      TEXT,
    line_id       TEXT,
    notes         TEXT,
    img_ref       TEXT,
    source_img_id TEXT REFERENCES images(img_id),
    model_version TEXT,
    verified      INT DEFAULT 0,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS recog_events (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    img_id     TEXT REFERENCES images(img_id),
    field_id   TEXT,
    raw_text   TEXT,
    value      TEXT,
    conf       REAL,
    corrected  INT DEFAULT 0,
    created_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_images_template       ON images(template_id);
CREATE INDEX IF NOT EXISTS idx_images_created        ON images(created_at);
CREATE INDEX IF NOT EXISTS idx_records_source_img    ON records(source_img_id);
CREATE INDEX IF NOT EXISTS idx_records_created       ON records(created_at);
CREATE INDEX IF NOT EXISTS idx_recog_events_img      ON recog_events(img_id);
CREATE INDEX IF NOT EXISTS idx_recog_events_created  ON recog_events(created_at);
";

/// Written to `PRAGMA user_version` after the DDL runs.
pub const SCHEMA_VERSION: i64 = 1;
