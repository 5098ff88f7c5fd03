use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::models::{AttendanceRecord, Session, StudentMark};
use crate::source::{read_csv_records, sample_records, validate_records, RecordSource};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(
    pool: &PgPool,
    catalog: &Catalog,
    today: NaiveDate,
    days: u32,
) -> anyhow::Result<usize> {
    let records = sample_records(catalog, today, days)?;
    let mut inserted = 0usize;

    for record in &records {
        if insert_record(pool, record).await? {
            inserted += 1;
        }
    }

    info!(generated = records.len(), inserted, "seeded attendance records");
    Ok(inserted)
}

/// Inserts a record and its marks. Returns `false` when a record for the
/// same class, date and session already exists.
pub async fn insert_record(pool: &PgPool, record: &AttendanceRecord) -> anyhow::Result<bool> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        INSERT INTO attendance.records
        (id, date, department, course, batch, semester, session)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (department, course, batch, semester, date, session) DO NOTHING
        "#,
    )
    .bind(record.id)
    .bind(record.date)
    .bind(&record.department)
    .bind(&record.course)
    .bind(&record.batch)
    .bind(&record.semester)
    .bind(record.session.code())
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        debug!(date = %record.date, session = %record.session, "record already stored");
        tx.rollback().await?;
        return Ok(false);
    }

    for student in &record.students {
        sqlx::query(
            r#"
            INSERT INTO attendance.marks
            (record_id, position, roll_number, full_name, is_present)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.id)
        .bind(mark_position(student.id)?)
        .bind(&student.roll_number)
        .bind(&student.name)
        .bind(student.is_present)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(true)
}

fn mark_position(id: u32) -> anyhow::Result<i32> {
    i32::try_from(id).with_context(|| format!("mark position {id} out of range"))
}

pub async fn fetch_records(pool: &PgPool) -> anyhow::Result<Vec<AttendanceRecord>> {
    let rows = sqlx::query(
        "SELECT id, date, department, course, batch, semester, session \
         FROM attendance.records \
         ORDER BY date, department, course, batch, semester, session",
    )
    .fetch_all(pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    let mut index: HashMap<Uuid, usize> = HashMap::new();

    for row in rows {
        let session: String = row.get("session");
        let record = AttendanceRecord {
            id: row.get("id"),
            date: row.get("date"),
            department: row.get("department"),
            course: row.get("course"),
            batch: row.get("batch"),
            semester: row.get("semester"),
            session: session.parse::<Session>()?,
            students: Vec::new(),
        };
        index.insert(record.id, records.len());
        records.push(record);
    }

    let marks = sqlx::query(
        "SELECT record_id, position, roll_number, full_name, is_present \
         FROM attendance.marks \
         ORDER BY record_id, position",
    )
    .fetch_all(pool)
    .await?;

    for row in marks {
        let record_id: Uuid = row.get("record_id");
        let Some(&slot) = index.get(&record_id) else {
            continue;
        };
        let position: i32 = row.get("position");
        records[slot].students.push(StudentMark {
            id: u32::try_from(position).context("negative mark position")?,
            name: row.get("full_name"),
            roll_number: row.get("roll_number"),
            is_present: row.get("is_present"),
        });
    }

    debug!(records = records.len(), "fetched attendance records");
    Ok(records)
}

pub async fn import_csv(
    pool: &PgPool,
    catalog: &Catalog,
    csv_path: &std::path::Path,
    today: NaiveDate,
) -> anyhow::Result<usize> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let records = read_csv_records(file)?;
    validate_records(&records, today)?;
    for record in &records {
        catalog.check_record(record)?;
    }

    let mut inserted = 0usize;
    for record in &records {
        if insert_record(pool, record).await? {
            inserted += 1;
        }
    }

    info!(path = %csv_path.display(), parsed = records.len(), inserted, "imported csv");
    Ok(inserted)
}

pub struct PgSource {
    pool: PgPool,
}

impl PgSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordSource for PgSource {
    async fn load_records(&self) -> anyhow::Result<Vec<AttendanceRecord>> {
        fetch_records(&self.pool).await
    }
}
