//! Report persistence
//!
//! Each report is stored as one JSON document with its engagement collections embedded.
//! Updates go through [`mutate_report`], which re-reads the document, applies the
//! change and writes it back only if no other writer got there first. Two engagement
//! operations on the same report therefore never interleave; operations on different
//! reports do not contend with each other beyond SQLite's single-writer lock.

use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use super::retry::{retry_on_lock, LockBackoff, DEFAULT_MAX_LOCK_WAIT_MS};
use crate::report::{Report, ReportId, UserId};
use crate::{Error, Result};

/// Upper bound on compare-and-swap rounds before giving up on a hot report
const MAX_CAS_ROUNDS: u32 = 64;

/// Outcome of [`insert_report`]
#[derive(Debug, Clone)]
pub enum Inserted {
    /// A new row was written
    Created(Report),
    /// The reporter already submitted with this idempotency key; the original is returned
    Existing(Report),
}

impl Inserted {
    pub fn report(&self) -> &Report {
        match self {
            Inserted::Created(r) | Inserted::Existing(r) => r,
        }
    }

    pub fn into_report(self) -> Report {
        match self {
            Inserted::Created(r) | Inserted::Existing(r) => r,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, Inserted::Created(_))
    }
}

/// Persist a newly built report
///
/// When `client_token` is set and the same reporter already stored a report with that
/// token, nothing is written and the stored report is returned instead. This makes a
/// retried submission safe even when the first attempt reached the server.
pub async fn insert_report(
    pool: &SqlitePool,
    mut report: Report,
    client_token: Option<&str>,
) -> Result<Inserted> {
    report.prepare_for_save();

    let id = report.id().to_string();
    let reported_by = report.reported_by().to_string();
    let document = serde_json::to_string(&report)?;
    let reported_at = report.reported_at().to_rfc3339();
    let updated_at = report.updated_at().to_rfc3339();
    let report_type = report.report_type.as_str();
    let status = report.status().as_str();
    let severity = report.severity.as_str();

    let rows = retry_on_lock("insert_report", DEFAULT_MAX_LOCK_WAIT_MS, || async {
        let result = sqlx::query(
            r#"
            INSERT INTO reports (
                id, reported_by, type, status, severity, is_active,
                reported_at, updated_at, client_token, version, document
            ) VALUES (?, ?, ?, ?, ?, 1, ?, ?, ?, 0, ?)
            ON CONFLICT(reported_by, client_token) DO NOTHING
            "#,
        )
        .bind(&id)
        .bind(&reported_by)
        .bind(report_type)
        .bind(status)
        .bind(severity)
        .bind(&reported_at)
        .bind(&updated_at)
        .bind(client_token)
        .bind(&document)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    })
    .await?;

    if rows == 1 {
        info!(report_id = %report.id(), reported_by = %report.reported_by(), "Report created");
        return Ok(Inserted::Created(report));
    }

    let token = client_token.ok_or_else(|| {
        Error::Internal(format!("insert of report {} affected no rows", report.id()))
    })?;
    let existing = find_by_client_token(pool, report.reported_by(), token)
        .await?
        .ok_or_else(|| Error::Internal("idempotent replay found no stored report".to_string()))?;

    info!(
        report_id = %existing.id(),
        reported_by = %existing.reported_by(),
        "Duplicate submission, returning existing report"
    );
    Ok(Inserted::Existing(existing))
}

/// The report a reporter previously stored under `client_token`, if any
pub async fn find_by_client_token(
    pool: &SqlitePool,
    reported_by: UserId,
    client_token: &str,
) -> Result<Option<Report>> {
    let document: Option<String> = sqlx::query_scalar(
        "SELECT document FROM reports WHERE reported_by = ? AND client_token = ?",
    )
    .bind(reported_by.to_string())
    .bind(client_token)
    .fetch_optional(pool)
    .await?;

    document
        .map(|doc| serde_json::from_str(&doc).map_err(Error::from))
        .transpose()
}

/// Load a report regardless of whether it is active
pub async fn load_report(pool: &SqlitePool, id: ReportId) -> Result<Option<Report>> {
    Ok(load_versioned(pool, id).await?.map(|(report, _)| report))
}

/// Load an active report, treating inactive reports as missing
pub async fn get_active_report(pool: &SqlitePool, id: ReportId) -> Result<Report> {
    match load_report(pool, id).await? {
        Some(report) if report.is_active() => Ok(report),
        _ => Err(Error::report_not_found(id)),
    }
}

async fn load_versioned(pool: &SqlitePool, id: ReportId) -> Result<Option<(Report, i64)>> {
    let row = sqlx::query("SELECT document, version FROM reports WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => {
            let document: String = row.get("document");
            let version: i64 = row.get("version");
            let report: Report = serde_json::from_str(&document)?;
            Ok(Some((report, version)))
        }
        None => Ok(None),
    }
}

/// Active reports, newest first, at most `limit`
pub async fn list_active(pool: &SqlitePool, limit: i64) -> Result<Vec<Report>> {
    let documents: Vec<String> = sqlx::query_scalar(
        "SELECT document FROM reports WHERE is_active = 1 ORDER BY reported_at DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    decode_all(documents)
}

/// Active reports by one reporter, newest first, at most `limit`
pub async fn list_by_reporter(pool: &SqlitePool, reported_by: UserId, limit: i64) -> Result<Vec<Report>> {
    let documents: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT document FROM reports
        WHERE is_active = 1 AND reported_by = ?
        ORDER BY reported_at DESC
        LIMIT ?
        "#,
    )
    .bind(reported_by.to_string())
    .bind(limit)
    .fetch_all(pool)
    .await?;

    decode_all(documents)
}

fn decode_all(documents: Vec<String>) -> Result<Vec<Report>> {
    documents
        .iter()
        .map(|doc| serde_json::from_str(doc).map_err(Error::from))
        .collect()
}

/// Atomically apply `change` to one report
///
/// **Algorithm:**
/// 1. Read the document and its version
/// 2. Apply `change` to an in-memory copy; an error aborts without writing
/// 3. Re-establish aggregate invariants (`prepare_for_save`)
/// 4. Write back only if the stored version is unchanged
/// 5. If another writer won, start over from step 1
///
/// `change` may run more than once and must only touch the report it is given.
pub async fn mutate_report<T, F>(
    pool: &SqlitePool,
    id: ReportId,
    operation: &str,
    mut change: F,
) -> Result<(Report, T)>
where
    F: FnMut(&mut Report) -> Result<T>,
{
    let mut lock_backoff = LockBackoff::new(DEFAULT_MAX_LOCK_WAIT_MS);

    for round in 1..=MAX_CAS_ROUNDS {
        let (mut report, version) = load_versioned(pool, id)
            .await?
            .ok_or_else(|| Error::report_not_found(id))?;

        let output = change(&mut report)?;
        report.prepare_for_save();

        match write_if_unchanged(pool, &report, version).await {
            Ok(true) => {
                debug!(report_id = %id, operation, round, "Report updated");
                return Ok((report, output));
            }
            Ok(false) => {
                debug!(report_id = %id, operation, round, "Concurrent update detected, retrying");
                tokio::task::yield_now().await;
            }
            Err(err) if err.is_lock_contention() => {
                lock_backoff.attempt = round;
                if !lock_backoff.wait(operation).await {
                    return Err(err);
                }
            }
            Err(err) => return Err(err),
        }
    }

    Err(Error::Internal(format!(
        "{} on report {} abandoned after {} concurrent update conflicts",
        operation, id, MAX_CAS_ROUNDS
    )))
}

async fn write_if_unchanged(pool: &SqlitePool, report: &Report, version: i64) -> Result<bool> {
    let document = serde_json::to_string(report)?;

    let result = sqlx::query(
        r#"
        UPDATE reports
        SET document = ?, status = ?, severity = ?, is_active = ?, updated_at = ?,
            version = version + 1
        WHERE id = ? AND version = ?
        "#,
    )
    .bind(&document)
    .bind(report.status().as_str())
    .bind(report.severity.as_str())
    .bind(report.is_active())
    .bind(report.updated_at().to_rfc3339())
    .bind(report.id().to_string())
    .bind(version)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}
