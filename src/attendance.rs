use chrono::{Local, NaiveDate};
use sqlx::SqlitePool;

use crate::error::{ApiError, ApiResult, is_unique_violation};
use crate::model::attendance::{Attendance, derive_status};

/// One row per (principal, day); the UNIQUE index is the duplicate guard.
pub async fn check_in(pool: &SqlitePool, user_id: i64) -> ApiResult<Attendance> {
    let now = Local::now();
    let today = now.date_naive();
    let time = now.time();

    let result = sqlx::query(
        r#"
        INSERT INTO attendance (user_id, date, check_in, status)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(today)
    .bind(time)
    .bind(derive_status(time))
    .execute(pool)
    .await;

    match result {
        Ok(done) => get_record(pool, done.last_insert_rowid()).await,
        Err(e) if is_unique_violation(&e) => Err(ApiError::AlreadyCheckedIn),
        Err(e) => Err(e.into()),
    }
}

pub async fn check_out(pool: &SqlitePool, user_id: i64) -> ApiResult<Attendance> {
    let now = Local::now();
    let today = now.date_naive();

    let row = sqlx::query_as::<_, Attendance>(
        "SELECT id, user_id, date, check_in, check_out, status FROM attendance WHERE user_id = ? AND date = ?",
    )
    .bind(user_id)
    .bind(today)
    .fetch_optional(pool)
    .await?;

    let record = row.ok_or(ApiError::NoCheckInYet)?;
    let check_in = record.check_in.ok_or(ApiError::NoCheckInYet)?;
    if record.check_out.is_some() {
        return Err(ApiError::AlreadyCheckedOut);
    }

    // guarded update: a racing second check-out affects zero rows
    let result = sqlx::query(
        r#"
        UPDATE attendance
        SET check_out = ?, status = ?
        WHERE id = ?
        AND check_out IS NULL
        "#,
    )
    .bind(now.time())
    .bind(derive_status(check_in))
    .bind(record.id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::AlreadyCheckedOut);
    }

    get_record(pool, record.id).await
}

/// Defaults to the trailing 30 days, newest first.
pub async fn my_attendance(
    pool: &SqlitePool,
    user_id: i64,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> ApiResult<Vec<Attendance>> {
    let today = Local::now().date_naive();
    let from = from.unwrap_or_else(|| today - chrono::Duration::days(30));
    let to = to.unwrap_or(today);

    Ok(sqlx::query_as::<_, Attendance>(
        r#"
        SELECT id, user_id, date, check_in, check_out, status
        FROM attendance
        WHERE user_id = ? AND date BETWEEN ? AND ?
        ORDER BY date DESC
        "#,
    )
    .bind(user_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?)
}

async fn get_record(pool: &SqlitePool, id: i64) -> ApiResult<Attendance> {
    sqlx::query_as::<_, Attendance>(
        "SELECT id, user_id, date, check_in, check_out, status FROM attendance WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("attendance record {id} not found")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    #[actix_web::test]
    async fn check_out_before_check_in_fails() {
        let pool = memory_pool().await;
        assert!(matches!(
            check_out(&pool, 1).await,
            Err(ApiError::NoCheckInYet)
        ));
    }

    #[actix_web::test]
    async fn double_check_in_is_a_conflict() {
        let pool = memory_pool().await;
        check_in(&pool, 1).await.unwrap();
        assert!(matches!(
            check_in(&pool, 1).await,
            Err(ApiError::AlreadyCheckedIn)
        ));
    }

    #[actix_web::test]
    async fn check_in_then_out_sets_the_pair() {
        let pool = memory_pool().await;
        let record = check_in(&pool, 1).await.unwrap();
        assert!(record.check_in.is_some());
        assert!(record.check_out.is_none());
        assert!(record.status.is_some());

        let record = check_out(&pool, 1).await.unwrap();
        assert!(record.check_out.is_some());

        assert!(matches!(
            check_out(&pool, 1).await,
            Err(ApiError::AlreadyCheckedOut)
        ));
    }

    #[actix_web::test]
    async fn records_are_per_principal() {
        let pool = memory_pool().await;
        check_in(&pool, 1).await.unwrap();
        // a second principal checks in independently on the same day
        check_in(&pool, 2).await.unwrap();

        let mine = my_attendance(&pool, 1, None, None).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].user_id, 1);
    }
}
