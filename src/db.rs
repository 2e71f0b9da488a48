use crate::error::AppError;
use crate::models::{
    Admin, Configuration, ConfigurationChanges, NewSlot, Session, Slot, SlotChanges,
};
use chrono::{Duration, Utc};
use futures::future::join_all;
use nanoid::nanoid;
use sqlx::SqlitePool;

pub async fn migrate(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS slots (
            id TEXT PRIMARY KEY NOT NULL,
            starts_at TEXT NOT NULL,
            description TEXT NOT NULL,
            active BOOLEAN NOT NULL DEFAULT 1,
            display_order INTEGER,
            contact_number TEXT,
            created_at TEXT NOT NULL
        );",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS configuration (
            id TEXT PRIMARY KEY NOT NULL,
            contact_number TEXT NOT NULL,
            tournament_name TEXT NOT NULL,
            daily_mode BOOLEAN NOT NULL DEFAULT 0,
            payment_key TEXT,
            visit_count INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL
        );",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS admins (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL
        );",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS sessions (
            token TEXT PRIMARY KEY NOT NULL,
            admin_id INTEGER NOT NULL,
            expires_at TEXT NOT NULL,
            FOREIGN KEY (admin_id) REFERENCES admins (id) ON DELETE CASCADE
        );",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Slots in display order: explicit order first (NULLs last), then by start time.
/// Rows without an order get their position index.
pub async fn list_slots(pool: &SqlitePool) -> Result<Vec<Slot>, AppError> {
    let slots: Vec<Slot> = sqlx::query_as(
        "SELECT * FROM slots ORDER BY display_order IS NULL, display_order ASC, starts_at ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(slots
        .into_iter()
        .enumerate()
        .map(|(i, mut slot)| {
            slot.display_order.get_or_insert(i as i64);
            slot
        })
        .collect())
}

pub async fn find_slot(pool: &SqlitePool, id: &str) -> Result<Option<Slot>, AppError> {
    sqlx::query_as("SELECT * FROM slots WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::from)
}

pub async fn create_slot(pool: &SqlitePool, slot: NewSlot) -> Result<Slot, AppError> {
    let created = sqlx::query_as(
        "INSERT INTO slots (id, starts_at, description, active, contact_number, created_at)
         VALUES (?, ?, ?, ?, ?, ?) RETURNING *",
    )
    .bind(nanoid!(10))
    .bind(slot.starts_at)
    .bind(slot.description)
    .bind(slot.active)
    .bind(slot.contact_number)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;
    Ok(created)
}

pub async fn update_slot(
    pool: &SqlitePool,
    id: &str,
    changes: SlotChanges,
) -> Result<Slot, AppError> {
    let current = find_slot(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("horário não encontrado".to_string()))?;

    let updated = sqlx::query_as(
        "UPDATE slots
         SET starts_at = ?, description = ?, active = ?, display_order = ?, contact_number = ?
         WHERE id = ? RETURNING *",
    )
    .bind(changes.starts_at.unwrap_or(current.starts_at))
    .bind(changes.description.unwrap_or(current.description))
    .bind(changes.active.unwrap_or(current.active))
    .bind(changes.display_order.or(current.display_order))
    .bind(changes.contact_number.unwrap_or(current.contact_number))
    .bind(id)
    .fetch_one(pool)
    .await?;
    Ok(updated)
}

pub async fn delete_slot(pool: &SqlitePool, id: &str) -> Result<(), AppError> {
    let deleted = sqlx::query("DELETE FROM slots WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(AppError::NotFound("horário não encontrado".to_string()));
    }
    Ok(())
}

/// Writes every position with its own UPDATE, all in flight at once.
/// There is no transaction: when some writes fail the others stay applied
/// and the first failure is returned.
pub async fn update_slot_order(
    pool: &SqlitePool,
    items: &[(String, i64)],
) -> Result<(), AppError> {
    let updates = items.iter().map(|(id, order)| {
        sqlx::query("UPDATE slots SET display_order = ? WHERE id = ?")
            .bind(*order)
            .bind(id)
            .execute(pool)
    });

    let results = join_all(updates).await;
    let failed = results.iter().filter(|r| r.is_err()).count();
    if failed > 0 {
        tracing::warn!(failed, total = items.len(), "some order updates failed");
    }
    results.into_iter().try_for_each(|r| r.map(|_| ()))?;
    Ok(())
}

pub async fn get_configuration(pool: &SqlitePool) -> Result<Option<Configuration>, AppError> {
    sqlx::query_as("SELECT * FROM configuration ORDER BY updated_at ASC LIMIT 1")
        .fetch_optional(pool)
        .await
        .map_err(AppError::from)
}

pub async fn upsert_configuration(
    pool: &SqlitePool,
    changes: ConfigurationChanges,
) -> Result<Configuration, AppError> {
    let payment_key = changes
        .payment_key
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty());

    let saved = match get_configuration(pool).await? {
        Some(existing) => {
            sqlx::query_as(
                "UPDATE configuration
                 SET contact_number = ?, tournament_name = ?, daily_mode = ?, payment_key = ?, updated_at = ?
                 WHERE id = ? RETURNING *",
            )
            .bind(changes.contact_number.trim())
            .bind(changes.tournament_name.trim())
            .bind(changes.daily_mode)
            .bind(payment_key)
            .bind(Utc::now())
            .bind(existing.id)
            .fetch_one(pool)
            .await?
        }
        None => {
            sqlx::query_as(
                "INSERT INTO configuration (id, contact_number, tournament_name, daily_mode, payment_key, visit_count, updated_at)
                 VALUES (?, ?, ?, ?, ?, 0, ?) RETURNING *",
            )
            .bind(nanoid!(10))
            .bind(changes.contact_number.trim())
            .bind(changes.tournament_name.trim())
            .bind(changes.daily_mode)
            .bind(payment_key)
            .bind(Utc::now())
            .fetch_one(pool)
            .await?
        }
    };
    Ok(saved)
}

/// Bumps the visit counter. Returns the new value, or `None` while unconfigured.
pub async fn register_visit(pool: &SqlitePool) -> Result<Option<i64>, AppError> {
    let row: Option<(i64,)> = sqlx::query_as(
        "UPDATE configuration SET visit_count = visit_count + 1
         WHERE id = (SELECT id FROM configuration ORDER BY updated_at ASC LIMIT 1)
         RETURNING visit_count",
    )
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|(count,)| count))
}

pub async fn count_admins(pool: &SqlitePool) -> Result<i64, AppError> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM admins")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn find_admin_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Admin>, AppError> {
    sqlx::query_as("SELECT id, email, password_hash FROM admins WHERE email = ?")
        .bind(email.trim().to_lowercase())
        .fetch_optional(pool)
        .await
        .map_err(AppError::from)
}

pub async fn create_admin(
    pool: &SqlitePool,
    email: &str,
    password_hash: &str,
) -> Result<Admin, AppError> {
    let email = email.trim().to_lowercase();
    let admin_id = sqlx::query("INSERT INTO admins (email, password_hash) VALUES (?, ?)")
        .bind(&email)
        .bind(password_hash)
        .execute(pool)
        .await?
        .last_insert_rowid();
    Ok(Admin {
        id: admin_id,
        email,
        password_hash: password_hash.to_string(),
    })
}

/// Opens a session and drops any sessions that have already expired.
pub async fn create_session(
    pool: &SqlitePool,
    admin_id: i64,
    ttl: Duration,
) -> Result<Session, AppError> {
    let now = Utc::now();
    let purged = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(now)
        .execute(pool)
        .await?
        .rows_affected();
    if purged > 0 {
        tracing::debug!(purged, "expired sessions removed");
    }

    let session = Session {
        token: nanoid!(32),
        admin_id,
        expires_at: now + ttl,
    };
    sqlx::query("INSERT INTO sessions (token, admin_id, expires_at) VALUES (?, ?, ?)")
        .bind(&session.token)
        .bind(session.admin_id)
        .bind(session.expires_at)
        .execute(pool)
        .await?;
    Ok(session)
}

/// Looks up a session by token; expired sessions are removed and reported as absent.
pub async fn find_active_session(
    pool: &SqlitePool,
    token: &str,
) -> Result<Option<Session>, AppError> {
    let session: Option<Session> =
        sqlx::query_as("SELECT token, admin_id, expires_at FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(pool)
            .await?;

    match session {
        Some(s) if s.expires_at > Utc::now() => Ok(Some(s)),
        Some(s) => {
            delete_session(pool, &s.token).await?;
            Ok(None)
        }
        None => Ok(None),
    }
}

pub async fn delete_session(pool: &SqlitePool, token: &str) -> Result<(), AppError> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}
