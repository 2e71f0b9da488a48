mod common;

use chrono::{Duration, TimeZone, Utc};
use std::collections::HashSet;
use vagafacil::{
    db,
    models::{ConfigurationChanges, NewSlot, SlotChanges},
};

fn new_slot(hour: u32, description: &str) -> NewSlot {
    NewSlot {
        starts_at: Utc.with_ymd_and_hms(2026, 10, 14, hour, 0, 0).unwrap(),
        description: description.to_string(),
        active: true,
        contact_number: None,
    }
}

#[tokio::test]
async fn unordered_slots_sort_by_time_and_get_position_fallback() -> anyhow::Result<()> {
    let pool = common::memory_pool().await?;
    let late = db::create_slot(&pool, new_slot(23, "late")).await?;
    let early = db::create_slot(&pool, new_slot(18, "early")).await?;

    let slots = db::list_slots(&pool).await?;
    assert_eq!(slots[0].id, early.id);
    assert_eq!(slots[1].id, late.id);
    assert_eq!(slots[0].display_order, Some(0));
    assert_eq!(slots[1].display_order, Some(1));

    // Stored rows keep NULL until an order is written.
    let stored = db::find_slot(&pool, &early.id).await?.unwrap();
    assert_eq!(stored.display_order, None);
    Ok(())
}

#[tokio::test]
async fn explicit_order_wins_and_nulls_go_last() -> anyhow::Result<()> {
    let pool = common::memory_pool().await?;
    let a = db::create_slot(&pool, new_slot(18, "a")).await?;
    let b = db::create_slot(&pool, new_slot(19, "b")).await?;
    let c = db::create_slot(&pool, new_slot(20, "c")).await?;

    db::update_slot_order(&pool, &[(c.id.clone(), 0), (a.id.clone(), 1)]).await?;

    let ids: Vec<String> = db::list_slots(&pool).await?.into_iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![c.id, a.id, b.id]);
    Ok(())
}

#[tokio::test]
async fn full_reorder_persists_every_position() -> anyhow::Result<()> {
    let pool = common::memory_pool().await?;
    let mut created = Vec::new();
    for hour in 10..16 {
        created.push(db::create_slot(&pool, new_slot(hour, "x")).await?.id);
    }
    let reversed: Vec<(String, i64)> = created
        .iter()
        .rev()
        .enumerate()
        .map(|(i, id)| (id.clone(), i as i64))
        .collect();
    db::update_slot_order(&pool, &reversed).await?;

    let slots = db::list_slots(&pool).await?;
    let ids: HashSet<&str> = slots.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, created.iter().map(String::as_str).collect::<HashSet<_>>());
    let orders: Vec<Option<i64>> = slots.iter().map(|s| s.display_order).collect();
    assert_eq!(orders, (0..6).map(Some).collect::<Vec<_>>());
    assert_eq!(slots[0].id, *created.last().unwrap());
    Ok(())
}

#[tokio::test]
async fn partial_update_keeps_untouched_fields() -> anyhow::Result<()> {
    let pool = common::memory_pool().await?;
    let mut draft = new_slot(20, "Purgatório");
    draft.contact_number = Some("5521999998888".to_string());
    let slot = db::create_slot(&pool, draft).await?;

    let updated = db::update_slot(
        &pool,
        &slot.id,
        SlotChanges {
            active: Some(false),
            ..SlotChanges::default()
        },
    )
    .await?;
    assert!(!updated.active);
    assert_eq!(updated.description, "Purgatório");
    assert_eq!(updated.contact_number.as_deref(), Some("5521999998888"));

    let cleared = db::update_slot(
        &pool,
        &slot.id,
        SlotChanges {
            contact_number: Some(None),
            ..SlotChanges::default()
        },
    )
    .await?;
    assert_eq!(cleared.contact_number, None);
    assert_eq!(cleared.starts_at, slot.starts_at);
    Ok(())
}

#[tokio::test]
async fn missing_slots_are_not_found() -> anyhow::Result<()> {
    let pool = common::memory_pool().await?;
    assert!(db::find_slot(&pool, "nope").await?.is_none());
    assert!(matches!(
        db::delete_slot(&pool, "nope").await,
        Err(vagafacil::error::AppError::NotFound(_))
    ));
    assert!(matches!(
        db::update_slot(&pool, "nope", SlotChanges::default()).await,
        Err(vagafacil::error::AppError::NotFound(_))
    ));
    Ok(())
}

#[tokio::test]
async fn configuration_is_a_singleton() -> anyhow::Result<()> {
    let pool = common::memory_pool().await?;
    assert!(db::get_configuration(&pool).await?.is_none());
    assert_eq!(db::register_visit(&pool).await?, None);

    let first = db::upsert_configuration(
        &pool,
        ConfigurationChanges {
            contact_number: "5511999990000".to_string(),
            tournament_name: "Diário Duo".to_string(),
            daily_mode: false,
            payment_key: Some("  ".to_string()),
        },
    )
    .await?;
    assert_eq!(first.payment_key, None);
    assert_eq!(first.visit_count, 0);

    assert_eq!(db::register_visit(&pool).await?, Some(1));
    assert_eq!(db::register_visit(&pool).await?, Some(2));

    let second = db::upsert_configuration(
        &pool,
        ConfigurationChanges {
            contact_number: "5511888880000".to_string(),
            tournament_name: "Copa".to_string(),
            daily_mode: true,
            payment_key: Some("pix@copa".to_string()),
        },
    )
    .await?;
    assert_eq!(second.id, first.id);
    assert_eq!(second.visit_count, 2);
    assert!(second.daily_mode);

    let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM configuration")
        .fetch_one(&pool)
        .await?;
    assert_eq!(rows, 1);
    Ok(())
}

#[tokio::test]
async fn expired_sessions_are_dropped() -> anyhow::Result<()> {
    let pool = common::memory_pool().await?;
    let admin = db::create_admin(&pool, " Admin@Example.com ", "hash").await?;
    assert_eq!(admin.email, "admin@example.com");
    assert!(db::find_admin_by_email(&pool, "ADMIN@example.com").await?.is_some());

    let live = db::create_session(&pool, admin.id, Duration::hours(1)).await?;
    let stale = db::create_session(&pool, admin.id, Duration::hours(-1)).await?;

    assert!(db::find_active_session(&pool, &live.token).await?.is_some());
    assert!(db::find_active_session(&pool, &stale.token).await?.is_none());

    db::delete_session(&pool, &live.token).await?;
    assert!(db::find_active_session(&pool, &live.token).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn failed_order_write_keeps_the_other_positions() -> anyhow::Result<()> {
    let pool = common::memory_pool().await?;
    let a = db::create_slot(&pool, new_slot(18, "a")).await?;
    let b = db::create_slot(&pool, new_slot(19, "b")).await?;
    let c = db::create_slot(&pool, new_slot(20, "c")).await?;

    // nanoid ids only use [A-Za-z0-9_-], so inlining is safe.
    sqlx::query(&format!(
        "CREATE TRIGGER block_order BEFORE UPDATE OF display_order ON slots \
         WHEN NEW.id = '{}' BEGIN SELECT RAISE(ABORT, 'blocked'); END",
        b.id
    ))
    .execute(&pool)
    .await?;

    let result = db::update_slot_order(
        &pool,
        &[(c.id.clone(), 0), (b.id.clone(), 1), (a.id.clone(), 2)],
    )
    .await;
    assert!(result.is_err());

    assert_eq!(db::find_slot(&pool, &c.id).await?.unwrap().display_order, Some(0));
    assert_eq!(db::find_slot(&pool, &a.id).await?.unwrap().display_order, Some(2));
    assert_eq!(db::find_slot(&pool, &b.id).await?.unwrap().display_order, None);
    Ok(())
}

#[tokio::test]
async fn new_sessions_purge_expired_ones() -> anyhow::Result<()> {
    let pool = common::memory_pool().await?;
    let admin = db::create_admin(&pool, "admin@example.com", "hash").await?;

    let stale = db::create_session(&pool, admin.id, Duration::hours(-1)).await?;
    let live = db::create_session(&pool, admin.id, Duration::hours(1)).await?;

    let (stale_rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions WHERE token = ?")
        .bind(&stale.token)
        .fetch_one(&pool)
        .await?;
    assert_eq!(stale_rows, 0);
    assert!(db::find_active_session(&pool, &live.token).await?.is_some());
    Ok(())
}
