use crate::{
    auth::AdminSession,
    db,
    error::AppError,
    listing::{self, PublicConfiguration, SlotView},
    models::{Configuration, ConfigurationChanges, NewSlot, Slot, SlotChanges},
    reorder,
    reservation::{self, ReservationPlan},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::{
    WithRejection,
    cookie::{Cookie, CookieJar, SameSite},
};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

pub const VISIT_COOKIE: &str = "visit_registered";

fn parse_time(raw: &str) -> Result<NaiveTime, AppError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| AppError::BadRequest(format!("horário inválido: {raw}")))
}

fn local_to_utc(date: NaiveDate, time: NaiveTime, offset: FixedOffset) -> Result<DateTime<Utc>, AppError> {
    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| AppError::BadRequest("data/hora inválida".to_string()))
}

fn today(offset: FixedOffset) -> NaiveDate {
    Utc::now().with_timezone(&offset).date_naive()
}

fn normalize_contact(raw: Option<String>) -> Option<String> {
    raw.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

async fn is_daily_mode(app_state: &AppState) -> Result<bool, AppError> {
    Ok(db::get_configuration(&app_state.pool)
        .await?
        .is_some_and(|c| c.daily_mode))
}

// Public

pub async fn get_slots(State(app_state): State<AppState>) -> Result<Json<Vec<SlotView>>, AppError> {
    let (slots, configuration) = tokio::try_join!(
        db::list_slots(&app_state.pool),
        db::get_configuration(&app_state.pool)
    )?;
    Ok(Json(listing::public_listing(
        &slots,
        configuration.as_ref(),
        app_state.config.utc_offset,
    )))
}

pub async fn get_public_configuration(
    State(app_state): State<AppState>,
) -> Result<Json<PublicConfiguration>, AppError> {
    let configuration = db::get_configuration(&app_state.pool).await?;
    Ok(Json(listing::public_configuration(configuration.as_ref())))
}

#[derive(Serialize)]
pub struct VisitResponse {
    counted: bool,
    visit_count: i64,
}

/// Counts one visit per browser session; the session cookie marks it as done.
pub async fn register_visit(
    State(app_state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<VisitResponse>), AppError> {
    if jar.get(VISIT_COOKIE).is_some() {
        let visit_count = db::get_configuration(&app_state.pool)
            .await?
            .map(|c| c.visit_count)
            .unwrap_or(0);
        return Ok((
            jar,
            Json(VisitResponse {
                counted: false,
                visit_count,
            }),
        ));
    }

    let counted = db::register_visit(&app_state.pool).await?;
    let cookie = Cookie::build((VISIT_COOKIE, "true"))
        .path("/")
        .same_site(SameSite::Lax)
        .build();
    Ok((
        jar.add(cookie),
        Json(VisitResponse {
            counted: counted.is_some(),
            visit_count: counted.unwrap_or(0),
        }),
    ))
}

#[derive(Deserialize)]
pub struct ReservationPayload {
    slot_ids: Vec<String>,
    nicks: String,
}

pub async fn create_reservation(
    State(app_state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<ReservationPayload>, AppError>,
) -> Result<Json<ReservationPlan>, AppError> {
    let (slots, configuration) = tokio::try_join!(
        db::list_slots(&app_state.pool),
        db::get_configuration(&app_state.pool)
    )?;
    let plan = reservation::plan_reservation(
        &slots,
        &payload.slot_ids,
        &payload.nicks,
        configuration.as_ref(),
        app_state.config.utc_offset,
    )?;
    tracing::info!(
        slots = plan.slot_count,
        groups = plan.groups.len(),
        "reservation summary built"
    );
    Ok(Json(plan))
}

#[derive(Deserialize)]
pub struct KillBonusQuery {
    #[serde(default)]
    kills: u32,
}

#[derive(Serialize)]
pub struct KillBonus {
    kills: u32,
    bonus_cents: i64,
    bonus_label: String,
}

pub async fn kill_bonus(
    WithRejection(Query(query), _): WithRejection<Query<KillBonusQuery>, AppError>,
) -> Json<KillBonus> {
    let bonus_cents = reservation::kill_bonus_cents(query.kills);
    Json(KillBonus {
        kills: query.kills,
        bonus_cents,
        bonus_label: reservation::format_brl(bonus_cents),
    })
}

// Admin

pub async fn admin_list_slots(
    _session: AdminSession,
    State(app_state): State<AppState>,
) -> Result<Json<Vec<Slot>>, AppError> {
    db::list_slots(&app_state.pool).await.map(Json)
}

#[derive(Deserialize)]
pub struct CreateSlotPayload {
    date: Option<NaiveDate>,
    time: String,
    description: String,
    contact_number: Option<String>,
}

pub async fn admin_create_slot(
    _session: AdminSession,
    State(app_state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<CreateSlotPayload>, AppError>,
) -> Result<(StatusCode, Json<Slot>), AppError> {
    let offset = app_state.config.utc_offset;
    let description = payload.description.trim().to_string();
    if description.is_empty() {
        return Err(AppError::BadRequest("descrição obrigatória".to_string()));
    }
    let time = parse_time(&payload.time)?;
    let date = if is_daily_mode(&app_state).await? {
        today(offset)
    } else {
        payload
            .date
            .ok_or_else(|| AppError::BadRequest("data obrigatória".to_string()))?
    };

    let slot = db::create_slot(
        &app_state.pool,
        NewSlot {
            starts_at: local_to_utc(date, time, offset)?,
            description,
            active: true,
            contact_number: normalize_contact(payload.contact_number),
        },
    )
    .await?;
    tracing::info!(slot_id = %slot.id, "slot created");
    Ok((StatusCode::CREATED, Json(slot)))
}

#[derive(Deserialize)]
pub struct UpdateSlotPayload {
    date: Option<NaiveDate>,
    time: Option<String>,
    description: Option<String>,
    contact_number: Option<String>,
    active: Option<bool>,
}

pub async fn admin_update_slot(
    _session: AdminSession,
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    WithRejection(Json(payload), _): WithRejection<Json<UpdateSlotPayload>, AppError>,
) -> Result<Json<Slot>, AppError> {
    let offset = app_state.config.utc_offset;
    let current = db::find_slot(&app_state.pool, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("horário não encontrado".to_string()))?;

    let starts_at = if payload.date.is_some() || payload.time.is_some() {
        let local = current.starts_at.with_timezone(&offset);
        let daily_mode = is_daily_mode(&app_state).await?;
        let date = match payload.date {
            Some(date) if !daily_mode => date,
            _ => local.date_naive(),
        };
        let time = match payload.time.as_deref() {
            Some(raw) => parse_time(raw)?,
            None => local.time(),
        };
        Some(local_to_utc(date, time, offset)?)
    } else {
        None
    };

    let description = payload.description.map(|d| d.trim().to_string());
    if description.as_deref() == Some("") {
        return Err(AppError::BadRequest("descrição obrigatória".to_string()));
    }

    let changes = SlotChanges {
        starts_at,
        description,
        active: payload.active,
        display_order: None,
        contact_number: payload.contact_number.map(|n| normalize_contact(Some(n))),
    };
    db::update_slot(&app_state.pool, &id, changes).await.map(Json)
}

pub async fn admin_toggle_slot(
    _session: AdminSession,
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Slot>, AppError> {
    let current = db::find_slot(&app_state.pool, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("horário não encontrado".to_string()))?;
    let changes = SlotChanges {
        active: Some(!current.active),
        ..SlotChanges::default()
    };
    db::update_slot(&app_state.pool, &id, changes).await.map(Json)
}

pub async fn admin_delete_slot(
    _session: AdminSession,
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    db::delete_slot(&app_state.pool, &id).await?;
    tracing::info!(slot_id = %id, "slot deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn persist_order(app_state: &AppState, mut slots: Vec<Slot>) -> Result<Vec<Slot>, AppError> {
    reorder::renumber(&mut slots);
    db::update_slot_order(&app_state.pool, &reorder::positions(&slots)).await?;
    Ok(slots)
}

#[derive(Deserialize)]
pub struct MovePayload {
    active_id: String,
    over_id: String,
}

pub async fn admin_move_slot(
    _session: AdminSession,
    State(app_state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<MovePayload>, AppError>,
) -> Result<Json<Vec<Slot>>, AppError> {
    let slots = db::list_slots(&app_state.pool).await?;
    match reorder::reorder_by_ids(&slots, &payload.active_id, &payload.over_id) {
        Some(reordered) => persist_order(&app_state, reordered).await.map(Json),
        None => Ok(Json(slots)),
    }
}

#[derive(Deserialize)]
pub struct OrderPayload {
    ids: Vec<String>,
}

pub async fn admin_set_order(
    _session: AdminSession,
    State(app_state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<OrderPayload>, AppError>,
) -> Result<Json<Vec<Slot>>, AppError> {
    let slots = db::list_slots(&app_state.pool).await?;
    let reordered = reorder::apply_explicit_order(&slots, &payload.ids).ok_or_else(|| {
        AppError::BadRequest("a ordem deve conter cada horário exatamente uma vez".to_string())
    })?;
    persist_order(&app_state, reordered).await.map(Json)
}

pub async fn admin_get_configuration(
    _session: AdminSession,
    State(app_state): State<AppState>,
) -> Result<Json<Option<Configuration>>, AppError> {
    db::get_configuration(&app_state.pool).await.map(Json)
}

pub async fn admin_save_configuration(
    _session: AdminSession,
    State(app_state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<ConfigurationChanges>, AppError>,
) -> Result<Json<Configuration>, AppError> {
    let saved = db::upsert_configuration(&app_state.pool, payload).await?;
    tracing::info!(daily_mode = saved.daily_mode, "configuration saved");
    Ok(Json(saved))
}
