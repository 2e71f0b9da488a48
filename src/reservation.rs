//! Reservation summary: groups the picked slots by organiser and builds one
//! pre-filled WhatsApp message per organiser.

use crate::error::AppError;
use crate::models::{Configuration, Slot};
use chrono::FixedOffset;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

pub const PRICE_PER_SLOT_CENTS: i64 = 500;
pub const KILL_BONUS_CENTS: i64 = 50;
pub const DEFAULT_TOURNAMENT_TITLE: &str = "Campeonato";

const WHATSAPP_SEND_URL: &str = "https://api.whatsapp.com/send/";

// Same unreserved set as JavaScript's encodeURIComponent.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

static BR_PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]{2})([0-9]{2})([0-9]{5})([0-9]{4})").expect("valid phone pattern")
});

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactGroup {
    pub contact_number: String,
    pub contact_label: String,
    pub slot_ids: Vec<String>,
    pub times: Vec<String>,
    pub message: String,
    pub whatsapp_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReservationPlan {
    pub slot_count: usize,
    pub total_cents: i64,
    pub total_label: String,
    pub groups: Vec<ContactGroup>,
}

/// `R$ 12,50` style label.
pub fn format_brl(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.abs();
    format!("{sign}R$ {},{:02}", cents / 100, cents % 100)
}

pub fn reservation_total_cents(slot_count: usize) -> i64 {
    slot_count as i64 * PRICE_PER_SLOT_CENTS
}

pub fn kill_bonus_cents(kills: u32) -> i64 {
    kills as i64 * KILL_BONUS_CENTS
}

pub fn format_time(slot: &Slot, offset: FixedOffset) -> String {
    slot.starts_at.with_timezone(&offset).format("%H:%M").to_string()
}

/// Per-slot override when it is not blank, else the organiser-wide number.
pub fn effective_contact<'a>(slot: &'a Slot, fallback: &'a str) -> &'a str {
    slot.contact_number
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(fallback)
}

/// Partitions by effective contact, keeping first-appearance order of groups
/// and the original order inside each group.
pub fn group_by_contact<'a>(slots: &[&'a Slot], fallback: &str) -> Vec<(String, Vec<&'a Slot>)> {
    let mut groups: Vec<(String, Vec<&'a Slot>)> = Vec::new();
    for &slot in slots {
        let contact = effective_contact(slot, fallback);
        match groups.iter_mut().find(|(number, _)| number.as_str() == contact) {
            Some((_, members)) => members.push(slot),
            None => groups.push((contact.to_string(), vec![slot])),
        }
    }
    groups
}

pub fn compose_message(
    tournament_name: &str,
    nicks: &str,
    slots: &[&Slot],
    payment_key: Option<&str>,
    offset: FixedOffset,
) -> String {
    let name = tournament_name.trim();
    let title = if name.is_empty() {
        DEFAULT_TOURNAMENT_TITLE.to_uppercase()
    } else {
        name.to_uppercase()
    };
    let times = slots
        .iter()
        .map(|s| format!("- {}", format_time(s, offset)))
        .collect::<Vec<_>>()
        .join("\n");
    let count = slots.len();
    let plural = if count > 1 { "s" } else { "" };
    let pix = payment_key
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(|k| format!("\n*Pix:* {k}"))
        .unwrap_or_default();

    [
        format!("*VAGA - {title}* \u{270d}"),
        String::new(),
        format!("*Nicks:* {}", nicks.trim()),
        "*Horários:*".to_string(),
        times,
        String::new(),
        format!(
            "*Total:* {} ({count} vaga{plural}){pix}",
            format_brl(reservation_total_cents(count))
        ),
    ]
    .join("\n")
}

pub fn whatsapp_url(phone: &str, text: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    format!(
        "{WHATSAPP_SEND_URL}?phone={digits}&text={}&type=phone_number&app_absent=0",
        utf8_percent_encode(text, URI_COMPONENT)
    )
}

/// `5511987654321` becomes `+55 (11) 98765-4321`; anything else is returned untouched.
pub fn display_phone(number: &str) -> String {
    BR_PHONE.replacen(number, 1, "+$1 ($2) $3-$4").into_owned()
}

/// Validates a selection against the current listing and builds the outgoing messages.
pub fn plan_reservation(
    listing: &[Slot],
    selected_ids: &[String],
    nicks: &str,
    configuration: Option<&Configuration>,
    offset: FixedOffset,
) -> Result<ReservationPlan, AppError> {
    if nicks.trim().is_empty() {
        return Err(AppError::BadRequest("informe os nicks da dupla".to_string()));
    }
    if selected_ids.is_empty() {
        return Err(AppError::BadRequest("selecione ao menos um horário".to_string()));
    }
    if let Some(unknown) = selected_ids
        .iter()
        .find(|id| !listing.iter().any(|s| &s.id == *id))
    {
        return Err(AppError::NotFound(format!("horário {unknown} não encontrado")));
    }

    let selected: Vec<&Slot> = listing
        .iter()
        .filter(|s| selected_ids.contains(&s.id))
        .collect();
    if let Some(closed) = selected.iter().find(|s| !s.active) {
        return Err(AppError::BadRequest(format!(
            "o horário {} está encerrado",
            format_time(closed, offset)
        )));
    }

    let fallback = configuration.map(|c| c.contact_number.as_str()).unwrap_or("");
    let tournament_name = configuration.map(|c| c.tournament_name.as_str()).unwrap_or("");
    let payment_key = configuration.and_then(|c| c.payment_key.as_deref());

    let mut groups = Vec::new();
    for (contact, members) in group_by_contact(&selected, fallback) {
        if contact.chars().all(|c| !c.is_ascii_digit()) {
            return Err(AppError::BadRequest(
                "o organizador ainda não configurou o WhatsApp".to_string(),
            ));
        }
        let message = compose_message(tournament_name, nicks, &members, payment_key, offset);
        groups.push(ContactGroup {
            contact_label: display_phone(&contact),
            slot_ids: members.iter().map(|s| s.id.clone()).collect(),
            times: members.iter().map(|s| format_time(s, offset)).collect(),
            whatsapp_url: whatsapp_url(&contact, &message),
            message,
            contact_number: contact,
        });
    }

    let total_cents = reservation_total_cents(selected.len());
    Ok(ReservationPlan {
        slot_count: selected.len(),
        total_cents,
        total_label: format_brl(total_cents),
        groups,
    })
}
