use crate::models::{Configuration, Slot};
use crate::reservation::{PRICE_PER_SLOT_CENTS, format_brl, format_time};
use chrono::{FixedOffset, Locale};
use serde::Serialize;

pub const DEFAULT_PAGE_TITLE: &str = "Vaga Fácil - Campeonato";

#[derive(Debug, Serialize)]
pub struct SlotView {
    pub id: String,
    pub time: String,
    /// `None` in daily mode.
    pub date_label: Option<String>,
    pub description: String,
    pub available: bool,
    pub price_label: String,
}

#[derive(Debug, Serialize)]
pub struct PublicConfiguration {
    pub configured: bool,
    pub tournament_name: Option<String>,
    pub page_title: String,
    pub daily_mode: bool,
    pub has_payment_key: bool,
    pub visit_count: i64,
}

pub fn date_label(slot: &Slot, offset: FixedOffset) -> String {
    slot.starts_at
        .with_timezone(&offset)
        .format_localized("%A, %d de %B", Locale::pt_BR)
        .to_string()
}

pub fn slot_view(slot: &Slot, daily_mode: bool, offset: FixedOffset) -> SlotView {
    SlotView {
        id: slot.id.clone(),
        time: format_time(slot, offset),
        date_label: (!daily_mode).then(|| date_label(slot, offset)),
        description: slot.description.clone(),
        available: slot.active,
        price_label: format_brl(PRICE_PER_SLOT_CENTS),
    }
}

pub fn public_listing(
    slots: &[Slot],
    configuration: Option<&Configuration>,
    offset: FixedOffset,
) -> Vec<SlotView> {
    let daily_mode = configuration.is_some_and(|c| c.daily_mode);
    slots
        .iter()
        .map(|s| slot_view(s, daily_mode, offset))
        .collect()
}

pub fn public_configuration(configuration: Option<&Configuration>) -> PublicConfiguration {
    let tournament_name = configuration
        .map(|c| c.tournament_name.trim().to_string())
        .filter(|n| !n.is_empty());
    PublicConfiguration {
        configured: configuration.is_some(),
        page_title: tournament_name
            .clone()
            .unwrap_or_else(|| DEFAULT_PAGE_TITLE.to_string()),
        tournament_name,
        daily_mode: configuration.is_some_and(|c| c.daily_mode),
        has_payment_key: configuration
            .and_then(|c| c.payment_key.as_deref())
            .is_some_and(|k| !k.trim().is_empty()),
        visit_count: configuration.map(|c| c.visit_count).unwrap_or(0),
    }
}
