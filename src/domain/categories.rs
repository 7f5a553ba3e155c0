//! Static country → strategic category table.
//!
//! Manually curated. Countries that are not listed get the empty tag set;
//! that is not an error.

use std::collections::BTreeSet;

use crate::domain::CategoryTag::{
    self, ActiveConflict, EnergyMarket, FinancialSystemic, GeopoliticalCore, MaritimeChoke,
    StrategicMinerals, TechSupplyChain,
};

pub const COUNTRY_TAGS: &[(&str, &[CategoryTag])] = &[
    ("USA", &[GeopoliticalCore, TechSupplyChain, FinancialSystemic]),
    ("Russia", &[GeopoliticalCore, EnergyMarket, ActiveConflict]),
    ("China", &[GeopoliticalCore, TechSupplyChain, StrategicMinerals]),
    ("Ukraine", &[GeopoliticalCore, ActiveConflict]),
    ("Taiwan", &[GeopoliticalCore, TechSupplyChain]),
    ("Israel", &[GeopoliticalCore, ActiveConflict]),
    ("Iran", &[GeopoliticalCore, EnergyMarket]),
    ("Venezuela", &[GeopoliticalCore, EnergyMarket]),
    ("Palestine", &[ActiveConflict]),
    ("Syria", &[ActiveConflict]),
    ("Yemen", &[ActiveConflict]),
    ("Afghanistan", &[ActiveConflict]),
    ("Myanmar", &[ActiveConflict]),
    ("Ethiopia", &[ActiveConflict]),
    ("Saudi Arabia", &[EnergyMarket, MaritimeChoke]),
    ("United Arab Emirates", &[EnergyMarket, MaritimeChoke]),
    ("Iraq", &[EnergyMarket, MaritimeChoke]),
    ("Qatar", &[EnergyMarket, MaritimeChoke]),
    ("Nigeria", &[EnergyMarket, MaritimeChoke]),
    ("South Korea", &[TechSupplyChain]),
    ("Japan", &[TechSupplyChain]),
    ("Netherlands", &[TechSupplyChain]),
    ("Germany", &[TechSupplyChain]),
    ("Vietnam", &[TechSupplyChain]),
    ("Mexico", &[TechSupplyChain]),
    ("Chile", &[StrategicMinerals]),
    ("Argentina", &[StrategicMinerals]),
    ("Bolivia", &[StrategicMinerals]),
    ("DR Congo", &[StrategicMinerals]),
    ("Australia", &[StrategicMinerals]),
    ("South Africa", &[StrategicMinerals]),
    ("United Kingdom", &[FinancialSystemic]),
    ("Turkey", &[FinancialSystemic]),
    ("Brazil", &[FinancialSystemic]),
    ("India", &[FinancialSystemic]),
];

/// Tags for a country name (exact match after trimming).
pub fn tags_for(country: &str) -> BTreeSet<CategoryTag> {
    let country = country.trim();
    COUNTRY_TAGS
        .iter()
        .find(|(name, _)| *name == country)
        .map(|(_, tags)| tags.iter().copied().collect())
        .unwrap_or_default()
}
