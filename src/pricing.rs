//! Estimated price for the current service + pet selection.
//!
//! Resolution is a pure function of the selection and never fails: a tier
//! set that is malformed or does not cover the pet's weight degrades to
//! [`DisplayPrice::Inquire`]. Tier sets are checked when they are authored,
//! see [`validate_weight_rules`].

use std::fmt;

use thiserror::Error;

use crate::models::{Pet, Service, WeightPriceRule};

/// What the "estimated price" line shows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DisplayPrice {
    /// Service or pet not chosen yet.
    Unresolved,
    Amount(f64),
    /// No tier covers the pet's weight; the client must ask the clinic.
    Inquire,
}

impl DisplayPrice {
    pub fn amount(&self) -> Option<f64> {
        match self {
            Self::Amount(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for DisplayPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unresolved => f.write_str("Select a service and a pet"),
            Self::Inquire => f.write_str("Inquire at the clinic"),
            Self::Amount(value) => write!(f, "${}", group_thousands(*value)),
        }
    }
}

/// `50000.0` -> `"50.000"`. Fractions are rounded to whole pesos.
fn group_thousands(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

/// Resolve the price shown for `service` applied to `pet`.
pub fn resolve_price(service: Option<&Service>, pet: Option<&Pet>) -> DisplayPrice {
    let (Some(service), Some(pet)) = (service, pet) else {
        return DisplayPrice::Unresolved;
    };

    if !service.price_by_weight {
        return DisplayPrice::Amount(service.base_price);
    }

    match tier_for_weight(&service.weight_price_rules, pet.weight) {
        Some(rule) => DisplayPrice::Amount(rule.price),
        None => DisplayPrice::Inquire,
    }
}

/// First tier whose inclusive range holds `weight`.
pub fn tier_for_weight(rules: &[WeightPriceRule], weight: f64) -> Option<&WeightPriceRule> {
    if weight.is_nan() {
        return None;
    }
    rules.iter().find(|rule| rule.contains(weight))
}

// ═══════════════════════════════════════════════════════════
// Authoring-time validation
// ═══════════════════════════════════════════════════════════

/// Rule numbers are 1-based, as shown to whoever edits the service.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    #[error("At least one weight price rule is required")]
    NoRules,

    #[error("Rule #{rule}: weights and price must be finite numbers")]
    NotFinite { rule: usize },

    #[error("Rule #{rule}: minWeight cannot be negative")]
    NegativeMinWeight { rule: usize },

    #[error("Rule #{rule}: maxWeight must be greater than minWeight")]
    EmptyRange { rule: usize },

    #[error("Rule #{rule}: price cannot be negative")]
    NegativePrice { rule: usize },

    #[error("Rule #{rule} overlaps the previous range")]
    Overlap { rule: usize },

    #[error("Rule #{rule} leaves a gap after the previous range")]
    Gap { rule: usize },

    #[error("Rule #{rule} is cheaper than the lighter band before it")]
    DecreasingPrice { rule: usize },
}

/// Check a tier set before it is saved on a service.
///
/// Rules must be listed lightest band first. Consecutive bands share their
/// boundary (`[0, 10]`, `[10, 25]`), which resolves to the lighter band.
pub fn validate_weight_rules(rules: &[WeightPriceRule]) -> Result<(), PricingError> {
    if rules.is_empty() {
        return Err(PricingError::NoRules);
    }

    for (i, rule) in rules.iter().enumerate() {
        let n = i + 1;
        if !(rule.min_weight.is_finite() && rule.max_weight.is_finite() && rule.price.is_finite()) {
            return Err(PricingError::NotFinite { rule: n });
        }
        if rule.min_weight < 0.0 {
            return Err(PricingError::NegativeMinWeight { rule: n });
        }
        if rule.max_weight <= rule.min_weight {
            return Err(PricingError::EmptyRange { rule: n });
        }
        if rule.price < 0.0 {
            return Err(PricingError::NegativePrice { rule: n });
        }
    }

    for (i, pair) in rules.windows(2).enumerate() {
        let (prev, next) = (&pair[0], &pair[1]);
        let n = i + 2;
        if next.min_weight < prev.max_weight {
            return Err(PricingError::Overlap { rule: n });
        }
        if next.min_weight > prev.max_weight {
            return Err(PricingError::Gap { rule: n });
        }
        if next.price < prev.price {
            return Err(PricingError::DecreasingPrice { rule: n });
        }
    }

    Ok(())
}
