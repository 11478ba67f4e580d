//! Portion calculation and access bookkeeping

use std::sync::Arc;

use tracing::warn;

use crate::cache::Clock;
use crate::models::{FoodRecord, PortionResult};
use crate::normalize::NormalizedInput;
use crate::store::FoodStore;
use crate::units::{convert, Unit};

/// Quantity used when the input carried none (or a non-positive one)
pub const DEFAULT_QUANTITY: f64 = 1.0;

/// Scale a record's per-unit macros to a portion
///
/// Pure: no bookkeeping. `unit` defaults to the record's own unit.
pub fn compute_portion(record: &FoodRecord, quantity: Option<f64>, unit: Option<&Unit>) -> PortionResult {
    let quantity = quantity
        .filter(|q| q.is_finite() && *q > 0.0)
        .unwrap_or(DEFAULT_QUANTITY);
    let unit = unit.cloned().unwrap_or_else(|| record.unit.clone());
    let conversion = convert(quantity, &unit, &record.unit);

    PortionResult {
        canonical_name: record.canonical_name.clone(),
        display_name: record.display_name.clone(),
        quantity,
        unit,
        macros: record.macros.scale(conversion.value),
        source: record.source.clone(),
        source_id: record.source_id.clone(),
        cache_hit: true,
        approximate: conversion.approximate,
    }
}

/// Computes portions and records each use against the food store
pub struct PortionCalculator {
    store: Arc<dyn FoodStore>,
    clock: Arc<dyn Clock>,
}

impl PortionCalculator {
    pub fn new(store: Arc<dyn FoodStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Compute the portion for parsed input and bump the record's access stats
    ///
    /// A failed access update is logged; the portion is still returned.
    pub async fn calculate(&self, record: &FoodRecord, input: &NormalizedInput) -> PortionResult {
        let portion = compute_portion(record, input.quantity, input.unit.as_ref());

        if let Err(e) = self
            .store
            .record_access(&record.canonical_name, self.clock.now())
            .await
        {
            warn!(food = %record.canonical_name, "Failed to record food access: {}", e);
        }

        portion
    }
}
