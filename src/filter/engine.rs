//! Faceted query engine.
//!
//! One fetch of the visible snapshot, then one pass per facet over it: the
//! result set matches every selected axis, and each facet's options are
//! counted with that facet's own selection removed.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::facet::{Facet, FacetOption};
use crate::error::{AppError, AppResult};
use crate::models::{Record, Visibility};
use crate::repository::{RecordQuery, RecordStore};

/// Current selection across every axis. Empty means "All".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet {
    #[serde(default)]
    pub criteria: Option<String>,
    #[serde(default)]
    pub energy_method: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub scales: Vec<String>,
    #[serde(default)]
    pub climates: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub building_uses: Vec<String>,
    #[serde(default)]
    pub approaches: Vec<String>,
}

impl FilterSet {
    /// Selected values on an axis; empty when unconstrained.
    pub fn selected(&self, facet: Facet) -> Vec<&str> {
        match facet {
            Facet::Criteria => single(&self.criteria),
            Facet::EnergyMethod => single(&self.energy_method),
            Facet::Direction => single(&self.direction),
            Facet::Scale => multi(&self.scales),
            Facet::Climate => multi(&self.climates),
            Facet::Location => multi(&self.locations),
            Facet::BuildingUse => multi(&self.building_uses),
            Facet::Approach => multi(&self.approaches),
        }
    }

    pub fn is_constrained(&self, facet: Facet) -> bool {
        !self.selected(facet).is_empty()
    }

    pub fn is_empty(&self) -> bool {
        Facet::ALL.iter().all(|f| !self.is_constrained(*f))
    }

    /// Replace an axis's selection. Single-valued axes keep the first value.
    pub fn set_values(&mut self, facet: Facet, values: Vec<String>) {
        let first = values.first().cloned();
        match facet {
            Facet::Criteria => self.criteria = first,
            Facet::EnergyMethod => self.energy_method = first,
            Facet::Direction => self.direction = first,
            Facet::Scale => self.scales = values,
            Facet::Climate => self.climates = values,
            Facet::Location => self.locations = values,
            Facet::BuildingUse => self.building_uses = values,
            Facet::Approach => self.approaches = values,
        }
    }

    pub fn clear(&mut self, facet: Facet) {
        self.set_values(facet, Vec::new());
    }

    /// The same selection with one axis removed.
    pub fn without(&self, facet: Facet) -> FilterSet {
        let mut reduced = self.clone();
        reduced.clear(facet);
        reduced
    }

    /// Whether a record satisfies one axis. Multi-select axes are a union.
    pub fn matches_facet(&self, record: &Record, facet: Facet) -> bool {
        let selected = self.selected(facet);
        selected.is_empty() || selected.iter().any(|v| facet.matches(record, v))
    }

    pub fn matches(&self, record: &Record) -> bool {
        Facet::ALL.iter().all(|f| self.matches_facet(record, *f))
    }

    fn matches_except(&self, record: &Record, skipped: Facet) -> bool {
        Facet::ALL
            .iter()
            .filter(|f| **f != skipped)
            .all(|f| self.matches_facet(record, *f))
    }

    /// Reject values an axis can never match.
    pub fn validate(&self) -> AppResult<()> {
        for facet in Facet::ALL {
            for value in self.selected(facet) {
                if !facet.accepts(value) {
                    return Err(AppError::Validation(format!(
                        "Unknown {} value: {:?}",
                        facet.as_str(),
                        value
                    )));
                }
            }
        }
        Ok(())
    }
}

fn single(value: &Option<String>) -> Vec<&str> {
    value.as_deref().into_iter().collect()
}

fn multi(values: &[String]) -> Vec<&str> {
    values.iter().map(String::as_str).collect()
}

/// Result set plus option lists for every facet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacetedResult {
    /// Matching records with a real paragraph, by id ascending.
    pub results: Vec<Record>,
    /// Matching records including those with an empty paragraph.
    pub matched: usize,
    pub options: BTreeMap<Facet, Vec<FacetOption>>,
}

impl FacetedResult {
    pub fn options_for(&self, facet: Facet) -> &[FacetOption] {
        self.options.get(&facet).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Compute results and options over an already visible snapshot.
pub fn compute(records: &[Record], filter: &FilterSet) -> FacetedResult {
    let mut matched = 0;
    let mut results = Vec::new();
    for record in records.iter().filter(|r| filter.matches(r)) {
        matched += 1;
        if record.has_paragraph() {
            results.push(record.clone());
        }
    }
    results.sort_by_key(|r| r.id);

    let options = Facet::ALL
        .iter()
        .map(|facet| (*facet, options(records, filter, *facet)))
        .collect();

    FacetedResult {
        results,
        matched,
        options,
    }
}

/// Option list for one axis: counts of records matching every other axis.
pub fn options(records: &[Record], filter: &FilterSet, facet: Facet) -> Vec<FacetOption> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for record in records.iter().filter(|r| filter.matches_except(r, facet)) {
        if let Some(value) = facet.option_value(record) {
            *counts.entry(value).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .map(|(value, count)| FacetOption { value, count })
        .collect()
}

/// Faceted queries against a record store.
#[derive(Clone)]
pub struct FilterEngine {
    store: Arc<dyn RecordStore>,
}

impl FilterEngine {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn query(&self, filter: &FilterSet) -> AppResult<FacetedResult> {
        filter.validate()?;
        let snapshot = self
            .store
            .fetch(&RecordQuery {
                visibility: Visibility::Public,
                ..Default::default()
            })
            .await?;
        let result = compute(&snapshot, filter);
        debug!(
            "Faceted query over {} visible records matched {} ({} listed)",
            snapshot.len(),
            result.matched,
            result.results.len()
        );
        Ok(result)
    }
}
