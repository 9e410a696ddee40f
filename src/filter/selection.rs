//! The current filter selection and its reconciliation with fresh options.

use super::engine::{FacetedResult, FilterSet};
use super::facet::Facet;

/// Owns the selection for one browsing session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionController {
    filter: FilterSet,
    /// The axis the user touched last; reconcile keeps it as chosen.
    last_changed: Option<Facet>,
}

impl SelectionController {
    pub fn new(filter: FilterSet) -> Self {
        Self {
            filter,
            last_changed: None,
        }
    }

    pub fn filter(&self) -> &FilterSet {
        &self.filter
    }

    /// Select a value. Single-valued axes replace, multi-select axes add.
    pub fn set(&mut self, facet: Facet, value: &str) {
        let mut values: Vec<String> = if facet.is_multi() {
            self.filter
                .selected(facet)
                .into_iter()
                .map(str::to_string)
                .collect()
        } else {
            Vec::new()
        };
        if !values.iter().any(|v| facet.same_value(v, value)) {
            values.push(value.to_string());
        }
        self.filter.set_values(facet, values);
        self.last_changed = Some(facet);
    }

    /// Deselect one value from an axis.
    pub fn remove(&mut self, facet: Facet, value: &str) {
        let values = self
            .filter
            .selected(facet)
            .into_iter()
            .filter(|v| !facet.same_value(v, value))
            .map(str::to_string)
            .collect();
        self.filter.set_values(facet, values);
        self.last_changed = Some(facet);
    }

    /// Back to "All" on this axis.
    pub fn clear(&mut self, facet: Facet) {
        self.filter.clear(facet);
        self.last_changed = Some(facet);
    }

    /// Drop selected values missing from the fresh option lists.
    ///
    /// The axis changed last is left alone. Returns the facets that changed;
    /// an axis with nothing left falls back to "All".
    pub fn reconcile(&mut self, result: &FacetedResult) -> Vec<Facet> {
        let mut changed = Vec::new();
        for facet in Facet::ALL {
            if self.last_changed == Some(facet) {
                continue;
            }
            let selected = self.filter.selected(facet);
            if selected.is_empty() {
                continue;
            }
            let options = result.options_for(facet);
            let kept: Vec<String> = selected
                .iter()
                .filter(|v| options.iter().any(|o| facet.same_value(&o.value, v)))
                .map(|v| v.to_string())
                .collect();
            if kept.len() != selected.len() {
                self.filter.set_values(facet, kept);
                changed.push(facet);
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::engine::compute;
    use crate::models::{NewRecord, Record};

    fn record(id: i64, energy: &str, climate: &str) -> Record {
        NewRecord {
            criteria: "Density".to_string(),
            energy_method: energy.to_string(),
            direction: "Increase".to_string(),
            climate: Some(climate.to_string()),
            paragraph: Some("p".to_string()),
            ..Default::default()
        }
        .into_record(id, String::new())
    }

    #[test]
    fn test_set_and_remove() {
        let mut sel = SelectionController::default();
        sel.set(Facet::Climate, "Cfa");
        sel.set(Facet::Climate, "Cfb");
        sel.set(Facet::Climate, "cfa");
        assert_eq!(sel.filter().climates, vec!["Cfa", "Cfb"]);

        sel.set(Facet::Direction, "Increase");
        sel.set(Facet::Direction, "Decrease");
        assert_eq!(sel.filter().direction.as_deref(), Some("Decrease"));

        sel.remove(Facet::Climate, "Cfa");
        assert_eq!(sel.filter().climates, vec!["Cfb"]);
        sel.clear(Facet::Climate);
        assert!(sel.filter().climates.is_empty());
    }

    #[test]
    fn test_reconcile_falls_back_to_all() {
        let records = vec![record(1, "EUI", "Cfa"), record(2, "Heating", "Dfb")];
        let mut sel = SelectionController::default();
        sel.set(Facet::Climate, "Dfb");
        sel.set(Facet::EnergyMethod, "Heating");

        // Switching energy output hides Dfb from the climate options.
        sel.set(Facet::EnergyMethod, "EUI");
        let result = compute(&records, sel.filter());
        let changed = sel.reconcile(&result);

        assert_eq!(changed, vec![Facet::Climate]);
        assert!(sel.filter().climates.is_empty());
        assert_eq!(sel.filter().energy_method.as_deref(), Some("EUI"));

        let refreshed = compute(&records, sel.filter());
        assert_eq!(refreshed.results.len(), 1);
        assert!(sel.reconcile(&refreshed).is_empty());
    }
}
