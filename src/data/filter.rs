use std::collections::{BTreeMap, BTreeSet};

use super::model::{Dataset, Record};
use super::schema::{control_label, region_label, CONTROL_LABELS, REGION_LABELS};

// ---------------------------------------------------------------------------
// Filter predicate: inclusion sets for control type and region
// ---------------------------------------------------------------------------

/// Which control-type and region codes are included.
/// An empty set means "no restriction" for that dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPredicate {
    pub controls: BTreeSet<String>,
    pub regions: BTreeSet<String>,
}

impl FilterPredicate {
    pub fn matches(&self, record: &Record) -> bool {
        (self.controls.is_empty() || self.controls.contains(&record.control))
            && (self.regions.is_empty() || self.regions.contains(&record.region))
    }

    /// Human-readable summary, e.g. `"Public, Private nonprofit • All regions"`.
    pub fn describe(&self) -> String {
        let types = describe_group(&self.controls, "All types", control_label);
        let regions = describe_group(&self.regions, "All regions", region_label);
        format!("{types} • {regions}")
    }
}

fn describe_group(
    codes: &BTreeSet<String>,
    all: &str,
    label: fn(&str) -> Option<&'static str>,
) -> String {
    if codes.is_empty() {
        return all.to_string();
    }
    codes
        .iter()
        .map(|c| label(c).map_or_else(|| c.clone(), str::to_string))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Return positions (into `dataset.records()`) of records that pass `predicate`.
pub fn filtered_positions(dataset: &Dataset, predicate: &FilterPredicate) -> Vec<usize> {
    dataset
        .records()
        .iter()
        .enumerate()
        .filter(|(_, r)| predicate.matches(r))
        .map(|(i, _)| i)
        .collect()
}

// ---------------------------------------------------------------------------
// Checkbox state behind the filter panel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterGroup {
    Control,
    Region,
}

impl FilterGroup {
    pub fn title(self) -> &'static str {
        match self {
            FilterGroup::Control => "Institution type",
            FilterGroup::Region => "Region",
        }
    }

    fn codes(self) -> &'static [(&'static str, &'static str)] {
        match self {
            FilterGroup::Control => &CONTROL_LABELS,
            FilterGroup::Region => &REGION_LABELS,
        }
    }
}

/// Per-group checkbox state: code → checked. Starts with nothing checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterChoices {
    controls: BTreeMap<&'static str, bool>,
    regions: BTreeMap<&'static str, bool>,
}

impl Default for FilterChoices {
    fn default() -> Self {
        Self {
            controls: FilterGroup::Control.codes().iter().map(|(c, _)| (*c, false)).collect(),
            regions: FilterGroup::Region.codes().iter().map(|(c, _)| (*c, false)).collect(),
        }
    }
}

impl FilterChoices {
    fn group(&self, group: FilterGroup) -> &BTreeMap<&'static str, bool> {
        match group {
            FilterGroup::Control => &self.controls,
            FilterGroup::Region => &self.regions,
        }
    }

    fn group_mut(&mut self, group: FilterGroup) -> &mut BTreeMap<&'static str, bool> {
        match group {
            FilterGroup::Control => &mut self.controls,
            FilterGroup::Region => &mut self.regions,
        }
    }

    /// `(code, label, checked)` for every box in a group, in code order.
    pub fn entries(&self, group: FilterGroup) -> Vec<(&'static str, &'static str, bool)> {
        group
            .codes()
            .iter()
            .map(|(code, label)| (*code, *label, self.is_checked(group, code)))
            .collect()
    }

    pub fn is_checked(&self, group: FilterGroup, code: &str) -> bool {
        self.group(group).get(code).copied().unwrap_or(false)
    }

    pub fn set(&mut self, group: FilterGroup, code: &str, checked: bool) {
        if let Some(slot) = self.group_mut(group).get_mut(code) {
            *slot = checked;
        }
    }

    /// Check everything in the group, or uncheck everything if it was all checked.
    pub fn toggle_all(&mut self, group: FilterGroup) {
        let boxes = self.group_mut(group);
        let all_checked = boxes.values().all(|c| *c);
        boxes.values_mut().for_each(|c| *c = !all_checked);
    }

    /// Uncheck every box in every group.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// The predicate corresponding to the current boxes.
    pub fn predicate(&self) -> FilterPredicate {
        let checked = |boxes: &BTreeMap<&'static str, bool>| -> BTreeSet<String> {
            boxes
                .iter()
                .filter(|(_, on)| **on)
                .map(|(code, _)| code.to_string())
                .collect()
        };
        FilterPredicate {
            controls: checked(&self.controls),
            regions: checked(&self.regions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::RecordIndex;
    use crate::data::schema::IdField;

    fn record(i: usize, control: &str, region: &str) -> Record {
        Record::empty(RecordIndex(i))
            .with_field(IdField::Control, control)
            .with_field(IdField::Region, region)
    }

    fn dataset() -> Dataset {
        Dataset::from_records(vec![
            record(0, "1", "1"),
            record(1, "2", "1"),
            record(2, "1", "3"),
            record(3, "3", "5"),
        ])
    }

    fn codes(v: &[&str]) -> BTreeSet<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_predicate_keeps_everything() {
        let ds = dataset();
        assert_eq!(filtered_positions(&ds, &FilterPredicate::default()), vec![0, 1, 2, 3]);
    }

    #[test]
    fn dimensions_combine_with_and() {
        let ds = dataset();
        let p = FilterPredicate {
            controls: codes(&["1"]),
            regions: codes(&["1", "5"]),
        };
        let kept = filtered_positions(&ds, &p);
        assert_eq!(kept, vec![0]);
        for pos in kept {
            let r = &ds.records()[pos];
            assert!(p.controls.contains(&r.control));
            assert!(p.regions.contains(&r.region));
        }
    }

    #[test]
    fn toggle_all_checks_then_clears() {
        let mut choices = FilterChoices::default();
        choices.set(FilterGroup::Control, "2", true);
        choices.toggle_all(FilterGroup::Control);
        assert_eq!(choices.predicate().controls, codes(&["1", "2", "3"]));
        choices.toggle_all(FilterGroup::Control);
        assert!(choices.predicate().controls.is_empty());
        assert!(choices.predicate().regions.is_empty());
    }

    #[test]
    fn predicate_is_pure_and_reset_clears() {
        let mut choices = FilterChoices::default();
        choices.set(FilterGroup::Region, "8", true);
        choices.set(FilterGroup::Region, "99", true);
        assert_eq!(choices.predicate(), choices.predicate());
        assert_eq!(choices.predicate().regions, codes(&["8"]));
        choices.reset();
        assert_eq!(choices.predicate(), FilterPredicate::default());
    }

    #[test]
    fn describe_uses_labels() {
        assert_eq!(FilterPredicate::default().describe(), "All types • All regions");
        let p = FilterPredicate {
            controls: codes(&["1", "3"]),
            regions: codes(&["2"]),
        };
        assert_eq!(p.describe(), "Public, Private for-profit • Mid East");
    }
}
