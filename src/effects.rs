use crate::config::EffectField;
use crate::types::{EffectEntry, Record};
use crate::util::to_millions;
use std::cmp::Ordering;

/// Number of effect slots in a market sheet row.
pub const MAX_EFFECTS: usize = 4;

/// Pick the dominant effects of a record.
///
/// Only effect values that are present, numeric and nonzero qualify. They are
/// ordered by descending absolute value, with equal values kept in the order
/// of `fields`, and at most [`MAX_EFFECTS`] are returned. A record without
/// qualifying effects yields an empty list.
pub fn classify(record: &Record, fields: &[EffectField]) -> Vec<EffectEntry> {
    let mut found: Vec<(&str, f64)> = fields
        .iter()
        .filter_map(|f| match record.effect(&f.name) {
            Some(v) if v != 0.0 && v.is_finite() => Some((f.label.as_str(), v)),
            _ => None,
        })
        .collect();

    // stable: equal magnitudes keep declaration order
    found.sort_by(|a, b| b.1.abs().partial_cmp(&a.1.abs()).unwrap_or(Ordering::Equal));

    found
        .into_iter()
        .take(MAX_EFFECTS)
        .enumerate()
        .map(|(i, (label, value))| EffectEntry {
            slot: i + 1,
            label: label.to_string(),
            impact_m: to_millions(value),
            kind: String::new(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_effects;
    use std::collections::HashMap;

    fn with_effects(pairs: &[(&str, Option<f64>)]) -> Record {
        Record {
            market: "M".into(),
            contract_id: "C1".into(),
            contract_name: String::new(),
            legal_partner: String::new(),
            bupa: String::new(),
            class_of_business: String::new(),
            entry_type: "Result".into(),
            prior: None,
            current: None,
            change: None,
            effects: pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect::<HashMap<_, _>>(),
        }
    }

    #[test]
    fn zero_true_up_is_dropped() {
        let r = with_effects(&[("TUs", Some(0.0)), ("Change Prognosis", Some(-500_000.0))]);
        let out = classify(&r, &default_effects());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].slot, 1);
        assert_eq!(out[0].label, "Change in Prognosis (∆Prog)");
        assert_eq!(out[0].impact_m, -0.5);
        assert_eq!(out[0].kind, "");
    }

    #[test]
    fn larger_absolute_effect_comes_first() {
        let r = with_effects(&[("TUs", Some(1_000_000.0)), ("Change Prognosis", Some(-3_000_000.0))]);
        let out = classify(&r, &default_effects());
        let labels: Vec<&str> = out.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["Change in Prognosis (∆Prog)", "True Up (TU)"]);
        assert_eq!(out[1].slot, 2);
        assert_eq!(out[1].impact_m, 1.0);
    }

    #[test]
    fn missing_and_non_numeric_effects_are_skipped() {
        // non-numeric cells arrive as None from the loader
        let r = with_effects(&[("TUs", None)]);
        assert!(classify(&r, &default_effects()).is_empty());
        let nothing = with_effects(&[]);
        assert!(classify(&nothing, &default_effects()).is_empty());
    }

    #[test]
    fn at_most_four_sorted_by_magnitude_ties_in_field_order() {
        let fields: Vec<EffectField> = ["a", "b", "c", "d", "e", "f"]
            .iter()
            .map(|n| EffectField::new(*n, n.to_uppercase()))
            .collect();
        let r = with_effects(&[
            ("a", Some(10.0)),
            ("b", Some(-2_000_000.0)),
            ("c", Some(2_000_000.0)),
            ("d", Some(0.0)),
            ("e", Some(500_000.0)),
            ("f", Some(-700_000.0)),
        ]);
        let out = classify(&r, &fields);
        assert_eq!(out.len(), MAX_EFFECTS);
        let labels: Vec<&str> = out.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["B", "C", "F", "E"]);
        assert!(out.windows(2).all(|w| w[0].impact_m.abs() >= w[1].impact_m.abs()));
        let slots: Vec<usize> = out.iter().map(|e| e.slot).collect();
        assert_eq!(slots, vec![1, 2, 3, 4]);
    }
}
