//! Rule-based disease pattern matching.

use hemogram_core::{
    ConfidenceLevel, DiseaseId, DiseaseMatch, DiseasePattern, Direction, ParameterSet, Severity,
};

use crate::catalogue::ReferenceCatalogue;

/// Score every registered pattern against the validated readings.
///
/// Patterns are independent, so several may match the same report. Zero
/// scores are left out. The result is ordered by score, highest first, with
/// ties kept in registry order.
pub fn match_patterns(validated: &ParameterSet, catalogue: &ReferenceCatalogue) -> Vec<DiseaseMatch> {
    let mut matches: Vec<DiseaseMatch> = catalogue
        .patterns()
        .filter_map(|(id, pattern)| {
            let score = score_pattern(pattern, validated, catalogue);
            (score > 0.0).then(|| build_match(id, pattern, score))
        })
        .collect();

    // `sort_by` is stable, which keeps registry order among equal scores.
    matches.sort_by(|a, b| b.match_score.total_cmp(&a.match_score));

    tracing::debug!(
        matched = matches.len(),
        registered = catalogue.pattern_count(),
        "Disease patterns scored"
    );
    matches
}

/// `weight × agreeing / parameters.len()`.
///
/// Absent codes and codes without an expectation count only toward the
/// denominator. A pattern needs at least one agreeing low/high reading to
/// score at all; agreement on expected-normal codes alone is not evidence.
pub fn score_pattern(
    pattern: &DiseasePattern,
    validated: &ParameterSet,
    catalogue: &ReferenceCatalogue,
) -> f64 {
    let total = pattern.parameters.len();
    if total == 0 {
        return 0.0;
    }

    let mut agreeing = 0usize;
    let mut deviation_seen = false;

    for &code in &pattern.parameters {
        let (Some(&expected), Some(value)) = (pattern.expected.get(&code), validated.get(code))
        else {
            continue;
        };

        if catalogue.normal_range(code).classify(value) == expected {
            agreeing += 1;
            deviation_seen |= expected != Direction::Normal;
        }
    }

    if !deviation_seen {
        return 0.0;
    }

    pattern.weight * (agreeing as f64 / total as f64)
}

pub fn confidence_for(score: f64) -> ConfidenceLevel {
    if score > 0.8 {
        ConfidenceLevel::High
    } else if score > 0.6 {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    }
}

/// Display severity; thresholds differ from the confidence buckets.
pub fn severity_for(score: f64) -> Severity {
    if score > 0.8 {
        Severity::High
    } else if score > 0.5 {
        Severity::Moderate
    } else {
        Severity::Mild
    }
}

fn build_match(id: DiseaseId, pattern: &DiseasePattern, score: f64) -> DiseaseMatch {
    DiseaseMatch {
        disease_id: id,
        disease_name: pattern.name.clone(),
        match_score: score,
        confidence_level: confidence_for(score),
        severity: severity_for(score),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hemogram_core::ParameterCode;

    fn builtin() -> ReferenceCatalogue {
        ReferenceCatalogue::builtin().unwrap()
    }

    fn set(values: &[(ParameterCode, f64)]) -> ParameterSet {
        values.iter().copied().collect()
    }

    fn normal_readings(catalogue: &ReferenceCatalogue) -> ParameterSet {
        catalogue
            .normal_ranges()
            .iter()
            .map(|range| (range.code, (range.min + range.max) / 2.0))
            .collect()
    }

    #[test]
    fn partial_anemia_panel_scores_fraction_of_weight() {
        let catalogue = builtin();
        let validated = set(&[(ParameterCode::Hgb, 9.5), (ParameterCode::Mcv, 75.0)]);

        let matches = match_patterns(&validated, &catalogue);
        let anemia = matches
            .iter()
            .find(|m| m.disease_name == "Iron Deficiency Anemia")
            .unwrap();

        assert!((anemia.match_score - 0.9 * 2.0 / 6.0).abs() < 1e-12);
        assert_eq!(anemia.confidence_level, ConfidenceLevel::Low);
        assert_eq!(anemia.severity, Severity::Mild);
    }

    #[test]
    fn results_are_sorted_by_score() {
        let catalogue = builtin();
        let validated = set(&[(ParameterCode::Hgb, 9.5), (ParameterCode::Mcv, 75.0)]);

        let matches = match_patterns(&validated, &catalogue);

        assert!(matches.len() > 1);
        assert!(matches
            .windows(2)
            .all(|pair| pair[0].match_score >= pair[1].match_score));
        assert!(matches.iter().all(|m| m.match_score > 0.0));
    }

    #[test]
    fn ties_keep_registry_order() {
        let mut value: serde_json::Value =
            serde_json::from_str(include_str!("../data/reference_catalogue.json")).unwrap();
        let mut twin = value["disease_patterns"][2].clone();
        twin["name"] = serde_json::json!("Platelet Consumption");
        value["disease_patterns"].as_array_mut().unwrap().push(twin);
        let catalogue = ReferenceCatalogue::from_json_str(&value.to_string()).unwrap();
        let validated = set(&[(ParameterCode::Plt, 90.0), (ParameterCode::Mpv, 12.5)]);

        let matches = match_patterns(&validated, &catalogue);

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].disease_name, "Thrombocytopenia");
        assert_eq!(matches[1].disease_name, "Platelet Consumption");
        assert_eq!(matches[0].match_score, matches[1].match_score);
        assert!(matches[0].disease_id < matches[1].disease_id);
    }

    #[test]
    fn overlapping_patterns_are_reported_together() {
        let catalogue = builtin();
        let validated = set(&[
            (ParameterCode::Wbc, 15.0),
            (ParameterCode::Neut, 11.0),
            (ParameterCode::Mono, 0.5),
            (ParameterCode::Lymph, 2.0),
        ]);

        let names: Vec<_> = match_patterns(&validated, &catalogue)
            .into_iter()
            .map(|m| m.disease_name)
            .collect();

        assert_eq!(
            names,
            vec![
                "Neutrophilia",
                "Infection",
                "Inflammation",
                "Lymphocytosis",
                "Leukocytosis"
            ]
        );
    }

    #[test]
    fn all_normal_panel_matches_nothing() {
        let catalogue = builtin();
        let validated = normal_readings(&catalogue);

        assert!(match_patterns(&validated, &catalogue).is_empty());
    }

    #[test]
    fn absent_codes_never_count() {
        let catalogue = builtin();
        let (_, pattern) = catalogue.patterns().next().unwrap();

        assert_eq!(score_pattern(pattern, &ParameterSet::new(), &catalogue), 0.0);
    }

    #[test]
    fn heavier_weight_never_lowers_score() {
        let catalogue = builtin();
        let validated = set(&[(ParameterCode::Plt, 90.0), (ParameterCode::Mpv, 12.5)]);
        let (_, pattern) = catalogue
            .patterns()
            .find(|(_, p)| p.name == "Thrombocytopenia")
            .unwrap();

        let mut previous = 0.0;
        for weight in [0.1, 0.25, 0.5, 0.75, 0.95, 1.0] {
            let mut adjusted = pattern.clone();
            adjusted.weight = weight;
            let score = score_pattern(&adjusted, &validated, &catalogue);
            assert!(score >= previous);
            previous = score;
        }
        assert!((previous - 0.5).abs() < 1e-12);
    }

    #[test]
    fn bucket_thresholds_are_exclusive() {
        assert_eq!(confidence_for(0.8), ConfidenceLevel::Medium);
        assert_eq!(confidence_for(0.81), ConfidenceLevel::High);
        assert_eq!(confidence_for(0.6), ConfidenceLevel::Low);
        assert_eq!(severity_for(0.8), Severity::Moderate);
        assert_eq!(severity_for(0.5), Severity::Mild);
        assert_eq!(severity_for(0.51), Severity::Moderate);
    }
}
