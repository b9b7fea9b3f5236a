//! Per-parameter abnormality profile shown next to the disease matches.

use hemogram_core::{AbnormalFinding, Direction, NormalRange, ParameterSet, Severity};

use crate::catalogue::ReferenceCatalogue;

/// Describe every reading that lies outside its normal range.
///
/// Findings are ordered by grade, most severe first; equal grades keep
/// catalogue order.
pub fn profile_abnormalities(
    validated: &ParameterSet,
    catalogue: &ReferenceCatalogue,
) -> Vec<AbnormalFinding> {
    let mut findings: Vec<AbnormalFinding> = validated
        .iter()
        .filter_map(|obs| {
            let range = catalogue.normal_range(obs.code);
            let status = range.classify(obs.value);
            if status == Direction::Normal {
                return None;
            }

            Some(AbnormalFinding {
                code: obs.code,
                value: obs.value,
                status,
                grade: grade_for(relative_deviation(range, obs.value, status)),
                critical: is_critical(range, obs.value, status),
                unit: range.unit.clone(),
            })
        })
        .collect();

    findings.sort_by(|a, b| b.grade.cmp(&a.grade));
    findings
}

fn relative_deviation(range: &NormalRange, value: f64, status: Direction) -> f64 {
    let (bound, distance) = match status {
        Direction::Low => (range.min, range.min - value),
        Direction::High => (range.max, value - range.max),
        Direction::Normal => return 0.0,
    };

    if bound > 0.0 {
        distance / bound
    } else {
        f64::INFINITY
    }
}

fn grade_for(deviation: f64) -> Severity {
    if deviation > 0.5 {
        Severity::High
    } else if deviation > 0.2 {
        Severity::Moderate
    } else {
        Severity::Mild
    }
}

fn is_critical(range: &NormalRange, value: f64, status: Direction) -> bool {
    match status {
        Direction::Low => value <= range.critical_low,
        Direction::High => value >= range.critical_high,
        Direction::Normal => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hemogram_core::ParameterCode;

    #[test]
    fn grades_by_relative_deviation() {
        let catalogue = ReferenceCatalogue::builtin().unwrap();
        let validated: ParameterSet = [
            (ParameterCode::Wbc, 7.0),
            (ParameterCode::Hgb, 11.0),
            (ParameterCode::Mcv, 60.0),
            (ParameterCode::Plt, 650.0),
        ]
        .into_iter()
        .collect();

        let findings = profile_abnormalities(&validated, &catalogue);
        let codes: Vec<_> = findings.iter().map(|f| f.code).collect();

        // PLT deviates 62.5%, MCV 25%, HGB about 8%.
        assert_eq!(
            codes,
            vec![ParameterCode::Plt, ParameterCode::Mcv, ParameterCode::Hgb]
        );
        assert_eq!(findings[0].grade, Severity::High);
        assert_eq!(findings[0].status, Direction::High);
        assert_eq!(findings[1].grade, Severity::Moderate);
        assert_eq!(findings[2].grade, Severity::Mild);
        assert_eq!(findings[2].unit, "g/dL");
    }

    #[test]
    fn flags_critical_readings() {
        let catalogue = ReferenceCatalogue::builtin().unwrap();
        let validated: ParameterSet = [
            (ParameterCode::Hgb, 7.5),
            (ParameterCode::Wbc, 3.0),
            (ParameterCode::Plt, 600.0),
        ]
        .into_iter()
        .collect();

        let findings = profile_abnormalities(&validated, &catalogue);
        let critical = |code: ParameterCode| {
            findings
                .iter()
                .find(|f| f.code == code)
                .unwrap()
                .critical
        };

        assert!(critical(ParameterCode::Hgb));
        assert!(!critical(ParameterCode::Wbc));
        assert!(critical(ParameterCode::Plt));
    }

    #[test]
    fn zero_upper_bound_counts_as_high_grade() {
        let catalogue = ReferenceCatalogue::builtin().unwrap();
        let validated: ParameterSet = [(ParameterCode::Nrbcs, 0.5)].into_iter().collect();

        let findings = profile_abnormalities(&validated, &catalogue);

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].grade, Severity::High);
        assert!(!findings[0].critical);
    }
}
