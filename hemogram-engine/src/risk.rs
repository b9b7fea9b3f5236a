//! Overall risk aggregation.

use hemogram_core::{
    AnalysisConfig, AnalysisError, DiseaseMatch, ParameterSet, RiskAssessment, SeverityLevel,
};

use crate::catalogue::ReferenceCatalogue;

/// Exclusive upper bounds of each bucket; anything at or above the last bound
/// is critical.
const SEVERITY_BUCKETS: [(f64, SeverityLevel); 4] = [
    (0.2, SeverityLevel::Normal),
    (0.4, SeverityLevel::LowRisk),
    (0.6, SeverityLevel::MediumRisk),
    (0.8, SeverityLevel::HighRisk),
];

/// Combine the strongest disease match with the number of abnormal readings.
///
/// `overall = min(1, max_score + min(1, abnormal / divisor) × weight)`.
pub fn assess_risk(
    matches: &[DiseaseMatch],
    validated: &ParameterSet,
    catalogue: &ReferenceCatalogue,
    config: &AnalysisConfig,
) -> Result<RiskAssessment, AnalysisError> {
    if config.abnormality_divisor == 0 {
        return Err(AnalysisError::Internal(
            "abnormality divisor must be positive".to_string(),
        ));
    }

    let abnormal_count = count_abnormal(validated, catalogue);
    let abnormality_factor = (abnormal_count as f64 / config.abnormality_divisor as f64).min(1.0);
    let max_score = matches
        .iter()
        .map(|m| m.match_score)
        .fold(0.0_f64, f64::max);

    let overall_score = (max_score + abnormality_factor * config.abnormality_weight).min(1.0);
    if !(0.0..=1.0).contains(&overall_score) {
        return Err(AnalysisError::Internal(format!(
            "risk score {overall_score} outside [0, 1]"
        )));
    }

    Ok(RiskAssessment {
        overall_score,
        severity_level: severity_level_for(overall_score),
        abnormal_count,
    })
}

/// Readings outside their clinical normal range.
pub fn count_abnormal(validated: &ParameterSet, catalogue: &ReferenceCatalogue) -> usize {
    validated
        .iter()
        .filter(|obs| !catalogue.normal_range(obs.code).contains(obs.value))
        .count()
}

pub fn severity_level_for(score: f64) -> SeverityLevel {
    SEVERITY_BUCKETS
        .iter()
        .find(|(upper, _)| score < *upper)
        .map(|(_, level)| *level)
        .unwrap_or(SeverityLevel::Critical)
}
