//! Hematology report text to `DiagnosticSummary` pipeline.
//!
//! Stages run in a fixed order: extraction, plausibility validation, disease
//! pattern matching, risk aggregation and recommendation synthesis. Every
//! stage reads the same [`ReferenceCatalogue`], which is built once by the
//! caller and passed by reference.

pub mod abnormality;
pub mod catalogue;
pub mod extract;
pub mod matcher;
pub mod recommend;
pub mod risk;
pub mod sanitize;
pub mod validate;

use hemogram_core::{
    AnalysisConfig, AnalysisError, AnalysisReport, DiagnosticSummary, ParameterSet,
};

pub use catalogue::{CatalogueError, ReferenceCatalogue};
pub use sanitize::sanitize_report_text;

/// Analyze cleaned report text.
///
/// Fails with [`AnalysisError::NoParametersFound`] when nothing survives
/// extraction and validation. A report that matches no disease is a success
/// with a `Normal` risk level and the fallback recommendations.
pub fn analyze_text(
    text: &str,
    catalogue: &ReferenceCatalogue,
    config: &AnalysisConfig,
) -> Result<DiagnosticSummary, AnalysisError> {
    let extracted = extract::extract_parameters(text, catalogue, config);
    analyze_parameters(extracted, catalogue, config)
}

/// Analyze readings that were obtained some other way (manual entry, a
/// structured import). They go through the same plausibility filter.
pub fn analyze_parameters(
    parameters: ParameterSet,
    catalogue: &ReferenceCatalogue,
    config: &AnalysisConfig,
) -> Result<DiagnosticSummary, AnalysisError> {
    let validated = validate::validate_parameters(parameters, catalogue);
    if validated.is_empty() {
        tracing::info!("No usable parameters in report");
        return Err(AnalysisError::NoParametersFound);
    }

    let matches = matcher::match_patterns(&validated, catalogue);
    let risk = risk::assess_risk(&matches, &validated, catalogue, config)?;
    let recommendations = recommend::synthesize_recommendations(&matches, catalogue, config);
    let findings = abnormality::profile_abnormalities(&validated, catalogue);

    tracing::info!(
        parameters = validated.len(),
        matches = matches.len(),
        abnormal = risk.abnormal_count,
        score = risk.overall_score,
        severity = ?risk.severity_level,
        "Analysis completed"
    );

    Ok(DiagnosticSummary {
        parameters: validated,
        matches,
        risk,
        recommendations,
        findings,
    })
}

/// Analyze text and wrap the result with the full normal-range table.
pub fn analyze_report(
    text: &str,
    catalogue: &ReferenceCatalogue,
    config: &AnalysisConfig,
) -> Result<AnalysisReport, AnalysisError> {
    let summary = analyze_text(text, catalogue, config)?;
    Ok(AnalysisReport::new(
        summary,
        catalogue.normal_ranges().to_vec(),
    ))
}
