//! Recommendation synthesis from matched diseases.

use hemogram_core::{
    AnalysisConfig, DiseaseMatch, PriorityLevel, Recommendation, RecommendationCategory,
    RecommendationTemplate,
};

use crate::catalogue::ReferenceCatalogue;

/// Disease label attached to the fallback recommendations.
pub const GENERAL_HEALTH: &str = "General Health";

/// Expand matched diseases into prioritized recommendations.
///
/// Diseases are visited in matcher order and templates in declared order, so
/// equal priorities keep that generation order after the stable sort. When
/// nothing was generated the catalogue's fallback set is used instead.
pub fn synthesize_recommendations(
    matches: &[DiseaseMatch],
    catalogue: &ReferenceCatalogue,
    config: &AnalysisConfig,
) -> Vec<Recommendation> {
    let mut recommendations: Vec<Recommendation> = matches
        .iter()
        .flat_map(|matched| {
            catalogue
                .templates(matched.disease_id)
                .iter()
                .map(move |template| {
                    instantiate(template, matched.match_score, &matched.disease_name)
                })
        })
        .collect();

    if recommendations.is_empty() {
        recommendations = catalogue
            .fallback_templates()
            .iter()
            .map(fallback)
            .collect();
    }

    recommendations.sort_by_key(|rec| rec.priority_level.rank());
    recommendations.truncate(config.max_recommendations);
    recommendations
}

/// Full duration above 0.8, three quarters above 0.5, half otherwise (floored).
pub fn scaled_duration(base_weeks: u32, score: f64) -> u32 {
    if score > 0.8 {
        base_weeks
    } else if score > 0.5 {
        base_weeks * 3 / 4
    } else {
        base_weeks / 2
    }
}

pub fn priority_for(category: RecommendationCategory, score: f64) -> PriorityLevel {
    if category == RecommendationCategory::Medical || score > 0.8 {
        PriorityLevel::High
    } else if category == RecommendationCategory::Diet || score > 0.5 {
        PriorityLevel::Medium
    } else {
        PriorityLevel::Low
    }
}

fn instantiate(template: &RecommendationTemplate, score: f64, disease: &str) -> Recommendation {
    Recommendation {
        category: template.category,
        text: template.text.clone(),
        rationale: template.rationale.clone(),
        purpose: template.purpose.clone(),
        tips: template.tips.clone(),
        duration_weeks: scaled_duration(template.base_duration_weeks, score),
        priority_level: priority_for(template.category, score),
        related_disease: disease.to_string(),
    }
}

fn fallback(template: &RecommendationTemplate) -> Recommendation {
    Recommendation {
        category: template.category,
        text: template.text.clone(),
        rationale: template.rationale.clone(),
        purpose: template.purpose.clone(),
        tips: template.tips.clone(),
        duration_weeks: template.base_duration_weeks,
        priority_level: PriorityLevel::Low,
        related_disease: GENERAL_HEALTH.to_string(),
    }
}
