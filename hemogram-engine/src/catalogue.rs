//! Reference catalogue: clinical ranges, plausibility bands, alias patterns,
//! the disease-pattern registry and recommendation templates.
//!
//! The catalogue is parsed and checked once, then shared read-only by every
//! pipeline stage.

use std::collections::HashSet;

use hemogram_core::{
    AnalysisError, DiseaseId, DiseasePattern, NormalRange, ParameterCode, PlausibilityRange,
    RecommendationTemplate,
};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;

const BUILTIN_CATALOGUE: &str = include_str!("../data/reference_catalogue.json");

/// Key of the recommendation set used when no disease produced advice.
pub const FALLBACK_KEY: &str = "Normal";

/// Problems found while loading a catalogue.
#[derive(Debug, thiserror::Error)]
pub enum CatalogueError {
    #[error("catalogue JSON could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("parameter {0} is declared more than once")]
    DuplicateParameter(ParameterCode),
    #[error("parameter {0} has no entry")]
    MissingParameter(ParameterCode),
    #[error("parameter {0} declares no aliases")]
    NoAliases(ParameterCode),
    #[error("parameter {code} has an inconsistent {kind} range")]
    InvalidRange {
        code: ParameterCode,
        kind: &'static str,
    },
    #[error("parameter {code} has an invalid alias `{pattern}`: {source}")]
    InvalidAlias {
        code: ParameterCode,
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("disease pattern `{0}` is declared more than once")]
    DuplicatePattern(String),
    #[error("disease pattern `{0}` has no parameters")]
    EmptyPattern(String),
    #[error("disease pattern `{name}` has weight {weight} outside (0, 1]")]
    InvalidWeight { name: String, weight: f64 },
    #[error("disease pattern `{name}` expects {code}, which is not one of its parameters")]
    ExpectationOutsidePattern { name: String, code: ParameterCode },
    #[error("recommendations reference unknown disease `{0}`")]
    UnknownDisease(String),
    #[error("recommendation `{text}` for `{disease}` has a zero base duration")]
    ZeroDuration { disease: String, text: String },
    #[error("catalogue has no `Normal` fallback recommendations")]
    MissingFallback,
}

impl From<CatalogueError> for AnalysisError {
    fn from(err: CatalogueError) -> Self {
        AnalysisError::Catalogue(err.to_string())
    }
}

#[derive(Deserialize)]
struct RawCatalogue {
    parameters: Vec<RawParameter>,
    disease_patterns: Vec<DiseasePattern>,
    #[serde(default)]
    recommendations: Vec<RawRecommendationSet>,
}

#[derive(Deserialize)]
struct RawParameter {
    code: ParameterCode,
    aliases: Vec<String>,
    normal: RawNormalRange,
    #[serde(default)]
    plausible: Option<RawBounds>,
}

#[derive(Deserialize)]
struct RawNormalRange {
    min: f64,
    max: f64,
    critical_low: f64,
    critical_high: f64,
    unit: String,
}

#[derive(Deserialize)]
struct RawBounds {
    min: f64,
    max: f64,
}

#[derive(Deserialize)]
struct RawRecommendationSet {
    disease: String,
    templates: Vec<RecommendationTemplate>,
}

struct ParameterEntry {
    normal: NormalRange,
    plausible: Option<PlausibilityRange>,
    aliases: Vec<Regex>,
}

/// Immutable lookup tables indexed by [`ParameterCode`] and [`DiseaseId`].
#[derive(Debug, Clone)]
pub struct ReferenceCatalogue {
    normal_ranges: Vec<NormalRange>,
    plausibility: Vec<Option<PlausibilityRange>>,
    aliases: Vec<Vec<Regex>>,
    patterns: Vec<DiseasePattern>,
    templates: Vec<Vec<RecommendationTemplate>>,
    fallback: Vec<RecommendationTemplate>,
}

impl ReferenceCatalogue {
    /// Load the catalogue shipped with the crate.
    pub fn builtin() -> Result<Self, CatalogueError> {
        Self::from_json_str(BUILTIN_CATALOGUE)
    }

    /// Parse and check a catalogue from its JSON form.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogueError> {
        let raw: RawCatalogue = serde_json::from_str(json)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawCatalogue) -> Result<Self, CatalogueError> {
        let mut entries: Vec<Option<ParameterEntry>> =
            (0..ParameterCode::COUNT).map(|_| None).collect();

        for parameter in raw.parameters {
            let code = parameter.code;
            if entries[code.index()].is_some() {
                return Err(CatalogueError::DuplicateParameter(code));
            }
            entries[code.index()] = Some(build_parameter(parameter)?);
        }

        let mut normal_ranges = Vec::with_capacity(ParameterCode::COUNT);
        let mut plausibility = Vec::with_capacity(ParameterCode::COUNT);
        let mut aliases = Vec::with_capacity(ParameterCode::COUNT);
        for (code, entry) in ParameterCode::ALL.into_iter().zip(entries) {
            let entry = entry.ok_or(CatalogueError::MissingParameter(code))?;
            normal_ranges.push(entry.normal);
            plausibility.push(entry.plausible);
            aliases.push(entry.aliases);
        }

        let mut seen_names = HashSet::new();
        for pattern in &raw.disease_patterns {
            check_pattern(pattern)?;
            if !seen_names.insert(pattern.name.as_str()) {
                return Err(CatalogueError::DuplicatePattern(pattern.name.clone()));
            }
        }

        let mut templates = vec![Vec::new(); raw.disease_patterns.len()];
        let mut fallback = None;
        for set in raw.recommendations {
            if let Some(template) = set
                .templates
                .iter()
                .find(|template| template.base_duration_weeks == 0)
            {
                return Err(CatalogueError::ZeroDuration {
                    disease: set.disease.clone(),
                    text: template.text.clone(),
                });
            }

            if set.disease == FALLBACK_KEY {
                fallback = Some(set.templates);
                continue;
            }

            let position = raw
                .disease_patterns
                .iter()
                .position(|pattern| pattern.name == set.disease)
                .ok_or_else(|| CatalogueError::UnknownDisease(set.disease.clone()))?;
            templates[position].extend(set.templates);
        }

        Ok(Self {
            normal_ranges,
            plausibility,
            aliases,
            patterns: raw.disease_patterns,
            templates,
            fallback: fallback.ok_or(CatalogueError::MissingFallback)?,
        })
    }

    pub fn normal_range(&self, code: ParameterCode) -> &NormalRange {
        &self.normal_ranges[code.index()]
    }

    /// Full normal-range table in catalogue order.
    pub fn normal_ranges(&self) -> &[NormalRange] {
        &self.normal_ranges
    }

    pub fn plausibility(&self, code: ParameterCode) -> Option<&PlausibilityRange> {
        self.plausibility[code.index()].as_ref()
    }

    /// Case-insensitive alias patterns in declared order.
    pub fn aliases(&self, code: ParameterCode) -> &[Regex] {
        &self.aliases[code.index()]
    }

    /// Registered disease patterns in declaration order.
    pub fn patterns(&self) -> impl Iterator<Item = (DiseaseId, &DiseasePattern)> + '_ {
        self.patterns
            .iter()
            .enumerate()
            .map(|(index, pattern)| (DiseaseId(index), pattern))
    }

    pub fn pattern(&self, id: DiseaseId) -> Option<&DiseasePattern> {
        self.patterns.get(id.0)
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Recommendation templates for a disease; empty when none are registered.
    pub fn templates(&self, id: DiseaseId) -> &[RecommendationTemplate] {
        self.templates.get(id.0).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fallback_templates(&self) -> &[RecommendationTemplate] {
        &self.fallback
    }
}

fn build_parameter(parameter: RawParameter) -> Result<ParameterEntry, CatalogueError> {
    let code = parameter.code;
    let normal = parameter.normal;

    let ordered = normal.critical_low <= normal.min
        && normal.min <= normal.max
        && normal.max <= normal.critical_high;
    if !ordered {
        return Err(CatalogueError::InvalidRange {
            code,
            kind: "normal",
        });
    }

    let plausible = match parameter.plausible {
        Some(bounds) if bounds.min <= bounds.max => Some(PlausibilityRange {
            code,
            min: bounds.min,
            max: bounds.max,
        }),
        Some(_) => {
            return Err(CatalogueError::InvalidRange {
                code,
                kind: "plausibility",
            })
        }
        None => None,
    };

    if parameter.aliases.is_empty() {
        return Err(CatalogueError::NoAliases(code));
    }

    let aliases = parameter
        .aliases
        .into_iter()
        .map(|pattern| {
            RegexBuilder::new(&pattern)
                .case_insensitive(true)
                .build()
                .map_err(|source| CatalogueError::InvalidAlias {
                    code,
                    pattern,
                    source,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ParameterEntry {
        normal: NormalRange {
            code,
            min: normal.min,
            max: normal.max,
            critical_low: normal.critical_low,
            critical_high: normal.critical_high,
            unit: normal.unit,
        },
        plausible,
        aliases,
    })
}

fn check_pattern(pattern: &DiseasePattern) -> Result<(), CatalogueError> {
    if pattern.parameters.is_empty() {
        return Err(CatalogueError::EmptyPattern(pattern.name.clone()));
    }

    if !(pattern.weight > 0.0 && pattern.weight <= 1.0) {
        return Err(CatalogueError::InvalidWeight {
            name: pattern.name.clone(),
            weight: pattern.weight,
        });
    }

    if let Some(&code) = pattern
        .expected
        .keys()
        .find(|code| !pattern.parameters.contains(code))
    {
        return Err(CatalogueError::ExpectationOutsidePattern {
            name: pattern.name.clone(),
            code,
        });
    }

    Ok(())
}
