//! Plausibility filtering of extracted readings.

use hemogram_core::ParameterSet;

use crate::catalogue::ReferenceCatalogue;

/// Drop readings that fall outside their plausibility band.
///
/// Suspect values are removed, never clamped; codes without a band pass
/// through unchanged. Nothing is ever added.
pub fn validate_parameters(extracted: ParameterSet, catalogue: &ReferenceCatalogue) -> ParameterSet {
    let mut validated = extracted;
    let before = validated.len();

    validated.retain(|observation| {
        if !observation.value.is_finite() {
            tracing::warn!(code = %observation.code, "Dropping non-finite reading");
            return false;
        }

        match catalogue.plausibility(observation.code) {
            Some(band) if !band.admits(observation.value) => {
                tracing::warn!(
                    code = %observation.code,
                    value = observation.value,
                    min = band.min,
                    max = band.max,
                    "Dropping reading outside plausibility band"
                );
                false
            }
            _ => true,
        }
    });

    if validated.len() < before {
        tracing::debug!(
            kept = validated.len(),
            dropped = before - validated.len(),
            "Plausibility filter applied"
        );
    }
    validated
}

#[cfg(test)]
mod tests {
    use super::*;
    use hemogram_core::ParameterCode;

    #[test]
    fn drops_values_outside_band() {
        let catalogue = ReferenceCatalogue::builtin().unwrap();
        let extracted: ParameterSet = [
            (ParameterCode::Hgb, 9.5),
            (ParameterCode::Mcv, 240.0),
            (ParameterCode::Wbc, 0.5),
        ]
        .into_iter()
        .collect();

        let validated = validate_parameters(extracted, &catalogue);

        assert_eq!(validated.len(), 1);
        assert_eq!(validated.get(ParameterCode::Hgb), Some(9.5));
        assert!(!validated.contains(ParameterCode::Mcv));
        assert!(!validated.contains(ParameterCode::Wbc));
    }

    #[test]
    fn band_edges_are_kept() {
        let catalogue = ReferenceCatalogue::builtin().unwrap();
        let extracted: ParameterSet = [(ParameterCode::Hgb, 5.0), (ParameterCode::Plt, 600.0)]
            .into_iter()
            .collect();

        let validated = validate_parameters(extracted.clone(), &catalogue);

        assert_eq!(validated, extracted);
    }

    #[test]
    fn codes_without_band_pass_through() {
        let mut value: serde_json::Value =
            serde_json::from_str(include_str!("../data/reference_catalogue.json")).unwrap();
        value["parameters"][4]
            .as_object_mut()
            .unwrap()
            .remove("plausible");
        let catalogue = ReferenceCatalogue::from_json_str(&value.to_string()).unwrap();
        let extracted: ParameterSet = [(ParameterCode::Mcv, 240.0)].into_iter().collect();

        let validated = validate_parameters(extracted, &catalogue);

        assert_eq!(validated.get(ParameterCode::Mcv), Some(240.0));
    }

    #[test]
    fn non_finite_values_are_dropped() {
        let catalogue = ReferenceCatalogue::builtin().unwrap();
        let extracted: ParameterSet = [(ParameterCode::Hgb, f64::NAN)].into_iter().collect();

        assert!(validate_parameters(extracted, &catalogue).is_empty());
    }
}
