//! Bridge WASM <-> JavaScript cho bộ phân tích công thức máu.

use std::sync::OnceLock;

use hemogram_core::{AnalysisConfig, AnalysisError, ParameterSet};
use hemogram_engine::{sanitize_report_text, ReferenceCatalogue};
use serde::Deserialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

static CATALOGUE: OnceLock<Result<ReferenceCatalogue, String>> = OnceLock::new();

#[derive(Deserialize)]
struct JsAnalysisConfig {
    #[serde(default)]
    min_text_length: Option<usize>,
    #[serde(default)]
    abnormality_divisor: Option<usize>,
    #[serde(default)]
    abnormality_weight: Option<f64>,
    #[serde(default)]
    max_recommendations: Option<usize>,
}

impl From<JsAnalysisConfig> for AnalysisConfig {
    fn from(cfg: JsAnalysisConfig) -> Self {
        let mut base = AnalysisConfig::default();
        if let Some(length) = cfg.min_text_length {
            base.min_text_length = length;
        }
        if let Some(divisor) = cfg.abnormality_divisor {
            base.abnormality_divisor = divisor;
        }
        if let Some(weight) = cfg.abnormality_weight {
            base.abnormality_weight = weight;
        }
        if let Some(limit) = cfg.max_recommendations {
            base.max_recommendations = limit;
        }
        base
    }
}

/// Phân tích văn bản phiếu xét nghiệm (đã OCR) và trả về báo cáo JSON.
#[wasm_bindgen]
pub fn analyze_report(text: &str, config: Option<JsValue>) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let cfg = read_config(config)?;
    let catalogue = builtin_catalogue()?;

    let cleaned = sanitize_report_text(text);
    let report = hemogram_engine::analyze_report(&cleaned, catalogue, &cfg)
        .map_err(|err| JsValue::from_str(&format_analysis_error(err)))?;

    to_value(&report).map_err(|err| JsValue::from_str(&format!("Không serialize báo cáo: {err}")))
}

/// Phân tích bộ chỉ số nhập tay, dạng `{ "HGB": 9.5, "MCV": 75 }`.
#[wasm_bindgen]
pub fn analyze_parameters(parameters: JsValue, config: Option<JsValue>) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let parameters: ParameterSet = from_value(parameters)
        .map_err(|err| JsValue::from_str(&format!("Không đọc được bộ chỉ số: {err}")))?;
    let cfg = read_config(config)?;
    let catalogue = builtin_catalogue()?;

    let summary = hemogram_engine::analyze_parameters(parameters, catalogue, &cfg)
        .map_err(|err| JsValue::from_str(&format_analysis_error(err)))?;

    to_value(&summary).map_err(|err| JsValue::from_str(&format!("Không serialize kết quả: {err}")))
}

fn read_config(config: Option<JsValue>) -> Result<AnalysisConfig, JsValue> {
    match config {
        Some(js_cfg) => {
            let cfg: JsAnalysisConfig = from_value(js_cfg)
                .map_err(|err| JsValue::from_str(&format!("Không đọc được config: {err}")))?;
            Ok(AnalysisConfig::from(cfg))
        }
        None => Ok(AnalysisConfig::default()),
    }
}

fn builtin_catalogue() -> Result<&'static ReferenceCatalogue, JsValue> {
    CATALOGUE
        .get_or_init(|| ReferenceCatalogue::builtin().map_err(|err| err.to_string()))
        .as_ref()
        .map_err(|err| JsValue::from_str(&format!("Danh mục tham chiếu lỗi: {err}")))
}

fn format_analysis_error(err: AnalysisError) -> String {
    format!("Analysis error: {err}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let cfg: JsAnalysisConfig = serde_json::from_str(r#"{ "max_recommendations": 3 }"#).unwrap();

        let merged = AnalysisConfig::from(cfg);

        assert_eq!(merged.max_recommendations, 3);
        assert_eq!(merged.min_text_length, AnalysisConfig::default().min_text_length);
        assert_eq!(merged.abnormality_divisor, 10);
    }

    #[test]
    fn builtin_catalogue_is_built_once() {
        let first = builtin_catalogue().ok().unwrap();
        let second = builtin_catalogue().ok().unwrap();
        assert!(std::ptr::eq(first, second));
    }
}
