//! Mô hình dữ liệu lõi cho phân tích phiếu xét nghiệm huyết học.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cấu hình các ngưỡng của pipeline phân tích.
///
/// Trường bị bỏ trống khi đọc từ file sẽ lấy giá trị mặc định.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Độ dài tối thiểu (ký tự, sau khi trim) để bắt đầu quét văn bản.
    pub min_text_length: usize,
    /// Số chỉ số bất thường ứng với hệ số bất thường tối đa.
    pub abnormality_divisor: usize,
    /// Trọng số cộng thêm của hệ số bất thường vào điểm rủi ro.
    pub abnormality_weight: f64,
    /// Số khuyến nghị tối đa trả về.
    pub max_recommendations: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_text_length: 10,
            abnormality_divisor: 10,
            abnormality_weight: 0.2,
            max_recommendations: 8,
        }
    }
}

/// Mã chỉ số huyết học, theo đúng thứ tự của danh mục.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParameterCode {
    Wbc,
    Rbc,
    Hgb,
    Hct,
    Mcv,
    Mch,
    Mchc,
    Plt,
    RdwSd,
    RdwCv,
    Pdw,
    Mpv,
    PLcr,
    Pct,
    Neut,
    Lymph,
    Mono,
    Eo,
    Baso,
    Ig,
    Nrbcs,
    Reticulocytes,
    Irf,
    Lfr,
    Mfr,
    Hfr,
}

impl ParameterCode {
    pub const COUNT: usize = 26;

    /// Toàn bộ mã theo thứ tự danh mục.
    pub const ALL: [ParameterCode; Self::COUNT] = [
        Self::Wbc,
        Self::Rbc,
        Self::Hgb,
        Self::Hct,
        Self::Mcv,
        Self::Mch,
        Self::Mchc,
        Self::Plt,
        Self::RdwSd,
        Self::RdwCv,
        Self::Pdw,
        Self::Mpv,
        Self::PLcr,
        Self::Pct,
        Self::Neut,
        Self::Lymph,
        Self::Mono,
        Self::Eo,
        Self::Baso,
        Self::Ig,
        Self::Nrbcs,
        Self::Reticulocytes,
        Self::Irf,
        Self::Lfr,
        Self::Mfr,
        Self::Hfr,
    ];

    /// Vị trí của mã trong danh mục (0..26).
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wbc => "WBC",
            Self::Rbc => "RBC",
            Self::Hgb => "HGB",
            Self::Hct => "HCT",
            Self::Mcv => "MCV",
            Self::Mch => "MCH",
            Self::Mchc => "MCHC",
            Self::Plt => "PLT",
            Self::RdwSd => "RDW_SD",
            Self::RdwCv => "RDW_CV",
            Self::Pdw => "PDW",
            Self::Mpv => "MPV",
            Self::PLcr => "P_LCR",
            Self::Pct => "PCT",
            Self::Neut => "NEUT",
            Self::Lymph => "LYMPH",
            Self::Mono => "MONO",
            Self::Eo => "EO",
            Self::Baso => "BASO",
            Self::Ig => "IG",
            Self::Nrbcs => "NRBCS",
            Self::Reticulocytes => "RETICULOCYTES",
            Self::Irf => "IRF",
            Self::Lfr => "LFR",
            Self::Mfr => "MFR",
            Self::Hfr => "HFR",
        }
    }
}

impl fmt::Display for ParameterCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParameterCode {
    type Err = UnknownParameterCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|code| code.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| UnknownParameterCode(needle.to_string()))
    }
}

/// Mã không thuộc danh mục 26 chỉ số.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Mã chỉ số không hợp lệ: {0}")]
pub struct UnknownParameterCode(pub String);

/// Một giá trị đọc được cho một chỉ số.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ParameterObservation {
    pub code: ParameterCode,
    pub value: f64,
}

/// Tập chỉ số (có thể thiếu), luôn duyệt theo thứ tự danh mục.
///
/// Mã vắng mặt nghĩa là "không tìm thấy", không bao giờ là 0.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ParameterSet {
    values: BTreeMap<ParameterCode, f64>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, code: ParameterCode, value: f64) -> Option<f64> {
        self.values.insert(code, value)
    }

    pub fn get(&self, code: ParameterCode) -> Option<f64> {
        self.values.get(&code).copied()
    }

    pub fn contains(&self, code: ParameterCode) -> bool {
        self.values.contains_key(&code)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ParameterObservation> + '_ {
        self.values
            .iter()
            .map(|(&code, &value)| ParameterObservation { code, value })
    }

    pub fn codes(&self) -> impl Iterator<Item = ParameterCode> + '_ {
        self.values.keys().copied()
    }

    /// Giữ lại các quan sát thỏa điều kiện.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(ParameterObservation) -> bool,
    {
        self.values
            .retain(|&code, &mut value| keep(ParameterObservation { code, value }));
    }
}

impl FromIterator<(ParameterCode, f64)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (ParameterCode, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl FromIterator<ParameterObservation> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = ParameterObservation>>(iter: I) -> Self {
        iter.into_iter().map(|obs| (obs.code, obs.value)).collect()
    }
}

/// Hướng lệch so với khoảng bình thường.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Low,
    Normal,
    High,
}

/// Khoảng bình thường lâm sàng kèm ngưỡng nguy kịch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalRange {
    pub code: ParameterCode,
    pub min: f64,
    pub max: f64,
    pub critical_low: f64,
    pub critical_high: f64,
    pub unit: String,
}

impl NormalRange {
    /// Phân loại giá trị: dưới `min` là thấp, trên `max` là cao.
    pub fn classify(&self, value: f64) -> Direction {
        if value < self.min {
            Direction::Low
        } else if value > self.max {
            Direction::High
        } else {
            Direction::Normal
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.classify(value) == Direction::Normal
    }
}

/// Khoảng "hợp lý" dùng để loại giá trị rác từ OCR, độc lập với khoảng lâm sàng.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PlausibilityRange {
    pub code: ParameterCode,
    pub min: f64,
    pub max: f64,
}

impl PlausibilityRange {
    pub fn admits(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// Mẫu bệnh: tập chỉ số và hướng lệch kỳ vọng.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiseasePattern {
    pub name: String,
    pub parameters: Vec<ParameterCode>,
    #[serde(default)]
    pub expected: BTreeMap<ParameterCode, Direction>,
    pub weight: f64,
}

/// Chỉ mục của mẫu bệnh trong registry (thứ tự khai báo).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct DiseaseId(pub usize);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

/// Mức độ nặng dùng để hiển thị (mẫu bệnh và chỉ số bất thường).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Mild,
    Moderate,
    High,
}

/// Kết quả khớp một mẫu bệnh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiseaseMatch {
    pub disease_id: DiseaseId,
    pub disease_name: String,
    pub match_score: f64,
    pub confidence_level: ConfidenceLevel,
    pub severity: Severity,
}

/// Nhóm rủi ro tổng thể.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum SeverityLevel {
    Normal,
    #[serde(rename = "Low Risk")]
    LowRisk,
    #[serde(rename = "Medium Risk")]
    MediumRisk,
    #[serde(rename = "High Risk")]
    HighRisk,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskAssessment {
    pub overall_score: f64,
    pub severity_level: SeverityLevel,
    pub abnormal_count: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RecommendationCategory {
    Diet,
    Exercise,
    Lifestyle,
    Medical,
}

/// Mức ưu tiên; thứ tự khai báo trùng với thứ hạng sắp xếp.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum PriorityLevel {
    High,
    Medium,
    Low,
}

impl PriorityLevel {
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }
}

/// Mẫu khuyến nghị gắn với một bệnh trong danh mục.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationTemplate {
    pub category: RecommendationCategory,
    pub text: String,
    pub rationale: String,
    pub purpose: String,
    pub base_duration_weeks: u32,
    #[serde(default)]
    pub tips: Vec<String>,
}

/// Khuyến nghị đã tính thời lượng và mức ưu tiên.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub category: RecommendationCategory,
    pub text: String,
    pub rationale: String,
    pub purpose: String,
    pub tips: Vec<String>,
    pub duration_weeks: u32,
    pub priority_level: PriorityLevel,
    pub related_disease: String,
}

/// Chỉ số nằm ngoài khoảng bình thường.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AbnormalFinding {
    pub code: ParameterCode,
    pub value: f64,
    pub status: Direction,
    pub grade: Severity,
    pub critical: bool,
    pub unit: String,
}

/// Kết quả phân tích thuần, không phụ thuộc thời điểm chạy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosticSummary {
    pub parameters: ParameterSet,
    pub matches: Vec<DiseaseMatch>,
    pub risk: RiskAssessment,
    pub recommendations: Vec<Recommendation>,
    #[serde(default)]
    pub findings: Vec<AbnormalFinding>,
}

/// Báo cáo gửi cho client: kết quả kèm bảng khoảng tham chiếu.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisReport {
    pub generated_at: DateTime<Utc>,
    pub summary: DiagnosticSummary,
    pub reference_ranges: Vec<NormalRange>,
}

impl AnalysisReport {
    /// Đóng gói kết quả, gắn thời điểm tạo.
    pub fn new(summary: DiagnosticSummary, reference_ranges: Vec<NormalRange>) -> Self {
        Self {
            generated_at: Utc::now(),
            summary,
            reference_ranges,
        }
    }

    pub fn summary(&self) -> &DiagnosticSummary {
        &self.summary
    }

    /// Bảng khoảng bình thường theo thứ tự danh mục.
    pub fn reference_ranges(&self) -> &[NormalRange] {
        &self.reference_ranges
    }
}

/// Lỗi khi phân tích phiếu xét nghiệm.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Không tìm thấy chỉ số hợp lệ nào trong phiếu xét nghiệm")]
    NoParametersFound,
    #[error("Danh mục tham chiếu không hợp lệ: {0}")]
    Catalogue(String),
    #[error("Lỗi nội bộ: {0}")]
    Internal(String),
}
