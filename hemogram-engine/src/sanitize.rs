//! OCR artifact stripping that keeps the report's line structure.

use std::sync::LazyLock;

use regex::Regex;

static ARTIFACT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // Bullet glyphs, including the private-use bullet some OCR engines emit.
        Regex::new(r"[\u{F0B7}•·■□●○]").unwrap(),
        Regex::new(r"Page\s?\d+").unwrap(),
        Regex::new(r"https?://\S+").unwrap(),
        Regex::new(r"www\.\S+").unwrap(),
    ]
});

/// Remove bullets, page markers and links, and normalize whitespace.
///
/// Form feeds become line breaks. Each line is trimmed with inner runs of
/// whitespace collapsed to one space, and blank lines are dropped. Line breaks
/// are kept because extraction reads values from the line after a label.
pub fn sanitize_report_text(text: &str) -> String {
    text.split(['\n', '\x0c'])
        .map(clean_line)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn clean_line(line: &str) -> String {
    let mut cleaned = line.to_string();
    for pattern in ARTIFACT_PATTERNS.iter() {
        cleaned = pattern.replace_all(&cleaned, "").into_owned();
    }
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_artifacts_and_keeps_lines() {
        let raw = "• Hemoglobin\r\n   13.2   g/dL\n\nPage 2\x0cMCV  88 fL  www.lab.example/ref\n";

        assert_eq!(
            sanitize_report_text(raw),
            "Hemoglobin\n13.2 g/dL\nMCV 88 fL"
        );
    }

    #[test]
    fn strips_links_and_page_numbers_inline() {
        let raw = "PLT 250 see https://lab.example/plt Page3";
        assert_eq!(sanitize_report_text(raw), "PLT 250 see");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(sanitize_report_text(""), "");
        assert_eq!(sanitize_report_text(" \n\t\n"), "");
    }
}
