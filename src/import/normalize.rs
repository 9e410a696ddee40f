//! Title-column detection, title normalization and climate code extraction.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::models::vocab::strip_description;

const TITLE_KEYWORDS: [&str; 5] = ["study", "title", "paper", "reference", "citation"];

static CODE_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[A-Z][A-Za-z]{1,2}\b").unwrap());
static WHOLE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z][A-Za-z]{1,2}$").unwrap());

/// The column holding study titles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleColumn {
    pub index: usize,
    pub header: String,
    /// False when no header looked like a title and the first column was used.
    pub detected: bool,
}

/// First header containing a title keyword, else the first column.
///
/// Returns `None` only when there are no columns at all.
pub fn detect_title_column(headers: &[String]) -> Option<TitleColumn> {
    let found = headers.iter().position(|h| {
        let lower = h.to_lowercase();
        TITLE_KEYWORDS.iter().any(|k| lower.contains(k))
    });
    match found {
        Some(index) => Some(TitleColumn {
            index,
            header: headers[index].clone(),
            detected: true,
        }),
        None => {
            let header = headers.first()?.clone();
            warn!(
                "No title-like column among {:?}; using first column {:?}",
                headers, header
            );
            Some(TitleColumn {
                index: 0,
                header,
                detected: false,
            })
        }
    }
}

/// Trim and collapse internal whitespace runs to one space.
pub fn normalize_title(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Pull a Köppen-shaped code out of a spreadsheet climate cell.
///
/// With a `|`, the first code-shaped token after the first `|` is taken:
/// `"Temperate | Csa - Hot-summer Mediterranean"` gives `"Csa"`. Without one,
/// the cell is accepted only if, minus any description suffix, it is itself a
/// single code-shaped token, so `"Tropical"` gives `None`.
pub fn extract_climate_code(cell: &str) -> Option<String> {
    match cell.split_once('|') {
        Some((_, rest)) => CODE_TOKEN.find(rest).map(|m| m.as_str().to_string()),
        None => {
            let bare = strip_description(cell);
            WHOLE_CODE.is_match(bare).then(|| bare.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_detect_title_column() {
        let col = detect_title_column(&headers(&["Location", "Paper Reference", "Title"])).unwrap();
        assert_eq!(col.index, 1);
        assert!(col.detected);

        let fallback = detect_title_column(&headers(&["Name", "Location"])).unwrap();
        assert_eq!(fallback.index, 0);
        assert!(!fallback.detected);

        assert!(detect_title_column(&[]).is_none());
    }

    #[test]
    fn test_normalize_title_idempotent() {
        let once = normalize_title("  Smith   et al.\t2019 \n");
        assert_eq!(once, "Smith et al. 2019");
        assert_eq!(normalize_title(&once), once);
    }

    #[test]
    fn test_extract_climate_code() {
        assert_eq!(
            extract_climate_code("Temperate | Csa - Hot-summer Mediterranean").as_deref(),
            Some("Csa")
        );
        assert_eq!(extract_climate_code("Tropical"), None);
        assert_eq!(extract_climate_code("Cfb – Oceanic").as_deref(), Some("Cfb"));
        assert_eq!(extract_climate_code("Temperate | warm"), None);
        assert_eq!(extract_climate_code(""), None);
    }

    #[test]
    fn test_extract_climate_code_idempotent() {
        for cell in [
            "Temperate | Csa - Hot-summer Mediterranean",
            "Cold | Dfb",
            "BWh",
            "Tropical",
            "Arid | ",
        ] {
            let once = extract_climate_code(cell);
            let twice = once.as_deref().and_then(extract_climate_code);
            assert_eq!(once, twice, "{cell:?}");
        }
    }
}
