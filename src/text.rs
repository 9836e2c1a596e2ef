use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

static YEAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{4}").expect("year pattern should be valid"));

/// Canonical form of headers and region names: trimmed, lower-cased and
/// without diacritics (`" Nuevo León "` -> `"nuevo leon"`).
pub fn canonical(text: &str) -> String {
    text.trim()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// First four-digit numeral in `name`, e.g. `"2023Precip.xlsx"` -> `2023`.
pub fn first_year(name: &str) -> Option<i32> {
    YEAR_PATTERN
        .find(name)
        .and_then(|m| m.as_str().parse().ok())
}

/// Decodes CSV bytes, falling back to Latin-1 when they are not UTF-8.
pub fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_strips_accents_and_case() {
        assert_eq!(canonical("SONORA "), "sonora");
        assert_eq!(canonical(" Nuevo León"), "nuevo leon");
        assert_eq!(canonical("Michoacán de Ocampo"), "michoacan de ocampo");
        assert_eq!(canonical("PRONÓSTICO (mm)"), "pronostico (mm)");
        assert_eq!(canonical("Año"), "ano");
    }

    #[test]
    fn test_first_year() {
        assert_eq!(first_year("2023Precip.xlsx"), Some(2023));
        assert_eq!(first_year("Precipitacion/lluvia_1985.xls"), Some(1985));
        assert_eq!(first_year("resumen.xls"), None);
        assert_eq!(first_year("v12_2020.csv"), Some(2020));
    }

    #[test]
    fn test_decode_latin1() {
        let latin1 = b"Quer\xe9taro";
        assert_eq!(decode_text(latin1), "Querétaro");
        assert_eq!(decode_text("Yucatán".as_bytes()), "Yucatán");
    }
}
