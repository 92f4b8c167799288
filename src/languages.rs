//! Language code tables used by the upstream service.
//!
//! The service identifies languages with its own two-letter codes (mostly
//! country flags, e.g. `gb` for English). These tables map them to the
//! display names embedded in archive names and to ISO-639-2 codes.

/// Language code of chapters whose names carry no language tag.
pub const DEFAULT_LANGUAGE: &str = "gb";

/// Code used for chapters whose language the service does not know.
const UNKNOWN_CODE: &str = " ";

/// `(code, display name, ISO-639-2)` rows.
const LANGUAGES: &[(&str, &str, &str)] = &[
    ("sa", "Arabic", "ara"),
    ("bd", "Bengali", "ben"),
    ("bg", "Bulgarian", "bul"),
    ("mm", "Burmese", "bur"),
    ("ct", "Catalan", "cat"),
    ("cn", "Chinese (Simp)", "chi"),
    ("hk", "Chinese (Trad)", "chi"),
    ("cz", "Czech", "cze"),
    ("dk", "Danish", "dan"),
    ("nl", "Dutch", "dut"),
    ("gb", "English", "eng"),
    ("ph", "Filipino", "fil"),
    ("fi", "Finnish", "fin"),
    ("fr", "French", "fre"),
    ("de", "German", "ger"),
    ("gr", "Greek", "gre"),
    ("hu", "Hungarian", "hun"),
    ("id", "Indonesian", "ind"),
    ("it", "Italian", "ita"),
    ("jp", "Japanese", "jpn"),
    ("kr", "Korean", "kor"),
    ("my", "Malay", "may"),
    ("mn", "Mongolian", "mon"),
    ("ir", "Persian", "per"),
    ("pl", "Polish", "pol"),
    ("br", "Portuguese (Br)", "por"),
    ("pt", "Portuguese (Pt)", "por"),
    ("ro", "Romanian", "rum"),
    ("ru", "Russian", "rus"),
    ("rs", "Serbo-Croatian", "hrv"),
    ("es", "Spanish (Es)", "spa"),
    ("mx", "Spanish (LATAM)", "spa"),
    ("se", "Swedish", "swe"),
    ("th", "Thai", "tha"),
    ("tr", "Turkish", "tur"),
    ("ua", "Ukrainian", "ukr"),
    ("vn", "Vietnamese", "vie"),
    (UNKNOWN_CODE, "Other", "NA"),
];

fn lookup(code: &str) -> Option<&'static (&'static str, &'static str, &'static str)> {
    LANGUAGES.iter().find(|(c, _, _)| *c == code)
}

/// Returns true if `code` is a language code the service uses.
#[must_use]
pub fn is_known(code: &str) -> bool {
    lookup(code).is_some()
}

/// Display name for a language code, `"Other"` for unknown codes.
#[must_use]
pub fn display_name(code: &str) -> &'static str {
    lookup(code).map_or("Other", |(_, name, _)| name)
}

/// ISO-639-2 code for a language code, `"NA"` for unknown codes.
#[must_use]
pub fn iso_code(code: &str) -> &'static str {
    lookup(code).map_or("NA", |(_, _, iso)| iso)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_known_codes() {
        assert_eq!(display_name("gb"), "English");
        assert_eq!(display_name("br"), "Portuguese (Br)");
        assert_eq!(display_name("mx"), "Spanish (LATAM)");
    }

    #[test]
    fn test_display_name_unknown_code_is_other() {
        assert_eq!(display_name("zz"), "Other");
        assert_eq!(iso_code("zz"), "NA");
    }

    #[test]
    fn test_iso_code_shared_between_variants() {
        assert_eq!(iso_code("cn"), "chi");
        assert_eq!(iso_code("hk"), "chi");
        assert_eq!(iso_code("gb"), "eng");
    }

    #[test]
    fn test_default_language_is_known() {
        assert!(is_known(DEFAULT_LANGUAGE));
        assert!(!is_known("xx"));
    }
}
