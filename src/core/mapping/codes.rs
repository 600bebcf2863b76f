//! Static code tables
//!
//! Declarative lookups from source codes to target codes. Each table is a
//! plain slice so it can be read, diffed and tested on its own.

use crate::domain::resource::{CodeableConcept, Coding};

pub const MARITAL_STATUS_SYSTEM: &str = "http://hl7.org/fhir/v4/MaritalStatus";
pub const OBSERVATION_CATEGORY_SYSTEM: &str = "http://hl7.org/fhir/observation-category";
pub const INTERPRETATION_SYSTEM: &str = "http://hl7.org/fhir/v2/0078";
pub const ORGANIZATION_TYPE_SYSTEM: &str = "http://hl7.org/fhir/organization-type";
pub const PHYSICAL_TYPE_SYSTEM: &str = "http://hl7.org/fhir/location-physical-type";
pub const LOINC_SYSTEM: &str = "http://loinc.org";

/// Source gender code to administrative gender
const GENDERS: &[(&str, &str)] = &[("M", "male"), ("F", "female")];

/// Source marital status to (code, display)
const MARITAL_STATUSES: &[(&str, (&str, &str))] = &[
    ("MARRIED", ("M", "Married")),
    ("SINGLE", ("S", "Never Married")),
    ("WIDOWED", ("W", "Widowed")),
    ("DIVORCED", ("D", "Divorced")),
    ("SEPARATED", ("L", "Legally Separated")),
];

const MARITAL_STATUS_UNKNOWN: (&str, &str) = ("UNK", "Unknown");

/// MIMIC language abbreviations to language tags
const LANGUAGES: &[(&str, &str)] = &[
    ("*DUT", "nl"),
    ("URDU", "ur"),
    ("*URD", "ur"),
    ("*NEP", "ne"),
    ("TAGA", "tl"),
    ("*TOY", "toy"),
    ("*RUS", "ru"),
    ("RUSS", "ru"),
    ("ENGL", "en"),
    ("AMER", "en"),
    ("*ARM", "hy"),
    ("CANT", "yue"),
    ("LAOT", "tyl"),
    ("*MOR", "mor"),
    ("*FUL", "ff"),
    ("*ROM", "ro"),
    ("*TOI", "toi"),
    ("BENG", "bn"),
    ("*BEN", "bn"),
    ("**TO", "to"),
    ("PERS", "fa"),
    ("*PER", "fa"),
    ("*TEL", "te"),
    ("*YID", "ji"),
    ("*CDI", "cdi"),
    ("JAPA", "jp"),
    ("ALBA", "sq"),
    ("ARAB", "ar"),
    ("*ARA", "ar"),
    ("ITAL", "it"),
    ("*TAM", "taq"),
    ("*SPA", "es"),
    ("SPAN", "es"),
    ("*BOS", "bs"),
    ("*AMH", "am"),
    ("SOMA", "so"),
    ("CAPE", "cap"),
    ("*PUN", "pa"),
    ("POLI", "pl"),
    ("*CHI", "zh"),
    ("*BUR", "my"),
    ("*CAN", "can"),
    ("*YOR", "yox"),
    ("*KHM", "km"),
    ("CAMB", "km"),
    ("*LIT", "lt"),
    ("*IBO", "ibn"),
    ("KORE", "ko"),
    ("*FIL", "fil"),
    ("THAI", "th"),
    ("**SH", "sh"),
    ("FREN", "fr"),
    ("*FAR", "far"),
    ("*CRE", "crp"),
    ("HIND", "hi"),
    ("*HUN", "hu"),
    ("ETHI", "eth"),
    ("VIET", "vi"),
    ("*MAN", "man"),
    ("GERM", "de"),
    ("*PHI", "phi"),
    ("TURK", "tr"),
    ("*DEA", "mjl"),
    ("PTUN", "ptu"),
    ("GREE", "el"),
    ("MAND", "cmn"),
    ("HAIT", "ht"),
    ("SERB", "sr"),
    ("*BUL", "bg"),
    ("*LEB", "leb"),
    ("*GUJ", "gu"),
    ("PORT", "pt"),
    ("* BE", "be"),
];

/// Note category to observation category (code, display)
const NOTE_CATEGORIES: &[(&str, (&str, &str))] = &[
    ("Echo", ("imaging", "Imaging")),
    ("ECG", ("procedure", "Procedure")),
    ("Respiratory", ("procedure", "Procedure")),
    ("Social Work", ("social-history", "Social History")),
    ("Pharmacy", ("therapy", "Therapy")),
    ("Rehab Services", ("therapy", "Therapy")),
];

fn find<'a, V: Copy>(table: &'a [(&'a str, V)], key: &str) -> Option<V> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

/// Administrative gender for a source gender code
pub fn gender(code: &str) -> &'static str {
    find(GENDERS, code.trim()).unwrap_or("unknown")
}

/// Marital status concept; unknown values map to `UNK`
pub fn marital_status(status: &str) -> CodeableConcept {
    let (code, display) =
        find(MARITAL_STATUSES, status.trim()).unwrap_or(MARITAL_STATUS_UNKNOWN);
    CodeableConcept::coded(Coding::new(MARITAL_STATUS_SYSTEM, code, Some(display)))
}

/// Language tag for a MIMIC language code; unmapped codes pass through
pub fn language(code: &str) -> String {
    find(LANGUAGES, code)
        .map(str::to_string)
        .unwrap_or_else(|| code.to_string())
}

/// Observation category for a note category, if it has one
pub fn note_category(category: &str) -> Option<CodeableConcept> {
    find(NOTE_CATEGORIES, category.trim()).map(|(code, display)| {
        CodeableConcept::coded(Coding::new(OBSERVATION_CATEGORY_SYSTEM, code, Some(display)))
    })
}

/// Fixed observation category
pub fn observation_category(code: &str, display: &str) -> CodeableConcept {
    CodeableConcept::coded(Coding::new(OBSERVATION_CATEGORY_SYSTEM, code, Some(display)))
}

/// Interpretation for a lab flag; only `abnormal` is flagged
pub fn lab_interpretation(flag: &str) -> Option<CodeableConcept> {
    flag.trim().eq_ignore_ascii_case("abnormal").then(|| {
        CodeableConcept::coded(Coding::new(INTERPRETATION_SYSTEM, "A", Some("Abnormal")))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("M" => "male"; "male")]
    #[test_case("F" => "female"; "female")]
    #[test_case("X" => "unknown"; "other")]
    #[test_case("" => "unknown"; "empty")]
    fn test_gender(code: &str) -> &'static str {
        gender(code)
    }

    #[test_case("MARRIED" => "M")]
    #[test_case("SINGLE" => "S")]
    #[test_case("WIDOWED" => "W")]
    #[test_case("DIVORCED" => "D")]
    #[test_case("SEPARATED" => "L")]
    #[test_case("UNKNOWN (DEFAULT)" => "UNK")]
    #[test_case("LIFE PARTNER" => "UNK")]
    fn test_marital_status(status: &str) -> String {
        marital_status(status).first_code().unwrap_or_default().to_string()
    }

    #[test_case("ENGL" => "en"; "english")]
    #[test_case("*DUT" => "nl"; "dutch")]
    #[test_case("SPAN" => "es"; "spanish")]
    #[test_case("*SPA" => "es"; "spanish variant")]
    #[test_case("* BE" => "be"; "code with space")]
    #[test_case("KLINGON" => "KLINGON"; "unmapped passes through")]
    fn test_language(code: &str) -> String {
        language(code)
    }

    #[test_case("Echo" => "imaging")]
    #[test_case("ECG" => "procedure")]
    #[test_case("Respiratory" => "procedure")]
    #[test_case("Social Work" => "social-history")]
    #[test_case("Pharmacy" => "therapy")]
    #[test_case("Rehab Services" => "therapy")]
    #[test_case("Nursing" => ""; "uncategorised")]
    fn test_note_category(category: &str) -> String {
        note_category(category)
            .and_then(|c| c.first_code().map(str::to_string))
            .unwrap_or_default()
    }

    #[test]
    fn test_lab_interpretation() {
        let abnormal = lab_interpretation("abnormal").unwrap();
        assert_eq!(abnormal.first_code(), Some("A"));
        assert!(lab_interpretation("delta").is_none());
        assert!(lab_interpretation("").is_none());
    }

    #[test]
    fn test_language_table_has_no_duplicate_keys() {
        let mut keys: Vec<&str> = LANGUAGES.iter().map(|(k, _)| *k).collect();
        keys.sort_unstable();
        let total = keys.len();
        keys.dedup();
        assert_eq!(keys.len(), total);
    }
}
