//! Projection of a student record into report sections
//!
//! Each section is tagged with its kind when it is built. The PDF writer
//! formats by that tag only, so a record field that happens to look like a
//! divider or a heading is still printed as a plain line.

use crate::db::StudentRecord;

/// Placeholder for an absent co-curricular category
pub const CATEGORY_PLACEHOLDER: &str = "none";

/// Placeholder for absent remarks
pub const REMARKS_PLACEHOLDER: &str = "N/A";

pub const DISCLAIMER: &str =
    "This report is generated automatically from school records and does not require a signature.";

/// Formatting hint carried by a section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// Document title
    Title,
    /// Horizontal separator, no text
    Rule,
    /// Emphasized sub-header
    Heading,
    /// Plain text line
    Line,
    /// Small trailing note
    Note,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    pub text: String,
}

impl Section {
    fn new(kind: SectionKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    fn rule() -> Self {
        Self::new(SectionKind::Rule, "")
    }

    fn field(label: &str, value: &str) -> Self {
        Self::new(SectionKind::Line, format!("{}: {}", label, value))
    }
}

fn or_placeholder<'a>(value: Option<&'a str>, placeholder: &'a str) -> &'a str {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => placeholder,
    }
}

/// Build the ordered sections of a student's report
pub fn build_sections(record: &StudentRecord, year: i32) -> Vec<Section> {
    vec![
        Section::new(SectionKind::Title, format!("PAJSK Report {}", year)),
        Section::rule(),
        Section::field("Name", &record.name),
        Section::field("IC Number", &record.id_card),
        Section::field("Class", &record.class_name),
        Section::rule(),
        Section::new(SectionKind::Heading, "Co-curricular Activities"),
        Section::field(
            "Club / Society",
            or_placeholder(record.co_curricular.as_deref(), CATEGORY_PLACEHOLDER),
        ),
        Section::field(
            "Sport / Game",
            or_placeholder(record.sport.as_deref(), CATEGORY_PLACEHOLDER),
        ),
        Section::field(
            "Uniformed Body",
            or_placeholder(record.uniformed_body.as_deref(), CATEGORY_PLACEHOLDER),
        ),
        Section::rule(),
        Section::field(
            "Remarks",
            or_placeholder(record.remarks.as_deref(), REMARKS_PLACEHOLDER),
        ),
        Section::new(SectionKind::Note, DISCLAIMER),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_record() -> StudentRecord {
        StudentRecord {
            id_card: "080101101234".to_string(),
            name: "Nur Aisyah binti Ahmad".to_string(),
            class_name: "5 Bestari".to_string(),
            co_curricular: None,
            sport: None,
            uniformed_body: None,
            remarks: None,
        }
    }

    fn kinds(sections: &[Section]) -> Vec<SectionKind> {
        sections.iter().map(|s| s.kind).collect()
    }

    #[test]
    fn test_section_order() {
        use SectionKind::*;

        let sections = build_sections(&bare_record(), 2025);
        assert_eq!(
            kinds(&sections),
            vec![Title, Rule, Line, Line, Line, Rule, Heading, Line, Line, Line, Rule, Line, Note]
        );
        assert_eq!(sections[0].text, "PAJSK Report 2025");
        assert_eq!(sections[2].text, "Name: Nur Aisyah binti Ahmad");
        assert_eq!(sections[3].text, "IC Number: 080101101234");
        assert_eq!(sections[4].text, "Class: 5 Bestari");
        assert_eq!(sections[6].text, "Co-curricular Activities");
        assert_eq!(sections[12].text, DISCLAIMER);
    }

    #[test]
    fn test_placeholders_for_absent_fields() {
        let sections = build_sections(&bare_record(), 2025);
        assert_eq!(sections[7].text, "Club / Society: none");
        assert_eq!(sections[8].text, "Sport / Game: none");
        assert_eq!(sections[9].text, "Uniformed Body: none");
        assert_eq!(sections[11].text, "Remarks: N/A");

        for section in sections.iter().filter(|s| s.kind == SectionKind::Line) {
            assert!(!section.text.trim_end().ends_with(':'), "blank field: {}", section.text);
            assert!(!section.text.contains("null"));
        }
    }

    #[test]
    fn test_blank_values_use_placeholder() {
        let mut record = bare_record();
        record.sport = Some("   ".to_string());
        record.remarks = Some(String::new());

        let sections = build_sections(&record, 2025);
        assert_eq!(sections[8].text, "Sport / Game: none");
        assert_eq!(sections[11].text, "Remarks: N/A");
    }

    #[test]
    fn test_present_values_used() {
        let mut record = bare_record();
        record.co_curricular = Some("Kelab Robotik".to_string());
        record.sport = Some("Bola Jaring".to_string());
        record.uniformed_body = Some("Pandu Puteri".to_string());
        record.remarks = Some("Aktif dan berdisiplin".to_string());

        let sections = build_sections(&record, 2025);
        assert_eq!(sections[7].text, "Club / Society: Kelab Robotik");
        assert_eq!(sections[8].text, "Sport / Game: Bola Jaring");
        assert_eq!(sections[9].text, "Uniformed Body: Pandu Puteri");
        assert_eq!(sections[11].text, "Remarks: Aktif dan berdisiplin");
    }

    #[test]
    fn test_only_remarks_differ() {
        let mut first = bare_record();
        first.remarks = Some("Cemerlang".to_string());
        let mut second = bare_record();
        second.remarks = Some("Perlu bimbingan".to_string());

        let a = build_sections(&first, 2025);
        let b = build_sections(&second, 2025);

        assert_eq!(kinds(&a), kinds(&b));
        let differing: Vec<usize> = (0..a.len()).filter(|&i| a[i] != b[i]).collect();
        assert_eq!(differing, vec![11]);
    }

    #[test]
    fn test_marker_like_values_stay_lines() {
        let mut record = bare_record();
        record.remarks = Some("----------------".to_string());
        record.co_curricular = Some("Co-curricular Activities".to_string());

        let sections = build_sections(&record, 2025);
        assert_eq!(sections[7].kind, SectionKind::Line);
        assert_eq!(sections[11].kind, SectionKind::Line);
        assert_eq!(sections[11].text, "Remarks: ----------------");
    }
}
