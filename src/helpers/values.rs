//! Lookup tables scraped from myUDC XML reports.
//!
//! The reports have a fixed layout: the root element holds one `LIST_G_*`
//! element whose children are the records. Each record carries a
//! descriptive field and a code field per category, which are collected
//! as `label -> code` pairs for building report requests later on.

use std::{fmt, str::FromStr};

use indexmap::IndexMap;
use roxmltree::{Document, Node};
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::error::{HubError, HubResult};

/// Label -> code pairs, in the order labels were first seen
pub type ValueMap = IndexMap<String, String>;

/// Categories that can be read off the offered courses report
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Attribute {
    Campus,
    College,
    Department,
}

impl Attribute {
    pub const ALL: [Attribute; 3] = [Attribute::Campus, Attribute::College, Attribute::Department];

    pub fn name(self) -> &'static str {
        match self {
            Attribute::Campus => "Campus",
            Attribute::College => "College",
            Attribute::Department => "Department",
        }
    }

    /// (label field, code field) inside a course record
    fn fields(self) -> (&'static str, &'static str) {
        match self {
            Attribute::Campus => ("CAMPUS_DESC", "SSBSECT_CAMP_CODE"),
            Attribute::College => ("COLLEGE_NAME", "SCBCRSE_COLL_CODE"),
            Attribute::Department => ("DEPT_NAME", "SCBCRSE_DEPT_CODE"),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Attribute {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Attribute::ALL
            .into_iter()
            .find(|attribute| attribute.name() == s)
            .ok_or_else(|| format!("unknown attribute {s:?}"))
    }
}

impl Serialize for Attribute {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

pub(crate) fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.is_element() && n.has_tag_name(name))
}

/// Text of a record's field; an empty element reads as the empty string
pub(crate) fn field(node: Node<'_, '_>, name: &'static str) -> HubResult<String> {
    child(node, name)
        .map(|n| n.text().unwrap_or_default().to_string())
        .ok_or(HubError::MissingField { field: name })
}

/// Element children of the root's `list` node
pub(crate) fn records<'a, 'input>(
    doc: &'a Document<'input>,
    list: &'static str,
) -> HubResult<impl Iterator<Item = Node<'a, 'input>>> {
    let list_node = child(doc.root_element(), list).ok_or(HubError::MissingField { field: list })?;
    Ok(list_node.children().filter(|n| n.is_element()))
}

/// Collects campus/college/department names and codes from an offered courses report
pub fn values_of(
    courses: impl AsRef<[u8]>,
    attributes: &[Attribute],
) -> HubResult<IndexMap<Attribute, ValueMap>> {
    let mut values: IndexMap<Attribute, ValueMap> = attributes
        .iter()
        .map(|attribute| (*attribute, ValueMap::new()))
        .collect();

    if values.is_empty() {
        return Ok(values);
    }

    let doc = Document::parse(std::str::from_utf8(courses.as_ref())?)?;
    let mut count = 0;

    for course in records(&doc, "LIST_G_SSBSECT_TERM_CODE")? {
        for (attribute, map) in values.iter_mut() {
            let (label, code) = attribute.fields();
            map.insert(field(course, label)?, field(course, code)?);
        }
        count += 1;
    }

    debug!("Extracted {:?} from {} course records", attributes, count);
    Ok(values)
}

/// Same as [`values_of`], taking attribute names; unknown names are ignored
pub fn values_of_names(courses: impl AsRef<[u8]>, names: &[&str]) -> HubResult<IndexMap<Attribute, ValueMap>> {
    let attributes: Vec<Attribute> = names.iter().filter_map(|name| name.parse().ok()).collect();
    values_of(courses, &attributes)
}

/// Collects major names and codes from a students' schedules report
pub fn values_of_majors(schedules: impl AsRef<[u8]>) -> HubResult<ValueMap> {
    let doc = Document::parse(std::str::from_utf8(schedules.as_ref())?)?;
    let mut majors = ValueMap::new();

    for schedule in records(&doc, "LIST_G_STVCOLL_DESC")? {
        majors.insert(
            field(schedule, "CF_MAJR_DESC")?,
            field(schedule, "SGBSTDN_MAJR_CODE_1")?,
        );
    }

    Ok(majors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn course(campus: (&str, &str), college: (&str, &str), dept: (&str, &str)) -> String {
        format!(
            "<G_SSBSECT_TERM_CODE>\
               <CAMPUS_DESC>{}</CAMPUS_DESC><SSBSECT_CAMP_CODE>{}</SSBSECT_CAMP_CODE>\
               <COLLEGE_NAME>{}</COLLEGE_NAME><SCBCRSE_COLL_CODE>{}</SCBCRSE_COLL_CODE>\
               <DEPT_NAME>{}</DEPT_NAME><SCBCRSE_DEPT_CODE>{}</SCBCRSE_DEPT_CODE>\
             </G_SSBSECT_TERM_CODE>",
            campus.0, campus.1, college.0, college.1, dept.0, dept.1
        )
    }

    fn courses_report(records: &[String]) -> String {
        format!(
            "<?xml version=\"1.0\"?><SYRSCHE><LIST_G_SSBSECT_TERM_CODE>{}</LIST_G_SSBSECT_TERM_CODE></SYRSCHE>",
            records.concat()
        )
    }

    #[test]
    fn duplicate_labels_keep_last_code() {
        let doc = courses_report(&[
            course(("Main Campus", "M"), ("Sciences", "01"), ("Computer Science", "CS")),
            course(("Main Campus", "MW"), ("Sciences", "01"), ("Physics", "PHYS")),
        ]);

        let values = values_of(&doc, &[Attribute::Campus]).unwrap();
        let campus = &values[&Attribute::Campus];
        assert_eq!(values.len(), 1);
        assert_eq!(campus.len(), 1);
        assert_eq!(campus["Main Campus"], "MW");
    }

    #[test]
    fn extracts_each_requested_attribute() {
        let doc = courses_report(&[
            course(("Main Campus", "M"), ("Sciences", "01"), ("Computer Science", "CS")),
            course(("Khorfakkan", "K"), ("Engineering", "02"), ("Civil Engineering", "CIVL")),
        ]);

        let values = values_of(&doc, &[Attribute::College, Attribute::Department]).unwrap();
        assert!(!values.contains_key(&Attribute::Campus));
        assert_eq!(
            values[&Attribute::College].iter().collect::<Vec<_>>(),
            vec![
                (&"Sciences".to_string(), &"01".to_string()),
                (&"Engineering".to_string(), &"02".to_string())
            ]
        );
        assert_eq!(values[&Attribute::Department]["Civil Engineering"], "CIVL");
    }

    #[test]
    fn no_attributes_means_empty_result() {
        let values = values_of("this is not even xml", &[]).unwrap();
        assert!(values.is_empty());
    }

    #[test]
    fn unknown_names_are_ignored() {
        let doc = courses_report(&[course(("Main Campus", "M"), ("Sciences", "01"), ("Math", "MATH"))]);

        let values = values_of_names(&doc, &["Campus", "Building", "campus"]).unwrap();
        assert_eq!(values.keys().copied().collect::<Vec<_>>(), vec![Attribute::Campus]);

        assert!(values_of_names(&doc, &["Building"]).unwrap().is_empty());
    }

    #[test]
    fn serializes_with_attribute_names() {
        let doc = courses_report(&[course(("Main Campus", "M"), ("Sciences", "01"), ("Math", "MATH"))]);
        let values = values_of(&doc, &[Attribute::Campus]).unwrap();
        assert_eq!(
            serde_json::to_value(&values).unwrap(),
            serde_json::json!({ "Campus": { "Main Campus": "M" } })
        );
    }

    #[test]
    fn missing_field_is_an_error() {
        let doc = "<SYRSCHE><LIST_G_SSBSECT_TERM_CODE><G_SSBSECT_TERM_CODE>\
                   <CAMPUS_DESC>Main Campus</CAMPUS_DESC>\
                   </G_SSBSECT_TERM_CODE></LIST_G_SSBSECT_TERM_CODE></SYRSCHE>";

        let err = values_of(doc, &[Attribute::Campus]).unwrap_err();
        assert!(matches!(err, HubError::MissingField { field: "SSBSECT_CAMP_CODE" }));
    }

    #[test]
    fn malformed_xml_is_a_parse_error() {
        let err = values_of("<SYRSCHE><LIST_G_SSBSECT_TERM_CODE>", &[Attribute::Campus]).unwrap_err();
        assert!(matches!(err, HubError::Parse(_)));
    }

    #[test]
    fn reads_report_bytes_as_utf8() {
        let doc = courses_report(&[course(("الحرم الجامعي", "M"), ("Sciences", "01"), ("Math", "MATH"))]);
        let bytes: Vec<u8> = doc.into_bytes();

        let values = values_of(&bytes, &[Attribute::Campus]).unwrap();
        assert_eq!(values[&Attribute::Campus]["الحرم الجامعي"], "M");
    }

    #[test]
    fn invalid_utf8_is_an_encoding_error() {
        let bytes = b"<SYRSCHE><LIST_G_SSBSECT_TERM_CODE>\xff</LIST_G_SSBSECT_TERM_CODE></SYRSCHE>";
        assert!(matches!(values_of(bytes, &[Attribute::Campus]), Err(HubError::Encoding(_))));
        assert!(matches!(values_of_majors(&bytes[..]), Err(HubError::Encoding(_))));
    }

    #[test]
    fn majors_from_schedules_report() {
        let doc = "<SYFSSCE><LIST_G_STVCOLL_DESC>\
                   <G_STVCOLL_DESC><CF_MAJR_DESC>Computer Science</CF_MAJR_DESC><SGBSTDN_MAJR_CODE_1>CS</SGBSTDN_MAJR_CODE_1></G_STVCOLL_DESC>\
                   <G_STVCOLL_DESC><CF_MAJR_DESC>Computer Engineering</CF_MAJR_DESC><SGBSTDN_MAJR_CODE_1>CE</SGBSTDN_MAJR_CODE_1></G_STVCOLL_DESC>\
                   </LIST_G_STVCOLL_DESC></SYFSSCE>";

        let majors = values_of_majors(doc).unwrap();
        assert_eq!(majors.len(), 2);
        assert_eq!(majors["Computer Engineering"], "CE");
    }

    #[test]
    fn empty_majors_list_gives_empty_map() {
        let majors = values_of_majors("<SYFSSCE><LIST_G_STVCOLL_DESC/></SYFSSCE>").unwrap();
        assert!(majors.is_empty());
    }

    #[test]
    fn attribute_names_round_trip_through_from_str() {
        for attribute in Attribute::ALL {
            assert_eq!(attribute.name().parse::<Attribute>().unwrap(), attribute);
        }
        assert!("Majors".parse::<Attribute>().is_err());
    }
}
