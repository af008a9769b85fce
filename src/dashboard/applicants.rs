use serde::{Deserialize, Serialize};

use crate::table::{CellValue, ColumnDefinition, TableRow};

pub const NATURAL_PERSON: &str = "Natural person";
pub const LEGAL_PERSON: &str = "Legal person";

/// A person or company applying for a banking product
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Applicant {
    pub person_type: String,
    pub document_type: String,
    pub id_number: String,
    pub first_name: String,
    pub second_name: String,
    pub first_surname: String,
    pub second_surname: String,
    pub sex: String,
    pub ethnic_group: String,
    pub business_name: String,
}

impl Applicant {
    pub fn is_legal_person(&self) -> bool {
        self.person_type.eq_ignore_ascii_case(LEGAL_PERSON)
    }

    /// Company name for legal persons, full name otherwise
    pub fn display_name(&self) -> String {
        if self.is_legal_person() {
            return self.business_name.clone();
        }
        [
            &self.first_name,
            &self.second_name,
            &self.first_surname,
            &self.second_surname,
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .map(|part| part.as_str())
        .collect::<Vec<_>>()
        .join(" ")
    }
}

impl TableRow for Applicant {
    fn cell(&self, key: &str) -> CellValue {
        let field = match FilterField::from_key(key) {
            Some(field) => field,
            None if key == "name" => return CellValue::Text(self.display_name()),
            None => return CellValue::Empty,
        };
        let value = field.read(self);
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value.to_string())
        }
    }
}

/// Columns of the applicants table
pub fn applicant_columns() -> Vec<ColumnDefinition<Applicant>> {
    vec![
        ColumnDefinition::new("id_number", "ID number").sortable(),
        ColumnDefinition::new("document_type", "Document type"),
        ColumnDefinition::new("name", "Name")
            .sortable()
            .render_with(Applicant::display_name),
        ColumnDefinition::new("person_type", "Person type").sortable(),
    ]
}

/// How a filter field is entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Select(&'static [&'static str]),
    Text,
}

/// Fields of the applicant search dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    PersonType,
    DocumentType,
    IdNumber,
    FirstName,
    SecondName,
    FirstSurname,
    SecondSurname,
    Sex,
    EthnicGroup,
    BusinessName,
}

impl FilterField {
    /// Fields shown for natural persons, in dialog order
    pub const NATURAL: [FilterField; 9] = [
        FilterField::PersonType,
        FilterField::DocumentType,
        FilterField::IdNumber,
        FilterField::FirstName,
        FilterField::SecondName,
        FilterField::FirstSurname,
        FilterField::SecondSurname,
        FilterField::Sex,
        FilterField::EthnicGroup,
    ];

    pub const LEGAL: [FilterField; 2] = [FilterField::PersonType, FilterField::BusinessName];

    pub fn key(&self) -> &'static str {
        match self {
            FilterField::PersonType => "person_type",
            FilterField::DocumentType => "document_type",
            FilterField::IdNumber => "id_number",
            FilterField::FirstName => "first_name",
            FilterField::SecondName => "second_name",
            FilterField::FirstSurname => "first_surname",
            FilterField::SecondSurname => "second_surname",
            FilterField::Sex => "sex",
            FilterField::EthnicGroup => "ethnic_group",
            FilterField::BusinessName => "business_name",
        }
    }

    pub fn from_key(key: &str) -> Option<FilterField> {
        Self::NATURAL
            .iter()
            .chain(Self::LEGAL.iter())
            .copied()
            .find(|field| field.key() == key)
    }

    pub fn label(&self) -> &'static str {
        match self {
            FilterField::PersonType => "Person type",
            FilterField::DocumentType => "Document type",
            FilterField::IdNumber => "ID number",
            FilterField::FirstName => "First name",
            FilterField::SecondName => "Second name",
            FilterField::FirstSurname => "First surname",
            FilterField::SecondSurname => "Second surname",
            FilterField::Sex => "Sex",
            FilterField::EthnicGroup => "Ethnic group",
            FilterField::BusinessName => "Business name",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            FilterField::PersonType => FieldKind::Select(&[NATURAL_PERSON, LEGAL_PERSON]),
            FilterField::DocumentType => FieldKind::Select(&["DNI", "Passport", "ID card"]),
            FilterField::Sex => FieldKind::Select(&["Male", "Female", "Other"]),
            FilterField::EthnicGroup => {
                FieldKind::Select(&["Indigenous", "Afro-descendant", "Mestizo"])
            }
            _ => FieldKind::Text,
        }
    }

    fn read<'a>(&self, applicant: &'a Applicant) -> &'a str {
        match self {
            FilterField::PersonType => &applicant.person_type,
            FilterField::DocumentType => &applicant.document_type,
            FilterField::IdNumber => &applicant.id_number,
            FilterField::FirstName => &applicant.first_name,
            FilterField::SecondName => &applicant.second_name,
            FilterField::FirstSurname => &applicant.first_surname,
            FilterField::SecondSurname => &applicant.second_surname,
            FilterField::Sex => &applicant.sex,
            FilterField::EthnicGroup => &applicant.ethnic_group,
            FilterField::BusinessName => &applicant.business_name,
        }
    }
}

/// State of the applicant search dialog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantFilter {
    #[serde(flatten)]
    criteria: Applicant,
}

impl ApplicantFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: FilterField, value: impl Into<String>) {
        let value = value.into();
        let criteria = &mut self.criteria;
        let slot = match field {
            FilterField::PersonType => &mut criteria.person_type,
            FilterField::DocumentType => &mut criteria.document_type,
            FilterField::IdNumber => &mut criteria.id_number,
            FilterField::FirstName => &mut criteria.first_name,
            FilterField::SecondName => &mut criteria.second_name,
            FilterField::FirstSurname => &mut criteria.first_surname,
            FilterField::SecondSurname => &mut criteria.second_surname,
            FilterField::Sex => &mut criteria.sex,
            FilterField::EthnicGroup => &mut criteria.ethnic_group,
            FilterField::BusinessName => &mut criteria.business_name,
        };
        *slot = value;
    }

    pub fn value(&self, field: FilterField) -> &str {
        field.read(&self.criteria)
    }

    /// Fields the dialog shows; choosing a legal person hides personal data
    pub fn visible_fields(&self) -> &'static [FilterField] {
        if self.criteria.is_legal_person() {
            &FilterField::LEGAL
        } else {
            &FilterField::NATURAL
        }
    }

    pub fn clear(&mut self) {
        self.criteria = Applicant::default();
    }

    /// Whether `applicant` meets every filled-in visible criterion.
    /// Select fields must match exactly, text fields by substring, both
    /// ignoring case.
    pub fn matches(&self, applicant: &Applicant) -> bool {
        self.visible_fields().iter().all(|field| {
            let wanted = field.read(&self.criteria).trim();
            if wanted.is_empty() {
                return true;
            }
            let actual = field.read(applicant).to_lowercase();
            let wanted = wanted.to_lowercase();
            match field.kind() {
                FieldKind::Select(_) => actual == wanted,
                FieldKind::Text => actual.contains(&wanted),
            }
        })
    }

    /// Applicants that pass the filter, in their original order
    pub fn apply<'a>(&self, applicants: &'a [Applicant]) -> Vec<&'a Applicant> {
        applicants.iter().filter(|a| self.matches(a)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ana() -> Applicant {
        Applicant {
            person_type: NATURAL_PERSON.to_string(),
            document_type: "DNI".to_string(),
            id_number: "1012345678".to_string(),
            first_name: "Ana".to_string(),
            first_surname: "Quintero".to_string(),
            sex: "Female".to_string(),
            ..Applicant::default()
        }
    }

    fn acme() -> Applicant {
        Applicant {
            person_type: LEGAL_PERSON.to_string(),
            document_type: "ID card".to_string(),
            id_number: "900123".to_string(),
            business_name: "Acme Holdings S.A.S.".to_string(),
            ..Applicant::default()
        }
    }

    #[test]
    fn legal_person_shows_only_business_fields() {
        let mut filter = ApplicantFilter::new();
        assert_eq!(filter.visible_fields().len(), 9);

        filter.set(FilterField::PersonType, LEGAL_PERSON);
        assert_eq!(
            filter.visible_fields(),
            &[FilterField::PersonType, FilterField::BusinessName]
        );

        filter.set(FilterField::PersonType, NATURAL_PERSON);
        assert!(!filter.visible_fields().contains(&FilterField::BusinessName));
    }

    #[test]
    fn matching_ignores_case_and_empty_criteria() {
        let rows = vec![ana(), acme()];
        let mut filter = ApplicantFilter::new();
        assert_eq!(filter.apply(&rows).len(), 2);

        filter.set(FilterField::FirstSurname, "quint");
        assert_eq!(filter.apply(&rows), vec![&rows[0]]);

        filter.set(FilterField::Sex, "male");
        assert!(filter.apply(&rows).is_empty());
    }

    #[test]
    fn hidden_criteria_are_ignored() {
        let rows = vec![ana(), acme()];
        let mut filter = ApplicantFilter::new();
        filter.set(FilterField::FirstName, "Ana");
        filter.set(FilterField::PersonType, LEGAL_PERSON);
        filter.set(FilterField::BusinessName, "acme");

        assert_eq!(filter.apply(&rows), vec![&rows[1]]);
    }

    #[test]
    fn name_column_uses_display_name() {
        let columns = applicant_columns();
        let name = columns.iter().find(|c| c.key == "name").unwrap();

        assert_eq!(name.cell_text(&ana()), "Ana Quintero");
        assert_eq!(name.cell_text(&acme()), "Acme Holdings S.A.S.");
        assert_eq!(ana().cell("second_name"), CellValue::Empty);
    }
}
