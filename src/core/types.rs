use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::core::error::{Error, Result};

/// Position of a record inside one snapshot's record list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordHandle(pub u32);

impl RecordHandle {
    pub fn new(position: usize) -> Self {
        RecordHandle(position as u32)
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for RecordHandle {
    fn from(value: u32) -> Self {
        RecordHandle(value)
    }
}

/// Searchable header fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Title,
    Who,
    What,
    Where,
    When,
    Why,
    How,
    Purpose,
    Key,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::Title,
        Field::Who,
        Field::What,
        Field::Where,
        Field::When,
        Field::Why,
        Field::How,
        Field::Purpose,
        Field::Key,
    ];

    /// Fields whose values feed query suggestions.
    pub const SUGGEST: [Field; 4] = [Field::Title, Field::Who, Field::What, Field::Key];

    pub fn name(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Who => "who",
            Field::What => "what",
            Field::Where => "where",
            Field::When => "when",
            Field::Why => "why",
            Field::How => "how",
            Field::Purpose => "purpose",
            Field::Key => "key",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Field::ALL
            .iter()
            .copied()
            .find(|field| field.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidOption(format!("unknown field '{}'", s)))
    }
}

/// A header record: provenance and description fields plus cross-references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub id: String,
    pub title: String,
    pub who: String,
    pub what: String,
    pub r#where: String,
    pub when: String,
    pub why: String,
    pub how: String,
    pub purpose: String,
    pub key: String,
    pub related_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MetadataRecord {
    pub fn new(id: &str, title: &str, who: &str) -> Self {
        let now = Utc::now();
        MetadataRecord {
            id: id.to_string(),
            title: title.to_string(),
            who: who.to_string(),
            what: String::new(),
            r#where: String::new(),
            when: String::new(),
            why: String::new(),
            how: String::new(),
            purpose: String::new(),
            key: String::new(),
            related_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_field(mut self, field: Field, value: &str) -> Self {
        *self.field_mut(field) = value.to_string();
        self
    }

    pub fn with_related(mut self, ids: &[&str]) -> Self {
        self.related_ids = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::Title => &self.title,
            Field::Who => &self.who,
            Field::What => &self.what,
            Field::Where => &self.r#where,
            Field::When => &self.when,
            Field::Why => &self.why,
            Field::How => &self.how,
            Field::Purpose => &self.purpose,
            Field::Key => &self.key,
        }
    }

    pub fn field_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Title => &mut self.title,
            Field::Who => &mut self.who,
            Field::What => &mut self.what,
            Field::Where => &mut self.r#where,
            Field::When => &mut self.when,
            Field::Why => &mut self.why,
            Field::How => &mut self.how,
            Field::Purpose => &mut self.purpose,
            Field::Key => &mut self.key,
        }
    }

    /// Total byte length of the text fields, used by the `size` sort.
    pub fn size(&self) -> u64 {
        Field::ALL.iter().map(|f| self.field(*f).len() as u64).sum()
    }

    /// Strip control characters and surrounding whitespace, then check the
    /// id/title/who triplet and the related-id syntax.
    pub fn sanitize(mut self) -> Result<Self> {
        self.id = clean(&self.id);
        for field in Field::ALL {
            let cleaned = clean(self.field(field));
            *self.field_mut(field) = cleaned;
        }
        self.related_ids = self.related_ids.iter().map(|id| clean(id)).collect();
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::InvalidRecord("id is required".to_string()));
        }
        if self.title.is_empty() {
            return Err(Error::InvalidRecord(format!("{}: title is required", self.id)));
        }
        if self.who.is_empty() {
            return Err(Error::InvalidRecord(format!("{}: who is required", self.id)));
        }
        for id in std::iter::once(&self.id).chain(self.related_ids.iter()) {
            if id.is_empty() || id.contains('[') || id.contains(']') {
                return Err(Error::InvalidRecord(format!(
                    "{}: invalid record id '{}'",
                    self.id, id
                )));
            }
        }
        Ok(())
    }
}

fn clean(value: &str) -> String {
    value.chars().filter(|c| !c.is_control()).collect::<String>().trim().to_string()
}

/// Partial update for an existing record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordPatch {
    pub title: Option<String>,
    pub who: Option<String>,
    pub what: Option<String>,
    pub r#where: Option<String>,
    pub when: Option<String>,
    pub why: Option<String>,
    pub how: Option<String>,
    pub purpose: Option<String>,
    pub key: Option<String>,
    pub related_ids: Option<Vec<String>>,
}

impl RecordPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: Field, value: &str) -> Self {
        *self.slot(field) = Some(value.to_string());
        self
    }

    pub fn related(mut self, ids: &[&str]) -> Self {
        self.related_ids = Some(ids.iter().map(|id| id.to_string()).collect());
        self
    }

    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Title => &mut self.title,
            Field::Who => &mut self.who,
            Field::What => &mut self.what,
            Field::Where => &mut self.r#where,
            Field::When => &mut self.when,
            Field::Why => &mut self.why,
            Field::How => &mut self.how,
            Field::Purpose => &mut self.purpose,
            Field::Key => &mut self.key,
        }
    }

    /// Apply onto a copy of `record`. Returns `None` when nothing would change.
    pub fn apply(&self, record: &MetadataRecord) -> Option<MetadataRecord> {
        let mut patched = record.clone();
        let mut patch = self.clone();
        for field in Field::ALL {
            if let Some(value) = patch.slot(field).take() {
                *patched.field_mut(field) = value;
            }
        }
        if let Some(ids) = patch.related_ids.take() {
            patched.related_ids = ids;
        }
        if &patched == record {
            None
        } else {
            Some(patched)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_parses_case_insensitively() {
        assert_eq!("Title".parse::<Field>().unwrap(), Field::Title);
        assert_eq!(" where ".parse::<Field>().unwrap(), Field::Where);
        assert!(matches!("body".parse::<Field>(), Err(Error::InvalidOption(_))));
    }

    #[test]
    fn sanitize_strips_control_characters() {
        let record = MetadataRecord::new(" A1 ", "Search\u{0007} Engine ", "WOLFIE")
            .sanitize()
            .unwrap();
        assert_eq!(record.id, "A1");
        assert_eq!(record.title, "Search Engine");
    }

    #[test]
    fn sanitize_requires_title_and_who() {
        let missing_who = MetadataRecord::new("A1", "Title", "  ");
        assert!(matches!(missing_who.sanitize(), Err(Error::InvalidRecord(_))));

        let missing_title = MetadataRecord::new("A1", "", "WOLFIE");
        assert!(matches!(missing_title.sanitize(), Err(Error::InvalidRecord(_))));
    }

    #[test]
    fn bracketed_related_ids_are_rejected() {
        let record = MetadataRecord::new("A1", "Title", "WOLFIE").with_related(&["B]2"]);
        assert!(matches!(record.sanitize(), Err(Error::InvalidRecord(_))));
    }

    #[test]
    fn patch_reports_no_change() {
        let record = MetadataRecord::new("A1", "Title", "WOLFIE");
        assert!(RecordPatch::new().set(Field::Title, "Title").apply(&record).is_none());

        let patched = RecordPatch::new()
            .set(Field::What, "index design")
            .apply(&record)
            .unwrap();
        assert_eq!(patched.what, "index design");
        assert_eq!(patched.title, "Title");
    }

    #[test]
    fn size_counts_text_fields() {
        let record = MetadataRecord::new("A1", "abcd", "xy").with_field(Field::Key, "k");
        assert_eq!(record.size(), 7);
    }
}
