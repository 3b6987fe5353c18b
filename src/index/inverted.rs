use std::collections::HashMap;
use roaring::RoaringBitmap;
use crate::analysis::tokenizer::Tokenizer;
use crate::core::types::{Field, MetadataRecord, RecordHandle};

/// Inverted field index: (field, token) -> record handles.
///
/// Always built whole from a record list; there is no in-place mutation.
/// Handles are positions in the record slice the index was built from.
#[derive(Debug, Clone, Default)]
pub struct FieldIndex {
    pub postings: HashMap<Field, HashMap<String, RoaringBitmap>>,
    pub doc_count: usize,
    pub total_tokens: usize,
}

impl FieldIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(records: &[MetadataRecord], tokenizer: &dyn Tokenizer) -> Self {
        let mut index = FieldIndex::new();

        for (position, record) in records.iter().enumerate() {
            let handle = RecordHandle::new(position);
            for field in Field::ALL {
                let value = record.field(field);
                if value.is_empty() {
                    continue;
                }
                let tokens = tokenizer.tokenize(value);
                index.total_tokens += tokens.len();

                let field_postings = index.postings.entry(field).or_default();
                for token in tokens {
                    field_postings
                        .entry(token.text)
                        .or_default()
                        .insert(handle.0);
                }
            }
        }
        index.doc_count = records.len();

        index
    }

    /// Handles of records whose `field` contains `token`; empty on miss.
    pub fn lookup(&self, field: Field, token: &str) -> RoaringBitmap {
        self.postings
            .get(&field)
            .and_then(|tokens| tokens.get(token))
            .cloned()
            .unwrap_or_default()
    }

    /// Union of `lookup` across `fields`.
    pub fn lookup_any(&self, fields: &[Field], token: &str) -> RoaringBitmap {
        let mut handles = RoaringBitmap::new();
        for field in fields {
            if let Some(bitmap) = self.postings.get(field).and_then(|tokens| tokens.get(token)) {
                handles |= bitmap;
            }
        }
        handles
    }

    pub fn contains(&self, field: Field, token: &str, handle: RecordHandle) -> bool {
        self.postings
            .get(&field)
            .and_then(|tokens| tokens.get(token))
            .is_some_and(|bitmap| bitmap.contains(handle.0))
    }

    /// Number of distinct (field, token) keys
    pub fn len(&self) -> usize {
        self.postings.values().map(|tokens| tokens.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn doc_count(&self) -> usize {
        self.doc_count
    }

    pub fn total_tokens(&self) -> usize {
        self.total_tokens
    }

    /// Distinct tokens indexed for one field
    pub fn terms(&self, field: Field) -> impl Iterator<Item = &str> {
        self.postings
            .get(&field)
            .into_iter()
            .flat_map(|tokens| tokens.keys().map(|t| t.as_str()))
    }
}
