//! Schemas: which fields of a record type are indexed, and how
//!
//! A [`Schema`] is typed over the application's record type and knows how to
//! pull each field's value out of a record. Registering it with the engine
//! yields an [`Indexer`](crate::indexer::Indexer) for writes, while the engine
//! keeps an untyped [`FieldCatalog`] to validate queries and sort overrides.
//!
//! ```
//! use quarry_core::{FieldValue, RecordId};
//! use quarry_search::schema::{Indexable, Schema};
//!
//! struct Artist { id: u64, name: String }
//!
//! impl Indexable for Artist {
//!     fn record_id(&self) -> RecordId { self.id.into() }
//!     fn attribute(&self, name: &str) -> Option<FieldValue> {
//!         match name {
//!             "name" => Some(self.name.as_str().into()),
//!             _ => None,
//!         }
//!     }
//! }
//!
//! let schema = Schema::<Artist>::builder("artist")
//!     .text("name")
//!     .sort("name")
//!     .phonetic_with("sounds", |a: &Artist| a.name.as_str().into())
//!     .build();
//! assert_eq!(schema.fields().len(), 3);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use quarry_core::{Error, FieldValue, IndexKind, KeySpace, RecordId, Result};

/// A record that can be indexed
pub trait Indexable {
    /// Stable identifier of the record
    fn record_id(&self) -> RecordId;

    /// Value of a named attribute, `None` if the record has no such attribute
    fn attribute(&self, name: &str) -> Option<FieldValue>;
}

/// Custom value extractor for a field
pub type Extractor<R> = Arc<dyn Fn(&R) -> FieldValue + Send + Sync>;

/// One indexed field of a record type
pub struct FieldDefinition<R> {
    name: String,
    kind: IndexKind,
    extractor: Option<Extractor<R>>,
}

impl<R> FieldDefinition<R> {
    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Index kind
    pub fn kind(&self) -> &IndexKind {
        &self.kind
    }
}

impl<R: Indexable> FieldDefinition<R> {
    /// Value of this field for `record`
    ///
    /// Uses the custom extractor when one was given, otherwise the record
    /// attribute of the same name. A missing attribute is `Null`.
    pub fn extract(&self, record: &R) -> FieldValue {
        match &self.extractor {
            Some(extract) => extract(record),
            None => record.attribute(&self.name).unwrap_or(FieldValue::Null),
        }
    }
}

impl<R> Clone for FieldDefinition<R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            kind: self.kind.clone(),
            extractor: self.extractor.clone(),
        }
    }
}

impl<R> fmt::Debug for FieldDefinition<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDefinition")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("custom_extractor", &self.extractor.is_some())
            .finish()
    }
}

/// Indexed fields of one record type
pub struct Schema<R> {
    record_type: String,
    fields: Vec<FieldDefinition<R>>,
}

impl<R> Schema<R> {
    /// Start a schema for `record_type`
    pub fn builder(record_type: impl Into<String>) -> SchemaBuilder<R> {
        SchemaBuilder {
            record_type: record_type.into(),
            fields: Vec::new(),
        }
    }

    /// Record type name
    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    /// Field definitions in declaration order
    pub fn fields(&self) -> &[FieldDefinition<R>] {
        &self.fields
    }
}

impl<R> fmt::Debug for Schema<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("record_type", &self.record_type)
            .field("fields", &self.fields)
            .finish()
    }
}

/// Builder for [`Schema`]
///
/// A field name may be declared under several kinds (e.g. `text` and `sort`);
/// declaring the same name and kind twice keeps the last declaration.
pub struct SchemaBuilder<R> {
    record_type: String,
    fields: Vec<FieldDefinition<R>>,
}

impl<R> SchemaBuilder<R> {
    /// Index `name` under `kind`, reading the record attribute of that name
    pub fn field(mut self, name: &str, kind: impl Into<IndexKind>) -> Self {
        self.push(name, IndexKind::canonical(kind.into()), None);
        self
    }

    /// Index `name` under `kind` with a custom extractor
    pub fn field_with<F>(mut self, name: &str, kind: impl Into<IndexKind>, extract: F) -> Self
    where
        F: Fn(&R) -> FieldValue + Send + Sync + 'static,
    {
        self.push(name, IndexKind::canonical(kind.into()), Some(Arc::new(extract)));
        self
    }

    /// Text field
    pub fn text(self, name: &str) -> Self {
        self.field(name, IndexKind::Text)
    }

    /// Text field with a custom extractor
    pub fn text_with<F>(self, name: &str, extract: F) -> Self
    where
        F: Fn(&R) -> FieldValue + Send + Sync + 'static,
    {
        self.field_with(name, IndexKind::Text, extract)
    }

    /// Phonetic field
    pub fn phonetic(self, name: &str) -> Self {
        self.field(name, IndexKind::Phonetic)
    }

    /// Phonetic field with a custom extractor
    pub fn phonetic_with<F>(self, name: &str, extract: F) -> Self
    where
        F: Fn(&R) -> FieldValue + Send + Sync + 'static,
    {
        self.field_with(name, IndexKind::Phonetic, extract)
    }

    /// Number field
    pub fn number(self, name: &str) -> Self {
        self.field(name, IndexKind::Number)
    }

    /// Number field with a custom extractor
    pub fn number_with<F>(self, name: &str, extract: F) -> Self
    where
        F: Fn(&R) -> FieldValue + Send + Sync + 'static,
    {
        self.field_with(name, IndexKind::Number, extract)
    }

    /// Sort field
    pub fn sort(self, name: &str) -> Self {
        self.field(name, IndexKind::Sort)
    }

    /// Sort field with a custom extractor
    pub fn sort_with<F>(self, name: &str, extract: F) -> Self
    where
        F: Fn(&R) -> FieldValue + Send + Sync + 'static,
    {
        self.field_with(name, IndexKind::Sort, extract)
    }

    /// Finish the schema
    pub fn build(self) -> Schema<R> {
        Schema {
            record_type: self.record_type,
            fields: self.fields,
        }
    }

    fn push(&mut self, name: &str, kind: IndexKind, extractor: Option<Extractor<R>>) {
        self.fields
            .retain(|f| !(f.name == name && f.kind == kind));
        self.fields.push(FieldDefinition {
            name: name.to_string(),
            kind,
            extractor,
        });
    }
}

/// Untyped view of a registered schema
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCatalog {
    keys: KeySpace,
    fields: BTreeMap<String, BTreeSet<IndexKind>>,
}

impl FieldCatalog {
    /// Catalog of `schema` with keys under `namespace`
    pub fn from_schema<R>(namespace: &str, schema: &Schema<R>) -> Self {
        let mut fields: BTreeMap<String, BTreeSet<IndexKind>> = BTreeMap::new();
        for def in schema.fields() {
            fields
                .entry(def.name.clone())
                .or_default()
                .insert(def.kind.clone());
        }
        Self {
            keys: KeySpace::new(namespace, schema.record_type()),
            fields,
        }
    }

    /// Record type name
    pub fn record_type(&self) -> &str {
        self.keys.record_type()
    }

    /// Key layout of the record type
    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }

    /// Whether `field` is registered with `kind`
    pub fn has(&self, field: &str, kind: &IndexKind) -> bool {
        self.fields
            .get(field)
            .is_some_and(|kinds| kinds.contains(kind))
    }

    /// Fail with `UnknownField` unless `field` is registered with `kind`
    pub fn require(&self, field: &str, kind: &IndexKind) -> Result<()> {
        if self.has(field, kind) {
            Ok(())
        } else {
            Err(Error::unknown_field(field, kind.as_str()))
        }
    }

    /// Kinds `field` is registered with
    pub fn kinds(&self, field: &str) -> impl Iterator<Item = &IndexKind> {
        self.fields.get(field).into_iter().flatten()
    }

    /// Field names
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Song {
        id: u64,
        title: String,
        plays: Option<u32>,
    }

    impl Indexable for Song {
        fn record_id(&self) -> RecordId {
            self.id.into()
        }

        fn attribute(&self, name: &str) -> Option<FieldValue> {
            match name {
                "title" => Some(self.title.as_str().into()),
                "plays" => Some(self.plays.into()),
                _ => None,
            }
        }
    }

    fn song() -> Song {
        Song {
            id: 7,
            title: "Yesterday".into(),
            plays: None,
        }
    }

    #[test]
    fn test_extract_from_attributes_and_closures() {
        let schema = Schema::<Song>::builder("song")
            .text("title")
            .number("plays")
            .number("missing")
            .text_with("shout", |s: &Song| s.title.to_uppercase().into())
            .build();

        let values: Vec<FieldValue> = schema.fields().iter().map(|f| f.extract(&song())).collect();
        assert_eq!(values[0], FieldValue::from("Yesterday"));
        assert!(values[1].is_null());
        assert!(values[2].is_null());
        assert_eq!(values[3], FieldValue::from("YESTERDAY"));
    }

    #[test]
    fn test_redeclaring_field_and_kind_replaces() {
        let schema = Schema::<Song>::builder("song")
            .text("title")
            .sort("title")
            .text_with("title", |s: &Song| s.title.clone().into())
            .build();
        assert_eq!(schema.fields().len(), 2);
        assert_eq!(schema.fields()[1].kind(), &IndexKind::Text);
    }

    #[test]
    fn test_catalog_lookup() {
        let schema = Schema::<Song>::builder("song")
            .text("title")
            .sort("title")
            .field("title", "initial")
            .build();
        let catalog = FieldCatalog::from_schema("quarry", &schema);

        assert_eq!(catalog.record_type(), "song");
        assert!(catalog.has("title", &IndexKind::Sort));
        assert!(catalog.has("title", &IndexKind::Custom("initial".into())));
        assert_eq!(catalog.kinds("title").count(), 3);
        assert!(catalog.require("title", &IndexKind::Phonetic).is_err());
        assert!(matches!(
            catalog.require("artist", &IndexKind::Text),
            Err(Error::UnknownField { .. })
        ));
        assert_eq!(catalog.field_names().collect::<Vec<_>>(), vec!["title"]);
    }
}
