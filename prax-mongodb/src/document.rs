//! Element lookup helpers for raw BSON documents.

use bson::{Bson, Document};

/// The outcome of looking up an element in a document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Element<'a> {
    /// No element with that name or path exists.
    Missing,
    /// The element exists and holds `null`.
    Null,
    /// The element exists and holds a value.
    Present(&'a Bson),
}

impl<'a> Element<'a> {
    /// The value, if present and not null.
    pub fn value(self) -> Option<&'a Bson> {
        match self {
            Self::Present(v) => Some(v),
            _ => None,
        }
    }

    /// Check if the element is absent.
    pub fn is_missing(self) -> bool {
        matches!(self, Self::Missing)
    }
}

/// Extension trait for BSON documents.
pub trait DocumentExt {
    /// Look up a top-level element.
    fn element(&self, name: &str) -> Element<'_>;

    /// Look up an element by path, descending through sub-documents.
    ///
    /// A path that runs into a null or non-document value is missing.
    fn element_at<S: AsRef<str>>(&self, path: &[S]) -> Element<'_>;

    /// Set an element by path, creating intermediate sub-documents.
    ///
    /// Returns `false` if an intermediate element exists but is not a document.
    fn set_at<S: AsRef<str>>(&mut self, path: &[S], value: Bson) -> bool;
}

impl DocumentExt for Document {
    fn element(&self, name: &str) -> Element<'_> {
        match self.get(name) {
            None => Element::Missing,
            Some(Bson::Null) => Element::Null,
            Some(v) => Element::Present(v),
        }
    }

    fn element_at<S: AsRef<str>>(&self, path: &[S]) -> Element<'_> {
        let Some((last, parents)) = path.split_last() else {
            return Element::Missing;
        };
        let mut current = self;
        for step in parents {
            match current.get(step.as_ref()) {
                Some(Bson::Document(sub)) => current = sub,
                _ => return Element::Missing,
            }
        }
        current.element(last.as_ref())
    }

    fn set_at<S: AsRef<str>>(&mut self, path: &[S], value: Bson) -> bool {
        let Some((last, parents)) = path.split_last() else {
            return false;
        };
        let mut current = self;
        for step in parents {
            let entry = current
                .entry(step.as_ref().to_string())
                .or_insert_with(|| Bson::Document(Document::new()));
            match entry {
                Bson::Document(sub) => current = sub,
                _ => return false,
            }
        }
        current.insert(last.as_ref(), value);
        true
    }
}

/// Human-readable name of a value's wire type.
pub fn wire_type_name(bson: &Bson) -> &'static str {
    match bson {
        Bson::Double(_) => "double",
        Bson::String(_) => "string",
        Bson::Array(_) => "array",
        Bson::Document(_) => "document",
        Bson::Boolean(_) => "bool",
        Bson::Null => "null",
        Bson::Int32(_) => "int",
        Bson::Int64(_) => "long",
        Bson::DateTime(_) => "date",
        Bson::Binary(_) => "binData",
        Bson::ObjectId(_) => "objectId",
        Bson::Decimal128(_) => "decimal",
        Bson::RegularExpression(_) => "regex",
        Bson::JavaScriptCode(_) | Bson::JavaScriptCodeWithScope(_) => "javascript",
        Bson::Timestamp(_) => "timestamp",
        Bson::Symbol(_) => "symbol",
        Bson::Undefined => "undefined",
        Bson::MaxKey => "maxKey",
        Bson::MinKey => "minKey",
        Bson::DbPointer(_) => "dbPointer",
    }
}
