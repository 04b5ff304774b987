//! Per-query projection assembly.

use std::fmt;
use std::sync::Arc;

use bson::{Bson, Document};
use indexmap::IndexMap;
use prax_schema::{EntityType, Model};
use smol_str::SmolStr;
use tracing::debug;

use crate::error::{MongoError, MongoResult};
use crate::expression::{EntityProjectionExpression, MongoExpression};

/// A path of member names into the shaped query result. The empty path is the result itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ProjectionMember {
    steps: Vec<SmolStr>,
}

impl ProjectionMember {
    /// The empty path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Extend the path by one member.
    pub fn append(&self, member: impl Into<SmolStr>) -> Self {
        let mut steps = self.steps.clone();
        steps.push(member.into());
        Self { steps }
    }

    /// The member names.
    pub fn steps(&self) -> &[SmolStr] {
        &self.steps
    }

    /// The last member name.
    pub fn last(&self) -> Option<&str> {
        self.steps.last().map(SmolStr::as_str)
    }

    /// Check if this is the empty path.
    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Display for ProjectionMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            write!(f, "<root>")
        } else {
            write!(f, "{}", self.steps.join("."))
        }
    }
}

/// Member paths mapped to the expressions that produce them, in insertion order.
pub type ProjectionMapping = IndexMap<ProjectionMember, MongoExpression>;

/// One entry of a finalized projection.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionEntry {
    /// The projected expression.
    pub expression: MongoExpression,
    /// The output field name, if one could be derived.
    pub alias: Option<SmolStr>,
}

impl ProjectionEntry {
    /// The output field name for the entry at `index`.
    pub fn output_name(&self, index: usize) -> String {
        match &self.alias {
            Some(alias) => alias.to_string(),
            None => format!("_{index}"),
        }
    }
}

/// The mutable state of one query translation.
///
/// Starts with a single mapping from the empty member path to a projection of
/// the queried entity. Translation adds and replaces mappings, then
/// [`apply_projection`](Self::apply_projection) flattens them into an ordered,
/// deduplicated list with unique aliases. Not shared between threads.
#[derive(Debug)]
pub struct QueryExpression {
    collection: SmolStr,
    entity: Arc<EntityType>,
    model: Arc<Model>,
    projection_mapping: ProjectionMapping,
    projection: Vec<ProjectionEntry>,
}

impl QueryExpression {
    /// Start a query over the collection of `entity`.
    pub fn new(model: Arc<Model>, entity: &str) -> MongoResult<Self> {
        let entity_type = model.entity(entity).cloned().ok_or_else(|| {
            MongoError::config(format!("entity type `{entity}` is not part of the model"))
        })?;
        let collection = entity_type.collection_name.clone().ok_or_else(|| {
            MongoError::config(format!("entity type `{entity}` is not mapped to a collection"))
        })?;

        let root = EntityProjectionExpression::root(Arc::clone(&entity_type), Arc::clone(&model));
        let mut projection_mapping = ProjectionMapping::new();
        projection_mapping
            .insert(ProjectionMember::root(), MongoExpression::EntityProjection(root));

        Ok(Self {
            collection,
            entity: entity_type,
            model,
            projection_mapping,
            projection: Vec::new(),
        })
    }

    /// The source collection.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The queried entity type.
    pub fn entity(&self) -> &Arc<EntityType> {
        &self.entity
    }

    /// The model.
    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    /// The pending member mappings.
    pub fn projection_mapping(&self) -> &ProjectionMapping {
        &self.projection_mapping
    }

    /// Replace all member mappings.
    pub fn replace_projection_mapping(&mut self, mapping: ProjectionMapping) {
        self.projection_mapping = mapping;
    }

    /// The flat projection list. Empty until entries are added or the projection is applied.
    pub fn projection(&self) -> &[ProjectionEntry] {
        &self.projection
    }

    /// Look up the expression mapped to a member.
    ///
    /// A missing member means the projection tree was built incorrectly.
    pub fn get_mapped_projection(
        &self,
        member: &ProjectionMember,
    ) -> MongoResult<&MongoExpression> {
        self.projection_mapping.get(member).ok_or_else(|| {
            MongoError::internal(format!("projection member `{member}` is not mapped"))
        })
    }

    /// Add an expression to the flat projection and return its index.
    ///
    /// An expression equal to an existing entry reuses that entry's index.
    /// Aliases that collide case-insensitively with an existing output name
    /// get a numeric suffix. An entry without an alias keeps its positional
    /// name unless another entry already took it.
    pub fn add_to_projection(&mut self, expression: MongoExpression, alias: Option<&str>) -> usize {
        if let Some(index) = self.projection.iter().position(|e| e.expression == expression) {
            return index;
        }

        let index = self.projection.len();
        let alias = match alias.or_else(|| expression.name()) {
            Some(base) => Some(self.unique_alias(base)),
            None => {
                let positional = format!("_{index}");
                self.is_taken(&positional)
                    .then(|| self.unique_alias(&positional))
            }
        };

        self.projection.push(ProjectionEntry { expression, alias });
        index
    }

    fn is_taken(&self, candidate: &str) -> bool {
        let candidate = candidate.to_lowercase();
        self.projection
            .iter()
            .enumerate()
            .any(|(index, entry)| entry.output_name(index).to_lowercase() == candidate)
    }

    fn unique_alias(&self, base: &str) -> SmolStr {
        if !self.is_taken(base) {
            return SmolStr::new(base);
        }
        let mut counter = 0usize;
        loop {
            let candidate = format!("{base}{counter}");
            if !self.is_taken(&candidate) {
                return SmolStr::new(candidate);
            }
            counter += 1;
        }
    }

    /// Flatten every pending member mapping into the projection list.
    ///
    /// Each mapping is replaced by a [`MongoExpression::ProjectionIndex`]
    /// placeholder. Does nothing once a projection list exists.
    pub fn apply_projection(&mut self) {
        if !self.projection.is_empty() {
            return;
        }

        let members: Vec<ProjectionMember> = self.projection_mapping.keys().cloned().collect();
        for member in members {
            let Some(expression) = self.projection_mapping.get(&member).cloned() else {
                continue;
            };
            if matches!(expression, MongoExpression::ProjectionIndex(_)) {
                continue;
            }
            let index = self.add_to_projection(expression, member.last());
            self.projection_mapping
                .insert(member, MongoExpression::ProjectionIndex(index));
        }

        debug!(
            collection = %self.collection,
            entries = self.projection.len(),
            "Projection applied"
        );
    }

    /// Render the flat projection as a `$project` stage.
    ///
    /// Entries without an alias are named by position (`_0`, `_1`, ...).
    pub fn to_project_stage(&self) -> MongoResult<Document> {
        let mut fields = Document::new();
        for (index, entry) in self.projection.iter().enumerate() {
            let path = entry.expression.field_path().ok_or_else(|| {
                MongoError::internal(format!("projection entry {index} has no field path"))
            })?;
            let source = if path.is_empty() {
                "$$ROOT".to_string()
            } else {
                format!("${}", path.join("."))
            };
            fields.insert(entry.output_name(index), Bson::String(source));
        }
        let mut stage = Document::new();
        stage.insert("$project", fields);
        Ok(stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::fixtures;
    use bson::doc;
    use pretty_assertions::assert_eq;

    fn query() -> QueryExpression {
        QueryExpression::new(fixtures::model(), "Customer").unwrap()
    }

    fn root_projection(query: &QueryExpression) -> Arc<EntityProjectionExpression> {
        Arc::clone(
            query
                .get_mapped_projection(&ProjectionMember::root())
                .unwrap()
                .as_entity_projection()
                .unwrap(),
        )
    }

    fn independent_member(name: &str) -> MongoExpression {
        let model = fixtures::model();
        let customer = Arc::clone(model.entity("Customer").unwrap());
        EntityProjectionExpression::root(customer, model)
            .bind_member(name)
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_new_query_maps_root() {
        let query = query();
        assert_eq!(query.collection(), "customers");
        assert_eq!(query.projection_mapping().len(), 1);
        assert!(query.projection().is_empty());
        assert!(QueryExpression::new(fixtures::model(), "Address").is_err());
        assert!(QueryExpression::new(fixtures::model(), "Missing").is_err());
    }

    #[test]
    fn test_add_to_projection_deduplicates() {
        let mut query = query();
        let first = query.add_to_projection(independent_member("age"), None);
        let second = query.add_to_projection(independent_member("age"), None);
        assert_eq!(first, second);
        assert_eq!(query.projection().len(), 1);
    }

    #[test]
    fn test_alias_collisions_are_case_insensitive() {
        let mut query = query();
        let root = root_projection(&query);
        let upper = root.bind_member("Name").unwrap().unwrap();
        let lower = root.bind_member("name").unwrap().unwrap();

        query.add_to_projection(upper, None);
        query.add_to_projection(lower, None);
        query.add_to_projection(independent_member("age"), Some("NAME"));

        let aliases: Vec<_> = query
            .projection()
            .iter()
            .map(|e| e.alias.clone().unwrap())
            .collect();
        assert_eq!(aliases, vec!["Name", "name0", "NAME1"]);
    }

    #[test]
    fn test_alias_collisions_fold_non_ascii_case() {
        let mut query = query();
        let root = root_projection(&query);
        query.add_to_projection(independent_member("age"), Some("Émile"));
        query.add_to_projection(root.bind_member("name").unwrap().unwrap(), Some("émile"));
        assert_eq!(query.projection()[1].alias.as_deref(), Some("émile0"));
    }

    #[test]
    fn test_positional_names_never_collide() {
        let mut query = query();
        let root = MongoExpression::EntityProjection(root_projection(&query));
        query.add_to_projection(independent_member("age"), Some("_1"));
        let index = query.add_to_projection(root, None);
        assert_eq!(index, 1);
        assert_eq!(query.projection()[1].output_name(1), "_10");
        assert_eq!(
            query.to_project_stage().unwrap(),
            doc! { "$project": { "_1": "$age", "_10": "$$ROOT" } }
        );

        // A later alias equal to an unaliased entry's positional name is suffixed too.
        let mut reversed = QueryExpression::new(fixtures::model(), "Customer").unwrap();
        let root = MongoExpression::EntityProjection(root_projection(&reversed));
        reversed.add_to_projection(root, None);
        reversed.add_to_projection(independent_member("age"), Some("_0"));
        assert_eq!(reversed.projection()[1].alias.as_deref(), Some("_00"));
    }

    #[test]
    fn test_apply_projection_replaces_mappings() {
        let mut query = query();
        let root = root_projection(&query);
        let mut mapping = ProjectionMapping::new();
        mapping.insert(
            ProjectionMember::root().append("city"),
            root.bind_member("address")
                .unwrap()
                .unwrap()
                .as_entity_projection()
                .unwrap()
                .bind_member("city")
                .unwrap()
                .unwrap(),
        );
        mapping.insert(
            ProjectionMember::root().append("years"),
            root.bind_member("age").unwrap().unwrap(),
        );
        mapping.insert(
            ProjectionMember::root().append("again"),
            independent_member("age"),
        );
        query.replace_projection_mapping(mapping);

        query.apply_projection();
        assert_eq!(query.projection().len(), 2);
        assert_eq!(
            query
                .get_mapped_projection(&ProjectionMember::root().append("again"))
                .unwrap(),
            &MongoExpression::ProjectionIndex(1)
        );
        assert_eq!(
            query.to_project_stage().unwrap(),
            doc! { "$project": { "city": "$address.city", "years": "$age" } }
        );

        // Applying again is a no-op.
        query.apply_projection();
        assert_eq!(query.projection().len(), 2);
    }

    #[test]
    fn test_root_projection_renders_as_root() {
        let mut query = query();
        query.apply_projection();
        assert_eq!(query.projection()[0].alias, None);
        assert_eq!(
            query.to_project_stage().unwrap(),
            doc! { "$project": { "_0": "$$ROOT" } }
        );
    }

    #[test]
    fn test_missing_mapping_is_internal_error() {
        let query = query();
        let err = query
            .get_mapped_projection(&ProjectionMember::root().append("nope"))
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Internal);
    }
}
