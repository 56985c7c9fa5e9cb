//! Remote entity schema types and the relational projection derived from them.
//!
//! The remote management API describes every resource type as an [`Entity`]
//! with a map of [`EntityProperty`] descriptors. This module deserializes that
//! document and maps each property onto a relational [`Column`] (the type
//! mapper), producing one [`TableDefinition`] per entity.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Property type tag of an association (relation) property.
pub const ASSOCIATION_TYPE: &str = "association";

/// Flag key marking a property as part of the primary key.
pub const PRIMARY_KEY_FLAG: &str = "primary_key";

/// Relation tag of a many-to-many association.
pub const MANY_TO_MANY_RELATION: &str = "many_to_many";

/// Column comment attached to structured (JSON-valued) columns.
pub const JSON_COMMENT: &str = "json";

/// Converts an entity name to the form used in remote API paths and labels.
///
/// # Examples
///
/// ```
/// use shopsql_core::api_entity_name;
///
/// assert_eq!(api_entity_name("product_category"), "product-category");
/// assert_eq!(api_entity_name("product"), "product");
/// ```
pub fn api_entity_name(name: &str) -> String {
    name.replace('_', "-")
}

/// A remote resource type as described by the entity schema document.
///
/// # Examples
///
/// ```
/// use shopsql_core::Entity;
///
/// let entity: Entity = serde_json::from_str(r#"{
///     "entity": "product",
///     "properties": {
///         "id": { "type": "uuid", "flags": { "primary_key": true } },
///         "name": { "type": "string", "flags": {} },
///         "categories": { "type": "association", "relation": "many_to_many",
///                         "entity": "category", "mapping": "product_category" }
///     }
/// }"#).unwrap();
///
/// let columns = entity.columns();
/// assert_eq!(columns.len(), 2);
/// assert_eq!(columns[0].name, "id");
/// assert_eq!(entity.mapping_tables(), vec!["product_category"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Entity name (e.g. `product`, `product_category`).
    #[serde(rename = "entity", default)]
    pub name: String,
    /// Properties keyed by property name.
    #[serde(default)]
    pub properties: HashMap<String, EntityProperty>,
}

impl Entity {
    /// Creates an empty entity with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: HashMap::new(),
        }
    }

    /// Adds a property, replacing any existing one with the same name.
    pub fn with_property(mut self, name: impl Into<String>, property: EntityProperty) -> Self {
        self.properties.insert(name.into(), property);
        self
    }

    /// Names of the junction entities declared by this entity's
    /// many-to-many associations, sorted and deduplicated.
    pub fn mapping_tables(&self) -> Vec<&str> {
        let mut tables: Vec<&str> = self
            .properties
            .values()
            .filter(|p| p.relation.as_deref() == Some(MANY_TO_MANY_RELATION))
            .filter_map(|p| p.mapping.as_deref())
            .filter(|m| !m.is_empty())
            .collect();
        tables.sort_unstable();
        tables.dedup();
        tables
    }

    /// Derives the relational column list for this entity.
    ///
    /// Association properties are skipped. Primary-key columns come first,
    /// the rest follow sorted by name, so the order is deterministic even
    /// though the property map is not.
    pub fn columns(&self) -> Vec<Column> {
        let mut columns: Vec<Column> = self
            .properties
            .iter()
            .filter(|(_, property)| !property.is_association())
            .map(|(name, property)| Column::from_property(name, &self.name, property))
            .collect();

        columns.sort_by(|a, b| {
            b.primary_key
                .cmp(&a.primary_key)
                .then_with(|| a.name.cmp(&b.name))
        });
        columns
    }
}

/// One field of an [`Entity`].
///
/// `flags` is kept as raw JSON because the remote API emits an object for
/// flagged properties and an empty array for unflagged ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityProperty {
    /// Remote type tag (`uuid`, `string`, `date`, `json_object`, ...).
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Relation descriptor for associations (e.g. `many_to_one`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
    /// Target entity of an association.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    /// Junction entity of a many-to-many association.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<serde_json::Value>,
}

impl EntityProperty {
    /// Creates a property with the given type tag and no flags.
    ///
    /// # Examples
    ///
    /// ```
    /// use shopsql_core::{ColumnType, EntityProperty};
    ///
    /// let prop = EntityProperty::new("uuid").primary();
    /// assert!(prop.is_primary());
    /// assert_eq!(prop.column_type(), ColumnType::Text);
    /// ```
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    /// Marks the property as a primary-key component.
    pub fn primary(mut self) -> Self {
        let mut flags = match self.flags.take() {
            Some(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        flags.insert(PRIMARY_KEY_FLAG.to_string(), serde_json::Value::Bool(true));
        self.flags = Some(serde_json::Value::Object(flags));
        self
    }

    /// Declares a many-to-many association through `mapping`.
    pub fn many_to_many(entity: &str, mapping: &str) -> Self {
        Self {
            kind: ASSOCIATION_TYPE.to_string(),
            relation: Some(MANY_TO_MANY_RELATION.to_string()),
            entity: Some(entity.to_string()),
            mapping: Some(mapping.to_string()),
            flags: None,
        }
    }

    /// Returns `true` for relation properties, which never become columns.
    pub fn is_association(&self) -> bool {
        self.kind == ASSOCIATION_TYPE
    }

    /// Maps the remote type tag to a relational column type.
    ///
    /// Unknown tags fall back to [`ColumnType::Text`].
    ///
    /// # Examples
    ///
    /// ```
    /// use shopsql_core::{ColumnType, EntityProperty};
    ///
    /// assert_eq!(EntityProperty::new("int").column_type(), ColumnType::Float64);
    /// assert_eq!(EntityProperty::new("widget-xyz").column_type(), ColumnType::Text);
    /// ```
    pub fn column_type(&self) -> ColumnType {
        match self.kind.as_str() {
            "uuid" | "string" | "date" | "json_object" => ColumnType::Text,
            ASSOCIATION_TYPE => ColumnType::Json,
            "boolean" => ColumnType::Boolean,
            "float" | "int" => ColumnType::Float64,
            _ => ColumnType::Text,
        }
    }

    /// Returns `true` if the flag set is an object carrying the primary-key
    /// marker. Any other shape means "not primary".
    pub fn is_primary(&self) -> bool {
        match &self.flags {
            Some(serde_json::Value::Object(flags)) => flags.contains_key(PRIMARY_KEY_FLAG),
            _ => false,
        }
    }

    /// Comment tagging structured columns whose values are re-serialized
    /// to JSON during materialization.
    pub fn comment(&self) -> Option<&'static str> {
        self.kind.starts_with("json").then_some(JSON_COMMENT)
    }
}

/// Relational type of a materialized column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Text,
    Json,
    Boolean,
    Float64,
}

impl ColumnType {
    /// SQL name of the type as shown to clients.
    pub fn sql_name(self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Json => "JSON",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Float64 => "DOUBLE",
        }
    }
}

/// A relational column derived from an [`EntityProperty`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column (property) name.
    pub name: String,
    /// Relational type.
    pub column_type: ColumnType,
    /// `false` only for primary-key columns.
    pub nullable: bool,
    /// Whether the column is part of the primary key.
    pub primary_key: bool,
    /// Owning entity name.
    pub source: String,
    /// Optional comment; `Some("json")` marks structured content.
    pub comment: Option<String>,
}

impl Column {
    /// Applies the type mapper to one property.
    pub fn from_property(name: &str, source: &str, property: &EntityProperty) -> Self {
        let primary_key = property.is_primary();
        Self {
            name: name.to_string(),
            column_type: property.column_type(),
            nullable: !primary_key,
            primary_key,
            source: source.to_string(),
            comment: property.comment().map(String::from),
        }
    }

    /// Returns `true` if values of this column are re-serialized JSON.
    pub fn is_json(&self) -> bool {
        self.comment.as_deref() == Some(JSON_COMMENT)
    }
}

/// Column layout of one table plus its junction flag.
///
/// Built once per entity at adapter startup and shared by every statement
/// that touches the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDefinition {
    /// Entity name, used as the table name.
    pub name: String,
    /// Ordered column list.
    pub columns: Vec<Column>,
    /// Whether the entity is a many-to-many junction entity. Exposed for
    /// callers, not consulted by the read or write path.
    pub is_mapping: bool,
}

impl TableDefinition {
    /// Builds the definition of `entity`, falling back to `name` when the
    /// entity document carries no name of its own.
    pub fn from_entity(name: &str, entity: &Entity, is_mapping: bool) -> Self {
        let table_name = if entity.name.is_empty() {
            name
        } else {
            entity.name.as_str()
        };
        let mut columns = entity.columns();
        for column in &mut columns {
            if column.source.is_empty() {
                column.source = table_name.to_string();
            }
        }
        Self {
            name: table_name.to_string(),
            columns,
            is_mapping,
        }
    }

    /// Ordinals of the primary-key columns in schema order.
    pub fn primary_key_ordinals(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.primary_key)
            .map(|(i, _)| i)
            .collect()
    }

    /// Position of the column called `name`, if any.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Name used for this entity in remote API paths.
    pub fn api_name(&self) -> String {
        api_entity_name(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> Entity {
        Entity::new("product")
            .with_property("id", EntityProperty::new("uuid").primary())
            .with_property("name", EntityProperty::new("string"))
            .with_property("active", EntityProperty::new("boolean"))
            .with_property("stock", EntityProperty::new("int"))
            .with_property("customFields", EntityProperty::new("json_object"))
            .with_property(
                "categories",
                EntityProperty::many_to_many("category", "product_category"),
            )
    }

    #[test]
    fn test_type_mapping() {
        let cases = [
            ("uuid", ColumnType::Text),
            ("string", ColumnType::Text),
            ("date", ColumnType::Text),
            ("json_object", ColumnType::Text),
            ("association", ColumnType::Json),
            ("boolean", ColumnType::Boolean),
            ("float", ColumnType::Float64),
            ("int", ColumnType::Float64),
            ("widget-xyz", ColumnType::Text),
            ("", ColumnType::Text),
        ];
        for (tag, expected) in cases {
            assert_eq!(EntityProperty::new(tag).column_type(), expected, "tag {tag}");
        }
    }

    #[test]
    fn test_json_comment_only_for_json_tags() {
        assert_eq!(EntityProperty::new("json_object").comment(), Some("json"));
        assert_eq!(EntityProperty::new("json_list").comment(), Some("json"));
        assert_eq!(EntityProperty::new("string").comment(), None);
    }

    #[test]
    fn test_primary_key_detection_tolerates_any_flag_shape() {
        let mut prop = EntityProperty::new("uuid");
        assert!(!prop.is_primary());

        prop.flags = Some(serde_json::json!([]));
        assert!(!prop.is_primary());

        prop.flags = Some(serde_json::json!("primary_key"));
        assert!(!prop.is_primary());

        prop.flags = Some(serde_json::json!({ "required": true }));
        assert!(!prop.is_primary());

        prop.flags = Some(serde_json::json!({ "primary_key": true, "required": true }));
        assert!(prop.is_primary());
    }

    #[test]
    fn test_columns_skip_associations() {
        let columns = product().columns();
        assert!(columns.iter().all(|c| c.name != "categories"));
        assert_eq!(columns.len(), 5);
    }

    #[test]
    fn test_columns_primary_key_first_then_by_name() {
        let names: Vec<String> = product().columns().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["id", "active", "customFields", "name", "stock"]);
    }

    #[test]
    fn test_primary_column_is_not_nullable() {
        let columns = product().columns();
        assert!(columns[0].primary_key);
        assert!(!columns[0].nullable);
        assert!(columns[1..].iter().all(|c| c.nullable && !c.primary_key));
    }

    #[test]
    fn test_compound_primary_key_ordinals() {
        let entity = Entity::new("product_category")
            .with_property("productId", EntityProperty::new("uuid").primary())
            .with_property("categoryId", EntityProperty::new("uuid").primary())
            .with_property("product", EntityProperty::new("association"));
        let def = TableDefinition::from_entity("product_category", &entity, true);
        assert_eq!(def.primary_key_ordinals(), vec![0, 1]);
        assert_eq!(def.columns[0].name, "categoryId");
        assert_eq!(def.api_name(), "product-category");
        assert!(def.is_mapping);
    }

    #[test]
    fn test_definition_falls_back_to_registry_name() {
        let mut entity = product();
        entity.name.clear();
        let def = TableDefinition::from_entity("product", &entity, false);
        assert_eq!(def.name, "product");
        assert!(def.columns.iter().all(|c| c.source == "product"));
    }

    #[test]
    fn test_mapping_tables_ignore_other_relations() {
        let mut entity = product();
        entity.properties.insert(
            "manufacturer".into(),
            EntityProperty {
                kind: "association".into(),
                relation: Some("many_to_one".into()),
                entity: Some("product_manufacturer".into()),
                mapping: None,
                flags: None,
            },
        );
        assert_eq!(entity.mapping_tables(), vec!["product_category"]);
    }

    #[test]
    fn test_deserialize_schema_document_with_array_flags() {
        let raw = r#"{
            "entity": "tax",
            "properties": {
                "id": { "type": "uuid", "flags": { "primary_key": true, "required": true } },
                "taxRate": { "type": "float", "flags": [] },
                "name": { "type": "string" }
            }
        }"#;
        let entity: Entity = serde_json::from_str(raw).unwrap();
        let def = TableDefinition::from_entity("tax", &entity, false);
        assert_eq!(def.primary_key_ordinals(), vec![0]);
        assert_eq!(def.index_of("taxRate"), Some(2));
        assert_eq!(def.columns[2].column_type, ColumnType::Float64);
    }
}
