//! Entity registry: the schema cache built once at adapter startup.
//!
//! [`EntityRegistry::load`] fetches the entity schema document from the
//! admin API with a single request, indexes the entities by name and
//! precomputes the set of many-to-many junction ("mapping") entities.
//!
//! ```no_run
//! use shopsql_client::{EntityRegistry, HttpAdminApi, ShopConfig};
//! use shopsql_core::QueryContext;
//!
//! let config = ShopConfig::load(".shopware-project.yml").unwrap();
//! let api = HttpAdminApi::new(&config).unwrap();
//! let registry = EntityRegistry::load(&api, &QueryContext::new()).unwrap();
//!
//! if let Some(product) = registry.get("product") {
//!     println!("product has {} properties", product.properties.len());
//! }
//! assert!(registry.is_mapping("product_category"));
//! ```
//!
//! All lookups are O(1) via the internal `HashMap`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use shopsql_core::{Entity, QueryContext, TableDefinition};
use tracing::{info, warn};

use crate::api::{AdminApi, ENTITY_SCHEMA_PATH, get_json};
use crate::error::Result;

/// Describes where an [`EntityRegistry`] was loaded from.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistrySource {
    /// Fetched from the admin API.
    Remote,
    /// Read from a saved entity schema document.
    File(PathBuf),
    /// Built in memory from already decoded entities.
    Memory,
}

/// Entities of one shop, indexed by name.
#[derive(Debug)]
pub struct EntityRegistry {
    entities: HashMap<String, Entity>,
    mapping_entities: HashSet<String>,
    source: RegistrySource,
}

impl EntityRegistry {
    /// Fetches and indexes the entity schema document.
    ///
    /// Sends exactly one request; there is no retry.
    ///
    /// # Errors
    ///
    /// Returns a transport-class [`ApiError`](crate::ApiError) if the
    /// request fails, or [`ApiError::Decode`](crate::ApiError::Decode) if
    /// the body is not a schema document.
    pub fn load(api: &dyn AdminApi, ctx: &QueryContext) -> Result<Self> {
        let entities: HashMap<String, Entity> = get_json(api, ctx, ENTITY_SCHEMA_PATH)?;
        let registry = Self::index(entities, RegistrySource::Remote);
        info!(
            entities = registry.len(),
            mapping_entities = registry.mapping_entities.len(),
            "loaded entity schema"
        );
        Ok(registry)
    }

    /// Reads a saved entity schema document (the body of
    /// `GET /api/_info/entity-schema.json`).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Io`](crate::ApiError::Io) if the file cannot be
    /// read, or [`ApiError::Decode`](crate::ApiError::Decode) if parsing
    /// fails.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let entities: HashMap<String, Entity> = serde_json::from_reader(reader)?;
        Ok(Self::index(entities, RegistrySource::File(path.to_path_buf())))
    }

    /// Indexes already decoded entities.
    pub fn from_entities(entities: HashMap<String, Entity>) -> Self {
        Self::index(entities, RegistrySource::Memory)
    }

    fn index(entities: HashMap<String, Entity>, source: RegistrySource) -> Self {
        let mapping_entities: HashSet<String> = entities
            .values()
            .flat_map(|entity| entity.mapping_tables())
            .map(String::from)
            .collect();

        for name in &mapping_entities {
            if !entities.contains_key(name) {
                warn!(entity = %name, "mapping entity is not part of the schema");
            }
        }

        Self {
            entities,
            mapping_entities,
            source,
        }
    }

    /// Looks up an entity by name in O(1) time.
    pub fn get(&self, name: &str) -> Option<&Entity> {
        self.entities.get(name)
    }

    /// Returns `true` if the registry contains an entity called `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    /// Returns `true` if `name` is declared as the junction entity of some
    /// many-to-many association. Unknown names are not mapping entities.
    pub fn is_mapping(&self, name: &str) -> bool {
        self.mapping_entities.contains(name)
    }

    /// Returns the number of entities in the registry.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if the registry contains no entities.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entity names, sorted.
    pub fn entity_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entities.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Junction entity names, sorted.
    pub fn mapping_entities(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.mapping_entities.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Returns a reference to the source metadata.
    pub fn source(&self) -> &RegistrySource {
        &self.source
    }

    /// Derives one table definition per entity, keyed by entity name.
    pub fn table_definitions(&self) -> BTreeMap<String, TableDefinition> {
        self.entities
            .iter()
            .map(|(name, entity)| {
                let definition = TableDefinition::from_entity(name, entity, self.is_mapping(name));
                (name.clone(), definition)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopsql_core::EntityProperty;

    fn entities() -> HashMap<String, Entity> {
        let product = Entity::new("product")
            .with_property("id", EntityProperty::new("uuid").primary())
            .with_property("name", EntityProperty::new("string"))
            .with_property(
                "categories",
                EntityProperty::many_to_many("category", "product_category"),
            )
            .with_property("tags", EntityProperty::many_to_many("tag", "product_tag"));
        let category = Entity::new("category")
            .with_property("id", EntityProperty::new("uuid").primary())
            .with_property(
                "products",
                EntityProperty::many_to_many("product", "product_category"),
            );
        let mapping = Entity::new("product_category")
            .with_property("productId", EntityProperty::new("uuid").primary())
            .with_property("categoryId", EntityProperty::new("uuid").primary());

        HashMap::from([
            ("product".to_string(), product),
            ("category".to_string(), category),
            ("product_category".to_string(), mapping),
        ])
    }

    #[test]
    fn test_mapping_entities_are_unioned() {
        let registry = EntityRegistry::from_entities(entities());
        assert_eq!(registry.mapping_entities(), vec!["product_category", "product_tag"]);
        assert!(registry.is_mapping("product_category"));
        assert!(!registry.is_mapping("product"));
        assert!(!registry.is_mapping("unknown"));
    }

    #[test]
    fn test_missing_mapping_entity_is_tolerated() {
        let registry = EntityRegistry::from_entities(entities());
        assert!(registry.is_mapping("product_tag"));
        assert!(!registry.contains("product_tag"));
        assert!(!registry.table_definitions().contains_key("product_tag"));
    }

    #[test]
    fn test_table_definitions_carry_mapping_flag() {
        let registry = EntityRegistry::from_entities(entities());
        let defs = registry.table_definitions();
        assert_eq!(defs.len(), 3);
        assert!(defs["product_category"].is_mapping);
        assert!(!defs["product"].is_mapping);
        assert_eq!(defs["product"].columns.len(), 2);
    }

    #[test]
    fn test_lookup_operations() {
        let registry = EntityRegistry::from_entities(entities());
        assert_eq!(registry.len(), 3);
        assert!(!registry.is_empty());
        assert!(registry.get("category").is_some());
        assert!(registry.get("nonexistent").is_none());
        assert_eq!(
            registry.entity_names(),
            vec!["category", "product", "product_category"]
        );
        assert_eq!(registry.source(), &RegistrySource::Memory);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entity-schema.json");
        std::fs::write(&path, serde_json::to_vec(&entities()).unwrap()).unwrap();

        let registry = EntityRegistry::from_file(&path).unwrap();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.source(), &RegistrySource::File(path));
    }

    #[test]
    fn test_from_file_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entity-schema.json");
        std::fs::write(&path, b"[1, 2, 3]").unwrap();

        let err = EntityRegistry::from_file(&path).unwrap_err();
        assert!(err.is_decode());
    }
}
