//! Product catalog and embedding store
//!
//! Items are loaded once from external artifacts, validated, and then held
//! read-only. The store is the single owner of every item vector the
//! scorers look at.

use crate::embedding::{magnitude, Embedding};
use crate::error::{FindabilityError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub mod loaders;

pub use loaders::*;

/// Channel an embedding represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Image,
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modality::Text => write!(f, "text"),
            Modality::Image => write!(f, "image"),
        }
    }
}

/// A catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique key (product id)
    #[serde(alias = "product_id")]
    pub id: String,
    /// Product name
    #[serde(alias = "title")]
    pub name: String,
    /// Free-text description, possibly enriched upstream
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    /// Opaque reference to the item's image
    #[serde(default)]
    pub image_path: Option<String>,
    /// Catalog page the item was extracted from
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_embedding: Option<Embedding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_embedding: Option<Embedding>,
}

impl Item {
    /// Create an item with no embeddings
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            category: String::new(),
            image_path: None,
            page: None,
            text_embedding: None,
            image_embedding: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_text_embedding(mut self, embedding: Embedding) -> Self {
        self.text_embedding = Some(embedding);
        self
    }

    pub fn with_image_embedding(mut self, embedding: Embedding) -> Self {
        self.image_embedding = Some(embedding);
        self
    }

    /// Vector for the given modality, if present
    pub fn embedding(&self, modality: Modality) -> Option<&[f32]> {
        match modality {
            Modality::Text => self.text_embedding.as_deref(),
            Modality::Image => self.image_embedding.as_deref(),
        }
    }

    fn embedding_slot(&mut self, modality: Modality) -> &mut Option<Embedding> {
        match modality {
            Modality::Text => &mut self.text_embedding,
            Modality::Image => &mut self.image_embedding,
        }
    }

    /// Text sent to the embedding service: name followed by description
    pub fn embedding_text(&self) -> String {
        format!("{} {}", self.name, self.description)
    }

    /// Fields searched by the keyword scorer
    pub fn keyword_fields(&self) -> [&str; 3] {
        [&self.name, &self.description, &self.category]
    }
}

/// Read-only collection of items and their vectors
#[derive(Debug, Clone, Default)]
pub struct EmbeddingStore {
    items: Vec<Item>,
    by_id: HashMap<String, usize>,
    by_folded_id: HashMap<String, usize>,
    text_dimension: Option<usize>,
    image_dimension: Option<usize>,
}

impl EmbeddingStore {
    /// Validate items and build the store.
    ///
    /// Fails with `CorruptArtifact` on duplicate ids, empty or non-finite
    /// vectors, or mixed dimensionality within a modality. Zero-magnitude
    /// vectors carry no direction and are dropped as if absent.
    pub fn new(items: Vec<Item>) -> Result<Self> {
        let mut items = items;
        let mut by_id = HashMap::with_capacity(items.len());
        let mut by_folded_id = HashMap::with_capacity(items.len());
        let mut text_dimension = None;
        let mut image_dimension = None;

        for (idx, item) in items.iter_mut().enumerate() {
            if item.id.trim().is_empty() {
                return Err(FindabilityError::corrupt(format!(
                    "item at position {} has an empty id",
                    idx
                )));
            }
            if by_id.insert(item.id.clone(), idx).is_some() {
                return Err(FindabilityError::corrupt(format!(
                    "duplicate item id '{}'",
                    item.id
                )));
            }
            by_folded_id.entry(item.id.to_lowercase()).or_insert(idx);

            check_embedding(item, Modality::Text, &mut text_dimension)?;
            check_embedding(item, Modality::Image, &mut image_dimension)?;
        }

        tracing::info!(
            "Embedding store built: {} items (text dim {:?}, image dim {:?})",
            items.len(),
            text_dimension,
            image_dimension
        );

        Ok(Self {
            items,
            by_id,
            by_folded_id,
            text_dimension,
            image_dimension,
        })
    }

    /// Vector of `item_id` for `modality`
    pub fn get_vector(&self, item_id: &str, modality: Modality) -> Result<&[f32]> {
        let item = self
            .get(item_id)
            .ok_or_else(|| FindabilityError::NotFound(format!("item '{}'", item_id)))?;
        item.embedding(modality).ok_or_else(|| {
            FindabilityError::NotFound(format!("{} embedding for item '{}'", modality, item_id))
        })
    }

    /// All items in source order
    pub fn all_items(&self) -> &[Item] {
        &self.items
    }

    /// Items that carry a vector for `modality`, in source order
    pub fn embedded(&self, modality: Modality) -> impl Iterator<Item = (&Item, &[f32])> {
        self.items
            .iter()
            .filter_map(move |item| item.embedding(modality).map(|v| (item, v)))
    }

    /// Exact id lookup
    pub fn get(&self, item_id: &str) -> Option<&Item> {
        self.by_id.get(item_id).map(|&idx| &self.items[idx])
    }

    /// Exact id lookup, falling back to a case-insensitive match
    pub fn find(&self, item_id: &str) -> Option<&Item> {
        let item_id = item_id.trim();
        self.get(item_id).or_else(|| {
            self.by_folded_id
                .get(&item_id.to_lowercase())
                .map(|&idx| &self.items[idx])
        })
    }

    /// Shared dimensionality of `modality`, if any item has such a vector
    pub fn dimension(&self, modality: Modality) -> Option<usize> {
        match modality {
            Modality::Text => self.text_dimension,
            Modality::Image => self.image_dimension,
        }
    }

    /// Number of items with a vector for `modality`
    pub fn embedded_count(&self, modality: Modality) -> usize {
        self.embedded(modality).count()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn check_embedding(
    item: &mut Item,
    modality: Modality,
    dimension: &mut Option<usize>,
) -> Result<()> {
    let id = item.id.clone();
    let slot = item.embedding_slot(modality);
    let Some(vector) = slot.as_ref() else {
        return Ok(());
    };

    if vector.is_empty() {
        return Err(FindabilityError::corrupt(format!(
            "item '{}' has an empty {} embedding",
            id, modality
        )));
    }
    if vector.iter().any(|v| !v.is_finite()) {
        return Err(FindabilityError::corrupt(format!(
            "item '{}' has a non-finite value in its {} embedding",
            id, modality
        )));
    }

    match *dimension {
        Some(expected) if expected != vector.len() => {
            return Err(FindabilityError::corrupt(format!(
                "item '{}' {} embedding has dimension {}, expected {}",
                id,
                modality,
                vector.len(),
                expected
            )));
        }
        Some(_) => {}
        None => *dimension = Some(vector.len()),
    }

    if magnitude(vector) == 0.0 {
        tracing::warn!(
            "Item '{}' has a zero {} embedding; treating it as missing",
            id,
            modality
        );
        *slot = None;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_items() -> Vec<Item> {
        vec![
            Item::new("A", "Caution Label Yellow").with_text_embedding(vec![1.0, 0.0]),
            Item::new("B", "Hydraulic Pump").with_text_embedding(vec![0.0, 1.0]),
            Item::new("C", "Seal Kit"),
        ]
    }

    #[test]
    fn test_store_lookup() {
        let store = EmbeddingStore::new(sample_items()).unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(store.dimension(Modality::Text), Some(2));
        assert_eq!(store.dimension(Modality::Image), None);
        assert_eq!(store.get_vector("A", Modality::Text).unwrap(), &[1.0, 0.0]);
        assert_eq!(store.embedded_count(Modality::Text), 2);

        let ids: Vec<&str> = store.all_items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_missing_modality_is_not_found() {
        let store = EmbeddingStore::new(sample_items()).unwrap();

        assert!(matches!(
            store.get_vector("C", Modality::Text),
            Err(FindabilityError::NotFound(_))
        ));
        assert!(matches!(
            store.get_vector("A", Modality::Image),
            Err(FindabilityError::NotFound(_))
        ));
        assert!(matches!(
            store.get_vector("Z", Modality::Text),
            Err(FindabilityError::NotFound(_))
        ));
    }

    #[test]
    fn test_dimension_mismatch_is_corrupt() {
        let mut items = sample_items();
        items.push(Item::new("D", "Filter").with_text_embedding(vec![1.0, 0.0, 0.0]));

        assert!(matches!(
            EmbeddingStore::new(items),
            Err(FindabilityError::CorruptArtifact(_))
        ));
    }

    #[test]
    fn test_modalities_have_independent_dimensions() {
        let items = vec![
            Item::new("A", "a")
                .with_text_embedding(vec![1.0, 0.0])
                .with_image_embedding(vec![1.0, 0.0, 0.0]),
            Item::new("B", "b").with_image_embedding(vec![0.0, 1.0, 0.0]),
        ];
        let store = EmbeddingStore::new(items).unwrap();

        assert_eq!(store.dimension(Modality::Text), Some(2));
        assert_eq!(store.dimension(Modality::Image), Some(3));
    }

    #[test]
    fn test_duplicate_ids_are_corrupt() {
        let items = vec![Item::new("A", "one"), Item::new("A", "two")];
        assert!(matches!(
            EmbeddingStore::new(items),
            Err(FindabilityError::CorruptArtifact(_))
        ));
    }

    #[test]
    fn test_empty_and_non_finite_vectors_are_corrupt() {
        let empty = vec![Item::new("A", "a").with_text_embedding(vec![])];
        assert!(EmbeddingStore::new(empty).is_err());

        let nan = vec![Item::new("A", "a").with_text_embedding(vec![f32::NAN, 1.0])];
        assert!(EmbeddingStore::new(nan).is_err());
    }

    #[test]
    fn test_zero_vector_is_dropped() {
        let items = vec![
            Item::new("A", "a").with_image_embedding(vec![0.0, 0.0, 0.0]),
            Item::new("B", "b").with_image_embedding(vec![0.0, 1.0, 0.0]),
        ];
        let store = EmbeddingStore::new(items).unwrap();

        assert!(store.get_vector("A", Modality::Image).is_err());
        assert_eq!(store.embedded_count(Modality::Image), 1);
        assert_eq!(store.dimension(Modality::Image), Some(3));
    }

    #[test]
    fn test_case_insensitive_find() {
        let items = vec![Item::new("TVH-100", "Label"), Item::new("tvh-100b", "Other")];
        let store = EmbeddingStore::new(items).unwrap();

        assert!(store.get("tvh-100").is_none());
        assert_eq!(store.find("tvh-100").unwrap().id, "TVH-100");
        assert_eq!(store.find(" TVH-100 ").unwrap().id, "TVH-100");
        assert!(store.find("missing").is_none());
    }

    #[test]
    fn test_embedding_text() {
        let item = Item::new("A", "Caution Label").with_description("Yellow, 50mm");
        assert_eq!(item.embedding_text(), "Caution Label Yellow, 50mm");
    }
}
