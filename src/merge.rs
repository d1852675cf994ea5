use crate::types::{Product, Retailer};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Identity of a product across a run: lowercased name plus retailer
pub type DedupKey = (String, Retailer);

pub fn dedup_key(product: &Product) -> DedupKey {
    (product.name.trim().to_lowercase(), product.retailer)
}

/// Deduplicate in one pass.
///
/// A later record with the same key replaces the earlier one but keeps the
/// position where the key was first seen.
pub fn merge_products<I>(products: I) -> Vec<Product>
where
    I: IntoIterator<Item = Product>,
{
    let mut by_key: IndexMap<DedupKey, Product> = IndexMap::new();
    for product in products {
        by_key.insert(dedup_key(&product), product);
    }
    by_key.into_values().collect()
}

/// Bring back `previous` products of retailers that failed this run.
///
/// Carried-over records go first so fresh records win on key collisions.
/// Returns the merged list and how many previous records were carried over.
pub fn carry_over(
    previous: &[Product],
    fresh: Vec<Product>,
    failed: &HashSet<Retailer>,
) -> (Vec<Product>, usize) {
    let stale: Vec<Product> = previous
        .iter()
        .filter(|p| failed.contains(&p.retailer))
        .cloned()
        .collect();
    let carried = stale.len();
    (merge_products(stale.into_iter().chain(fresh)), carried)
}
