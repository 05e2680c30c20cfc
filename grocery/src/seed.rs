//! First-run template.

use crate::types::{Item, ItemId};

const TEMPLATE: &[&str] = &["Milk", "Eggs", "Bread", "Bananas", "Coffee"];

/// Items shown the first time the app runs, with ids `seed-1`, `seed-2`, ...
#[must_use]
pub fn template() -> Vec<Item> {
    TEMPLATE
        .iter()
        .enumerate()
        .map(|(i, name)| Item::new(ItemId::new(format!("seed-{}", i + 1)), *name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn template_ids_are_unique_and_stable() {
        let items = template();
        let ids: HashSet<_> = items.iter().map(|item| item.id.clone()).collect();

        assert_eq!(ids.len(), items.len());
        assert_eq!(items[0].id.as_str(), "seed-1");
        assert!(items.iter().all(|item| !item.favorite));
    }
}
