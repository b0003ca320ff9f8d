//! Named groups of category labels, one group per reference-table column.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use leadsift_shared::{LeadSiftError, Result};
use leadsift_table::Table;

/// Group name → allowed category labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryMap {
    groups: BTreeMap<String, BTreeSet<String>>,
}

impl CategoryMap {
    /// Every column becomes a group holding that column's trimmed, non-null values.
    ///
    /// A table without a single label is rejected as malformed.
    pub fn from_table(table: &Table) -> Result<Self> {
        let mut groups = BTreeMap::new();
        for (idx, name) in table.columns().iter().enumerate() {
            let labels: BTreeSet<String> = table
                .rows()
                .iter()
                .filter_map(|row| row.get(idx).and_then(|c| c.as_str()))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect();

            if labels.is_empty() {
                warn!(group = %name, "category group has no labels");
            }
            groups.insert(name.clone(), labels);
        }

        if groups.values().all(BTreeSet::is_empty) {
            return Err(LeadSiftError::reference("category table holds no labels"));
        }

        debug!(groups = groups.len(), "category map derived");
        Ok(Self { groups })
    }

    /// Allowed labels for `group`, or `None` when the group is unknown.
    pub fn allowed(&self, group: &str) -> Option<&BTreeSet<String>> {
        self.groups.get(group)
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn groups(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.groups.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl<S: Into<String>, L: Into<String>> FromIterator<(S, Vec<L>)> for CategoryMap {
    fn from_iter<T: IntoIterator<Item = (S, Vec<L>)>>(iter: T) -> Self {
        Self {
            groups: iter
                .into_iter()
                .map(|(name, labels)| (name.into(), labels.into_iter().map(Into::into).collect()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadsift_table::{LoadOptions, load_str};

    #[test]
    fn each_column_is_a_group() {
        let text = "Restauration,Commerce\nRestaurant,Boulangerie\n Pizzeria ,\n";
        let table = load_str(text, &LoadOptions::default()).unwrap().table;
        let map = CategoryMap::from_table(&table).unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(map.group_names().collect::<Vec<_>>(), ["Commerce", "Restauration"]);
        let resto = map.allowed("Restauration").unwrap();
        assert!(resto.contains("Pizzeria"));
        assert!(resto.contains("Restaurant"));
        assert_eq!(map.allowed("Commerce").unwrap().len(), 1);
        assert!(map.allowed("Unknown").is_none());
    }

    #[test]
    fn rejects_label_free_table() {
        let table = load_str("A,B\n", &LoadOptions::default()).unwrap().table;
        assert!(matches!(
            CategoryMap::from_table(&table),
            Err(LeadSiftError::ReferenceData(_))
        ));
    }

    #[test]
    fn builds_from_pairs() {
        let map: CategoryMap = [("Food", vec!["Restaurant", "Bar"])].into_iter().collect();
        assert!(map.allowed("Food").unwrap().contains("Bar"));
    }
}
