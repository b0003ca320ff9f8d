//! Keep rows whose category label belongs to a chosen group.

use tracing::{info, instrument, warn};

use leadsift_reference::CategoryMap;
use leadsift_shared::{LeadSiftError, Result};
use leadsift_table::Table;

/// Filter `table` down to rows whose trimmed `category_column` value is an
/// exact, case-sensitive member of `group`'s labels.
///
/// An unknown group keeps nothing. A missing category column is an error.
#[instrument(skip_all, fields(group = %group, column = %category_column))]
pub fn filter_by_group(
    table: Table,
    categories: &CategoryMap,
    group: &str,
    category_column: &str,
) -> Result<Table> {
    let idx = table
        .column_index(category_column)
        .ok_or_else(|| LeadSiftError::missing_columns([category_column]))?;

    let Some(allowed) = categories.allowed(group) else {
        warn!(
            known = ?categories.group_names().collect::<Vec<_>>(),
            "unknown category group, no rows kept"
        );
        return Ok(Table::empty(table.columns().to_vec()));
    };

    let before = table.len();
    let shell = Table::empty(table.columns().to_vec());
    let kept = table
        .into_rows()
        .into_iter()
        .filter(|row| {
            row.get(idx)
                .and_then(|cell| cell.as_str())
                .is_some_and(|label| allowed.contains(label.trim()))
        })
        .collect();

    let filtered = shell.with_rows(kept);
    info!(before, after = filtered.len(), "category filter applied");
    Ok(filtered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadsift_table::{Cell, Record};

    fn listings() -> Table {
        Table::new(
            vec!["title".into(), "categoryName".into()],
            vec![
                Record::from_texts(["A", "Restaurant"]),
                Record::from_texts(["B", "restaurant"]),
                Record::from_texts(["C", "Boulangerie"]),
                Record::from_texts(["D", ""]),
                Record::from_texts(["E", "Pizzeria"]),
            ],
        )
        .unwrap()
    }

    fn map() -> CategoryMap {
        [
            ("Restauration", vec!["Restaurant", "Pizzeria"]),
            ("Commerce", vec!["Boulangerie"]),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn keeps_exact_members_in_order() {
        let out = filter_by_group(listings(), &map(), "Restauration", "categoryName").unwrap();
        let titles: Vec<_> = out
            .column_cells("title")
            .unwrap()
            .filter_map(|c| c.as_str())
            .collect();
        assert_eq!(titles, ["A", "E"]);
        assert_eq!(out.columns(), listings().columns());
    }

    #[test]
    fn padded_labels_match_after_trimming() {
        let table = leadsift_table::load_str(
            "title,categories/0\nA, Restaurant \nB,Restaurant\nC, restaurant\n",
            &leadsift_table::LoadOptions::default(),
        )
        .unwrap()
        .table;

        let out = filter_by_group(table, &map(), "Restauration", "categories/0").unwrap();

        let titles: Vec<_> = out
            .column_cells("title")
            .unwrap()
            .filter_map(|c| c.as_str())
            .collect();
        assert_eq!(titles, ["A", "B"]);
        assert_eq!(out.cell(0, "categories/0"), Some(&Cell::text(" Restaurant ")));
    }

    #[test]
    fn unknown_group_keeps_nothing() {
        let out = filter_by_group(listings(), &map(), "Santé", "categoryName").unwrap();
        assert!(out.is_empty());
        assert_eq!(out.columns().len(), 2);
    }

    #[test]
    fn missing_category_column_is_an_error() {
        let err = filter_by_group(listings(), &map(), "Commerce", "categories/0").unwrap_err();
        assert!(matches!(err, LeadSiftError::MissingColumns { ref missing } if missing == &["categories/0"]));
    }
}
