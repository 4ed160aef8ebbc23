//! Columnar table
//!
//! Minimal immutable columnar table with the operations result normalization
//! consumes: filtering, row materialization and construction from row objects.
//! Every operation returns a new table; the source is never mutated.

use crate::error::TableError;
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// A single materialized row (column name → cell)
pub type Row = Map<String, Value>;

/// Columnar table of JSON cells
///
/// # Invariants
/// - Every column holds exactly `num_rows` cells
/// - Column order is the order columns were first seen
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: IndexMap<String, Vec<Value>>,
    num_rows: usize,
}

impl Table {
    /// Create empty table (no columns, no rows)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build table from named columns
    ///
    /// # Errors
    /// Returns `TableError::ColumnLengthMismatch` if columns differ in length
    pub fn from_columns<I, S>(columns: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = (S, Vec<Value>)>,
        S: Into<String>,
    {
        let mut out: IndexMap<String, Vec<Value>> = IndexMap::new();
        let mut num_rows = None;

        for (name, cells) in columns {
            let name = name.into();
            let expected = *num_rows.get_or_insert(cells.len());
            if cells.len() != expected {
                return Err(TableError::length_mismatch(name, expected, cells.len()));
            }
            out.insert(name, cells);
        }

        Ok(Self {
            columns: out,
            num_rows: num_rows.unwrap_or(0),
        })
    }

    /// Build table from row objects
    ///
    /// The column set is the union of all row keys in first-seen order.
    /// A row lacking a column contributes `null` to it.
    #[must_use]
    pub fn from_objects<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = Row>,
    {
        let mut columns: IndexMap<String, Vec<Value>> = IndexMap::new();
        let mut num_rows = 0;

        for row in rows {
            for (key, value) in row {
                columns
                    .entry(key)
                    .or_insert_with(|| vec![Value::Null; num_rows])
                    .push(value);
            }
            num_rows += 1;
            for column in columns.values_mut() {
                if column.len() < num_rows {
                    column.push(Value::Null);
                }
            }
        }

        Self { columns, num_rows }
    }

    /// Number of rows
    #[inline]
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// True when the table has no rows
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    /// Column names in table order
    pub fn column_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.keys().map(String::as_str)
    }

    /// Check if column exists
    #[inline]
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// All cells of a column
    #[inline]
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Single cell
    #[inline]
    #[must_use]
    pub fn get(&self, column: &str, row: usize) -> Option<&Value> {
        self.columns.get(column).and_then(|cells| cells.get(row))
    }

    /// Borrowed view of one row
    #[inline]
    #[must_use]
    pub fn row_ref(&self, index: usize) -> Option<RowRef<'_>> {
        (index < self.num_rows).then_some(RowRef { table: self, index })
    }

    /// Materialize one row
    #[must_use]
    pub fn row(&self, index: usize) -> Option<Row> {
        self.row_ref(index).map(|row| row.to_object())
    }

    /// Materialize every row, each carrying every column
    #[must_use]
    pub fn objects(&self) -> Vec<Row> {
        (0..self.num_rows)
            .map(|index| RowRef { table: self, index }.to_object())
            .collect()
    }

    /// Iterate borrowed rows
    pub fn rows(&self) -> impl Iterator<Item = RowRef<'_>> + '_ {
        (0..self.num_rows).map(move |index| RowRef { table: self, index })
    }

    /// Keep rows matching predicate
    ///
    /// Column set is unchanged and row order is preserved.
    #[must_use]
    pub fn filter<F>(&self, mut predicate: F) -> Table
    where
        F: FnMut(RowRef<'_>) -> bool,
    {
        let keep: Vec<usize> = self
            .rows()
            .filter(|row| predicate(*row))
            .map(|row| row.index)
            .collect();

        let columns = self
            .columns
            .iter()
            .map(|(name, cells)| {
                let picked = keep.iter().map(|&i| cells[i].clone()).collect();
                (name.clone(), picked)
            })
            .collect();

        Table {
            columns,
            num_rows: keep.len(),
        }
    }
}

/// Borrowed view of a table row
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    table: &'a Table,
    index: usize,
}

impl<'a> RowRef<'a> {
    /// Row position in the table
    #[inline]
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Cell for column (None if the column does not exist)
    #[inline]
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.table.get(column, self.index)
    }

    /// Cell as string slice
    #[inline]
    #[must_use]
    pub fn get_str(&self, column: &str) -> Option<&'a str> {
        self.get(column).and_then(Value::as_str)
    }

    /// True when the column is absent or null
    #[inline]
    #[must_use]
    pub fn is_null(&self, column: &str) -> bool {
        self.get(column).map_or(true, Value::is_null)
    }

    /// Copy row into an owned object
    #[must_use]
    pub fn to_object(&self) -> Row {
        self.table
            .columns
            .iter()
            .map(|(name, cells)| (name.clone(), cells[self.index].clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn from_objects_unions_columns() {
        let table = Table::from_objects(vec![
            row(json!({"a": 1})),
            row(json!({"b": "x"})),
            row(json!({"a": 3, "b": "z"})),
        ]);

        assert_eq!(table.num_rows(), 3);
        assert_eq!(table.column_names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(table.column("a").unwrap(), &[json!(1), Value::Null, json!(3)]);
        assert_eq!(table.column("b").unwrap(), &[Value::Null, json!("x"), json!("z")]);
    }

    #[test]
    fn from_objects_empty() {
        let table = Table::from_objects(Vec::new());
        assert!(table.is_empty());
        assert_eq!(table.column_names().count(), 0);
    }

    #[test]
    fn from_columns_rejects_ragged() {
        let result = Table::from_columns(vec![
            ("a", vec![json!(1), json!(2)]),
            ("b", vec![json!(1)]),
        ]);
        assert!(matches!(
            result,
            Err(TableError::ColumnLengthMismatch { expected: 2, actual: 1, .. })
        ));
    }

    #[test]
    fn objects_carry_every_column() {
        let table = Table::from_objects(vec![row(json!({"a": 1})), row(json!({"b": 2}))]);
        let objects = table.objects();

        assert_eq!(objects[0], row(json!({"a": 1, "b": null})));
        assert_eq!(objects[1], row(json!({"a": null, "b": 2})));
    }

    #[test]
    fn filter_preserves_order_and_columns() {
        let table = Table::from_objects((0..5).map(|i| row(json!({"i": i, "even": i % 2 == 0}))));
        let evens = table.filter(|r| r.get("even") == Some(&json!(true)));

        assert_eq!(evens.num_rows(), 3);
        assert_eq!(evens.column("i").unwrap(), &[json!(0), json!(2), json!(4)]);
        assert!(evens.has_column("even"));
    }

    #[test]
    fn filter_to_nothing_keeps_columns() {
        let table = Table::from_objects(vec![row(json!({"a": 1}))]);
        let none = table.filter(|_| false);
        assert!(none.is_empty());
        assert!(none.has_column("a"));
    }

    #[test]
    fn row_ref_accessors() {
        let table = Table::from_objects(vec![row(json!({"s": "txt", "n": null}))]);
        let r = table.row_ref(0).unwrap();

        assert_eq!(r.get_str("s"), Some("txt"));
        assert!(r.is_null("n"));
        assert!(r.is_null("missing"));
        assert!(table.row_ref(1).is_none());
        assert_eq!(table.get("missing", 0), None);
    }

    proptest::proptest! {
        #[test]
        fn from_objects_round_trips_rows(
            rows in proptest::collection::vec(
                proptest::collection::btree_map("[a-d]", 0i64..100, 0..4),
                0..8,
            )
        ) {
            let objects: Vec<Row> = rows
                .iter()
                .map(|r| r.iter().map(|(k, v)| (k.clone(), json!(v))).collect())
                .collect();
            let table = Table::from_objects(objects.clone());

            proptest::prop_assert_eq!(table.num_rows(), objects.len());
            for (index, original) in objects.iter().enumerate() {
                let rebuilt = table.row(index).unwrap();
                for (key, value) in original {
                    proptest::prop_assert_eq!(rebuilt.get(key), Some(value));
                }
                for name in table.column_names() {
                    if !original.contains_key(name) {
                        proptest::prop_assert_eq!(rebuilt.get(name), Some(&Value::Null));
                    }
                }
            }
        }
    }
}
