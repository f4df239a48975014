/*
This file is part of the Building Aggregration Tool
Copyright (C) 2022 Novel-T

The Building Aggregration Tool is free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with this program.  If not, see <http://www.gnu.org/licenses/>.
*/
//! Partitions the rows of a dataset by the values of the grouping properties

use std::collections::HashMap;
use anyhow::Result;
use itertools::Itertools;
use log::debug;

use geo_util::util::ProgressLog;

use crate::cancel::CancelFlag;
use crate::datasource::DataSet;
use crate::value::Value;

/// Rows scanned between two checks of the cancel flag
pub const CANCEL_CHECK_INTERVAL: u64 = 4096;

/// Identity of a group, the canonical string of each grouping value.
///
/// Keys compare element wise, so ("A_B", "C") and ("A", "B_C") are different
/// groups even though they have the same label.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey(pub Vec<Option<String>>);

impl GroupKey {
    pub fn from_values(values: &[Value]) -> GroupKey {
        GroupKey(values.iter().map(|v| v.to_canonical_string()).collect())
    }

    /// Value written in the key column, parts joined by `_`, null is the empty string
    pub fn label(&self) -> String {
        self.0.iter().map(|p| p.as_deref().unwrap_or("")).join("_")
    }
}

/// Rows sharing a key.  Only the captured columns are kept, in the order they were
/// passed to [group_rows]
#[derive(Clone, Debug)]
pub struct Group {
    pub key: GroupKey,
    pub rows: Vec<Vec<Value>>,
}

impl Group {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of the `captured_idx`th captured column, one per row
    pub fn column(&self, captured_idx: usize) -> impl Iterator<Item=&Value> + '_ {
        self.rows.iter().map(move |r| &r[captured_idx])
    }
}

#[derive(Clone, Debug, Default)]
pub struct Grouping {
    /// In order of first occurrence
    pub groups: Vec<Group>,
    pub rows_read: u64,
}

impl Grouping {
    pub fn row_count(&self) -> usize {
        self.groups.iter().map(|g| g.len()).sum()
    }
}

/// Scans the remaining rows of `dataset` once
pub fn group_rows(dataset: &mut dyn DataSet,
                  key_columns: &[usize],
                  captured_columns: &[usize],
                  cancel: &CancelFlag) -> Result<Grouping>
{
    let mut grouping = Grouping::default();
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut progress = ProgressLog::new(&format!("Grouping {}", dataset.schema().name), None);

    let mut key_values = Vec::with_capacity(key_columns.len());

    while dataset.move_next()? {
        if grouping.rows_read % CANCEL_CHECK_INTERVAL == 0 {
            cancel.check()?;
        }
        grouping.rows_read += 1;
        progress.tick();

        key_values.clear();
        for &idx in key_columns {
            key_values.push(dataset.value(idx)?);
        }
        let key = GroupKey::from_values(&key_values);

        let row = captured_columns.iter()
            .map(|&idx| dataset.value(idx))
            .collect::<Result<Vec<_>>>()?;

        match index.get(&key) {
            Some(&group_idx) => grouping.groups[group_idx].rows.push(row),
            None => {
                index.insert(key.clone(), grouping.groups.len());
                grouping.groups.push(Group { key, rows: vec![row] });
            }
        }
    }

    progress.finish();
    debug!("Read {} rows of {} in to {} groups", grouping.rows_read, dataset.schema().name, grouping.groups.len());

    Ok(grouping)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use super::*;
    use crate::datasource::MemoryDataSet;
    use crate::errors::is_canceled;
    use crate::schema::{DataSetType, Property};
    use crate::value::DataType;

    fn dataset(rows: Vec<(Option<&str>, Option<&str>, i32)>) -> MemoryDataSet {
        let schema = DataSetType::new("t")
            .with_property(Property::new("a", DataType::String, ""))
            .with_property(Property::new("b", DataType::String, ""))
            .with_property(Property::new("n", DataType::Int32, ""));
        let mut ds = MemoryDataSet::new(schema);
        for (a, b, n) in rows {
            let to_value = |s: Option<&str>| s.map(|s| Value::String(s.to_string())).unwrap_or(Value::Null);
            ds.push_row(vec![to_value(a), to_value(b), Value::Int32(n)]).unwrap();
        }
        ds
    }

    #[test]
    fn test_group_count_matches_distinct_tuples() {
        let rows = vec![
            (Some("x"), Some("1"), 1),
            (Some("x"), Some("2"), 2),
            (Some("x"), Some("1"), 3),
            (None, Some("1"), 4),
            (None, Some("1"), 5),
            (Some("y"), None, 6),
            (Some(""), None, 7),
        ];
        let distinct: HashSet<_> = rows.iter().map(|(a, b, _)| (*a, *b)).collect();

        let mut ds = dataset(rows.clone());
        let grouping = group_rows(&mut ds, &[0, 1], &[2], &CancelFlag::new()).unwrap();

        assert_eq!(distinct.len(), grouping.groups.len());
        assert_eq!(rows.len(), grouping.row_count());
        assert_eq!(rows.len() as u64, grouping.rows_read);

        // null and empty string are different groups
        let keys: Vec<_> = grouping.groups.iter().map(|g| g.key.clone()).collect();
        assert!(keys.contains(&GroupKey(vec![None, Some("1".to_string())])));
        assert!(keys.contains(&GroupKey(vec![Some("".to_string()), None])));
    }

    #[test]
    fn test_insertion_order_and_members() {
        let mut ds = dataset(vec![
            (Some("b"), Some("1"), 1),
            (Some("a"), Some("1"), 2),
            (Some("b"), Some("1"), 3),
        ]);
        let grouping = group_rows(&mut ds, &[0], &[2, 0], &CancelFlag::new()).unwrap();

        assert_eq!(2, grouping.groups.len());
        assert_eq!("b", grouping.groups[0].key.label());
        assert_eq!(vec![&Value::Int32(1), &Value::Int32(3)], grouping.groups[0].column(0).collect::<Vec<_>>());
        assert_eq!(vec![vec![Value::Int32(2), Value::String("a".to_string())]], grouping.groups[1].rows);
    }

    #[test]
    fn test_separator_in_values() {
        let mut ds = dataset(vec![
            (Some("A_B"), Some("C"), 1),
            (Some("A"), Some("B_C"), 2),
        ]);
        let grouping = group_rows(&mut ds, &[0, 1], &[2], &CancelFlag::new()).unwrap();

        assert_eq!(2, grouping.groups.len());
        assert_eq!(grouping.groups[0].key.label(), grouping.groups[1].key.label());
        assert_ne!(grouping.groups[0].key, grouping.groups[1].key);
    }

    #[test]
    fn test_label() {
        let key = GroupKey(vec![Some("A".to_string()), None, Some("3".to_string())]);
        assert_eq!("A__3", key.label());
        assert_eq!("5", GroupKey::from_values(&[Value::Int64(5)]).label());
    }

    #[test]
    fn test_canceled() {
        let mut ds = dataset(vec![(Some("a"), None, 1)]);
        let cancel = CancelFlag::new();
        cancel.cancel();

        let err = group_rows(&mut ds, &[0], &[2], &cancel).unwrap_err();
        assert!(is_canceled(&err));
    }
}
