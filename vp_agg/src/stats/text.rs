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
use crate::stats::StatisticKind;

/// Summary of the textual values of a group, compared lexicographically
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StringSummary {
    pub count: usize,
    pub valid_count: usize,
    /// None without any valid value
    pub min: Option<String>,
    pub max: Option<String>,
}

impl StringSummary {
    pub fn compute(values: &[Option<String>]) -> StringSummary {
        let valid = values.iter().flatten();
        StringSummary {
            count: values.len(),
            valid_count: valid.clone().count(),
            min: valid.clone().min().cloned(),
            max: valid.max().cloned(),
        }
    }

    /// None for statistics a string summary does not have, or when the value is undefined
    pub fn value_of(&self, kind: StatisticKind) -> Option<String> {
        match kind {
            StatisticKind::Min => self.min.clone(),
            StatisticKind::Max => self.max.clone(),
            StatisticKind::Count => Some(self.count.to_string()),
            StatisticKind::ValidCount => Some(self.valid_count.to_string()),
            _ => None,
        }
    }
}
