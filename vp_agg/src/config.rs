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
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::aggregation::{AggregationParams, StatisticsRequest};
use crate::errors::ErrorKind;
use crate::executor::Strategy;
use crate::stats::StatisticKind;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StatisticsEntry {
    pub property: String,
    pub statistics: Vec<StatisticKind>,
}

/// An aggregation job as written in a toml file
///
/// ```toml
/// input_dataset = "buildings"
/// output_dataset = "buildings_by_region"
/// grouping = ["region"]
/// strategy = "auto"
///
/// [[statistics]]
/// property = "pop"
/// statistics = ["SUM", "MEAN"]
/// ```
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AggregationJob {
    pub input_dataset: String,
    pub output_dataset: String,
    pub grouping: Vec<String>,

    #[serde(default)]
    pub statistics: Vec<StatisticsEntry>,

    #[serde(default)]
    pub strategy: Strategy,

    #[serde(default)]
    pub create_primary_key: bool,

    //passed as is to the output data source
    #[serde(default)]
    pub add_options: HashMap<String, String>,
}

impl AggregationJob {
    pub fn from_toml_str(s: &str) -> Result<AggregationJob> {
        toml::from_str(s).map_err(|e| anyhow!("Invalid aggregation job: {}", e))
    }

    pub fn from_path(path: &Path) -> Result<AggregationJob> {
        let s = fs::read_to_string(path)
            .map_err(|e| anyhow!("Unable to read {:?}: {}", path, e))?;
        AggregationJob::from_toml_str(&s)
    }

    pub fn into_params(self) -> Result<AggregationParams> {
        if self.input_dataset.is_empty() || self.output_dataset.is_empty() {
            Err(ErrorKind::InvalidConfiguration("input_dataset and output_dataset are required".to_string()))?;
        }
        if self.grouping.is_empty() {
            Err(ErrorKind::NoGroupingProperty)?;
        }

        let mut statistics = StatisticsRequest::new();
        for entry in &self.statistics {
            statistics.add(&entry.property, &entry.statistics);
        }

        Ok(AggregationParams {
            input_dataset: self.input_dataset,
            output_dataset: self.output_dataset,
            grouping: self.grouping,
            statistics,
            strategy: self.strategy,
            create_primary_key: self.create_primary_key,
            add_options: self.add_options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOB: &str = r#"
input_dataset = "buildings"
output_dataset = "buildings_by_region"
grouping = ["region", "district"]
strategy = "in_memory"
create_primary_key = true

[add_options]
batch_size = "500"

[[statistics]]
property = "pop"
statistics = ["SUM", "MEAN", "MODE"]

[[statistics]]
property = "name"
statistics = ["MIN"]
"#;

    #[test]
    fn test_parse_job() {
        let params = AggregationJob::from_toml_str(JOB).unwrap().into_params().unwrap();

        assert_eq!(vec!["region", "district"], params.grouping);
        assert_eq!(Strategy::InMemory, params.strategy);
        assert!(params.create_primary_key);
        assert_eq!(Some(&"500".to_string()), params.add_options.get("batch_size"));

        let stats: Vec<_> = params.statistics.iter().collect();
        assert_eq!(("pop", &[StatisticKind::Sum, StatisticKind::Mean, StatisticKind::Mode][..]), stats[0]);
        assert_eq!(("name", &[StatisticKind::Min][..]), stats[1]);
    }

    #[test]
    fn test_defaults() {
        let job = AggregationJob::from_toml_str("input_dataset = \"a\"\noutput_dataset = \"b\"\ngrouping = [\"c\"]").unwrap();
        assert_eq!(Strategy::Auto, job.strategy);
        assert!(!job.create_primary_key);
        assert!(job.statistics.is_empty());
    }

    #[test]
    fn test_invalid_jobs() {
        assert!(AggregationJob::from_toml_str("input_dataset = \"a\"\noutput_dataset = \"b\"\ngrouping = [\"c\"]\nunknown = 1").is_err());
        assert!(AggregationJob::from_toml_str("input_dataset = \"a\"\noutput_dataset = \"b\"\ngrouping = [\"c\"]\nstrategy = \"fast\"").is_err());

        let err = AggregationJob::from_toml_str("input_dataset = \"a\"\noutput_dataset = \"b\"\ngrouping = []")
            .unwrap().into_params().unwrap_err();
        assert_eq!(Some(&ErrorKind::NoGroupingProperty), err.downcast_ref::<ErrorKind>());

        let err = AggregationJob::from_toml_str("input_dataset = \"a\"\noutput_dataset = \"\"\ngrouping = [\"c\"]")
            .unwrap().into_params().unwrap_err();
        assert!(matches!(err.downcast_ref::<ErrorKind>(), Some(ErrorKind::InvalidConfiguration(_))));
    }

    #[test]
    fn test_same_name_allowed() {
        //only a conflict when writing next to the input
        let params = AggregationJob::from_toml_str("input_dataset = \"a\"\noutput_dataset = \"a\"\ngrouping = [\"c\"]")
            .unwrap().into_params().unwrap();
        assert_eq!(params.input_dataset, params.output_dataset);
    }
}
