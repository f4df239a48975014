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
//! The two ways of running an aggregation: grouping in memory, or as one
//! GROUP BY query run by the data source

use std::fmt;
use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};

use crate::cancel::CancelFlag;
use crate::datasource::{Capabilities, DataSource, MemoryDataSet};
use crate::errors::ErrorKind;
use crate::output::ColumnPlan;

mod in_memory;
mod pushdown;

pub use in_memory::*;
pub use pushdown::*;


#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Pushdown when the source and the statistics allow it
    Auto,
    InMemory,
    Pushdown,
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Auto
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Strategy::Auto => "auto",
            Strategy::InMemory => "in_memory",
            Strategy::Pushdown => "pushdown",
        };
        write!(f, "{}", s)
    }
}

pub struct ExecutionResult {
    /// Staging dataset, one row per group
    pub output: MemoryDataSet,
    pub rows_read: u64,
}

pub trait Executor {
    fn strategy(&self) -> Strategy;

    fn execute(&self,
               source: &dyn DataSource,
               plan: &ColumnPlan,
               output_name: &str,
               cancel: &CancelFlag) -> Result<ExecutionResult>;
}

/// Resolves Auto to the strategy that will run.  A forced pushdown the source or
/// the statistics can not do is an error
pub fn select_strategy(requested: Strategy, capabilities: Capabilities, plan: &ColumnPlan) -> Result<Strategy> {
    let not_pushable = plan.requested_kinds().find(|(_, kind)| !kind.is_pushdown_capable());

    match requested {
        Strategy::InMemory => Ok(Strategy::InMemory),
        Strategy::Pushdown => {
            if !capabilities.supports_pushdown() {
                Err(ErrorKind::PushdownUnsupported {
                    reason: format!("capabilities {:?}", capabilities)
                })?;
            }
            if let Some((planned, kind)) = not_pushable {
                Err(ErrorKind::StatisticNotPushable {
                    statistic: kind.to_string(),
                    property_name: planned.property.clone(),
                })?;
            }
            Ok(Strategy::Pushdown)
        }
        Strategy::Auto => {
            if !capabilities.supports_pushdown() {
                info!("Data source has no prepared spatial queries, grouping in memory");
                return Ok(Strategy::InMemory);
            }
            if let Some((planned, kind)) = not_pushable {
                info!("{} of {} can not be computed by a query, grouping in memory", kind, planned.property);
                return Ok(Strategy::InMemory);
            }
            Ok(Strategy::Pushdown)
        }
    }
}

/// Executor for a resolved strategy
pub fn executor_for(strategy: Strategy) -> Box<dyn Executor> {
    match strategy {
        Strategy::Pushdown => Box::new(PushdownExecutor),
        Strategy::InMemory | Strategy::Auto => Box::new(InMemoryExecutor),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::StatisticsRequest;
    use crate::stats::StatisticKind;
    use crate::test_util::{buildings_type, pushdown_capabilities};

    fn plan(kinds: &[StatisticKind]) -> ColumnPlan {
        let mut req = StatisticsRequest::new();
        req.add("pop", kinds);
        ColumnPlan::resolve(&buildings_type(), &["region".to_string()], &req).unwrap()
    }

    #[test]
    fn test_auto() {
        let caps = pushdown_capabilities();
        let capable = plan(&[StatisticKind::Sum, StatisticKind::VarCoeff]);
        let median = plan(&[StatisticKind::Sum, StatisticKind::Median]);

        assert_eq!(Strategy::Pushdown, select_strategy(Strategy::Auto, caps, &capable).unwrap());
        assert_eq!(Strategy::InMemory, select_strategy(Strategy::Auto, caps, &median).unwrap());
        assert_eq!(Strategy::InMemory, select_strategy(Strategy::Auto, Capabilities::default(), &capable).unwrap());
        assert_eq!(Strategy::InMemory, select_strategy(Strategy::InMemory, caps, &capable).unwrap());

        let no_spatial = Capabilities { spatial_sql: false, ..caps };
        assert_eq!(Strategy::InMemory, select_strategy(Strategy::Auto, no_spatial, &capable).unwrap());
    }

    #[test]
    fn test_forced_pushdown() {
        let caps = pushdown_capabilities();

        let err = select_strategy(Strategy::Pushdown, caps, &plan(&[StatisticKind::Mode])).unwrap_err();
        assert_eq!(Some(&ErrorKind::StatisticNotPushable {
            statistic: "MODE".to_string(),
            property_name: "pop".to_string(),
        }), err.downcast_ref::<ErrorKind>());

        let err = select_strategy(Strategy::Pushdown, Capabilities::default(), &plan(&[StatisticKind::Sum])).unwrap_err();
        assert!(matches!(err.downcast_ref::<ErrorKind>(), Some(ErrorKind::PushdownUnsupported { .. })));
    }

    #[test]
    fn test_strategy_names() {
        #[derive(Deserialize)]
        struct S {
            strategy: Strategy,
        }
        let s: S = toml::from_str("strategy = \"in_memory\"").unwrap();
        assert_eq!(Strategy::InMemory, s.strategy);
        assert_eq!("pushdown", Strategy::Pushdown.to_string());
    }
}
