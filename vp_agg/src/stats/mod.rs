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
//! Statistical summaries over the values of one property in a group

use std::fmt;
use std::str::FromStr;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

mod numeric;
mod text;

pub use numeric::*;
pub use text::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatisticKind {
    Min,
    Max,
    Mean,
    Sum,
    Count,
    ValidCount,
    StdDeviation,
    Variance,
    Skewness,
    Kurtosis,
    Amplitude,
    Median,
    VarCoeff,
    Mode,
}

impl StatisticKind {
    pub const ALL: [StatisticKind; 14] = [
        StatisticKind::Min,
        StatisticKind::Max,
        StatisticKind::Mean,
        StatisticKind::Sum,
        StatisticKind::Count,
        StatisticKind::ValidCount,
        StatisticKind::StdDeviation,
        StatisticKind::Variance,
        StatisticKind::Skewness,
        StatisticKind::Kurtosis,
        StatisticKind::Amplitude,
        StatisticKind::Median,
        StatisticKind::VarCoeff,
        StatisticKind::Mode,
    ];

    /// Suffix of the output column, `<property>_<short name>`
    pub fn short_name(&self) -> &'static str {
        match self {
            StatisticKind::Min => "MIN",
            StatisticKind::Max => "MAX",
            StatisticKind::Mean => "MEAN",
            StatisticKind::Sum => "SUM",
            StatisticKind::Count => "COUNT",
            StatisticKind::ValidCount => "VALID_COUNT",
            StatisticKind::StdDeviation => "STD_DEVIATION",
            StatisticKind::Variance => "VARIANCE",
            StatisticKind::Skewness => "SKEWNESS",
            StatisticKind::Kurtosis => "KURTOSIS",
            StatisticKind::Amplitude => "AMPLITUDE",
            StatisticKind::Median => "MEDIAN",
            StatisticKind::VarCoeff => "VAR_COEFF",
            StatisticKind::Mode => "MODE",
        }
    }

    /// Statistics a string summary has
    pub fn applies_to_text(&self) -> bool {
        matches!(self,
            StatisticKind::Min | StatisticKind::Max | StatisticKind::Count | StatisticKind::ValidCount)
    }

    /// Can be expressed as a SQL aggregate
    pub fn is_pushdown_capable(&self) -> bool {
        match self {
            StatisticKind::Min | StatisticKind::Max | StatisticKind::Mean | StatisticKind::Sum |
            StatisticKind::Count | StatisticKind::ValidCount | StatisticKind::StdDeviation |
            StatisticKind::Variance | StatisticKind::Amplitude | StatisticKind::VarCoeff => true,
            StatisticKind::Skewness | StatisticKind::Kurtosis |
            StatisticKind::Median | StatisticKind::Mode => false,
        }
    }
}

impl fmt::Display for StatisticKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

impl FromStr for StatisticKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_ascii_uppercase().replace(' ', "_");
        match StatisticKind::ALL.iter().find(|k| k.short_name() == upper) {
            Some(k) => Ok(*k),
            None => bail!("Unknown statistic {}", s)
        }
    }
}
