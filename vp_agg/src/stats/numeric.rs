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
use std::fmt;
use itertools::Itertools;

use crate::stats::StatisticKind;

/// Summary of the numeric values of a group.
///
/// Moments are population moments.  Everything derived from the values is 0
/// when there is no valid value, skewness and kurtosis are also 0 when the
/// values have no spread.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NumericSummary {
    /// Including nulls
    pub count: usize,
    pub valid_count: usize,
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    pub mean: f64,
    pub variance: f64,
    pub std_deviation: f64,
    pub skewness: f64,
    /// Not the excess kurtosis, 3 for a normal distribution
    pub kurtosis: f64,
    pub amplitude: f64,
    pub median: f64,
    /// std_deviation / mean, 0 when the mean is 0
    pub var_coeff: f64,
    /// Most frequent values, ascending
    pub mode: Vec<f64>,
}

impl NumericSummary {
    pub fn compute(values: &[Option<f64>]) -> NumericSummary {
        let mut valid: Vec<f64> = values.iter().filter_map(|v| *v).filter(|v| !v.is_nan()).collect();
        let mut summary = NumericSummary {
            count: values.len(),
            valid_count: valid.len(),
            ..Default::default()
        };

        if valid.is_empty() {
            return summary;
        }

        valid.sort_by(|a, b| a.total_cmp(b));
        let n = valid.len() as f64;

        summary.min = valid[0];
        summary.max = valid[valid.len() - 1];
        summary.amplitude = summary.max - summary.min;
        summary.sum = valid.iter().sum();
        summary.mean = summary.sum / n;

        let (m2, m3, m4) = valid.iter().fold((0.0, 0.0, 0.0), |(m2, m3, m4), x| {
            let d = x - summary.mean;
            let d2 = d * d;
            (m2 + d2, m3 + d2 * d, m4 + d2 * d2)
        });
        summary.variance = m2 / n;
        summary.std_deviation = summary.variance.sqrt();

        if summary.std_deviation > 0.0 {
            summary.skewness = (m3 / n) / summary.std_deviation.powi(3);
            summary.kurtosis = (m4 / n) / (summary.variance * summary.variance);
        }

        if summary.mean != 0.0 {
            summary.var_coeff = summary.std_deviation / summary.mean;
        }

        let mid = valid.len() / 2;
        summary.median = if valid.len() % 2 == 0 {
            (valid[mid - 1] + valid[mid]) / 2.0
        } else {
            valid[mid]
        };

        summary.mode = mode_of_sorted(&valid);

        summary
    }

    /// None for MODE, which has its own columns
    pub fn value_of(&self, kind: StatisticKind) -> Option<f64> {
        let v = match kind {
            StatisticKind::Min => self.min,
            StatisticKind::Max => self.max,
            StatisticKind::Mean => self.mean,
            StatisticKind::Sum => self.sum,
            StatisticKind::Count => self.count as f64,
            StatisticKind::ValidCount => self.valid_count as f64,
            StatisticKind::StdDeviation => self.std_deviation,
            StatisticKind::Variance => self.variance,
            StatisticKind::Skewness => self.skewness,
            StatisticKind::Kurtosis => self.kurtosis,
            StatisticKind::Amplitude => self.amplitude,
            StatisticKind::Median => self.median,
            StatisticKind::VarCoeff => self.var_coeff,
            StatisticKind::Mode => return None,
        };
        Some(v)
    }
}

/// All values tied for the highest count.  When every value is unique there is no mode,
/// unless there is just the 1 value
fn mode_of_sorted(sorted: &[f64]) -> Vec<f64> {
    let runs: Vec<(usize, f64)> = sorted.iter()
        .dedup_by_with_count(|a, b| a == b)
        .map(|(c, v)| (c, *v))
        .collect();

    let max_count = runs.iter().map(|(c, _)| *c).max().unwrap_or(0);
    if max_count == 1 && sorted.len() > 1 {
        return Vec::new();
    }

    runs.into_iter().filter(|(c, _)| *c == max_count).map(|(_, v)| v).collect()
}

impl fmt::Display for NumericSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for kind in StatisticKind::ALL {
            match self.value_of(kind) {
                Some(v) => writeln!(f, "{:>14}: {}", kind.short_name(), v)?,
                None => writeln!(f, "{:>14}: [{}]", kind.short_name(), self.mode.iter().join(", "))?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::assert_close;

    fn summary(values: &[f64]) -> NumericSummary {
        NumericSummary::compute(&values.iter().map(|v| Some(*v)).collect::<Vec<_>>())
    }

    #[test]
    fn test_summary() {
        let s = summary(&[2., 4., 4., 4., 5., 5., 7., 9.]);

        assert_eq!(8, s.count);
        assert_eq!(8, s.valid_count);
        assert_close(2.0, s.min);
        assert_close(9.0, s.max);
        assert_close(40.0, s.sum);
        assert_close(5.0, s.mean);
        assert_close(4.0, s.variance);
        assert_close(2.0, s.std_deviation);
        assert_close(7.0, s.amplitude);
        assert_close(4.5, s.median);
        assert_close(0.4, s.var_coeff);
        assert_close(0.65625, s.skewness);
        assert_close(2.78125, s.kurtosis);
        assert_eq!(vec![4.0], s.mode);
    }

    #[test]
    fn test_nulls_excluded() {
        let s = NumericSummary::compute(&[Some(10.0), None, Some(20.0), None]);

        assert_eq!(4, s.count);
        assert_eq!(2, s.valid_count);
        assert_close(15.0, s.mean);
        assert_close(15.0, s.median);
        assert_close(25.0, s.variance);
        assert!(s.mode.is_empty());
    }

    #[test]
    fn test_nan_excluded() {
        let s = NumericSummary::compute(&[Some(1.0), Some(f64::NAN), Some(3.0)]);

        assert_eq!(3, s.count);
        assert_eq!(2, s.valid_count);
        assert_close(4.0, s.sum);
        assert_close(2.0, s.mean);
        assert_close(3.0, s.max);
    }

    #[test]
    fn test_no_valid_values() {
        let s = NumericSummary::compute(&[None, None, None]);

        assert_eq!(3, s.count);
        assert_eq!(0, s.valid_count);
        for kind in StatisticKind::ALL {
            if kind == StatisticKind::Count || kind == StatisticKind::Mode {
                continue;
            }
            assert_eq!(Some(0.0), s.value_of(kind), "{}", kind);
        }
        assert!(s.mode.is_empty());

        let s = NumericSummary::compute(&[]);
        assert_eq!(0, s.count);
        assert_close(0.0, s.mean);
    }

    #[test]
    fn test_no_spread() {
        let s = summary(&[3., 3., 3.]);
        assert_close(0.0, s.variance);
        assert_close(0.0, s.skewness);
        assert_close(0.0, s.kurtosis);
        assert_close(0.0, s.var_coeff);
        assert_eq!(vec![3.0], s.mode);
    }

    #[test]
    fn test_zero_mean() {
        let s = summary(&[-1., 1.]);
        assert_close(1.0, s.std_deviation);
        assert_close(0.0, s.var_coeff);
    }

    #[test]
    fn test_mode() {
        assert_eq!(vec![1.0, 3.0], summary(&[3., 1., 2., 3., 1.]).mode);
        assert_eq!(vec![7.0], summary(&[7.]).mode);
        assert!(summary(&[1., 2., 3.]).mode.is_empty());
    }

    #[test]
    fn test_display() {
        let text = summary(&[1., 1., 4.]).to_string();
        assert!(text.contains("MEAN: 2"));
        assert!(text.contains("MODE: [1]"));
    }
}
