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
use thiserror::Error;

use crate::value::DataType;

/// Errors raised by the aggregation itself.  Errors coming from a data source
/// are passed through unchanged, so callers can tell them apart with
/// `err.downcast_ref::<ErrorKind>()`
#[derive(Clone, PartialEq, Debug, Error)]
pub enum ErrorKind {
    #[error("Operation canceled")]
    Canceled,
    #[error("At least 1 grouping property is required")]
    NoGroupingProperty,
    #[error(
        "Invalid property name '{}' for dataset '{}'",
        property_name, dataset_name
    )]
    InvalidPropertyName {
        property_name: String,
        dataset_name: String,
    },
    #[error(
        "Property '{}' of type {:?} can not be used for grouping",
        property_name, data_type
    )]
    InvalidGroupingProperty {
        property_name: String,
        data_type: DataType,
    },
    #[error("Data source can not run the aggregation as a query: {reason}")]
    PushdownUnsupported { reason: String },
    #[error(
        "Statistic {} on '{}' can not be computed by a query",
        statistic, property_name
    )]
    StatisticNotPushable {
        statistic: String,
        property_name: String,
    },
    #[error(
        "Can not store a {:?} value in column '{}' of type {:?}",
        value_type, column_name, column_type
    )]
    TypeMismatch {
        value_type: DataType,
        column_name: String,
        column_type: DataType,
    },
    #[error("Dataset '{0}' not found")]
    DatasetNotFound(String),
    #[error("Dataset '{0}' already exists")]
    DatasetExists(String),
    #[error(
        "Invalid column index {} used on method {}",
        index, method_name
    )]
    InvalidColumnIndex {
        index: usize,
        method_name: &'static str,
    },
    #[error("No current row on method {method_name}, call move_next first")]
    NoCurrentRow { method_name: &'static str },
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// True if the error (or its cause) is a user requested cancel
pub fn is_canceled(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|cause| matches!(cause.downcast_ref::<ErrorKind>(), Some(ErrorKind::Canceled)))
}
