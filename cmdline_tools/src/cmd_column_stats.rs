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
use std::path::PathBuf;
use anyhow::Result;
use structopt::StructOpt;

use vp_agg::datasource::DataSet;
use vp_agg::stats::{NumericSummary, StringSummary};

use crate::csv_layer::{read_layer_from_path, CsvLayerOptions};

#[derive(StructOpt)]
pub struct ColumnStatsArgs {
    #[structopt(long, parse(from_os_str))]
    pub(crate) in_csv: PathBuf,

    #[structopt(long)]
    pub(crate) column: String,
}

pub fn print_column_stats(args: &ColumnStatsArgs) -> Result<()> {
    let layer = read_layer_from_path(&args.in_csv, &CsvLayerOptions {
        layer_name: "layer",
        geom_column: None,
        geom_type: None,
        srid: 0,
    })?;

    let idx = layer.schema().property_index(&args.column)?;
    let property = &layer.schema().properties[idx];

    println!("Column {} ({}) of {:?}", property.name, property.data_type, args.in_csv);

    if property.data_type.is_numeric() {
        let values: Vec<Option<f64>> = layer.rows().iter().map(|r| r[idx].as_f64()).collect();
        print!("{}", NumericSummary::compute(&values));
    } else {
        let values: Vec<Option<String>> = layer.rows().iter().map(|r| r[idx].to_canonical_string()).collect();
        let summary = StringSummary::compute(&values);
        println!("{:>14}: {}", "MIN", summary.min.as_deref().unwrap_or_default());
        println!("{:>14}: {}", "MAX", summary.max.as_deref().unwrap_or_default());
        println!("{:>14}: {}", "COUNT", summary.count);
        println!("{:>14}: {}", "VALID_COUNT", summary.valid_count);
    }

    Ok(())
}
