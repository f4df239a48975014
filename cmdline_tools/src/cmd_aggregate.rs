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
use anyhow::{bail, Result};
use log::info;
use structopt::StructOpt;

use geo_util::vector::GeomType;
use vp_agg::config::AggregationJob;
use vp_agg::datasource::{Capabilities, MemoryDataSource};
use vp_agg::{aggregate_in_place, AggregationParams, CancelFlag};

use crate::csv_layer::{read_layer_from_path, write_layer_to_path, CsvLayerOptions};

/// Runs an aggregation job on a csv layer
#[derive(StructOpt)]
pub struct AggregateArgs {
    #[structopt(long, parse(from_os_str))]
    pub(crate) in_csv: PathBuf,

    //must match input_dataset of the job
    #[structopt(long)]
    pub(crate) in_layer: String,

    #[structopt(long)]
    pub(crate) geom_column: String,

    #[structopt(long)]
    pub(crate) geom_type: Option<GeomType>,

    #[structopt(long, default_value = "0")]
    pub(crate) srid: i32,

    #[structopt(long, parse(from_os_str))]
    pub(crate) job: PathBuf,

    #[structopt(long, parse(from_os_str))]
    pub(crate) out_csv: PathBuf,

    #[structopt(long, help = "Evaluate the aggregation as a query, like a spatial database would")]
    pub(crate) emulate_sql: bool,
}

//input and output share the memory source
fn check_in_place(params: &AggregationParams, in_layer: &str) -> Result<()> {
    if params.input_dataset != in_layer {
        bail!("Job reads {} but the layer is {}", params.input_dataset, in_layer);
    }
    if params.output_dataset == params.input_dataset {
        bail!("output_dataset must differ from input_dataset {}", params.input_dataset);
    }
    Ok(())
}

pub fn run_aggregate(args: &AggregateArgs) -> Result<()> {
    let params = AggregationJob::from_path(&args.job)?.into_params()?;
    check_in_place(&params, &args.in_layer)?;

    let layer = read_layer_from_path(&args.in_csv, &CsvLayerOptions {
        layer_name: &args.in_layer,
        geom_column: Some(&args.geom_column),
        geom_type: args.geom_type,
        srid: args.srid,
    })?;
    info!("Read {} rows from {:?}", layer.len(), args.in_csv);

    let mut source = MemoryDataSource::with_capabilities(Capabilities {
        prepared_queries: args.emulate_sql,
        spatial_sql: args.emulate_sql,
        primary_keys: true,
    });
    source.insert_dataset(layer)?;

    let report = aggregate_in_place(&mut source, &params, &CancelFlag::new())?;

    write_layer_to_path(source.dataset(&params.output_dataset)?, &args.out_csv)?;

    println!("Strategy: {}", report.strategy);
    println!("Rows read: {} Groups: {}", report.rows_read, report.groups);
    println!("Columns: {}", report.columns.join(", "));

    Ok(())
}
