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
use anyhow::Result;
use log::LevelFilter;
use simple_logger::SimpleLogger;
use structopt::StructOpt;

use crate::cmd_aggregate::{run_aggregate, AggregateArgs};
use crate::cmd_column_stats::{print_column_stats, ColumnStatsArgs};

mod cmd_aggregate;
mod cmd_column_stats;
mod csv_layer;

#[derive(StructOpt)]
struct Cli {

    #[structopt(long, default_value = "Warn")]
    log_level: LevelFilter,

    #[structopt(subcommand)]
    cmd: Command
}

#[derive(StructOpt)]
enum Command {
    #[structopt(help="Groups the rows of a csv layer and writes one row per group with statistics and merged geometry")]
    Aggregate(AggregateArgs),

    #[structopt(help="Prints the statistical summary of one column of a csv layer")]
    ColumnStats(ColumnStatsArgs),
}

fn run() -> Result<()> {
    let args = Cli::from_args();

    SimpleLogger::new().with_level(args.log_level).init()?;

    match &args.cmd {
        Command::Aggregate(r) => {
            run_aggregate(r)?;
        }
        Command::ColumnStats(r) => {
            print_column_stats(r)?;
        }
    }

    Ok(())
}

fn main() {
    run().unwrap();
}
