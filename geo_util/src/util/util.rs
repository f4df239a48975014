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
use std::time::{Duration, Instant};
use log::info;

pub fn format_duration(d: Duration) -> String {
    let mut secs = d.as_secs();
    let hours = secs / 3600;
    secs = secs % 3600;
    let minutes = secs / 60;
    secs = secs % 60;

    let ms = d.as_millis() % 1000;

    format!("{}h {}m {}s {}ms", hours, minutes, secs, ms )
}

/// Estimated (remaining, total) time given how far along we are
pub fn estimate_remaining(elapsed: Duration, num_processed: u64, num_total: u64) -> (Duration, Duration) {
    let time_per_result = if num_processed == 0 {
        elapsed
    } else {
        elapsed.div_f64(num_processed as f64)
    };
    let remaining = num_total.saturating_sub(num_processed);
    (time_per_result.mul_f64(remaining as f64), time_per_result.mul_f64(num_total as f64))
}

/// Logs progress of a long running loop, at most once every `interval`
pub struct ProgressLog {
    label: String,
    start: Instant,
    last_output: Instant,
    interval: Duration,
    num_processed: u64,
    num_total: Option<u64>,
}

impl ProgressLog {
    pub fn new(label: &str, num_total: Option<u64>) -> Self {
        let now = Instant::now();
        ProgressLog {
            label: label.to_string(),
            start: now,
            last_output: now,
            interval: Duration::from_secs(3),
            num_processed: 0,
            num_total,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn num_processed(&self) -> u64 {
        self.num_processed
    }

    pub fn tick(&mut self) {
        self.num_processed += 1;

        if self.last_output.elapsed() >= self.interval {
            self.last_output = Instant::now();
            self.log_progress();
        }
    }

    pub fn log_progress(&self) {
        let elapsed = self.start.elapsed();
        match self.num_total {
            Some(total) => {
                let (remaining, est_total) = estimate_remaining(elapsed, self.num_processed, total);
                info!("{}: through {} of {}. Elapsed: {} Est. Remaining: {} Est total time: {}",
                      self.label,
                      self.num_processed, total,
                      format_duration(elapsed),
                      format_duration(remaining),
                      format_duration(est_total));
            }
            None => {
                info!("{}: through {}. Elapsed: {}",
                      self.label,
                      self.num_processed,
                      format_duration(elapsed));
            }
        }
    }

    /// Logs the final count
    pub fn finish(&self) {
        info!("{}: done, {} processed in {}",
              self.label, self.num_processed, format_duration(self.start.elapsed()));
    }
}
