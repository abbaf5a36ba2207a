//! Command dispatch for the `fibfan` binary.

use crate::config::{Cli, Command};
use crate::pipeline::{Pipeline, Report};

/// Run the command selected on the command line and print its summary.
pub fn run(cli: Cli) -> anyhow::Result<()> {
    let report = match cli.command {
        Command::Run(args) => Pipeline::new(args.into_config()?).run()?,
        Command::Collect(args) => Pipeline::new(args.into_config()).collect()?,
    };

    println!("{}", summary(&report));

    Ok(())
}

fn summary(report: &Report) -> String {
    format!(
        "--- {} rows, fan-out {:.3} seconds, fan-in {:.3} seconds",
        report.rows,
        report.fan_out.as_secs_f64(),
        report.fan_in.as_secs_f64()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    #[test]
    fn test_summary() {
        let report = Report {
            rows: 500,
            fan_out: Duration::from_millis(720),
            fan_in: Duration::from_millis(370),
        };

        assert_eq!(summary(&report), "--- 500 rows, fan-out 0.720 seconds, fan-in 0.370 seconds");
    }
}
