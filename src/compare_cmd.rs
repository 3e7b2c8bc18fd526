use anyhow::{Context, Result};
use log::info;

use crate::{
    cli::CompareArgs,
    config::{Orientation, ReportConfig},
    io_utils,
    loader::LoadOptions,
    pipeline::{self, RunOptions},
    table,
};

pub fn execute(args: &CompareArgs) -> Result<()> {
    let report = resolve_report_config(args)?;
    let load = LoadOptions {
        delimiter: args.delimiter,
        encoding: io_utils::resolve_encoding(args.input_encoding.as_deref())?,
        infer_types: !args.raw,
    };
    info!(
        "Comparing control '{}' with test '{}'",
        args.control.display(),
        args.test.display()
    );

    let outcome = pipeline::run(
        &args.control,
        &args.test,
        &args.output,
        &RunOptions { load, report },
    )?;

    if args.show {
        print!(
            "{}",
            table::render_highlighted(&outcome.control, &outcome.comparison.matrix)
        );
        if !outcome.comparison.records.is_empty() {
            println!();
            print!(
                "{}",
                table::render_mismatch_summary(&outcome.comparison.records)
            );
        }
    }

    info!(
        "{} mismatched cell(s) across {} row(s) x {} column(s); accuracy {:.2}%",
        outcome.mismatches,
        outcome.rows,
        outcome.columns,
        outcome.accuracy()
    );
    info!(
        "Comparison report generated successfully. Total runtime: {:.2} seconds",
        outcome.elapsed.as_secs_f64()
    );
    info!(
        "Report saved to {:?} ({} page(s))",
        outcome.output, outcome.pages
    );
    Ok(())
}

fn resolve_report_config(args: &CompareArgs) -> Result<ReportConfig> {
    let mut config = match &args.config {
        Some(path) => ReportConfig::load(path)
            .with_context(|| format!("Loading report config from {path:?}"))?,
        None => ReportConfig::default(),
    };
    if let Some(title) = &args.title {
        config.title = title.clone();
    }
    if let Some(page_size) = args.page_size {
        config.page_size = page_size;
    }
    if args.portrait {
        config.orientation = Orientation::Portrait;
    }
    config.ensure_valid()?;
    Ok(config)
}
