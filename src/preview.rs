use anyhow::{Context, Result};
use log::info;

use crate::{
    cli::PreviewArgs,
    io_utils,
    loader::{LoadOptions, load_dataset},
    table,
};

pub fn execute(args: &PreviewArgs) -> Result<()> {
    let options = LoadOptions {
        delimiter: args.delimiter,
        encoding: io_utils::resolve_encoding(args.input_encoding.as_deref())?,
        infer_types: !args.raw,
    };
    let dataset = load_dataset(&args.input, &options)
        .with_context(|| format!("Loading {:?}", args.input))?;

    let rows = dataset
        .rows()
        .iter()
        .take(args.rows)
        .map(|row| {
            row.iter()
                .map(|value| {
                    if args.types {
                        format!("{} <{}>", value.as_display(), value.type_name())
                    } else {
                        value.as_display()
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    print!("{}", table::render_table(dataset.columns(), &rows));
    info!(
        "Displayed {} of {} row(s) from {:?}",
        rows.len(),
        dataset.row_count(),
        args.input
    );
    Ok(())
}
