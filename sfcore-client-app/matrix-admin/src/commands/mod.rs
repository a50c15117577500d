//! Command handlers shared by both matrix kinds

pub mod permission;
pub mod price;

use std::path::PathBuf;

use anyhow::Context;
use clap::Subcommand;
use tracing::info;

use matrix_core::domain::CellValue;
use matrix_core::export::to_csv;
use matrix_core::operators;
use matrix_core::repositories::MatrixGateway;
use matrix_core::services::MatrixSession;

pub use permission::PermissionCommand;
pub use price::PriceCommand;

#[derive(Subcommand, Debug)]
pub enum SharedCommand {
    /// Write the full matrix as CSV
    Export {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Export unset cells as explicit defaults
        #[arg(long)]
        fill_empty: bool,
    },
    /// Print one column
    Show {
        #[arg(long)]
        column: String,
    },
    /// Copy every non-default cell of one column onto another
    Copy {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        save: bool,
    },
    /// Make every unset cell an explicit default
    FillEmpty {
        #[arg(long)]
        save: bool,
    },
    /// Drop every cell of every column
    ClearAll {
        #[arg(long)]
        save: bool,
    },
}

/// Expects the dimension lists to be loaded
pub async fn run_shared<V, G>(session: &MatrixSession<V, G>, command: SharedCommand) -> anyhow::Result<()>
where
    V: CellValue,
    G: MatrixGateway<V>,
{
    match command {
        SharedCommand::Export { output, fill_empty } => {
            session.load_every_column().await?;
            let csv = if fill_empty {
                to_csv(&operators::fill_empty_with_zero(&session.snapshot()))
            } else {
                session.read(to_csv)
            };
            write_output(output, &csv)?;
        }
        SharedCommand::Show { column } => {
            session.load_cells(&column).await?;
            print_column(session, &column);
        }
        SharedCommand::Copy { from, to, save } => {
            session.load_cells(&from).await?;
            session.load_cells(&to).await?;
            session.apply(|m| operators::copy_column(m, &from, &to))?;
            finish(session, save).await?;
        }
        SharedCommand::FillEmpty { save } => {
            session.load_every_column().await?;
            session.apply(|m| Ok(operators::fill_empty_with_zero(m)))?;
            finish(session, save).await?;
        }
        SharedCommand::ClearAll { save } => {
            session.apply(|m| Ok(operators::clear_all(m)))?;
            finish(session, save).await?;
        }
    }

    Ok(())
}

fn write_output(output: Option<PathBuf>, csv: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(&path, csv).with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Exported matrix to {}", path.display());
        }
        None => print!("{}", csv),
    }
    Ok(())
}

/// One line per row: id, name, group, then the value fields
pub fn print_column<V, G>(session: &MatrixSession<V, G>, column_id: &str)
where
    V: CellValue,
    G: MatrixGateway<V>,
{
    session.read(|m| {
        println!("row_id\trow_name\trow_group\t{}", V::export_headers().join("\t"));
        for row in m.to_rows().into_iter().filter(|r| r.column_id == column_id) {
            let marker = if row.explicit { "" } else { " (unset)" };
            println!(
                "{}\t{}\t{}\t{}{}",
                row.row_id,
                row.row_name,
                row.row_group.as_deref().unwrap_or("-"),
                row.value.export_fields().join("\t"),
                marker
            );
        }
    });
}

/// Save every unsaved column, or report what would be saved
pub async fn finish<V, G>(session: &MatrixSession<V, G>, save: bool) -> anyhow::Result<()>
where
    V: CellValue,
    G: MatrixGateway<V>,
{
    if save {
        let saved = session.save_unsaved().await?;
        println!("Saved {} column(s): {}", saved.len(), saved.join(", "));
    } else {
        let unsaved = session.read(|m| m.unsaved_columns());
        if unsaved.is_empty() {
            println!("No changes");
        } else {
            println!(
                "Changed {} column(s): {} (run again with --save to write them)",
                unsaved.len(),
                unsaved.join(", ")
            );
        }
    }
    Ok(())
}
