//! Access matrix commands

use clap::Subcommand;

use matrix_core::domain::{PermissionCell, PermissionFlag, PermissionPatch, PermissionPreset};
use matrix_core::operators;
use matrix_core::repositories::MatrixGateway;
use matrix_core::services::MatrixSession;

use super::{finish, print_column, run_shared, SharedCommand};

#[derive(Subcommand, Debug)]
pub enum PermissionCommand {
    #[command(flatten)]
    Shared(SharedCommand),

    /// Grant or revoke single flags on one level/menu cell
    Set {
        #[arg(long)]
        column: String,
        #[arg(long)]
        row: String,
        /// Flags to turn on (access, view, add, edit, delete, approve, print)
        #[arg(long, value_delimiter = ',', value_parser = parse_flag)]
        grant: Vec<PermissionFlag>,
        /// Flags to turn off; revoking access clears every other flag
        #[arg(long, value_delimiter = ',', value_parser = parse_flag)]
        revoke: Vec<PermissionFlag>,
        #[arg(long)]
        save: bool,
    },
    /// Same preset for every level at one menu
    FillRow {
        #[arg(long)]
        row: String,
        #[arg(long, value_parser = parse_preset)]
        preset: PermissionPreset,
        #[arg(long)]
        save: bool,
    },
    /// Apply a preset to every menu of a module within one level
    Grant {
        #[arg(long)]
        column: String,
        /// Module key; menus without a module when omitted
        #[arg(long)]
        group: Option<String>,
        #[arg(long, value_parser = parse_preset)]
        preset: PermissionPreset,
        #[arg(long)]
        save: bool,
    },
}

pub async fn run<G>(session: &MatrixSession<PermissionCell, G>, command: PermissionCommand) -> anyhow::Result<()>
where
    G: MatrixGateway<PermissionCell>,
{
    session.load_dimensions().await?;

    match command {
        PermissionCommand::Shared(shared) => run_shared(session, shared).await?,
        PermissionCommand::Set {
            column,
            row,
            grant,
            revoke,
            save,
        } => {
            session.load_cells(&column).await?;
            let cell = session.set_cell(&column, &row, &build_patch(&grant, &revoke))?;
            println!("{} / {}: {}", column, row, describe(&cell));
            finish(session, save).await?;
        }
        PermissionCommand::FillRow { row, preset, save } => {
            session.load_every_column().await?;
            session.apply(|m| operators::fill_row(m, &row, &preset.cell()))?;
            finish(session, save).await?;
        }
        PermissionCommand::Grant {
            column,
            group,
            preset,
            save,
        } => {
            session.load_cells(&column).await?;
            session.apply(|m| operators::apply_preset_to_group(m, &column, group.as_deref(), preset))?;
            print_column(session, &column);
            finish(session, save).await?;
        }
    }

    Ok(())
}

fn parse_flag(s: &str) -> Result<PermissionFlag, String> {
    PermissionFlag::from_str(s).ok_or_else(|| format!("unknown permission flag '{}'", s))
}

fn parse_preset(s: &str) -> Result<PermissionPreset, String> {
    PermissionPreset::from_str(s).ok_or_else(|| format!("unknown preset '{}' (full, read-only, none)", s))
}

/// Revocations are applied after grants, so `--grant edit --revoke edit` ends revoked
fn build_patch(grant: &[PermissionFlag], revoke: &[PermissionFlag]) -> PermissionPatch {
    let patch = grant
        .iter()
        .fold(PermissionPatch::new(), |patch, flag| patch.with(*flag, true));
    revoke.iter().fold(patch, |patch, flag| patch.with(*flag, false))
}

fn describe(cell: &PermissionCell) -> String {
    let granted: Vec<&str> = PermissionFlag::ALL
        .into_iter()
        .filter(|flag| cell.get(*flag))
        .map(|flag| flag.as_str())
        .collect();

    if granted.is_empty() {
        "no access".to_string()
    } else {
        granted.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matrix_core::domain::CellValue;

    #[test]
    fn test_build_patch_revoke_wins() {
        let patch = build_patch(
            &[PermissionFlag::Access, PermissionFlag::Edit],
            &[PermissionFlag::Edit],
        );
        assert_eq!(patch.access, Some(true));
        assert_eq!(patch.edit, Some(false));
        assert_eq!(patch.view, None);
    }

    #[test]
    fn test_grant_without_access_is_refused_by_merge() {
        let patch = build_patch(&[PermissionFlag::Delete], &[]);
        assert!(PermissionCell::default().merge(&patch).is_err());
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(&PermissionCell::read_only()), "access, view, print");
        assert_eq!(describe(&PermissionCell::no_access()), "no access");
    }

    #[test]
    fn test_parsers() {
        assert_eq!(parse_flag("is_edit"), Ok(PermissionFlag::Edit));
        assert!(parse_flag("download").is_err());
        assert_eq!(parse_preset("full"), Ok(PermissionPreset::FullAccess));
        assert!(parse_preset("admin").is_err());
    }
}
