//! Price matrix commands

use chrono::NaiveDate;
use clap::Subcommand;

use matrix_core::domain::{PriceCell, PricePatch};
use matrix_core::operators;
use matrix_core::repositories::MatrixGateway;
use matrix_core::services::MatrixSession;

use super::{finish, print_column, run_shared, SharedCommand};

#[derive(Subcommand, Debug)]
pub enum PriceCommand {
    #[command(flatten)]
    Shared(SharedCommand),

    /// Update one price cell; only the given fields change
    Set {
        #[arg(long)]
        column: String,
        #[arg(long)]
        row: String,
        #[arg(long)]
        price: Option<i64>,
        #[arg(long)]
        discount: Option<u8>,
        #[arg(long)]
        prorate: Option<bool>,
        /// First day the price applies (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day the price applies (YYYY-MM-DD)
        #[arg(long)]
        until: Option<NaiveDate>,
        /// Remove both effective dates
        #[arg(long, conflicts_with_all = ["from", "until"])]
        clear_dates: bool,
        #[arg(long)]
        save: bool,
    },
    /// Same price for every package at one duration
    FillRow {
        #[arg(long)]
        row: String,
        #[arg(long)]
        price: i64,
        #[arg(long, default_value_t = 0)]
        discount: u8,
        #[arg(long)]
        save: bool,
    },
    /// Scale a package's prices by a percentage (-100 to 1000)
    Adjust {
        #[arg(long)]
        column: String,
        #[arg(long, allow_negative_numbers = true)]
        percent: f64,
        #[arg(long)]
        save: bool,
    },
    /// Round a package's prices to the nearest multiple
    Round {
        #[arg(long)]
        column: String,
        #[arg(long)]
        nearest: i64,
        #[arg(long)]
        save: bool,
    },
}

pub async fn run<G>(session: &MatrixSession<PriceCell, G>, command: PriceCommand) -> anyhow::Result<()>
where
    G: MatrixGateway<PriceCell>,
{
    session.load_dimensions().await?;

    match command {
        PriceCommand::Shared(shared) => run_shared(session, shared).await?,
        PriceCommand::Set {
            column,
            row,
            price,
            discount,
            prorate,
            from,
            until,
            clear_dates,
            save,
        } => {
            session.load_cells(&column).await?;
            let patch = build_patch(price, discount, prorate, from, until, clear_dates);
            let cell = session.set_cell(&column, &row, &patch)?;
            println!("{} / {}: {} (net {})", column, row, cell.price, cell.net_price());
            finish(session, save).await?;
        }
        PriceCommand::FillRow { row, price, discount, save } => {
            session.load_every_column().await?;
            let value = PriceCell {
                discount_percent: discount,
                ..PriceCell::with_price(price)
            };
            session.apply(|m| operators::fill_row(m, &row, &value))?;
            finish(session, save).await?;
        }
        PriceCommand::Adjust { column, percent, save } => {
            session.load_cells(&column).await?;
            session.apply(|m| operators::adjust_column_by_percent(m, &column, percent))?;
            print_column(session, &column);
            finish(session, save).await?;
        }
        PriceCommand::Round { column, nearest, save } => {
            session.load_cells(&column).await?;
            session.apply(|m| operators::round_column(m, &column, nearest))?;
            print_column(session, &column);
            finish(session, save).await?;
        }
    }

    Ok(())
}

fn build_patch(
    price: Option<i64>,
    discount: Option<u8>,
    prorate: Option<bool>,
    from: Option<NaiveDate>,
    until: Option<NaiveDate>,
    clear_dates: bool,
) -> PricePatch {
    let (effective_from, effective_until) = if clear_dates {
        (Some(None), Some(None))
    } else {
        (from.map(Some), until.map(Some))
    };

    PricePatch {
        price,
        discount_percent: discount,
        prorate,
        effective_from,
        effective_until,
    }
}
