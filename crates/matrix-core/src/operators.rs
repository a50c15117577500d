//! Bulk operators.
//!
//! Each operator reads a matrix and returns a new one; nothing here touches the
//! network. Columns that receive writes are flagged unsaved in the result.
//!
//! Rounding is half-up everywhere (values are never negative, so this is the
//! same as half away from zero): 148 500 rounded to 1 000 is 149 000, and a
//! percentage result of 115.5 becomes 116.

use tracing::debug;

use crate::domain::{CellValue, NumericCell, PermissionCell, PermissionPreset};
use crate::error::MatrixError;
use crate::matrix::Matrix;

pub const MIN_PERCENT: f64 = -100.0;
pub const MAX_PERCENT: f64 = 1000.0;

/// Basis points per 100 %
const BP_SCALE: i128 = 10_000;

/// Copy every non-default cell of `from` onto `to`; default source cells leave the target alone
pub fn copy_column<V: CellValue>(matrix: &Matrix<V>, from: &str, to: &str) -> Result<Matrix<V>, MatrixError> {
    matrix.ensure_column(from)?;
    matrix.ensure_column(to)?;

    let mut next = matrix.clone();
    if from == to {
        return Ok(next);
    }

    let mut copied = 0;
    for row in matrix.rows() {
        if let Some(source) = matrix.cell(from, &row.id).filter(|v| !v.is_default()) {
            next.store(to, &row.id, source.clone());
            copied += 1;
        }
    }

    debug!("Copied {} cells from column {} to {}", copied, from, to);
    Ok(next)
}

/// Scale every non-default cell of a column by (1 + pct/100), rounded to whole units.
/// `pct` is honoured to two decimal places.
pub fn adjust_column_by_percent<V: NumericCell>(
    matrix: &Matrix<V>,
    column_id: &str,
    pct: f64,
) -> Result<Matrix<V>, MatrixError> {
    if !pct.is_finite() || !(MIN_PERCENT..=MAX_PERCENT).contains(&pct) {
        return Err(MatrixError::PercentOutOfRange(pct));
    }
    matrix.ensure_column(column_id)?;

    let factor_bp = BP_SCALE + (pct * 100.0).round() as i128;
    let mut next = matrix.clone();

    for row in matrix.rows() {
        let Some(cell) = matrix.cell(column_id, &row.id).filter(|v| !v.is_default()) else {
            continue;
        };

        let scaled = i128::from(cell.amount()) * factor_bp;
        let adjusted = round_half_up_div(scaled, BP_SCALE);
        let amount = i64::try_from(adjusted).map_err(|_| MatrixError::PriceOverflow(column_id.to_string()))?;
        next.store(column_id, &row.id, cell.with_amount(amount));
    }

    debug!("Adjusted column {} by {}%", column_id, pct);
    Ok(next)
}

/// Round every non-default cell of a column to the nearest multiple of `nearest`
pub fn round_column<V: NumericCell>(
    matrix: &Matrix<V>,
    column_id: &str,
    nearest: i64,
) -> Result<Matrix<V>, MatrixError> {
    if nearest <= 0 {
        return Err(MatrixError::InvalidRoundingStep(nearest));
    }
    matrix.ensure_column(column_id)?;

    let mut next = matrix.clone();
    for row in matrix.rows() {
        let Some(cell) = matrix.cell(column_id, &row.id).filter(|v| !v.is_default()) else {
            continue;
        };

        let rounded = round_half_up_div(i128::from(cell.amount()), i128::from(nearest)) * i128::from(nearest);
        let amount = i64::try_from(rounded).map_err(|_| MatrixError::PriceOverflow(column_id.to_string()))?;
        next.store(column_id, &row.id, cell.with_amount(amount));
    }

    debug!("Rounded column {} to nearest {}", column_id, nearest);
    Ok(next)
}

/// Write one value across every column of a row
pub fn fill_row<V: CellValue>(matrix: &Matrix<V>, row_id: &str, value: &V) -> Result<Matrix<V>, MatrixError> {
    value.validate()?;
    if matrix.row(row_id).is_none() {
        return Err(MatrixError::UnknownRow(row_id.to_string()));
    }

    let mut next = matrix.clone();
    for column in matrix.columns() {
        next.store(&column.id, row_id, value.clone());
    }
    Ok(next)
}

/// Make every absent pair an explicit default cell. Idempotent.
pub fn fill_empty_with_zero<V: CellValue>(matrix: &Matrix<V>) -> Matrix<V> {
    let mut next = matrix.clone();
    let mut filled = 0;
    for column in matrix.columns() {
        for row in matrix.rows() {
            if !matrix.is_explicit(&column.id, &row.id) {
                next.store(&column.id, &row.id, V::default());
                filled += 1;
            }
        }
    }

    debug!("Filled {} empty cells", filled);
    next
}

/// Drop every cell; all columns become unsaved
pub fn clear_all<V: CellValue>(matrix: &Matrix<V>) -> Matrix<V> {
    let mut next = matrix.clone();
    next.clear_cells();
    next
}

/// Apply one permission preset to every menu of a module within a level.
/// `group = None` targets menus without a module.
pub fn apply_preset_to_group(
    matrix: &Matrix<PermissionCell>,
    column_id: &str,
    group: Option<&str>,
    preset: PermissionPreset,
) -> Result<Matrix<PermissionCell>, MatrixError> {
    matrix.ensure_column(column_id)?;

    let value = preset.cell();
    let mut next = matrix.clone();
    let rows = matrix.rows_in_group(group);
    for row in &rows {
        next.store(column_id, &row.id, value);
    }

    debug!(
        "Applied preset {} to {} menus of group {:?} in {}",
        preset.as_str(),
        rows.len(),
        group,
        column_id
    );
    Ok(next)
}

/// Half-up division for non-negative numerators
fn round_half_up_div(numerator: i128, denominator: i128) -> i128 {
    let quotient = numerator.div_euclid(denominator);
    let remainder = numerator.rem_euclid(denominator);
    if remainder * 2 >= denominator {
        quotient + 1
    } else {
        quotient
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PermissionCell, PriceCell};
    use crate::matrix::tests::{access_matrix, price_matrix};

    #[test]
    fn test_copy_column_skips_default_sources() {
        let mut m = price_matrix();
        m.put_cell("starter", "1mo", PriceCell::with_price(149_000)).unwrap();
        m.mark_saved("starter");

        let copied = copy_column(&m, "starter", "pro").unwrap();
        assert_eq!(copied.get_cell("pro", "1mo").price, 149_000);
        assert_eq!(copied.get_cell("pro", "12mo").price, 0);
        assert!(!copied.is_explicit("pro", "12mo"));
        assert!(copied.is_dirty("pro"));
        // input untouched
        assert!(!m.is_explicit("pro", "1mo"));
    }

    #[test]
    fn test_copy_column_keeps_target_when_source_is_default() {
        let mut m = price_matrix();
        m.put_cell("pro", "12mo", PriceCell::with_price(1_490_000)).unwrap();
        m.put_cell("starter", "12mo", PriceCell::default()).unwrap();

        let copied = copy_column(&m, "starter", "pro").unwrap();
        assert_eq!(copied.get_cell("pro", "12mo").price, 1_490_000);
    }

    #[test]
    fn test_copy_column_unknown_ids() {
        let m = price_matrix();
        assert!(matches!(copy_column(&m, "ghost", "pro"), Err(MatrixError::UnknownColumn(_))));
        assert!(matches!(copy_column(&m, "pro", "ghost"), Err(MatrixError::UnknownColumn(_))));
    }

    #[test]
    fn test_adjust_is_lossy_round_trip() {
        let mut m = price_matrix();
        m.put_cell("starter", "1mo", PriceCell::with_price(100)).unwrap();

        let up = adjust_column_by_percent(&m, "starter", 10.0).unwrap();
        assert_eq!(up.get_cell("starter", "1mo").price, 110);

        let down = adjust_column_by_percent(&up, "starter", -10.0).unwrap();
        // 110 * 0.9 = 99, not the original 100
        assert_eq!(down.get_cell("starter", "1mo").price, 99);
    }

    #[test]
    fn test_adjust_rounds_half_up() {
        let mut m = price_matrix();
        m.put_cell("starter", "1mo", PriceCell::with_price(105)).unwrap();
        m.put_cell("starter", "12mo", PriceCell::with_price(149_000)).unwrap();

        let up = adjust_column_by_percent(&m, "starter", 10.0).unwrap();
        // 115.5 -> 116
        assert_eq!(up.get_cell("starter", "1mo").price, 116);
        assert_eq!(up.get_cell("starter", "12mo").price, 163_900);
    }

    #[test]
    fn test_adjust_skips_default_cells_and_other_columns() {
        let mut m = price_matrix();
        m.put_cell("starter", "1mo", PriceCell::default()).unwrap();
        m.put_cell("pro", "1mo", PriceCell::with_price(200)).unwrap();

        let up = adjust_column_by_percent(&m, "starter", 50.0).unwrap();
        assert_eq!(up.get_cell("starter", "1mo"), PriceCell::default());
        assert!(!up.is_explicit("starter", "12mo"));
        assert_eq!(up.get_cell("pro", "1mo").price, 200);
    }

    #[test]
    fn test_adjust_keeps_other_price_fields() {
        let mut m = price_matrix();
        let cell = PriceCell {
            price: 1_000,
            discount_percent: 20,
            prorate: true,
            ..PriceCell::default()
        };
        m.put_cell("pro", "1mo", cell).unwrap();

        let up = adjust_column_by_percent(&m, "pro", 12.5).unwrap();
        let adjusted = up.get_cell("pro", "1mo");
        assert_eq!(adjusted.price, 1_125);
        assert_eq!(adjusted.discount_percent, 20);
        assert!(adjusted.prorate);
    }

    #[test]
    fn test_adjust_validates_percent() {
        let m = price_matrix();
        for pct in [-100.01, 1000.5, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                adjust_column_by_percent(&m, "starter", pct),
                Err(MatrixError::PercentOutOfRange(_))
            ));
        }

        let mut m = price_matrix();
        m.put_cell("starter", "1mo", PriceCell::with_price(5_000)).unwrap();
        let zeroed = adjust_column_by_percent(&m, "starter", -100.0).unwrap();
        assert_eq!(zeroed.get_cell("starter", "1mo").price, 0);
    }

    #[test]
    fn test_round_column_half_up() {
        let mut m = price_matrix();
        m.put_cell("starter", "1mo", PriceCell::with_price(148_500)).unwrap();
        m.put_cell("starter", "12mo", PriceCell::with_price(148_499)).unwrap();

        let rounded = round_column(&m, "starter", 1_000).unwrap();
        assert_eq!(rounded.get_cell("starter", "1mo").price, 149_000);
        assert_eq!(rounded.get_cell("starter", "12mo").price, 148_000);
    }

    #[test]
    fn test_round_column_rejects_bad_step() {
        let m = price_matrix();
        assert!(matches!(round_column(&m, "starter", 0), Err(MatrixError::InvalidRoundingStep(0))));
        assert!(matches!(round_column(&m, "starter", -10), Err(MatrixError::InvalidRoundingStep(-10))));
    }

    #[test]
    fn test_fill_row() {
        let m = price_matrix();
        let filled = fill_row(&m, "12mo", &PriceCell::with_price(990_000)).unwrap();
        assert_eq!(filled.get_cell("starter", "12mo").price, 990_000);
        assert_eq!(filled.get_cell("pro", "12mo").price, 990_000);
        assert!(!filled.is_explicit("pro", "1mo"));

        assert!(fill_row(&m, "12mo", &PriceCell::with_price(-1)).is_err());
        assert!(matches!(
            fill_row(&m, "ghost", &PriceCell::default()),
            Err(MatrixError::UnknownRow(_))
        ));
    }

    #[test]
    fn test_fill_empty_with_zero_is_idempotent() {
        let mut m = price_matrix();
        m.put_cell("pro", "1mo", PriceCell::with_price(149_000)).unwrap();

        let once = fill_empty_with_zero(&m);
        let twice = fill_empty_with_zero(&once);

        assert_eq!(once.explicit_count(), 4);
        assert_eq!(once.to_rows(), twice.to_rows());
        assert_eq!(twice.get_cell("pro", "1mo").price, 149_000);
        assert!(once.to_rows().iter().all(|r| r.explicit));
    }

    #[test]
    fn test_clear_all() {
        let mut m = access_matrix();
        m.put_cell("LEVEL_A", "users", PermissionCell::full_access()).unwrap();
        m.mark_saved("LEVEL_A");

        let cleared = clear_all(&m);
        assert_eq!(cleared.explicit_count(), 0);
        assert_eq!(cleared.get_cell("LEVEL_A", "users"), PermissionCell::default());
        assert_eq!(cleared.unsaved_columns(), vec!["LEVEL_A".to_string(), "LEVEL_B".to_string()]);
    }

    #[test]
    fn test_apply_preset_to_group() {
        let m = access_matrix();
        let granted =
            apply_preset_to_group(&m, "LEVEL_B", Some("Settings"), PermissionPreset::ReadOnly).unwrap();

        assert_eq!(granted.get_cell("LEVEL_B", "users"), PermissionCell::read_only());
        assert_eq!(granted.get_cell("LEVEL_B", "roles"), PermissionCell::read_only());
        assert!(!granted.is_explicit("LEVEL_B", "products"));
        assert!(!granted.is_explicit("LEVEL_A", "users"));

        let ungrouped = apply_preset_to_group(&m, "LEVEL_A", None, PermissionPreset::FullAccess).unwrap();
        assert_eq!(ungrouped.get_cell("LEVEL_A", "home"), PermissionCell::full_access());
    }
}
