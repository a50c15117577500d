//! CSV export of the full matrix cross product.
//!
//! - One header row, then one line per (column, row) pair
//! - Fields containing commas, quotes or line breaks are quoted, inner quotes doubled

use crate::domain::{CellValue, MatrixRow};
use crate::matrix::Matrix;

pub fn to_csv<V: CellValue>(matrix: &Matrix<V>) -> String {
    let mut csv_content = String::new();

    write_line(&mut csv_content, MatrixRow::<V>::headers().into_iter());
    for row in matrix.to_rows() {
        let fields = row.fields();
        write_line(&mut csv_content, fields.iter().map(String::as_str));
    }

    csv_content
}

fn write_line<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    for (i, field) in fields.enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&escape_field(field));
    }
    out.push('\n');
}

pub fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ColumnDimension, PermissionCell, PriceCell, RecordStatus, RowDimension};
    use crate::matrix::tests::price_matrix;

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("two\nlines"), "\"two\nlines\"");
        assert_eq!(escape_field(""), "");
    }

    #[test]
    fn test_price_csv_layout() {
        let mut m = price_matrix();
        m.put_cell("starter", "1mo", PriceCell::with_price(149_000)).unwrap();

        let csv = to_csv(&m);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 1 + 4);
        assert_eq!(
            lines[0],
            "column_id,column_name,row_id,row_name,row_group,explicit,price,discount_percent,prorate,effective_from,effective_until"
        );
        assert_eq!(lines[1], "starter,Starter,1mo,1 Month,,true,149000,0,false,,");
        assert_eq!(lines[2], "starter,Starter,12mo,12 Months,,false,0,0,false,,");
        assert!(csv.ends_with('\n'));
    }

    #[test]
    fn test_permission_csv_quotes_names() {
        let mut m: Matrix<PermissionCell> = Matrix::new(
            vec![ColumnDimension::new("L1", "Admin, Senior", RecordStatus::Active).unwrap()],
            vec![RowDimension::new("M1", "The \"Users\" page", Some("Settings".into()), RecordStatus::Active).unwrap()],
        );
        m.put_cell("L1", "M1", PermissionCell::read_only()).unwrap();

        let csv = to_csv(&m);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "column_id,column_name,row_id,row_name,row_group,explicit,access,view,add,edit,delete,approve,print");
        assert_eq!(
            lines[1],
            "L1,\"Admin, Senior\",M1,\"The \"\"Users\"\" page\",Settings,true,true,true,false,false,false,false,true"
        );
    }
}
