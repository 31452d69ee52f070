use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::error::Error;

use crate::ledger::{LEDGER_HEADER, LedgerSnapshot};

/// Convert the ledger to XLSX format
///
/// This function exports every ledger row, in append order, to an Excel
/// workbook using the rust_xlsxwriter library. The first row holds the ledger
/// header in bold. Cells that did not parse in the ledger are left blank.
///
/// # Arguments
/// * `snapshot` - Ledger rows to export
///
/// # Returns
/// * `Result<Vec<u8>, Box<dyn Error>>` - XLSX file content as bytes or an error
///
/// # Examples
/// ```
/// use carbon_footprint::export::ledger_to_xlsx;
/// use carbon_footprint::ledger::LedgerSnapshot;
///
/// match ledger_to_xlsx(&LedgerSnapshot::Rows(vec![])) {
///     Ok(xlsx_data) => println!("XLSX generated: {} bytes", xlsx_data.len()),
///     Err(e) => eprintln!("Failed to generate XLSX: {}", e),
/// }
/// ```
pub fn ledger_to_xlsx(snapshot: &LedgerSnapshot) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    worksheet.set_name("Carbon Footprint")?;

    let bold = Format::new().set_bold();
    for (col, title) in LEDGER_HEADER.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *title, &bold)?;
        worksheet.set_column_width(col as u16, if col == 0 { 24.0 } else { 20.0 })?;
    }

    for (i, row) in snapshot.rows().iter().enumerate() {
        let r = (i + 1) as u32;
        if let Some(name) = &row.name {
            worksheet.write_string(r, 0, name)?;
        }
        if let Some(year) = row.year {
            worksheet.write_number(r, 1, year as f64)?;
        }

        let amounts = [row.electricity_co2, row.waste_co2, row.travel_co2, row.total_co2];
        for (offset, amount) in amounts.iter().enumerate() {
            if let Some(value) = amount {
                worksheet.write_number(r, 2 + offset as u16, *value)?;
            }
        }
    }

    workbook.push_worksheet(worksheet);

    let buffer = workbook.save_to_buffer()?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerRow;

    #[test]
    fn exports_a_zip_container() {
        let snapshot = LedgerSnapshot::Rows(vec![LedgerRow {
            name: Some("Acme".to_string()),
            year: Some(2024),
            electricity_co2: Some(3.78),
            waste_co2: None,
            travel_co2: Some(23.1),
            total_co2: Some(61.08),
        }]);

        let bytes = ledger_to_xlsx(&snapshot).unwrap();
        // XLSX files are zip archives.
        assert!(bytes.starts_with(b"PK"));
    }
}
