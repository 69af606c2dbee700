use super::ui;
use crate::core::{Currency, RateConverter};
use crate::report::{self, LedgerRow};
use anyhow::Result;
use comfy_table::Cell;
use std::path::Path;
use tracing::debug;

pub async fn run_report(
    converter: &RateConverter,
    input: &Path,
    target: Currency,
    status: Option<&str>,
) -> Result<String> {
    let rows = report::read_ledger(input, status)?;

    let pb = ui::new_progress_bar(rows.len() as u64);
    pb.set_message("Converting ledger rows...");
    let rows = report::convert_rows(converter, rows, target, &pb).await;
    pb.finish_and_clear();

    debug!(rows = rows.len(), %target, "Ledger converted");
    Ok(display_report(&rows, target))
}

pub fn display_report(rows: &[LedgerRow], target: Currency) -> String {
    let target_code = target.code();
    let mut table = ui::new_styled_table();

    table.set_header(vec![
        ui::header_cell("Id"),
        ui::header_cell("Date"),
        ui::header_cell("Category"),
        ui::header_cell("Amount"),
        ui::header_cell("Currency"),
    ]);

    for row in rows {
        table.add_row(vec![
            Cell::new(&row.id),
            row.date.map_or(ui::na_cell(), |d| Cell::new(d.to_string())),
            row.category
                .as_deref()
                .filter(|c| !c.is_empty())
                .map_or(ui::na_cell(), Cell::new),
            ui::amount_cell(row.amount),
            ui::currency_cell(&row.currency, target_code),
        ]);
    }

    let unconverted = rows.iter().filter(|r| r.currency != target_code).count();
    let total = report::total_in(rows, target);

    let mut output = format!(
        "Ledger: {}\n\n",
        ui::style_text(&format!("{} rows", rows.len()), ui::StyleType::Title)
    );
    output.push_str(&table.to_string());
    output.push_str(&format!(
        "\n\nTotal ({}): {}",
        ui::style_text(target_code, ui::StyleType::TotalLabel),
        ui::style_text(&format!("{total:.2}"), ui::StyleType::TotalValue)
    ));
    if unconverted > 0 {
        output.push_str(&format!(
            "\n{}",
            ui::style_text(
                &format!("{unconverted} row(s) kept in their original currency"),
                ui::StyleType::Error
            )
        ));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_display_report_totals_target_rows() {
        let rows = vec![
            LedgerRow {
                id: "1".to_string(),
                date: NaiveDate::from_ymd_opt(2024, 3, 1),
                status: None,
                amount: 20.0,
                currency: "USD".to_string(),
                category: Some("Travel".to_string()),
            },
            LedgerRow {
                id: "2".to_string(),
                date: None,
                status: None,
                amount: 3.0,
                currency: "GBP".to_string(),
                category: None,
            },
        ];

        let output = display_report(&rows, Currency::USD);
        assert!(output.contains("Travel"));
        assert!(output.contains("20.00"));
        assert!(output.contains("1 row(s) kept in their original currency"));
    }
}
