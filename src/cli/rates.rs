use super::ui;
use crate::core::{ConversionResult, RateConverter, RateTable, ToCurrency};
use anyhow::Result;
use chrono::NaiveDate;
use comfy_table::Cell;

fn date_label(date: Option<NaiveDate>) -> String {
    date.map_or("latest".to_string(), |d| d.to_string())
}

pub async fn show_rate(
    converter: &RateConverter,
    from: &str,
    to: &str,
    date: Option<NaiveDate>,
) -> Result<String> {
    let from = from.to_currency()?;
    let to = to.to_currency()?;
    let rate = converter.get_rate(from, to, date).await?;
    Ok(format!(
        "1 {} = {} {} ({})",
        ui::style_text(to.code(), ui::StyleType::TotalLabel),
        ui::style_text(&rate.to_string(), ui::StyleType::TotalValue),
        from,
        ui::style_text(&date_label(date), ui::StyleType::Subtle)
    ))
}

pub async fn show_conversion(
    converter: &RateConverter,
    amount: f64,
    from: &str,
    to: &str,
    date: Option<NaiveDate>,
) -> Result<String> {
    // No default value: every failure is reported
    let result = converter.safe_convert(amount, from, to, date, None).await?;
    Ok(display_conversion(&result))
}

pub fn display_conversion(result: &ConversionResult) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Amount"),
        ui::header_cell("From"),
        ui::header_cell("Converted"),
        ui::header_cell("To"),
        ui::header_cell("Rate"),
        ui::header_cell("Date"),
    ]);
    table.add_row(vec![
        ui::amount_cell(result.original_amount),
        Cell::new(result.from_currency.code()),
        ui::amount_cell(result.converted_amount),
        Cell::new(result.to_currency.code()),
        ui::rate_cell(result.rate),
        Cell::new(date_label(result.conversion_date)),
    ]);
    table.to_string()
}

pub async fn show_rates(
    converter: &RateConverter,
    base: &str,
    date: Option<NaiveDate>,
) -> Result<String> {
    let base = base.to_currency()?;
    let rates = converter.resolve_rate_table(base, date).await?;
    Ok(display_rates(base.code(), date, &rates))
}

pub fn display_rates(base: &str, date: Option<NaiveDate>, rates: &RateTable) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell(&format!("Units per 1 {base}")),
    ]);
    for (code, rate) in rates {
        table.add_row(vec![Cell::new(code.to_uppercase()), ui::rate_cell(*rate)]);
    }

    let mut output = format!(
        "Exchange rates: {} ({})\n\n",
        ui::style_text(base, ui::StyleType::Title),
        ui::style_text(&date_label(date), ui::StyleType::Subtle)
    );
    output.push_str(&table.to_string());
    output
}
