use sales_forecast_engine::*;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    println!("📊 Sales Dashboard Demo\n");

    let headers = ["Country", "Month", "Amount", "Profit", "Profit Percent"];
    let rows: Vec<Vec<String>> = [
        ["GE", "January", "1000", "100", "10"],
        ["GE", "February", "2000", "200", "10"],
        ["AM", "January", "1500", "150", "10"],
        ["AM", "March", "900", "n/a", ""],
        ["TR", "March", "400", "60", "15"],
    ]
    .iter()
    .map(|r| r.iter().map(|c| c.to_string()).collect())
    .collect();

    let dataset = dataset_from_records(&headers, &rows)?;

    let roles = ColumnRoles::new("Country", "Month")
        .with_measure(MeasureRole::Amount, "Amount")
        .with_measure(MeasureRole::Profit, "Profit")
        .with_measure(MeasureRole::ProfitPercent, "Profit Percent");
    let mut config = DashboardConfig::new(roles, 12.0);
    config.top_n = Some(2);

    let report = process_with_verification(&dataset, &config, 1e-6)?;

    println!("📋 Totals at {}% growth:", report.growth_rate);
    for total in &report.totals {
        match total.forecast {
            Some(f) => println!(
                "  {:<16} {:>10.0} → {:>10.0} ({:+.0})",
                total.column,
                f.historical,
                f.forecast_rounded(),
                f.delta_rounded()
            ),
            None => println!("  {:<16} undefined", total.column),
        }
    }

    println!("\n🏆 Top countries by amount:");
    for group in &report.by_category_a.groups {
        println!(
            "  {:<4} {:>10.0}",
            group.key[0],
            group.value("Amount").unwrap_or(0.0)
        );
    }

    if let Some(pivot) = report.pivots.first() {
        println!("\n🗂  {} by {} × {}:", pivot.measure.column, pivot.row_column, pivot.column_column);
        println!("  {:<4} {}", "", pivot.column_keys.join("  "));
        for (row, cells) in pivot.row_keys.iter().zip(&pivot.cells) {
            let cells: Vec<String> = cells
                .iter()
                .map(|c| c.map(|v| format!("{:.0}", v)).unwrap_or_else(|| "-".to_string()))
                .collect();
            println!("  {:<4} {}", row, cells.join("  "));
        }
    }

    println!("\n📅 Calendar completion:");
    for month in &report.completion.synthesized {
        println!("  {:<10} ← {} ({} rows)", month.month, month.donor, month.rows);
    }

    Ok(())
}
