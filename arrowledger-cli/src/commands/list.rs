//! List command - show ledger transactions in display order

use anyhow::Result;

use arrowledger_core::services::ListQuery;

use super::get_context;
use crate::output;

pub async fn run(
    category: Option<String>,
    from: Option<String>,
    to: Option<String>,
    page: u32,
    limit: Option<u32>,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;

    let query = ListQuery {
        category,
        start_date: from,
        end_date: to,
        page: Some(page),
        limit: Some(limit.unwrap_or(ctx.config.page_size)),
    };

    let transactions = ctx.ledger_service.list(&query).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&transactions)?);
        return Ok(());
    }

    if transactions.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec![
        "Rank", "Date", "Category", "Amount", "Taylor", "Dad", "Notes",
    ]);
    for tx in &transactions {
        table.add_row(vec![
            tx.sort_order.to_string(),
            tx.date.to_string(),
            tx.category.to_string(),
            tx.amount.to_string(),
            checkmark(tx.confirmation_taylor),
            checkmark(tx.confirmation_dad),
            tx.notes.clone().unwrap_or_default(),
        ]);
    }
    println!("{}", table);

    Ok(())
}

fn checkmark(confirmed: bool) -> String {
    if confirmed { "yes" } else { "" }.to_string()
}
