//! Status command - show ledger summary

use anyhow::Result;
use colored::Colorize;

use super::get_context;
use crate::output;

pub async fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let status = ctx.status_service.get_status().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", "Ledger Status".bold());
    println!();

    let mut table = output::create_table();
    table.add_row(vec!["Transactions", &status.total_transactions.to_string()]);
    table.add_row(vec!["Users", &status.total_users.to_string()]);
    table.add_row(vec!["Audit entries", &status.total_audit_entries.to_string()]);
    if let Some(top_rank) = status.top_rank {
        table.add_row(vec!["Top rank", &top_rank.to_string()]);
    }
    println!("{}", table);
    println!();

    if let (Some(earliest), Some(latest)) =
        (&status.date_range.earliest, &status.date_range.latest)
    {
        println!("Date range: {} to {}", earliest, latest);
    }

    Ok(())
}
