//! Logs command - view the audit trail

use anyhow::{anyhow, Result};
use uuid::Uuid;

use arrowledger_core::domain::dates::parse_date_dmy;
use arrowledger_core::{AuditAction, AuditFilter};

use super::{get_context, operator_identity};
use crate::output;

pub async fn run(
    user: Option<String>,
    action: Option<String>,
    from: Option<String>,
    to: Option<String>,
    page: u32,
    limit: Option<u32>,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;

    let mut filter = AuditFilter::default();
    if let Some(user) = &user {
        filter.user_id = Some(Uuid::parse_str(user)?);
    }
    if let Some(action) = &action {
        filter.action = Some(action.parse::<AuditAction>()?);
    }
    if let Some(from) = &from {
        let date = parse_date_dmy(from).ok_or_else(|| anyhow!("Invalid from date: {}", from))?;
        filter.start = Some(date.and_hms_opt(0, 0, 0).unwrap().and_utc());
    }
    if let Some(to) = &to {
        let date = parse_date_dmy(to).ok_or_else(|| anyhow!("Invalid to date: {}", to))?;
        filter.end = Some(date.and_hms_opt(23, 59, 59).unwrap().and_utc());
    }

    let limit = limit.unwrap_or(ctx.config.audit_page_size);
    let entries = ctx
        .audit_service
        .list(&operator_identity(), &filter, page, limit)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No audit entries found.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Time", "Action", "User", "Transaction", "Diff"]);
    for entry in &entries {
        table.add_row(vec![
            entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            entry.action.as_str().to_string(),
            entry
                .user_id
                .map(|u| u.to_string())
                .unwrap_or_default(),
            entry
                .transaction_id
                .map(|t| t.to_string())
                .unwrap_or_default(),
            entry
                .diff
                .as_ref()
                .map(|d| d.to_string())
                .unwrap_or_default(),
        ]);
    }
    println!("{}", table);

    Ok(())
}
