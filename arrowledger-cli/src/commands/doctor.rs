//! Doctor command - run ledger health checks

use anyhow::Result;
use colored::Colorize;

use super::get_context;

pub async fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let result = ctx.doctor_service.run_checks().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("{}", "Ledger Health Checks".bold());
    println!();

    let mut names: Vec<&String> = result.checks.keys().collect();
    names.sort();
    for name in names {
        let check = &result.checks[name];
        let marker = match check.status.as_str() {
            "pass" => "ok".green(),
            "warning" => "warn".yellow(),
            _ => "fail".red(),
        };
        println!("  [{}] {}: {}", marker, name, check.message);
    }

    println!();
    println!(
        "{} passed, {} warnings, {} errors",
        result.summary.passed, result.summary.warnings, result.summary.errors
    );

    Ok(())
}
