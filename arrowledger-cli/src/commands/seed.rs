//! Seed command - populate the ledger with sample data

use anyhow::Result;

use super::get_context;
use crate::output;

pub async fn run(count: usize) -> Result<()> {
    let ctx = get_context()?;
    let seeded = ctx.demo_service.seed(count).await?;
    output::success(&format!("Seeded {} sample transactions", seeded));
    Ok(())
}
