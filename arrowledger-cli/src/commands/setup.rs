//! Setup command - create the initial admin, taylor, and dad users

use anyhow::Result;
use colored::Colorize;
use dialoguer::{Confirm, Password};

use arrowledger_core::ports::repository::Repository;
use arrowledger_core::services::hash_password;
use arrowledger_core::{Role, User};
use uuid::Uuid;

use super::get_context;
use crate::output;

pub async fn run(domain: &str) -> Result<()> {
    let ctx = get_context()?;

    let users = [
        (format!("admin@{}", domain), Role::Admin),
        (format!("taylor@{}", domain), Role::Taylor),
        (format!("dad@{}", domain), Role::Dad),
    ];

    println!("{}", "Arrow Financial User Setup".bold());
    println!();
    println!("You will be prompted to set passwords for each user.");
    println!();

    for (email, role) in &users {
        match ctx.repository.get_user_by_email(email).await? {
            Some(mut existing) => {
                println!("User {} already exists.", email);
                let update = Confirm::new()
                    .with_prompt("Update password?")
                    .default(false)
                    .interact()?;
                if update {
                    let password = prompt_password(email, role)?;
                    existing.password_hash = hash_password(&password)?;
                    ctx.repository.update_user(&existing).await?;
                    output::success(&format!("Updated password for {} ({})", email, role));
                } else {
                    output::info(&format!("Skipped {}", email));
                }
            }
            None => {
                let password = prompt_password(email, role)?;
                let user = User::new(Uuid::new_v4(), email.clone(), hash_password(&password)?, *role);
                ctx.repository.add_user(&user).await?;
                output::success(&format!("Created user {} ({})", email, role));
            }
        }
    }

    println!();
    println!("{}", "Setup Complete".bold());
    println!();
    println!("Users:");
    for user in ctx.repository.get_users().await? {
        println!("  - {} ({})", user.email, user.role);
    }

    Ok(())
}

fn prompt_password(email: &str, role: &Role) -> Result<String> {
    loop {
        let password = Password::new()
            .with_prompt(format!("Enter password for {} ({})", email, role))
            .interact()?;
        if password.len() < 6 {
            output::warning("Password must be at least 6 characters. Please try again.");
            continue;
        }
        let confirm = Password::new().with_prompt("Confirm password").interact()?;
        if password != confirm {
            output::warning("Passwords do not match. Please try again.");
            continue;
        }
        return Ok(password);
    }
}
