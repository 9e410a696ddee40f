//! User account commands.

use console::style;

use crate::config::Settings;
use crate::models::{NewUser, Role};

/// Register a user account.
pub async fn cmd_user_add(
    settings: &Settings,
    username: &str,
    email: Option<String>,
    role: &str,
) -> anyhow::Result<()> {
    let role = Role::from_str(role)
        .ok_or_else(|| anyhow::anyhow!("Unknown role {:?} (expected admin or user)", role))?;
    let username = username.trim();
    if username.is_empty() {
        anyhow::bail!("Username cannot be empty");
    }

    let ctx = settings.create_db_context()?;
    let users = ctx.users();
    if users.get_by_username(username).await?.is_some() {
        println!("{} User {} already exists", style("!").yellow(), username);
        return Ok(());
    }

    let user = users
        .create(&NewUser {
            username: username.to_string(),
            email,
            role,
            auth_id: None,
        })
        .await?;
    println!(
        "{} Added {} {} (id {})",
        style("✓").green(),
        user.role.as_str(),
        style(&user.username).bold(),
        user.id
    );

    Ok(())
}
