//! User management commands.
//!
//! These talk to the database directly and bypass API permission checks,
//! which is how the first admin gets promoted.

use stocksavvy_api::db::{self, PgStore, ResourceStore};
use stocksavvy_api::models::NewUser;
use stocksavvy_core::{Email, Role};

use super::{CommandError, database_url};

async fn connect() -> Result<PgStore, CommandError> {
    let database_url = database_url()?;
    tracing::info!("Connecting to database...");
    Ok(PgStore::new(db::create_pool(&database_url).await?))
}

/// Print every user, oldest first.
pub async fn list() -> Result<(), CommandError> {
    let store = connect().await?;
    let users = store.list_users().await?;

    #[allow(clippy::print_stdout)]
    {
        println!("{:<36}  {:<8}  {:<32}  NAME", "ID", "ROLE", "EMAIL");
        for user in &users {
            let marker = if user.is_placeholder() { " (invited)" } else { "" };
            println!(
                "{:<36}  {:<8}  {:<32}  {}{}",
                user.id.to_string(),
                user.role.to_string(),
                user.email.as_str(),
                user.name(),
                marker
            );
        }
    }

    tracing::info!(count = users.len(), "Listed users");
    Ok(())
}

/// Set a user's role by email.
///
/// Users who have never signed in get a placeholder record carrying the
/// role, so it applies on their first login.
pub async fn set_role(email: &str, role: &str) -> Result<(), CommandError> {
    let role: Role = role
        .parse()
        .map_err(|_| CommandError::InvalidRole(role.to_owned()))?;
    let email = Email::parse(email).map_err(|_| CommandError::InvalidEmail(email.to_owned()))?;

    let store = connect().await?;

    let user = if let Some(existing) = store.find_user_by_email(&email).await? {
        store.set_role(existing.id, role).await?
    } else {
        tracing::info!("No user with email {email}; creating placeholder");
        store
            .create_user(NewUser {
                role,
                ..NewUser::placeholder(email)
            })
            .await?
    };

    tracing::info!(
        "Role updated! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );
    Ok(())
}
