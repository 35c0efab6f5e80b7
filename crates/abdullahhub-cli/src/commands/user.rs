//! User management CLI commands.

use std::sync::Arc;

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use abdullahhub_auth::{JwtEncoder, PasswordHasher, PasswordValidator};
use abdullahhub_core::config::AppConfig;
use abdullahhub_core::error::AppError;
use abdullahhub_core::types::PageRequest;
use abdullahhub_database::repositories::UserRepository;
use abdullahhub_entity::user::User;
use abdullahhub_service::{AdminUserService, CreateUserRequest};

use crate::output::{self, OutputFormat};

/// Arguments for user commands
#[derive(Debug, Args)]
pub struct UserArgs {
    /// User subcommand
    #[command(subcommand)]
    pub command: UserCommand,
}

/// User subcommands
#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Create an account and send the welcome email
    Create {
        /// Username
        username: String,
        /// Email address
        email: String,
        /// Grant admin rights
        #[arg(long)]
        admin: bool,
        /// Password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// List users
    List {
        /// Page number
        #[arg(long, default_value_t = 1)]
        page: u64,
        /// Users per page
        #[arg(long, default_value_t = 50)]
        page_size: u64,
    },
    /// Grant admin rights
    Promote {
        /// Username
        username: String,
    },
    /// Revoke admin rights
    Demote {
        /// Username
        username: String,
    },
    /// Re-enable a deactivated account
    Activate {
        /// Username
        username: String,
    },
    /// Block an account from signing in
    Deactivate {
        /// Username
        username: String,
    },
    /// Issue a bearer token
    Token {
        /// Username
        username: String,
        /// Lifetime in hours (defaults to the configured TTL)
        #[arg(long)]
        hours: Option<i64>,
    },
}

/// User display row for table output
#[derive(Debug, Serialize, Tabled)]
struct UserRow {
    /// User ID
    id: String,
    /// Username
    username: String,
    /// Email
    email: String,
    /// Admin
    admin: String,
    /// Active
    active: String,
    /// Created at
    created_at: String,
    /// Last login
    last_login: String,
}

impl From<&User> for UserRow {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.to_string(),
            username: u.username.clone(),
            email: u.email.clone(),
            admin: output::yes_no(u.is_admin),
            active: output::yes_no(u.is_active),
            created_at: u.created_at.format("%Y-%m-%d %H:%M").to_string(),
            last_login: u
                .last_login
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Execute user commands
pub async fn execute(
    args: &UserArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let pool = super::create_db_pool(config).await?;
    let service = AdminUserService::new(
        Arc::new(UserRepository::new(pool.clone())),
        Arc::new(PasswordHasher::new()),
        Arc::new(PasswordValidator::new(&config.auth)),
        Arc::new(JwtEncoder::new(&config.auth)),
        super::mailer(config)?,
    );

    match &args.command {
        UserCommand::Create {
            username,
            email,
            admin,
            password,
        } => {
            let password = match password {
                Some(p) => p.clone(),
                None => dialoguer::Password::new()
                    .with_prompt("Password")
                    .with_confirmation("Confirm password", "Passwords do not match")
                    .interact()
                    .map_err(|e| AppError::internal(format!("Input error: {e}")))?,
            };

            let user = service
                .create_user(CreateUserRequest {
                    username: username.clone(),
                    email: email.clone(),
                    password,
                    is_admin: *admin,
                })
                .await?;

            let role = if user.is_admin { "Admin" } else { "User" };
            output::print_success(&format!(
                "{role} '{}' created (id: {})",
                user.username, user.id
            ));
        }
        UserCommand::List { page, page_size } => {
            let users = service
                .list_users(PageRequest::new(*page, *page_size))
                .await?;
            let rows: Vec<UserRow> = users.items.iter().map(UserRow::from).collect();
            output::print_list(&rows, format);
            if format == OutputFormat::Table {
                println!(
                    "Page {} of {} ({} users)",
                    users.page, users.total_pages, users.total
                );
            }
        }
        UserCommand::Promote { username } => {
            service.set_admin(username, true).await?;
            output::print_success(&format!("User '{username}' is now an admin"));
        }
        UserCommand::Demote { username } => {
            service.set_admin(username, false).await?;
            output::print_success(&format!("User '{username}' is no longer an admin"));
        }
        UserCommand::Activate { username } => {
            service.set_active(username, true).await?;
            output::print_success(&format!("User '{username}' activated"));
        }
        UserCommand::Deactivate { username } => {
            service.set_active(username, false).await?;
            output::print_success(&format!("User '{username}' deactivated"));
        }
        UserCommand::Token { username, hours } => {
            let issued = service.issue_token(username, *hours).await?;
            output::print_item(
                &issued,
                &[
                    ("Token", issued.token.clone()),
                    ("Expires at", issued.expires_at.to_rfc3339()),
                ],
                format,
            );
        }
    }

    pool.close().await;
    Ok(())
}
