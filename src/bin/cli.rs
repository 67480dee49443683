use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};

use opsdesk::authz::Permission;
use opsdesk::models::company::Company;
use opsdesk::models::role::{Role, RoleType};
use opsdesk::models::user::User;
use opsdesk::settings;
use opsdesk::store::{SqliteStore, TenantDirectory, UserDirectory};
use opsdesk::tenant::TenantId;

#[derive(Parser, Debug)]
#[command(author, version, about = "opsdesk migration and administration tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new empty migration with the provided name
    MakeMigration { name: String },
    /// Apply pending migrations
    MigrateRun,
    /// Show migration status against the current database
    MigrateStatus,
    /// Print the permission vocabulary by group
    Permissions,
    /// Register a company as a tenant
    CreateCompany {
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        name: String,
    },
    /// Add a user to a tenant
    CreateUser {
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
    },
    /// Define or redefine a role; omit --tenant for a global role
    DefineRole {
        #[arg(long)]
        tenant: Option<String>,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Comma-separated permission names
        #[arg(long, value_delimiter = ',')]
        permissions: Vec<String>,
        #[arg(long)]
        system: bool,
    },
    /// Grant a role to a user of the tenant
    AssignRole {
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        role: String,
    },
    /// Seed the default settings for a tenant that has none
    InitSettings {
        #[arg(long)]
        tenant: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // The binary's CWD may differ inside containers; fall back to the crate-local `.env`.
    if dotenv().is_err() {
        let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::MakeMigration { name } => {
            let path = make_migration_file(&name)?;
            println!("Created migration: {}", path.display());
        }
        Commands::MigrateRun => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            migrator.run(&pool).await?;
            println!("Migrations applied");
        }
        Commands::MigrateStatus => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            print_status(&pool, &migrator).await?;
        }
        Commands::Permissions => print_permissions(),
        Commands::CreateCompany { tenant, name } => {
            let store = get_store().await?;
            let company = store.save_company(&Company::new(tenant, name)).await?;
            println!("Created company {} for tenant {}", company.id, company.tenant_id);
        }
        Commands::CreateUser {
            tenant,
            email,
            first_name,
            last_name,
        } => {
            let store = get_store().await?;
            let tenant = existing_tenant(&store, &tenant).await?;
            let user = store
                .save_user(&User::new(tenant.as_str(), email, &first_name, &last_name))
                .await?;
            println!("Created user {} ({})", user.email, user.id);
        }
        Commands::DefineRole {
            tenant,
            name,
            description,
            permissions,
            system,
        } => {
            let store = get_store().await?;
            let role_type = if system { RoleType::System } else { RoleType::Custom };
            let role = Role::define(tenant, &name, description, &permissions, role_type)?;
            let role = store.save_role(&role).await?;
            println!("Saved role {} with {} permission(s)", role.name, role.permissions.len());
        }
        Commands::AssignRole { tenant, email, role } => {
            let store = get_store().await?;
            let tenant = existing_tenant(&store, &tenant).await?;
            let user = store
                .find_user_by_email(&tenant, &email)
                .await?
                .with_context(|| format!("no user {} in tenant {}", email, tenant))?;
            let role = store
                .find_role(&tenant, &role)
                .await?
                .with_context(|| format!("no role {} visible to tenant {}", role, tenant))?;
            store.assign_role(user.id, role.id).await?;
            println!("Assigned {} to {}", role.name, user.email);
        }
        Commands::InitSettings { tenant } => {
            let store = get_store().await?;
            let tenant = existing_tenant(&store, &tenant).await?;
            let created = settings::seed_defaults(&store, &tenant, "system").await?;
            println!("Created {} default setting(s) for tenant {}", created, tenant);
        }
    }

    Ok(())
}

fn print_permissions() {
    for group in Permission::ALL_GROUPS {
        println!("{:?}", group);
        for permission in group.permissions() {
            println!("  {}", permission);
        }
    }
}

async fn existing_tenant(store: &SqliteStore, tenant: &str) -> anyhow::Result<TenantId> {
    let tenant = TenantId::new(tenant.trim());
    store
        .find_company(&tenant)
        .await?
        .with_context(|| format!("tenant {} has no company; run create-company first", tenant))?;
    Ok(tenant)
}

fn make_migration_file(name: &str) -> anyhow::Result<PathBuf> {
    let timestamp = Utc::now().format("%Y%m%d%H%M%S");
    let sanitized = sanitize_name(name);
    let filename = format!("{}_{}.sql", timestamp, sanitized);
    let path = Path::new("migrations").join(filename);

    if path.exists() {
        anyhow::bail!("migration already exists: {}", path.display());
    }

    fs::write(&path, "-- Write your migration SQL here\n")
        .with_context(|| format!("failed to create migration at {}", path.display()))?;

    Ok(path)
}

async fn get_pool() -> anyhow::Result<SqlitePool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to database")
}

async fn get_store() -> anyhow::Result<SqliteStore> {
    let pool = opsdesk::db::init().await?;
    Ok(SqliteStore::new(pool))
}

async fn print_status(pool: &SqlitePool, migrator: &sqlx::migrate::Migrator) -> anyhow::Result<()> {
    let has_table: Option<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type='table' AND name='_sqlx_migrations'")
            .fetch_optional(pool)
            .await?;
    let applied_versions: HashSet<i64> = if has_table.is_some() {
        let rows = sqlx::query("SELECT version FROM _sqlx_migrations WHERE success = 1")
            .fetch_all(pool)
            .await?;
        rows.iter().filter_map(|row| row.try_get::<i64, _>("version").ok()).collect()
    } else {
        HashSet::new()
    };

    println!("{:<8} {:<20} {}", "Status", "Version", "Name");
    for migration in migrator.iter() {
        let status = if applied_versions.contains(&migration.version) { "applied" } else { "pending" };
        let desc = migration.description.as_ref().trim();
        let name = if desc.is_empty() { "unknown" } else { desc };
        println!("{:<8} {:<20} {}", status, migration.version, name);
    }

    Ok(())
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '_' => c,
            'A'..='Z' => c.to_ascii_lowercase(),
            _ => '_',
        })
        .collect()
}

async fn get_migrator() -> anyhow::Result<sqlx::migrate::Migrator> {
    // Prefer ./migrations, then the crate-local folder.
    let local = Path::new("./migrations");
    let migrator_path = if local.exists() {
        local.to_path_buf()
    } else {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")
    };

    let migrator_path_display = migrator_path.display().to_string();
    sqlx::migrate::Migrator::new(migrator_path)
        .await
        .with_context(|| format!("failed to load migrations from {}", migrator_path_display))
}
