use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use sitebook_api::{
    auth::{AuthConfig, AuthService, AuthUser, Role},
    config::{self, AppConfig},
    db::{self, DbPool},
    handlers::AppServices,
    models::SiteRecord,
    services::balance::SiteSummary,
};
use tracing::debug;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;

    match cli.command {
        Commands::Migrate => handle_migrate(&context, cli.json).await?,
        Commands::IssueToken(args) => handle_issue_token(&context, args, cli.json)?,
        Commands::Sites(command) => handle_sites_command(&context, command, cli.json).await?,
        Commands::AddFunds(args) => handle_add_funds(&context, args, cli.json).await?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(name = "sitebook", about = "Sitebook CLI for migrations, tokens and site maintenance", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Issue a bearer token for a user
    IssueToken(IssueTokenArgs),
    #[command(subcommand)]
    Sites(SitesCommands),
    /// Increment a site's running funds total
    AddFunds(AddFundsArgs),
}

#[derive(Subcommand)]
enum SitesCommands {
    List,
    Summary(SiteArgs),
    RecomputeFunds(SiteArgs),
}

#[derive(Args)]
struct IssueTokenArgs {
    #[arg(long, help = "User id placed in the `sub` claim")]
    user_id: Uuid,
    #[arg(long, help = "Display name of the user")]
    name: String,
    #[arg(long, value_parser = parse_role, help = "Role: admin or supervisor")]
    role: Role,
}

#[derive(Args)]
struct SiteArgs {
    #[arg(long, help = "Site id")]
    site_id: Uuid,
}

#[derive(Args)]
struct AddFundsArgs {
    #[arg(long, help = "Site id")]
    site_id: Uuid,
    #[arg(long, help = "Positive amount to add")]
    amount: Decimal,
}

fn parse_role(raw: &str) -> Result<Role, String> {
    Role::from_claim(raw).ok_or_else(|| format!("unknown role `{}` (expected admin or supervisor)", raw))
}

struct CliContext {
    config: AppConfig,
    db: Arc<DbPool>,
    auth_service: AuthService,
    services: AppServices,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;
        let db = Arc::new(db_pool);

        let auth_service = AuthService::new(AuthConfig::from(&config));
        let services = AppServices::new(db.clone(), &config);
        debug!(target: "sitebook_cli", environment = %config.environment, "cli context ready");

        Ok(Self {
            config,
            db,
            auth_service,
            services,
        })
    }

    /// Maintenance commands act with admin visibility.
    fn operator(&self) -> AuthUser {
        AuthUser::new(Uuid::nil(), "sitebook-cli", Role::Admin)
    }
}

async fn handle_migrate(context: &CliContext, json: bool) -> Result<()> {
    db::run_migrations(&context.db)
        .await
        .context("failed running migrations")?;

    if json {
        print_json(&serde_json::json!({ "migrated": true }))?;
    } else {
        println!("Migrations applied");
    }
    Ok(())
}

fn handle_issue_token(context: &CliContext, args: IssueTokenArgs, json: bool) -> Result<()> {
    let issued = context
        .auth_service
        .generate_token(args.user_id, &args.name, args.role)
        .map_err(|e| anyhow!("failed to issue token: {}", e))?;

    if json {
        print_json(&issued)?;
    } else {
        println!(
            "Token for {} ({}), expires in {}s:",
            args.name, args.role, issued.expires_in
        );
        println!("{}", issued.access_token);
    }
    Ok(())
}

async fn handle_sites_command(
    context: &CliContext,
    command: SitesCommands,
    json: bool,
) -> Result<()> {
    let operator = context.operator();
    match command {
        SitesCommands::List => {
            let sites = context
                .services
                .sites
                .list_visible(&operator)
                .await
                .context("failed to list sites")?;
            if json {
                print_json(&sites)?;
            } else if sites.is_empty() {
                println!("No sites");
            } else {
                sites.iter().for_each(render_site);
            }
        }
        SitesCommands::Summary(args) => {
            let summary = context
                .services
                .sites
                .summary(&operator, args.site_id)
                .await
                .context("failed to compute site summary")?;
            if json {
                print_json(&summary)?;
            } else {
                render_summary(&context.config, args.site_id, &summary);
            }
        }
        SitesCommands::RecomputeFunds(args) => {
            let site = context
                .services
                .sites
                .recompute_funds(args.site_id)
                .await
                .context("failed to recompute funds")?;
            if json {
                print_json(&site)?;
            } else {
                println!("Site {} funds reset to {}", site.id, site.funds);
            }
        }
    }
    Ok(())
}

async fn handle_add_funds(context: &CliContext, args: AddFundsArgs, json: bool) -> Result<()> {
    if args.amount <= Decimal::ZERO {
        return Err(anyhow!("amount must be a positive number"));
    }

    let outcome = context
        .services
        .funds
        .add_funds(args.site_id, args.amount)
        .await
        .context("failed to add funds")?;

    if json {
        print_json(&serde_json::json!({
            "success": true,
            "data": outcome.site,
            "previous_funds": outcome.change.previous_funds,
            "new_funds": outcome.change.new_funds,
        }))?;
    } else {
        println!(
            "Site {} funds {} -> {}",
            outcome.site.id, outcome.change.previous_funds, outcome.change.new_funds
        );
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_site(site: &SiteRecord) {
    println!(
        "- Site {} • {} • {} • funds {}",
        site.id, site.name, site.location, site.funds
    );
}

fn render_summary(config: &AppConfig, site_id: Uuid, summary: &SiteSummary) {
    let currency = config.currency.as_str();
    println!("Summary for site {}", site_id);
    println!("  funds received   {} {}", summary.funds_received, currency);
    println!("  expenditure      {} {}", summary.total_expenditure, currency);
    println!("  advances         {} {}", summary.total_advances, currency);
    println!("  debits to worker {} {}", summary.debits_to_worker, currency);
    println!("  invoices paid    {} {}", summary.invoices_paid, currency);
    println!("  balance          {} {}", summary.total_balance, currency);
}

