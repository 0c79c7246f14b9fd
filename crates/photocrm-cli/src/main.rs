//! photocrm - command-line client for the photocrm studio API.
//!
//! Signs a studio member in, keeps the session across runs, and lists
//! orders, galleries and payments through the authenticated gateway.

use std::future::Future;
use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use photocrm_core::api::{Gateway, HttpTransport, StudioApi, Transport, ViewScope};
use photocrm_core::models::{OrderFilter, OrderStatus, PhotoSelection};
use photocrm_core::notify::ChannelNotifier;
use photocrm_core::{ApiError, Config, SessionStore};

const USAGE: &str = "\
Usage: photocrm <command> [args]

Session:
  login [email] [subdomain]        Sign in (prompts for anything missing)
  logout                           Sign out locally and on the server
  whoami                           Show the signed-in user
  refresh                          Exchange the refresh token for a new access token
  forgot-password <email> <subdomain>
  reset-password <token>

Studio:
  orders [--search TEXT] [--status STATUS]
  order <order-id>
  dashboard
  gallery <order-id>
  payment <order-id>
  pay <order-id> [--method METHOD]

Environment:
  PHOTOCRM_API_URL                 API base URL (default http://localhost:8080/api)
  RUST_LOG                         Log filter (default warn)";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

/// Everything a command needs, wired once per run.
struct Client {
    config: Config,
    store: Arc<SessionStore>,
    studio: StudioApi,
    /// Closed on Ctrl-C so late results are not printed
    scope: ViewScope,
}

impl Client {
    fn connect(config: Config) -> Result<(Self, JoinHandle<()>)> {
        let base_url = config.api_base_url();
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(base_url.clone())?);
        let storage = config.session_storage()?;
        let store = SessionStore::init(Arc::clone(&transport), storage);
        info!(base_url = %base_url, authenticated = store.is_authenticated(), "Client ready");

        let (notifier, mut notices) = ChannelNotifier::new();
        let printer = tokio::spawn(async move {
            while let Some(notice) = notices.recv().await {
                eprintln!("! {}", notice.message);
            }
        });

        let gateway = Gateway::new(transport, Arc::clone(&store), Arc::new(notifier));
        let studio = StudioApi::new(Arc::new(gateway));

        Ok((
            Self {
                config,
                store,
                studio,
                scope: ViewScope::new(),
            },
            printer,
        ))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().cloned() else {
        println!("{}", USAGE);
        return Ok(());
    };
    if command == "-h" || command == "--help" || command == "help" {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };

    let (mut client, printer) = Client::connect(config)?;
    watch_interrupt(client.scope.clone());
    let result = run(&mut client, &command, &args[1..]).await;

    // Dropping the client closes the notice channel so the printer drains and exits
    drop(client);
    let _ = printer.await;

    if let Err(e) = result {
        if e.downcast_ref::<ApiError>().is_some_and(ApiError::is_session_lost) {
            eprintln!("Session expired. Please run `photocrm login` again.");
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
    Ok(())
}

async fn run(client: &mut Client, command: &str, args: &[String]) -> Result<()> {
    match command {
        "login" => login(client, args).await,
        "logout" => {
            client.store.end_session().await;
            println!("Logged out.");
            Ok(())
        }
        "whoami" => {
            whoami(client);
            Ok(())
        }
        "refresh" => {
            client.store.refresh_session().await?;
            println!("Session refreshed.");
            Ok(())
        }
        "forgot-password" => {
            let email = required(args, 0, "email")?;
            let subdomain = required(args, 1, "subdomain")?;
            client.store.forgot_password(email, subdomain).await?;
            println!("If the account exists, a reset link is on its way to {}.", email);
            Ok(())
        }
        "reset-password" => reset_password(client, args).await,
        "orders" => orders(client, args).await,
        "order" => order(client, args).await,
        "dashboard" => dashboard(client).await,
        "gallery" => gallery(client, args).await,
        "payment" => payment(client, args).await,
        "pay" => pay(client, args).await,
        other => {
            eprintln!("{}", USAGE);
            Err(anyhow::anyhow!("Unknown command: {}", other))
        }
    }
}

/// First Ctrl-C closes the scope and lets the request in flight finish
/// quietly; a second one exits immediately.
fn watch_interrupt(scope: ViewScope) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        scope.close();
        eprintln!("Interrupted. Press Ctrl-C again to exit now.");
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
}

/// Await a studio call, yielding `None` if the command was interrupted
/// while it was out.
async fn in_scope<T>(
    scope: &ViewScope,
    call: impl Future<Output = Result<T, ApiError>>,
) -> Result<Option<T>> {
    Ok(scope.run(call).await.transpose()?)
}

// ============================================================================
// Argument helpers
// ============================================================================

fn required<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str> {
    args.get(index)
        .filter(|a| !a.starts_with("--"))
        .map(String::as_str)
        .ok_or_else(|| anyhow::anyhow!("Missing argument: <{}>", name))
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn prompt(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(d) => print!("{} [{}]: ", label, d),
        None => print!("{}: ", label),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    match (input.is_empty(), default) {
        (true, Some(d)) => Ok(d.to_string()),
        _ => Ok(input.to_string()),
    }
}

// ============================================================================
// Session commands
// ============================================================================

async fn login(client: &mut Client, args: &[String]) -> Result<()> {
    let email = match args.first() {
        Some(e) => e.clone(),
        None => prompt("Email", client.config.last_email.as_deref())?,
    };
    let subdomain = match args.get(1) {
        Some(s) => s.clone(),
        None => prompt("Studio", client.config.last_subdomain.as_deref())?,
    };
    if email.is_empty() || subdomain.is_empty() {
        return Err(anyhow::anyhow!("Email and studio are required"));
    }
    let password = rpassword::prompt_password("Password: ").context("Failed to read password")?;

    println!("Authenticating...");
    client.store.login(&email, &password, &subdomain).await?;

    client.config.remember_login(&email, &subdomain);
    if let Err(e) = client.config.save() {
        warn!(error = %e, "Failed to save config");
    }

    match client.store.user() {
        Some(user) => println!("Logged in as {} ({}).", user.display_name(), user.role),
        None => println!("Logged in."),
    }
    Ok(())
}

fn whoami(client: &Client) {
    let session = client.store.snapshot();
    match session.user {
        Some(ref user) if session.is_authenticated() => {
            println!("{} <{}>", user.display_name(), user.email);
            println!("Role: {}", user.role);
            if !user.permissions.is_empty() {
                println!("Permissions: {}", user.permissions.join(", "));
            }
            if let Some(last_login) = user.last_login_at {
                println!("Last login: {}", last_login.format("%Y-%m-%d %H:%M UTC"));
            }
        }
        _ => println!("Not logged in."),
    }
}

async fn reset_password(client: &Client, args: &[String]) -> Result<()> {
    let token = required(args, 0, "token")?;
    let password = rpassword::prompt_password("New password: ").context("Failed to read password")?;
    let confirm = rpassword::prompt_password("Confirm password: ").context("Failed to read password")?;
    if password != confirm {
        return Err(anyhow::anyhow!("Passwords do not match"));
    }
    client.store.reset_password(token, &password).await?;
    println!("Password updated. You can now log in.");
    Ok(())
}

// ============================================================================
// Studio commands
// ============================================================================

async fn orders(client: &Client, args: &[String]) -> Result<()> {
    let status = match flag_value(args, "--status") {
        Some(s) => Some(
            OrderStatus::from_str(s).ok_or_else(|| anyhow::anyhow!("Unknown order status: {}", s))?,
        ),
        None => None,
    };
    let filter = OrderFilter {
        search: flag_value(args, "--search").map(str::to_string),
        status,
    };

    let Some(orders) = in_scope(&client.scope, client.studio.fetch_orders(&filter)).await? else {
        return Ok(());
    };
    if orders.is_empty() {
        println!("No orders found.");
        return Ok(());
    }
    for order in orders {
        println!(
            "{:<38} {:<30} {:<16} {:>10}  {}",
            order.id,
            order.title,
            order.status.display_name(),
            order.display_amount(),
            order.event_date.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

async fn order(client: &Client, args: &[String]) -> Result<()> {
    let order_id = required(args, 0, "order-id")?;
    let Some(order) = in_scope(&client.scope, client.studio.fetch_order(order_id)).await? else {
        return Ok(());
    };

    println!("{}", order.title);
    println!("Status:   {}", order.status.display_name());
    println!("Amount:   {}", order.display_amount());
    println!("Client:   {}", order.client_id);
    if let Some(ref date) = order.event_date {
        println!("Event:    {}", date);
    }
    if let Some(ref description) = order.description {
        println!("\n{}", description);
    }
    if let Some(ref url) = order.gallery_url {
        println!("\nGallery:  {}", url);
    }
    println!("Created:  {}", order.created_at.format("%Y-%m-%d"));
    Ok(())
}

async fn dashboard(client: &Client) -> Result<()> {
    let Some(stats) = in_scope(&client.scope, client.studio.fetch_dashboard()).await? else {
        return Ok(());
    };

    println!("Orders:   {}", stats.total_orders);
    println!("Photos:   {}", stats.total_photos);
    println!("Revenue:  ${:.2}", stats.total_revenue);
    println!("Clients:  {}", stats.total_clients);
    if !stats.recent_orders.is_empty() {
        println!("\nRecent orders:");
        for recent in &stats.recent_orders {
            println!(
                "  {:<30} {:<16} {}",
                recent.title,
                recent.status.display_name(),
                recent.created_at
            );
        }
    }
    Ok(())
}

async fn gallery(client: &Client, args: &[String]) -> Result<()> {
    let order_id = required(args, 0, "order-id")?;
    let Some(gallery) = in_scope(&client.scope, client.studio.fetch_public_gallery(order_id)).await?
    else {
        return Ok(());
    };
    let selection = PhotoSelection::from_gallery(&gallery);

    println!("Gallery for order {} ({} photos)", gallery.order_id, gallery.total_photos);
    if let Some(limit) = gallery.selection_limit {
        println!("Selected {} of {} allowed", selection.len(), limit);
    }
    for photo in &gallery.photos {
        let mark = if selection.is_selected(&photo.id) { "*" } else { " " };
        let price = photo.price.map(|p| format!("${:.2}", p)).unwrap_or_default();
        println!("{} {:<38} {:<30} {}", mark, photo.id, photo.filename, price);
    }
    if !selection.is_empty() {
        println!("\nSelection total: ${:.2}", selection.total_price(&gallery));
    }
    Ok(())
}

async fn payment(client: &Client, args: &[String]) -> Result<()> {
    let order_id = required(args, 0, "order-id")?;
    let Some(summary) = in_scope(&client.scope, client.studio.fetch_payment(order_id)).await? else {
        return Ok(());
    };

    println!("Order {} for {}", summary.order_id, summary.client_info.name);
    for photo in &summary.selected_photos {
        println!("  {:<30} {:.2}", photo.filename, photo.price);
    }
    println!("Total: {}", summary.display_total());
    Ok(())
}

async fn pay(client: &Client, args: &[String]) -> Result<()> {
    let order_id = required(args, 0, "order-id")?;
    let method = flag_value(args, "--method").unwrap_or("stripe");

    // Nothing is charged if the user backs out before the summary arrives
    let Some(summary) = in_scope(&client.scope, client.studio.fetch_payment(order_id)).await? else {
        return Ok(());
    };
    let outcome = client
        .studio
        .process_payment(&summary.to_request(method))
        .await?;

    if outcome.success {
        println!("Payment of {} received. Thank you!", summary.display_total());
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "Payment failed: {}",
            outcome.message.as_deref().unwrap_or("declined")
        ))
    }
}
