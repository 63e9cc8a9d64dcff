use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console_core::{
    AdminConsole, ApiEndpoint, AuthClient, ConsoleStatus, HttpPageFetcher, MoveIntent, PageLoad,
};
use serde::Serialize;
use shared::{
    domain::{Item, PageNumber},
    error::ReorderResult,
};
use storage::Storage;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod notice;

use config::{load_settings, normalize_database_url};
use notice::Notice;

#[derive(Parser, Debug)]
#[command(
    name = "admin-console",
    about = "List paginated admin items and reorder them locally"
)]
struct Cli {
    #[arg(long, default_value = "console.toml")]
    config: PathBuf,
    /// Overrides the database url from settings.
    #[arg(long)]
    database_url: Option<String>,
    /// Print items as JSON instead of a table.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    /// Show the current page's order without fetching.
    Show,
    /// Fetch the current page again; local reordering is replaced.
    Refresh,
    Next,
    Prev,
    Move {
        from: usize,
        to: usize,
    },
    /// Replay a drag gesture: start index, then each hovered index.
    Drag {
        start: usize,
        #[arg(long = "over", required = true, num_args = 1..)]
        over: Vec<usize>,
    },
    /// Restore the order last fetched for the current page.
    Reset,
    Status,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings(&cli.config)?;
    if let Some(database_url) = &cli.database_url {
        settings.database_url = normalize_database_url(database_url);
    }
    debug!(
        api_base_url = %settings.api_base_url,
        database_url = %settings.database_url,
        page_size = settings.page_size,
        "settings loaded"
    );

    let endpoint = ApiEndpoint::new(
        &settings.api_base_url,
        &settings.project_id,
        &settings.project_secret,
    )?;
    let storage = Storage::new(&settings.database_url)
        .await
        .with_context(|| format!("failed to open '{}'", settings.database_url))?;
    let console = AdminConsole::open(
        Arc::new(storage),
        Arc::new(HttpPageFetcher::new(endpoint.clone())),
        Arc::new(AuthClient::new(endpoint, settings.login_role.clone())),
        settings.page_size,
    )
    .await;

    let printer = Printer { json: cli.json };
    let outcome = match cli.command {
        Command::Login { email, password } => match console.login(&email, &password).await {
            Ok(_) => {
                println!("{}", Notice::success("Login successful!").render());
                printer.page_load(console.refresh().await)
            }
            Err(err) => Err(Notice::from_login_error(&err)),
        },
        Command::Logout => {
            console.logout().await;
            println!("{}", Notice::success("Signed out; local order cleared.").render());
            Ok(())
        }
        Command::Show => {
            let (page, items) = console.show().await;
            printer.items(page, &items)
        }
        Command::Refresh => printer.page_load(console.refresh().await),
        Command::Next => printer.page_load(console.next_page().await),
        Command::Prev => match console.prev_page().await {
            Some(load) => printer.page_load(load),
            None => {
                println!("already on page 1");
                Ok(())
            }
        },
        Command::Move { from, to } => {
            let result = console.move_item(MoveIntent { from, to }).await;
            printer.reorder(console.current_page().await, result)
        }
        Command::Drag { start, over } => {
            let result = console.drag(start, &over).await;
            printer.reorder(console.current_page().await, result)
        }
        Command::Reset => {
            let result = console.reset_order().await;
            printer.reorder(console.current_page().await, result)
        }
        Command::Status => printer.status(&console.status().await),
    };

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(notice) => {
            eprintln!("{}", notice.render());
            Ok(ExitCode::FAILURE)
        }
    }
}

#[derive(Serialize)]
struct PageView<'a> {
    page: PageNumber,
    items: &'a [Item],
}

struct Printer {
    json: bool,
}

impl Printer {
    fn page_load(&self, load: PageLoad) -> Result<(), Notice> {
        self.reorder(load.page, load.items)
    }

    fn reorder(&self, page: PageNumber, result: ReorderResult<Vec<Item>>) -> Result<(), Notice> {
        let items = result.map_err(|err| Notice::from_reorder_error(&err))?;
        self.items(page, &items)
    }

    fn items(&self, page: PageNumber, items: &[Item]) -> Result<(), Notice> {
        if self.json {
            print_json(&PageView { page, items });
            return Ok(());
        }
        println!("page {page} ({} items)", items.len());
        for (index, item) in items.iter().enumerate() {
            let id = format!("#{}", item.id);
            println!("{index:>3}. {id:<8} {}", item.title);
            if !item.description.is_empty() {
                println!("     {}", item.description);
            }
        }
        Ok(())
    }

    fn status(&self, status: &ConsoleStatus) -> Result<(), Notice> {
        if self.json {
            print_json(status);
            return Ok(());
        }
        let role = status
            .role
            .as_ref()
            .map(|role| role.0.as_str())
            .unwrap_or("-");
        println!(
            "signed in:    {}",
            if status.authenticated { "yes" } else { "no" }
        );
        println!("role:         {role}");
        println!("current page: {}", status.current_page);
        let cached: Vec<String> = status.cached_pages.iter().map(ToString::to_string).collect();
        println!("cached pages: {}", cached.join(", "));
        println!(
            "reordered:    {}",
            if status.reordered { "yes" } else { "no" }
        );
        if let Some(fetched_at) = status.fetched_at {
            println!("fetched at:   {}", fetched_at.to_rfc3339());
        }
        Ok(())
    }
}

fn print_json(value: &impl Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(err) => warn!(error = %err, "failed to encode output"),
    }
}
