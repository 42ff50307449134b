use std::path::Path;
use std::sync::atomic::AtomicBool;

use chrono::Utc;
use clap::Parser;

use common::api::{Dashboard, NewTable, TablePage, TableStatus};
use common::catalog::RequestType;
use common::cli::{ClientArgs, Command};
use common::config::{ClientConfig, Config};
use common::cooldown::CooldownTracker;
use common::errors::{Error, Result};
use common::logger::setup_logging;
use common::remote::{ApiClient, TableSession};
use common::status::{time_ago, RequestFilter};
use common::watch::Poller;

/// Never raised: live views run until the process is interrupted
static STOP: AtomicBool = AtomicBool::new(false);

/// Message shown to the user for a failed call
fn describe(err: &Error) -> String {
    match err {
        Error::Remote { message, .. } => message.clone(),
        Error::CooldownActive { .. } | Error::PhotoRequired(_) => err.to_string(),
        Error::Io(_) | Error::NoResponse | Error::ConnectionReset => {
            format!("Server unreachable: {}", err)
        }
        _ => format!("Failed: {}", err),
    }
}

fn status_marker(status: TableStatus) -> &'static str {
    match status {
        TableStatus::Urgent => "!!",
        TableStatus::Pending => "..",
        TableStatus::Clear => "ok",
    }
}

fn print_table_page(page: &TablePage, tracker: &CooldownTracker) {
    println!("{} - table {}", page.restaurant.name, page.table.label);
    for request_type in RequestType::ALL {
        match tracker.remaining(request_type) {
            Some(time_left) => println!("  [wait {:>7}] {}", time_left, request_type.label()),
            None => println!("  [{:>12}] {}", request_type.as_str(), request_type.label()),
        }
    }
}

fn print_dashboard(dashboard: &Dashboard) {
    let now = Utc::now();
    let stats = &dashboard.stats;
    println!(
        "pending {} | in progress {} | completed {} | total {} | urgent tables {}",
        stats.pending, stats.in_progress, stats.completed, stats.total, stats.urgent
    );
    for table in &dashboard.tables {
        println!(
            "  [{}] {:<8} ({:>4},{:>4}) urgent {} pending {}",
            status_marker(table.status),
            table.label,
            table.x_position,
            table.y_position,
            table.urgent_count,
            table.pending_count
        );
    }
    if dashboard.requests.is_empty() {
        println!("No requests");
    }
    for request in &dashboard.requests {
        let actions = request
            .status
            .next_actions()
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join("/");
        println!(
            "  #{:<5} table {:<4} {:<18} {:<12} {:<12} {}{}",
            request.id,
            request.table_id,
            request.request_type.label(),
            request.status,
            time_ago(request.created_at, now),
            if actions.is_empty() { "-" } else { actions.as_str() },
            request
                .photo_url
                .as_deref()
                .map(|url| format!(" photo: {}", url))
                .unwrap_or_default()
        );
    }
}

/// Redraw the table page as its cooldowns tick down, until every type is available
fn follow_cooldowns(config: &ClientConfig, session: &mut TableSession) {
    if session.tracker.is_empty() {
        return;
    }
    Poller::new(config.countdown_tick).run(&STOP, || {
        if session.tracker.tick(Utc::now()) {
            print_table_page(&session.page, &session.tracker);
        }
        !session.tracker.is_empty()
    });
}

fn open_table(client: &ApiClient, config: &ClientConfig, slug: &str, label: &str) -> Result<()> {
    let mut session = TableSession::open(client, slug, label, Utc::now())?;
    print_table_page(&session.page, &session.tracker);
    follow_cooldowns(config, &mut session);
    Ok(())
}

fn submit_request(
    client: &ApiClient,
    config: &ClientConfig,
    slug: &str,
    label: &str,
    request_type: RequestType,
    photo: Option<&str>,
    no_wait: bool,
) -> Result<()> {
    let mut session = TableSession::open(client, slug, label, Utc::now())?;
    if photo.is_some() && !request_type.requires_photo() {
        println!("{} does not take a photo, ignoring it", request_type.label());
    }
    let request = session.submit(request_type, photo.map(Path::new), Utc::now())?;
    println!("Request #{} sent: {}", request.id, request_type.label());
    print_table_page(&session.page, &session.tracker);
    if !no_wait {
        follow_cooldowns(config, &mut session);
    }
    Ok(())
}

fn show_dashboard(
    client: &ApiClient,
    config: &ClientConfig,
    filter: RequestFilter,
    watch: bool,
) -> Result<()> {
    if !watch {
        print_dashboard(&client.dashboard(&filter)?);
        return Ok(());
    }
    Poller::new(config.dashboard_poll).run(&STOP, || {
        match client.dashboard(&filter) {
            Ok(dashboard) => {
                println!();
                print_dashboard(&dashboard);
            }
            Err(err) => eprintln!("{}", describe(&err)),
        }
        true
    });
    Ok(())
}

fn run(client: &ApiClient, config: &ClientConfig, command: Command) -> Result<()> {
    match command {
        Command::Restaurants => {
            for restaurant in client.restaurants()? {
                println!("{:<4} {:<20} {}", restaurant.id, restaurant.slug, restaurant.name);
            }
        }
        Command::AddRestaurant { name, slug } => {
            let restaurant = client.create_restaurant(&name, &slug)?;
            println!("Created restaurant #{} '{}'", restaurant.id, restaurant.slug);
        }
        Command::Tables { slug } => {
            for table in client.tables(&slug)? {
                println!(
                    "{:<4} {:<8} {:?},{:?}",
                    table.id, table.label, table.x_position, table.y_position
                );
            }
        }
        Command::AddTable {
            slug,
            label,
            x_position,
            y_position,
        } => {
            let table = client.create_table(
                &slug,
                &NewTable {
                    label,
                    x_position,
                    y_position,
                },
            )?;
            println!("Created table #{} '{}'", table.id, table.label);
        }
        Command::Open { slug, label } => open_table(client, config, &slug, &label)?,
        Command::Request {
            slug,
            label,
            request_type,
            photo,
            no_wait,
        } => submit_request(
            client,
            config,
            &slug,
            &label,
            request_type,
            photo.as_deref(),
            no_wait,
        )?,
        Command::Dashboard {
            watch,
            status,
            table,
        } => {
            let filter = RequestFilter {
                status,
                table_id: table,
            };
            show_dashboard(client, config, filter, watch)?
        }
        Command::Status { request_id, status } => {
            let request = client.update_status(request_id, status)?;
            println!("Request #{} is now {}", request.id, request.status);
        }
        Command::Clear { yes } => {
            if !yes {
                println!("This deletes every request, pass --yes to confirm");
                return Ok(());
            }
            println!("Deleted {} requests", client.clear_requests()?);
        }
        Command::Qr { slug, tables } => {
            for code in client.qr_codes(&slug, &tables)? {
                println!("{:<8} {}\n         {}", code.table_label, code.url, code.image_url);
            }
        }
        Command::Types => {
            for info in client.request_types()? {
                println!(
                    "{:<18} {:<18} {:>3} min {:?}{}",
                    info.request_type.as_str(),
                    info.label,
                    info.cooldown_minutes,
                    info.priority,
                    if info.requires_photo { ", photo required" } else { "" }
                );
            }
        }
    }
    Ok(())
}

fn main() {
    let args = ClientArgs::parse();
    setup_logging();

    let config = match Config::load(args.config.as_deref()) {
        Ok(config) => config.client,
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(2);
        }
    };
    let address = args.address.unwrap_or_else(|| config.address.clone());
    let client = ApiClient::new(&address);

    if let Err(err) = run(&client, &config, args.command) {
        eprintln!("{}", describe(&err));
        std::process::exit(1);
    }
}
