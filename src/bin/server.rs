use std::path::Path;
use std::sync::{Arc, Mutex};

use clap::Parser;
use log::{error, info, warn};

use common::cli::ServerArgs;
use common::config::Config;
use common::database::sqlite::SQLiteConnection;
use common::endpoints::create_http_router;
use common::errors::Result;
use common::http::{HttpServer, Response};
use common::logger::setup_logging;
use common::service::TableService;
use common::storage::LocalPhotoStore;

fn run(config: Config) -> Result<()> {
    let db = SQLiteConnection::open(&config.server.database)?;
    let photos = LocalPhotoStore::new(Path::new(&config.photos.dir), &config.photos.public_base_url)?;
    if config.service.allow_bulk_clear {
        warn!("Bulk deletion of requests is enabled");
    }
    let service = Arc::new(Mutex::new(TableService::new(
        Box::new(db),
        Box::new(photos),
        config.qr.generator(),
        config.service.allow_bulk_clear,
    )));
    let router = Arc::new(create_http_router()?);

    let address = config.server.address();
    let server = HttpServer::new(&address)?;
    let workers = config.server.worker_count();
    info!(
        "Listening on {} with {} workers, database {}",
        server.local_addr()?,
        workers,
        config.server.database
    );

    server.serve(workers, move |request| {
        let method = request.method.clone();
        let path = request.path.clone();
        let response = match service.lock() {
            Ok(mut service) => router
                .route(request, &mut service)
                .unwrap_or_else(|err| {
                    if err.status_code() >= 500 {
                        error!("{} {} failed: {}", method, path, err);
                    }
                    Response::from_error(&err)
                }),
            Err(_) => {
                error!("Service state poisoned by a panicking request");
                Response::internal_server_error()
            }
        };
        info!("{} {} {}", method, path, response.status.unwrap_or(500));
        response
    })
}

fn main() {
    let args = ServerArgs::parse();
    setup_logging();

    let config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            error!("{}", err);
            std::process::exit(2);
        }
    };

    if let Err(err) = run(config) {
        error!("Server stopped: {}", err);
        std::process::exit(1);
    }
}
