use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use clap::Parser;
use dotenvy::dotenv;
use media_scanner::app_state::AppState;
use media_scanner::autosync::consumer::AutosyncConsumer;
use media_scanner::autosync::services::aggregate::Aggregate;
use media_scanner::autosync::services::simkl::Simkl;
use media_scanner::autosync::services::SyncService;
use media_scanner::catalog::CatalogClient;
use media_scanner::config::Config;
use media_scanner::db::{Db, Election, HTTP_REPLICA_LOCK, SCANNER_MASTER_LOCK};
use media_scanner::processor::RequestProcessor;
use media_scanner::providers::anilist::AniList;
use media_scanner::providers::composite::CompositeProvider;
use media_scanner::providers::thexem::TheXem;
use media_scanner::providers::tmdb::TheMovieDatabase;
use media_scanner::providers::tvdb::TheTvdb;
use media_scanner::queue::RequestQueue;
use media_scanner::scanner::{monitor, FsScanner};
use media_scanner::server::{self, JwtValidator};
use media_scanner::tracing::init_tracer;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
struct Args {
    /// Override the library root from the environment
    #[arg(long)]
    library_root: Option<PathBuf>,
    /// Don't run the initial full scan, only monitor and serve
    #[arg(long)]
    skip_startup_scan: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracer();
    if let Ok(path) = dotenv() {
        tracing::info!("Loaded env variables from: {}", path.display());
    }

    let mut config = Config::from_env();
    if let Some(root) = args.library_root {
        config.library_root = root;
    }

    let db = Db::connect(&config.postgres_url)
        .await
        .expect("database to be reachable");
    let db: &'static Db = Box::leak(Box::new(db));

    let master = Election::try_acquire(&db.pool, SCANNER_MASTER_LOCK)
        .await
        .expect("advisory lock query to work");
    let _http_replica = match &master {
        Some(_) => {
            tracing::info!("Elected scanner master");
            db.apply_migrations(Path::new("migrations"))
                .await
                .expect("migrations to apply");
            None
        }
        None => {
            let replica = Election::try_acquire(&db.pool, HTTP_REPLICA_LOCK)
                .await
                .expect("advisory lock query to work");
            match &replica {
                Some(_) => tracing::info!("Another process owns the library, running http-only"),
                None => tracing::info!("Another process owns the library, running as worker"),
            }
            replica
        }
    };

    let catalog: &'static CatalogClient = Box::leak(Box::new(CatalogClient::new(&config)));
    let xem: &'static TheXem = Box::leak(Box::new(TheXem::new()));
    let tmdb: Option<&'static TheMovieDatabase> = match &config.tmdb_token {
        Some(token) => Some(Box::leak(Box::new(TheMovieDatabase::new(token)))),
        None => {
            tracing::warn!("themoviedatabase is disabled");
            None
        }
    };
    let tvdb: Option<&'static TheTvdb> = match &config.tvdb_api_key {
        Some(key) => Some(Box::leak(Box::new(TheTvdb::new(
            key,
            config.tvdb_pin.as_deref(),
        )))),
        None => {
            tracing::warn!("the tvdb is disabled");
            None
        }
    };
    let anilist: &'static AniList = Box::leak(Box::new(AniList::new()));
    let providers: &'static CompositeProvider = Box::leak(Box::new(CompositeProvider::new(
        tmdb,
        tvdb,
        Some(anilist),
        xem,
    )));
    let queue: &'static RequestQueue = Box::leak(Box::new(RequestQueue::new(db.pool.clone())));
    let scanner: &'static FsScanner = Box::leak(Box::new(FsScanner::new(
        config.clone(),
        catalog,
        queue,
        xem,
    )));
    let jwt: &'static JwtValidator = Box::leak(Box::new(JwtValidator::new(&config)));

    let cancellation_token = CancellationToken::new();

    if master.is_some() {
        if let Err(e) = queue.recover_running().await {
            tracing::error!("Couldn't recover running requests: {e}");
        }
    }

    let processor: &'static RequestProcessor = Box::leak(Box::new(RequestProcessor::new(
        db.pool.clone(),
        queue,
        catalog,
        providers,
    )));
    {
        let token = cancellation_token.clone();
        tokio::spawn(async move { processor.run(token).await });
    }

    if master.is_some() {
        let token = cancellation_token.clone();
        let skip_scan = args.skip_startup_scan;
        tokio::spawn(async move {
            if !skip_scan {
                if let Err(e) = scanner.scan(true).await {
                    tracing::error!("Startup scan failed: {e}");
                }
            }
            if let Err(e) = monitor::monitor(scanner, token).await {
                tracing::error!("Library monitor stopped: {e}");
            }
        });
    }

    let services: Vec<Box<dyn SyncService>> =
        vec![Box::new(Simkl::new(config.simkl_client_id.as_deref()))];
    let aggregate = Aggregate::new(services);
    if aggregate.is_empty() {
        tracing::info!("No autosync service enabled");
    } else {
        let consumer: &'static AutosyncConsumer = Box::leak(Box::new(AutosyncConsumer::new(
            &config.rabbitmq_url,
            aggregate,
        )));
        let token = cancellation_token.clone();
        tokio::spawn(async move { consumer.run(token).await });
    }

    let app_state = AppState {
        db,
        catalog,
        providers,
        queue,
        scanner,
        jwt,
        cancellation_token: cancellation_token.clone(),
    };
    let app = server::router(app_state);
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), config.port);
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to start server on port {}: {e}", config.port);
            return;
        }
    };
    tracing::info!("Starting server on port {}", config.port);
    {
        let token = cancellation_token.clone();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
                .unwrap();
        });
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            cancellation_token.cancel();
        }
        _ = cancellation_token.cancelled() => {}
    }
    tracing::info!("Gracefully shut down");
}
