use std::sync::Arc;

use tracing::{error, info, warn};

use scrapper::{
    build_http_client, BotClient, ChatLinkRepository, Config, Database, DetectorRegistry,
    GitHubClient, LinkRepository, LinkUpdater, QuestionRepository, StackOverflowClient,
    UpdaterSettings,
};

#[tokio::main]
async fn main() {
    let once = std::env::args().skip(1).any(|arg| arg == "--once");

    // Load configuration
    let config = match Config::load_with_env("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        std::process::exit(1);
    }

    // Initialize logging
    if let Err(e) = scrapper::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        scrapper::logging::init_console_only(&config.logging.level);
    }

    info!("Scrapper - link update notifier");

    if let Err(e) = run(config, once).await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config, once: bool) -> scrapper::Result<()> {
    let db = Database::open(&config.database.path).await?;
    let updater = Arc::new(build_updater(&config, &db)?);

    if once {
        let report = updater.run_update_cycle_report().await?;
        info!("Single cycle done: {}", report);
        db.close().await;
        return Ok(());
    }

    if !config.updater.enabled {
        warn!("Link updater is disabled; nothing to do");
        db.close().await;
        return Ok(());
    }

    let handle = scrapper::start_link_updater(updater, config.updater.check_interval_secs);

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    handle.abort();
    db.close().await;
    Ok(())
}

fn build_updater(config: &Config, db: &Database) -> scrapper::Result<LinkUpdater> {
    let http = build_http_client(&config.http)?;

    let detectors = DetectorRegistry::new()
        .with(Arc::new(GitHubClient::new(
            http.clone(),
            &config.github,
            config.display.timezone.as_str(),
        )))
        .with(Arc::new(StackOverflowClient::new(http.clone(), &config.stackoverflow)));

    let updater = LinkUpdater::new(
        Arc::new(LinkRepository::new(db.pool())),
        Arc::new(ChatLinkRepository::new(db.pool())),
        Arc::new(QuestionRepository::new(db.pool())),
        detectors,
        Arc::new(BotClient::new(http, &config.bot)),
    )
    .with_settings(UpdaterSettings::from(&config.updater));

    Ok(updater)
}
