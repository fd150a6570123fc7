use std::path::PathBuf;
use std::sync::Arc;

use arc_messaging::services::logger;
use arc_messaging::{config, MessagesDialog, MessagingService, Store};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    logger::init();

    let loaded = match std::env::args().nth(1) {
        Some(path) => config::init_config_from_path(&PathBuf::from(path)),
        None => config::init_config(),
    };
    if let Err(e) = loaded {
        warn!("Could not load config: {}", e);
    }

    if let Err(e) = run(config::get_config()).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(app_config: config::AppConfig) -> arc_messaging::Result<()> {
    let store = Arc::new(Store::new(app_config.storage.location()));
    let service = MessagingService::new(app_config.messaging, store)?;

    let unread = service.run().await?;
    info!("{} unread messages", unread);

    let (mut dialog, _navigation) = MessagesDialog::new();
    dialog.set_messages(service.read_messages().await?);
    dialog.open();
    print!("{}", dialog.render());

    service.close_db().await;
    Ok(())
}
