use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use folium::{
    init_logging, AppEvent, Config, EventCategory, EventFilter, FileStore, PartCard,
    PreferenceStore, Session, UploadFile,
};

const DISPLAY_WIDTH: f64 = 1200.0;

fn load_config() -> anyhow::Result<Config> {
    match Config::default_path() {
        Ok(path) => Ok(Config::load_or_default(&path)?),
        Err(e) => {
            tracing::warn!("{}, using default configuration", e);
            Ok(Config::default())
        }
    }
}

async fn read_images(paths: &[String]) -> anyhow::Result<Vec<UploadFile>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {path}"))?;
        let name = Path::new(path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(path)
            .to_string();
        files.push(UploadFile::new(name, bytes));
    }
    Ok(files)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_logging()?;
    tracing::info!("folium {} (built {})", folium::VERSION, folium::BUILD_DATE);

    let mut args = std::env::args().skip(1);
    let root: PathBuf = args
        .next()
        .map(PathBuf::from)
        .context("usage: folium <store-dir> [part] [image...]")?;
    let part_arg = args.next();
    let images: Vec<String> = args.collect();

    let store = Arc::new(
        FileStore::open(&root).with_context(|| format!("opening store {}", root.display()))?,
    );
    let prefs = PreferenceStore::open(root.join("preferences.json"))?;
    let mut session = Session::new(load_config()?, prefs, store.clone(), DISPLAY_WIDTH);
    let progress = session.bus().subscribe(
        EventFilter::Categories(vec![EventCategory::Sync, EventCategory::Upload]),
        |event| match event {
            AppEvent::Sync(_) => tracing::debug!("{}", event.description()),
            _ => tracing::info!("{}", event.description()),
        },
    );

    let cards = store
        .part_order()
        .into_iter()
        .filter_map(|pk| store.part(pk))
        .map(|doc| PartCard {
            pk: doc.pk,
            title: doc.title,
            thumbnail_uri: doc.image.thumbnail_uri,
        })
        .collect();
    session.set_cards(cards);

    if !images.is_empty() {
        let files = read_images(&images).await?;
        for outcome in session.upload(files).await {
            match outcome.result {
                Ok(receipt) => tracing::info!("{} -> part {}", outcome.name, receipt.pk),
                Err(e) => tracing::error!("{}: {}", outcome.name, e),
            }
        }
    }

    let part = match part_arg {
        Some(raw) => Some(raw.parse().with_context(|| format!("invalid part id {raw}"))?),
        None => session.cards().order().first().copied(),
    };
    if let Some(part) = part {
        session.load_part(part).await?;
        let model = session.editor().model();
        tracing::info!(
            "Loaded part {}: {} lines, {} regions; open panels: {}",
            part,
            model.line_count(),
            model.region_count(),
            session.panels().open_panels().join(", ")
        );
    }

    let notifications = root.join("notifications.jsonl");
    if notifications.exists() {
        let text = tokio::fs::read_to_string(&notifications).await?;
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            session.notify(line);
        }
    }

    let applied = session.settle().await;
    session.bus().unsubscribe(progress);
    store.save()?;
    tracing::info!("Applied {} sync responses", applied);
    for alert in session.alerts().active() {
        println!("[{:?}] {}", alert.level, alert.message);
    }
    Ok(())
}
