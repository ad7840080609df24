mod logging;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use config::{load_env_file, PathManager, Settings};
use lensfolio_core::storage::{CacheStore, FsBlobStore, SqliteCacheStore};
use lensfolio_core::{
    CatalogEngine, CatalogError, CatalogTypes, Category, EngineConfig, Entity, EntityDraft, EntityId,
    HttpRemote, MediaBlob, MediaKind, MediaSource, Page, ReactionKind, ShareLinks, ViewFilter,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Production backends: hosted remote, SQLite cache, files for previews
struct LocalCatalog;

impl CatalogTypes for LocalCatalog {
    type Remote = HttpRemote;
    type Cache = SqliteCacheStore;
    type Blob = FsBlobStore;
}

type Engine = CatalogEngine<LocalCatalog>;

#[derive(Parser, Debug)]
#[command(name = "lensfolio", author, version, about = "Photo and video portfolio catalog", long_about = None)]
struct Args {
    /// Mirror logs to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Override the data directory (cache, previews, logs)
    #[arg(long, global = true, env = "LENSFOLIO_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Password for the configured user; enables signed-in commands
    #[arg(long, global = true, env = "LENSFOLIO_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show one page of the catalog, or every entity matching a filter
    List {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        #[arg(long, short)]
        query: Option<String>,
        /// 1-based page number when no filter is given
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Every distinct tag in the catalog
    Tags,
    /// Mutations logged locally and not yet acknowledged by the remote
    Pending,
    /// Replay the pending-mutation log (every other command does this on start)
    Recover,
    /// Upload a photo or video file
    Upload {
        file: PathBuf,
        #[arg(long)]
        title: String,
        #[arg(long)]
        category: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Comma separated
        #[arg(long, default_value = "")]
        tags: String,
    },
    /// Add a video hosted elsewhere (YouTube, Vimeo or a direct URL)
    LinkVideo {
        url: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        category: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    Delete {
        id: String,
    },
    Like {
        id: String,
    },
    /// Toggle a reaction: heart, love, fire or clap
    React {
        id: String,
        kind: String,
    },
    Comment {
        id: String,
        #[arg(long)]
        author: String,
        /// Picture URL shown next to the author
        #[arg(long)]
        avatar: Option<String>,
        text: String,
    },
    /// Print share links for an entity
    Share {
        id: String,
    },
    /// Remember the account email and check the password
    Login {
        email: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env_file();
    let args = Args::parse();
    if let Some(dir) = &args.data_dir {
        PathManager::set_data_dir(dir.clone());
    }
    let _guard = logging::init_logging(args.verbose);
    PathManager::ensure_dirs_exist().context("creating data directories")?;

    let mut settings = Settings::load();
    let remote = Arc::new(open_remote(&settings)?);

    match &args.command {
        Command::Login { email } => {
            let password = args.password.as_deref().context("pass --password or set LENSFOLIO_PASSWORD")?;
            let principal = remote.sign_in_with_password(email, password).await?;
            settings.user_email = Some(email.clone());
            settings.save().map_err(anyhow::Error::msg)?;
            println!("Signed in as {:?}", principal);
            return Ok(());
        }
        _ => sign_in(&remote, &settings, args.password.as_deref()).await,
    }

    let engine = open_engine(remote, &settings).await?;
    // Inspecting or replaying the log by hand must see it untouched
    if !matches!(args.command, Command::Recover | Command::Pending) {
        resume_interrupted(&engine).await;
    }
    run(&engine, &settings, args.command).await
}

fn open_remote(settings: &Settings) -> anyhow::Result<HttpRemote> {
    let url = settings.remote_url().context("no remote URL; set LENSFOLIO_REMOTE_URL")?;
    let key = settings.anon_key().context("no anonymous key; set LENSFOLIO_ANON_KEY")?;
    let timeout = EngineConfig::from_settings(settings).remote_timeout;
    Ok(HttpRemote::new(url, key).with_timeout(timeout))
}

/// Sign in when both an email and a password are known; browse anonymously otherwise.
async fn sign_in(remote: &HttpRemote, settings: &Settings, password: Option<&str>) {
    let (Some(email), Some(password)) = (settings.user_email.as_deref(), password) else {
        info!("browsing anonymously");
        return;
    };
    if let Err(e) = remote.sign_in_with_password(email, password).await {
        warn!(error = %e, "sign-in failed, continuing anonymously");
        eprintln!("Sign-in failed: {}", e);
    }
}

async fn open_engine(remote: Arc<HttpRemote>, settings: &Settings) -> anyhow::Result<Engine> {
    let db_path = PathManager::cache_db_path().context("no data directory")?;
    let mut cache = SqliteCacheStore::open(&db_path)
        .with_context(|| format!("opening cache at {:?}", db_path))?;
    if let Some(quota) = settings.cache_quota_bytes {
        cache = cache.with_quota(quota);
    }
    let blobs = FsBlobStore::new(PathManager::blob_dir().context("no data directory")?);
    match blobs.cleanup_temp_files().await {
        Ok(0) => {}
        Ok(cleaned) => info!(cleaned, "removed interrupted preview writes"),
        Err(e) => warn!(error = %e, "could not scan the preview store"),
    }
    Ok(CatalogEngine::new(
        remote,
        Arc::new(cache),
        Arc::new(blobs),
        EngineConfig::from_settings(settings),
    ))
}

/// Replay writes a previous run left in the log before doing anything else.
async fn resume_interrupted<S: CatalogTypes>(engine: &CatalogEngine<S>) {
    match engine.recover_pending().await {
        Ok(report) if report.resumed == 0 && report.skipped == 0 && report.purged == 0 => {}
        Ok(report) => {
            info!(
                resumed = report.resumed,
                succeeded = report.succeeded,
                failed = report.failed,
                skipped = report.skipped,
                purged = report.purged,
                "resumed interrupted writes"
            );
            if report.failed > 0 {
                eprintln!("{} interrupted change(s) could not be sent and were rolled back", report.failed);
            }
        }
        Err(e) => warn!(error = %e, "could not replay the pending log"),
    }
}

async fn run(engine: &Engine, settings: &Settings, command: Command) -> anyhow::Result<()> {
    match command {
        Command::List {
            category,
            tag,
            query,
            page,
        } => {
            let category = category.map(|c| Category::parse_any(&c));
            refresh(engine, category.clone()).await;

            if category.is_none() && tag.is_none() && query.is_none() {
                let mut pages = engine.paginate(settings.page_size)?;
                match pages.nth(page.saturating_sub(1)) {
                    Some(page) => print_page(&page),
                    None => println!("No page {}", page),
                }
                return Ok(());
            }
            let mut filter = ViewFilter::all();
            if let Some(category) = category {
                filter = filter.category(category);
            }
            if let Some(tag) = tag {
                filter = filter.tag(tag);
            }
            if let Some(query) = query {
                filter = filter.query(query);
            }
            for entity in engine.filter_view(&filter) {
                print_entity(&entity);
            }
        }
        Command::Tags => {
            refresh(engine, None).await;
            for tag in engine.all_tags() {
                println!("{}", tag);
            }
        }
        Command::Pending => {
            let pending = engine.cache().pending().await?;
            if pending.is_empty() {
                println!("Nothing pending");
            }
            for mutation in pending {
                println!(
                    "{}  {:<12} lane {}  since {}",
                    mutation.id,
                    mutation.op.name(),
                    mutation.lane,
                    mutation.enqueued_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
        Command::Recover => {
            let report = engine.recover_pending().await?;
            println!(
                "Resumed {} ({} ok, {} failed), skipped {}, purged {} orphaned objects",
                report.resumed, report.succeeded, report.failed, report.skipped, report.purged
            );
        }
        Command::Upload {
            file,
            title,
            category,
            description,
            tags,
        } => {
            let (kind, content_type) = media_type(&file)?;
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("reading {:?}", file))?;
            let mut blob = MediaBlob::new(bytes, content_type);
            if let Some(name) = file.file_name().and_then(|n| n.to_str()) {
                blob = blob.with_file_name(name);
            }
            let category = Category::parse(kind, &category);
            let draft = match kind {
                MediaKind::Photo => EntityDraft::photo(title, category),
                MediaKind::Video => EntityDraft::video(title, category),
            }
            .with_description(description)
            .with_tags(tags.split(',').map(str::trim).filter(|t| !t.is_empty()));
            create(engine, draft, MediaSource::Upload(blob)).await?;
        }
        Command::LinkVideo {
            url,
            title,
            category,
            description,
        } => {
            let draft = EntityDraft::video(title, Category::parse(MediaKind::Video, &category))
                .with_description(description);
            create(engine, draft, MediaSource::Link(url)).await?;
        }
        Command::Delete { id } => {
            let id = hydrated_id(engine, id).await;
            let deleted = engine.delete_entity(&id).await?;
            let outcome = deleted.outcome.settled().await?;
            println!("{}: {:?}", id, outcome);
        }
        Command::Like { id } => {
            let id = hydrated_id(engine, id).await;
            let liked = engine.toggle_like(&id).await?;
            let entity = liked.outcome.settled().await?;
            println!("{} likes (liked: {})", entity.likes, entity.is_liked);
        }
        Command::React { id, kind } => {
            let Some(kind) = ReactionKind::parse(&kind) else {
                bail!("unknown reaction {:?}; use heart, love, fire or clap", kind);
            };
            let id = hydrated_id(engine, id).await;
            let reacted = engine.toggle_reaction(&id, kind).await?;
            let entity = reacted.outcome.settled().await?;
            println!("{:?} (yours: {:?})", entity.reactions, entity.user_reaction);
        }
        Command::Comment {
            id,
            author,
            avatar,
            text,
        } => {
            let id = hydrated_id(engine, id).await;
            let commented = engine
                .add_comment_with_avatar(&id, &author, avatar.as_deref(), &text)
                .await?;
            let entity = commented.outcome.settled().await?;
            println!("{} comments", entity.comments.len());
        }
        Command::Share { id } => {
            let id = hydrated_id(engine, id).await;
            let entity = engine
                .get(&id)
                .ok_or(CatalogError::NotFound(id))?;
            let url = engine.media_url(&entity).unwrap_or_default();
            for (network, link) in ShareLinks::new(&entity.title, &url).iter() {
                println!("{:<9} {}", network, link);
            }
        }
        Command::Login { .. } => unreachable!("handled before the engine opens"),
    }
    Ok(())
}

/// Refresh from the remote, falling back to the cached view when offline.
async fn refresh(engine: &Engine, category: Option<Category>) {
    let loaded = match engine.load_catalog(category).await {
        Ok(loaded) => loaded,
        Err(e) => {
            warn!(error = %e, "could not read the local cache");
            return;
        }
    };
    match loaded.outcome.settled().await {
        Ok(report) => info!(
            fetched = report.fetched,
            quarantined = report.quarantined,
            "catalog refreshed"
        ),
        Err(e) => {
            warn!(error = %e, "refresh failed, showing cached catalog");
            eprintln!("Offline: showing {} cached entities", loaded.value.len());
        }
    }
}

/// Make sure the entity is known locally before acting on it.
async fn hydrated_id(engine: &Engine, id: String) -> EntityId {
    let id = EntityId::from(id);
    if engine.get(&id).is_none() {
        refresh(engine, None).await;
    }
    id
}

async fn create(engine: &Engine, draft: EntityDraft, media: MediaSource) -> anyhow::Result<()> {
    let created = engine.create_entity(draft, media).await?;
    println!("Added {} as {}", created.value.title, created.value.id);
    match created.outcome.settled().await {
        Ok(entity) => {
            println!("Confirmed as {}", entity.id);
            Ok(())
        }
        Err(e) => {
            if let Some(retry) = e.retry() {
                eprintln!("Upload of {:?} failed; run the command again to retry", retry.draft.title);
            }
            Err(e.into())
        }
    }
}

fn media_type(file: &Path) -> anyhow::Result<(MediaKind, &'static str)> {
    let extension = file
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let found = match extension.as_str() {
        "jpg" | "jpeg" => (MediaKind::Photo, "image/jpeg"),
        "png" => (MediaKind::Photo, "image/png"),
        "webp" => (MediaKind::Photo, "image/webp"),
        "gif" => (MediaKind::Photo, "image/gif"),
        "heic" => (MediaKind::Photo, "image/heic"),
        "mp4" => (MediaKind::Video, "video/mp4"),
        "webm" => (MediaKind::Video, "video/webm"),
        "mov" => (MediaKind::Video, "video/quicktime"),
        other => bail!("unsupported file type {:?}", other),
    };
    Ok(found)
}

fn print_page(page: &Page) {
    println!("Page {}", page.number + 1);
    for item in &page.items {
        match item.as_persisted() {
            Some(entity) => print_entity(entity),
            None => println!("  [demo] {}  {}", item.key(), item.title()),
        }
    }
    if page.has_more {
        println!("  ... more with --page {}", page.number + 2);
    }
}

fn print_entity(entity: &Entity) {
    let pending = if entity.is_confirmed() { "" } else { " (pending)" };
    let size = entity
        .media_info
        .dimensions()
        .map(|(w, h)| format!("  {}x{}", w, h))
        .unwrap_or_default();
    println!(
        "  {:<10} {:<6} {:<14} {}{}{}  likes {}  reactions {}  comments {}",
        entity.id,
        entity.kind,
        entity.category,
        entity.title,
        pending,
        size,
        entity.likes,
        entity.reactions.total(),
        entity.comments.len()
    );
}
