use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use cardframe::{
    channel_pair, drive, Config, DirectoryResolver, Face, Frame, FrameBootstrap, HostRouter,
};

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let Some(card_path) = args.next().map(PathBuf::from) else {
        bail!("usage: cardframe <card.html> [question|answer]");
    };
    let face = match args.next().as_deref() {
        None | Some("question") => Face::Question,
        Some("answer") => Face::Answer,
        Some(other) => bail!("unknown face '{other}', expected 'question' or 'answer'"),
    };

    // Keep an already installed subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();

    let config = Config::from_env().context("failed to load configuration")?;
    let html = fs::read_to_string(&card_path)
        .with_context(|| format!("failed to read card {}", card_path.display()))?;

    let card_id = card_id_for(&card_path);
    let context_id = format!("frame-{}", Uuid::new_v4().simple());

    let (frame_end, host_end) = channel_pair();
    let mut frame = Frame::new(context_id.clone(), &config.frame, &html, frame_end);
    if frame.bootstrap().is_none() {
        frame = frame.with_bootstrap(FrameBootstrap::new(card_id.clone(), face));
    }

    info!(card = %card_id, media = %config.host.media_dir.display(), "rendering card");
    let mut host = HostRouter::new(DirectoryResolver::new(&config.host.media_dir));
    host.register_frame(context_id, card_id, host_end)
        .context("failed to register frame")?;

    frame.document_loaded();
    // Nothing inside the sandbox can load a relative reference by itself.
    let references = frame.document().relative_references();
    for node in &references {
        frame.load_failed(node);
    }
    drive(&mut frame, &mut host);

    let unresolved = frame.ledger().pending_keys();
    if !unresolved.is_empty() {
        warn!(count = unresolved.len(), "some resources were not found in the media directory");
    }

    println!("{}", frame.document().to_html());
    Ok(())
}

fn card_id_for(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| "card-unknown".to_string())
}
