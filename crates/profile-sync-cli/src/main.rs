use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use tracing::info;

use profile_sync_core::app::{AppBuilder, AuthMode, UserNotice};
use profile_sync_core::config::SyncConfig;
use profile_sync_core::domain::AvatarPathStrategy;
use profile_sync_core::impls::{FilePicker, InMemoryBackend, RecordingEventSink};
use profile_sync_core::observability::{UploadCounts, init_tracing};

/// Walk through sign-up, sign-in and an avatar upload against the in-memory
/// backend.
///
/// Settings not given on the command line come from `PROFILE_SYNC_*`
/// environment variables.
#[derive(Parser, Debug)]
#[command(name = "profile-sync", version, about)]
struct Cli {
    /// Account email
    #[arg(long, short = 'e', default_value = "demo@example.com")]
    email: String,

    /// Account password
    #[arg(long, short = 'p', default_value = "demo-password")]
    password: String,

    /// Image file to use as the avatar
    #[arg(long, short = 'i')]
    image: PathBuf,

    /// Profile key column [env: PROFILE_SYNC_KEY_COLUMN]
    #[arg(long, short = 'k')]
    key_column: Option<String>,

    /// Store every upload under a new timestamped name
    #[arg(long)]
    timestamped: bool,

    /// Sign up without the email confirmation step
    #[arg(long)]
    no_confirm: bool,
}

impl Cli {
    fn sync_config(&self) -> anyhow::Result<SyncConfig> {
        let mut config = match &self.key_column {
            Some(column) => SyncConfig::new(column),
            None => SyncConfig::from_env().context("loading PROFILE_SYNC_* settings")?,
        };
        if self.timestamped {
            config = config.with_path_strategy(AvatarPathStrategy::Timestamped);
        }
        Ok(config)
    }
}

fn show(step: &str, notice: Option<UserNotice>) {
    match notice {
        Some(n) => println!("[{step}] {:?} {}: {}", n.level, n.title, n.message),
        None => println!("[{step}] ok"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let backend = InMemoryBackend::new(!cli.no_confirm);
    let events = Arc::new(RecordingEventSink::new());
    let app = AppBuilder::new()
        .config(cli.sync_config()?)
        .backend(&backend)
        .picker(Arc::new(FilePicker::new(cli.image.clone())))
        .event_sink(events.clone())
        .build()
        .await?;

    let form = app.auth_form();
    form.set_email(&cli.email);
    form.set_password(&cli.password);

    if form.toggle_mode() != AuthMode::SignUp {
        bail!("auth form did not switch to sign-up");
    }
    show("sign-up", form.submit().await);

    if !cli.no_confirm {
        // stand-in for the user clicking the link in the email
        backend.auth.confirm_email(cli.email.trim());
        form.toggle_mode();
        show("sign-in", form.submit().await);
    }

    let Some(principal) = app.session.principal() else {
        bail!("no active session after sign-in");
    };
    info!(principal = %principal.id, email = %principal.email, "signed in");

    let screen = app.profile_screen();
    let follower = screen.follow();

    show("change-picture", screen.change_picture().await);
    if screen.view().pending_link.is_some() {
        show("retry-link", screen.retry_link().await);
    }

    screen.refresh().await;
    match screen.view().avatar {
        Some(avatar) => println!("avatar: {avatar}"),
        None => println!("avatar: <none>"),
    }

    follower.shutdown_and_join().await;
    app.sign_out().await?;
    app.shutdown();

    let counts = UploadCounts::from_events(&events.events());
    println!("{}", serde_json::to_string_pretty(&counts)?);
    Ok(())
}
