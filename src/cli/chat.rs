//! Chat command - terminal client for a running gateway
//!
//! Guests keep their counter in a local state file; signed-in users see the
//! server's ledger numbers.

use std::path::PathBuf;

use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::api::types::{ChatRequest, HistoryEntry, HistoryRole};
use crate::client::{
    ChatReply, ClientSession, FileGuestStore, GuestCounterStore, GuestProfile, LimitLevel,
    LimitView, QuotaApiClient,
};
use crate::domain::quota::DEFAULT_GUEST_CAP;

const MAX_LOCAL_HISTORY: usize = 20;

#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Gateway base URL
    #[arg(long, default_value = "http://localhost:8080")]
    pub url: String,

    /// Bearer token of a signed-in user
    #[arg(long, env = "GUIDANCE_TOKEN")]
    pub token: Option<String>,

    /// Where the guest counter is kept between runs
    #[arg(long, default_value = ".guidance-guest.json")]
    pub state_file: PathBuf,

    /// Ask for a spoken version of each reply
    #[arg(long)]
    pub speak: bool,
}

pub async fn run(args: ChatArgs) -> anyhow::Result<()> {
    let store = FileGuestStore::new(&args.state_file);
    let mut profile = store.load().await?;

    let mut client = QuotaApiClient::new(&args.url)?;
    let mut session = match &args.token {
        Some(token) => {
            client = client.with_token(token);
            ClientSession::member()
        }
        None => {
            if let Some(fingerprint) = &profile.fingerprint {
                client = client.with_fingerprint(fingerprint);
            }
            // replaced by the server's cap once the first decision arrives
            ClientSession::guest(profile.counter, DEFAULT_GUEST_CAP)
        }
    };

    let decision = client.quota(session.guest_count()).await?;
    session.record_decision(&decision);
    print_view(&session.view());

    let mut history: Vec<HistoryEntry> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while session.can_send() {
        eprint!("> ");
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }

        let mut request = ChatRequest::new(message);
        request.history = history.clone();
        request.guest_count = session.guest_count();
        request.speak = args.speak;

        match client.chat(&request).await {
            Ok(ChatReply::Answered(response)) => {
                println!("\n{}\n", response.reply);
                if let Some(audio_url) = &response.audio_url {
                    println!("(audio: {}{})", args.url.trim_end_matches('/'), audio_url);
                }

                session.record_turn(&response.quota, response.guest_count);
                remember(&mut history, message, &response.reply);
            }
            Ok(ChatReply::LimitReached(decision)) => {
                session.record_decision(&decision);
            }
            Err(e) => {
                eprintln!("error: {}", e);
                continue;
            }
        }

        save_guest(&store, &mut profile, &session, &client).await?;
        print_view(&session.view());
    }

    if !session.can_send() {
        eprintln!("No messages left for now.");
    }

    Ok(())
}

async fn save_guest(
    store: &FileGuestStore,
    profile: &mut GuestProfile,
    session: &ClientSession,
    client: &QuotaApiClient,
) -> anyhow::Result<()> {
    let Some(counter) = session.guest_counter() else {
        return Ok(());
    };

    profile.counter = counter;
    profile.fingerprint = client.fingerprint().map(str::to_string);
    store.save(profile).await?;
    Ok(())
}

fn remember(history: &mut Vec<HistoryEntry>, message: &str, reply: &str) {
    history.push(HistoryEntry {
        role: HistoryRole::User,
        content: message.to_string(),
    });
    history.push(HistoryEntry {
        role: HistoryRole::Assistant,
        content: reply.to_string(),
    });

    let excess = history.len().saturating_sub(MAX_LOCAL_HISTORY);
    history.drain(..excess);
}

fn print_view(view: &LimitView) {
    eprintln!("[{}] {}", render_level(view.level), render_line(view));
}

fn render_level(level: LimitLevel) -> &'static str {
    match level {
        LimitLevel::Normal => "ok",
        LimitLevel::Warning => "low",
        LimitLevel::Critical => "out",
    }
}

fn render_line(view: &LimitView) -> String {
    let mut line = view.headline.clone();
    if let Some(detail) = &view.detail {
        line.push_str(" - ");
        line.push_str(detail);
    }
    if let Some(tier) = view.upgrade_to {
        line.push_str(&format!(" (upgrade to {} for more)", tier.as_str()));
    }
    line
}
