//! Line-oriented chat client for the rate concierge.
//!
//! Plain lines are sent as utterances. Lines starting with `/` are commands;
//! `/help` lists them.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, prelude::*};

use rate_concierge::adapters::agent::{HttpAgentService, ResilientAgentService};
use rate_concierge::adapters::notify::ChannelNotifier;
use rate_concierge::adapters::persistence::HttpThreadStore;
use rate_concierge::adapters::storage::FileProfileStore;
use rate_concierge::application::{
    ConversationError, OrchestratorSettings, SessionOrchestrator, SubmitOutcome, ThreadRepository,
};
use rate_concierge::config::{AppConfig, LoggingConfig};
use rate_concierge::domain::comparison::parse_day;
use rate_concierge::domain::conversation::{Locale, Message, MessageKind};
use rate_concierge::domain::foundation::ThreadId;
use rate_concierge::domain::session::Mode;
use rate_concierge::ports::{Clock, SystemClock, UserNotifier};

const HELP: &str = "\
/new                 start a new chat
/mode expert|chat    choose how messages are handled (before the first message)
/date YYYY-MM-DD     click a day in the date picker
/threads             list saved conversations
/open <thread-id>    resume a conversation
/delete <thread-id>  delete a conversation
/strategy            ask for the cheapest booking strategy
/quit                exit";

fn init_tracing(logging: &LoggingConfig) {
    let registry = tracing_subscriber::registry().with(logging.env_filter());
    if logging.json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config.logging);

    let locale = config.session.locale;
    let notifier = ChannelNotifier::new();
    let user_notifier: Arc<dyn UserNotifier> = Arc::new(notifier.clone());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let agent = ResilientAgentService::new(HttpAgentService::new(config.agent.http())?, user_notifier.clone())
        .with_policy(config.agent.retry_policy());
    let shutdown = agent.shutdown_token();

    let repository = Arc::new(ThreadRepository::new(
        Arc::new(HttpThreadStore::new(config.persistence.http())?),
        user_notifier.clone(),
        clock.clone(),
        config.session.repository_ttls(),
    ));
    let profile = Arc::new(FileProfileStore::new(&config.session.state_dir));

    let orchestrator = SessionOrchestrator::new(
        Arc::new(agent),
        repository,
        profile.clone(),
        profile,
        clock,
        user_notifier,
        OrchestratorSettings {
            locale,
            channel: config.agent.channel.clone(),
            default_nights: config.session.default_nights,
            default_mode: config.session.default_mode,
        },
    );

    if let Some(mut notices) = notifier.take_receiver() {
        tokio::spawn(async move {
            while let Some(notice) = notices.recv().await {
                println!("  ! {}", notice.text(locale));
            }
        });
    }

    let cancel = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling pending requests");
            cancel.cancel();
        }
    });

    tracing::info!(agent = %config.agent.base_url, "Rate concierge started");
    println!("Type a hotel name or a question. /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let result = match line.split_once(' ').unwrap_or((line, "")) {
            ("/quit", _) => break,
            ("/help", _) => {
                println!("{HELP}");
                Ok(())
            }
            ("/new", _) => {
                orchestrator.new_chat();
                Ok(())
            }
            ("/mode", arg) => match arg.trim() {
                "expert" => orchestrator.set_mode(Mode::Expert),
                "chat" => orchestrator.set_mode(Mode::Chat),
                other => {
                    println!("unknown mode: {other}");
                    Ok(())
                }
            },
            ("/date", arg) => {
                match parse_day(arg) {
                    Some(day) => {
                        let range = orchestrator.select_date(day);
                        println!("  dates: {:?} → {:?}", range.check_in, range.check_out);
                    }
                    None => println!("expected a date like 2030-05-01"),
                }
                Ok(())
            }
            ("/threads", _) => orchestrator.list_threads().await.map(|threads| {
                for thread in threads {
                    println!("  {}  {}", thread.id, thread.title);
                }
            }),
            ("/open", arg) => match ThreadId::new(arg.trim()) {
                Ok(thread_id) => orchestrator.open_thread(&thread_id).await.map(|()| {
                    for message in orchestrator.snapshot().messages() {
                        print_message(locale, message);
                    }
                }),
                Err(err) => Err(err.into()),
            },
            ("/delete", arg) => match ThreadId::new(arg.trim()) {
                Ok(thread_id) => orchestrator.delete_thread(&thread_id).await,
                Err(err) => Err(err.into()),
            },
            ("/strategy", _) => orchestrator
                .request_booking_strategy()
                .await
                .map(|outcome| print_outcome(locale, &outcome)),
            (command, _) if command.starts_with('/') => {
                println!("unknown command, /help lists them");
                Ok(())
            }
            _ => orchestrator
                .submit(line)
                .await
                .map(|outcome| print_outcome(locale, &outcome)),
        };

        if let Err(err) = result {
            report(locale, &err);
        }
    }

    Ok(())
}

fn print_outcome(locale: Locale, outcome: &SubmitOutcome) {
    for message in outcome.messages() {
        print_message(locale, message);
    }
}

fn print_message(locale: Locale, message: &Message) {
    match (&message.kind, &message.comparison) {
        (MessageKind::Comparison, Some(evaluation)) => {
            println!("{}: {}", message.role.as_str(), locale.comparison_summary(evaluation));
            for row in &evaluation.table_rows {
                let price = row.price.map_or_else(|| "-".to_string(), |p| format!("{p:.2}"));
                println!("    {:<20} {:>10}  {}", row.platform, price, row.cancellation_headline());
            }
        }
        _ => println!("{}: {}", message.role.as_str(), message.content),
    }
}

fn report(locale: Locale, err: &ConversationError) {
    tracing::debug!(error = %err, code = %err.code(), "Command failed");
    match err {
        ConversationError::Validation(inner) => println!("  ! {inner}"),
        other => println!("  ! {}", locale.failure(other.code())),
    }
}
