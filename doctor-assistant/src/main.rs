//! Doctor assistant chat
//!
//! Interactive terminal chat. Typed lines are symptom descriptions; `/lang`
//! switches language and `/listen <file.wav>` feeds a recording as speech.

use anyhow::Context;
use clap::Parser;
use doctor_assistant::{commands::HELP, AssistantConfig, Command, Session, SessionEvent};
use speech_io::{WavSource, DEFAULT_FRAME_MS};
use std::path::{Path, PathBuf};
use symptom_matcher::Language;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info};

#[derive(Parser, Debug)]
#[command(name = "doctor-assistant", version, about = "Bilingual symptom-checker chat")]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Starting language (en or hi)
    #[arg(short, long)]
    language: Option<Language>,

    /// Do not speak replies
    #[arg(long)]
    no_voice: bool,
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so the chat on stdout stays readable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("doctor_assistant=info,speech_io=info,symptom_matcher=info")
            }),
        )
        .init();

    if let Err(e) = run(Args::parse()).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut config =
        AssistantConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(language) = args.language {
        config.language = language;
    }
    if args.no_voice {
        config.voice.enabled = false;
    }

    let (session, mut events) =
        Session::from_config(&config).context("Failed to start symptom matcher")?;

    info!(
        "Doctor assistant v{} (language={}, voice={}, listen={})",
        doctor_assistant::VERSION,
        session.language(),
        session.has_voice(),
        session.can_listen()
    );

    println!("=== VIRTUAL HEALTH ASSISTANT ===");
    println!("Type /help for commands.");
    println!();
    println!("Doctor: {}", doctor_assistant::Notice::Welcome.text(session.language()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    break;
                };

                match Command::parse(&line) {
                    Command::Say(text) => {
                        session.submit(&text);
                    }
                    Command::ToggleLanguage => {
                        session.toggle_language();
                    }
                    Command::Listen(path) => start_listening(&session, &path),
                    Command::Help => println!("{}", HELP),
                    Command::Quit => break,
                    Command::Unknown(input) => {
                        println!("Unknown command: {} (try /help)", input);
                    }
                    Command::Empty => {}
                }
            }
            Some(event) = events.recv() => print_event(&event),
        }
    }

    // Finish in-flight replies before the runtime shuts down
    if session.pending() > 0 {
        debug!("Waiting for {} pending replies", session.pending());
    }
    session.wait_idle().await;
    while let Ok(event) = events.try_recv() {
        print_event(&event);
    }

    info!("Goodbye");
    Ok(())
}

fn start_listening(session: &Session, path: &Path) {
    match WavSource::open(path) {
        Ok(source) => {
            println!("[SYSTEM]: Listening to {}...", path.display());
            session.listen(source.stream(DEFAULT_FRAME_MS, true));
        }
        Err(e) => println!("[SYSTEM]: Cannot open {}: {}", path.display(), e),
    }
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::Heard(text) => println!("You (voice): {}", text),
        SessionEvent::Reply(reply) => println!("Doctor: {}", reply.text),
        SessionEvent::Notice { notice, language } => {
            println!("[SYSTEM]: {}", notice.text(*language))
        }
    }
}
