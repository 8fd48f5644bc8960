use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use markforge_contracts::chat::{parse_intent, STUDIO_HELP_COMMANDS};
use markforge_contracts::{HistoryEntry, HistoryStore, Mode};
use markforge_engine::download::save_result;
use markforge_engine::encoder::{encode_image_files, expand_user_path};
use markforge_engine::{ClientController, LogoRelay, Relay, RelayConfig, SessionState, Status};
use tokio::io::{AsyncBufReadExt, BufReader};

enum Backend {
    Local { config: RelayConfig, relay: LogoRelay },
    Remote(Box<dyn Relay>),
}

impl Backend {
    fn connect(remote: Option<String>) -> Result<Self> {
        match remote {
            Some(url) => Ok(Backend::Remote(crate::build_relay(Some(&url))?)),
            None => {
                let config = RelayConfig::from_env()?;
                let relay = LogoRelay::from_config(&config);
                Ok(Backend::Local { config, relay })
            }
        }
    }

    fn relay(&self) -> &dyn Relay {
        match self {
            Backend::Local { relay, .. } => relay as &dyn Relay,
            Backend::Remote(relay) => relay.as_ref(),
        }
    }

    fn describe(&self) -> String {
        match self {
            Backend::Local { relay, .. } => {
                format!("local relay, model {}", relay.model().name)
            }
            Backend::Remote(_) => "remote relay".to_string(),
        }
    }
}

pub(crate) async fn run_studio(mode: Mode, remote: Option<String>, out: PathBuf) -> Result<i32> {
    let mut backend = Backend::connect(remote)?;
    let mut controller = ClientController::new(mode);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!(
        "Markforge studio ({}). Mode: {}. Type /help for commands.",
        backend.describe(),
        controller.active_mode()
    );

    loop {
        print!("{}> ", controller.active_mode());
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let intent = parse_intent(&line);

        match intent.action.as_str() {
            "noop" => continue,
            "quit" => break,
            "help" => println!("Commands: {}", STUDIO_HELP_COMMANDS.join(" ")),
            "set_mode" => match intent.arg_str("mode").map(str::parse::<Mode>) {
                Some(Ok(mode)) => {
                    controller.switch_mode(mode);
                    println!("Mode: {mode}");
                    print_session(controller.active_session());
                }
                Some(Err(err)) => println!("{err}"),
                None => println!("/mode requires modernize or create"),
            },
            "set_prompt" => {
                controller.set_prompt(intent.arg_str("text").unwrap_or_default());
                println!("Prompt set.");
            }
            "set_model" => match (&mut backend, intent.arg_str("model")) {
                (Backend::Local { config, relay }, Some(model)) => {
                    config.model = model.to_string();
                    *relay = LogoRelay::from_config(config);
                    println!("Model: {} ({:?} output)", relay.model().name, relay.model().output);
                }
                (Backend::Local { relay, .. }, None) => {
                    println!("Model: {}", relay.model().name);
                }
                (Backend::Remote(_), _) => {
                    println!("The remote relay chooses its own model.");
                }
            },
            "add_images" => {
                let paths: Vec<PathBuf> = intent
                    .arg_list("paths")
                    .iter()
                    .map(|raw| expand_user_path(raw))
                    .collect();
                if paths.is_empty() {
                    println!("/image requires one or more paths");
                    continue;
                }
                let mut added = 0;
                for image in encode_image_files(&paths) {
                    if !controller.add_image(image) {
                        println!("Reference image limit reached.");
                        break;
                    }
                    added += 1;
                }
                println!(
                    "Added {added} image(s); {} attached.",
                    controller.active_session().images.len()
                );
            }
            "clear_images" => {
                controller.clear_images();
                println!("Reference images cleared.");
            }
            "generate" => {
                if let Some(prompt) = intent.prompt.as_deref() {
                    controller.set_prompt(prompt);
                }
                println!("Generating...");
                let status = controller.generate(backend.relay()).await;
                report_generation(status, controller.active_session());
            }
            "history" => print_history(controller.history()),
            "status" => {
                println!("Status: {:?}", controller.status());
                print_session(controller.active_session());
            }
            "save" => {
                let dir = intent.arg_str("path").map(expand_user_path).unwrap_or_else(|| out.clone());
                save_latest(&dir, controller.active_session());
            }
            _ => println!("Unknown command: {}", intent.raw.trim()),
        }
    }

    Ok(0)
}

fn report_generation(status: Status, session: &SessionState) {
    match status {
        Status::Success => match session.result.as_ref() {
            Some(result) => println!(
                "Logo ready: {} ({} bytes). Use /save to write it.",
                result.image.mime(),
                result.image.byte_len()
            ),
            None => println!("Logo ready."),
        },
        Status::Loading => println!("A generation is already running."),
        _ => println!(
            "Error: {}",
            session.error.as_deref().unwrap_or("generation failed")
        ),
    }
}

fn save_latest(dir: &Path, session: &SessionState) {
    let Some(result) = session.result.as_ref() else {
        println!("Nothing to save yet.");
        return;
    };
    match save_result(dir, result) {
        Ok(path) => println!("Saved {}", path.display()),
        Err(err) => println!("Save failed: {err:#}"),
    }
}

fn print_session(session: &SessionState) {
    println!("{}", session_summary(session));
    if let Some(error) = session.error.as_deref() {
        println!("Error: {error}");
    }
}

fn session_summary(session: &SessionState) -> String {
    let prompt = session.prompt.trim();
    format!(
        "Prompt: {} | Images: {} | Result: {}",
        if prompt.is_empty() { "(none)" } else { prompt },
        session.images.len(),
        session
            .result
            .as_ref()
            .map(|result| result.image.mime().to_string())
            .unwrap_or_else(|| "none".to_string())
    )
}

fn print_history(history: &HistoryStore) {
    if history.is_empty() {
        println!("No logos yet.");
        return;
    }
    for (index, entry) in history.entries().enumerate() {
        println!("{}", history_line(index + 1, entry));
    }
}

fn history_line(position: usize, entry: &HistoryEntry) -> String {
    format!(
        "{position:>2}. [{}] {} {} ({})",
        entry.result.mode,
        entry.result.created_at.format("%H:%M:%S"),
        entry.display_prompt(),
        entry.result.image.mime()
    )
}

#[cfg(test)]
mod tests {
    use markforge_contracts::{DataUri, GenerationResult, HistoryEntry, Mode};
    use markforge_engine::SessionState;

    use super::{history_line, session_summary};

    #[test]
    fn summary_shows_prompt_images_and_result() {
        let mut session = SessionState::default();
        assert_eq!(
            session_summary(&session),
            "Prompt: (none) | Images: 0 | Result: none"
        );
        session.prompt = "keep the red".into();
        session.images.push(DataUri::new("image/png", "b2xk"));
        session.result = Some(GenerationResult::new(
            DataUri::svg("<svg/>"),
            Mode::Modernize,
            "keep the red",
        ));
        assert_eq!(
            session_summary(&session),
            "Prompt: keep the red | Images: 1 | Result: image/svg+xml"
        );
    }

    #[test]
    fn history_line_uses_fallback_label() {
        let entry = HistoryEntry::new(
            GenerationResult::new(DataUri::new("image/png", "bmV3"), Mode::Create, ""),
            Vec::new(),
        );
        let line = history_line(1, &entry);
        assert!(line.starts_with(" 1. [create] "));
        assert!(line.ends_with("Forge Identity (image/png)"));
    }
}
