use std::env;
use std::path::PathBuf;

use lectern::chat::{
    ChatSession, MessageListController, Relevancy, SessionError, SubmitOutcome, ToggleOutcome,
    TranslationMode,
};
use lectern::settings::{SettingsError, SettingsStore};
use lectern_storage::{ConversationId, IdError, MessageId, SqliteDocumentStore, StorageError};
use snafu::{OptionExt, ResultExt, Snafu};

#[derive(Debug, Clone, Default)]
struct RunnerArgs {
    conversation: Option<String>,
    db_path: Option<String>,
    config_path: Option<PathBuf>,
    translated: bool,
    toggle: Option<String>,
    annotate: Option<String>,
    condition: Option<String>,
    relevancy: Option<Relevancy>,
}

#[derive(Debug, Snafu)]
enum RunnerError {
    #[snafu(display("missing required --conversation argument"))]
    MissingConversation { stage: &'static str },
    #[snafu(display("missing value for argument '{arg}'"))]
    MissingArgumentValue {
        stage: &'static str,
        arg: &'static str,
    },
    #[snafu(display("unknown argument '{raw}'"))]
    UnknownArgument { stage: &'static str, raw: String },
    #[snafu(display("unknown relevancy '{raw}', expected note, normal or important"))]
    UnknownRelevancy { stage: &'static str, raw: String },
    #[snafu(display("--annotate requires --condition"))]
    MissingCondition { stage: &'static str },
    #[snafu(display("invalid identifier: {source}"))]
    InvalidId { stage: &'static str, source: IdError },
    #[snafu(display("settings are unusable: {source}"))]
    Settings {
        stage: &'static str,
        source: SettingsError,
    },
    #[snafu(display("failed to open document store: {source}"))]
    OpenStore {
        stage: &'static str,
        source: StorageError,
    },
    #[snafu(display("failed to open conversation: {source}"))]
    OpenConversation {
        stage: &'static str,
        source: SessionError,
    },
    #[snafu(display("message '{message_id}' is not part of the conversation"))]
    UnknownMessage {
        stage: &'static str,
        message_id: MessageId,
    },
}

type RunnerResult<T> = Result<T, RunnerError>;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt::init();

    if let Err(error) = run().await {
        eprintln!("lectern: {error}");
        std::process::exit(1);
    }
}

async fn run() -> RunnerResult<()> {
    let args = parse_args(env::args().skip(1))?;
    let settings_store = match args.config_path.clone() {
        Some(path) => SettingsStore::new(path),
        None => SettingsStore::load(),
    };
    let settings = settings_store.settings();
    let layout = settings.remote_layout().context(SettingsSnafu {
        stage: "runner-remote-layout",
    })?;

    let conversation_raw = args.conversation.as_deref().context(MissingConversationSnafu {
        stage: "runner-conversation",
    })?;
    let conversation_id = ConversationId::parse(conversation_raw).context(InvalidIdSnafu {
        stage: "runner-parse-conversation",
    })?;

    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| settings.database_location.clone());
    let store = SqliteDocumentStore::open(&db_path)
        .await
        .context(OpenStoreSnafu {
            stage: "runner-open-store",
        })?;

    let mut session = ChatSession::new(layout.clone());
    session
        .open(&store, conversation_id.clone())
        .await
        .context(OpenConversationSnafu {
            stage: "runner-open-conversation",
        })?;

    let mut controller = MessageListController::new(layout, conversation_id);
    if args.translated || settings.translation_mode() == TranslationMode::Translated {
        controller.toggle_translation_mode();
    }

    if let Some(raw) = args.toggle.as_deref() {
        let message_id = parse_message_id(raw)?;
        match controller
            .toggle_lectored(session.store_mut(), &store, &message_id)
            .await
        {
            ToggleOutcome::Applied { lectored } => println!("lectored {message_id} = {lectored}"),
            ToggleOutcome::Rejected(_) => {
                return UnknownMessageSnafu {
                    stage: "runner-toggle",
                    message_id,
                }
                .fail();
            }
            ToggleOutcome::Failed | ToggleOutcome::Stale => {
                println!("lectored {message_id} unchanged");
            }
        }
    }

    if let Some(raw) = args.annotate.as_deref() {
        let message_id = parse_message_id(raw)?;
        if !controller.open_test_case(session.store(), &message_id) {
            return UnknownMessageSnafu {
                stage: "runner-annotate",
                message_id,
            }
            .fail();
        }
        let condition = args.condition.clone().context(MissingConditionSnafu {
            stage: "runner-annotate-condition",
        })?;
        controller.set_condition(condition);
        if let Some(relevancy) = args.relevancy {
            controller.set_relevancy(relevancy);
        }

        match controller.submit_test_case(&store).await {
            SubmitOutcome::Submitted(record_id) => println!("test case {record_id} stored"),
            outcome => println!("test case not stored: {outcome:?}"),
        }
    }

    for row in controller.rows(session.store()) {
        let marker = if row.lectored { "x" } else { " " };
        println!(
            "[{marker}] {} <{}> {}",
            row.message_id, row.author_id, row.display_text
        );
    }

    Ok(())
}

fn parse_message_id(raw: &str) -> RunnerResult<MessageId> {
    MessageId::parse(raw).context(InvalidIdSnafu {
        stage: "runner-parse-message",
    })
}

fn parse_args(args: impl IntoIterator<Item = String>) -> RunnerResult<RunnerArgs> {
    let mut parsed = RunnerArgs::default();
    let mut pending = args.into_iter();

    while let Some(argument) = pending.next() {
        match argument.as_str() {
            "--conversation" => {
                parsed.conversation = Some(next_value(&mut pending, "--conversation")?);
            }
            "--db" => parsed.db_path = Some(next_value(&mut pending, "--db")?),
            "--config" => {
                parsed.config_path = Some(PathBuf::from(next_value(&mut pending, "--config")?));
            }
            "--translated" => parsed.translated = true,
            "--toggle" => parsed.toggle = Some(next_value(&mut pending, "--toggle")?),
            "--annotate" => parsed.annotate = Some(next_value(&mut pending, "--annotate")?),
            "--condition" => parsed.condition = Some(next_value(&mut pending, "--condition")?),
            "--relevancy" => {
                let raw = next_value(&mut pending, "--relevancy")?;
                let relevancy = Relevancy::parse(&raw).context(UnknownRelevancySnafu {
                    stage: "parse-args-relevancy",
                    raw,
                })?;
                parsed.relevancy = Some(relevancy);
            }
            _ => {
                return UnknownArgumentSnafu {
                    stage: "parse-args-unknown",
                    raw: argument,
                }
                .fail();
            }
        }
    }

    Ok(parsed)
}

fn next_value(
    pending: &mut impl Iterator<Item = String>,
    arg: &'static str,
) -> RunnerResult<String> {
    pending.next().context(MissingArgumentValueSnafu {
        stage: "parse-args-value",
        arg,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn parses_annotation_flags() {
        let parsed = parse_args(args(&[
            "--conversation",
            "c1",
            "--annotate",
            "m1",
            "--condition",
            "greets",
            "--relevancy",
            "important",
            "--translated",
        ]))
        .unwrap();

        assert_eq!(parsed.conversation.as_deref(), Some("c1"));
        assert_eq!(parsed.annotate.as_deref(), Some("m1"));
        assert_eq!(parsed.condition.as_deref(), Some("greets"));
        assert_eq!(parsed.relevancy, Some(Relevancy::Important));
        assert!(parsed.translated);
    }

    #[test]
    fn rejects_unknown_flags_and_missing_values() {
        assert!(matches!(
            parse_args(args(&["--verbose"])),
            Err(RunnerError::UnknownArgument { .. })
        ));
        assert!(matches!(
            parse_args(args(&["--db"])),
            Err(RunnerError::MissingArgumentValue { arg: "--db", .. })
        ));
        assert!(matches!(
            parse_args(args(&["--relevancy", "urgent"])),
            Err(RunnerError::UnknownRelevancy { .. })
        ));
    }
}
