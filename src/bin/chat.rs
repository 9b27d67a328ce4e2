//! Terminal chat client
//!
//! Reads user messages from stdin, runs each turn through the relay and
//! prints assistant output as it streams in.
//!
//! Commands: `/new` starts a fresh conversation, `/quit` exits. Ctrl-C
//! cancels the turn in progress.

use futures::StreamExt;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use turnstream::config::ClientConfig;
use turnstream::conversation::{Change, ConversationStore, Item, Role, ToolCallItem, ToolStatus};
use turnstream::runtime::{TurnDriver, TurnError, TurnOutcome, TurnPhase};
use turnstream::tools::{CurrentTimeTool, ToolRegistry};
use turnstream::transport::{LoggingTransport, RelayTransport};

type Input = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "turnstream=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ClientConfig::from_env();
    let transport = LoggingTransport::new(RelayTransport::new(config.relay_url.clone())?);
    let registry = Arc::new(ToolRegistry::new().with_tool(CurrentTimeTool));
    let driver = TurnDriver::new(transport, registry, config.turn_settings());

    let mut store = ConversationStore::new();
    tokio::spawn(render(store.changes()));

    println!("turnstream chat ({}). /new for a fresh chat, /quit to exit.", config.model);
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    loop {
        prompt("> ");
        let Some(line) = input.next_line().await? else {
            break;
        };
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" => break,
            "/new" => {
                store.reset();
                println!("Started a new conversation.");
                continue;
            }
            _ => {}
        }

        let cancel = cancel_on_ctrl_c();
        let mut result = driver.send_user_message(&mut store, line, &cancel).await;

        // Approvals can chain: an approved call may lead to another request
        while let Ok(TurnOutcome::AwaitingApproval { request_ids }) = &result {
            let mut next = None;
            for request_id in request_ids.clone() {
                let approve = ask_approval(&store, &request_id, &mut input).await?;
                match driver
                    .respond_to_approval(&mut store, &request_id, approve, &cancel)
                    .await
                {
                    Ok(Some(outcome)) => next = Some(Ok(outcome)),
                    Ok(None) => {}
                    Err(e) => next = Some(Err(e)),
                }
            }
            match next {
                Some(outcome) => result = outcome,
                None => break,
            }
        }

        report(&result);
    }

    Ok(())
}

fn prompt(text: &str) {
    print!("{text}");
    let _ = std::io::stdout().flush();
}

/// A token cancelled by the next Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => trigger.cancel(),
            () = trigger.cancelled() => {}
        }
    });
    cancel
}

async fn ask_approval(
    store: &ConversationStore,
    request_id: &str,
    input: &mut Input,
) -> std::io::Result<bool> {
    let description = store
        .items()
        .iter()
        .find_map(|item| match item {
            Item::ApprovalRequest(request) if request.id == request_id => Some(format!(
                "{} on {} with {}",
                request.name, request.server_label, request.arguments
            )),
            _ => None,
        })
        .unwrap_or_else(|| request_id.to_string());

    prompt(&format!("Allow {description}? [y/N] "));
    let answer = input.next_line().await?.unwrap_or_default();
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn report(result: &Result<TurnOutcome, TurnError>) {
    match result {
        Ok(TurnOutcome::Completed { .. } | TurnOutcome::AwaitingApproval { .. }) => {}
        Ok(TurnOutcome::ToolUnavailable { names }) => {
            eprintln!("The model asked for tools this client does not have: {}", names.join(", "));
        }
        Err(TurnError::Cancelled) => eprintln!("Cancelled."),
        Err(e) => eprintln!("Error: {e}"),
    }
}

// ============================================================
// Rendering
// ============================================================

/// Print assistant output from the store's change stream
async fn render(mut changes: tokio_stream::wrappers::BroadcastStream<Change>) {
    let mut printed: HashMap<usize, usize> = HashMap::new();
    let mut announced: HashSet<(usize, ToolStatus)> = HashSet::new();

    while let Some(change) = changes.next().await {
        let Ok(change) = change else {
            continue;
        };
        match change {
            Change::ItemAdded { index, item } | Change::ItemUpdated { index, item } => match &item {
                Item::Message(message) if message.role == Role::Assistant => {
                    let text = message.text();
                    let done = printed.entry(index).or_insert(0);
                    if let Some(fresh) = text.get(*done..) {
                        if !fresh.is_empty() {
                            if *done == 0 && message.is_summary {
                                print!("(thinking) ");
                            }
                            print!("{fresh}");
                            let _ = std::io::stdout().flush();
                            *done = text.len();
                        }
                    }
                }
                Item::ToolCall(call) => {
                    if announced.insert((index, call.status)) {
                        println!("\n[{}]", describe_call(call));
                    }
                }
                Item::ToolCatalog(catalog) => {
                    println!("\n[{} tools available from {}]", catalog.tools.len(), catalog.server_label);
                }
                _ => {}
            },
            Change::PhaseChanged(TurnPhase::Done | TurnPhase::Failed) => println!(),
            Change::Reset => {
                printed.clear();
                announced.clear();
            }
            _ => {}
        }
    }
}

fn describe_call(call: &ToolCallItem) -> String {
    let name = call.name.as_deref().unwrap_or("tool");
    let line = format!("{:?} {name}: {:?}", call.kind, call.status);
    match call.current_query.as_ref().or(call.search_queries.last()) {
        Some(query) => format!("{line} \"{query}\""),
        None => line,
    }
}
