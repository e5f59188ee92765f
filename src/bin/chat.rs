//! Terminal chat client for the homework assistant
//!
//! Talks to a running server when `STUDEX_SERVER_URL` is set, otherwise runs
//! the provider cascade in-process. History is kept in a local SQLite file.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use studex_tutor::activity::MemoryActivityLog;
use studex_tutor::chat::{Caller, ChatService};
use studex_tutor::db::{Conversation, Database, Role};
use studex_tutor::llm::{all_models, LlmConfig, ProviderChain};
use studex_tutor::runtime::{
    ChatBackend, ChatClient, ClientUpdate, DatabaseStore, HttpChatBackend, ServiceBackend,
};
use studex_tutor::state_machine::TaskContext;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

const HELP: &str = "Commands:
  /new              start a new conversation
  /list             list conversations
  /switch <n>       open conversation n from /list
  /delete <n>       delete conversation n from /list
  /attach <path>    attach a file to the next message
  /detach <n>       remove staged attachment n
  /model [id]       show or select the model
  /help             show this help
  /quit             exit";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let db_path = std::env::var("STUDEX_CHAT_DB").map_or_else(
        |_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(format!("{home}/.studex/chat.db"))
        },
        PathBuf::from,
    );
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = DatabaseStore::new(Database::open(&db_path)?);

    let task = std::env::var("STUDEX_TASK")
        .ok()
        .and_then(|t| TaskContext::parse(&t));
    let model = std::env::var("STUDEX_MODEL").ok();

    match std::env::var("STUDEX_SERVER_URL") {
        Ok(url) if !url.is_empty() => {
            let client = ChatClient::new(HttpChatBackend::new(&url), store);
            run(client.with_task(task), model.as_deref()).await
        }
        _ => {
            let providers = ProviderChain::from_config(&LlmConfig::from_env());
            let service = ChatService::new(providers, Arc::new(MemoryActivityLog::default()));
            let client = ChatClient::new(ServiceBackend::new(service, Caller::anonymous()), store);
            run(client.with_task(task), model.as_deref()).await
        }
    }
}

async fn run<B>(
    mut client: ChatClient<B, DatabaseStore>,
    model: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>>
where
    B: ChatBackend + 'static,
{
    if let Some(model) = model {
        if let Err(e) = client.set_model(model) {
            tracing::warn!(error = %e, "Ignoring STUDEX_MODEL");
        }
    }

    client.load().await?;
    let mut updates = client.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut view = View::default();

    println!("{}\n", client.welcome());
    println!("Model: {}. Type /help for commands.", client.model());
    if let Some(conversation) = client.selected() {
        print_history(conversation);
    }
    prompt();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle_line(&mut client, line.trim()).await {
                    break;
                }
                prompt();
            }
            update = updates.recv() => match update {
                Ok(update) => view.render(&client, update),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Display fell behind");
                }
                Err(RecvError::Closed) => break,
            },
            () = client.handle_next() => {}
        }
    }

    Ok(())
}

/// Returns false when the user asked to quit
async fn handle_line<B>(client: &mut ChatClient<B, DatabaseStore>, line: &str) -> bool
where
    B: ChatBackend + 'static,
{
    let (command, arg) = line.split_once(' ').unwrap_or((line, ""));
    let arg = arg.trim();

    let result = match command {
        "/quit" | "/exit" => return false,
        "/help" => {
            println!("{HELP}");
            Ok(())
        }
        "/new" => {
            client.new_conversation().await;
            println!("Started a new conversation.");
            Ok(())
        }
        "/list" => {
            print_list(client);
            Ok(())
        }
        "/switch" => match conversation_at(client, arg) {
            Some(id) => client.switch_to(&id).await.map(|()| {
                if let Some(conversation) = client.selected() {
                    print_history(conversation);
                }
            }),
            None => {
                println!("No such conversation. Use /list.");
                Ok(())
            }
        },
        "/delete" => match conversation_at(client, arg) {
            Some(id) => client.delete(&id).await.map(|()| println!("Deleted.")),
            None => {
                println!("No such conversation. Use /list.");
                Ok(())
            }
        },
        "/attach" => client.stage_file(Path::new(arg)).await.map(|attachment| {
            println!("Attached {} ({} bytes)", attachment.name, attachment.size);
        }),
        "/detach" => {
            match arg
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| client.remove_attachment(i))
            {
                Some(removed) => println!("Removed {}", removed.name),
                None => println!("No such attachment."),
            }
            Ok(())
        }
        "/model" if arg.is_empty() => {
            for model in all_models() {
                let marker = if model.id == client.model() { "*" } else { " " };
                println!("{marker} {:<14} {}", model.id, model.description);
            }
            Ok(())
        }
        "/model" => client
            .set_model(arg)
            .map(|()| println!("Model set to {}", client.model())),
        _ if command.starts_with('/') => {
            println!("Unknown command. Type /help.");
            Ok(())
        }
        _ => client.submit(line).await,
    };

    if let Err(e) = result {
        println!("! {e}");
    }
    true
}

fn conversation_at<B>(client: &ChatClient<B, DatabaseStore>, arg: &str) -> Option<String>
where
    B: ChatBackend + 'static,
{
    let index = arg.parse::<usize>().ok()?.checked_sub(1)?;
    client
        .conversations()
        .get(index)
        .map(|conversation| conversation.id.clone())
}

fn print_list<B>(client: &ChatClient<B, DatabaseStore>)
where
    B: ChatBackend + 'static,
{
    let selected = client.selected().map(|c| c.id.as_str());
    for (i, conversation) in client.conversations().iter().enumerate() {
        let marker = if Some(conversation.id.as_str()) == selected {
            "*"
        } else {
            " "
        };
        println!(
            "{marker} {:>2}. {} ({} messages, {})",
            i + 1,
            conversation.title,
            conversation.messages.len(),
            conversation.updated_at.format("%Y-%m-%d %H:%M")
        );
    }
    for (i, attachment) in client.staged().iter().enumerate() {
        println!("  attached {}: {}", i + 1, attachment.name);
    }
}

fn print_history(conversation: &Conversation) {
    println!("--- {} ---", conversation.title);
    for message in &conversation.messages {
        match message.role {
            Role::User => println!("you> {}", message.content),
            Role::Assistant => println!("tutor> {}", message.content),
        }
    }
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

/// Incremental printing of the typing simulation
#[derive(Default)]
struct View {
    /// Text already printed for the message being typed
    printed: String,
}

impl View {
    fn render<B>(&mut self, client: &ChatClient<B, DatabaseStore>, update: ClientUpdate)
    where
        B: ChatBackend + 'static,
    {
        let selected = client.selected().map(|c| c.id.as_str());
        match update {
            ClientUpdate::MessageAppended {
                conversation_id,
                message,
            } if message.role == Role::Assistant => {
                if Some(conversation_id.as_str()) != selected {
                    let title = client
                        .conversation(&conversation_id)
                        .map_or("another conversation", |c| c.title.as_str());
                    println!("\n(reply saved to \"{title}\")");
                } else if message.is_final {
                    println!("\ntutor> {}", message.content);
                } else {
                    print!("\ntutor> ");
                    self.printed.clear();
                }
            }
            ClientUpdate::MessageUpdated {
                conversation_id,
                content,
                is_final,
                ..
            } if Some(conversation_id.as_str()) == selected => {
                match content.strip_prefix(self.printed.as_str()) {
                    Some(delta) => print!("{delta}"),
                    None => print!("\ntutor> {content}"),
                }
                self.printed = content;
                if is_final {
                    println!();
                    self.printed.clear();
                }
                let _ = std::io::stdout().flush();
            }
            ClientUpdate::Note {
                conversation_id,
                text,
            } if Some(conversation_id.as_str()) == selected => {
                println!("[note] {text}");
                prompt();
            }
            _ => {}
        }
    }
}
