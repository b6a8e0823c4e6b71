pub mod assistant;
pub mod auth;
pub mod cli;
pub mod conversation;
pub mod faq;
pub mod models;
pub mod server;
pub mod students;

use assistant::{ diagnostic_message, AssistantClient, AssistantConfig, AssistantError, Unconfigured };
use auth::{ AuthContext, FileSessionStore, UserProfile, UserRole };
use cli::{ join_query, Args, Command, StudentsAction };
use conversation::ChatSession;
use faq::{ FaqConfigError, IntentTable };
use log::{ info, warn };
use serde_json::Value as JsonValue;
use server::{ AppState, Server };
use std::error::Error;
use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use students::{ StudentsClient, DEFAULT_RECORD_IDS };
use tokio::io::{ AsyncBufRead, AsyncBufReadExt, BufReader, Lines };

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    match args.command.clone() {
        Command::Faq { query } => {
            let intents = load_intent_table(&args)?;
            println!("{}", intents.respond(&join_query(&query)));
        }
        Command::Ask { query } => ask_once(&args, &join_query(&query)).await?,
        Command::Chat => run_chat(&args).await?,
        Command::Serve => serve(args).await?,
        Command::Students { action } => run_students(&args, action).await?,
        Command::Login { email, name, google_credential, role } => {
            let role: UserRole = role.parse()?;
            let ctx = auth_context(&args);
            let profile = match google_credential {
                Some(credential) => ctx.login_with_google(&credential, role)?,
                None => ctx.login(UserProfile::new(email.unwrap_or_default(), name, role))?,
            };
            println!("Signed in as {} ({})", profile.email, profile.role);
        }
        Command::Logout => {
            auth_context(&args).logout()?;
            println!("Signed out.");
        }
        Command::Whoami => {
            match auth_context(&args).current().profile() {
                Some(profile) => println!("{}", serde_json::to_string_pretty(profile)?),
                None => println!("Not signed in."),
            }
        }
        Command::Role { role } => {
            let profile = auth_context(&args).switch_role(role.parse()?)?;
            println!("{} now uses the {} dashboard", profile.email, profile.role);
        }
    }

    Ok(())
}

fn load_intent_table(args: &Args) -> Result<IntentTable, FaqConfigError> {
    match &args.faq_path {
        Some(path) => faq::load_intents(path),
        None => Ok(faq::builtin().clone()),
    }
}

fn auth_context(args: &Args) -> AuthContext {
    AuthContext::hydrate(Box::new(FileSessionStore::new(&args.session_path)))
}

/// Remote client for the configured endpoint, or the [`Unconfigured`]
/// stand-in when no endpoint is set.
fn build_assistant(args: &Args) -> Result<Arc<dyn AssistantClient>, AssistantError> {
    match assistant::new_client(&AssistantConfig::from_args(args)) {
        Ok(client) => Ok(client),
        Err(AssistantError::NotConfigured) => {
            warn!("ASSISTANT_URL is not set; assistant requests will fail with a diagnostic.");
            Ok(Arc::new(Unconfigured))
        }
        Err(e) => Err(e),
    }
}

async fn ask_once(args: &Args, query: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
    let query = query.trim();
    if query.is_empty() {
        return Err("question is empty".into());
    }

    let assistant = build_assistant(args)?;
    match assistant.ask(query).await {
        Ok(reply) => println!("{}", reply),
        Err(e) => println!("{}", diagnostic_message(&e, assistant.endpoint())),
    }
    Ok(())
}

/// One line typed at the chat prompt.
#[derive(Debug, PartialEq, Eq)]
enum ChatInput<'a> {
    Quit,
    History,
    Faq(&'a str),
    Ask(&'a str),
}

fn parse_chat_input(line: &str) -> ChatInput<'_> {
    let line = line.trim();
    match line {
        "/quit" => ChatInput::Quit,
        "/history" => ChatInput::History,
        "/faq" => ChatInput::Faq(""),
        _ =>
            match line.strip_prefix("/faq ") {
                Some(question) => ChatInput::Faq(question.trim()),
                None => ChatInput::Ask(line),
            }
    }
}

/// Next prompt line, or `None` at end of input or when `interrupt` fires first.
async fn next_input<R, F>(lines: &mut Lines<R>, interrupt: F) -> std::io::Result<Option<String>>
    where R: AsyncBufRead + Unpin, F: Future<Output = std::io::Result<()>>
{
    tokio::select! {
        line = lines.next_line() => line,
        _ = interrupt => Ok(None),
    }
}

async fn run_chat(args: &Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let intents = load_intent_table(args)?;
    let session = ChatSession::new(build_assistant(args)?);
    info!("Started chat session {}", session.id());

    print!("{}", session.transcript());
    println!("(/faq <question>, /history, /quit; Ctrl-C cancels a pending answer or exits at the prompt)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = match next_input(&mut lines, tokio::signal::ctrl_c()).await? {
            Some(line) => line,
            None => {
                println!();
                break;
            }
        };

        let query = match parse_chat_input(&line) {
            ChatInput::Quit => {
                break;
            }
            ChatInput::History => {
                print!("{}", session.transcript());
                continue;
            }
            ChatInput::Faq(question) => {
                println!("{}", intents.respond(question));
                continue;
            }
            ChatInput::Ask(query) => query,
        };

        let pending = match session.begin(query) {
            Ok(pending) => pending,
            Err(e) => {
                println!("({})", e);
                continue;
            }
        };

        let reply = pending.finish();
        tokio::pin!(reply);
        let outcome = tokio::select! {
            outcome = &mut reply => outcome,
            _ = tokio::signal::ctrl_c() => {
                session.cancel();
                reply.await
            }
        };

        match outcome.message() {
            Some(message) => println!("Assistant: {}", message.content),
            None => println!("(cancelled)"),
        }
    }

    session.cancel();
    info!("Chat session {} ended", session.id());
    Ok(())
}

async fn serve(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("WS Server Address: {}", args.server_addr);
    info!(
        "HTTP API Port: {}",
        args.http_port.map_or_else(|| "disabled".to_string(), |p| p.to_string())
    );
    info!("Assistant Endpoint: {}", args.assistant_url.as_deref().unwrap_or("<unset>"));
    info!("Assistant Timeout: {}s", args.assistant_timeout_secs);
    info!("FAQ Source: {}", args.faq_path.as_deref().unwrap_or("built-in"));
    info!("WS Auth: {}", if args.server_api_key.is_some() { "HMAC" } else { "disabled" });
    info!("WS Rate Limit: {}/s", args.ws_rate_limit);
    info!("-------------------------");

    let state = AppState {
        intents: Arc::new(load_intent_table(&args)?),
        assistant: build_assistant(&args)?,
    };
    let server = Server::new(state, args);
    server.run().await
}

async fn run_students(args: &Args, action: StudentsAction) -> Result<(), Box<dyn Error + Send + Sync>> {
    let client = StudentsClient::from_args(args)?;

    let result = match action {
        StudentsAction::Get { record_id } => client.get(&record_id).await?,
        StudentsAction::List { record_ids } => {
            let ids = if record_ids.is_empty() {
                DEFAULT_RECORD_IDS.iter().map(|id| id.to_string()).collect()
            } else {
                record_ids
            };
            JsonValue::Array(client.list(&ids).await)
        }
        StudentsAction::Add { json } => {
            let student: JsonValue = serde_json::from_str(&json)?;
            client.create(&student).await?
        }
        StudentsAction::Update { record_id, json } => {
            let student: JsonValue = serde_json::from_str(&json)?;
            client.update(&record_id, &student).await?
        }
        StudentsAction::Delete { record_id } => client.delete(&record_id).await?,
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
