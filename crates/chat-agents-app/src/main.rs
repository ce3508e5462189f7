use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chat_agents_app::demos::{self, DEFAULT_MODEL};
use chat_agents_app::render::{render_event, render_message};
use chat_agents_app::{SessionController, UiSession};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chat-agents", version, about = "Chat with demo agents from the terminal")]
struct Cli {
    /// Model as `<provider>:<model>`.
    #[arg(long, global = true, env = "CHAT_AGENTS_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Deep agent with filesystem tools; writes and edits need approval.
    DeepAgents {
        #[arg(long, env = "CHAT_AGENTS_ROOT_DIR", default_value = ".")]
        root_dir: PathBuf,
    },
    /// Agent with prompt caching and logging middleware.
    BuiltinMiddleware,
    /// Agent with a closure-based before-model hook.
    CustomMiddleware {
        #[arg(long, env = "CHAT_AGENTS_USER_ID", default_value = "123")]
        user_id: String,
    },
    /// Print the capability profile of a model id.
    ModelProfile { model_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let registry = demos::default_registry();

    let (agent, user_id) = match cli.command {
        Command::ModelProfile { model_id } => {
            let profile = demos::model_profile(&model_id)?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
            return Ok(());
        }
        Command::DeepAgents { root_dir } => {
            let model = registry.init_chat_model(&cli.model)?;
            (demos::deep_agent(model, root_dir)?, None)
        }
        Command::BuiltinMiddleware => {
            let model = registry.init_chat_model(&cli.model)?;
            (demos::builtin_middleware_agent(model)?, None)
        }
        Command::CustomMiddleware { user_id } => {
            let model = registry.init_chat_model(&cli.model)?;
            (demos::custom_middleware_agent(model)?, Some(user_id))
        }
    };

    println!("Agent `{}` ready. Commands: /new, /approve, /history, /quit", agent.name());
    let controller = SessionController::new(Arc::new(agent));
    let mut session = UiSession::new(controller, user_id);
    println!("thread {}", session.thread_id());

    chat_loop(&mut session).await
}

async fn chat_loop(session: &mut UiSession) -> Result<()> {
    let stdin = io::stdin();
    let print = |event: &chat_agents_app::StreamEvent| println!("{}", render_event(event));

    loop {
        print!("{}", if session.show_approve_button() { "review> " } else { "> " });
        io::stdout().flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        let outcome = match input {
            "/quit" | "/exit" => break,
            "/new" => {
                println!("thread {}", session.new_thread());
                Ok(())
            }
            "/history" => session.history().await.map(|messages| {
                for message in &messages {
                    println!("{}", render_message(message));
                }
            }),
            "/approve" => session.approve(print).await,
            text => session.submit(text, print).await,
        };

        if let Err(err) = outcome {
            eprintln!("error: {err}");
            if let Err(err) = session.refresh().await {
                eprintln!("error: {err}");
            }
        }
    }
    Ok(())
}
