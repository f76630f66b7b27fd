//! `orchestra run` — Pursue goals until the agent finishes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use orchestra_agent::{AgentLoop, build_memory};
use orchestra_config::AppConfig;
use orchestra_core::event::AgentUpdate;
use orchestra_core::human::HumanInput;
use orchestra_core::step::Step;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

/// Human input read line by line from the terminal.
struct StdinHuman {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl StdinHuman {
    fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }
}

#[async_trait]
impl HumanInput for StdinHuman {
    fn name(&self) -> &str {
        "stdin"
    }

    async fn request(&self, question: &str) -> Option<String> {
        println!();
        println!("  Agent asks > {question}");
        println!("  (type 'stop' or 'quit' to end the run)");
        eprint!("  You > ");
        let mut lines = self.lines.lock().await;
        lines.next_line().await.ok().flatten()
    }
}

pub async fn run(
    goals: Vec<String>,
    max_iterations: Option<u32>,
    no_human: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if let Some(max) = max_iterations {
        config.agent.max_iterations = max.max(1);
    }
    if no_human {
        config.agent.human_in_the_loop = false;
    }

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    ORCHESTRA_API_KEY = 'sk-...'");
        eprintln!("    OPENAI_API_KEY    = 'sk-...'");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let model = orchestra_providers::build_model(&config)?;
    let tools = Arc::new(orchestra_tools::default_registry(&config));

    println!();
    println!("  Orchestra");
    println!("  Model:     {}", model.name());
    println!("  Tools:     {}", tools.names().join(", "));
    println!("  Memory:    {}", config.memory.backend);
    for (i, goal) in goals.iter().enumerate() {
        println!("  Goal {}:    {goal}", i + 1);
    }
    println!();

    let agent = Arc::new(
        AgentLoop::builder(model, tools, build_memory(&config))
            .human_input(
                Arc::new(StdinHuman::new()),
                Duration::from_secs(config.agent.human_input_timeout_secs),
            )
            .config(&config)
            .build(),
    );

    let progress = agent.subscribe(print_progress);

    let interrupt = Arc::clone(&agent);
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n  Interrupted, stopping...");
            interrupt.stop(Some("interrupted".into()));
        }
    });

    let result = agent.start(goals, Vec::new()).await;
    ctrl_c.abort();
    progress.unsubscribe();

    let outcome = result?;
    println!();
    match outcome.text() {
        Some(text) => println!("  Result > {text}"),
        None => println!("  Result > (no answer within {} iterations)", config.agent.max_iterations),
    }
    println!();

    Ok(())
}

fn print_progress(update: &AgentUpdate) {
    match update {
        AgentUpdate::ActionStart { iteration, steps } => {
            if let Some(step) = steps.last() {
                println!("  [{iteration}] {}", describe(step));
            }
        }
        AgentUpdate::ActionEnd { iteration, steps } => {
            if let Some(result) = steps.last().and_then(|s| s.result.as_deref()) {
                println!("  [{iteration}] -> {}", first_line(result));
            }
        }
        AgentUpdate::StateChanged { .. } => {}
    }
}

fn describe(step: &Step) -> String {
    let command = &step.parsed.command;
    let thought = step
        .parsed
        .thoughts
        .as_ref()
        .and_then(|t| t.get("text"))
        .and_then(|t| t.as_str());
    match thought {
        Some(text) => format!("{} {} ({text})", command.name, command.display_args()),
        None => format!("{} {}", command.name, command.display_args()),
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}
