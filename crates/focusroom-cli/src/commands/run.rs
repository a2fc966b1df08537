use clap::Args;
use focusroom_core::notify::dispatcher_from_config;
use focusroom_core::{Config, Event, SessionType, Technique, TimerController, TimerEngine};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, warn};

const HELP: &str = "commands: start | pause | toggle | reset | work | short | long | \
technique <classic|52_17|flow|90_30> | continue | break | status | quit";

#[derive(Args)]
pub struct RunArgs {
    /// Technique to start with (defaults to config `default_technique`)
    #[arg(long)]
    technique: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Input {
    Start,
    Pause,
    Toggle,
    Reset,
    Switch(SessionType),
    Technique(Technique),
    Flow(bool),
    Status,
    Help,
    Quit,
}

fn parse_input(line: &str) -> Result<Option<Input>, String> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };
    let input = match command {
        "start" | "resume" => Input::Start,
        "pause" => Input::Pause,
        "toggle" | "t" => Input::Toggle,
        "reset" | "r" => Input::Reset,
        "work" | "short" | "long" => Input::Switch(command.parse().map_err(|e| format!("{e}"))?),
        "technique" => {
            let id = words.next().ok_or("usage: technique <id>")?;
            Input::Technique(id.parse().map_err(|e| format!("{e}"))?)
        }
        "continue" | "y" => Input::Flow(true),
        "break" | "n" => Input::Flow(false),
        "status" | "s" => Input::Status,
        "help" | "?" => Input::Help,
        "quit" | "q" | "exit" => Input::Quit,
        other => return Err(format!("unknown command '{other}'")),
    };
    Ok(Some(input))
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let catalog = config.catalog()?;
    let technique = match args.technique {
        Some(id) => id.parse::<Technique>()?,
        None => config.default_technique,
    };

    let dispatcher = dispatcher_from_config(&config.notifications);
    debug!(%technique, notifiers = dispatcher.len(), "starting session");

    let engine = TimerEngine::with_technique(catalog, technique);
    let controller = TimerController::new(engine, dispatcher);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(session(controller))
}

async fn session(controller: TimerController) -> Result<(), Box<dyn std::error::Error>> {
    let mut events = controller.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print_json(&controller.snapshot().await)?;
    eprintln!("{HELP}");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_input(&line) {
                    Ok(Some(Input::Quit)) => break,
                    Ok(Some(input)) => execute(&controller, input).await?,
                    Ok(None) => {}
                    Err(message) => eprintln!("{message}"),
                }
                drain(&mut events)?;
            }
            received = events.recv() => match received {
                Ok(event) => print_event(&event)?,
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event output lagged"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    controller.shutdown().await;
    Ok(())
}

async fn execute(
    controller: &TimerController,
    input: Input,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = match input {
        Input::Start => controller.start().await.map(drop),
        Input::Pause => {
            controller.pause().await;
            Ok(())
        }
        Input::Toggle => controller.toggle_running().await.map(drop),
        Input::Reset => {
            controller.reset().await;
            Ok(())
        }
        Input::Switch(session_type) => {
            controller.switch_session_type(session_type).await;
            Ok(())
        }
        Input::Technique(technique) => {
            controller.switch_technique(technique).await;
            Ok(())
        }
        Input::Flow(continue_in_flow) => controller
            .resolve_flow_choice(continue_in_flow)
            .await
            .map(drop),
        Input::Status => {
            print_json(&controller.snapshot().await)?;
            Ok(())
        }
        Input::Help => {
            eprintln!("{HELP}");
            Ok(())
        }
        Input::Quit => Ok(()),
    };

    if let Err(e) = result {
        eprintln!("rejected: {e}");
    }
    Ok(())
}

/// Print whatever the last command published before reading more input.
fn drain(events: &mut broadcast::Receiver<Event>) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        match events.try_recv() {
            Ok(event) => print_event(&event)?,
            Err(TryRecvError::Lagged(skipped)) => warn!(skipped, "event output lagged"),
            Err(TryRecvError::Empty | TryRecvError::Closed) => return Ok(()),
        }
    }
}

fn print_event(event: &Event) -> Result<(), Box<dyn std::error::Error>> {
    print_json(event)?;
    if let Event::FlowDecisionRequested { .. } = event {
        eprintln!("In the flow? Type 'continue' to keep working or 'break' to rest.");
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}
