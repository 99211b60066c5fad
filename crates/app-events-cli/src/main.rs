//! app-events CLI
//!
//! Connects to a native app-events endpoint over a Unix socket or TCP and
//! runs a single operation, or follows the deep-link feed.
//!
//! Usage: app-events [socket-path|host:port] <command> [args]

use anyhow::{Context, Result, anyhow, bail};
use app_events::{AppEvents, CustomEvent, EVENT_CHANNEL, Parameters, attach};
use app_events_bridge::{BridgeConfig, Endpoint, SocketMessenger};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const USAGE: &str = "usage: app-events [socket-path|host:port] <command> [args]

commands:
  version                             native runtime version
  deep-link-url                       last recorded deep link
  init                                initialize the SDK
  activate                            log app activation
  flush                               flush buffered events
  set-user-id <id>
  clear-user-id
  clear-user-data
  log-event <name> [value] [json]     log a custom event
  tracking <on|off>                   advertiser tracking consent
  follow                              print deep links as they arrive";

#[derive(Debug, PartialEq)]
enum Command {
    Version,
    DeepLinkUrl,
    Init,
    Activate,
    Flush,
    SetUserId(String),
    ClearUserId,
    ClearUserData,
    LogEvent(CustomEvent),
    Tracking(bool),
    Follow,
}

impl Command {
    fn parse(args: &[String]) -> Result<Self> {
        let (name, rest) = args.split_first().ok_or_else(|| anyhow!(USAGE))?;
        let arg = |i: usize| {
            rest.get(i)
                .map(String::as_str)
                .ok_or_else(|| anyhow!("{} needs more arguments\n\n{}", name, USAGE))
        };

        let command = match name.as_str() {
            "version" => Command::Version,
            "deep-link-url" => Command::DeepLinkUrl,
            "init" => Command::Init,
            "activate" => Command::Activate,
            "flush" => Command::Flush,
            "set-user-id" => Command::SetUserId(arg(0)?.to_string()),
            "clear-user-id" => Command::ClearUserId,
            "clear-user-data" => Command::ClearUserData,
            "log-event" => {
                let mut event = CustomEvent::new(arg(0)?);
                if let Some(value) = rest.get(1) {
                    event = event.value_to_sum(
                        value
                            .parse()
                            .with_context(|| format!("invalid value to sum: {}", value))?,
                    );
                }
                if let Some(json) = rest.get(2) {
                    let parameters: Parameters = serde_json::from_str(json)
                        .with_context(|| format!("parameters must be a JSON object: {}", json))?;
                    event = event.parameters(parameters);
                }
                Command::LogEvent(event)
            }
            "tracking" => match arg(0)? {
                "on" => Command::Tracking(true),
                "off" => Command::Tracking(false),
                other => bail!("tracking expects on or off, got {}", other),
            },
            "follow" => Command::Follow,
            other => bail!("unknown command: {}\n\n{}", other, USAGE),
        };
        Ok(command)
    }
}

/// Split an optional leading endpoint from the command line
fn split_endpoint(args: &[String]) -> (Option<Endpoint>, &[String]) {
    match args.first() {
        Some(first) if first.contains('/') || first.contains(':') => {
            (Some(Endpoint::parse(first)), &args[1..])
        }
        _ => (None, args),
    }
}

async fn run(events: &AppEvents, command: Command) -> Result<()> {
    match command {
        Command::Version => println!("{}", events.platform_version().await?.unwrap_or_default()),
        Command::DeepLinkUrl => match events.get_deep_link_url().await? {
            Some(url) => println!("{}", url),
            None => println!("(none)"),
        },
        Command::Init => println!("{}", events.initialize_sdk().await?),
        Command::Activate => println!("{}", events.log_activate_app().await?),
        Command::Flush => events.flush().await?,
        Command::SetUserId(id) => events.set_user_id(&id).await?,
        Command::ClearUserId => events.clear_user_id().await?,
        Command::ClearUserData => events.clear_user_data().await?,
        Command::LogEvent(event) => println!("{}", events.log_event(&event).await?),
        Command::Tracking(enabled) => {
            println!("{}", events.set_advertiser_tracking(enabled).await?)
        }
        Command::Follow => {
            let mut links = events.deep_link_feed().await?.listen();
            info!("Following deep links, Ctrl-C to stop");
            loop {
                tokio::select! {
                    link = links.recv() => match link {
                        Some(Ok(url)) => println!("{}", url),
                        Some(Err(e)) => tracing::warn!("Deep-link error: {}", e),
                        None => break,
                    },
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Parse command line arguments
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (endpoint, rest) = split_endpoint(&args);
    let command = Command::parse(rest)?;

    let mut config = BridgeConfig::from_env();
    if let Some(endpoint) = endpoint {
        config = config.with_endpoint(endpoint);
    }

    let messenger = SocketMessenger::connect(&config)
        .await
        .map_err(|e| anyhow!("Failed to connect to native endpoint: {}", e))?;
    let messenger = Arc::new(messenger);
    attach(messenger.clone())?;

    let following = command == Command::Follow;
    let result = run(AppEvents::instance(), command).await;

    if following {
        if let Err(e) = messenger.cancel(EVENT_CHANNEL).await {
            tracing::warn!("Failed to cancel deep-link subscription: {}", e);
        }
    }
    messenger.close().await;
    info!("app-events shutting down");
    result
}
