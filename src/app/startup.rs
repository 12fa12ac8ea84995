//! Listener startup and main loop

use super::cli::config::resolve_config_path;
use super::cli::Args;
use crate::backend::BackendRegistry;
use crate::config::{self, CoordinatorConfig};
use crate::coordinator::{Coordinator, CoordinatorEvent, CoordinatorResult, Delivery};
use crate::core::error_handling::log_error_with_context;
use crate::core::logging::init_logging;
use crate::core::shutdown;
use clap::Parser;
use colored::Colorize;
use tokio::sync::broadcast;

/// Parse arguments, load configuration and run the listener. Returns the
/// process exit code.
pub async fn startup() -> i32 {
    let mut args = Args::parse();

    let config_path = match resolve_config_path(args.config_file.clone()) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let table = match config::load_table(&config_path).await {
        Ok(table) => table,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    args.apply_toml_values(&table);

    let use_color = args.use_color();
    colored::control::set_override(use_color);
    if let Err(e) = init_logging(
        args.log_level.as_deref(),
        args.log_format.as_deref(),
        args.log_file_path(),
        use_color,
    ) {
        eprintln!("Error: could not initialise logging: {}", e);
        return 1;
    }

    let config = match CoordinatorConfig::from_table(&table) {
        Ok(config) => config,
        Err(e) => {
            log_error_with_context(&e, "Loading configuration");
            return 1;
        }
    };
    log::info!(
        "ddq listener starting (config: {}, backend: {})",
        config_path.display(),
        config.backend
    );

    let registry = BackendRegistry::with_builtin();
    let result =
        shutdown::with_shutdown(|shutdown| run(&config, &registry, &args, shutdown)).await;

    match result {
        Ok(processed) => {
            log::info!("Processed {} messages", processed);
            0
        }
        Err(e) => {
            log_error_with_context(&e, "Running queue listener");
            1
        }
    }
}

/// Open the coordinator, seed messages, acknowledge deliveries until
/// shutdown or the message limit, then close gracefully
pub async fn run(
    config: &CoordinatorConfig,
    registry: &BackendRegistry,
    args: &Args,
    mut shutdown: broadcast::Receiver<()>,
) -> CoordinatorResult<usize> {
    let (coordinator, mut events) = Coordinator::new(config, registry)?;
    coordinator.open().await?;

    for message in &args.send {
        coordinator
            .send_message(message, args.topic.as_deref())
            .await?;
    }
    coordinator.listen_start().await?;

    let mut processed = 0;
    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                log::info!("Shutdown requested, closing queue");
                break;
            }
            event = events.recv() => match event {
                Some(CoordinatorEvent::Data(delivery)) => {
                    println!("{}", format_delivery(&delivery));
                    delivery.ack().await;
                    processed += 1;
                    if args.max_messages.is_some_and(|max| processed >= max) {
                        log::debug!("Message limit reached");
                        break;
                    }
                }
                Some(CoordinatorEvent::Error(e)) => log::warn!("{}", e),
                None => break,
            }
        }
    }

    // Deliveries still queued in the channel hold in-flight slots; dropping
    // them requeues their messages so close can drain.
    drop(events);
    coordinator.close().await?;
    Ok(processed)
}

fn format_delivery(delivery: &Delivery) -> String {
    match delivery.topic() {
        Some(topic) => format!("{} {}", format!("[{}]", topic).as_str().cyan(), delivery.message()),
        None => delivery.message().to_string(),
    }
}
