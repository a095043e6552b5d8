// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;
mod terminal;

use anyhow::{Context, Result, anyhow};
use config::Config;
use runtime::{ApiRuntime, ChannelPrompt};
use std::env;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::thread;
use tracing::info;
use warden_api::{AdminClient, CredentialGuard, RequestGateway};
use warden_app::{ConsoleState, PageState, PollingScheduler};
use warden_console::{Console, InternalEvent};

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let mut config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `warden --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;
    if let Some(base_url) = &options.base_url {
        config.override_base_url(base_url)?;
    }

    logging::init(config.log_level())?;

    let state = ConsoleState::new(PageState::new(config.page_limit()), config.online_minutes());
    let scheduler = PollingScheduler::new(config.live_interval()?, config.overview_interval()?);
    let mut console = Console::new(state, scheduler).with_secret_echo(terminal::secret_echo());

    let guard = CredentialGuard::new(Box::new(ChannelPrompt::new(console.sender())));
    let gateway = RequestGateway::new(
        config.base_url(),
        config.secret_header(),
        config.timeout()?,
        guard,
    )
    .with_context(|| {
        format!(
            "invalid [api] config in {}; fix base_url/secret_header/timeout values",
            options.config_path.display()
        )
    })?;
    if options.check_only {
        return Ok(());
    }

    info!(base_url = %gateway.base_url(), "starting admin console");
    let mut runtime = ApiRuntime::new(AdminClient::new(gateway), config.window_days());
    spawn_input_reader(console.sender())?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    console.run(&mut runtime, &mut out)
}

fn spawn_input_reader(tx: std::sync::mpsc::Sender<InternalEvent>) -> Result<()> {
    thread::Builder::new()
        .name("warden-input".to_owned())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                if tx.send(InternalEvent::Line(line)).is_err() {
                    return;
                }
            }
            let _ = tx.send(InternalEvent::InputClosed);
        })
        .context("spawn input reader")?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    base_url: Option<String>,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        base_url: None,
        print_config_path: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--base-url" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--base-url requires a URL"))?;
                options.base_url = Some(value.as_ref().to_owned());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("warden - admin console for the game backend");
    println!("  --config <path>          Use a specific config path");
    println!("  --base-url <url>         Override [api].base_url");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --check                  Validate config and startup dependencies");
    println!("  --help                   Show this help");
    println!();
    println!("Set WARDEN_LOG (e.g. warden_api=debug) to log to stderr.");
    println!("Type `help` inside the console for its commands.");
}
