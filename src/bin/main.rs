//! Adzan CLI - prayer-time wake scheduler
//!
//! Commands:
//!   adzan serve [--port 8080]                       → HTTP timer service
//!   adzan countdown <label> --in <ms> [--mode live] → run one countdown, print final state
//!   adzan schedule <label> --in <ms> [--deny-exact] → register a wake, wait for the alert
//!   adzan status                                    → config and idle service snapshot
//!
//! Configuration comes from `ADZAN_*` environment variables (and `.env`).
//!
//! Output format:
//!   --json     Output raw JSON (default for non-tty)
//!   --pretty   Pretty-print JSON (default for tty)

use adzan::logging::init_logging;
use adzan::platform::host;
use adzan::{
    event_channel, install_signal_handlers, spawn_event_loop, AdzanConfig, AdzanService, CountdownMode,
    CountdownState, StandbyStrategy,
};
use anyhow::{anyhow, bail, Context};
use serde_json::{json, Value};
use std::env;
use std::io::IsTerminal;
use std::sync::Arc;
use tracing::{debug, info};

fn main() {
    init_logging();

    let args: Vec<String> = env::args().collect();
    let opts = ParsedArgs::parse(&args[1..]);

    if opts.help {
        print_usage();
        return;
    }

    if opts.version {
        println!("adzan {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let result = match opts.command.as_deref() {
        Some("serve") => cmd_serve(&opts),
        Some("countdown") => cmd_countdown(&opts),
        Some("schedule") => cmd_schedule(&opts),
        Some("status") => cmd_status(&opts),
        Some(cmd) => Err(anyhow!("Unknown command: {}", cmd)),
        None => {
            print_usage();
            return;
        }
    };

    let pretty = !opts.json && (opts.pretty || std::io::stdout().is_terminal());
    match result {
        Ok(output) => println!("{}", render(&output, pretty)),
        Err(e) => {
            eprintln!("{}", render(&json!({"error": format!("{:#}", e)}), pretty));
            std::process::exit(1);
        }
    }
}

fn render(value: &Value, pretty: bool) -> String {
    let rendered = if pretty { serde_json::to_string_pretty(value) } else { serde_json::to_string(value) };
    rendered.unwrap_or_else(|_| value.to_string())
}

#[derive(Default)]
struct ParsedArgs {
    command: Option<String>,
    label: Option<String>,
    in_ms: Option<i64>,
    mode: Option<String>,
    deny_exact: bool,
    port: Option<u16>,
    json: bool,
    pretty: bool,
    help: bool,
    version: bool,
}

impl ParsedArgs {
    fn parse(args: &[String]) -> Self {
        // Load .env file if present
        if let Ok(contents) = std::fs::read_to_string(".env") {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    let value = value.trim().trim_matches('"');
                    if !value.is_empty() && env::var(key.trim()).is_err() {
                        env::set_var(key.trim(), value);
                    }
                }
            }
        }

        let mut opts = ParsedArgs::default();
        let mut positional = Vec::new();
        let mut i = 0;

        while i < args.len() {
            let arg = &args[i];
            match arg.as_str() {
                "--help" | "-h" => opts.help = true,
                "--version" | "-V" => opts.version = true,
                "--json" => opts.json = true,
                "--pretty" => opts.pretty = true,
                "--deny-exact" => opts.deny_exact = true,
                "--in" | "-i" => {
                    if i + 1 < args.len() {
                        opts.in_ms = args[i + 1].parse().ok();
                        i += 1;
                    }
                }
                "--mode" | "-m" => {
                    if i + 1 < args.len() {
                        opts.mode = Some(args[i + 1].clone());
                        i += 1;
                    }
                }
                "--port" | "-p" => {
                    if i + 1 < args.len() {
                        opts.port = args[i + 1].parse().ok();
                        i += 1;
                    }
                }
                _ if !arg.starts_with('-') => positional.push(arg.clone()),
                _ => {} // Ignore unknown flags
            }
            i += 1;
        }

        // First positional is command
        if !positional.is_empty() {
            opts.command = Some(positional.remove(0));
        }
        // Rest is the prayer label
        if !positional.is_empty() {
            opts.label = Some(positional.join(" "));
        }

        opts
    }

    fn label(&self) -> &str { self.label.as_deref().unwrap_or("") }

    fn delay_ms(&self) -> anyhow::Result<i64> {
        match self.in_ms {
            Some(ms) if ms >= 0 => Ok(ms),
            Some(ms) => bail!("--in must not be negative (got {})", ms),
            None => bail!("--in <ms> is required"),
        }
    }
}

fn print_usage() {
    println!(
        r#"adzan - prayer-time wake scheduler

USAGE:
    adzan <command> [label] [options]

COMMANDS:
    serve                   Start HTTP timer service
    countdown <label>       Run one countdown and print the final state
    schedule <label>        Register a wake and wait for the alert
    status                  Print config and service snapshot

COUNTDOWN OPTIONS:
    --in, -i <ms>           Milliseconds until the target (required)
    --mode, -m <mode>       live|immediate (default: live)

SCHEDULE OPTIONS:
    --in, -i <ms>           Milliseconds until the target (required)
    --deny-exact            Simulate a revoked exact-alarm permission

SERVER OPTIONS:
    --port, -p <port>       Server port (default: 8080, env: ADZAN_PORT)

OUTPUT OPTIONS:
    --json                  Raw JSON output
    --pretty                Pretty-print JSON
    --version, -V           Print version

ENVIRONMENT:
    ADZAN_TICK_MS               Countdown tick interval (default: 1000)
    ADZAN_CPU_HOLD_MS           CPU hold ceiling on wake (default: 10000)
    ADZAN_DEFAULT_LABEL         Label when none is given (default: Sholat)
    ADZAN_STANDBY               deferred|live (default: deferred)
    ADZAN_LOW_BATTERY_PERCENT   Live countdown disabled at or below (default: 15)
    ADZAN_UTC_OFFSET_MINUTES    Offset for HH:mm rendering (default: local)
    ADZAN_LOG_JSON              1 for JSON log lines
    RUST_LOG                    Log filter (default: info)

HTTP ENDPOINTS:
    GET  /health
    GET  /timer/status
    POST /timer/start           {{"targetTime": <ms>, "prayerName": "Maghrib"}}
    POST /timer/stop
    POST /alarm/fire            {{"targetTime": <ms>, "prayerName": "Maghrib"}}
"#
    );
}

fn load_config() -> anyhow::Result<AdzanConfig> {
    AdzanConfig::from_env().context("Invalid configuration")
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("Failed to create runtime")
}

fn cmd_serve(opts: &ParsedArgs) -> anyhow::Result<Value> {
    let mut config = load_config()?;
    if let Some(port) = opts.port {
        config = config.with_port(port);
    }
    let port = config.port;

    runtime()?.block_on(async {
        let shutdown = install_signal_handlers();
        let (events, rx) = event_channel();
        let (platform, _) = host::in_process(events);
        let service = Arc::new(AdzanService::new(config, platform));
        let event_loop = spawn_event_loop(service.clone(), rx, shutdown.clone());

        let router = adzan::create_router(service);
        let addr = format!("0.0.0.0:{}", port);

        info!("Adzan server listening on http://{}", addr);
        debug!("  GET  /health        - Health check");
        debug!("  GET  /timer/status  - Countdown and wake snapshot");
        debug!("  POST /timer/start   - startTimer");
        debug!("  POST /timer/stop    - stopTimer");

        let listener = tokio::net::TcpListener::bind(&addr).await.context("Failed to bind")?;

        tokio::select! {
            result = axum::serve(listener, router) => {
                result.context("Server error")?;
            }
            _ = shutdown.wait() => {
                info!("Shutdown signal received, stopping server...");
            }
        }

        shutdown.trigger();
        let _ = event_loop.await;
        Ok(json!({"status": "stopped"}))
    })
}

fn cmd_countdown(opts: &ParsedArgs) -> anyhow::Result<Value> {
    let delay = opts.delay_ms()?;
    let mode = match opts.mode.as_deref().unwrap_or("live") {
        "live" => CountdownMode::LiveCountdown,
        "immediate" => CountdownMode::ImmediateFire,
        other => bail!("Unknown mode: {} (expected live|immediate)", other),
    };
    let config = load_config()?;

    runtime()?.block_on(async {
        let shutdown = install_signal_handlers();
        let (events, _rx) = event_channel();
        let (platform, _) = host::in_process(events);
        let target_ms = platform.clock.now_ms().saturating_add(delay);
        let service = AdzanService::new(config, platform);
        let label = match opts.label().trim() {
            "" => service.config().default_label.clone(),
            label => label.to_string(),
        };

        service.coordinator().start(target_ms, &label, mode);

        let mut states = service.coordinator().subscribe();
        tokio::select! {
            _ = states.wait_for(CountdownState::is_terminal) => {}
            _ = shutdown.wait() => {
                service.stop_timer();
            }
        }

        Ok(json!({"mode": mode, "target_ms": target_ms, "state": service.coordinator().state()}))
    })
}

fn cmd_schedule(opts: &ParsedArgs) -> anyhow::Result<Value> {
    let delay = opts.delay_ms()?;
    let config = load_config()?.with_standby(StandbyStrategy::DeferredWake);

    runtime()?.block_on(async {
        let shutdown = install_signal_handlers();
        let (events, rx) = event_channel();
        let (platform, wake_timer) = host::in_process(events);
        wake_timer.set_exact_allowed(!opts.deny_exact);

        let target_ms = platform.clock.now_ms().saturating_add(delay);
        let service = Arc::new(AdzanService::new(config, platform));
        let mut states = service.coordinator().subscribe();
        let event_loop = spawn_event_loop(service.clone(), rx, shutdown.clone());

        let ack = service.start_timer(target_ms, opts.label());
        let pending = service.status().pending_wake;
        info!(?pending, "{}", ack);

        tokio::select! {
            _ = states.wait_for(|s| matches!(s, CountdownState::Reached { .. })) => {}
            _ = shutdown.wait() => {}
        }
        let state = service.coordinator().state();

        shutdown.trigger();
        let _ = event_loop.await;
        Ok(json!({"ack": ack, "wake": pending, "state": state}))
    })
}

fn cmd_status(_opts: &ParsedArgs) -> anyhow::Result<Value> {
    let config = load_config()?;
    let (events, _rx) = event_channel();
    let (platform, _) = host::in_process(events);
    let service = AdzanService::new(config.clone(), platform);

    Ok(json!({
        "config": {
            "tick_interval_ms": config.tick_interval_ms,
            "cpu_hold_max_ms": config.cpu_hold_max_ms,
            "default_label": config.default_label,
            "standby": config.standby.as_str(),
            "low_battery_percent": config.low_battery_percent,
            "utc_offset_minutes": config.utc_offset_minutes,
            "port": config.port,
        },
        "service": service.status(),
    }))
}
