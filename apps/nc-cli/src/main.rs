use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand};
use nc_app::{ActuatorCommand, AppResult, ControllerConfig, Supervisor, TickReport};
use nc_link::{HttpLink, PlantLink};
use tracing::Level;

#[derive(Parser)]
#[command(name = "nc-cli")]
#[command(about = "Nucleares controller - closed-loop reactor control", long_about = None)]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the control loop until an unrecoverable error
    Run {
        /// Path to a YAML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Override the plant web server host
        #[arg(long)]
        host: Option<String>,
        /// Override the plant web server port
        #[arg(long)]
        port: Option<u16>,
        /// Print one JSON object per tick instead of a status line
        #[arg(long)]
        json: bool,
    },
    /// Read a few variables once to check the plant is reachable
    Probe {
        /// Path to a YAML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Print the readings as a JSON object
        #[arg(long)]
        json: bool,
    },
    /// Validate a configuration file
    CheckConfig {
        /// Path to the YAML configuration file
        path: PathBuf,
    },
    /// Print the built-in configuration as YAML
    DefaultConfig,
}

fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let level = match (cli.quiet, cli.verbose) {
        (true, _) => Level::WARN,
        (false, 0) => Level::INFO,
        (false, 1) => Level::DEBUG,
        (false, _) => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            config,
            host,
            port,
            json,
        } => cmd_run(config.as_deref(), host, port, json),
        Commands::Probe { config, json } => cmd_probe(config.as_deref(), json),
        Commands::CheckConfig { path } => cmd_check_config(&path),
        Commands::DefaultConfig => cmd_default_config(),
    }
}

fn load_config(path: Option<&Path>) -> AppResult<ControllerConfig> {
    match path {
        Some(path) => ControllerConfig::load(path),
        None => Ok(ControllerConfig::default()),
    }
}

fn connect(config: &ControllerConfig) -> HttpLink {
    HttpLink::new(config.endpoint.host.clone(), config.endpoint.port)
        .with_timeout(config.endpoint.timeout())
}

fn cmd_run(
    config_path: Option<&Path>,
    host: Option<String>,
    port: Option<u16>,
    json: bool,
) -> AppResult<()> {
    let mut config = load_config(config_path)?;
    if let Some(host) = host {
        config.endpoint.host = host;
    }
    if let Some(port) = port {
        config.endpoint.port = port;
    }
    config.validate()?;

    tracing::info!(
        endpoint = %connect(&config).address(),
        power_tracking = config.power_tracking.is_some(),
        "starting controller"
    );

    let endpoint = config.clone();
    let mut supervisor = Supervisor::new(config, move || connect(&endpoint));
    supervisor.run(|report| {
        if json {
            match serde_json::to_string(report) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::error!(error = %e, "failed to encode tick report"),
            }
        } else {
            println!("{}", status_line(report));
        }
    })
}

fn cmd_probe(config_path: Option<&Path>, json: bool) -> AppResult<()> {
    let config = load_config(config_path)?;
    let mut link = connect(&config);

    let names = &config.variables;
    let mut variables = vec![&names.timestamp, &names.operation_mode];
    variables.extend(config.observed.iter());

    let mut readings = BTreeMap::new();
    for variable in variables {
        readings.insert(variable.as_str(), link.read(variable)?);
    }

    if json {
        match serde_json::to_string_pretty(&readings) {
            Ok(text) => println!("{text}"),
            Err(e) => tracing::error!(error = %e, "failed to encode readings"),
        }
        return Ok(());
    }

    println!("Plant at {}:", link.address());
    let width = readings.keys().map(|name| name.len()).max().unwrap_or(0);
    for (variable, value) in &readings {
        println!("  {variable:<width$}  {value}");
    }
    println!("✓ Plant is reachable");
    Ok(())
}

fn cmd_check_config(path: &Path) -> AppResult<()> {
    println!("Validating configuration: {}", path.display());
    let config = ControllerConfig::load(path)?;
    println!("✓ Configuration is valid");
    println!(
        "  {} secondary loops, power tracking {}",
        config.variables.secondary_loops.len(),
        if config.power_tracking.is_some() { "on" } else { "off" }
    );
    Ok(())
}

fn cmd_default_config() -> AppResult<()> {
    print!("{}", ControllerConfig::default().to_yaml()?);
    Ok(())
}

fn status_line(report: &TickReport) -> String {
    let mut line = format!(
        "t={} mode={} core={:.1}/{:.1} crit={:+.3}",
        report.timestamp,
        report.mode,
        report.core_temperature,
        report.core_target,
        report.criticality
    );
    if report.limited {
        line.push_str(" LIMITED");
    }
    if report.transition {
        line.push_str(" (mode change)");
    }
    for (variable, command) in &report.commands {
        match command {
            ActuatorCommand::Level(value) => line.push_str(&format!(" {variable}={value:.1}")),
            ActuatorCommand::Switch(on) => line.push_str(&format!(" {variable}={on}")),
        }
    }
    line
}
