//! modbind command line

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use modbind_core::prelude::*;
use modbind_oslc::{Credentials, HttpRmService};
use modbind_structure::WireForm;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

const POSITIONALS: [(&str, &str); 9] = [
    ("type", "Artifact type, the title of a creation shape (e.g. Requirement, Heading)"),
    ("title", "Artifact title, also used as its primary text"),
    ("folder", "Folder path, '/' for the root folder"),
    ("project", "Project area name"),
    ("component", "Component name"),
    ("configuration", "Stream or baseline name"),
    ("module", "Module identifier (digits) or title"),
    ("user", "User name"),
    ("password", "Password"),
];

fn cli() -> Command {
    let mut command = Command::new("modbind")
        .version(modbind_core::VERSION)
        .about("Create a requirement or heading and bind it into a module")
        .arg(
            Arg::new("config")
                .long("config")
                .value_parser(value_parser!(PathBuf))
                .help("Configuration file (default: ./modbind.toml when present)"),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .help("Server base URL, e.g. https://jazz.example.com:9443"),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .value_parser(value_parser!(WireForm))
                .help("Structure wire form: markup or flat-list"),
        )
        .arg(
            Arg::new("outline")
                .long("outline")
                .action(ArgAction::SetTrue)
                .help("Print the numbered module outline after the identifier"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Debug logging"),
        );
    for (index, (name, help)) in POSITIONALS.into_iter().enumerate() {
        command = command.arg(Arg::new(name).index(index + 1).required(true).help(help));
    }
    command
}

fn positional<'a>(matches: &'a ArgMatches, name: &str) -> &'a str {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .unwrap_or_default()
}

fn load_config(matches: &ArgMatches) -> Result<BinderConfig> {
    let path = matches.get_one::<PathBuf>("config");
    let mut config = BinderConfig::load(path.map(PathBuf::as_path))
        .and_then(BinderConfig::apply_env)
        .context("loading configuration")?;
    if let Some(host) = matches.get_one::<String>("host") {
        config = config.with_host(host.as_str());
    }
    if let Some(form) = matches.get_one::<WireForm>("format") {
        config = config.with_wire_form(*form);
    }
    if matches.get_flag("verbose") {
        config = config.with_log_filter("debug");
    }
    Ok(config)
}

fn init_tracing(config: &BinderConfig, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(&config.log_filter)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn bind_request(matches: &ArgMatches) -> BindRequest {
    BindRequest {
        target: Target::new(
            positional(matches, "project"),
            positional(matches, "component"),
            positional(matches, "configuration"),
        ),
        artifact: ArtifactRequest::new(
            positional(matches, "type"),
            positional(matches, "title"),
            positional(matches, "folder"),
        ),
        module: ModuleSelector::parse(positional(matches, "module")),
    }
}

/// Identifier of the new artifact and, when requested, the described outline
async fn run(matches: &ArgMatches, config: &BinderConfig) -> Result<(String, Option<Outline>)> {
    config.validate()?;
    let credentials = Credentials::new(
        positional(matches, "user"),
        positional(matches, "password"),
    );
    let service = HttpRmService::connect(config.server.clone(), credentials).await?;
    debug!(host = %config.server.host, form = %config.structure.wire_form, "connected");

    let report = CreateAndBind::new(&service, config)
        .run(&bind_request(matches))
        .await?;

    info!(identifier = %report.artifact.identifier, "created and bound");

    let outline = if matches.get_flag("outline") {
        let mut outline = report.outline;
        outline.describe(&service, &report.context).await?;
        Some(outline)
    } else {
        None
    };
    Ok((report.artifact.identifier, outline))
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli().get_matches();
    let config = match load_config(&matches) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("modbind: {err:#}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config, matches.get_flag("verbose"));

    match run(&matches, &config).await {
        Ok((identifier, outline)) => {
            println!("{identifier}");
            if let Some(outline) = outline {
                print!("{outline}");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            let kind = err.downcast_ref::<BindError>().map(BindError::kind);
            error!(?kind, "{err:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARGS: [&str; 10] = [
        "modbind",
        "Requirement",
        "Brake pressure",
        "/Specs/Brakes",
        "Demo Project",
        "Demo Component",
        "Demo Stream",
        "1234",
        "alice",
        "secret",
    ];

    #[test]
    fn command_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn nine_positionals() {
        let matches = cli().try_get_matches_from(ARGS).unwrap();
        let request = bind_request(&matches);
        assert_eq!(request.artifact.artifact_type, "Requirement");
        assert_eq!(request.artifact.title, "Brake pressure");
        assert_eq!(request.artifact.folder, "/Specs/Brakes");
        assert_eq!(request.target.configuration, "Demo Stream");
        assert_eq!(request.module, ModuleSelector::Identifier("1234".into()));
        assert_eq!(positional(&matches, "password"), "secret");
    }

    #[test]
    fn missing_or_extra_arguments_are_usage_errors() {
        assert!(cli().try_get_matches_from(ARGS[..9].iter().copied()).is_err());
        let mut extra = ARGS.to_vec();
        extra.push("surplus");
        assert!(cli().try_get_matches_from(extra).is_err());
    }

    #[test]
    fn flags_override_config() {
        let mut args = ARGS.to_vec();
        args.extend(["--host", "https://dng.example.com", "--format", "flat-list"]);
        let matches = cli().try_get_matches_from(args).unwrap();
        let config = load_config(&matches).unwrap();
        assert_eq!(config.server.host, "https://dng.example.com");
        assert_eq!(config.structure.wire_form, WireForm::FlatList);
    }

    #[test]
    fn unknown_format_is_rejected() {
        let mut args = ARGS.to_vec();
        args.extend(["--format", "yaml"]);
        assert!(cli().try_get_matches_from(args).is_err());
    }

    #[test]
    fn outline_flag_is_off_by_default() {
        let matches = cli().try_get_matches_from(ARGS).unwrap();
        assert!(!matches.get_flag("outline"));

        let mut args = ARGS.to_vec();
        args.push("--outline");
        let matches = cli().try_get_matches_from(args).unwrap();
        assert!(matches.get_flag("outline"));
    }
}
