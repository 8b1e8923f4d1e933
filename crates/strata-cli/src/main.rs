//! `strata` command-line tool
//!
//! Resolves tier names against a project folder and reads or edits their
//! meta records.

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;
use strata_tier::{Project, ProjectConfig, SetupOptions, Tier};
use tracing_subscriber::EnvFilter;

fn name_arg() -> Arg {
    Arg::new("name")
        .required(true)
        .help("Tier name, e.g. WP1.2a")
}

fn key_arg() -> Arg {
    Arg::new("key").required(true).help("Meta record key")
}

fn cli() -> Command {
    Command::new("strata")
        .version(strata_tier::VERSION)
        .about("Tiered research project folders with JSON meta records")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("project")
                .long("project")
                .short('p')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Project folder (defaults to the current folder)"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML project configuration"),
        )
        .subcommand(
            Command::new("parse")
                .about("Print the identifiers a name addresses")
                .arg(name_arg()),
        )
        .subcommand(
            Command::new("show")
                .about("Print paths, existence and meta record of a tier")
                .arg(name_arg()),
        )
        .subcommand(
            Command::new("get")
                .about("Print one meta value as JSON")
                .arg(name_arg())
                .arg(key_arg()),
        )
        .subcommand(
            Command::new("set")
                .about("Store one meta value")
                .arg(name_arg())
                .arg(key_arg())
                .arg(
                    Arg::new("value")
                        .required(true)
                        .help("JSON value, e.g. '\"text\"' or 42"),
                ),
        )
        .subcommand(
            Command::new("unset")
                .about("Remove one meta value")
                .arg(name_arg())
                .arg(key_arg()),
        )
        .subcommand(
            Command::new("create")
                .about("Create the files of a tier")
                .arg(name_arg())
                .arg(
                    Arg::new("template")
                        .long("template")
                        .value_parser(value_parser!(PathBuf))
                        .help("Template relative to the templates folder"),
                )
                .arg(
                    Arg::new("description")
                        .long("description")
                        .short('d')
                        .help("Initial description"),
                ),
        )
        .subcommand(
            Command::new("ls")
                .about("List existing children of a tier")
                .arg(Arg::new("name").help("Tier name (defaults to Home)"))
                .arg(
                    Arg::new("techniques")
                        .long("techniques")
                        .action(ArgAction::SetTrue)
                        .help("List technique folders instead"),
                ),
        )
        .subcommand(Command::new("init").about("Set up the templates folder and Home"))
}

fn load_project(matches: &ArgMatches) -> Result<Project> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => ProjectConfig::from_toml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ProjectConfig::default(),
    };
    if let Some(folder) = matches.get_one::<PathBuf>("project") {
        config.project_folder.clone_from(folder);
    }
    config.validate().context("invalid configuration")?;
    Project::with_defaults(config).context("registering the default hierarchy")
}

fn print_tier(project: &Project, tier: &Tier) -> Result<()> {
    println!("{tier}");
    println!("  ids:     {}", tier.ids());
    println!("  folder:  {}", tier.folder().display());
    if let Some(file) = tier.file() {
        println!("  file:    {}", file.display());
    }
    if let Some(meta_file) = tier.meta_file() {
        println!("  meta:    {}", meta_file.display());
    }
    println!("  exists:  {}", tier.exists());
    if let Some(parent) = project.parent(tier)? {
        println!("  parent:  {}", parent.name());
    }
    if let Ok(meta) = tier.meta() {
        let record = meta
            .snapshot()
            .with_context(|| format!("reading meta record of {}", tier.name()))?;
        println!("{}", serde_json::to_string_pretty(&record)?);
    }
    Ok(())
}

fn run(matches: &ArgMatches) -> Result<()> {
    let project = load_project(matches)?;
    let resolve = |args: &ArgMatches| -> Result<_> {
        let name = args
            .get_one::<String>("name")
            .map_or_else(|| project.hierarchy().map(|h| h.home_name().to_owned()), |n| Ok(n.clone()))?;
        project
            .resolve(&name)
            .with_context(|| format!("resolving {name:?}"))
    };

    match matches.subcommand() {
        Some(("parse", args)) => {
            let tier = resolve(args)?;
            println!("{}: {} {}", tier.kind().pretty_type(), tier.name(), tier.ids());
        }
        Some(("show", args)) => {
            let tier = resolve(args)?;
            print_tier(&project, &tier)?;
        }
        Some(("get", args)) => {
            let tier = resolve(args)?;
            let key = args.get_one::<String>("key").context("missing key")?;
            let value = tier.meta()?.get(key)?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Some(("set", args)) => {
            let tier = resolve(args)?;
            let key = args.get_one::<String>("key").context("missing key")?;
            let raw = args.get_one::<String>("value").context("missing value")?;
            let value: Value =
                serde_json::from_str(raw).with_context(|| format!("{raw:?} is not JSON"))?;
            tier.meta()?
                .set(key, value)
                .with_context(|| format!("setting {key} on {}", tier.name()))?;
        }
        Some(("unset", args)) => {
            let tier = resolve(args)?;
            let key = args.get_one::<String>("key").context("missing key")?;
            let old = tier.meta()?.delete(key)?;
            println!("{}", serde_json::to_string_pretty(&old)?);
        }
        Some(("create", args)) => {
            let tier = resolve(args)?;
            if let Some(parent) = project.parent(&tier)? {
                if !parent.exists() {
                    bail!("{} does not exist yet, create it first", parent.name());
                }
            }
            let mut options = SetupOptions::new();
            if let Some(template) = args.get_one::<PathBuf>("template") {
                options = options.with_template(template);
            }
            if let Some(text) = args.get_one::<String>("description") {
                options = options.with_meta("description", Value::String(text.clone()));
            }
            project
                .setup_files(&tier, options)
                .with_context(|| format!("creating {}", tier.name()))?;
            println!("created {tier}");
        }
        Some(("ls", args)) => {
            let tier = resolve(args)?;
            if args.get_flag("techniques") {
                for technique in project.techniques(&tier)? {
                    println!("{technique}");
                }
            } else {
                for child in project.children(&tier)? {
                    println!("{}", child.name());
                }
            }
        }
        Some(("init", _)) => {
            let home = project.setup_project().context("setting up project")?;
            println!("project ready at {}", home.folder().display());
        }
        _ => unreachable!("subcommand_required"),
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&cli().get_matches()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn global_project_flag_after_subcommand() {
        let matches = cli()
            .try_get_matches_from(["strata", "show", "WP1", "--project", "/tmp/p"])
            .unwrap();
        assert_eq!(
            matches.get_one::<PathBuf>("project"),
            Some(&PathBuf::from("/tmp/p"))
        );
    }
}
