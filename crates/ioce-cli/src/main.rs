//! `ioce` - inspect and maintain directories of OpenIOC documents

mod logging;

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use ioce_core::{generate_label, EditorConfig, Ioc, IocList, IoceResult, SchemaVersion};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

fn cli() -> Command {
    let directory = Arg::new("directory")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Directory of documents");

    Command::new("ioce")
        .version(ioce_core::VERSION)
        .about("OpenIOC document directory tool")
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("More log output (-v info, -vv debug)"),
        )
        .subcommand(
            Command::new("scan")
                .about("Load a directory and report every file")
                .arg(directory.clone())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("show")
                .about("Print metadata and indicator trees")
                .arg(directory.clone()),
        )
        .subcommand(
            Command::new("new")
                .about("Create and save a blank document")
                .arg(directory.clone())
                .arg(
                    Arg::new("author")
                        .long("author")
                        .help("Author recorded on the document"),
                )
                .arg(
                    Arg::new("schema")
                        .long("schema")
                        .value_parser(|s: &str| s.parse::<SchemaVersion>())
                        .help("Schema version: 1.0 or 1.1"),
                ),
        )
        .subcommand(
            Command::new("clone")
                .about("Copy a document under a new identifier")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Document to copy"),
                ),
        )
        .subcommand(
            Command::new("normalize")
                .about("Rewrite documents that were missing fields")
                .arg(directory),
        )
}

fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    logging::init_tracing(matches.get_count("verbose"))?;

    let config = load_config(matches.get_one::<PathBuf>("config")).context("loading config")?;

    let output = run(&matches, config)?;
    print!("{output}");
    Ok(())
}

/// Config file when given, defaults otherwise
fn load_config(path: Option<&PathBuf>) -> IoceResult<EditorConfig> {
    match path {
        Some(path) => Ok(EditorConfig::load(path)?),
        None => Ok(EditorConfig::default()),
    }
}

fn run(matches: &ArgMatches, config: EditorConfig) -> anyhow::Result<String> {
    let mut list = IocList::new().with_config(config);

    match matches.subcommand() {
        Some(("scan", args)) => {
            let report = list.open(directory(args))?;
            if args.get_flag("json") {
                Ok(serde_json::to_string_pretty(&report)? + "\n")
            } else {
                let mut out = format!("{report}\n");
                for (path, reason) in report.failures() {
                    writeln!(out, "  skipped {}: {}", path.display(), reason)?;
                }
                Ok(out)
            }
        }
        Some(("show", args)) => {
            list.open(directory(args))?;
            let mut out = String::new();
            for path in list.paths() {
                if let Some(ioc) = list.get(path) {
                    out.push_str(&render_document(path, ioc)?);
                }
            }
            Ok(out)
        }
        Some(("new", args)) => {
            list.open(directory(args))?;
            let author = args
                .get_one::<String>("author")
                .cloned()
                .unwrap_or_else(|| list.config().default_author.clone());
            let version = args
                .get_one::<SchemaVersion>("schema")
                .copied()
                .unwrap_or(list.config().default_schema);

            let path = list.create(&author, version)?;
            list.save(Some(&path))?;
            Ok(format!("{}\n", path.display()))
        }
        Some(("clone", args)) => {
            let file = args
                .get_one::<PathBuf>("file")
                .context("missing file argument")?;
            let file = std::path::absolute(file)?;
            let parent = file
                .parent()
                .with_context(|| format!("{} has no parent directory", file.display()))?;

            list.open(parent)?;
            let copy = list.clone_document(&file)?;
            list.save(Some(&copy))?;
            Ok(format!("{}\n", copy.display()))
        }
        Some(("normalize", args)) => {
            list.open(directory(args))?;
            let repaired: Vec<PathBuf> = list
                .iter()
                .filter(|(_, ioc)| ioc.was_repaired())
                .map(|(path, _)| path.to_path_buf())
                .collect();
            for path in &repaired {
                if let Some(ioc) = list.get_mut(path) {
                    tracing::info!(path = %path.display(), repairs = ?ioc.repairs(), "normalizing");
                    ioc.force_save();
                }
            }

            let report = list.save(None)?;
            let mut out = format!("normalized {} documents\n", report.written.len());
            for path in &report.written {
                writeln!(out, "  {}", path.display())?;
            }
            Ok(out)
        }
        _ => Ok(String::new()),
    }
}

fn directory(args: &ArgMatches) -> &Path {
    args.get_one::<PathBuf>("directory")
        .map_or(Path::new("."), PathBuf::as_path)
}

/// Metadata header and indented label tree of one document
fn render_document(path: &Path, ioc: &Ioc) -> anyhow::Result<String> {
    let mut out = String::new();
    writeln!(out, "{}", path.display())?;
    writeln!(out, "  id:       {}", ioc.identifier())?;
    writeln!(out, "  schema:   {}", ioc.schema_version())?;
    writeln!(out, "  name:     {}", ioc.name())?;
    writeln!(out, "  author:   {}", ioc.author())?;
    writeln!(out, "  modified: {}", ioc.modified_date())?;
    for (depth, node) in ioc.logic_nodes() {
        let label = generate_label(node)?;
        writeln!(
            out,
            "  {:indent$}{} [{}]",
            "",
            label.text.trim_start(),
            label.color.hex(),
            indent = depth * 2
        )?;
    }
    Ok(out)
}
