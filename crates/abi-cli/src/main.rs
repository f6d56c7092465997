// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `abi-cli`: name codec, JSON ⇄ binary conversion and schema inspection.

mod config;

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use abi_core::{
    abi_bin_to_json, abi_json_to_bin, load_schema, ConversionMode, Name, ResolvedAbi,
    SchemaSource, TypeIndex,
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use comfy_table::Table;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{
    open_store, CliPrefs, ConfigError, ConfigService, ConfigStore, FsConfigStore, PREFS_KEY,
};

#[derive(Parser, Debug)]
#[command(name = "abi-cli", version, about = "Convert contract data between JSON and binary")]
struct Cli {
    /// Preferences file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log at debug level regardless of RUST_LOG
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode or decode a 64-bit name
    Name {
        #[command(subcommand)]
        op: NameOp,
    },
    /// Encode a JSON value as hex
    JsonToBin {
        #[command(flatten)]
        target: Target,
        /// Accept struct keys in any order
        #[arg(long)]
        reorderable: bool,
        /// JSON text, or `-` for stdin
        json: String,
    },
    /// Decode hex into JSON
    BinToJson {
        #[command(flatten)]
        target: Target,
        /// Hex bytes, or `-` for stdin
        hex: String,
    },
    /// Convert a JSON schema document to hex
    AbiToBin {
        /// Schema document (JSON)
        file: PathBuf,
    },
    /// Convert a binary schema document to JSON
    AbiToJson {
        /// Schema document (binary)
        file: PathBuf,
    },
    /// List the messages a schema declares
    Inspect {
        /// Schema document (JSON or binary)
        #[arg(long)]
        abi: PathBuf,
    },
    /// Show or save preferences
    Config {
        #[command(subcommand)]
        op: ConfigOp,
    },
}

#[derive(Subcommand, Debug)]
enum NameOp {
    /// Text to decimal u64
    Encode { text: String },
    /// Decimal u64 to text
    Decode { value: u64 },
}

#[derive(Subcommand, Debug)]
enum ConfigOp {
    /// Print the effective preferences
    Show,
    /// Update and persist preferences
    Save {
        /// Default struct key matching
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        /// Log filter used when RUST_LOG is unset
        #[arg(long)]
        log_filter: Option<String>,
        /// Pretty-print JSON output
        #[arg(long)]
        pretty: Option<bool>,
    },
}

#[derive(Args, Debug)]
struct Target {
    /// Schema document (JSON or binary)
    #[arg(long)]
    abi: PathBuf,
    /// Type, action, table or action name, per --kind
    #[arg(long = "type")]
    type_name: String,
    /// What --type names
    #[arg(long, value_enum, default_value_t = Kind::Type)]
    kind: Kind,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    Type,
    Action,
    Table,
    ActionResult,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ModeArg {
    Strict,
    Reorderable,
}

impl From<ModeArg> for ConversionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Strict => Self::Strict,
            ModeArg::Reorderable => Self::Reorderable,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let service = open_store(cli.config.as_deref()).map(ConfigService::new);
    let loaded = service
        .as_ref()
        .map_err(ToString::to_string)
        .and_then(|s| s.load::<CliPrefs>(PREFS_KEY).map_err(|e| e.to_string()));
    let prefs = match &loaded {
        Ok(Some(prefs)) => prefs.clone(),
        _ => CliPrefs::default(),
    };
    init_tracing(&prefs, cli.verbose);
    if let Err(err) = &loaded {
        warn!(%err, "preferences not loaded, using defaults");
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(cli.command, prefs, service, &mut out)
}

fn init_tracing(prefs: &CliPrefs, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&prefs.log_filter))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(
    command: Command,
    prefs: CliPrefs,
    service: Result<ConfigService<FsConfigStore>, ConfigError>,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        Command::Name { op: NameOp::Encode { text } } => {
            let name = Name::encode(&text).with_context(|| format!("encode name {text:?}"))?;
            writeln!(out, "{}", name.as_u64())?;
        }
        Command::Name { op: NameOp::Decode { value } } => {
            writeln!(out, "{}", Name::new(value))?;
        }
        Command::JsonToBin {
            target,
            reorderable,
            json,
        } => {
            let abi = load_abi(&target.abi)?;
            let ty = target_type(&abi, &target)?;
            let json = read_arg(&json)?;
            let mode = if reorderable {
                ConversionMode::Reorderable
            } else {
                prefs.default_mode
            };
            debug!(?mode, kind = ?target.kind, "json-to-bin");
            let bytes = abi.json_to_bin(ty, &json, mode)?;
            writeln!(out, "{}", hex::encode(bytes))?;
        }
        Command::BinToJson { target, hex: input } => {
            let abi = load_abi(&target.abi)?;
            let ty = target_type(&abi, &target)?;
            let bytes = decode_hex(&read_arg(&input)?)?;
            let value = abi.bin_to_json_value(ty, &bytes)?;
            write_json(out, &value, prefs.pretty)?;
        }
        Command::AbiToBin { file } => {
            let text = fs::read_to_string(&file)
                .with_context(|| format!("read {}", file.display()))?;
            writeln!(out, "{}", hex::encode(abi_json_to_bin(&text)?))?;
        }
        Command::AbiToJson { file } => {
            let bytes = fs::read(&file).with_context(|| format!("read {}", file.display()))?;
            let value: serde_json::Value = serde_json::from_str(&abi_bin_to_json(&bytes)?)?;
            write_json(out, &value, prefs.pretty)?;
        }
        Command::Inspect { abi } => {
            let resolved = load_abi(&abi)?;
            writeln!(out, "version: {}", resolved.version())?;
            writeln!(out, "{}", message_table(&resolved))?;
        }
        Command::Config { op } => {
            let service = service.context("open preferences store")?;
            run_config(op, prefs, &service, out)?;
        }
    }
    Ok(())
}

fn run_config<S: ConfigStore>(
    op: ConfigOp,
    mut prefs: CliPrefs,
    service: &ConfigService<S>,
    out: &mut impl Write,
) -> Result<()> {
    if let ConfigOp::Save {
        mode,
        log_filter,
        pretty,
    } = op
    {
        if let Some(mode) = mode {
            prefs.default_mode = mode.into();
        }
        if let Some(filter) = log_filter {
            prefs.log_filter = filter;
        }
        if let Some(pretty) = pretty {
            prefs.pretty = pretty;
        }
        service.save(PREFS_KEY, &prefs).context("save preferences")?;
    }
    writeln!(out, "{}", serde_json::to_string_pretty(&prefs)?)?;
    Ok(())
}

fn load_abi(path: &Path) -> Result<ResolvedAbi> {
    let raw = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let is_json = raw
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'{');
    let source = if is_json {
        let text = std::str::from_utf8(&raw)
            .with_context(|| format!("{} is not utf-8", path.display()))?;
        load_schema(SchemaSource::Json(text))
    } else {
        load_schema(SchemaSource::Binary(&raw))
    };
    source.with_context(|| format!("load schema {}", path.display()))
}

fn target_type(abi: &ResolvedAbi, target: &Target) -> Result<TypeIndex> {
    let name = || {
        Name::encode(&target.type_name)
            .with_context(|| format!("{:?} is not a valid message name", target.type_name))
    };
    let ty = match target.kind {
        Kind::Type => abi.get_type(&target.type_name)?,
        Kind::Action => abi.get_action_type(name()?)?,
        Kind::Table => abi.get_table_type(name()?)?,
        Kind::ActionResult => abi.get_action_result_type(name()?)?,
    };
    Ok(ty)
}

fn read_arg(arg: &str) -> Result<String> {
    if arg != "-" {
        return Ok(arg.to_string());
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf).context("read stdin")?;
    Ok(buf)
}

fn decode_hex(text: &str) -> Result<Vec<u8>> {
    let trimmed = text.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex::decode(digits).context("input is not hex")
}

fn write_json(out: &mut impl Write, value: &serde_json::Value, pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    writeln!(out, "{text}")?;
    Ok(())
}

fn message_table(abi: &ResolvedAbi) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Kind", "Name", "Type"]);
    let groups = [
        ("action", abi.actions()),
        ("table", abi.tables()),
        ("action result", abi.action_results()),
    ];
    for (kind, entries) in groups {
        for (name, message) in entries {
            table.add_row(vec![kind.to_string(), name.to_string(), message.type_name.clone()]);
        }
    }
    table
}
