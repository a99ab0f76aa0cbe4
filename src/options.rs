//! Parsing Options.
//! `pnd [--config FILE] <convert|dot|layout|stats> INPUT [-o OUTPUT]`

use std::error::Error;
use std::path::PathBuf;

use clap::{Arg, ArgMatches, Command};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PndCommand {
    /// PNML -> PNML，重新规范化输出
    Convert { input: PathBuf, output: PathBuf },
    /// PNML -> DOT；`scope` 缺省为第一个网
    Dot {
        input: PathBuf,
        output: PathBuf,
        scope: Option<String>,
    },
    /// PNML -> 自动布局后的 PNML
    Layout { input: PathBuf, output: PathBuf },
    /// 统计与连通性诊断；无输出路径时打印到标准输出
    Stats {
        input: PathBuf,
        output: Option<PathBuf>,
        format: StatsFormat,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatsFormat {
    #[default]
    Json,
    Text,
}

fn input_arg() -> Arg {
    Arg::new("input")
        .value_name("INPUT")
        .help("PNML document to read")
        .required(true)
}

fn output_arg() -> Arg {
    Arg::new("output")
        .short('o')
        .long("output")
        .value_name("FILE")
        .help("Path to the file that will be written")
}

fn make_options_parser() -> Command {
    Command::new("pnd")
        .no_binary_name(true)
        .version(env!("CARGO_PKG_VERSION"))
        .about("Hierarchical Petri net documents: PNML, DOT and automatic layout")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .global(true)
                .help("TOML configuration file")
                .default_value("pnd.toml"),
        )
        .subcommand(
            Command::new("convert")
                .about("Read a PNML document and write it back out")
                .arg(input_arg())
                .arg(output_arg().required(true)),
        )
        .subcommand(
            Command::new("dot")
                .about("Render a net or page as Graphviz DOT")
                .arg(input_arg())
                .arg(output_arg().default_value("net.dot"))
                .arg(
                    Arg::new("scope")
                        .short('s')
                        .long("scope")
                        .value_name("ID")
                        .help("Net or page to render"),
                ),
        )
        .subcommand(
            Command::new("layout")
                .about("Lay out every page and write the result as PNML")
                .arg(input_arg())
                .arg(output_arg().required(true)),
        )
        .subcommand(
            Command::new("stats")
                .about("Print object counts and connectivity diagnostics")
                .arg(input_arg())
                .arg(output_arg())
                .arg(
                    Arg::new("format")
                        .short('f')
                        .long("format")
                        .help("Report format")
                        .default_value("json")
                        .value_parser(["json", "text"]),
                ),
        )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub config: PathBuf,
    pub command: PndCommand,
}

impl Options {
    pub fn parse_from_args<I, T>(flags: I) -> Result<Self, Box<dyn Error>>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = make_options_parser().try_get_matches_from(flags)?;
        let config = matches
            .get_one::<String>("config")
            .map(PathBuf::from)
            .unwrap_or_default();

        let command = match matches.subcommand() {
            Some(("convert", sub)) => PndCommand::Convert {
                input: path(sub, "input")?,
                output: path(sub, "output")?,
            },
            Some(("dot", sub)) => PndCommand::Dot {
                input: path(sub, "input")?,
                output: path(sub, "output")?,
                scope: sub.get_one::<String>("scope").cloned(),
            },
            Some(("layout", sub)) => PndCommand::Layout {
                input: path(sub, "input")?,
                output: path(sub, "output")?,
            },
            Some(("stats", sub)) => PndCommand::Stats {
                input: path(sub, "input")?,
                output: sub.get_one::<String>("output").map(PathBuf::from),
                format: match sub.get_one::<String>("format").map(String::as_str) {
                    Some("text") => StatsFormat::Text,
                    _ => StatsFormat::Json,
                },
            },
            _ => return Err("UnsupportedCommand")?,
        };
        Ok(Options { config, command })
    }
}

fn path(matches: &ArgMatches, id: &str) -> Result<PathBuf, Box<dyn Error>> {
    matches
        .get_one::<String>(id)
        .map(PathBuf::from)
        .ok_or_else(|| format!("missing argument <{id}>").into())
}
