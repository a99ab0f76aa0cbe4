use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::Serialize;

use petridoc::PndConfig;
use petridoc::layout::layout_net;
use petridoc::net::io::{dot, pnml, to_json_string, write_text};
use petridoc::net::{Document, ObjectId, ObjectVariant, Page};
use petridoc::options::{Options, PndCommand, StatsFormat};
use petridoc::report::{DiagnosticReport, DocumentStats, diagnose_page, log_diagnostics};

#[derive(Serialize)]
struct StatsOutput {
    stats: DocumentStats,
    diagnostics: Vec<DiagnosticReport>,
}

fn read_document(input: &Path) -> Result<(Document, Vec<ObjectId>)> {
    let mut doc = Document::new();
    let nets = pnml::read_file(&mut doc, input)
        .with_context(|| format!("Failed to read PNML document {:?}", input))?;
    log::info!("read {} nets ({} objects) from {:?}", nets.len(), doc.len(), input);
    Ok((doc, nets))
}

fn run(options: Options) -> Result<()> {
    let config = PndConfig::load_from_file(&options.config)?;
    log::debug!("configuration: {:?}", config);

    match options.command {
        PndCommand::Convert { input, output } => {
            let (doc, _) = read_document(&input)?;
            pnml::write_file(&doc, &output)
                .with_context(|| format!("Failed to write {:?}", output))?;
        }
        PndCommand::Dot {
            input,
            output,
            scope,
        } => {
            let (doc, nets) = read_document(&input)?;
            let scope = match scope {
                Some(scope) => ObjectId::from(scope),
                None => nets
                    .first()
                    .cloned()
                    .ok_or_else(|| anyhow!("{:?} contains no net", input))?,
            };
            dot::write_dot(&doc, &scope, &config.dot, &output)
                .with_context(|| format!("Failed to render {scope} to {:?}", output))?;
        }
        PndCommand::Layout { input, output } => {
            let (mut doc, nets) = read_document(&input)?;
            for net in &nets {
                layout_net(&mut doc, net, &config.layout)
                    .with_context(|| format!("Failed to lay out net {net}"))?;
            }
            pnml::write_file(&doc, &output)
                .with_context(|| format!("Failed to write {:?}", output))?;
        }
        PndCommand::Stats {
            input,
            output,
            format,
        } => {
            let (doc, _) = read_document(&input)?;
            let pages: Vec<ObjectId> = doc
                .iter()
                .filter_map(Page::from_object)
                .map(|page| page.id().clone())
                .collect();
            let mut diagnostics = Vec::with_capacity(pages.len());
            for page in &pages {
                let report = diagnose_page(&doc, page)?;
                log_diagnostics(&report);
                diagnostics.push(report);
            }
            let stats = DocumentStats::collect(&doc);
            let rendered = match format {
                StatsFormat::Json => to_json_string(&StatsOutput { stats, diagnostics })?,
                StatsFormat::Text => {
                    let mut text = stats.to_string();
                    for report in &diagnostics {
                        text.push_str("\n\n");
                        text.push_str(report.to_string().trim_end());
                    }
                    text
                }
            };
            match output {
                Some(path) => write_text(&path, &rendered)
                    .with_context(|| format!("Failed to write {:?}", path))?,
                None => println!("{rendered}"),
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    if std::env::var("PND_LOG").is_ok() {
        let e = env_logger::Env::new()
            .filter("PND_LOG")
            .write_style("PND_LOG_STYLE");
        env_logger::init_from_env(e);
    }

    let options = match Options::parse_from_args(std::env::args_os().skip(1)) {
        Ok(options) => options,
        Err(err) => match err.downcast::<clap::Error>() {
            Ok(usage) => usage.exit(),
            Err(err) => return Err(anyhow!("{err}")),
        },
    };
    log::debug!("pnd options: {:?}", options);
    run(options)
}
