use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{error::ErrorKind, CommandFactory, Parser};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::cli::args::{CliArgs, Command, SearchArgs};
use crate::cli::validation;
use crate::client::{ClientConfig, QueryClient, DEFAULT_TIMEOUT_SECONDS};
use crate::config::{self, ConfigFile};
use crate::filter::{FilterParams, SearchForm};
use crate::logging::{self, LogSink};
use crate::output::{self, OutputFormat, PageContext};
use crate::rows::{RecordId, RowSet};
use crate::tui::{self, BrowseConfig};
use crate::view::{self, DEFAULT_DETAIL_PAGE};

const DEFAULT_WORKERS: usize = 2;

fn format_kv_line(label: &str, value: &str) {
    eprintln!("{} {:<10}: {}", "::".bright_blue(), label, value);
}

fn render_custom_help() -> String {
    let cmd = CliArgs::command();
    let mut out = String::new();

    out.push_str(cmd.get_name());
    if let Some(version) = cmd.get_version() {
        out.push(' ');
        out.push_str(version);
    }
    out.push('\n');
    if let Some(about) = cmd.get_about() {
        out.push_str(&about.to_string());
        out.push('\n');
    }
    if let Some(long_about) = cmd.get_long_about() {
        out.push('\n');
        out.push_str(&long_about.to_string());
        out.push('\n');
    }

    out.push('\n');
    out.push_str("Usage: ");
    out.push_str(cmd.get_name());
    out.push_str(" [OPTIONS] [COMMAND]\n\nCommands:\n");
    for sub in cmd.get_subcommands() {
        let about = sub.get_about().map(|a| a.to_string()).unwrap_or_default();
        out.push_str(&format!("  {:<12}{}\n", sub.get_name(), about));
    }
    out.push('\n');

    let mut sections: Vec<(String, Vec<&clap::Arg>)> = Vec::new();
    let mut section_idx: HashMap<String, usize> = HashMap::new();
    for arg in cmd.get_arguments() {
        if arg.is_hide_set() {
            continue;
        }
        let heading = arg.get_help_heading().unwrap_or("Options").to_string();
        let idx = *section_idx.entry(heading.clone()).or_insert_with(|| {
            sections.push((heading, Vec::new()));
            sections.len() - 1
        });
        sections[idx].1.push(arg);
    }

    for (heading, args) in sections {
        out.push_str(&heading);
        out.push_str(":\n");
        for arg in args {
            let mut parts: Vec<String> = Vec::new();
            if let Some(short) = arg.get_short() {
                parts.push(format!("-{short}"));
            }
            if let Some(long) = arg.get_long() {
                parts.push(format!("--{long}"));
            }
            for alias in arg.get_visible_aliases().unwrap_or_default() {
                let rendered = format!("--{alias}");
                if !parts.contains(&rendered) {
                    parts.push(rendered);
                }
            }
            let mut flags = parts.join(", ");
            if arg.get_action().takes_values() {
                let value_name = arg
                    .get_value_names()
                    .and_then(|names| names.first())
                    .map(|name| name.as_str())
                    .unwrap_or("VALUE");
                flags.push_str(&format!(" <{value_name}>"));
            }
            out.push_str("  ");
            out.push_str(&flags);
            out.push('\n');
            if let Some(help) = arg.get_help() {
                let help = help.to_string();
                if !help.trim().is_empty() {
                    out.push_str("          ");
                    out.push_str(help.trim());
                    out.push('\n');
                }
            }
            out.push('\n');
        }
    }
    out
}

#[derive(Clone, Debug)]
struct RunConfig {
    client: ClientConfig,
    workers: usize,
    output: Option<String>,
    output_format: Option<OutputFormat>,
    detail_page: String,
    no_color: bool,
    verbose: u8,
    log_level: Option<String>,
    log_file: Option<String>,
    command: Command,
}

impl RunConfig {
    fn page_context(&self, filter: &FilterParams) -> PageContext {
        PageContext {
            url: self.client.base_url.clone(),
            database: self.client.database.clone(),
            detail_page: self.detail_page.clone(),
            filter: filter.to_query_string(),
        }
    }

    fn format_for_output(&self) -> OutputFormat {
        self.output_format
            .or_else(|| self.output.as_deref().and_then(output::infer_format_from_path))
            .unwrap_or(OutputFormat::Text)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let no_color = if args.color {
        false
    } else {
        args.no_color || cfg.no_color.unwrap_or(false)
    };

    let url = non_empty(args.url.or(cfg.url))
        .ok_or_else(|| "no API url given (use --url or set url in the config)".to_string())?;
    let database = non_empty(args.database.or(cfg.database)).ok_or_else(|| {
        "no database given (use --database or set database in the config)".to_string()
    })?;
    let timeout = args
        .timeout
        .or(cfg.timeout)
        .unwrap_or(DEFAULT_TIMEOUT_SECONDS);
    let workers = args.workers.or(cfg.workers).unwrap_or(DEFAULT_WORKERS);
    if workers == 0 {
        return Err("invalid workers, expected positive integer".to_string());
    }

    let output_format_raw = non_empty(args.output_format.or(cfg.output_format));
    let output_format = match output_format_raw.as_deref() {
        Some(raw) => Some(
            OutputFormat::parse(raw)
                .ok_or_else(|| format!("invalid output format '{raw}', expected text, json or html"))?,
        ),
        None => None,
    };

    let client = ClientConfig {
        base_url: url,
        database,
        timeout_seconds: timeout,
        proxy: non_empty(args.proxy.or(cfg.proxy)),
        header: non_empty(args.header.or(cfg.header)),
    };

    Ok(RunConfig {
        client,
        workers,
        output: non_empty(args.output.or(cfg.output)).map(|p| config::expand_tilde_string(&p)),
        output_format,
        detail_page: non_empty(args.detail_page.or(cfg.detail_page))
            .unwrap_or_else(|| DEFAULT_DETAIL_PAGE.to_string()),
        no_color,
        verbose: args.verbose,
        log_level: non_empty(cfg.log_level),
        log_file: non_empty(args.log_file.or(cfg.log_file)).map(|p| config::expand_tilde_string(&p)),
        command: args
            .command
            .unwrap_or_else(|| Command::Browse(SearchArgs::default())),
    })
}

fn spinner(message: &str) -> Result<ProgressBar, String> {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_style(
        ProgressStyle::with_template(":: {spinner} {msg} :: [{elapsed_precise}]")
            .map_err(|e| format!("failed to build progress bar style: {e}"))?,
    );
    pb.set_message(message.to_string());
    Ok(pb)
}

/// Validated form fields plus the raw query, as sent with `op=search`.
fn search_params(search: &SearchArgs) -> Result<FilterParams, String> {
    let form = validation::search_form(search);
    form.validate().map_err(|e| format!("invalid search: {e}"))?;
    let mut params = form.to_params();
    if let Some(raw) = search.query.as_deref() {
        params.extend(FilterParams::parse(raw));
    }
    Ok(params)
}

async fn write_rendered(run: &RunConfig, rendered: &[u8]) -> Result<(), String> {
    match run.output.as_deref() {
        Some(path) => {
            let mut outfile = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)
                .await
                .map_err(|e| format!("failed to open output file: {e}"))?;
            outfile
                .write_all(rendered)
                .await
                .map_err(|e| format!("failed to write output file: {e}"))?;
            format_kv_line("Output", path);
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout
                .write_all(rendered)
                .await
                .map_err(|e| format!("failed to write to stdout: {e}"))?;
            stdout
                .flush()
                .await
                .map_err(|e| format!("failed to write to stdout: {e}"))?;
        }
    }
    Ok(())
}

async fn list_rows(run: &RunConfig, client: &QueryClient, filter: &FilterParams) -> Result<(), String> {
    let pb = spinner("searching")?;
    let rows: Result<RowSet, String> = view::refresh(client, filter)
        .await
        .map_err(|e| e.to_string());
    pb.finish_and_clear();
    let rows = rows?;

    format_kv_line("Rows", &rows.len().to_string());
    let rendered = output::render(run.format_for_output(), &rows, &run.page_context(filter));
    write_rendered(run, &rendered).await
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    let now = Instant::now();
    let client = QueryClient::new(run.client.clone()).map_err(|e| e.to_string())?;

    format_kv_line("Url", client.base_url().as_str());
    format_kv_line("Database", client.database());

    match run.command.clone() {
        Command::List(search) => {
            let filter = search_params(&search)?;
            if !filter.is_empty() {
                format_kv_line("Filter", &filter.to_query_string());
            }
            list_rows(&run, &client, &filter).await?;
        }
        Command::Show { id } => {
            let id = RecordId::new(id.trim());
            let pb = spinner("fetching record")?;
            let record = client.fetch_record(&id).await.map_err(|e| e.to_string());
            pb.finish_and_clear();
            let record = record?.ok_or_else(|| format!("record {id} not found"))?;
            format_kv_line("Record", id.as_str());
            let rendered = match run.format_for_output() {
                OutputFormat::Json => output::render_record_json(&record),
                _ => output::render_record_text(&record),
            };
            write_rendered(&run, &rendered).await?;
        }
        Command::Delete {
            id,
            no_refresh,
            search,
        } => {
            let id = RecordId::new(id.trim());
            let filter = search_params(&search)?;
            let pb = spinner("deleting")?;
            let removed = client.remove(&id).await.map_err(|e| e.to_string());
            pb.finish_and_clear();
            removed?;
            info!(%id, "deleted");
            format_kv_line("Deleted", id.as_str());
            if !no_refresh {
                list_rows(&run, &client, &filter).await?;
            }
        }
        Command::Browse(_) | Command::InitConfig => {
            return Err("command does not run on the async path".to_string());
        }
    }

    debug!(elapsed_ms = now.elapsed().as_millis() as u64, "done");
    Ok(())
}

fn run_browse(rt: &tokio::runtime::Runtime, run: RunConfig, search: SearchArgs) -> Result<(), String> {
    let form: SearchForm = validation::search_form(&search);
    let client = QueryClient::new(run.client.clone()).map_err(|e| e.to_string())?;
    tui::run(
        rt.handle().clone(),
        Arc::new(client),
        &run.detail_page,
        form,
        search.query.as_deref().unwrap_or_default(),
        BrowseConfig::default(),
    )
    .map_err(|e| e.to_string())
}

fn init_config(path: Option<&str>) -> Result<(), String> {
    let path: PathBuf = match path {
        Some(p) => config::expand_tilde(p),
        None => config::default_config_path()
            .ok_or_else(|| "cannot locate a home directory for the config".to_string())?,
    };
    if config::ensure_default_config_file(&path)? {
        format_kv_line("Created", &path.display().to_string());
    } else {
        format_kv_line("Exists", &path.display().to_string());
    }
    Ok(())
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp if std::env::args().len() <= 2 => {
                print!("{}", render_custom_help());
                return Ok(());
            }
            ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                print!("{e}");
                return Ok(());
            }
            ErrorKind::DisplayVersion => {
                let cmd = CliArgs::command();
                print!("{}", cmd.render_version());
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    if matches!(args.command, Some(Command::InitConfig)) {
        return init_config(args.config.as_deref());
    }

    let cwd = std::env::current_dir().map_err(|e| format!("failed to read working directory: {e}"))?;
    let cfg = config::resolve_config(args.config.as_deref(), &cwd)?;
    let run = build_run_config(args, cfg)?;

    if run.no_color {
        colored::control::set_override(false);
    }

    let sink = match (&run.command, run.log_file.as_deref()) {
        (_, Some(path)) => LogSink::File(PathBuf::from(path)),
        (Command::Browse(_), None) => LogSink::Discard,
        _ => LogSink::Stderr,
    };
    logging::init(run.verbose, run.log_level.as_deref(), sink)?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(run.workers)
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    match run.command.clone() {
        Command::Browse(search) => run_browse(&rt, run, search),
        _ => rt.block_on(run_async(run)),
    }
}
