use crate::cli::args::{CliArgs, Command, SearchArgs};
use crate::filter::SearchForm;
use crate::output::OutputFormat;

pub fn search_form(args: &SearchArgs) -> SearchForm {
    let field = |v: &Option<String>| v.clone().unwrap_or_default();
    SearchForm {
        fld: field(&args.fld),
        compare: field(&args.compare),
        value_type: field(&args.value_type),
        value: field(&args.value),
        from: field(&args.from),
        count: field(&args.count),
        recids: field(&args.recids),
    }
}

fn validate_search(args: &SearchArgs) -> Result<(), String> {
    search_form(args)
        .validate()
        .map_err(|e| format!("invalid search: {e}"))
}

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(workers) = args.workers {
        if workers == 0 {
            return Err("invalid workers, expected positive integer".to_string());
        }
    }
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            return Err("invalid timeout, expected positive integer".to_string());
        }
    }
    if let Some(raw) = args.output_format.as_deref() {
        if OutputFormat::parse(raw).is_none() {
            return Err(format!(
                "invalid --output-format '{raw}', expected text, json or html"
            ));
        }
    }
    if let Some(raw) = args.header.as_deref() {
        if !raw.contains(':') {
            return Err(format!("invalid --header '{raw}', expected 'Key: Value'"));
        }
    }
    match args.command.as_ref() {
        Some(Command::List(search)) | Some(Command::Browse(search)) => validate_search(search)?,
        Some(Command::Delete { id, search, .. }) => {
            if id.trim().is_empty() {
                return Err("invalid record id, expected a non-empty id".to_string());
            }
            validate_search(search)?;
        }
        Some(Command::Show { id }) => {
            if id.trim().is_empty() {
                return Err("invalid record id, expected a non-empty id".to_string());
            }
        }
        Some(Command::InitConfig) | None => {}
    }
    Ok(())
}
