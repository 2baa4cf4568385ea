use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "dserve-admin",
    version,
    about = "admin viewer for dserve JSON databases",
    long_about = "dserve-admin lists, filters, inspects and deletes records of a dserve (WhiteDB) database over its HTTP JSON API.\n\nExamples:\n  dserve-admin -u http://localhost/cgi-bin/dserve -d 1000\n  dserve-admin list --fld 1 --compare equal --type int --value 5\n  dserve-admin list -o index.html\n  dserve-admin delete 42\n\nTip: Put url and database in conf.json or ~/.dserve-admin/config.yml and keep invocations short."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "vb",
        visible_alias = "verbose",
        action = ArgAction::Count,
        global = true,
        help_heading = "Output",
        help = "Increase log verbosity (-v, -vv, -vvv)."
    )]
    pub verbose: u8,

    #[arg(
        short = 'c',
        long = "clr",
        visible_alias = "color",
        global = true,
        help_heading = "Output",
        help = "Enable colored output (overrides --no-color)."
    )]
    pub color: bool,

    #[arg(
        short = 'n',
        long = "nc",
        visible_alias = "no-color",
        global = true,
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'C',
        long = "cfg",
        visible_alias = "config",
        value_name = "FILE",
        global = true,
        help_heading = "Input",
        help = "Path to config file (defaults to ./conf.json, then ~/.dserve-admin/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        short = 'u',
        long = "u",
        visible_alias = "url",
        value_name = "URL",
        global = true,
        help_heading = "Input",
        help = "dserve API endpoint."
    )]
    pub url: Option<String>,

    #[arg(
        short = 'd',
        long = "db",
        visible_alias = "database",
        value_name = "NAME",
        global = true,
        help_heading = "Input",
        help = "Database name passed as db=."
    )]
    pub database: Option<String>,

    #[arg(
        short = 'T',
        long = "to",
        visible_alias = "timeout",
        value_name = "SECONDS",
        global = true,
        help_heading = "HTTP",
        help = "Per-request timeout in seconds."
    )]
    pub timeout: Option<usize>,

    #[arg(
        short = 'p',
        long = "px",
        visible_alias = "proxy",
        value_name = "URL",
        global = true,
        help_heading = "HTTP",
        help = "HTTP proxy URL (e.g. http://127.0.0.1:8080)."
    )]
    pub proxy: Option<String>,

    #[arg(
        short = 'H',
        long = "hdr",
        visible_alias = "header",
        value_name = "HEADER",
        global = true,
        help_heading = "HTTP",
        help = "Add a header to all requests (format: 'Key: Value')."
    )]
    pub header: Option<String>,

    #[arg(
        short = 'w',
        long = "wrk",
        visible_alias = "workers",
        value_name = "N",
        global = true,
        help_heading = "Performance",
        help = "Number of runtime worker threads."
    )]
    pub workers: Option<usize>,

    #[arg(
        short = 'o',
        long = "out",
        visible_alias = "output",
        value_name = "FILE",
        global = true,
        help_heading = "Output",
        help = "Write rendered rows to a file instead of stdout."
    )]
    pub output: Option<String>,

    #[arg(
        short = 'A',
        long = "of",
        visible_alias = "output-format",
        value_name = "FORMAT",
        global = true,
        help_heading = "Output",
        help = "Output format (text, json, html)."
    )]
    pub output_format: Option<String>,

    #[arg(
        long = "dp",
        visible_alias = "detail-page",
        value_name = "PATH",
        global = true,
        help_heading = "Output",
        help = "Detail page linked from rows (defaults to html/data.html)."
    )]
    pub detail_page: Option<String>,

    #[arg(
        long = "lf",
        visible_alias = "log-file",
        value_name = "FILE",
        global = true,
        help_heading = "Output",
        help = "Append logs to a file."
    )]
    pub log_file: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Search the database and print the rows.
    #[command(visible_alias = "ls")]
    List(SearchArgs),
    /// Print every field of one record.
    Show {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Delete one record, then list again.
    #[command(visible_alias = "rm")]
    Delete {
        #[arg(value_name = "ID")]
        id: String,
        #[arg(
            long = "nr",
            visible_alias = "no-refresh",
            help = "Do not list the remaining rows afterwards."
        )]
        no_refresh: bool,
        #[command(flatten)]
        search: SearchArgs,
    },
    /// Interactive table view (default).
    Browse(SearchArgs),
    /// Write a commented default config file.
    InitConfig,
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchArgs {
    #[arg(long = "fld", value_name = "N", help_heading = "Search", help = "Field number to compare.")]
    pub fld: Option<String>,

    #[arg(
        long = "cmp",
        visible_alias = "compare",
        value_name = "OP",
        help_heading = "Search",
        help = "equal, not_equal, lessthan, greater, ltequal or gtequal."
    )]
    pub compare: Option<String>,

    #[arg(
        long = "type",
        value_name = "TYPE",
        help_heading = "Search",
        help = "null, int, record, double, str or char."
    )]
    pub value_type: Option<String>,

    #[arg(long = "value", value_name = "VALUE", help_heading = "Search", help = "Value to compare with.")]
    pub value: Option<String>,

    #[arg(long = "from", value_name = "N", help_heading = "Search", help = "Skip the first N matches.")]
    pub from: Option<String>,

    #[arg(long = "count", value_name = "N", help_heading = "Search", help = "Return at most N matches.")]
    pub count: Option<String>,

    #[arg(long = "recids", value_name = "IDS", help_heading = "Search", help = "Only these record ids.")]
    pub recids: Option<String>,

    #[arg(
        short = 'q',
        long = "qs",
        visible_alias = "query",
        value_name = "QUERY",
        help_heading = "Search",
        help = "Raw serialized filter (k=v&k=v); empty pairs are dropped."
    )]
    pub query: Option<String>,
}
