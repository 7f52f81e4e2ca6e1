// Logify CLI - normalize raw logs and compile log queries

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use logify_core::{load_config, CanonicalLogRecord, LogLevel, Normalizer};
use logify_query::{compile, translate, QueryCommand};
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use tracing::{info, Level};

const MESSAGE_WIDTH: usize = 80;

#[derive(Parser)]
#[command(name = "logify")]
#[command(version = "0.1.0")]
#[command(about = "Normalize raw logs and compile log queries", long_about = None)]
struct Cli {
    /// Print debug diagnostics to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize raw log lines into canonical records
    Normalize {
        /// Log file to read (stdin when omitted)
        file: Option<PathBuf>,

        /// TOML file with custom format rules (or set LOGIFY_RULES env var)
        #[arg(short, long, env = "LOGIFY_RULES")]
        rules: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value_t = Output::Json)]
        output: Output,
    },

    /// Compile a query and show the search filter it becomes
    Query {
        /// e.g. 'filter level = "ERROR" | sort @timestamp desc | limit 10'
        query: String,

        #[arg(short, long, value_enum, default_value_t = Output::Json)]
        output: Output,
    },

    /// List active format rules in priority order
    Rules {
        #[arg(short, long, env = "LOGIFY_RULES")]
        rules: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Output {
    Json,
    Table,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let max_level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Normalize {
            file,
            rules,
            output,
        } => normalize(file, rules, output),
        Commands::Query { query, output } => {
            if !run_query(&query, output)? {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Rules { rules } => list_rules(rules),
    }
}

fn build_normalizer(rules: Option<PathBuf>) -> Result<Normalizer, Box<dyn Error>> {
    let Some(path) = rules else {
        return Ok(Normalizer::new());
    };
    let config = load_config(&path)?;
    info!(path = %path.display(), rules = config.rules.len(), "loaded custom rules");
    Ok(Normalizer::with_config(&config)?)
}

fn normalize(
    file: Option<PathBuf>,
    rules: Option<PathBuf>,
    output: Output,
) -> Result<(), Box<dyn Error>> {
    let normalizer = build_normalizer(rules)?;

    let reader: Box<dyn BufRead> = match file {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(io::stdin().lock()),
    };

    match output {
        Output::Json => {
            for record in normalizer.normalize_reader(reader) {
                println!("{}", serde_json::to_string(&record?)?);
            }
        }
        Output::Table => {
            let records = normalizer
                .normalize_reader(reader)
                .collect::<io::Result<Vec<_>>>()?;
            print_records(&records);
        }
    }
    Ok(())
}

fn print_records(records: &[CanonicalLogRecord]) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Level", "Service", "Time", "Message"]);

    for r in records {
        let level = match r.level {
            LogLevel::Error => r.level.as_str().red().to_string(),
            LogLevel::Warn => r.level.as_str().yellow().to_string(),
            LogLevel::Info => r.level.as_str().green().to_string(),
            LogLevel::Debug => r.level.as_str().dimmed().to_string(),
        };
        let message = if r.message.chars().count() > MESSAGE_WIDTH {
            format!("{}...", r.message.chars().take(MESSAGE_WIDTH).collect::<String>())
        } else {
            r.message.clone()
        };
        table.add_row(vec![level, r.service.clone(), r.timestamp.clone(), message]);
    }

    println!("{table}");
    println!("\n{} {}", "Records:".dimmed(), records.len().to_string().green());
}

// Ok(false) when the query was rejected
fn run_query(query: &str, output: Output) -> Result<bool, Box<dyn Error>> {
    let parsed = compile(query);
    let filter = match translate(&parsed) {
        Ok(filter) => filter,
        Err(err) => {
            eprintln!("{} {}", "Error:".red().bold(), err);
            return Ok(false);
        }
    };
    let request = filter.to_request();

    match output {
        Output::Json => {
            let body = serde_json::json!({
                "commands": parsed.commands,
                "filter": filter,
                "request": request,
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Output::Table => {
            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["#", "Command", "Parameters"]);
            for (i, command) in parsed.commands.iter().enumerate() {
                table.add_row(vec![
                    (i + 1).to_string(),
                    command.kind().cyan().to_string(),
                    describe(command),
                ]);
            }
            println!("{table}");
            println!("\n{}", "Search request:".green().bold());
            println!("{}", serde_json::to_string_pretty(&request)?);
        }
    }
    Ok(true)
}

fn describe(command: &QueryCommand) -> String {
    match command {
        QueryCommand::Fields(cmd) => cmd.fields.join(", "),
        QueryCommand::Filter(cmd) => format!("{} {} {:?}", cmd.field, cmd.operator, cmd.value),
        QueryCommand::Stats(cmd) if cmd.group_by.is_empty() => {
            format!("{}({})", cmd.function, cmd.field)
        }
        QueryCommand::Stats(cmd) => {
            format!("{}({}) by {}", cmd.function, cmd.field, cmd.group_by.join(", "))
        }
        QueryCommand::Sort(cmd) => format!("{} {}", cmd.field, cmd.direction),
        QueryCommand::Limit(cmd) => cmd.limit.to_string(),
        QueryCommand::Parse(cmd) => format!("{} {:?} as {}", cmd.field, cmd.pattern, cmd.alias),
    }
}

fn list_rules(rules: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    let normalizer = build_normalizer(rules)?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "Rule", "Pattern"]);
    for (i, rule) in normalizer.rules().iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            rule.name().to_string(),
            rule.pattern().as_str().to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}
