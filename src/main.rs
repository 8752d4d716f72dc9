// Entry point and high-level CLI flow.
//
// - Option [1] loads and resolves the input file, printing diagnostics.
// - Option [2] builds the overview for the selected range, prints previews
//   of the agent table, daily trend and best/worst rankings, and writes
//   `agent_stats.csv` plus `overview.json`.
// - After generating reports, the user can choose to go back to the
//   selection menu or exit.
use callcenter_kpi::output;
use callcenter_kpi::reports::{
    agent_records, agent_stat_rows, build_daily_kpis, daily_kpi_rows, filter_by_range,
};
use callcenter_kpi::types::RankRow;
use callcenter_kpi::util::{format_int, format_opt};
use callcenter_kpi::{
    compose_overview_with_agents, loader, rank_agents, resolve_rows, CallRecord, Policy, RangeKey,
    RankMetric, RuleEngine,
};
use clap::Parser;
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;

#[derive(Parser)]
#[command(name = "callcenter_kpi", about = "Call-center KPI overview and insights")]
struct Cli {
    /// Input file (.csv or .json)
    #[arg(default_value = "calls.csv")]
    input: PathBuf,

    /// Time range: today, week or month
    #[arg(long, default_value = "week")]
    range: RangeKey,

    /// JSON policy file overriding the default thresholds
    #[arg(long)]
    policy: Option<PathBuf>,

    /// Restrict reports to one agent
    #[arg(long)]
    agent: Option<String>,

    /// Directory for the exported CSV/JSON files
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

// Loaded records are kept so reports can be regenerated without reloading.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState { data: None }));

struct AppState {
    data: Option<Vec<CallRecord>>,
}

fn read_choice() -> String {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to Report Selection (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        if io::stdin().read_line(&mut buf).unwrap_or(0) == 0 {
            return false;
        }
        match buf.trim().to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn handle_load(cli: &Cli) {
    match loader::load_rows(&cli.input) {
        Ok((rows, report)) => {
            let records = resolve_rows(&rows);
            println!(
                "Processing dataset... ({} rows read, {} loaded)",
                format_int(report.total_rows as u64),
                format_int(report.loaded_rows as u64)
            );
            if report.skipped_rows > 0 {
                println!(
                    "Note: {} rows skipped due to parse errors.",
                    format_int(report.skipped_rows as u64)
                );
            }
            let undated = records.iter().filter(|r| r.date.is_none()).count();
            if undated > 0 {
                println!(
                    "Info: {} rows have no usable date and are left out of ranged reports.",
                    format_int(undated as u64)
                );
            }
            println!();
            let mut state = APP_STATE.lock().unwrap_or_else(|e| e.into_inner());
            state.data = Some(records);
        }
        Err(e) => {
            eprintln!("Failed to load file: {}\n", e);
        }
    }
}

fn handle_generate_reports(cli: &Cli, policy: &Policy) {
    let data = {
        let state = APP_STATE.lock().unwrap_or_else(|e| e.into_inner());
        state.data.clone()
    };
    let Some(data) = data else {
        println!("Error: No data loaded. Please load the file first (option 1).\n");
        return;
    };

    let mut records = filter_by_range(&data, cli.range);
    if let Some(agent) = cli.agent.as_deref() {
        records = agent_records(&records, agent);
        if records.is_empty() {
            println!("No records for agent {agent} in range {}.\n", cli.range);
            return;
        }
    }

    let engine = RuleEngine::new(policy.insights.clone());
    let (overview, agent_stats) =
        compose_overview_with_agents(&records, cli.range, &engine, &policy.metrics);
    let s = &overview.summary;

    println!("Overview ({}): {} calls", cli.range, format_int(s.total_calls as u64));
    println!(
        "  CSAT {}  AHT {}  FCR {}  SLA {}  Escalation {}",
        format_opt(s.avg_csat(), 1, ""),
        format_opt(s.avg_aht(), 1, "s"),
        format_opt(s.fcr_rate(), 1, "%"),
        format_opt(s.sla_rate(), 1, "%"),
        format_opt(s.escalation_rate(), 1, "%"),
    );
    if !s.flags.is_empty() {
        println!("  Flags: {}", s.flags.join(", "));
    }

    let stat_rows = agent_stat_rows(&agent_stats);
    output::preview_table(
        "Agent Performance",
        Some("Sorted by average handle time"),
        &stat_rows,
        10,
    );
    output::preview_table(
        "Daily Trend",
        None,
        &daily_kpi_rows(&build_daily_kpis(&records)),
        31,
    );

    let mut rank_rows: Vec<RankRow> = Vec::new();
    for metric in RankMetric::ALL {
        let result = rank_agents(&agent_stats, metric, &policy.rank);
        let suffix = if metric == RankMetric::Aht { "s" } else { "" };
        for (side, items) in [("best", &result.top), ("worst", &result.bottom)] {
            rank_rows.extend(items.iter().map(|item| RankRow {
                side: format!("{} {}", metric.label(), side),
                agent: item.id.clone(),
                value: format_opt(item.value, 1, suffix),
                sample: item.sample,
            }));
        }
        if let Some(reason) = result.meta.reason {
            log::info!("{} ranking empty: {reason}", metric.label());
        }
    }
    output::preview_table(
        "Best / Worst Agents",
        Some(&format!(
            "Top/bottom {:.0}%, at least {} calls",
            policy.rank.ratio * 100.0,
            policy.rank.min_sample
        )),
        &rank_rows,
        rank_rows.len(),
    );

    println!("Insights:");
    for i in &overview.insights {
        println!("  [{:?}] {} - {}", i.level, i.title, i.why);
    }
    println!("Recommended tasks:");
    for t in &overview.recommend_tasks {
        println!("  {:?} ({}) {}", t.priority, t.owner, t.task);
    }
    println!();

    let stats_file = cli.out_dir.join("agent_stats.csv");
    if let Err(e) = output::write_csv(&stats_file, &stat_rows) {
        eprintln!("Write error: {}", e);
    }
    let overview_file = cli.out_dir.join("overview.json");
    if let Err(e) = output::write_json(&overview_file, &overview) {
        eprintln!("Write error: {}", e);
    }
    println!(
        "(Exported {} and {})\n",
        stats_file.display(),
        overview_file.display()
    );
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let policy = match &cli.policy {
        Some(path) => match Policy::from_path(path) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("Failed to load policy: {}", e);
                std::process::exit(1);
            }
        },
        None => Policy::default(),
    };

    loop {
        println!("Call-Center KPI Reports:");
        println!("[1] Load the file");
        println!("[2] Generate Reports\n");
        match read_choice().as_str() {
            "1" => {
                handle_load(&cli);
            }
            "2" => {
                println!();
                handle_generate_reports(&cli, &policy);
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            "" => {
                println!("Exiting the program.");
                break;
            }
            _ => {
                println!("Invalid choice. Please enter 1 or 2.\n");
            }
        }
    }
}
