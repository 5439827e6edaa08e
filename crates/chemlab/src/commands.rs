//! Command implementations for the chemlab CLI.

use anyhow::{bail, Context, Result};
use chemlab::{LabSession, SessionView};
use chemlab_common::{
    classify, interpret, AnalysisClient, AnalysisRequest, AnalysisResult, Config, Flask,
    HttpAnalysisClient, ReagentCategory, RequestId, RiskStyleBucket, RiskTier, AMBIENT_TEMPERATURE,
    MAX_TEMPERATURE,
};
use owo_colors::OwoColorize;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// `chemlab catalog`
pub fn catalog(config_path: Option<&Path>, category: Option<String>) -> Result<()> {
    let config = Config::load(config_path)?;
    let catalog = config.catalog()?;

    let filter = match category.as_deref() {
        Some(c) => Some(
            ReagentCategory::parse(c).with_context(|| format!("Unknown category '{}'", c))?,
        ),
        None => None,
    };

    for cat in ReagentCategory::ALL {
        if filter.is_some_and(|f| f != cat) {
            continue;
        }
        let reagents = catalog.by_category(cat);
        if reagents.is_empty() {
            continue;
        }

        println!("{}", cat.as_str().to_uppercase().bold());
        for r in reagents {
            println!(
                "  {:<6} {:<28} {:<16} {:>3}%  {}",
                r.id,
                r.name,
                r.formula,
                r.danger_level,
                r.state.as_str().dimmed()
            );
        }
    }

    Ok(())
}

/// `chemlab analyze`
pub async fn analyze(
    config_path: Option<&Path>,
    reagent_ids: Vec<String>,
    temperature: u32,
    json: bool,
) -> Result<()> {
    if !(AMBIENT_TEMPERATURE..=MAX_TEMPERATURE).contains(&temperature) {
        bail!(
            "Temperature must be between {} and {} °C",
            AMBIENT_TEMPERATURE,
            MAX_TEMPERATURE
        );
    }

    let config = Config::load(config_path)?;
    let catalog = config.catalog()?;

    let mut flask = Flask::new();
    for id in &reagent_ids {
        let reagent = catalog
            .get(id)
            .cloned()
            .with_context(|| format!("Unknown reagent '{}'", id))?;
        flask.add(reagent)?;
    }

    let client = HttpAnalysisClient::new(config.llm.clone())?;
    let request = AnalysisRequest::new(RequestId(1), flask.reagents().to_vec(), temperature);

    let result = client
        .analyze(&request)
        .await
        .and_then(interpret)
        .context("Analysis failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let risk = classify(&request.reagents, temperature, Some(&result));
    println!("{} at {}°C", request.reagent_list().bold(), temperature);
    print_result(&result, &risk);
    Ok(())
}

/// `chemlab config`
pub fn config(config_path: Option<&Path>, init: bool) -> Result<()> {
    if init {
        let path = match config_path {
            Some(p) => p.to_path_buf(),
            None => Config::user_config_path().context("No user config directory")?,
        };
        if path.exists() {
            bail!("{} already exists", path.display());
        }
        Config::save_default(&path)?;
        println!("Wrote default config to {}", path.display());
        return Ok(());
    }

    let mut config = Config::load(config_path)?;
    if config.llm.api_key.is_some() {
        config.llm.api_key = Some("********".to_string());
    }
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

/// One line of interactive input
#[derive(Debug, PartialEq, Eq)]
enum BenchCommand {
    Add(Vec<String>),
    Heat(bool),
    Cool,
    Clear,
    Status,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Option<BenchCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let args: Vec<String> = words.map(str::to_string).collect();

    let cmd = match verb.to_lowercase().as_str() {
        "add" | "a" => {
            if args.is_empty() {
                return Err("usage: add <reagent-id>...".to_string());
            }
            BenchCommand::Add(args)
        }
        "heat" | "h" => match args.first().map(String::as_str) {
            Some("on") | None => BenchCommand::Heat(true),
            Some("off") => BenchCommand::Heat(false),
            Some(other) => return Err(format!("heat takes 'on' or 'off', not '{}'", other)),
        },
        "cool" => BenchCommand::Cool,
        "clear" | "reset" => BenchCommand::Clear,
        "status" | "s" => BenchCommand::Status,
        "help" | "?" => BenchCommand::Help,
        "quit" | "exit" | "q" => BenchCommand::Quit,
        other => return Err(format!("unknown command '{}' (try 'help')", other)),
    };
    Ok(Some(cmd))
}

/// `chemlab session`
pub async fn session(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;
    let catalog = config.catalog()?;
    let client = Arc::new(HttpAnalysisClient::new(config.llm.clone())?);
    let session = LabSession::new(catalog, client, &config.session)?;

    println!(
        "{} ({} reagents on the shelf, 'help' for commands)",
        "Chemlab bench ready".bold(),
        session.catalog().len()
    );

    let mut updates = session.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_shown: Option<AnalysisResult> = None;
    let mut was_analyzing = false;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_command(&line) {
                    Ok(None) => {}
                    Ok(Some(BenchCommand::Quit)) => break,
                    Ok(Some(cmd)) => run_bench_command(&session, cmd),
                    Err(msg) => println!("{}", msg.yellow()),
                }
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = updates.borrow_and_update().clone();
                if view.is_analyzing && !was_analyzing {
                    println!("{}", "analysing...".dimmed());
                }
                was_analyzing = view.is_analyzing;

                if view.analysis != last_shown {
                    if let Some(result) = &view.analysis {
                        print_result(result, &view.risk);
                    }
                    last_shown = view.analysis.clone();
                }
            }
        }
    }

    session.shutdown();
    Ok(())
}

fn run_bench_command(session: &LabSession, cmd: BenchCommand) {
    match cmd {
        BenchCommand::Add(ids) => {
            for id in ids {
                // Rejections land in the view's notice
                if session.add_reagent(&id).is_err() {
                    break;
                }
            }
            print_status(&session.view());
        }
        BenchCommand::Heat(on) => {
            session.set_heating(on);
            print_status(&session.view());
        }
        BenchCommand::Cool => {
            session.cool_down();
            print_status(&session.view());
        }
        BenchCommand::Clear => {
            session.clear();
            print_status(&session.view());
        }
        BenchCommand::Status => print_status(&session.view()),
        BenchCommand::Help => {
            println!("  add <id>...     add reagents (see `chemlab catalog`)");
            println!("  heat on|off     start or stop the burner");
            println!("  cool            drop back to 25°C");
            println!("  clear           empty the flask");
            println!("  status          show the flask");
            println!("  quit            leave the bench");
        }
        BenchCommand::Quit => {}
    }
}

fn tier_label(risk: &RiskStyleBucket) -> String {
    let text = format!("{} {:.0}", risk.tier, risk.score);
    match risk.tier {
        RiskTier::High => text.red().bold().to_string(),
        RiskTier::Medium => text.yellow().to_string(),
        RiskTier::Low => text.green().to_string(),
        RiskTier::None => text.dimmed().to_string(),
    }
}

fn print_status(view: &SessionView) {
    let contents = if view.flask.is_empty() {
        "empty".to_string()
    } else {
        view.flask
            .reagents
            .iter()
            .map(|r| r.formula.as_str())
            .collect::<Vec<_>>()
            .join(" + ")
    };

    println!(
        "flask: {} | {}°C{} | fill {}% | risk {} ({})",
        contents,
        view.flask.temperature,
        if view.flask.heating { " (heating)" } else { "" },
        view.fill_percent,
        tier_label(&view.risk),
        view.risk.source.as_str()
    );
    if let Some(notice) = &view.notice {
        println!("{}", notice.yellow());
    }
}

fn print_result(result: &AnalysisResult, risk: &RiskStyleBucket) {
    if risk.alert {
        println!("{}", "!! SEVERE RISK !!".red().bold());
    }
    println!("risk:     {}/100 ({})", result.risk_score, tier_label(risk));
    println!("reaction: {}", result.reaction.italic());
    for warning in &result.warnings {
        println!("  {} {}", "!".red(), warning);
    }
    println!("why:      {}", result.explanation);
    if let Some(color) = &result.new_color {
        println!("colour:   {}", color.dimmed());
    }
}
