mod common;
mod logic;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Instant;

use common::scenario::{TestScenario, expand_scenarios, get_scenario, list_scenarios};
use common::split_csv;
use logic::{LogicTester, QuestionSetup, ScenarioResult, resolve_seed_inputs};
use trivia_game::{AsyncFileSource, AsyncQuestionSource, QuestionRepository};

#[derive(Debug, Parser)]
#[command(name = "trivia-tester", version = "0.1.0")]
#[command(about = "Automated QA testing for Trivia Quest - scripted players over the game engine")]
struct Args {
    /// Scenarios to run (comma-separated, or `all`)
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated, decimal or 0x hex)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per scenario and seed
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Question pack files to load instead of the embedded packs (comma-separated)
    #[arg(long)]
    questions: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    announce_banner();

    let start_time = Instant::now();
    let scenario_names = expand_scenarios(split_csv(&args.scenarios));
    let seeds = resolve_seed_inputs(&split_csv(&args.seeds)).context("invalid --seeds")?;
    let question_override = load_question_override(args.questions.as_deref()).await;

    let results = run_logic_scenarios(&args, &scenario_names, &seeds, question_override.as_ref());
    write_reports(&args, &results, start_time)?;

    if results.is_empty() || results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(output_target.writer(), "  {key:15} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🎮 Trivia Quest Automated Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

/// Read the `--questions` packs once, before any scenario runs.
async fn load_question_override(paths: Option<&str>) -> Option<QuestionSetup> {
    let paths = split_csv(paths?);
    if paths.is_empty() {
        return None;
    }
    let sources: Vec<Box<dyn AsyncQuestionSource>> = paths
        .iter()
        .map(|path| Box::new(AsyncFileSource::new(path)) as Box<dyn AsyncQuestionSource>)
        .collect();
    let repository = QuestionRepository::new(Vec::new());
    if !repository.load_async(&sources).await {
        eprintln!(
            "⚠️  {} - playing with the fallback questions",
            "Question packs could not be loaded".yellow()
        );
    }
    log::info!(
        "loaded {} questions from {} pack(s)",
        repository.pool().len(),
        paths.len()
    );
    Some(QuestionSetup::Records(Rc::new(repository.pool().to_vec())))
}

fn apply_question_override(scenario: &mut TestScenario, setup: Option<&QuestionSetup>) {
    let Some(setup) = setup else {
        return;
    };
    // The fallback scenario needs its sources to fail.
    if !matches!(scenario.plan.questions, QuestionSetup::Unavailable) {
        scenario.plan.questions = setup.clone();
    }
}

fn run_logic_scenarios(
    args: &Args,
    scenarios: &[String],
    seeds: &[u64],
    question_override: Option<&QuestionSetup>,
) -> Vec<ScenarioResult> {
    println!("{}", "🧠 Running Logic Tests".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let logic_tester = LogicTester::new(args.verbose);
    let mut results = Vec::new();

    for scenario_name in scenarios {
        if let Some(mut scenario) = get_scenario(scenario_name) {
            apply_question_override(&mut scenario, question_override);
            results.extend(logic_tester.run_scenario(&scenario, seeds, args.iterations));
        } else {
            eprintln!("⚠️  Unknown scenario: {}", scenario_name.yellow());
        }
    }

    results
}

fn write_reports(args: &Args, results: &[ScenarioResult], start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => logic::reports::generate_json_report(&mut output_target, results)?,
        "markdown" => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# Trivia Quest Logic Test Results\n\n_No scenarios executed._"
                )?;
            } else {
                logic::reports::generate_markdown_report(&mut output_target, results)?;
            }
        }
        _ => {
            if results.is_empty() {
                writeln!(&mut output_target, "No logic scenarios executed.")?;
            } else {
                logic::reports::generate_console_report(
                    &mut output_target,
                    results,
                    start_time.elapsed(),
                )?;
            }
            writeln!(&mut output_target)?;
            writeln!(&mut output_target, "🏁 Total time: {:?}", start_time.elapsed())?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
