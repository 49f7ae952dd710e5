use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use lenssort_core::events::{self, EventPrompt, PromptReply};
use lenssort_core::metadata::ExiftoolReader;
use lenssort_core::{
    logging, thumbs, CancellationToken, OrganizeError, OrganizeOptions, OrganizeReport,
};

const EXIT_INTERRUPTED: i32 = 130;

#[derive(Parser)]
#[command(
    name = "lenssort",
    version,
    about = "Organize camera photos and videos into a dated archive"
)]
struct Cli {
    /// Inbox directory to scan for unorganized media
    #[arg(short, long, default_value = "./_inbox")]
    input: PathBuf,

    /// Archive root directory
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Plan only: print destinations and counts, move nothing
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Skip thumbnail generation
    #[arg(long)]
    no_thumbnail: bool,

    /// Echo detailed progress to the console
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let cli = Cli::parse();

    if !cli.input.is_dir() {
        eprintln!("error: inbox directory does not exist: {}", cli.input.display());
        eprintln!("       create it and put the files to organize inside");
        return 1;
    }

    if !cli.dry_run {
        if let Err(e) = std::fs::create_dir_all(&cli.output) {
            eprintln!("error: cannot create archive root {}: {}", cli.output.display(), e);
            return 1;
        }
    }

    let log_path = cli.output.join(logging::LOG_FILENAME);
    // Dry-run must leave the filesystem untouched, log file included.
    let log_target = (!cli.dry_run).then_some(log_path.as_path());
    if let Err(e) = logging::init(log_target, cli.verbose) {
        eprintln!("error: {}", e);
        return 1;
    }

    banner(&cli, &log_path);

    let token = CancellationToken::new();
    {
        let token = token.clone();
        let _ = ctrlc::set_handler(move || token.cancel());
    }

    let options = OrganizeOptions {
        input: cli.input.clone(),
        output: cli.output.clone(),
        dry_run: cli.dry_run,
        skip_thumbnails: cli.no_thumbnail,
    };
    let reader = ExiftoolReader::new();
    let renderers = thumbs::default_renderers();

    let active: Mutex<Option<(String, ProgressBar)>> = Mutex::new(None);
    let progress = move |stage: &str, current: u64, total: u64, message: &str| {
        let mut guard = active.lock().unwrap();
        if guard.as_ref().map_or(true, |(s, _)| s != stage) {
            if let Some((_, bar)) = guard.take() {
                bar.finish_and_clear();
            }
            let bar = ProgressBar::new(total);
            if let Ok(style) =
                ProgressStyle::with_template("{prefix:>10} [{bar:40}] {pos}/{len} {msg}")
            {
                bar.set_style(style.progress_chars("=> "));
            }
            bar.set_prefix(stage.to_string());
            *guard = Some((stage.to_string(), bar));
        }
        let mut finished = false;
        if let Some((_, bar)) = guard.as_ref() {
            bar.set_position((current + 1).min(total));
            bar.set_message(message.to_string());
            finished = current + 1 >= total;
            if finished {
                bar.finish_and_clear();
            }
        }
        if finished {
            *guard = None;
        }
    };

    let mut report =
        match lenssort_core::organize(&options, &reader, &renderers, Some(&token), &progress) {
            Ok(report) => report,
            Err(e) => {
                if matches!(
                    e.downcast_ref::<OrganizeError>(),
                    Some(OrganizeError::Cancelled)
                ) {
                    eprintln!();
                    eprintln!("interrupted, nothing further was changed");
                    return EXIT_INTERRUPTED;
                }
                eprintln!("error: {:#}", e);
                return 1;
            }
        };

    if cli.dry_run {
        print_plan(&report);
    } else if !report.interrupted && !report.date_groups.is_empty() {
        println!();
        println!("Event naming (optional): Enter skips a date, 'q' finishes");
        let groups = report.date_groups.clone();
        let mut prompt = StdioPrompt;
        events::annotate_events(&cli.output, &groups, &mut prompt, &mut report);
    }

    print_report(&report, &log_path, cli.dry_run);
    log::logger().flush();

    if report.interrupted {
        return EXIT_INTERRUPTED;
    }
    0
}

fn banner(cli: &Cli, log_path: &Path) {
    println!("==================================================");
    println!("  lenssort: camera photo & video archiver");
    println!("==================================================");
    if cli.dry_run {
        println!("  mode:    DRY-RUN (no files will be moved)");
    }
    println!("  inbox:   {}", cli.input.display());
    println!("  archive: {}", cli.output.display());
    if !cli.dry_run {
        println!("  log:     {}", log_path.display());
    }
    println!("==================================================");
}

fn print_plan(report: &OrganizeReport) {
    let photos: u64 = report.date_groups.values().map(|g| g.photos).sum();
    let videos: u64 = report.date_groups.values().map(|g| g.videos).sum();

    println!();
    println!("[DRY-RUN] plan summary:");
    println!("  would archive {} photos, {} videos", photos, videos);
    for planned in report.planned.iter().take(5) {
        println!("  {} -> {}", planned.original_name, planned.destination.display());
    }
    if report.planned.len() > 5 {
        println!("  ... and {} more", report.planned.len() - 5);
    }
}

fn print_report(report: &OrganizeReport, log_path: &Path, dry_run: bool) {
    println!();
    println!("╔════════════════════════════════════════╗");
    println!("║              Run summary               ║");
    println!("╠════════════════════════════════════════╣");
    println!("║  photos archived: {:>6}               ║", report.photos_processed);
    println!("║  videos archived: {:>6}               ║", report.videos_processed);
    println!("║  warnings:        {:>6}               ║", report.warnings);
    println!("║  errors:          {:>6}               ║", report.errors);
    println!("╚════════════════════════════════════════╝");
    if !dry_run {
        println!("detailed log: {}", log_path.display());
    }
}

/// Interactive labeling channel reading answers from stdin. EOF behaves
/// like 'q' so non-interactive runs finish cleanly.
struct StdioPrompt;

impl EventPrompt for StdioPrompt {
    fn ask(&mut self, date: &str, photos: u64, videos: u64) -> PromptReply {
        let mut stats = Vec::new();
        if photos > 0 {
            stats.push(format!("{} photos", photos));
        }
        if videos > 0 {
            stats.push(format!("{} videos", videos));
        }
        print!("  {} ({}) event name? [Enter skips]: ", date, stats.join(", "));
        let _ = io::stdout().flush();

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => PromptReply::Quit,
            Ok(_) => {
                let answer = line.trim();
                if answer.eq_ignore_ascii_case("q") {
                    PromptReply::Quit
                } else if answer.is_empty() {
                    PromptReply::Skip
                } else {
                    PromptReply::Label(answer.to_string())
                }
            }
        }
    }
}
