use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use pn_client::{PageContext, PortalClient};
use pn_core::{Error, Result};
use pn_progress::{Frontend, Notifier, PollConfig, TaskController, TaskPhase, TokioClock};

mod frontend;

use frontend::TerminalFrontend;

#[derive(Debug, Clone)]
struct HumanDuration(Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total_seconds = 0u64;
        let mut current_number = String::new();
        let mut has_unit = false;

        for c in s.chars() {
            if c.is_ascii_digit() {
                current_number.push(c);
            } else if let Ok(num) = current_number.parse::<u64>() {
                match c {
                    's' => total_seconds += num,
                    'm' => total_seconds += num * 60,
                    'h' => total_seconds += num * 3600,
                    _ => return Err(format!("Invalid duration unit: {}", c)),
                }
                current_number.clear();
                has_unit = true;
            } else if !c.is_whitespace() {
                return Err(format!("Invalid character in duration: {}", c));
            }
        }

        if !current_number.is_empty() {
            if let Ok(num) = current_number.parse::<u64>() {
                total_seconds += num;
                has_unit = true;
            } else {
                return Err("Invalid number in duration".to_string());
            }
        }

        if !has_unit {
            return Err("Duration must include a number".to_string());
        }

        Ok(HumanDuration(Duration::from_secs(total_seconds)))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Submit and track portal scraping/analysis tasks", long_about = None)]
struct Cli {
    /// Portal base URL
    #[arg(long, default_value = "http://localhost:8000")]
    base_url: String,
    /// Session cookies in name=value form (repeatable)
    #[arg(long = "cookie")]
    cookies: Vec<String>,
    /// CSRF token, when it is not carried by a csrftoken cookie
    #[arg(long)]
    csrf_token: Option<String>,
    /// Delay between status checks (e.g. 2s, 1m, 1m30s)
    #[arg(long, default_value = "2s")]
    interval: HumanDuration,
    /// Override the per-flow status-check budget
    #[arg(long)]
    max_attempts: Option<u32>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Trigger a scraping run for a portal section
    Scrape {
        /// Section to scrape (e.g. lista, tecnologia, mundo, economia,
        /// politica, peru21, peru21/deportes)
        category: String,
    },
    /// Run content analysis for one article
    Analyze {
        article_id: i64,
    },
}

fn scrape_endpoint(category: &str) -> Result<(String, String)> {
    let (label, path) = match category {
        "general" | "lista" => ("general scraping", "/noticias/scraping/lista".to_string()),
        "tecnologia" => ("tech scraping", "/noticias/scraping/tecnologia".to_string()),
        "mundo" => ("world scraping", "/noticias/scraping/mundo".to_string()),
        "economia" => ("economy scraping", "/noticias/scraping/economia".to_string()),
        "politica" => ("politics scraping", "/noticias/scraping/politica".to_string()),
        "peru21" => ("peru21 scraping", "/noticias/scraping/peru21".to_string()),
        sub if sub.starts_with("peru21/") => {
            ("peru21 scraping", format!("/noticias/scraping/{}", sub))
        }
        other => {
            return Err(Error::Task(format!("unknown scraping category: {}", other)));
        }
    };
    Ok((label.to_string(), path))
}

fn build_page_context(cli: &Cli) -> Result<PageContext> {
    let mut page = PageContext::new();
    for cookie in &cli.cookies {
        let (name, value) = cookie
            .split_once('=')
            .ok_or_else(|| Error::Csrf(format!("invalid cookie: {}", cookie)))?;
        page = page.with_cookie(name, value);
    }
    if let Some(token) = &cli.csrf_token {
        page = page.with_meta("csrf-token", token);
    }
    Ok(page)
}

async fn run_task(
    client: Arc<PortalClient>,
    config: PollConfig,
    category: &str,
    endpoint: &str,
) -> Result<()> {
    let frontend = Arc::new(TerminalFrontend::new());
    let clock = Arc::new(TokioClock);
    let notifier = Notifier::new(frontend.clone(), clock.clone());
    let controller =
        TaskController::with_client(client, frontend.clone(), notifier, clock, config);

    let phase = controller.run_task(category, endpoint).await;

    if let Some(delay) = frontend.take_pending_reload() {
        info!("🔄 Refreshing in {}s...", delay.as_secs_f32());
        tokio::time::sleep(delay).await;
        frontend.hide_overlay();
        info!("✨ Done. Reload the portal page to see fresh content.");
    }

    match phase {
        TaskPhase::Succeeded => Ok(()),
        TaskPhase::Failed => Err(Error::Task(format!("{} failed", category))),
        TaskPhase::TimedOut => Err(Error::Task(format!(
            "{} did not finish within the attempt budget",
            category
        ))),
        _ => Err(Error::Task(format!("{} was not started", category))),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let page = build_page_context(&cli)?;

    match &cli.command {
        Commands::Scrape { category } => {
            let (label, endpoint) = scrape_endpoint(category)?;
            let client = Arc::new(PortalClient::for_scraping(&cli.base_url, page)?);
            let config = PollConfig::scraping()
                .with_interval(cli.interval.0)
                .with_max_attempts(cli.max_attempts.unwrap_or(540));
            info!("🦗 Starting {} against {}", label, cli.base_url);
            run_task(client, config, &label, &endpoint).await
        }
        Commands::Analyze { article_id } => {
            let client = Arc::new(PortalClient::for_analysis(&cli.base_url, page)?);
            if let Some(analysis_id) = client.latest_analysis(*article_id).await {
                info!(
                    "✅ Article {} already analyzed; see result {} at {}/analisis/resultado/{}/",
                    article_id, analysis_id, cli.base_url, analysis_id
                );
                return Ok(());
            }
            let config = PollConfig::analysis()
                .with_interval(cli.interval.0)
                .with_max_attempts(cli.max_attempts.unwrap_or(60));
            let endpoint = format!("/analisis/api/iniciar/{}/", article_id);
            info!("🧠 Starting analysis of article {}", article_id);
            run_task(client, config, "analysis", &endpoint).await
        }
    }
}
