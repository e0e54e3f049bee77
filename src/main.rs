mod common;
mod config;
mod headless;
mod network;
mod ui;

use std::error::Error;

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tokio::sync::mpsc;

use common::Category;
use config::AppConfig;
use headless::{HeadlessSession, format_transcript};
use network::{ConsultApi, ConsultClient};
use ui::ChatApp;

#[derive(Parser)]
#[command(
    name = "consult_chat",
    version,
    about = "Desktop chat client for the business consulting backend"
)]
struct Cli {
    /// Path to JSON config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH, value_name = "FILE")]
    config: String,
    /// Backend base URL, overrides the config file
    #[arg(long, env = "CONSULT_BASE_URL", value_name = "URL")]
    base_url: Option<String>,
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand, Clone, PartialEq, Eq)]
enum Mode {
    /// Ask one question and print the transcript (no UI)
    Ask {
        question: String,
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Ask several questions in one batch request
    Batch {
        #[arg(required = true)]
        questions: Vec<String>,
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Show which model the backend is serving
    ModelInfo,
    /// Check backend health; exits non-zero when unhealthy
    Health,
    /// Write the effective configuration to the config file
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    let cli = Cli::parse();

    // Khởi tạo Logger để debug
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let app_config = config::load_config(&cli.config).with_base_url(cli.base_url.clone());
    log::info!("Using consult backend at {}", app_config.base_url);

    match cli.mode {
        None => run_full_client(app_config).await?,
        Some(Mode::InitConfig) => {
            config::save_config(&cli.config, &app_config)?;
            log::info!("Wrote configuration to {}", cli.config);
        }
        Some(mode) => run_headless(mode, &app_config).await?,
    }

    Ok(())
}

async fn run_headless(mode: Mode, app_config: &AppConfig) -> Result<(), Box<dyn Error>> {
    let category_or_default = |tag: Option<String>| {
        tag.map(|tag| Category::parse(&tag))
            .unwrap_or(app_config.default_category)
    };

    let api = ConsultApi::new(&app_config.base_url);
    let mut session = HeadlessSession::start(api, app_config);

    let mut healthy = true;
    match mode {
        Mode::Ask { question, category } => {
            let transcript = session
                .ask(&question, category_or_default(category))
                .await;
            print!("{}", format_transcript(transcript, &app_config.product_name));
        }
        Mode::Batch {
            questions,
            category,
        } => {
            let answers = session
                .batch(questions, category_or_default(category))
                .await
                .map_err(|err| format!("Batch consult failed: {err}"))?;
            for answer in answers {
                println!("{}. {}", answer.index + 1, answer.question);
                println!("   {}\n", answer.answer);
            }
        }
        Mode::ModelInfo => {
            let info = session
                .model_info()
                .await
                .map_err(|err| format!("Model info unavailable: {err}"))?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Mode::Health => {
            let health = session.health().await;
            println!(
                "{}: {}",
                if health.healthy { "healthy" } else { "unhealthy" },
                health.detail
            );
            healthy = health.healthy;
        }
        Mode::InitConfig => {}
    }

    session.shutdown().await;

    if !healthy {
        std::process::exit(1);
    }
    Ok(())
}

async fn run_full_client(app_config: AppConfig) -> Result<(), eframe::Error> {
    // 1. Tạo các kênh giao tiếp (Channels)
    // UI -> Network
    let (cmd_tx, cmd_rx) = mpsc::channel(100);
    // Network -> UI
    let (event_tx, event_rx) = mpsc::channel(100);

    // 2. Khởi chạy Network Thread (Chạy ngầm)
    let api = ConsultApi::new(&app_config.base_url);
    tokio::spawn(ConsultClient::new(api, event_tx, cmd_rx).run());

    // 3. Khởi chạy UI (Chạy trên Main Thread)
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([900.0, 640.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Consult Chat",
        options,
        Box::new(move |cc| {
            log::info!(
                "Client started with {} category shortcuts",
                app_config.shortcuts.len()
            );

            Ok(Box::new(ChatApp::new(cc, &app_config, cmd_tx, event_rx)))
        }),
    )
}
