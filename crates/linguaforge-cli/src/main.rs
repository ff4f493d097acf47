//! linguaforge CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "linguaforge", version, about = "Language-learning grading and review")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade a text or audio submission
    Grade {
        /// Learner id
        #[arg(long)]
        user: String,

        /// Session id (generated when omitted)
        #[arg(long)]
        session: Option<String>,

        /// Target language: romanian, korean, english
        #[arg(long)]
        language: String,

        /// Exercise mode: blitz, conversation, translation, pronunciation, reflection
        #[arg(long, default_value = "conversation")]
        forge_type: String,

        /// The learner's text
        #[arg(long)]
        text: Option<String>,

        /// Audio URL or local file path
        #[arg(long)]
        audio: Option<String>,

        /// Source text the learner was responding to
        #[arg(long)]
        original_text: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Apply a spaced-repetition review to an error item
    Review {
        /// Error item id
        #[arg(long)]
        error_id: String,

        /// Recall quality, 0 (blackout) to 5 (perfect)
        #[arg(long)]
        quality: i32,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List error items due for review
    Due {
        /// Learner id
        #[arg(long)]
        user: String,

        /// Restrict to one language
        #[arg(long)]
        language: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show review statistics
    Stats {
        /// Learner id
        #[arg(long)]
        user: String,

        /// Restrict to one language
        #[arg(long)]
        language: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter config and seed grammar rules
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("linguaforge=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Grade {
            user,
            session,
            language,
            forge_type,
            text,
            audio,
            original_text,
            config,
        } => {
            commands::grade::execute(
                user,
                session,
                language,
                forge_type,
                text,
                audio,
                original_text,
                config,
            )
            .await
        }
        Commands::Review {
            error_id,
            quality,
            config,
        } => commands::review::execute(error_id, quality, config).await,
        Commands::Due {
            user,
            language,
            config,
        } => commands::due::execute(user, language, config).await,
        Commands::Stats {
            user,
            language,
            config,
        } => commands::stats::execute(user, language, config).await,
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
