//! coursectl
//!
//! Drives the course client's collaborators from a terminal: check an
//! enrollment, open a checkout session, or reconcile a payment return the
//! same way the payment result page does.

mod commands;

use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use course_core::{CourseId, ViewerContext};
use course_payments::{CreatePaymentRequest, OutcomeHint, PaymentReturn};
use course_runtime::{BackendClient, BackendConfig};

#[derive(Parser)]
#[command(name = "coursectl", about = "Course entitlement and payment tool")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    backend: BackendArgs,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct BackendArgs {
    /// Backend API base URL
    #[arg(long, env = "COURSE_API_URL", global = true)]
    api_url: Option<String>,

    /// Hosted checkout URL template, `{session_id}` is substituted
    #[arg(long, env = "COURSE_CHECKOUT_URL", global = true)]
    checkout_url: Option<String>,

    /// Bearer token of the viewer
    #[arg(long, env = "COURSE_AUTH_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    /// Viewer role (student, tutor)
    #[arg(long, env = "COURSE_ROLE", global = true)]
    role: Option<String>,
}

impl BackendArgs {
    fn config(&self) -> BackendConfig {
        let mut config = BackendConfig::from_env();
        if let Some(api_url) = &self.api_url {
            config = config.with_api_url(api_url.clone());
        }
        if let Some(template) = &self.checkout_url {
            config = config.with_checkout_url(template.clone());
        }
        config
    }

    fn viewer(&self) -> ViewerContext {
        ViewerContext::from_parts(self.token.clone(), self.role.as_deref(), None)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the backend whether the viewer is enrolled in a course
    Entitlement {
        #[arg(long)]
        course: String,
    },

    /// Create a payment session and print the hosted checkout URL
    Checkout {
        #[arg(long)]
        course: String,

        #[arg(long)]
        tutor: String,

        #[arg(long)]
        category: String,

        #[arg(long)]
        price: Decimal,
    },

    /// Verify a payment return, retrying failed verifications
    Reconcile(ReconcileArgs),
}

#[derive(Args)]
struct ReconcileArgs {
    /// Full return URL as the browser received it
    #[arg(long, conflicts_with_all = ["payment", "session"])]
    return_url: Option<String>,

    /// Outcome hint (`success` or `cancelled`)
    #[arg(long)]
    payment: Option<String>,

    /// Hosted checkout session id
    #[arg(long)]
    session: Option<String>,

    /// Course the payment was for
    #[arg(long)]
    course: Option<String>,

    /// Manual retries to attempt after a failed verification
    #[arg(long, default_value_t = 0)]
    retries: u32,

    /// Pause between retries, in milliseconds
    #[arg(long, default_value_t = 1000)]
    retry_delay_ms: u64,
}

impl ReconcileArgs {
    fn payment_return(&self) -> anyhow::Result<PaymentReturn> {
        let params = match &self.return_url {
            Some(url) => PaymentReturn::from_url(url)?,
            None => PaymentReturn::new(
                self.payment.as_deref().and_then(OutcomeHint::parse),
                self.session.as_deref(),
                None,
            ),
        };
        Ok(params.with_course(CourseId::parse(self.course.as_deref())))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    // Load environment before clap reads its env fallbacks
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let client = BackendClient::from_config(cli.backend.config())?.with_context(&cli.backend.viewer());

    let ok = match cli.command {
        Commands::Entitlement { course } => commands::entitlement(&client, &course, cli.json).await?,
        Commands::Checkout {
            course,
            tutor,
            category,
            price,
        } => {
            let request = CreatePaymentRequest {
                course_id: CourseId::new(course),
                tutor_id: tutor,
                category_id: category,
                price,
            };
            commands::checkout(&client, &request, cli.json).await?
        }
        Commands::Reconcile(args) => {
            let params = args.payment_return()?;
            let delay = Duration::from_millis(args.retry_delay_ms);
            commands::reconcile(&client, params, args.retries, delay, cli.json).await?
        }
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
