use std::sync::Arc;

use quote_wizard::channels::{CliChannel, CliView};
use quote_wizard::client::{HttpStepProcessor, StepClient};
use quote_wizard::config::{DeskConfig, WizardConfig};
use quote_wizard::desk::{self, Desk, MailConfig, SummaryMailer, SummarySender};
use quote_wizard::flow::Conversation;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Chat goes to stdout; logs stay on stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match std::env::args().nth(1).as_deref() {
        Some("serve") => serve().await,
        None | Some("chat") => chat().await,
        Some(other) => {
            eprintln!("Unknown command: {other}");
            eprintln!("  usage: quote-wizard [chat|serve]");
            std::process::exit(2);
        }
    }
}

async fn chat() -> anyhow::Result<()> {
    let config = WizardConfig::from_env();

    eprintln!("💬 Quote Wizard v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Step-processor: {}", config.backend_url);
    eprintln!(
        "   Pacing: {}",
        if config.pacing { "on" } else { "off" }
    );
    eprintln!("   /restart to start over, /export <file> to save as HTML, /quit to exit.");

    let processor = HttpStepProcessor::new(&config.backend_url)?;
    let client = StepClient::new(Arc::new(processor));
    let conversation = Conversation::new(client, &config, Arc::new(CliView::new("Lulu")));

    CliChannel::new(conversation).run().await;
    Ok(())
}

async fn serve() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::warn!("rustls crypto provider already installed");
    }

    let config = DeskConfig::from_env()?;

    let mailer = MailConfig::from_env().map(|mail| {
        eprintln!("   Summary email: enabled (SMTP: {}:{})", mail.smtp_host, mail.smtp_port);
        Arc::new(SummaryMailer::new(mail)) as Arc<dyn SummarySender>
    });
    if mailer.is_none() {
        eprintln!("   Summary email: disabled");
    }
    match &config.leads_path {
        Some(path) => eprintln!("   Leads: {}", path.display()),
        None => eprintln!("   Leads: memory only"),
    }
    eprintln!("   Desk: http://0.0.0.0:{}", config.port);

    let port = config.port;
    let desk = Arc::new(Desk::new(config, mailer));
    desk::serve(desk, port).await?;
    Ok(())
}
