//! Terminal front-end for phone verification hand-off
//!
//! `handoff verify` walks through phone entry, SMS code entry and the final
//! app link. `handoff onboard` prints the onboarding link for an inbound code.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm, Input};
use handoff_core::domains::auth::models::{format as format_phone, validate as validate_phone};
use handoff_core::domains::auth::redirect::{DEFAULT_APP_LINK_BASE, DEFAULT_REAUTH_PATH};
use handoff_core::domains::auth::{
    RedirectBuilder, VerificationCoordinator, VerificationSession, VerifyError,
};
use handoff_core::kernel::FlowDeps;
use handoff_core::Config;
use std::env;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "handoff")]
#[command(about = "Verify a phone number by SMS and hand off to the app")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify a phone number and print the app link
    Verify {
        /// National phone number (prompted when omitted)
        #[arg(long)]
        phone: Option<String>,
        /// Open the app link without asking
        #[arg(long)]
        open: bool,
    },

    /// Print the onboarding link for an inbound authorization code
    Onboard {
        #[arg(long, conflicts_with = "url")]
        code: Option<String>,
        /// Landing-page URL carrying the `code` query parameter
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        open: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (stderr, so prompts stay readable)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,handoff_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Verify { phone, open } => cmd_verify(phone, open).await,
        Commands::Onboard { code, url, open } => cmd_onboard(code, url, open),
    }
}

// ============================================================================
// verify
// ============================================================================

async fn cmd_verify(phone: Option<String>, open_link: bool) -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    let coordinator = FlowDeps::from_config(&config)?.into_coordinator(&config);
    let theme = ColorfulTheme::default();

    let phone = if coordinator.resume() {
        let digits = coordinator
            .phone()
            .map(|p| p.digits().to_string())
            .unwrap_or_default();
        print_info(&format!(
            "{} に送信した認証コードの入力を再開します",
            format_phone(&digits)
        ));
        digits
    } else {
        send_first_code(&coordinator, &theme, phone).await?
    };

    let session = VerificationSession::new(coordinator.clone());
    enter_code(&session, &theme, &phone).await?;

    let redirect = coordinator
        .complete()
        .await
        .context("Verified without an app link")?;

    println!();
    println!("{}", style("電話番号の認証が完了しました").green().bold());
    println!("{}", redirect);

    let open_now = open_link
        || Confirm::with_theme(&theme)
            .with_prompt("アプリを開きますか？")
            .default(true)
            .interact()?;
    if open_now {
        open::that(redirect.as_str()).context("Failed to open app link")?;
    }

    Ok(())
}

async fn send_first_code(
    coordinator: &VerificationCoordinator,
    theme: &ColorfulTheme,
    mut phone: Option<String>,
) -> Result<String> {
    loop {
        let input = match phone.take() {
            Some(phone) => phone,
            None => Input::<String>::with_theme(theme)
                .with_prompt("電話番号")
                .validate_with(|input: &String| -> std::result::Result<(), &str> {
                    if validate_phone(&format_phone(input)) {
                        Ok(())
                    } else {
                        Err("電話番号は10桁または11桁で入力してください")
                    }
                })
                .interact_text()?,
        };

        // The entry field shows the formatted number, cut at 11 digits
        let input = format_phone(&input);
        println!(
            "{}",
            style(format!("{} に認証コードを送信しています…", input)).dim()
        );

        match coordinator.send_code(&input).await {
            Ok(()) => return Ok(input),
            Err(e) => print_error(&e),
        }
    }
}

async fn enter_code(
    session: &VerificationSession,
    theme: &ColorfulTheme,
    phone: &str,
) -> Result<()> {
    let coordinator = session.coordinator();

    loop {
        let input: String = Input::with_theme(theme)
            .with_prompt("認証コード (6桁 / r で再送信)")
            .interact_text()?;

        if input.trim().eq_ignore_ascii_case("r") {
            match coordinator.resend(phone).await {
                Ok(()) => print_info("認証コードを再送信しました"),
                Err(e) => print_error(&e),
            }
            continue;
        }

        match session.paste(&input).await {
            Some(Ok(())) => return Ok(()),
            Some(Err(e)) => {
                print_error(&e);
                if e.recommends_resend() {
                    print_info("r を入力すると認証コードを再送信できます");
                }
            }
            None => {
                session.clear();
                println!("{}", style("6桁の数字を入力してください").red());
            }
        }
    }
}

// ============================================================================
// onboard
// ============================================================================

fn cmd_onboard(code: Option<String>, url: Option<String>, open_link: bool) -> Result<()> {
    // Only the link settings are needed here, not the full configuration
    let _ = dotenvy::dotenv();
    let redirects = RedirectBuilder::new(
        env::var("APP_LINK_BASE").unwrap_or_else(|_| DEFAULT_APP_LINK_BASE.to_string()),
        env::var("APP_REAUTH_PATH").unwrap_or_else(|_| DEFAULT_REAUTH_PATH.to_string()),
    );

    let link = match (code, url) {
        (Some(code), _) => redirects.onboarding_link(&code),
        (None, Some(url)) => redirects.onboarding_link_from_query(&url),
        (None, None) => None,
    };

    let Some(link) = link else {
        println!("{}", style("認証コードが指定されていません").yellow());
        return Ok(());
    };

    println!("{}", link);
    if open_link {
        open::that(&link).context("Failed to open onboarding link")?;
    }
    Ok(())
}

// ============================================================================
// Output helpers
// ============================================================================

fn print_info(msg: &str) {
    println!("{}", style(msg).cyan());
}

fn print_error(err: &VerifyError) {
    println!("{}", style(err.user_message()).red());
}
