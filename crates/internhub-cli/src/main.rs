//! InternHub CLI - the student dashboard in a terminal.
//!
//! Signs in against the InternHub backend, keeps the session between runs,
//! and shows the protected dashboard and profile views.

mod app;
mod views;

use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use internhub_core::auth::{ProtectedView, ViewOutcome};
use internhub_core::models::RegisterRequest;
use internhub_core::Config;

use app::App;
use views::{DashboardView, ProfileView};

const USAGE: &str = "\
Usage: internhub <command>

Commands:
  login [email]   Sign in and remember the session
  register        Create an account
  logout          Forget the stored session
  whoami          Print the signed-in user as JSON
  dashboard       Show the student dashboard
  profile         Show your profile";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let Some(command) = args.get(1).map(String::as_str) else {
        eprintln!("{}", USAGE);
        return Ok(());
    };

    let (config, config_loaded) = match Config::load() {
        Ok(c) => (c, true),
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            (Config::default(), false)
        }
    };

    let mut app = App::new(config)?;
    app.persist_config = config_loaded;
    info!(command, "InternHub CLI starting");

    match command {
        "login" => {
            app.bootstrap().await;
            let email = match args.get(2) {
                Some(email) => email.clone(),
                None => prompt("Email", app.config.last_email.as_deref())?,
            };
            let password = rpassword::prompt_password("Password: ")?;
            if app.attempt_login(&email, &password).await.is_err() {
                anyhow::bail!(app.login_error.take().unwrap_or_else(|| "Login failed".to_string()));
            }
            println!("Login successful!");
        }
        "register" => {
            app.bootstrap().await;
            let request = prompt_registration()?;
            if app.attempt_register(&request).await.is_err() {
                anyhow::bail!(app.login_error.take().unwrap_or_else(|| "Registration failed".to_string()));
            }
            println!("Account created. You are signed in.");
        }
        "logout" => {
            app.logout();
            println!("Signed out.");
        }
        "whoami" => {
            app.bootstrap().await;
            match app.session() {
                Some(session) => println!("{}", serde_json::to_string_pretty(&session.user)?),
                None => println!("Not signed in."),
            }
        }
        "dashboard" => {
            app.bootstrap().await;
            show(&app, &DashboardView)?;
        }
        "profile" => {
            app.bootstrap().await;
            if let Err(e) = app.refresh_user().await {
                warn!(error = %e, "Could not refresh profile");
            }
            show(&app, &ProfileView)?;
        }
        other => {
            eprintln!("Unknown command: {}\n\n{}", other, USAGE);
            anyhow::bail!("Unknown command: {}", other);
        }
    }

    app.teardown()?;
    info!("InternHub CLI shutting down");
    Ok(())
}

fn show(app: &App, view: &dyn ProtectedView) -> Result<()> {
    match app.open(view) {
        ViewOutcome::Content(body) => print!("{}", body),
        ViewOutcome::Redirect(to) => {
            println!("Not signed in. Run `internhub login` to continue ({}).", to);
        }
        ViewOutcome::Blank => {}
    }
    io::stdout().flush()?;
    Ok(())
}

fn prompt(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(value) => print!("{} [{}]: ", label, value),
        None => print!("{}: ", label),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input).context("Failed to read input")?;
    let input = input.trim();

    if input.is_empty() {
        Ok(default.unwrap_or_default().to_string())
    } else {
        Ok(input.to_string())
    }
}

fn optional(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn prompt_registration() -> Result<RegisterRequest> {
    Ok(RegisterRequest {
        name: prompt("Name", None)?,
        email: prompt("Email", None)?,
        phone: prompt("Phone", None)?,
        password: rpassword::prompt_password("Password: ")?,
        college: optional(prompt("College (optional)", None)?),
        city: optional(prompt("City (optional)", None)?),
    })
}
