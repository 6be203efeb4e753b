use clap::Subcommand;
use serde_json::json;

use crate::cli::{config, gateway, utils, OutputFormat};
use crate::panel::forms::{self, LoginFlow, RegisterFlow, SubmitOutcome};
use crate::panel::gateway::IdentityGateway;
use crate::validation::RegistrationForm;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Register a new account")]
    Register {
        #[arg(help = "Email address")]
        email: String,
        #[arg(long, help = "Password")]
        password: String,
        #[arg(long, help = "Password confirmation")]
        confirm_password: String,
        #[arg(long, help = "Display name shown in the panel")]
        display_name: Option<String>,
    },

    #[command(about = "Login and store the session")]
    Login {
        #[arg(help = "Email address")]
        email: String,
        #[arg(long, help = "Password")]
        password: String,
    },

    #[command(about = "Logout and clear the stored session")]
    Logout,

    #[command(about = "Show the current user according to the server")]
    Whoami,

    #[command(about = "Show the locally stored session state")]
    Status,
}

pub async fn handle(cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Register {
            email,
            password,
            confirm_password,
            display_name,
        } => {
            let (gateway, _) = gateway()?;
            let form = RegistrationForm {
                display_name: display_name.unwrap_or_default(),
                email,
                password,
                confirm_password,
            };

            let mut flow = RegisterFlow::new(&*gateway);
            match flow.submit(&form).await {
                SubmitOutcome::Completed(message) => {
                    utils::output_success(&output_format, &message, None)
                }
                SubmitOutcome::Invalid(errors) => {
                    utils::output_field_errors(&output_format, &errors)?;
                    std::process::exit(1);
                }
                SubmitOutcome::Rejected(message) => {
                    utils::output_error(&output_format, &message)?;
                    std::process::exit(1);
                }
            }
        }

        AuthCommands::Login { email, password } => {
            let (gateway, mut cfg) = gateway()?;

            let mut flow = LoginFlow::new(&*gateway);
            match flow.submit(&email, &password).await {
                SubmitOutcome::Completed((session, _route)) => {
                    cfg.token = Some(session.token.clone());
                    cfg.user = Some(session.user.clone());
                    config::save_config(&cfg)?;

                    utils::output_success(
                        &output_format,
                        &format!("Logged in as {}", session.user.display_label()),
                        Some(json!({ "user": session.user })),
                    )
                }
                SubmitOutcome::Invalid(errors) => {
                    utils::output_field_errors(&output_format, &errors)?;
                    std::process::exit(1);
                }
                SubmitOutcome::Rejected(message) => {
                    utils::output_error(&output_format, &message)?;
                    std::process::exit(1);
                }
            }
        }

        AuthCommands::Logout => {
            let (gateway, mut cfg) = gateway()?;

            // Always succeeds locally, whatever the transport says.
            forms::sign_out(&*gateway).await;
            cfg.clear_session();
            config::save_config(&cfg)?;

            utils::output_success(&output_format, "Logged out", None)
        }

        AuthCommands::Whoami => {
            let (gateway, _) = gateway()?;

            match gateway.current_user().await {
                Ok(Some(user)) => utils::output_success(
                    &output_format,
                    &format!("{} <{}>", user.display_label(), user.email),
                    Some(json!({ "user": user })),
                ),
                Ok(None) => {
                    utils::output_error(&output_format, "Not logged in")?;
                    std::process::exit(1);
                }
                Err(e) => {
                    utils::output_error(&output_format, &e.to_string())?;
                    std::process::exit(1);
                }
            }
        }

        AuthCommands::Status => {
            let cfg = config::load_config()?;
            match &cfg.user {
                Some(user) => utils::output_success(
                    &output_format,
                    &format!("Session stored for {} <{}> at {}", user.display_label(), user.email, cfg.server_url),
                    Some(json!({ "server_url": cfg.server_url, "user": user })),
                ),
                None => utils::output_success(
                    &output_format,
                    &format!("No session stored, server is {}", cfg.server_url),
                    Some(json!({ "server_url": cfg.server_url })),
                ),
            }
        }
    }
}
