mod config;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use pulse_surveys::domain::identifier::parse_reference;
use pulse_surveys::infra::identity::StaticIdentityProvider;
use pulse_surveys::infra::mail::LogMailer;
use pulse_surveys::infra::storage::SeaOrmStore;
use pulse_surveys::infra::system::{RandomCodeGenerator, SystemClock};
use pulse_surveys::{PulseSurveysClient, PulseSurveysLocalClient, Service, ServiceDeps};
use pulse_surveys_sdk::{
    Actor, ActorRole, CompanyRef, Invitation, InvitationTarget, NewInvitation, PulseSurveysError,
    SurveyStatus,
};
use uuid::Uuid;

use crate::config::AppConfig;

/// Pulse surveys operator tool
#[derive(Parser)]
#[command(name = "pulse-surveys")]
#[command(about = "Pulse surveys operator tool: lifecycle, invitations and response rates")]
#[command(version)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum RoleArg {
    Operator,
    CompanyAdmin,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Validate configuration and exit
    Check,
    /// Request a survey status transition
    Transition {
        #[arg(long)]
        survey: Uuid,
        /// Target status (draft, scheduled, active, completed)
        #[arg(long)]
        to: SurveyStatus,
        #[arg(long, value_enum, default_value = "operator")]
        actor_role: RoleArg,
        /// Company of a company admin: canonical id or name
        #[arg(long, required_if_eq("actor_role", "company-admin"))]
        actor_company: Option<String>,
    },
    /// Issue an invitation and mail it
    IssueInvite {
        /// Survey the invitee may respond to
        #[arg(long, conflicts_with = "company", requires = "survey_company")]
        survey: Option<Uuid>,
        /// Company the survey invitee responds for: canonical id or name
        #[arg(long)]
        survey_company: Option<String>,
        /// Company the invitee joins
        #[arg(long, required_unless_present = "survey")]
        company: Option<Uuid>,
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        /// Validity window in days (configured default when omitted)
        #[arg(long)]
        days: Option<u32>,
    },
    /// Refresh and re-mail an unredeemed invitation
    ResendInvite {
        #[arg(long)]
        id: Uuid,
    },
    /// Show the response rate of a survey
    Rate {
        #[arg(long)]
        survey: Uuid,
    },
    /// Detach a deleted user from their responses
    AnonymizeUser {
        #[arg(long)]
        user: Uuid,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    logging::init(&config.logging, cli.verbose);

    if cli.print_config {
        println!("{}", config.render()?);
        return Ok(ExitCode::SUCCESS);
    }

    match cli.command {
        None | Some(Commands::Check) => {
            println!("Configuration is valid");
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Migrate) => {
            let store = SeaOrmStore::connect(&config.database.dsn).await?;
            store.migrate().await?;
            tracing::info!("migrations applied");
            println!("Migrations applied");
            Ok(ExitCode::SUCCESS)
        }
        Some(command) => {
            let client = connect(&config).await?;
            match execute(&client, command).await {
                Ok(()) => Ok(ExitCode::SUCCESS),
                Err(e) => {
                    eprintln!("{}", e.user_message());
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

async fn connect(config: &AppConfig) -> Result<PulseSurveysLocalClient> {
    let store = SeaOrmStore::connect(&config.database.dsn).await?;
    store.migrate().await?;

    let settings = &config.pulse_surveys;
    let service = Service::new(
        ServiceDeps {
            store: Arc::new(store),
            mailer: Arc::new(LogMailer),
            identity: Arc::new(StaticIdentityProvider::new()),
            clock: Arc::new(SystemClock),
            codes: Arc::new(RandomCodeGenerator::new(
                settings.survey_code_bytes,
                settings.join_code_length,
            )),
        },
        settings.clone(),
    );
    Ok(PulseSurveysLocalClient::new(Arc::new(service)))
}

fn company_ref(raw: &str) -> Result<CompanyRef, PulseSurveysError> {
    parse_reference(raw).ok_or_else(|| PulseSurveysError::validation("company must not be empty"))
}

/// The CLI runs with operator authority unless told to act as a company admin.
fn actor(role: RoleArg, company: Option<&str>) -> Result<Actor, PulseSurveysError> {
    match role {
        RoleArg::Operator => Ok(Actor::operator_admin(Uuid::nil())),
        RoleArg::CompanyAdmin => {
            let company = company.ok_or_else(|| {
                PulseSurveysError::validation("--actor-company is required for company admins")
            })?;
            Ok(Actor::company_admin(Uuid::nil(), company_ref(company)?))
        }
    }
}

fn print_invitation(invitation: &Invitation) {
    println!("invitation {}", invitation.id);
    println!("  email:      {}", invitation.email);
    println!("  code:       {}", invitation.code);
    println!("  issued_at:  {}", invitation.issued_at);
    println!("  expires_at: {}", invitation.expires_at);
}

async fn execute(client: &dyn PulseSurveysClient, command: Commands) -> Result<(), PulseSurveysError> {
    let operator = Actor::operator_admin(Uuid::nil());

    match command {
        Commands::Transition {
            survey,
            to,
            actor_role,
            actor_company,
        } => {
            let actor = actor(actor_role, actor_company.as_deref())?;
            let updated = client.request_transition(&actor, survey, to).await?;
            println!("survey {} is now {}", updated.id, updated.status);
        }
        Commands::IssueInvite {
            survey,
            survey_company,
            company,
            email,
            name,
            days,
        } => {
            let target = match (survey, company) {
                (Some(survey_id), _) => InvitationTarget::Survey {
                    survey_id,
                    company: company_ref(survey_company.as_deref().unwrap_or_default())?,
                },
                (None, Some(company_id)) => InvitationTarget::Company { company_id },
                (None, None) => {
                    return Err(PulseSurveysError::validation(
                        "either --survey or --company is required",
                    ));
                }
            };
            let role = match target {
                InvitationTarget::Company { .. } => ActorRole::CompanyAdmin,
                InvitationTarget::Survey { .. } => ActorRole::Member,
            };
            let invitation = client
                .issue_invitation(
                    &operator,
                    NewInvitation {
                        target,
                        email,
                        display_name: name,
                        role,
                        expiry_days: days,
                    },
                )
                .await?;
            print_invitation(&invitation);
        }
        Commands::ResendInvite { id } => {
            let invitation = client.resend_invitation(&operator, id).await?;
            print_invitation(&invitation);
        }
        Commands::Rate { survey } => {
            let rate = client.response_rate(survey).await?;
            println!(
                "{}/{} responded ({}%)",
                rate.responded, rate.eligible, rate.pct
            );
        }
        Commands::AnonymizeUser { user } => {
            let touched = client.anonymize_user_responses(user).await?;
            println!("{touched} responses anonymized");
        }
        Commands::Migrate | Commands::Check => {}
    }

    Ok(())
}
