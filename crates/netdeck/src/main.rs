mod commands;
mod context;
mod utils;

use clap::{Parser, Subcommand};
use context::Context;
use netdeck_task::Credentials;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "netdeck")]
#[command(about = "Templated network configuration, deployed and checked stack by stack", long_about = None)]
#[command(version)]
struct Cli {
    /// Device login overriding the task API defaults (needs --password too)
    #[arg(long, global = true, env = "NETDECK_USERNAME")]
    username: Option<String>,
    /// Device password overriding the task API defaults
    #[arg(long, global = true, env = "NETDECK_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage service stacks
    #[command(subcommand)]
    Stack(StackCommands),
    /// Manage deployed service instances
    #[command(subcommand)]
    Service(ServiceCommands),
    /// List NetBox devices
    Devices {
        /// Show id, display name and URL for each device
        #[arg(short, long)]
        details: bool,
        /// Manufacturer id filter (repeatable; defaults to the configured set)
        #[arg(short, long = "manufacturer")]
        manufacturer: Vec<u32>,
    },
    /// Show the task API queue
    Tasks,
    /// Show one task from the task API
    Task {
        /// Task id
        id: String,
    },
    /// List task API workers
    Workers,
    /// Run a show command on a device and print the task result
    Show {
        /// Device name in NetBox
        device: String,
        /// Command to run
        command: String,
        /// Driver library (`auto` lets the task API choose)
        #[arg(short, long)]
        library: Option<String>,
    },
    /// Push configuration lines to a device
    Push {
        /// Device name in NetBox
        device: String,
        /// Configuration lines, in order
        #[arg(required = true)]
        lines: Vec<String>,
        /// Driver library (`auto` lets the task API choose)
        #[arg(short, long)]
        library: Option<String>,
        /// Validate the change without applying it
        #[arg(long)]
        dry_run: bool,
    },
    /// Work with configuration templates
    #[command(subcommand)]
    Templates(TemplateCommands),
    /// Record store maintenance
    #[command(subcommand)]
    Store(StoreCommands),
}

#[derive(Subcommand)]
enum StackCommands {
    /// Create stacks from a KDL or JSON bundle
    Create {
        /// Bundle file (.kdl or .json)
        file: PathBuf,
    },
    /// List stacks
    List,
    /// Show one stack
    Show {
        /// Stack id
        id: String,
    },
    /// Replace a stack's services and variables from a bundle
    Update {
        /// Stack id
        id: String,
        /// Bundle file (.kdl or .json)
        file: PathBuf,
    },
    /// Delete a stack record (its service instances are kept)
    Delete {
        /// Stack id
        id: String,
    },
    /// Deploy every service of a stack in order
    Deploy {
        /// Stack id
        id: String,
    },
    /// Compare each deployed instance with the live device configuration
    Validate {
        /// Stack id
        id: String,
    },
    /// Mark a stack stuck in `deploying` after an interrupted run as failed
    Reset {
        /// Stack id
        id: String,
    },
}

#[derive(Subcommand)]
enum ServiceCommands {
    /// Deploy a standalone service
    Create {
        /// Service name
        name: String,
        /// Template id (e.g. vlan.j2)
        #[arg(short, long)]
        template: String,
        /// Target device (repeatable)
        #[arg(short, long = "device", required = true)]
        devices: Vec<String>,
        /// Template variable as key=value (repeatable; values may be JSON)
        #[arg(short = 'e', long = "var")]
        vars: Vec<String>,
        /// Template run on delete
        #[arg(long)]
        reverse_template: Option<String>,
        /// Template used as the expected config during validation
        #[arg(long)]
        validation_template: Option<String>,
    },
    /// List service instances
    List {
        /// Only instances deployed by this stack
        #[arg(short, long)]
        stack: Option<String>,
    },
    /// Show one service instance and its task history
    Show {
        /// Instance id
        id: String,
    },
    /// Refresh the instance state from its last task
    Status {
        /// Instance id
        id: String,
    },
    /// Re-render with new variables and push
    Update {
        /// Instance id
        id: String,
        /// Template variable as key=value (repeatable; values may be JSON)
        #[arg(short = 'e', long = "var", required = true)]
        vars: Vec<String>,
    },
    /// Compare the instance with the live device configuration
    Validate {
        /// Instance id
        id: String,
    },
    /// Same as validate
    Health {
        /// Instance id
        id: String,
    },
    /// Push the stored configuration again
    Redeploy {
        /// Instance id
        id: String,
    },
    /// Remove the configuration from the device and delete the record
    Delete {
        /// Instance id
        id: String,
    },
}

#[derive(Subcommand)]
enum TemplateCommands {
    /// List template ids
    List,
    /// Create a template pair for a new service
    New {
        /// Service name (spaces become underscores)
        name: String,
        /// Target directory (defaults to the configured template directory)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum StoreCommands {
    /// Remove instance records that are empty or not valid JSON
    PurgeCorrupt,
    /// Remove every service instance record
    ClearInstances {
        /// Skip the confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let credentials = Credentials::from_parts(cli.username, cli.password);
    let ctx = Context::load()?;

    match cli.command {
        Commands::Stack(cmd) => match cmd {
            StackCommands::Create { file } => commands::stack::create(&ctx, &file).await?,
            StackCommands::List => commands::stack::list(&ctx).await?,
            StackCommands::Show { id } => commands::stack::show(&ctx, &id).await?,
            StackCommands::Update { id, file } => {
                commands::stack::update(&ctx, &id, &file).await?
            }
            StackCommands::Delete { id } => commands::stack::delete(&ctx, &id).await?,
            StackCommands::Deploy { id } => {
                commands::stack::deploy(&ctx, &id, &credentials).await?
            }
            StackCommands::Validate { id } => {
                commands::stack::validate(&ctx, &id, &credentials).await?
            }
            StackCommands::Reset { id } => commands::stack::reset(&ctx, &id).await?,
        },
        Commands::Service(cmd) => match cmd {
            ServiceCommands::Create {
                name,
                template,
                devices,
                vars,
                reverse_template,
                validation_template,
            } => {
                let args = commands::service::CreateArgs {
                    name,
                    template,
                    devices,
                    vars,
                    reverse_template,
                    validation_template,
                };
                commands::service::create(&ctx, args, &credentials).await?
            }
            ServiceCommands::List { stack } => {
                commands::service::list(&ctx, stack.as_deref()).await?
            }
            ServiceCommands::Show { id } => commands::service::show(&ctx, &id).await?,
            ServiceCommands::Status { id } => commands::service::status(&ctx, &id).await?,
            ServiceCommands::Update { id, vars } => {
                commands::service::update(&ctx, &id, &vars, &credentials).await?
            }
            ServiceCommands::Validate { id } | ServiceCommands::Health { id } => {
                commands::service::validate(&ctx, &id, &credentials).await?
            }
            ServiceCommands::Redeploy { id } => {
                commands::service::redeploy(&ctx, &id, &credentials).await?
            }
            ServiceCommands::Delete { id } => {
                commands::service::delete(&ctx, &id, &credentials).await?
            }
        },
        Commands::Devices {
            details,
            manufacturer,
        } => commands::devices::handle(&ctx, details, manufacturer).await?,
        Commands::Tasks => commands::tasks::queue(&ctx).await?,
        Commands::Task { id } => commands::tasks::show(&ctx, &id).await?,
        Commands::Workers => commands::tasks::workers(&ctx).await?,
        Commands::Show {
            device,
            command,
            library,
        } => {
            commands::tasks::getconfig(&ctx, &device, &command, library, &credentials).await?
        }
        Commands::Push {
            device,
            lines,
            library,
            dry_run,
        } => {
            let push = commands::tasks::PushArgs {
                device,
                lines,
                library,
                dry_run,
            };
            commands::tasks::setconfig(&ctx, push, &credentials).await?
        }
        Commands::Templates(cmd) => match cmd {
            TemplateCommands::List => commands::templates::list(&ctx)?,
            TemplateCommands::New { name, dir } => {
                commands::templates::scaffold(&ctx, &name, dir)?
            }
        },
        Commands::Store(cmd) => match cmd {
            StoreCommands::PurgeCorrupt => commands::store::purge_corrupt(&ctx).await?,
            StoreCommands::ClearInstances { yes } => {
                commands::store::clear_instances(&ctx, yes).await?
            }
        },
    }

    Ok(())
}
