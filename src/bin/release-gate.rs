use {
    anyhow::Result,
    clap::{Args, Parser, Subcommand},
    log::error,
    release_gate::error::SpawnError,
};

#[derive(Parser)]
#[command(
    name = "release-gate",
    about = "Validate and publish the workspaces of a repository",
    version
)]
struct ReleaseGate {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        about = "Check that modified or unpublished workspaces are ready for release",
        visible_aliases = ["verify", "validate", "test"]
    )]
    Check(release_gate::check::CommandArgs),
    #[command(
        about = "Tag and publish modified or unpublished workspaces",
        visible_aliases = ["publish", "deploy"]
    )]
    Release(release_gate::release::CommandArgs),
    #[command(about = "List workspaces in dependency order")]
    List(release_gate::list::CommandArgs),
}

#[derive(Args, Debug)]
pub struct GlobalOptions {
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[tokio::main]
async fn main() {
    if let Err(err) = try_main().await {
        error!("Error: {err}");
        for (i, cause) in err.chain().skip(1).enumerate() {
            error!("  {}: {}", i.saturating_add(1), cause);
        }
        let code = match err.downcast_ref::<SpawnError>() {
            Some(spawn) => {
                for (key, value) in &spawn.env {
                    error!("{key}={value}");
                }
                error!("> {}", spawn.command);
                if !spawn.output.is_empty() {
                    error!("{}", spawn.output);
                }
                spawn.exit_code
            }
            None => 1,
        };
        std::process::exit(code);
    }
}

async fn try_main() -> Result<()> {
    let cli = ReleaseGate::parse();

    if cli.global.verbose {
        std::env::set_var("RUST_LOG", "debug");
    } else {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    match cli.command {
        Commands::Check(args) => release_gate::check::run(args).await?,
        Commands::Release(args) => release_gate::release::run(args).await?,
        Commands::List(args) => release_gate::list::run(args).await?,
    }

    Ok(())
}
