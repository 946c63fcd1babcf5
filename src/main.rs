use anyhow::Result;
use clap::{CommandFactory, Parser};
use lafal::app::{load_config, run_predict, run_serve};
use lafal::classifier::{Classifier, RandomForest};
use lafal::cli::{Cli, Commands, ConfigAction, ModelsAction};
use lafal::config::Config;
use lafal::models::{ModelStatus, ensure_model, model_status};
use owo_colors::OwoColorize;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    lafal::logging::init(cli.quiet, cli.verbose);

    match cli.command {
        Commands::Serve { bind, no_download } => {
            let config = load_config(cli.config.as_deref())?;
            run_serve(config, bind, no_download, cli.quiet).await?;
        }
        Commands::Predict {
            audio,
            email,
            no_history,
            no_download,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let prediction =
                run_predict(&config, &audio, &email, no_history, no_download, cli.quiet).await?;
            println!("{}", serde_json::to_string(&prediction)?);
        }
        Commands::Models { action } => {
            let config = load_config(cli.config.as_deref())?;
            handle_models_command(action, &config).await?;
        }
        Commands::Config { action } => {
            handle_config_command(action, cli.config.as_deref())?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "lafal", &mut std::io::stdout());
        }
    }

    Ok(())
}

async fn handle_models_command(action: ModelsAction, config: &Config) -> Result<()> {
    match action {
        ModelsAction::Install => {
            let path = ensure_model(&config.model, true, true).await?;
            println!("Classifier available at {}", path.display());
        }
        ModelsAction::Status => match model_status(&config.model) {
            ModelStatus::Installed { path, size_bytes } => {
                println!("{} {} ({} bytes)", "installed".green(), path.display(), size_bytes);
                match RandomForest::load(&path) {
                    Ok(forest) => {
                        println!(
                            "  version {}, {} trees, {} features",
                            forest.version(),
                            forest.n_trees(),
                            forest.n_features()
                        );
                    }
                    Err(e) => println!("  {} {e}", "unloadable:".red()),
                }
            }
            ModelStatus::Missing { path } => {
                println!("{} {}", "missing".yellow(), path.display());
                match &config.model.url {
                    Some(url) => println!("  Run 'lafal models install' to fetch it from {url}"),
                    None => println!("  Set model.url or place the artifact at this path"),
                }
            }
        },
    }
    Ok(())
}

fn handle_config_command(action: ConfigAction, custom_path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Path => {
            let path = custom_path
                .map(Path::to_path_buf)
                .unwrap_or_else(Config::default_path);
            println!("{}", path.display());
        }
        ConfigAction::Show => {
            let config = load_config(custom_path)?;
            print!("{}", config.to_display_toml()?);
        }
    }
    Ok(())
}
