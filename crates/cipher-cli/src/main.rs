mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use cipher_core::{ChannelState, Collaborator, LanguageCatalog, StudioConfig, TreeEntry};
use cipher_llm::{GeminiInference, InferenceService};
use cipher_session::{IdentityService, LocalFileIdentity};
use cipher_storage::{DocumentStore, JsonFileDocumentStore, ProjectSummary};
use cipher_workspace::WorkspaceController;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio::io::AsyncReadExt;

#[derive(Parser)]
#[command(name = "cipher")]
#[command(about = "Multi-language code workspace with AI-assisted tools")]
#[command(version)]
struct Cli {
    /// Directory holding the identity and stored projects
    #[arg(long, env = "CIPHER_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Namespace of persisted documents
    #[arg(long, env = "CIPHER_APP_ID")]
    app_id: Option<String>,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_key: Option<String>,

    #[arg(long, env = "GEMINI_MODEL")]
    model: Option<String>,

    /// Print results as JSON
    #[arg(long, default_value = "false")]
    json: bool,

    /// Enable debug logging
    #[arg(long, short, default_value = "false")]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported languages
    Languages,
    /// Create and save a project from a language template
    New {
        language: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// List stored projects, most recently updated first
    Projects,
    /// Print a project's file tree and its selected file
    Show {
        project: String,
        #[arg(long)]
        path: Option<String>,
    },
    /// Create a file, or a folder with --folder
    Add {
        project: String,
        path: String,
        #[arg(long)]
        folder: bool,
    },
    /// Rename a file or move a folder
    Mv { project: String, from: String, to: String },
    /// Delete a file or folder
    Rm { project: String, path: String },
    /// Replace a file's content from a local file or stdin
    Edit {
        project: String,
        path: String,
        #[arg(long)]
        from: Option<PathBuf>,
    },
    /// Predict the console output of a file
    Simulate {
        project: String,
        #[arg(long)]
        path: Option<String>,
    },
    /// Explain a file
    Explain {
        project: String,
        #[arg(long)]
        path: Option<String>,
    },
    /// Review a file for bugs and style
    Review {
        project: String,
        #[arg(long)]
        path: Option<String>,
    },
    /// Convert a file into another language
    Convert {
        project: String,
        target: String,
        #[arg(long)]
        path: Option<String>,
    },
    /// Generate code from a description in the project's language
    Generate { project: String, description: String },
    /// Delete a stored project
    Delete { project: String },
    /// Simulate a local source file without a project
    Run { language: String, file: PathBuf },
}

fn load_config(cli: &Cli) -> StudioConfig {
    let mut config = StudioConfig::load();
    if let Some(dir) = &cli.data_dir {
        config.data_dir = Some(dir.clone());
    }
    if let Some(app_id) = &cli.app_id {
        config.app_namespace = app_id.clone();
    }
    if let Some(key) = &cli.gemini_key {
        config.inference.api_key = Some(key.clone());
    }
    if let Some(model) = &cli.model {
        config.inference.model = model.clone();
    }
    // Each invocation is one-shot; edits are saved explicitly.
    config.autosave_enabled = false;
    config
}

fn build_controller(config: &StudioConfig) -> WorkspaceController {
    let data_dir = config.resolved_data_dir();
    log::debug!("Using data directory {}", data_dir.display());

    let identity: Arc<dyn IdentityService> = Arc::new(LocalFileIdentity::new(&data_dir));
    let store: Arc<dyn DocumentStore> = Arc::new(JsonFileDocumentStore::new(data_dir.join("projects")));
    let inference: Collaborator<dyn InferenceService> = GeminiInference::from_config(&config.inference)
        .map(|gemini| Arc::new(gemini) as Arc<dyn InferenceService>)
        .into();
    if !inference.is_available() {
        log::warn!("GEMINI_API_KEY is not set; AI tools are unavailable");
    }

    WorkspaceController::from_config(
        config,
        Collaborator::available(identity),
        Collaborator::available(store),
        inference,
    )
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.debug);

    let config = load_config(&cli);
    let studio = build_controller(&config);
    studio.bootstrap().await;

    let result = run(&cli, &studio).await;
    studio.shutdown();
    result
}

async fn run(cli: &Cli, studio: &WorkspaceController) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Languages => {
            let catalog = LanguageCatalog::global();
            for id in catalog.language_ids() {
                let template = catalog.get_or_default(id);
                println!("{} {:<12} {}", template.icon, id.bold(), template.description);
            }
            Ok(())
        }
        Commands::New { language, name } => {
            studio.switch_language(language).await?;
            studio.save_project(name.as_deref()).await?;
            let ws = studio.workspace().await;
            let id = ws.project_id().unwrap_or_default();
            if cli.json {
                println!("{}", serde_json::json!({ "id": id, "languageId": ws.language_id() }));
            } else {
                println!("{} {}", "Created".green(), id);
            }
            Ok(())
        }
        Commands::Projects => {
            let projects = studio.list_projects().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&projects)?);
                return Ok(());
            }
            if projects.is_empty() {
                println!("{}", "No saved projects.".dimmed());
            }
            for project in projects {
                let updated = project
                    .updated_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!(
                    "{}  {:<24} {:<10} {}",
                    project.id,
                    project.name.bold(),
                    project.language_id,
                    updated.dimmed()
                );
            }
            Ok(())
        }
        Commands::Show { project, path } => {
            open(studio, project, path.as_deref()).await?;
            let ws = studio.workspace().await;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "languageId": ws.language_id(),
                        "selectedPath": ws.selected_path(),
                        "tree": ws.files().tree_view(),
                    })
                );
                return Ok(());
            }
            print_tree(&ws.files().tree_view(), 0, ws.selected_path());
            println!("\n{}", format!("── {} ──", ws.selected_path()).cyan());
            println!("{}", ws.active_content());
            Ok(())
        }
        Commands::Add { project, path, folder } => {
            let summary = open(studio, project, None).await?;
            let node = studio.create_path(path, *folder).await?;
            persist(studio, &summary).await?;
            println!("{} {}", "Created".green(), node.path);
            Ok(())
        }
        Commands::Mv { project, from, to } => {
            let summary = open(studio, project, None).await?;
            let moved = studio.rename_path(from, to).await?;
            persist(studio, &summary).await?;
            for (old, new) in moved {
                println!("{} -> {}", old, new);
            }
            Ok(())
        }
        Commands::Rm { project, path } => {
            let summary = open(studio, project, None).await?;
            let removed = studio.delete_path(path).await?;
            if removed.is_empty() {
                bail!("Nothing to delete at {}", path);
            }
            persist(studio, &summary).await?;
            for node in removed {
                println!("{} {}", "Deleted".red(), node.path);
            }
            Ok(())
        }
        Commands::Edit { project, path, from } => {
            let content = match from {
                Some(file) => tokio::fs::read_to_string(file)
                    .await
                    .with_context(|| format!("Failed to read {}", file.display()))?,
                None => {
                    let mut buf = String::new();
                    tokio::io::stdin().read_to_string(&mut buf).await?;
                    buf
                }
            };
            let summary = open(studio, project, None).await?;
            studio.update_file_content(path, &content).await?;
            persist(studio, &summary).await?;
            println!("{} {}", "Updated".green(), path);
            Ok(())
        }
        Commands::Simulate { project, path } => {
            open(studio, project, path.as_deref()).await?;
            match studio.simulate_active().await {
                Some(output) => println!("{}", output),
                None => println!(
                    "{}",
                    "This language is previewed directly; nothing to simulate.".dimmed()
                ),
            }
            Ok(())
        }
        Commands::Explain { project, path } => {
            open(studio, project, path.as_deref()).await?;
            report(studio.explain().await)
        }
        Commands::Review { project, path } => {
            open(studio, project, path.as_deref()).await?;
            report(studio.review().await)
        }
        Commands::Convert { project, target, path } => {
            open(studio, project, path.as_deref()).await?;
            report(studio.convert(target).await?)
        }
        Commands::Generate { project, description } => {
            open(studio, project, None).await?;
            report(studio.generate(description).await)
        }
        Commands::Delete { project } => {
            studio.delete_project(project).await?;
            println!("{} {}", "Deleted".red(), project);
            Ok(())
        }
        Commands::Run { language, file } => {
            let content = tokio::fs::read_to_string(file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            studio.switch_language(language).await?;
            let entry = studio.workspace().await.selected_path().to_string();
            studio.update_file_content(&entry, &content).await?;
            match studio.simulate_active().await {
                Some(output) => println!("{}", output),
                None => bail!("{} is not simulated", language),
            }
            Ok(())
        }
    }
}

/// Load `project` and optionally select `path` in it.
async fn open(
    studio: &WorkspaceController,
    project: &str,
    path: Option<&str>,
) -> anyhow::Result<ProjectSummary> {
    let summary = studio
        .load_project(project)
        .await?
        .context("No session is available")?;
    if let Some(path) = path {
        studio.select_path(path).await?;
    }
    Ok(summary)
}

/// Save the live workspace back under its stored name.
async fn persist(studio: &WorkspaceController, summary: &ProjectSummary) -> anyhow::Result<()> {
    studio.save_project(Some(summary.name.as_str())).await?;
    Ok(())
}

fn report(state: ChannelState) -> anyhow::Result<()> {
    match state {
        ChannelState::Succeeded(text) => {
            println!("{}", text);
            Ok(())
        }
        ChannelState::Failed(message) => bail!(message),
        ChannelState::Idle | ChannelState::Pending => bail!("The tool produced no result"),
    }
}

fn print_tree(entries: &[TreeEntry], depth: usize, selected: &str) {
    for entry in entries {
        let indent = "  ".repeat(depth);
        if entry.is_folder {
            println!("{}{}/", indent, entry.name.blue().bold());
            print_tree(&entry.children, depth + 1, selected);
        } else if entry.path == selected {
            println!("{}{} {}", indent, entry.name.bold(), "*".yellow());
        } else {
            println!("{}{}", indent, entry.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_apply_on_top_of_config() {
        let cli = Cli::parse_from([
            "cipher",
            "--data-dir",
            "/tmp/cipher-test",
            "--app-id",
            "studio",
            "--model",
            "gemini-test",
            "languages",
        ]);
        let config = load_config(&cli);
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/cipher-test")));
        assert_eq!(config.app_namespace, "studio");
        assert_eq!(config.inference.model, "gemini-test");
        assert!(!config.autosave_enabled);
    }

    #[test]
    fn subcommands_parse() {
        let cli = Cli::parse_from(["cipher", "convert", "abc", "Rust", "--path", "/main.py"]);
        match cli.command {
            Commands::Convert { project, target, path } => {
                assert_eq!(project, "abc");
                assert_eq!(target, "Rust");
                assert_eq!(path.as_deref(), Some("/main.py"));
            }
            _ => panic!("expected convert"),
        }
    }
}
