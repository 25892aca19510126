use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use physgraph::classify::LayoutMode;
use physgraph::server;
use physgraph::session::{DEFAULT_CANVAS_WIDTH, GraphSession};
use physgraph::store::JsonFileStore;
use physgraph::taxonomy::Taxonomy;

/// Graph model and layout engine for a physics wiki.
#[derive(Parser)]
#[command(name = "physgraph")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lay out a stored graph once and write the result as JSON
    Layout {
        /// Stored graph document (.json)
        #[arg(short, long)]
        store: PathBuf,

        /// Taxonomy file (.yaml); the bundled physics taxonomy when omitted
        #[arg(short, long)]
        taxonomy: Option<PathBuf>,

        /// Layout mode: chronological or network
        #[arg(short, long, default_value = "chronological")]
        mode: LayoutMode,

        /// Canvas width of the chronological layout
        #[arg(short, long, default_value_t = DEFAULT_CANVAS_WIDTH)]
        width: f64,

        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Serve layouts over HTTP, reloading when the store changes
    Serve {
        /// Stored graph document (.json)
        #[arg(short, long)]
        store: PathBuf,

        /// Taxonomy file (.yaml); the bundled physics taxonomy when omitted
        #[arg(short, long)]
        taxonomy: Option<PathBuf>,

        /// Port to run the server on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

fn load_taxonomy(path: Option<&Path>) -> anyhow::Result<Taxonomy> {
    match path {
        Some(path) => Taxonomy::from_yaml_path(path)
            .with_context(|| format!("failed to load taxonomy {}", path.display())),
        None => Ok(Taxonomy::physics()),
    }
}

async fn layout(
    store: &Path,
    taxonomy: Option<&Path>,
    mode: LayoutMode,
    width: f64,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let mut session = GraphSession::new(load_taxonomy(taxonomy)?)
        .with_canvas_width(width)
        .with_mode(mode);
    session
        .load(&JsonFileStore::new(store))
        .await
        .with_context(|| format!("failed to load {}", store.display()))?;

    let view = session
        .current()
        .ok_or_else(|| anyhow::anyhow!("no layout computed"))?;
    let json = serde_json::to_string_pretty(view)?;

    match output {
        Some(path) => {
            fs::write(path, json)?;
            tracing::info!(
                nodes = view.nodes.len(),
                edges = view.edges.len(),
                "wrote {mode} layout to {}",
                path.display()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("physgraph=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Layout {
            store,
            taxonomy,
            mode,
            width,
            output,
        } => {
            layout(&store, taxonomy.as_deref(), mode, width, output.as_deref()).await?;
        }
        Commands::Serve {
            store,
            taxonomy,
            port,
        } => {
            let session = GraphSession::new(load_taxonomy(taxonomy.as_deref())?);
            server::serve(session, JsonFileStore::new(store), port).await?;
        }
    }

    Ok(())
}
