use std::path::PathBuf;

use clap::{Parser, Subcommand};

use trellis_catalog::store::{CatalogStore, SqliteCatalogStore};
use trellis_catalog::types::{Edge, NodeInput};
use trellis_web::WebConfig;

#[derive(Parser)]
#[command(name = "trellis")]
#[command(about = "Data-lineage catalog service")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file; flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the catalog API server
    Serve {
        /// Listen address, e.g. 0.0.0.0:8080
        #[arg(long, env = "TRELLIS_LISTEN")]
        listen: Option<String>,

        /// Path to the SQLite database
        #[arg(long, env = "TRELLIS_DB")]
        db: Option<String>,

        /// JWT signing secret
        #[arg(long, env = "TRELLIS_JWT_SECRET")]
        jwt_secret: Option<String>,

        /// Roles JSON file (role name -> permission strings)
        #[arg(long, env = "TRELLIS_ROLES_FILE")]
        roles_file: Option<String>,
    },

    /// Create the database schema, optionally with demo lineage data
    Init {
        #[arg(long, env = "TRELLIS_DB")]
        db: Option<String>,

        /// Seed a small demo graph
        #[arg(long)]
        demo: bool,
    },

    /// Mint a signed JWT for a principal (operator tooling)
    Token {
        /// Principal id (JWT subject)
        subject: String,

        /// Role claim, e.g. admin, steward, editor, viewer
        #[arg(long)]
        role: Option<String>,

        #[arg(long, env = "TRELLIS_JWT_SECRET")]
        jwt_secret: Option<String>,
    },
}

fn load_config(path: &Option<PathBuf>) -> anyhow::Result<WebConfig> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        }
        None => Ok(WebConfig::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("trellis=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = load_config(&cli.config)?;

    match cli.command {
        Commands::Serve {
            listen,
            db,
            jwt_secret,
            roles_file,
        } => {
            if let Some(listen) = listen {
                config.listen_addr = listen;
            }
            if let Some(db) = db {
                config.db_path = db;
            }
            if let Some(secret) = jwt_secret {
                config.jwt_secret = secret;
            }
            if let Some(roles_file) = roles_file {
                config.roles_file = Some(roles_file);
            }
            trellis_web::start_web_server(config).await
        }

        Commands::Init { db, demo } => {
            let db_path = db.unwrap_or(config.db_path);
            let store = SqliteCatalogStore::open(&db_path)?;
            store.migrate().await?;
            tracing::info!("database ready at {db_path}");
            if demo {
                seed_demo(&store).await?;
                tracing::info!("demo lineage graph seeded");
            }
            Ok(())
        }

        Commands::Token {
            subject,
            role,
            jwt_secret,
        } => {
            let secret = jwt_secret.unwrap_or(config.jwt_secret);
            let token = trellis_auth::create_jwt(&subject, role.as_deref(), &secret)?;
            println!("{token}");
            Ok(())
        }
    }
}

async fn seed_demo(store: &dyn CatalogStore) -> anyhow::Result<()> {
    let nodes = [
        ("sys-crm", "CRM", "system", None),
        ("ds-sales", "Sales", "dataset", Some(("external_id", "crm.sales"))),
        ("tbl-orders", "orders", "table", None),
        ("fld-total", "total", "field", Some(("data_type", "decimal"))),
        ("met-revenue", "Monthly revenue", "metric", None),
    ];
    for (id, name, node_type, attr) in nodes {
        if store.get_node(id).await?.is_some() {
            continue;
        }
        let mut input = NodeInput {
            id: Some(id.to_string()),
            node_type: Some(node_type.to_string()),
            name: name.to_string(),
            ..NodeInput::default()
        };
        if let Some((key, value)) = attr {
            input
                .attrs
                .insert(key.to_string(), serde_json::Value::String(value.to_string()));
        }
        store.insert_node(&input).await?;
    }

    let edges = [
        ("sys-crm", "ds-sales", "contains"),
        ("ds-sales", "tbl-orders", "contains"),
        ("tbl-orders", "fld-total", "contains"),
        ("met-revenue", "fld-total", "derived_from"),
    ];
    for (from, to, edge_type) in edges {
        store
            .add_edge(&Edge {
                from_id: from.to_string(),
                to_id: to.to_string(),
                edge_type: edge_type.to_string(),
            })
            .await?;
    }
    Ok(())
}
