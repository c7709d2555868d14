use ampersand_tools::services::config::ConfigOverrides;
use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Transport {
    Stdio,
}

#[derive(Parser, Debug)]
#[command(name = "ampersand-mcp")]
#[command(about = "MCP server exposing Ampersand connections, installations, writes and proxy calls")]
#[command(version)]
struct Cli {
    /// Transport to serve on
    #[arg(long, value_enum, default_value = "stdio")]
    transport: Transport,

    /// Ampersand project id (falls back to AMPERSAND_PROJECT_ID)
    #[arg(long)]
    project: Option<String>,

    /// Integration name (falls back to AMPERSAND_INTEGRATION_NAME)
    #[arg(long = "integration-name", alias = "integrationName")]
    integration_name: Option<String>,

    /// Default group reference (falls back to AMPERSAND_GROUP_REF)
    #[arg(long = "group-ref", alias = "groupRef")]
    group_ref: Option<String>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            api_key: None,
            project_id: self.project.clone(),
            integration_name: self.integration_name.clone(),
            group_ref: self.group_ref.clone(),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let result = match cli.transport {
        Transport::Stdio => ampersand_tools::mcp::server::run_stdio(cli.overrides()).await,
    };
    if let Err(err) = result {
        eprintln!("ampersand-mcp: {}", err);
        std::process::exit(1);
    }
}
