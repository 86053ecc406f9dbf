use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgGroup, Parser};
use log::error;
use serde_json::Value;

use dnac_inventory::{load_inventory, DnacError, DnacResult, InventoryConfig, InventoryError};

/// Dynamic inventory of the devices and sites known to a DNA Center
/// controller.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("output").args(["list", "graph", "host"])))]
struct Cli {
    /// Inventory source, a file ending in dna_center.yml.
    #[arg(short = 'i', long, env = "DNAC_INVENTORY")]
    inventory: PathBuf,

    /// Print the whole inventory as JSON (default).
    #[arg(long)]
    list: bool,

    /// Print the group tree, optionally starting at GROUP.
    #[arg(long, value_name = "GROUP", num_args = 0..=1, default_missing_value = "all")]
    graph: Option<String>,

    /// Print the variables of one host as JSON.
    #[arg(long, value_name = "NAME")]
    host: Option<String>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or(cli.log_level()));

    match run(&cli).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            eprintln!("dnac-inventory: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> DnacResult<String> {
    let config = InventoryConfig::load(&cli.inventory)?;
    let (inventory, _report) = load_inventory(&config).await?;

    if let Some(root) = &cli.graph {
        return Ok(inventory.graph(Some(root))?);
    }

    if let Some(name) = &cli.host {
        let vars = inventory
            .host_vars(name)
            .ok_or_else(|| InventoryError::UnknownHost(name.clone()))?;
        return Ok(serde_json::to_string_pretty(&Value::Object(vars.clone()))?);
    }

    serde_json::to_string_pretty(&inventory.to_list_json()).map_err(DnacError::from)
}
