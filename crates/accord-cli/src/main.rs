use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use accord_runner::{Runner, Status};
use accord_validate::ProposalInput;

#[derive(Parser)]
#[command(name = "accord", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Args)]
struct Acting {
    /// Legal name of the party to act as (defaults to [node].name)
    #[arg(long = "as")]
    acting_as: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Create .accord/ with a default config, party keys and stores
    Init,

    /// Check config and keys
    Doctor,

    /// Print the acting party's legal name
    Me {
        #[command(flatten)]
        acting: Acting,
    },

    /// List other participants, services excluded
    Peers {
        #[command(flatten)]
        acting: Acting,
    },

    /// List records committed to the acting party's store
    Results {
        #[command(flatten)]
        acting: Acting,
    },

    /// Propose a result record to a counterparty and wait for finality
    AddResult {
        #[command(flatten)]
        acting: Acting,
        #[arg(long)]
        challenge_name: Option<String>,
        #[arg(long)]
        challenge_year: Option<i64>,
        #[arg(long)]
        place_city: Option<i64>,
        #[arg(long)]
        place_gender: Option<i64>,
        #[arg(long)]
        bib_number: Option<i64>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        time: Option<f64>,
        #[arg(long)]
        gender: Option<String>,
        /// Counterparty legal name, e.g. "O=PartyB,L=New York,C=US"
        #[arg(long)]
        party_name: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let root = std::env::current_dir()?;

    match cli.cmd {
        Command::Init => {
            let cfg = Runner::init(&root)?;
            println!("Initialized accord in {} ({} participants)", root.display(), cfg.network.participants.len());
        }
        Command::Doctor => {
            let cfg = Runner::load_config(&root)?;
            accord_runner::doctor(&root, &cfg)?;
            println!("OK");
        }
        Command::Me { acting } => {
            let r = Runner::open(root)?;
            let api = r.api(acting.acting_as.as_deref())?;
            println!("{}", serde_json::json!({ "me": api.me() }));
        }
        Command::Peers { acting } => {
            let r = Runner::open(root)?;
            let api = r.api(acting.acting_as.as_deref())?;
            println!("{}", serde_json::json!({ "peers": api.peers()? }));
        }
        Command::Results { acting } => {
            let r = Runner::open(root)?;
            let records = r.api(acting.acting_as.as_deref())?.results()?;
            for rec in &records {
                debug!(record = %rec, "listing");
            }
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Command::AddResult {
            acting,
            challenge_name,
            challenge_year,
            place_city,
            place_gender,
            bib_number,
            first_name,
            last_name,
            time,
            gender,
            party_name,
        } => {
            let r = Runner::open(root)?;
            let api = r.api(acting.acting_as.as_deref())?;
            let resp = api.add_result(ProposalInput {
                challenge_name,
                challenge_year,
                place_city,
                place_gender,
                bib_number,
                first_name,
                last_name,
                time,
                gender,
                party_name,
            });
            println!("{}\n{}", resp.status, resp.body);
            if resp.status != Status::Created {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
