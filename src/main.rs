mod cli;

use std::process::ExitCode;

use clap::Parser;
use rand::RngCore;
use rand::rngs::OsRng;
use uuid::Uuid;

use transit_core::config::TransitConfig;
use transit_core::kek::{self, KekChain};
use transit_core::masterkey::StaticMasterKeyProvider;
use transit_core::model::{Algorithm, KekRow, now_unix_seconds};
use transit_core::orchestrator::Orchestrator;
use transit_core::repository::InMemoryRepositories;
use transit_core::transaction::InMemoryStore;
use transit_core::{TransitError, config, exit_codes};

fn build_demo_kek_chain(provider: &StaticMasterKeyProvider, master_key_id: &str) -> KekChain {
    let mut kek_bytes = [0u8; 32];
    OsRng.fill_bytes(&mut kek_bytes);

    let row = KekRow {
        id: Uuid::new_v4(),
        master_key_id: master_key_id.to_string(),
        algorithm: Algorithm::Aes256Gcm,
        wrapped_key: provider.wrap_for_fixture(master_key_id, &kek_bytes),
        nonce: Vec::new(),
        version: 1,
        created_at: now_unix_seconds(),
    };
    let active_kek_id = row.id;

    kek::build_kek_chain(&[row], active_kek_id, provider)
        .expect("demo KEK row unwraps via the static provider")
}

fn build_orchestrator(config: TransitConfig) -> Orchestrator<InMemoryRepositories> {
    let master_key_id = "demo-master-key";
    let provider = StaticMasterKeyProvider::new().with_key(master_key_id, [7u8; 32]);
    let chain = build_demo_kek_chain(&provider, master_key_id);

    Orchestrator::new(InMemoryRepositories, chain, InMemoryStore::new(), config)
}

fn resolve_algorithm(arg: Option<cli::AlgorithmArg>, config: &TransitConfig) -> Algorithm {
    arg.map(Into::into).unwrap_or(config.default_algorithm)
}

fn run_round_trip(
    orch: &Orchestrator<InMemoryRepositories>,
    args: cli::RoundTripArgs,
) -> Result<(), TransitError> {
    let alg = resolve_algorithm(args.algorithm, orch.config());
    println!("algorithm: {alg}");
    orch.create(&args.name, alg)?;
    let wire = orch.encrypt_to_wire(&args.name, args.plaintext.as_bytes())?;
    println!("encrypted: {wire}");

    let decrypted = orch.decrypt(&args.name, &wire)?;
    use secrecy::ExposeSecret;
    let plaintext = decrypted.plaintext.expect("decrypt always populates plaintext");
    let recovered = String::from_utf8_lossy(plaintext.expose_secret());
    println!("decrypted: {recovered}");
    println!("match: {}", recovered == args.plaintext);
    Ok(())
}

fn run_rotate_demo(
    orch: &Orchestrator<InMemoryRepositories>,
    args: cli::RoundTripArgs,
) -> Result<(), TransitError> {
    let alg = resolve_algorithm(args.algorithm, orch.config());
    println!("algorithm: {alg}");
    orch.create(&args.name, alg)?;
    let blob_v1 = orch.encrypt_to_wire(&args.name, args.plaintext.as_bytes())?;
    println!("v1 ciphertext: {blob_v1}");

    orch.rotate(&args.name, alg)?;
    let blob_v2 = orch.encrypt_to_wire(&args.name, args.plaintext.as_bytes())?;
    println!("v2 ciphertext: {blob_v2}");

    use secrecy::ExposeSecret;
    let decrypted_v1 = orch.decrypt(&args.name, &blob_v1)?;
    let decrypted_v2 = orch.decrypt(&args.name, &blob_v2)?;
    println!(
        "v1 decrypts to: {}",
        String::from_utf8_lossy(decrypted_v1.plaintext.unwrap().expose_secret())
    );
    println!(
        "v2 decrypts to: {}",
        String::from_utf8_lossy(decrypted_v2.plaintext.unwrap().expose_secret())
    );
    Ok(())
}

fn run_list(
    orch: &Orchestrator<InMemoryRepositories>,
    args: cli::ListArgs,
) -> Result<(), TransitError> {
    for name in ["demo-alpha", "demo-bravo", "demo-charlie"] {
        orch.create(name, orch.config().default_algorithm)?;
    }

    let page = orch.list_default(args.offset)?;
    for row in page {
        println!("{}\tv{}", row.name, row.version);
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    let service_config = match config::load_service_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return exit_codes::exit_code_for_config_error(&err);
        }
    };

    let orch = build_orchestrator(service_config);

    let result = match cli.command {
        cli::Commands::RoundTrip(args) => run_round_trip(&orch, args),
        cli::Commands::RotateDemo(args) => run_rotate_demo(&orch, args),
        cli::Commands::List(args) => run_list(&orch, args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            exit_codes::exit_code_for_transit_error(&err)
        }
    }
}
