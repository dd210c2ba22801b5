use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "transit-core",
    author,
    version,
    about = "Demo CLI for the transit-encryption core.",
    long_about = "Demo CLI driving the transit-encryption core's orchestrator against an \
        in-memory key store seeded with one freshly generated KEK. There is no persistence \
        and no real Master-Key provider; every invocation runs its whole scenario against a \
        fresh store in a single process, since there is nothing backing the store across \
        invocations."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AlgorithmArg {
    AesGcm,
    ChaCha20Poly1305,
}

impl From<AlgorithmArg> for crate::model::Algorithm {
    fn from(value: AlgorithmArg) -> Self {
        match value {
            AlgorithmArg::AesGcm => crate::model::Algorithm::Aes256Gcm,
            AlgorithmArg::ChaCha20Poly1305 => crate::model::Algorithm::ChaCha20Poly1305,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(
        about = "Create a transit key, encrypt one message, then decrypt it back and compare."
    )]
    RoundTrip(RoundTripArgs),

    #[command(
        about = "Create a transit key, encrypt under version 1, rotate, encrypt under version 2, \
            then decrypt both blobs to show the old version still decrypts."
    )]
    RotateDemo(RoundTripArgs),

    #[command(
        about = "Create a few demo transit keys, then list them using the configured default \
            page size."
    )]
    List(ListArgs),
}

#[derive(Debug, Args)]
pub struct RoundTripArgs {
    #[arg(help = "Transit key name.")]
    pub name: String,

    #[arg(help = "Plaintext to encrypt.")]
    pub plaintext: String,

    /// Falls back to the service config's `default_algorithm` when absent.
    #[arg(long, value_enum)]
    pub algorithm: Option<AlgorithmArg>,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(long, default_value_t = 0, help = "Pagination offset.")]
    pub offset: u64,
}
