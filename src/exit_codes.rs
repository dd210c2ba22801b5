//! Maps [`TransitError`] to process exit codes for the demo CLI. A real HTTP
//! front end would map the same error kinds to status codes instead; this
//! three-bucket usage/IO/software scheme is only for the CLI binary.

use std::process::ExitCode;

use crate::{config, error::TransitError};

pub const EXIT_USAGE: u8 = 64;
pub const EXIT_IO: u8 = 2;
pub const EXIT_SOFTWARE: u8 = 1;

pub fn exit_code_for_config_error(error: &config::ConfigError) -> ExitCode {
    use config::ConfigError::*;

    match error {
        ConfigDirUnavailable | Io(_) => ExitCode::from(EXIT_IO),
        Parse(_) | Serialize(_) | UnsupportedSchemaVersion(_) => ExitCode::from(EXIT_SOFTWARE),
    }
}

pub fn exit_code_for_transit_error(error: &TransitError) -> ExitCode {
    use TransitError::*;

    match error {
        NotFound | Conflict(_) | InvalidInput(_) => ExitCode::from(EXIT_USAGE),
        Io(_) => ExitCode::from(EXIT_IO),
        DecryptionFailed | KekNotFound(_) | DekNotFound(_) | KmsError(_) => {
            ExitCode::from(EXIT_SOFTWARE)
        }
    }
}
