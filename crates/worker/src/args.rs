//! Positional argument parsing for `intools-run`.

use crate::error::CliError;

pub const USAGE: &str = "usage: intools-run <group> <connector> <image> <timeout> [cmd...]";

/// One-shot run request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunArgs {
    pub group: String,
    pub connector: String,
    pub image: String,
    /// Watchdog timeout in seconds; zero selects the default.
    pub timeout: u64,
    pub cmd: Vec<String>,
}

impl RunArgs {
    /// Parse the arguments that follow the program name.
    pub fn parse<I>(args: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let (Some(group), Some(connector), Some(image), Some(timeout)) =
            (args.next(), args.next(), args.next(), args.next())
        else {
            return Err(CliError::Usage);
        };
        let timeout = timeout
            .parse()
            .map_err(|_| CliError::InvalidTimeout(timeout))?;

        Ok(Self {
            group,
            connector,
            image,
            timeout,
            cmd: args.collect(),
        })
    }
}
