use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use jsonstream_client::{ClientConfig, MalformedPolicy, Registration, DEFAULT_MAX_FLURRY};
use jsonstream_transport::{Endpoint, DEFAULT_SOCKET_PATH};

use crate::exit::{CliError, CliResult, USAGE};
use crate::logging::{LogFormat, LogLevel};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("JSONSTREAM_BUILD_TARGET"),
    ")"
);

/// Default local socket path when neither `--socket` nor `--tcp` is given.
pub const SOCKET_ENV: &str = "JSONSTREAM_SOCKET";
/// Default TCP endpoint when neither `--socket` nor `--tcp` is given.
pub const TCP_ENV: &str = "JSONSTREAM_TCP";
/// Default token when neither `--token` nor `--registration` is given.
pub const TOKEN_ENV: &str = "JSONSTREAM_TOKEN";

#[derive(Parser, Debug)]
#[command(
    name = "jsonstream-testclient",
    version,
    long_version = LONG_VERSION,
    about = "Scripted JSON test client for exercising local-socket and TCP servers"
)]
pub struct Cli {
    /// Local socket path (`-socket <path>` is also accepted) [env: JSONSTREAM_SOCKET].
    #[arg(long, value_name = "PATH", conflicts_with = "tcp")]
    pub socket: Option<PathBuf>,

    /// Connect over TCP instead of a local socket [env: JSONSTREAM_TCP].
    #[arg(long, value_name = "HOST:PORT")]
    pub tcp: Option<String>,

    /// Send `{"token": TOKEN}` right after connecting [env: JSONSTREAM_TOKEN].
    #[arg(long, value_name = "TOKEN", conflicts_with = "registration")]
    pub token: Option<String>,

    /// Send this JSON object right after connecting.
    #[arg(long, value_name = "JSON")]
    pub registration: Option<String>,

    /// Open with the `PaintTextEvent` schema test message instead of an
    /// envelope (`-schema` is also accepted).
    #[arg(long)]
    pub schema: bool,

    /// What to do with an inbound message that is not a JSON object.
    #[arg(long, value_name = "POLICY", default_value = "fatal")]
    pub on_malformed: MalformedArg,

    /// Give up connecting after this long (e.g. 2s, 500ms).
    #[arg(long, value_name = "DURATION")]
    pub connect_timeout: Option<String>,

    /// Give up waiting for the next server message after this long.
    #[arg(long, value_name = "DURATION")]
    pub read_timeout: Option<String>,

    /// Upper bound on envelopes sent for one `flurry`.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_FLURRY)]
    pub max_flurry: u64,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    pub log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    pub log_level: LogLevel,
}

/// Fallbacks read from the environment.
///
/// These only apply when the matching flags are absent, so an exported
/// `JSONSTREAM_SOCKET` never clashes with an explicit `--tcp`.
#[derive(Debug, Clone, Default)]
pub struct EnvDefaults {
    pub socket: Option<PathBuf>,
    pub tcp: Option<String>,
    pub token: Option<String>,
}

impl EnvDefaults {
    pub fn from_process() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|value| !value.is_empty());
        Self {
            socket: std::env::var_os(SOCKET_ENV)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from),
            tcp: var(TCP_ENV),
            token: var(TOKEN_ENV),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MalformedArg {
    Fatal,
    Skip,
}

impl From<MalformedArg> for MalformedPolicy {
    fn from(value: MalformedArg) -> Self {
        match value {
            MalformedArg::Fatal => MalformedPolicy::Fatal,
            MalformedArg::Skip => MalformedPolicy::Skip,
        }
    }
}

impl Cli {
    /// Endpoint to connect to.
    ///
    /// Flags win over the environment, `--tcp` over `--socket`, and the
    /// well-known local socket is the last resort.
    pub fn endpoint(&self, env: &EnvDefaults) -> CliResult<Endpoint> {
        let explicit = (self.tcp.as_ref(), self.socket.as_ref());
        let (tcp, socket) = match explicit {
            (None, None) => (env.tcp.as_ref(), env.socket.as_ref()),
            flags => flags,
        };

        if let Some(tcp) = tcp {
            return Endpoint::parse_tcp(tcp).map_err(|err| CliError::new(USAGE, err.to_string()));
        }
        match socket {
            Some(path) if path.as_os_str().is_empty() => {
                Err(CliError::new(USAGE, "socket path must not be empty"))
            }
            Some(path) => Ok(Endpoint::local(path)),
            None => Ok(Endpoint::local(DEFAULT_SOCKET_PATH)),
        }
    }

    pub fn client_config(&self, env: &EnvDefaults) -> CliResult<ClientConfig> {
        let registration = match (&self.token, &self.registration) {
            (Some(token), _) => Registration::Token(token.clone()),
            (None, Some(raw)) => parse_registration(raw)?,
            (None, None) => env.token.clone().map_or(Registration::None, Registration::Token),
        };
        if self.max_flurry == 0 {
            return Err(CliError::new(USAGE, "--max-flurry must be greater than zero"));
        }

        Ok(ClientConfig {
            registration,
            malformed: self.on_malformed.into(),
            max_flurry: self.max_flurry,
            connect_timeout: self.connect_timeout.as_deref().map(parse_duration).transpose()?,
            read_timeout: self.read_timeout.as_deref().map(parse_duration).transpose()?,
            ..ClientConfig::default()
        })
    }
}

/// Rewrite the single-dash `-socket` and `-schema` spellings.
///
/// Handles both `-socket <path>` and `-socket=<path>`. Anything after `--`
/// is left alone.
pub fn normalize_legacy_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut passthrough = false;
    args.into_iter()
        .map(|arg| {
            if passthrough {
                return arg;
            }
            let rewritten = match arg.to_str() {
                Some("--") => {
                    passthrough = true;
                    None
                }
                Some("-socket") => Some(OsString::from("--socket")),
                Some("-schema") => Some(OsString::from("--schema")),
                Some(s) if s.starts_with("-socket=") => Some(OsString::from(format!("-{s}"))),
                _ => None,
            };
            rewritten.unwrap_or(arg)
        })
        .collect()
}

fn parse_registration(raw: &str) -> CliResult<Registration> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|err| CliError::new(USAGE, format!("invalid --registration JSON: {err}")))?;
    match value {
        serde_json::Value::Object(map) => Ok(Registration::Message(map)),
        _ => Err(CliError::new(USAGE, "--registration must be a JSON object")),
    }
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
