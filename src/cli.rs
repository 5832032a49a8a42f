//! Command-line interface definition.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{ArgAction, ArgGroup, Args, Parser, Subcommand};

use crate::connect::{ConnectRequest, TransferRequest};

/// Tokens that start a connection when given without a subcommand.
const CONNECT_FLAGS: &[&str] = &[
    "-c",
    "--target",
    "-jc",
    "-cj",
    "--jumpconnect",
    "--connectjump",
];

#[derive(Parser, Debug)]
#[command(name = "sshgate")]
#[command(about = "Connect to saved SSH targets, with credentials from Bitwarden or a prompt")]
#[command(version)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Save a new connection target
    #[command(alias = "add-target")]
    Add(AddArgs),

    /// List saved targets
    #[command(alias = "ls")]
    List {
        /// Only show ids containing this text
        filter: Option<String>,
        /// Print the records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Connect to a target, optionally through the jump host
    Connect(ConnectArgs),
}

/// Fields for a new target. Missing ones are asked for.
#[derive(Args, Debug, Default, Clone, PartialEq, Eq)]
pub struct AddArgs {
    /// Unique target id
    #[arg(long)]
    pub id: Option<String>,
    /// Hostname or IP address
    #[arg(long)]
    pub host: Option<String>,
    /// Login name
    #[arg(long = "user", visible_alias = "username")]
    pub username: Option<String>,
    /// Secret-manager entry holding the credentials
    #[arg(long)]
    pub secret_ref: Option<String>,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
#[command(group(ArgGroup::new("destination").required(true).args(["target", "jumpconnect"])))]
pub struct ConnectArgs {
    /// Target id
    #[arg(short = 'c', long, value_name = "ID")]
    pub target: Option<String>,

    /// Route through the default jump host
    #[arg(short = 'j', long, visible_alias = "jump")]
    pub via_jump: bool,

    /// Shortcut for `-c ID -j` (also `-jc`, `-cj`)
    #[arg(long, visible_alias = "connectjump", value_name = "ID")]
    pub jumpconnect: Option<String>,

    /// Copy a local file to the target, then open a session
    #[arg(
        short = 'u',
        long,
        visible_alias = "transfer",
        num_args = 2,
        value_names = ["LOCAL", "REMOTE"],
        conflicts_with = "download"
    )]
    pub upload: Option<Vec<String>>,

    /// Copy a remote file to a local path; no session is opened
    #[arg(short = 'd', long, num_args = 2, value_names = ["REMOTE", "LOCAL"])]
    pub download: Option<Vec<String>>,
}

impl ConnectArgs {
    /// Converts parsed flags into a connection request.
    #[must_use]
    pub fn into_request(self) -> ConnectRequest {
        let (target_id, via_jump) = match self.jumpconnect {
            Some(id) => (id, true),
            None => (self.target.unwrap_or_default(), self.via_jump),
        };

        let transfer = match (self.upload, self.download) {
            (Some(up), _) => pair(up)
                .map(|(local, remote)| TransferRequest::upload(PathBuf::from(local), remote)),
            (None, Some(down)) => pair(down)
                .map(|(remote, local)| TransferRequest::download(remote, PathBuf::from(local))),
            (None, None) => None,
        };

        ConnectRequest {
            target_id,
            via_jump,
            transfer,
        }
    }
}

fn pair(values: Vec<String>) -> Option<(String, String)> {
    let mut values = values.into_iter();
    Some((values.next()?, values.next()?))
}

/// Options followed by values, with the number of values each takes.
const VALUE_OPTIONS: &[(&str, usize)] = &[
    ("--id", 1),
    ("--host", 1),
    ("--user", 1),
    ("--username", 1),
    ("--secret-ref", 1),
    ("-c", 1),
    ("--target", 1),
    ("--jumpconnect", 1),
    ("--connectjump", 1),
    ("-u", 2),
    ("--upload", 2),
    ("--transfer", 2),
    ("-d", 2),
    ("--download", 2),
];

/// Rewrites legacy command lines before clap sees them.
///
/// `-jc`/`-cj` in flag position become `--jumpconnect`, and a command
/// line starting with a connect flag gets an implicit `connect`
/// subcommand. Option values and anything after `--` are left alone.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut args: Vec<OsString> = args.into_iter().map(Into::into).collect();

    let mut pending_values = 0;
    for arg in args.iter_mut().skip(1) {
        if pending_values > 0 {
            pending_values -= 1;
            continue;
        }
        let Some(token) = arg.to_str() else {
            continue;
        };
        if token == "--" {
            break;
        }

        let token = if token == "-jc" || token == "-cj" {
            "--jumpconnect"
        } else {
            token
        };
        pending_values = VALUE_OPTIONS
            .iter()
            .find(|(name, _)| *name == token)
            .map_or(0, |&(_, count)| count);
        if token == "--jumpconnect" {
            *arg = OsString::from("--jumpconnect");
        }
    }

    // First argument after any global -v flags
    let first = args
        .iter()
        .skip(1)
        .position(|a| !is_verbose_flag(a))
        .map(|idx| idx + 1);
    if let Some(idx) = first {
        let starts_connect = args[idx]
            .to_str()
            .is_some_and(|a| CONNECT_FLAGS.contains(&a) || a.starts_with("--target="));
        if starts_connect {
            args.insert(idx, OsString::from("connect"));
        }
    }

    args
}

fn is_verbose_flag(arg: &OsString) -> bool {
    arg.to_str().is_some_and(|a| {
        a == "--verbose" || (a.len() > 1 && a.starts_with('-') && a[1..].chars().all(|c| c == 'v'))
    })
}
