use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use idlforge_core::pda::SeedComponent;

#[derive(Parser, Debug, Clone)]
#[command(name = "idlforge", version, about = "IDL-driven instruction composer for Anchor programs")]
pub struct Cli {
    /// Anchor IDL JSON file.
    #[arg(long, short = 'i', global = true, env = "IDLFORGE_IDL")]
    pub idl: Option<PathBuf>,

    /// RPC URL or cluster moniker (mainnet, devnet, testnet, localnet).
    #[arg(long, short = 'u', global = true, env = "IDLFORGE_RPC_URL", default_value = "localnet")]
    pub rpc_url: String,

    /// Keypair file used to sign (default: ~/.config/solana/id.json).
    #[arg(long, short = 'k', global = true, env = "IDLFORGE_KEYPAIR")]
    pub keypair: Option<PathBuf>,

    /// Program id; overrides the address declared in the IDL.
    #[arg(long, global = true, env = "IDLFORGE_PROGRAM_ID")]
    pub program_id: Option<String>,

    /// How long to wait for confirmation, e.g. `30s` or `2m`.
    #[arg(long, global = true, value_parser = humantime::parse_duration, default_value = "30s")]
    pub timeout: Duration,

    /// Emit JSON output on stdout.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the program's instructions, types and errors.
    Idl,

    /// Compose and submit one instruction. Pass `<instruction> --help` for its arguments.
    #[command(disable_help_flag = true)]
    Call {
        instruction: String,

        /// Print the composed instruction without submitting it.
        #[arg(long)]
        dry_run: bool,

        /// `--<arg> <value>` and `--<account>-account <address>` pairs.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Derive a program address from explicit seeds.
    Pda {
        /// Seed as `kind:value` (utf8, bytes, pubkey, u8..u128, account); repeatable.
        #[arg(long = "seed")]
        seeds: Vec<SeedComponent>,

        /// Address for an `account:<name>` seed, as `name=address`; repeatable.
        #[arg(long = "ref")]
        refs: Vec<String>,

        /// Owning program (default: the session program).
        #[arg(long)]
        owner: Option<String>,
    },

    /// Check that the RPC node is reachable.
    Health,

    /// Fetch and decode the program's accounts of one type, or of every type.
    Accounts {
        /// Account type name from the IDL.
        #[arg(value_name = "TYPE")]
        type_name: Option<String>,
    },

    /// Show the program's recent transactions and their success rate.
    Txs {
        /// How many signatures to fetch (at most 1000).
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },

    /// Manage and run saved test suites.
    Suite {
        #[command(subcommand)]
        action: SuiteCommand,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum SuiteCommand {
    /// Create an empty suite file.
    New { file: PathBuf, name: String },

    /// Save a call as a test case.
    #[command(disable_help_flag = true)]
    Add {
        file: PathBuf,
        /// Test case name.
        #[arg(long)]
        name: String,
        instruction: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// List the cases in a suite.
    List { file: PathBuf },

    /// Remove a case by name or id prefix.
    Remove { file: PathBuf, case: String },

    /// Run every case in order.
    Run {
        file: PathBuf,

        /// Pause between cases.
        #[arg(long, value_parser = humantime::parse_duration, default_value = "500ms")]
        delay: Duration,

        /// Cancel the remaining cases after the first failure.
        #[arg(long)]
        fail_fast: bool,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn instruction_help_reaches_the_call() {
        let cli = Cli::try_parse_from(["idlforge", "call", "deposit", "--help"]).unwrap();
        match cli.command {
            Command::Call { instruction, args, .. } => {
                assert_eq!(instruction, "deposit");
                assert_eq!(args, vec!["--help".to_string()]);
            }
            other => panic!("parsed as {:?}", other),
        }
    }

    #[test]
    fn call_flags_stay_in_args() {
        let cli = Cli::try_parse_from(["idlforge", "call", "deposit", "--amount", "5", "-h"]).unwrap();
        let Command::Call { args, dry_run, .. } = cli.command else {
            panic!("not a call");
        };
        assert!(!dry_run);
        assert_eq!(args, vec!["--amount", "5", "-h"]);
    }

    #[test]
    fn browse_commands_parse() {
        let cli = Cli::try_parse_from(["idlforge", "accounts", "Vault"]).unwrap();
        assert!(matches!(cli.command, Command::Accounts { type_name: Some(ref t) } if t == "Vault"));
        let cli = Cli::try_parse_from(["idlforge", "txs", "--limit", "25"]).unwrap();
        assert!(matches!(cli.command, Command::Txs { limit: 25 }));
        let cli = Cli::try_parse_from(["idlforge", "txs"]).unwrap();
        assert!(matches!(cli.command, Command::Txs { limit: 100 }));
    }

    #[test]
    fn suite_add_passes_help_through() {
        let cli = Cli::try_parse_from(["idlforge", "suite", "add", "s.json", "--name", "one", "deposit", "--help"])
            .unwrap();
        let Command::Suite {
            action: SuiteCommand::Add { instruction, args, .. },
        } = cli.command
        else {
            panic!("not suite add");
        };
        assert_eq!(instruction, "deposit");
        assert_eq!(args, vec!["--help"]);
    }
}
