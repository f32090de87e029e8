//! Command-line argument definitions for botconf.
//!
//! Flags that correspond to configuration keys become the highest-precedence
//! overlay through [`Cli::overlay`]. Flags that are not given contribute
//! nothing, so they never clobber file values.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use ortho_config::serde_json::Value;

use super::merge::Overlay;

/// Command-line interface for botconf.
#[derive(Debug, Default, Parser)]
#[command(name = "botconf")]
#[command(
    author,
    version,
    about = "Resolve the layered configuration of a chat bot before it starts"
)]
pub struct Cli {
    /// Subcommand to execute. Defaults to `run`.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to the primary configuration file.
    #[arg(long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Path to the local override configuration file.
    #[arg(long, global = true)]
    pub localconfig: Option<Utf8PathBuf>,

    /// Prefix of credential environment variables (default `AUTH`).
    #[arg(long, global = true)]
    pub env_prefix: Option<String>,

    /// Command prefix. Repeat for several prefixes.
    #[arg(long, alias = "prefix", global = true)]
    pub command_prefix: Vec<String>,

    /// Allow mentioning the bot as a command prefix.
    #[arg(long, global = true)]
    pub mention_as_command_prefix: bool,

    /// Gateway intents as an integer literal (base 2, 8, 10 or 16).
    #[arg(long, global = true)]
    pub intents: Option<String>,

    /// Skip an extension by name. May be repeated.
    #[arg(short = 'i', long = "ignore-extension", global = true)]
    pub ignore_extension: Vec<String>,

    /// Skip every extension.
    #[arg(long, global = true)]
    pub ignore_all_extensions: bool,

    /// Skip the bundled extensions.
    #[arg(long, global = true)]
    pub ignore_default_extensions: bool,

    /// Skip operator-declared extensions.
    #[arg(long, global = true)]
    pub ignore_extra_extensions: bool,

    /// Log level (CRITICAL, ERROR, WARNING, INFO, DEBUG, NOTSET).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Only show warnings and errors on the console.
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available subcommands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Resolve the configuration and hand it to the bot.
    Run,

    /// Validate the configuration and print a summary.
    Check,

    /// Print the resolved extension load order.
    Extensions,

    /// Print the resolved database registry.
    Databases,
}

impl Cli {
    /// Returns the selected subcommand, `run` when none was given.
    #[must_use]
    pub fn subcommand(&self) -> Commands {
        self.command.unwrap_or(Commands::Run)
    }

    /// Builds the top-precedence overlay from the given flags.
    ///
    /// Absent flags emit nothing. The overlay never deletes a key.
    #[must_use]
    pub fn overlay(&self) -> Overlay {
        let mut overlay = Overlay::new();

        match self.command_prefix.as_slice() {
            [] => {}
            [single] => overlay.replace("command_prefix", Value::String(single.clone())),
            several => overlay.replace("command_prefix", strings(several)),
        }

        if let Some(ref intents) = self.intents {
            overlay.replace("intents", Value::String(intents.clone()));
        }

        if let Some(ref level) = self.log_level {
            overlay.replace("log_level", Value::String(level.clone()));
        }

        if !self.ignore_extension.is_empty() {
            overlay.replace("ignore_extensions", strings(&self.ignore_extension));
        }

        for (key, set) in [
            ("mention_as_command_prefix", self.mention_as_command_prefix),
            ("ignore_all_extensions", self.ignore_all_extensions),
            ("ignore_default_extensions", self.ignore_default_extensions),
            ("ignore_extra_extensions", self.ignore_extra_extensions),
        ] {
            if set {
                overlay.replace(key, Value::Bool(true));
            }
        }

        overlay
    }
}

fn strings(values: &[String]) -> Value {
    Value::Array(values.iter().cloned().map(Value::String).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::merge::OverlayEntry;
    use ortho_config::serde_json::json;
    use rstest::rstest;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("botconf").chain(args.iter().copied()))
            .expect("arguments should parse")
    }

    fn replaced<'a>(overlay: &'a Overlay, key: &str) -> Option<&'a Value> {
        match overlay.get(key) {
            Some(OverlayEntry::Replace(value)) => Some(value),
            _ => None,
        }
    }

    #[rstest]
    fn no_flags_produce_an_empty_overlay() {
        let cli = parse(&[]);
        assert!(cli.overlay().is_empty());
        assert_eq!(cli.subcommand(), Commands::Run);
    }

    #[rstest]
    fn command_factory_builds_a_consistent_command() {
        let command = <Cli as clap::CommandFactory>::command();
        command.clone().debug_assert();
        assert_eq!(command.get_name(), "botconf");
        assert!(command.find_subcommand("extensions").is_some());
    }

    #[rstest]
    fn path_flags_do_not_enter_the_overlay() {
        let cli = parse(&[
            "--config",
            "a.toml",
            "--localconfig",
            "b.toml",
            "--env-prefix",
            "MYBOT",
            "--quiet",
        ]);
        assert!(cli.overlay().is_empty());
    }

    #[rstest]
    #[case(&["--command-prefix", "?"], json!("?"))]
    #[case(&["--prefix", "?"], json!("?"))]
    #[case(&["--command-prefix", "?", "--command-prefix", "!!"], json!(["?", "!!"]))]
    fn command_prefix_shape_follows_count(#[case] args: &[&str], #[case] expected: Value) {
        let overlay = parse(args).overlay();
        assert_eq!(replaced(&overlay, "command_prefix"), Some(&expected));
    }

    #[rstest]
    fn ignore_extension_accumulates() {
        let overlay = parse(&["-i", "bot.exts.help", "--ignore-extension", "thirdparty.music"])
            .overlay();
        assert_eq!(
            replaced(&overlay, "ignore_extensions"),
            Some(&json!(["bot.exts.help", "thirdparty.music"]))
        );
    }

    #[rstest]
    #[case("--ignore-all-extensions", "ignore_all_extensions")]
    #[case("--ignore-default-extensions", "ignore_default_extensions")]
    #[case("--ignore-extra-extensions", "ignore_extra_extensions")]
    #[case("--mention-as-command-prefix", "mention_as_command_prefix")]
    fn toggles_emit_true_only_when_present(#[case] flag: &str, #[case] key: &str) {
        let overlay = parse(&[flag]).overlay();
        assert_eq!(overlay.len(), 1);
        assert_eq!(replaced(&overlay, key), Some(&Value::Bool(true)));
    }

    #[rstest]
    fn scalar_flags_are_passed_through_unparsed() {
        let overlay = parse(&["--intents", "0x8001", "--log-level", "debug"]).overlay();
        assert_eq!(replaced(&overlay, "intents"), Some(&json!("0x8001")));
        assert_eq!(replaced(&overlay, "log_level"), Some(&json!("debug")));
    }

    #[rstest]
    #[case(&["check"], Commands::Check)]
    #[case(&["extensions", "-i", "x"], Commands::Extensions)]
    #[case(&["--config", "c.toml", "databases"], Commands::Databases)]
    fn subcommands_parse(#[case] args: &[&str], #[case] expected: Commands) {
        assert_eq!(parse(args).subcommand(), expected);
    }

    #[rstest]
    fn overlay_never_omits() {
        let overlay = parse(&[
            "--command-prefix",
            "?",
            "--intents",
            "1",
            "-i",
            "x",
            "--ignore-all-extensions",
        ])
        .overlay();
        assert!(overlay.iter().all(|(_, entry)| !matches!(entry, OverlayEntry::Omit)));
    }
}
