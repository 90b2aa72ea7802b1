//! Application configuration.
//!
//! The configuration is loaded from `$XDG_CONFIG_HOME/wmbind/config.json`.
//! Every section is optional; a minimal `{}` file is valid and all settings
//! fall back to their compiled-in defaults.
//!
//! # Example
//!
//! ```json
//! {
//!   "variables": { "$mod": "cmd" },
//!   "bindings": [
//!     { "keys": "$mod+Left", "aliases": ["$mod+h"], "commands": ["focus left"] },
//!     { "keys": "$mod+1", "commands": ["workspace \"1\""] },
//!     { "keys": "$mod+Return", "commands": ["exec \"alacritty\""] }
//!   ],
//!   "quake": [
//!     { "name": "zsh", "keys": "$mod+grave", "command": "zsh" }
//!   ],
//!   "status": { "poll_interval_ms": 1000, "title": "wmbind" },
//!   "yabai": { "binary": "/opt/homebrew/bin/yabai" },
//!   "notifications": true,
//!   "terminal": "alacritty"
//! }
//! ```

use crate::chord::VariableTable;
use crate::command::{quote_arg, Command, CommandKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `$name -> value` substitutions used in key chords.
    pub variables: BTreeMap<String, String>,

    /// Hotkeys and the command sequences they run.
    pub bindings: Vec<Binding>,

    /// Floating "quake" terminals toggled by a hotkey.
    pub quake: Vec<QuakeConfig>,

    pub status: StatusConfig,

    pub yabai: YabaiConfig,

    /// Show a desktop notification when a command fails.
    pub notifications: bool,

    /// Terminal emulator used for quake terminals.
    pub terminal: String,

    /// Override for the command socket path.
    pub socket_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            variables: BTreeMap::new(),
            bindings: Vec::new(),
            quake: Vec::new(),
            status: StatusConfig::default(),
            yabai: YabaiConfig::default(),
            notifications: true,
            terminal: "alacritty".into(),
            socket_path: None,
        }
    }
}

/// One hotkey: its main chord, optional alias chords, and the commands run
/// (in order) when any of them is pressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub keys: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub commands: Vec<Command>,
}

/// A toggled floating terminal running `command`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuakeConfig {
    pub name: String,
    pub keys: String,
    pub command: String,
}

impl QuakeConfig {
    /// Function key the toggle is registered under.
    pub fn function_key(&self) -> String {
        format!("quake:{}", self.name)
    }
}

/// Status title polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    pub poll_interval_ms: u64,
    /// Prefix of the rendered title.
    pub title: String,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            title: "wmbind".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YabaiConfig {
    /// Path or name of the yabai executable.
    pub binary: String,
}

impl Default for YabaiConfig {
    fn default() -> Self {
        Self {
            binary: "yabai".into(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        Ok(config)
    }

    pub fn variable_table(&self) -> VariableTable {
        VariableTable::from(self.variables.clone())
    }

    /// Configured bindings followed by one binding per quake terminal.
    pub fn all_bindings(&self) -> Vec<Binding> {
        let mut bindings = self.bindings.clone();
        bindings.extend(self.quake.iter().map(|q| Binding {
            keys: q.keys.clone(),
            aliases: Vec::new(),
            commands: vec![Command::func(&q.function_key())],
        }));
        bindings
    }

    /// Render the configuration as i3 config text.
    ///
    /// `func` commands become `exec "<program> func <key>"`, so the
    /// generated file calls back into this binary.
    pub fn generate(&self, program: &str) -> String {
        let mut out = String::new();
        for (name, value) in &self.variables {
            out.push_str(&format!("set {} {}\n", name, value));
        }
        for binding in self.all_bindings() {
            let commands = binding
                .commands
                .iter()
                .map(|cmd| match cmd.kind() {
                    Ok(CommandKind::Func(key)) => {
                        let line = [program, "func", key.as_str()]
                            .map(quote_arg)
                            .join(" ");
                        Command::exec(&line).generate()
                    }
                    _ => cmd.generate(),
                })
                .collect::<Vec<_>>()
                .join("; ");
            for keys in binding.aliases.iter().chain(std::iter::once(&binding.keys)) {
                out.push_str(&format!("bindsym {} {}\n", keys, commands));
            }
        }
        out
    }

    /// Programs named by `exec` commands (and the quake terminal) for which
    /// `exists` returns `false`, sorted and deduplicated.
    pub fn missing_programs(&self, exists: impl Fn(&str) -> bool) -> Vec<String> {
        let mut programs = BTreeSet::new();
        for binding in &self.bindings {
            for cmd in &binding.commands {
                if let Ok(CommandKind::Exec { argv }) = cmd.kind() {
                    programs.insert(argv[0].clone());
                }
            }
        }
        if !self.quake.is_empty() {
            programs.insert(self.terminal.clone());
        }
        programs.into_iter().filter(|p| !exists(p)).collect()
    }
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Direction;
    use std::io::Write;

    #[test]
    fn deserialize_full_config() {
        let json = r#"{
            "variables": { "$mod": "cmd" },
            "bindings": [
                { "keys": "$mod+Left", "aliases": ["$mod+h"], "commands": ["focus left"] },
                { "keys": "$mod+1", "commands": ["workspace \"1\"", "exec \"say hi\""] }
            ],
            "quake": [ { "name": "zsh", "keys": "$mod+grave", "command": "zsh" } ],
            "status": { "poll_interval_ms": 250, "title": "i3" },
            "yabai": { "binary": "/opt/homebrew/bin/yabai" },
            "notifications": false,
            "terminal": "kitty",
            "socket_path": "/tmp/custom.sock"
        }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.variables["$mod"], "cmd");
        assert_eq!(cfg.bindings.len(), 2);
        assert_eq!(cfg.bindings[0].aliases, vec!["$mod+h".to_string()]);
        assert_eq!(cfg.bindings[0].commands, vec![Command::focus(Direction::West)]);
        assert_eq!(
            cfg.bindings[1].commands,
            vec![Command::workspace("1"), Command::exec("say hi")]
        );
        assert_eq!(cfg.quake[0].function_key(), "quake:zsh");
        assert_eq!(cfg.status.poll_interval_ms, 250);
        assert_eq!(cfg.status.title, "i3");
        assert_eq!(cfg.yabai.binary, "/opt/homebrew/bin/yabai");
        assert!(!cfg.notifications);
        assert_eq!(cfg.terminal, "kitty");
        assert_eq!(cfg.socket_path.as_deref(), Some("/tmp/custom.sock"));
    }

    #[test]
    fn deserialize_empty_uses_defaults() {
        let cfg: Config = serde_json::from_str("{}").unwrap();
        assert!(cfg.variables.is_empty());
        assert!(cfg.bindings.is_empty());
        assert_eq!(cfg.status.poll_interval_ms, 1000);
        assert_eq!(cfg.status.title, "wmbind");
        assert_eq!(cfg.yabai.binary, "yabai");
        assert!(cfg.notifications);
        assert_eq!(cfg.terminal, "alacritty");
        assert!(cfg.socket_path.is_none());
    }

    #[test]
    fn deserialize_partial_status() {
        let cfg: Config = serde_json::from_str(r#"{ "status": { "title": "i3" } }"#).unwrap();
        assert_eq!(cfg.status.title, "i3");
        assert_eq!(cfg.status.poll_interval_ms, 1000);
    }

    #[test]
    fn unknown_top_level_keys_ignored() {
        let json = r#"{ "bindings": [], "future_section": { "key": 42 } }"#;
        let _cfg: Config = serde_json::from_str(json).unwrap();
    }

    #[test]
    fn malformed_command_is_a_parse_error() {
        let json = r#"{ "bindings": [ { "keys": "$mod+a", "commands": [""] } ] }"#;
        assert!(serde_json::from_str::<Config>(json).is_err());
    }

    #[test]
    fn load_reads_file_and_reports_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "variables": {{ "$mod": "alt" }} }}"#).unwrap();
        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.variable_table().get("$mod"), Some("alt"));

        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(err.to_string().starts_with("config error: failed to read"));
    }

    fn sample() -> Config {
        let mut cfg = Config::default();
        cfg.variables.insert("$mod".into(), "cmd".into());
        cfg.bindings.push(Binding {
            keys: "$mod+Left".into(),
            aliases: vec!["$mod+h".into()],
            commands: vec![Command::focus(Direction::West)],
        });
        cfg.bindings.push(Binding {
            keys: "$mod+Return".into(),
            aliases: vec![],
            commands: vec![Command::exec("alacritty"), Command::workspace("1")],
        });
        cfg.quake.push(QuakeConfig {
            name: "zsh".into(),
            keys: "$mod+grave".into(),
            command: "zsh".into(),
        });
        cfg
    }

    #[test]
    fn all_bindings_adds_quake_toggles() {
        let bindings = sample().all_bindings();
        assert_eq!(bindings.len(), 3);
        assert_eq!(bindings[2].keys, "$mod+grave");
        assert_eq!(bindings[2].commands, vec![Command::func("quake:zsh")]);
    }

    #[test]
    fn generate_emits_variables_then_bindsyms() {
        let text = sample().generate("wmbind");
        assert_eq!(
            text,
            concat!(
                "set $mod cmd\n",
                "bindsym $mod+h focus left\n",
                "bindsym $mod+Left focus left\n",
                "bindsym $mod+Return exec \"alacritty\"; workspace \"1\"\n",
                "bindsym $mod+grave exec \"wmbind func quake:zsh\"\n",
            )
        );
    }

    #[test]
    fn generated_func_exec_survives_spaces() {
        let mut cfg = Config::default();
        cfg.quake.push(QuakeConfig {
            name: "my term".into(),
            keys: "cmd+grave".into(),
            command: "zsh".into(),
        });
        let program = "/Applications/My Tools/wmbind";
        let text = cfg.generate(program);
        let line = text
            .strip_prefix("bindsym cmd+grave ")
            .unwrap()
            .trim_end();
        assert_eq!(
            Command::parse(line).unwrap().kind().unwrap(),
            CommandKind::Exec {
                argv: vec![program.into(), "func".into(), "quake:my term".into()],
            }
        );
    }

    #[test]
    fn missing_programs_lists_unknown_execs() {
        let missing = sample().missing_programs(|p| p == "zsh");
        assert_eq!(missing, vec!["alacritty".to_string()]);
        assert!(sample()
            .missing_programs(|p| p == "alacritty")
            .is_empty());
    }
}
