#![forbid(unsafe_code)]

//! Command-line argument parsing for the showcase.
//!
//! Parses args manually to keep the binary lean. Supports environment
//! variable overrides via the `NEONFX_DEMO_*` prefix; explicit flags win.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::process;

use neonfx::Preset;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const HELP_TEXT: &str = "\
NeonFX Showcase: matrix rain, glitch, flicker, and scan lines in a terminal

USAGE:
    neonfx-showcase [OPTIONS]

OPTIONS:
    --preset=NAME        Effect preset (default: matrix)
    --preset-file=PATH   Load the effect config from a JSON file
    --fps=N              Frames per second, 1-240 (default: 30)
    --exit-after-ms=N    Quit after N milliseconds (0 = never)
    --log-file=PATH      Log file (default: neonfx-showcase.log)
    --help, -h           Show this help message
    --version, -V        Show version

PRESETS:
    terminal    Static scan lines, slow neon flicker
    hacker      Subtle random glitches, scrolling scan lines
    cyberpunk   Intense glitches, fast flicker, scan lines
    matrix      Rain backdrop with a subtle glitch

KEYBINDINGS:
    g           Glitch burst
    f           Flicker the title
    s           Toggle scan lines
    r           Toggle rain
    q / Esc     Quit

ENVIRONMENT VARIABLES:
    NEONFX_DEMO_PRESET          Override --preset
    NEONFX_DEMO_PRESET_FILE     Override --preset-file
    NEONFX_DEMO_FPS             Override --fps
    NEONFX_DEMO_EXIT_AFTER_MS   Auto-quit after N milliseconds (for testing)
    NEONFX_DEMO_LOG             Override --log-file
    NEONFX_ENABLE, NEONFX_REDUCED_MOTION, NEONFX_SEED,
    NEONFX_PRESET, NEONFX_INTENSITY   Effect settings
    RUST_LOG                    Log filter (default: info,neonfx_effects=debug)";

/// Parsed command-line options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opts {
    pub preset: Preset,
    /// JSON config that replaces the preset when set.
    pub preset_file: Option<PathBuf>,
    pub fps: u32,
    /// Auto-exit after this many milliseconds (0 = disabled).
    pub exit_after_ms: u64,
    pub log_file: PathBuf,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            preset: Preset::Matrix,
            preset_file: None,
            fps: 30,
            exit_after_ms: 0,
            log_file: PathBuf::from("neonfx-showcase.log"),
        }
    }
}

/// What the command line asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run(Opts),
    Help,
    Version,
}

/// A rejected argument or override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliError(pub String);

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for CliError {}

impl Opts {
    /// Parse the process arguments and environment, exiting on `--help`,
    /// `--version`, or a bad argument.
    pub fn parse(default_preset: Option<Preset>) -> Self {
        let args: Vec<String> = env::args().skip(1).collect();
        match Self::parse_from(&args, |key| env::var(key).ok(), default_preset) {
            Ok(Command::Run(opts)) => opts,
            Ok(Command::Help) => {
                println!("{HELP_TEXT}");
                process::exit(0);
            }
            Ok(Command::Version) => {
                println!("neonfx-showcase {VERSION}");
                process::exit(0);
            }
            Err(err) => {
                eprintln!("{err}");
                eprintln!("Run with --help for usage information.");
                process::exit(1);
            }
        }
    }

    /// Parse `args` with `get` as the environment lookup.
    ///
    /// `default_preset` (usually from `NEONFX_PRESET`) sits below the
    /// `NEONFX_DEMO_*` overrides, which sit below explicit flags.
    pub fn parse_from<F>(
        args: &[String],
        get: F,
        default_preset: Option<Preset>,
    ) -> Result<Command, CliError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut opts = Self::default();
        if let Some(preset) = default_preset {
            opts.preset = preset;
        }

        // Apply environment variable defaults first
        if let Some(val) = get("NEONFX_DEMO_PRESET") {
            opts.preset = parse_preset(&val)?;
        }
        if let Some(val) = get("NEONFX_DEMO_PRESET_FILE") {
            opts.preset_file = Some(PathBuf::from(val));
        }
        if let Some(val) = get("NEONFX_DEMO_FPS") {
            opts.fps = parse_fps(&val)?;
        }
        if let Some(val) = get("NEONFX_DEMO_EXIT_AFTER_MS")
            && let Ok(n) = val.trim().parse()
        {
            opts.exit_after_ms = n;
        }
        if let Some(val) = get("NEONFX_DEMO_LOG") {
            opts.log_file = PathBuf::from(val);
        }

        // Parse command-line args (override env vars)
        for arg in args {
            match arg.as_str() {
                "--help" | "-h" => return Ok(Command::Help),
                "--version" | "-V" => return Ok(Command::Version),
                other => {
                    if let Some(val) = other.strip_prefix("--preset=") {
                        opts.preset = parse_preset(val)?;
                    } else if let Some(val) = other.strip_prefix("--preset-file=") {
                        opts.preset_file = Some(PathBuf::from(val));
                    } else if let Some(val) = other.strip_prefix("--fps=") {
                        opts.fps = parse_fps(val)?;
                    } else if let Some(val) = other.strip_prefix("--exit-after-ms=") {
                        opts.exit_after_ms = val.parse().map_err(|_| {
                            CliError(format!("Invalid --exit-after-ms value: {val}"))
                        })?;
                    } else if let Some(val) = other.strip_prefix("--log-file=") {
                        opts.log_file = PathBuf::from(val);
                    } else {
                        return Err(CliError(format!("Unknown argument: {other}")));
                    }
                }
            }
        }

        Ok(Command::Run(opts))
    }
}

fn parse_preset(val: &str) -> Result<Preset, CliError> {
    Preset::parse(val).ok_or_else(|| CliError(format!("Invalid preset: {val}")))
}

fn parse_fps(val: &str) -> Result<u32, CliError> {
    match val.trim().parse::<u32>() {
        Ok(n) if (1..=240).contains(&n) => Ok(n),
        _ => Err(CliError(format!("Invalid --fps value: {val}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn run(args: &[&str], env: &[(&str, &str)]) -> Result<Command, CliError> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let env: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Opts::parse_from(&args, |key| env.get(key).cloned(), None)
    }

    #[test]
    fn default_opts() {
        let opts = Opts::default();
        assert_eq!(opts.preset, Preset::Matrix);
        assert_eq!(opts.fps, 30);
        assert_eq!(opts.exit_after_ms, 0);
        assert!(opts.preset_file.is_none());
    }

    #[test]
    fn flags_override_env() {
        let cmd = run(
            &["--preset=hacker", "--fps=60"],
            &[("NEONFX_DEMO_PRESET", "terminal"), ("NEONFX_DEMO_EXIT_AFTER_MS", "500")],
        )
        .unwrap();
        let Command::Run(opts) = cmd else {
            panic!("expected Run, got {cmd:?}");
        };
        assert_eq!(opts.preset, Preset::Hacker);
        assert_eq!(opts.fps, 60);
        assert_eq!(opts.exit_after_ms, 500);
    }

    #[test]
    fn settings_preset_is_lowest_priority() {
        let args: Vec<String> = Vec::new();
        let cmd = Opts::parse_from(&args, |_| None, Some(Preset::Cyberpunk)).unwrap();
        assert_eq!(
            cmd,
            Command::Run(Opts {
                preset: Preset::Cyberpunk,
                ..Opts::default()
            })
        );
    }

    #[test]
    fn help_and_version_short_circuit() {
        assert_eq!(run(&["--fps=5", "-h", "--bogus"], &[]), Ok(Command::Help));
        assert_eq!(run(&["--version"], &[]), Ok(Command::Version));
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(run(&["--fps=0"], &[]).is_err());
        assert!(run(&["--fps=abc"], &[]).is_err());
        assert!(run(&["--preset=disco"], &[]).is_err());
        assert!(run(&["--wat"], &[]).is_err());
        assert!(run(&[], &[("NEONFX_DEMO_FPS", "999")]).is_err());
    }

    #[test]
    fn preset_file_is_recorded() {
        let Ok(Command::Run(opts)) = run(&["--preset-file=fx.json"], &[]) else {
            panic!("expected Run");
        };
        assert_eq!(opts.preset_file, Some(PathBuf::from("fx.json")));
    }

    #[test]
    fn help_text_lists_every_preset() {
        for preset in Preset::ALL {
            assert!(HELP_TEXT.contains(preset.name()), "{preset}");
        }
        assert!(HELP_TEXT.contains("NEONFX_DEMO_EXIT_AFTER_MS"));
    }

    #[test]
    fn version_string_nonempty() {
        assert!(!VERSION.is_empty());
    }
}
