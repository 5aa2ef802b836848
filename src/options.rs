use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::str::FromStr;

use termcolor::ColorChoice;

use crate::eval::depth_for_stack;

pub const USAGE: &str = "\
Usage: lisp15 [options] [FILE]

Without FILE an interactive session starts. With FILE every expression in
the file is evaluated and its value printed in order.

Options:
  -h, --help               Print this help message
  --max-depth <n>          Evaluation depth limit (default: derived from the stack size)
  --stack-mb <n>           Worker thread stack size in MiB (default: 256)
  --color <when>           auto, always or never (default: auto)

Environment:
  LISP15_MAX_DEPTH         Default for --max-depth
  LISP15_STACK_MB          Default for --stack-mb
  RUST_LOG                 Log filter, e.g. lisp15=debug";

pub const DEFAULT_STACK_MB: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub help: bool,
    pub file: Option<PathBuf>,
    pub stack_mb: usize,
    pub max_depth: usize,
    pub color: ColorMode,
}

impl Options {
    pub fn parse() -> Result<Self, String> {
        from_args(std::env::args_os().skip(1).collect(), |name| {
            std::env::var(name).ok()
        })
    }

    pub fn stack_size_bytes(&self) -> usize {
        self.stack_mb * 1024 * 1024
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    /// Resolves `Auto` against whether stdout is a terminal.
    pub fn choice(&self) -> ColorChoice {
        match self {
            ColorMode::Auto if std::io::stdout().is_terminal() => ColorChoice::Auto,
            ColorMode::Auto => ColorChoice::Never,
            ColorMode::Always => ColorChoice::Always,
            ColorMode::Never => ColorChoice::Never,
        }
    }
}

impl AsRef<str> for ColorMode {
    fn as_ref(&self) -> &str {
        match self {
            ColorMode::Auto => "auto",
            ColorMode::Always => "always",
            ColorMode::Never => "never",
        }
    }
}

impl FromStr for ColorMode {
    type Err = &'static str;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ColorMode::Auto),
            "always" => Ok(ColorMode::Always),
            "never" => Ok(ColorMode::Never),
            _ => Err("invalid color mode, expected auto, always or never"),
        }
    }
}

fn env_opt_usize(
    env: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<usize>, String> {
    match env(name) {
        Some(v) => {
            let n = v
                .trim()
                .parse::<usize>()
                .map_err(|_| format!("invalid {}: {}", name, v))?;
            Ok(Some(n))
        }
        None => Ok(None),
    }
}

/// Parses command line arguments, falling back to `env` for the settings that
/// have an environment variable.
pub fn from_args(
    args: Vec<OsString>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Options, String> {
    let mut args = pico_args::Arguments::from_vec(args);

    let help = args.contains(["-h", "--help"]);

    let color = match args.opt_value_from_str::<_, ColorMode>("--color") {
        Ok(Some(mode)) => mode,
        Ok(None) => ColorMode::Auto,
        Err(e) => return Err(e.to_string()),
    };

    let stack_mb = match args.opt_value_from_str::<_, usize>("--stack-mb") {
        Ok(Some(mb)) => mb,
        Ok(None) => env_opt_usize(&env, "LISP15_STACK_MB")?.unwrap_or(DEFAULT_STACK_MB),
        Err(e) => return Err(e.to_string()),
    };
    let stack_bytes = stack_mb
        .checked_mul(1024 * 1024)
        .filter(|&bytes| bytes > 0)
        .ok_or_else(|| format!("invalid stack size: {} MiB", stack_mb))?;

    let max_depth = match args.opt_value_from_str::<_, usize>("--max-depth") {
        Ok(Some(depth)) => depth,
        Ok(None) => env_opt_usize(&env, "LISP15_MAX_DEPTH")?
            .unwrap_or_else(|| depth_for_stack(stack_bytes)),
        Err(e) => return Err(e.to_string()),
    };
    if max_depth == 0 {
        return Err("invalid depth limit: 0".to_string());
    }

    let file = args
        .opt_free_from_str::<PathBuf>()
        .map_err(|e| e.to_string())?;

    let rest = args.finish();
    if !rest.is_empty() {
        return Err(format!("unexpected arguments: {:?}", rest));
    }

    let options = Options {
        help,
        file,
        stack_mb,
        max_depth,
        color,
    };
    log::debug!("{:?}", options);
    Ok(options)
}
