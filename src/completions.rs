//! Shell completion scripts for the `yap` command tree.

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use std::io::Write;
use std::path::Path;

/// Write the completion script for `shell` into `out`.
pub fn write_completions<C: CommandFactory>(shell: Shell, bin_name: &str, out: &mut dyn Write) {
    let mut cmd = C::command();
    generate(shell, &mut cmd, bin_name, out);
}

/// Shell named by a `$SHELL`-style path, e.g. `/usr/bin/zsh`.
pub fn shell_from_path(path: &str) -> Option<Shell> {
    let name = Path::new(path).file_stem()?.to_str()?;
    match name {
        "bash" => Some(Shell::Bash),
        "zsh" => Some(Shell::Zsh),
        "fish" => Some(Shell::Fish),
        "elvish" => Some(Shell::Elvish),
        "pwsh" | "powershell" => Some(Shell::PowerShell),
        _ => None,
    }
}

pub fn detect_shell() -> Option<Shell> {
    let shell = std::env::var("SHELL").ok()?;
    tracing::trace!(shell = %shell, "Detecting shell");
    shell_from_path(&shell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    #[command(name = "demo")]
    struct Demo {
        #[arg(long)]
        verbose: bool,
    }

    #[test]
    fn test_shell_from_path() {
        assert_eq!(shell_from_path("/bin/zsh"), Some(Shell::Zsh));
        assert_eq!(shell_from_path("/usr/local/bin/bash"), Some(Shell::Bash));
        assert_eq!(shell_from_path("/usr/bin/fish"), Some(Shell::Fish));
        assert_eq!(shell_from_path("/bin/sh"), None);
    }

    #[test]
    fn test_script_mentions_flags() {
        let mut out = Vec::new();
        write_completions::<Demo>(Shell::Bash, "demo", &mut out);
        let script = String::from_utf8(out).unwrap();
        assert!(script.contains("--verbose"));
    }
}
