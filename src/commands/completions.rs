use clap_complete::Shell;
use yap::completions;

use crate::args::Cli;

pub(crate) fn cmd_completions(shell: Option<Shell>) -> anyhow::Result<()> {
    let shell = shell
        .or_else(completions::detect_shell)
        .ok_or_else(|| anyhow::anyhow!("Could not detect your shell, pass one explicitly"))?;

    tracing::debug!(%shell, "Generating completions");
    completions::write_completions::<Cli>(shell, "yap", &mut std::io::stdout());
    Ok(())
}
