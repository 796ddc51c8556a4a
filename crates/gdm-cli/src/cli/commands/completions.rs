//! `gdm completions <shell>` and `gdm man`.

use anyhow::Result;
use clap_complete::Shell;

pub fn run_completions(mut cmd: clap::Command, shell: Shell) -> Result<()> {
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
    Ok(())
}

pub fn run_man(cmd: clap::Command) -> Result<()> {
    clap_mangen::Man::new(cmd).render(&mut std::io::stdout())?;
    Ok(())
}
