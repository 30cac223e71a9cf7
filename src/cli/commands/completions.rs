//! Shell completions generation.

use clap::CommandFactory;
use clap_complete::Shell;

use crate::cli::args::Cli;
use crate::error::StepsyncError;

/// Generate the completion script for `shell`.
///
/// # Errors
///
/// Returns an error if the generated script is not valid UTF-8.
pub fn completions(shell: Shell) -> Result<String, StepsyncError> {
    let mut cmd = Cli::command();
    let mut buf = Vec::new();
    clap_complete::generate(shell, &mut cmd, "stepsync", &mut buf);
    String::from_utf8(buf).map_err(|e| StepsyncError::Config(format!("UTF-8 error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bash_completions_name_binary() {
        let script = completions(Shell::Bash).unwrap();
        assert!(script.contains("stepsync"));
        assert!(script.contains("status"));
    }

    #[test]
    fn test_fish_completions() {
        let script = completions(Shell::Fish).unwrap();
        assert!(script.contains("complete -c stepsync"));
    }
}
