//! Rules command implementation.

use crate::cli::RulesArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;

/// Execute the rules command.
pub fn execute_rules(args: RulesArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let rulebook = config.assistant.load_rulebook()?;

    let output = match args.department {
        Some(department) => formatter.format_rules(rulebook.rules_for(department.into()))?,
        None => formatter.format_rules(rulebook.rules().iter())?,
    };
    println!("{}", output);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::DepartmentArg;
    use crate::config::OutputFormat;

    #[test]
    fn test_rules_for_department() {
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let args = RulesArgs {
            department: Some(DepartmentArg::Housing),
        };
        execute_rules(args, &Config::default(), &formatter).unwrap();
    }

    #[test]
    fn test_missing_rulebook_file() {
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let mut config = Config::default();
        config.assistant.rulebook_path = Some("/nonexistent/rules.toml".into());

        let result = execute_rules(RulesArgs { department: None }, &config, &formatter);
        assert!(result.is_err());
    }
}
