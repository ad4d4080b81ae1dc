//! Departments command implementation.

use crate::error::Result;
use crate::output::Formatter;

/// Execute the departments command.
pub fn execute_departments(formatter: &Formatter) -> Result<()> {
    println!("{}", formatter.format_departments()?);
    Ok(())
}
