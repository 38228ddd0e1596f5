use std::io::Write;

use super::Error;
use crate::utils::formatters;

/// Prints the encoded assertion exactly as received, for use by other tools.
pub fn exec_assertion<W: Write>(assertion: &str, writer: &mut W) -> Result<(), Error> {
    writeln!(writer, "{assertion}").map_err(formatters::Error::from)?;
    Ok(())
}
