use std::io::Write;

use super::{open_assertion, Error};
use crate::{
    cmd::ListFormat,
    roles,
    utils::formatters::{self, json::write_json_lines, text::TextFormatter},
};

const HEADERS: [&str; 2] = ["Role ARN", "Principal ARN"];

pub struct ExecListRolesInputs {
    pub arns_only: bool,
    pub output: ListFormat,
    pub no_headers: bool,
}

pub fn exec_list_roles<W: Write>(
    assertion: &str,
    exec_inputs: ExecListRolesInputs,
    writer: &mut W,
) -> Result<(), Error> {
    let response = open_assertion(assertion, None)?;
    let catalog = roles::parse_roles(&response)?;

    match exec_inputs.output {
        ListFormat::Json if exec_inputs.arns_only => {
            write_json_lines(writer, catalog.iter().map(|role| &role.role_arn))?
        }
        ListFormat::Json => write_json_lines(writer, &catalog)?,
        ListFormat::Text => {
            let omit_fields = if exec_inputs.arns_only {
                vec![HEADERS[1]]
            } else {
                vec![]
            };
            let rows: Vec<Vec<&str>> = catalog
                .iter()
                .map(|role| vec![role.role_arn.as_str(), role.principal_arn.as_str()])
                .collect();
            let table = TextFormatter::new(omit_fields, exec_inputs.no_headers, "  ")
                .format(&HEADERS, &rows);
            if !table.is_empty() {
                writeln!(writer, "{table}").map_err(formatters::Error::from)?;
            }
        }
    }
    Ok(())
}
