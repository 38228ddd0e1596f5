use std::io::Write;
use tracing::info;

use super::{open_assertion, Error};
use crate::{
    cmd::CredentialFormat,
    credential_providers::ExchangeCredentials,
    roles::{self, select::SelectRole},
    types::SessionRequest,
    utils::formatters::{export::write_export, json::write_json},
};

pub struct ExecAssumeInputs<'a> {
    pub role_arn: Option<&'a str>,
    pub duration_seconds: i32,
    pub output: CredentialFormat,
}

pub async fn exec_assume<E, S, W>(
    assertion: &str,
    exec_inputs: ExecAssumeInputs<'_>,
    exchanger: &E,
    selector: &S,
    writer: &mut W,
) -> Result<(), Error>
where
    E: ExchangeCredentials,
    S: SelectRole + ?Sized,
    W: Write,
{
    let response = open_assertion(assertion, Some(exec_inputs.duration_seconds))?;
    let catalog = roles::parse_roles(&response)?;
    let role = roles::resolve_role(&catalog, exec_inputs.role_arn, selector)?;
    info!("Assuming role {role}");

    let request = SessionRequest::new(assertion, &role, exec_inputs.duration_seconds);
    let credentials = exchanger
        .exchange(&request)
        .await
        .map_err(|err| Error::Exchange(Box::new(err)))?;

    match exec_inputs.output {
        CredentialFormat::Export => write_export(writer, &credentials)?,
        CredentialFormat::Json => write_json(writer, &credentials)?,
    }
    Ok(())
}
