use futures::{stream, StreamExt, TryStreamExt};
use std::io::Write;
use tracing::info;

use super::{open_assertion, Error};
use crate::{
    credential_providers::ExchangeCredentials,
    roles::{self, select::NonInteractiveSelector},
    types::{AccountCredentials, SessionRequest},
    utils::formatters::json::write_json_lines,
};

pub struct ExecBatchInputs<'a> {
    pub account_ids: &'a [String],
    pub role_name: &'a str,
    pub partition: &'a str,
    pub parallel: usize,
    pub duration_seconds: i32,
}

pub fn role_arn_for(partition: &str, account_id: &str, role_name: &str) -> String {
    format!("arn:{partition}:iam::{account_id}:role/{role_name}")
}

/// Assumes `role_name` in every account and prints one JSON line per account
/// in input order. Every role is looked up before the first exchange, and the
/// first failing exchange aborts the batch without printing anything.
pub async fn exec_batch<E, W>(
    assertion: &str,
    exec_inputs: ExecBatchInputs<'_>,
    exchanger: &E,
    writer: &mut W,
) -> Result<(), Error>
where
    E: ExchangeCredentials,
    W: Write,
{
    let response = open_assertion(assertion, Some(exec_inputs.duration_seconds))?;
    let catalog = roles::parse_roles(&response)?;

    let requests = exec_inputs
        .account_ids
        .iter()
        .map(|account_id| -> Result<_, Error> {
            let role_arn =
                role_arn_for(exec_inputs.partition, account_id, exec_inputs.role_name);
            let role =
                roles::resolve_role(&catalog, Some(role_arn.as_str()), &NonInteractiveSelector)?;
            Ok((
                account_id.as_str(),
                SessionRequest::new(assertion, &role, exec_inputs.duration_seconds),
            ))
        })
        .collect::<Result<Vec<_>, Error>>()?;

    info!(
        "Assuming {} role(s) with up to {} concurrent exchange(s)",
        requests.len(),
        exec_inputs.parallel
    );
    let results: Vec<AccountCredentials> = stream::iter(requests)
        .map(|(account_id, request)| async move {
            let credentials = exchanger
                .exchange(&request)
                .await
                .map_err(|err| Error::Exchange(Box::new(err)))?;
            Ok::<_, Error>(AccountCredentials {
                credentials,
                account_id: account_id.to_string(),
                role_arn: request.role_arn,
            })
        })
        .buffered(exec_inputs.parallel.max(1))
        .try_collect()
        .await?;

    write_json_lines(writer, &results)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::FakeExchanger;
    use crate::saml::fixtures;
    use std::time::Duration;

    const ACCOUNTS: [&str; 3] = ["111111111111", "222222222222", "333333333333"];

    fn catalog_assertion() -> String {
        fixtures::valid_assertion(&[
            "arn:aws:iam::111111111111:role/Admin,arn:aws:iam::111111111111:saml-provider/G",
            "arn:aws:iam::222222222222:role/Admin,arn:aws:iam::222222222222:saml-provider/G",
            "arn:aws:iam::333333333333:role/Admin,arn:aws:iam::333333333333:saml-provider/G",
            "arn:aws:iam::333333333333:role/ReadOnly,arn:aws:iam::333333333333:saml-provider/G",
        ])
    }

    fn account_ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    fn inputs<'a>(
        account_ids: &'a [String],
        role_name: &'a str,
        parallel: usize,
    ) -> ExecBatchInputs<'a> {
        ExecBatchInputs {
            account_ids,
            role_name,
            partition: "aws",
            parallel,
            duration_seconds: 3600,
        }
    }

    fn output_accounts(out: &[u8]) -> Vec<String> {
        String::from_utf8(out.to_vec())
            .unwrap()
            .lines()
            .map(|line| {
                let value: AccountCredentials = serde_json::from_str(line).unwrap();
                value.account_id
            })
            .collect()
    }

    #[test]
    fn test_role_arn_for() {
        assert_eq!(
            role_arn_for("aws-us-gov", "123456789012", "Admin"),
            "arn:aws-us-gov:iam::123456789012:role/Admin"
        );
    }

    #[tokio::test]
    async fn test_batch_keeps_input_order_when_exchanges_finish_out_of_order() {
        let assertion = catalog_assertion();
        let ids = account_ids(&ACCOUNTS);
        let exchanger = FakeExchanger::default()
            .with_delay("arn:aws:iam::111111111111:role/Admin", Duration::from_millis(60))
            .with_delay("arn:aws:iam::222222222222:role/Admin", Duration::from_millis(30));
        let mut out = Vec::new();

        exec_batch(&assertion, inputs(&ids, "Admin", 3), &exchanger, &mut out)
            .await
            .unwrap();

        assert_eq!(output_accounts(&out), ids);
        let first: AccountCredentials =
            serde_json::from_str(String::from_utf8(out).unwrap().lines().next().unwrap())
                .unwrap();
        assert_eq!(first.role_arn, "arn:aws:iam::111111111111:role/Admin");
        assert_eq!(
            first.credentials.access_key_id,
            "AKIA-arn:aws:iam::111111111111:role/Admin"
        );
        assert!(exchanger
            .requests
            .borrow()
            .iter()
            .all(|request| request.assertion == assertion && request.duration_seconds == 3600));
    }

    #[tokio::test]
    async fn test_batch_runs_sequentially_by_default() {
        let assertion = catalog_assertion();
        let ids = account_ids(&["333333333333", "111111111111"]);
        let exchanger = FakeExchanger::default();
        let mut out = Vec::new();

        exec_batch(&assertion, inputs(&ids, "Admin", 1), &exchanger, &mut out)
            .await
            .unwrap();

        let called: Vec<String> = exchanger
            .requests
            .borrow()
            .iter()
            .map(|request| request.role_arn.clone())
            .collect();
        assert_eq!(
            called,
            vec![
                "arn:aws:iam::333333333333:role/Admin",
                "arn:aws:iam::111111111111:role/Admin"
            ]
        );
        assert_eq!(output_accounts(&out), ids);
    }

    #[tokio::test]
    async fn test_batch_unknown_role_fails_before_any_exchange() {
        let assertion = catalog_assertion();
        let ids = account_ids(&["111111111111", "222222222222"]);
        let exchanger = FakeExchanger::default();
        let mut out = Vec::new();

        let result =
            exec_batch(&assertion, inputs(&ids, "ReadOnly", 2), &exchanger, &mut out).await;

        assert!(matches!(
            result,
            Err(Error::Roles(roles::Error::RoleNotConfigured(arn)))
                if arn == "arn:aws:iam::111111111111:role/ReadOnly"
        ));
        assert!(exchanger.requests.borrow().is_empty());
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_batch_aborts_on_first_failed_exchange() {
        let assertion = catalog_assertion();
        let ids = account_ids(&ACCOUNTS);
        let exchanger =
            FakeExchanger::default().rejecting("arn:aws:iam::222222222222:role/Admin");
        let mut out = Vec::new();

        let err = exec_batch(&assertion, inputs(&ids, "Admin", 1), &exchanger, &mut out)
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Credential exchange failed: AccessDenied for arn:aws:iam::222222222222:role/Admin"
        );
        assert_eq!(exchanger.requests.borrow().len(), 2);
        assert!(out.is_empty());
    }
}
