use chrono::SecondsFormat;
use std::io::Write;

use super::{Error, Result};
use crate::types::Credentials;

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Renders credentials as `eval`-able shell exports followed by the
/// expiration as a shell comment.
pub fn write_export<W: Write>(writer: &mut W, credentials: &Credentials) -> Result {
    let fields = [
        ("AWS_ACCESS_KEY_ID", credentials.access_key_id.as_str()),
        ("AWS_SECRET_ACCESS_KEY", credentials.secret_access_key.as_str()),
        ("AWS_SESSION_TOKEN", credentials.session_token.as_str()),
    ];
    if let Some((name, _)) = fields.iter().find(|(_, value)| value.is_empty()) {
        return Err(Error::MissingField(name));
    }

    let mut rendered = String::new();
    for (name, value) in fields {
        rendered.push_str(&format!("export {name}={}\n", quote(value)));
    }
    rendered.push_str(&format!(
        "# Credentials Expiration: {:?}\n",
        credentials
            .expiration
            .to_rfc3339_opts(SecondsFormat::Secs, true)
    ));
    writer.write_all(rendered.as_bytes())?;
    Ok(())
}
