pub mod select;

use select::SelectRole;
use tracing::debug;

use crate::saml::{self, SamlResponse};
use crate::types::{Role, ROLE_ATTRIBUTE};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Saml(#[from] saml::Error),
    #[error("Invalid role attribute {0:?}, expected \"<role-arn>,<principal-arn>\"")]
    MalformedRole(String),
    #[error("Role {0} is not configured for your user")]
    RoleNotConfigured(String),
    #[error("No roles are configured for your user")]
    NoRolesConfigured,
    #[error(transparent)]
    Selection(#[from] select::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Role {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.split(',').collect::<Vec<_>>()[..] {
            [role_arn, principal_arn] => Ok(Role {
                role_arn: role_arn.trim().to_string(),
                principal_arn: principal_arn.trim().to_string(),
            }),
            _ => Err(Error::MalformedRole(raw.to_string())),
        }
    }
}

/// Every role the assertion authorizes, in attribute order. A single broken
/// entry rejects the whole catalog.
pub fn parse_roles(response: &SamlResponse) -> Result<Vec<Role>> {
    response
        .attribute_values(ROLE_ATTRIBUTE)?
        .iter()
        .map(|value| Role::parse(value))
        .collect()
}

fn find_role(catalog: &[Role], role_arn: &str) -> Result<Role> {
    catalog
        .iter()
        .find(|role| role.role_arn == role_arn)
        .cloned()
        .ok_or_else(|| Error::RoleNotConfigured(role_arn.to_string()))
}

/// Picks exactly one role: the requested one, the only one, or whatever the
/// selector returns when the catalog is ambiguous.
pub fn resolve_role<S: SelectRole + ?Sized>(
    catalog: &[Role],
    requested: Option<&str>,
    selector: &S,
) -> Result<Role> {
    if let Some(role_arn) = requested {
        debug!("Looking up requested role {role_arn}");
        return find_role(catalog, role_arn);
    }
    match catalog {
        [] => Err(Error::NoRolesConfigured),
        [only] => {
            debug!("Single role available, selecting {only}");
            Ok(only.clone())
        }
        _ => {
            let selected = selector.select_one(catalog)?;
            find_role(catalog, &selected)
        }
    }
}
