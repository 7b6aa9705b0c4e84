use super::error::{CatalogError, CatalogResult};

/// Identity of the caller, handed to every catalog operation. Sign-in happens
/// elsewhere; the catalog only needs the account the data is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    account_id: String,
}

impl Session {
    pub fn new(account_id: impl Into<String>) -> CatalogResult<Self> {
        let account_id = account_id.into().trim().to_string();
        if account_id.is_empty() {
            return Err(CatalogError::Unauthenticated);
        }
        Ok(Self { account_id })
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_account_is_unauthenticated() {
        assert!(matches!(
            Session::new("   "),
            Err(CatalogError::Unauthenticated)
        ));
        assert_eq!(Session::new(" strings ").unwrap().account_id(), "strings");
    }
}
