//! Authentication and password management.

use tracing::{debug, info, instrument, warn};

use msad_directory::entry::UserEntry;
use msad_directory::error::{DirectoryError, DirectoryResult};
use msad_directory::operation::{Modification, SearchCriteria};
use msad_directory::traits::DirectorySession;

use super::directory::{release, ActiveDirectory};
use super::password::{classify_password_error, password_replace};
use super::users::normalize_account;

impl ActiveDirectory {
    /// Check `password` for `account` and return the user on success.
    ///
    /// Disabled accounts are rejected before the password is tried. The
    /// password is checked with a bind on a separate, unauthenticated
    /// session so the service session is never rebound. Only a rejected bind
    /// is reported as `IncorrectPassword`; transport errors pass through.
    #[instrument(skip(self, password))]
    pub async fn login(&self, account: &str, password: &str) -> DirectoryResult<UserEntry> {
        let account = normalize_account(account)?;
        check_password(password)?;

        let mut session = self.open(true).await?;
        let result = self.login_in(session.as_mut(), &account, password).await;
        release(session).await;
        result
    }

    /// Reset the password of `account`.
    #[instrument(skip(self, password))]
    pub async fn set_password(&self, account: &str, password: &str) -> DirectoryResult<()> {
        let account = normalize_account(account)?;
        let change = password_replace(password)?;

        let mut session = self.open(true).await?;
        let result = self
            .set_password_in(session.as_mut(), &account, change)
            .await;
        release(session).await;
        result
    }

    /// Change the password of `account` after verifying the old one.
    #[instrument(skip(self, old_password, new_password))]
    pub async fn change_password(
        &self,
        account: &str,
        old_password: &str,
        new_password: &str,
    ) -> DirectoryResult<()> {
        let account = normalize_account(account)?;
        check_password(old_password)?;
        let change = password_replace(new_password)?;

        let mut session = self.open(true).await?;
        let result = self
            .change_password_in(session.as_mut(), &account, old_password, change)
            .await;
        release(session).await;
        result
    }

    async fn set_password_in(
        &self,
        session: &mut dyn DirectorySession,
        account: &str,
        change: Modification,
    ) -> DirectoryResult<()> {
        let user = self
            .find_user(session, &SearchCriteria::by_account(account))
            .await?;
        write_password(session, user.dn(), change).await
    }

    async fn change_password_in(
        &self,
        session: &mut dyn DirectorySession,
        account: &str,
        old_password: &str,
        change: Modification,
    ) -> DirectoryResult<()> {
        let user = self.login_in(session, account, old_password).await?;
        write_password(session, user.dn(), change).await
    }

    async fn login_in(
        &self,
        session: &mut dyn DirectorySession,
        account: &str,
        password: &str,
    ) -> DirectoryResult<UserEntry> {
        let user = self
            .find_user(session, &SearchCriteria::by_account(account))
            .await?;

        let (_, flags) = self
            .account_control_in(session, &SearchCriteria::by_dn(user.dn()))
            .await?;
        if flags.disabled {
            return Err(DirectoryError::AccountDisabled {
                account: account.to_string(),
            });
        }

        let mut user_session = self.open(false).await?;
        let bind = user_session.simple_bind(user.dn(), password).await;
        release(user_session).await;

        match bind {
            Ok(()) => {
                debug!(dn = %user.dn(), "Login succeeded");
                Ok(user)
            }
            Err(DirectoryError::AuthenticationFailed) => {
                warn!(dn = %user.dn(), "Login rejected");
                Err(DirectoryError::IncorrectPassword)
            }
            Err(e) => Err(e),
        }
    }
}

async fn write_password(
    session: &mut dyn DirectorySession,
    dn: &str,
    change: Modification,
) -> DirectoryResult<()> {
    session
        .modify(dn, vec![change])
        .await
        .map_err(classify_password_error)?;
    info!(dn = %dn, "Password updated");
    Ok(())
}

/// An empty password would turn the bind into an anonymous one.
fn check_password(password: &str) -> DirectoryResult<()> {
    if password.is_empty() {
        return Err(DirectoryError::invalid_input("password is empty"));
    }
    Ok(())
}
