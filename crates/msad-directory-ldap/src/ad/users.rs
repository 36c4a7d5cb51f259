//! User operations: lookup, listing, creation, account control and dial-in.

use std::collections::HashMap;

use tracing::{debug, info, instrument, warn};

use msad_directory::entry::{OrganizationalUnitEntry, UserCreationRequest, UserEntry};
use msad_directory::error::{DirectoryError, DirectoryResult};
use msad_directory::operation::{AttributeSet, Modification, SearchCriteria, SearchScope};
use msad_directory::traits::DirectorySession;

use super::directory::{
    dn_name, escape_rdn_value, release, to_sam_account, ActiveDirectory, DirectoryObject,
    CLASS_USER,
};
use super::password::{classify_password_error, encode_ad_password, UNICODE_PWD};
use super::user_account_control::AccountControlFlags;

const DIALIN_ATTRIBUTE: &str = "msNPAllowDialin";
const ACCOUNT_CONTROL_ATTRIBUTE: &str = "userAccountControl";
const ALL_PERSONS_FILTER: &str = "(&(&(objectCategory=Person)(objectClass=user)))";

impl ActiveDirectory {
    /// Look up one user.
    #[instrument(skip(self))]
    pub async fn get_user(&self, criteria: &SearchCriteria) -> DirectoryResult<UserEntry> {
        let mut session = self.open(true).await?;
        let result = self.find_user(session.as_mut(), criteria).await;
        release(session).await;
        result
    }

    /// Users directly below `parent_ou_dn`.
    #[instrument(skip(self))]
    pub async fn list_users(&self, parent_ou_dn: &str) -> DirectoryResult<Vec<UserEntry>> {
        if parent_ou_dn.is_empty() {
            return Err(DirectoryError::invalid_input(
                "parent distinguished name is empty",
            ));
        }

        let mut session = self.open(true).await?;
        let result = self
            .find_users(session.as_mut(), &SearchCriteria::by_parent(parent_ou_dn))
            .await;
        release(session).await;
        result
    }

    /// Every person in the domain, keyed by SID.
    #[instrument(skip(self))]
    pub async fn all_users(&self) -> DirectoryResult<HashMap<String, UserEntry>> {
        let mut session = self.open(true).await?;
        let result = session
            .search(
                &self.config().base_dn,
                SearchScope::Subtree,
                ALL_PERSONS_FILTER,
                UserEntry::ATTRIBUTES,
            )
            .await
            .map(|records| {
                records
                    .iter()
                    .map(UserEntry::from_record)
                    .map(|user| (user.security_id.clone(), user))
                    .collect()
            });
        release(session).await;
        result
    }

    /// Users with dial-in access enabled.
    #[instrument(skip(self))]
    pub async fn vpn_users(&self) -> DirectoryResult<Vec<UserEntry>> {
        let mut session = self.open(true).await?;
        let result = self
            .find_users(session.as_mut(), &SearchCriteria::new().with_dialin_flag("TRUE"))
            .await;
        release(session).await;
        result
    }

    /// Users whose manager is `account`.
    #[instrument(skip(self))]
    pub async fn subordinates(&self, account: &str) -> DirectoryResult<Vec<UserEntry>> {
        let account = normalize_account(account)?;

        let mut session = self.open(true).await?;
        let result = self.subordinates_in(session.as_mut(), &account).await;
        release(session).await;
        result
    }

    async fn subordinates_in(
        &self,
        session: &mut dyn DirectorySession,
        account: &str,
    ) -> DirectoryResult<Vec<UserEntry>> {
        let manager = self
            .find_user(session, &SearchCriteria::by_account(account))
            .await?;
        self.find_users(session, &SearchCriteria::new().with_manager(manager.dn()))
            .await
    }

    /// Create a user, set its password and return the stored entry.
    ///
    /// The entry is deleted again when the password is rejected. Created
    /// accounts are enabled with a non-expiring password.
    #[instrument(skip(self, request), fields(name = %request.name, account = %request.account))]
    pub async fn create_user(&self, request: UserCreationRequest) -> DirectoryResult<UserEntry> {
        if request.name.is_empty() {
            return Err(DirectoryError::invalid_input("user name is empty"));
        }
        if request.account.is_empty() {
            return Err(DirectoryError::invalid_input("account is empty"));
        }
        let password = encode_ad_password(&request.password)?;

        let mut session = self.open(true).await?;
        let result = self
            .create_user_in(session.as_mut(), &request, password)
            .await;
        release(session).await;
        result
    }

    async fn create_user_in(
        &self,
        session: &mut dyn DirectorySession,
        request: &UserCreationRequest,
        password: Vec<u8>,
    ) -> DirectoryResult<UserEntry> {
        let base_dn = &self.config().base_dn;

        let parent_dn = match request.parent_ou_dn.as_deref().filter(|dn| !dn.is_empty()) {
            Some(parent) => {
                let ou = self
                    .find_one::<OrganizationalUnitEntry>(session, base_dn, &SearchCriteria::by_dn(parent))
                    .await
                    .map_err(|e| {
                        if e.is_not_found() {
                            DirectoryError::not_found(format!(
                                "organizational unit ({})",
                                dn_name(parent)
                            ))
                        } else {
                            e
                        }
                    })?;
                ou.entry.distinguished_name
            }
            None => self.config().default_users_dn(),
        };
        let dn = format!("CN={},{}", escape_rdn_value(&request.name), parent_dn);

        let manager = request.manager_dn.as_deref().filter(|dn| !dn.is_empty());
        if let Some(manager) = manager {
            let found = self
                .find::<UserEntry>(session, base_dn, &SearchCriteria::by_dn(manager))
                .await?;
            if found.is_empty() {
                return Err(DirectoryError::not_found(format!(
                    "manager ({})",
                    dn_name(manager)
                )));
            }
        }

        let by_dn = self
            .find::<UserEntry>(session, base_dn, &SearchCriteria::by_dn(&dn))
            .await?;
        if !by_dn.is_empty() {
            return Err(DirectoryError::already_exists(format!(
                "user name ({})",
                request.name
            )));
        }
        let by_account = self
            .find::<UserEntry>(session, base_dn, &SearchCriteria::by_account(&request.account))
            .await?;
        if !by_account.is_empty() {
            return Err(DirectoryError::already_exists(format!(
                "account ({})",
                request.account
            )));
        }

        let mut attrs = AttributeSet::new()
            .with("objectClass", CLASS_USER)
            .with("sAMAccountName", request.account.as_str());
        if let Some(manager) = manager {
            attrs.set("manager", [manager]);
        }
        session.add(&dn, attrs).await?;
        debug!(dn = %dn, "User entry added");

        let set_password = session
            .modify(&dn, vec![Modification::replace(UNICODE_PWD, [password])])
            .await;
        if let Err(err) = set_password {
            warn!(dn = %dn, error = %err, "Password rejected, removing new user");
            if let Err(e) = session.delete(&dn).await {
                warn!(dn = %dn, error = %e, "Failed to remove user after password failure");
            }
            return Err(classify_password_error(err));
        }

        let flags = AccountControlFlags {
            disabled: false,
            password_never_expires: true,
        };
        if let Err(e) = self
            .set_account_control_in(session, &SearchCriteria::by_dn(&dn), flags)
            .await
        {
            warn!(dn = %dn, error = %e, "Failed to update account control of new user");
        }

        let user = self.find_user(session, &SearchCriteria::by_dn(&dn)).await?;
        info!(dn = %dn, account = %user.account_name, "User created");
        Ok(user)
    }

    /// Managed account-control flags of a user.
    #[instrument(skip(self))]
    pub async fn account_control(&self, account: &str) -> DirectoryResult<AccountControlFlags> {
        let account = normalize_account(account)?;

        let mut session = self.open(true).await?;
        let result = self
            .account_control_in(session.as_mut(), &SearchCriteria::by_account(&account))
            .await
            .map(|(_, flags)| flags);
        release(session).await;
        result
    }

    /// Write the managed account-control flags, preserving every other bit.
    #[instrument(skip(self))]
    pub async fn set_account_control(
        &self,
        account: &str,
        flags: AccountControlFlags,
    ) -> DirectoryResult<()> {
        let account = normalize_account(account)?;

        let mut session = self.open(true).await?;
        let result = self
            .set_account_control_in(session.as_mut(), &SearchCriteria::by_account(&account), flags)
            .await;
        release(session).await;
        result
    }

    /// Current dial-in flag of a user.
    #[instrument(skip(self))]
    pub async fn vpn_enabled(&self, account: &str) -> DirectoryResult<bool> {
        let account = normalize_account(account)?;

        let mut session = self.open(true).await?;
        let result = self
            .find_user(session.as_mut(), &SearchCriteria::by_account(&account))
            .await
            .map(|user| user.is_dialin_enabled());
        release(session).await;
        result
    }

    /// Grant or revoke dial-in access.
    #[instrument(skip(self))]
    pub async fn set_vpn_enabled(&self, account: &str, enable: bool) -> DirectoryResult<()> {
        let account = normalize_account(account)?;

        let mut session = self.open(true).await?;
        let result = self
            .set_vpn_enabled_in(session.as_mut(), &account, enable)
            .await;
        release(session).await;
        result
    }

    async fn set_vpn_enabled_in(
        &self,
        session: &mut dyn DirectorySession,
        account: &str,
        enable: bool,
    ) -> DirectoryResult<()> {
        let user = self
            .find_user(session, &SearchCriteria::by_account(account))
            .await?;
        let present = user.dialin_enabled.as_deref().is_some_and(|v| !v.is_empty());

        let change = match (enable, present) {
            (true, true) => Modification::replace(DIALIN_ATTRIBUTE, ["TRUE"]),
            (true, false) => Modification::add(DIALIN_ATTRIBUTE, ["TRUE"]),
            (false, true) => Modification::delete(DIALIN_ATTRIBUTE, Vec::<String>::new()),
            (false, false) => return Ok(()),
        };
        session.modify(user.dn(), vec![change]).await?;
        info!(dn = %user.dn(), enable, "Dial-in access updated");
        Ok(())
    }

    pub(crate) async fn find_user(
        &self,
        session: &mut dyn DirectorySession,
        criteria: &SearchCriteria,
    ) -> DirectoryResult<UserEntry> {
        let base_dn = users_base(self, criteria);
        self.find_one(session, &base_dn, criteria).await
    }

    pub(crate) async fn find_users(
        &self,
        session: &mut dyn DirectorySession,
        criteria: &SearchCriteria,
    ) -> DirectoryResult<Vec<UserEntry>> {
        let base_dn = users_base(self, criteria);
        self.find(session, &base_dn, criteria).await
    }

    pub(crate) async fn account_control_in(
        &self,
        session: &mut dyn DirectorySession,
        criteria: &SearchCriteria,
    ) -> DirectoryResult<(String, AccountControlFlags)> {
        let record = self
            .search_one_with(
                session,
                &self.config().base_dn,
                CLASS_USER,
                criteria,
                &[ACCOUNT_CONTROL_ATTRIBUTE],
            )
            .await?;
        let flags = AccountControlFlags::decode(record.value(ACCOUNT_CONTROL_ATTRIBUTE))?;
        Ok((record.dn, flags))
    }

    async fn set_account_control_in(
        &self,
        session: &mut dyn DirectorySession,
        criteria: &SearchCriteria,
        flags: AccountControlFlags,
    ) -> DirectoryResult<()> {
        let record = self
            .search_one_with(
                session,
                &self.config().base_dn,
                CLASS_USER,
                criteria,
                &[ACCOUNT_CONTROL_ATTRIBUTE],
            )
            .await?;
        let value = flags.encode(record.value(ACCOUNT_CONTROL_ATTRIBUTE))?;

        session
            .modify(
                &record.dn,
                vec![Modification::replace(ACCOUNT_CONTROL_ATTRIBUTE, [value])],
            )
            .await?;
        info!(dn = %record.dn, disabled = flags.disabled, "Account control updated");
        Ok(())
    }
}

/// Users are searched below their parent OU when one is given.
fn users_base(directory: &ActiveDirectory, criteria: &SearchCriteria) -> String {
    match criteria.parent_ou_dn.as_deref().filter(|dn| !dn.is_empty()) {
        Some(parent) => parent.to_string(),
        None => directory.config().base_dn.clone(),
    }
}

/// Reduce an account to its logon name, rejecting empty results.
pub(crate) fn normalize_account(account: &str) -> DirectoryResult<String> {
    if account.is_empty() {
        return Err(DirectoryError::invalid_input("account is empty"));
    }
    let sam = to_sam_account(account);
    if sam.is_empty() {
        return Err(DirectoryError::invalid_input(format!(
            "account ({account}) is invalid"
        )));
    }
    Ok(sam)
}
