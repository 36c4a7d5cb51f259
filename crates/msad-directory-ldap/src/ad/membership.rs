//! Group membership management.
//!
//! Membership changes read the group's `member` list and write the whole list
//! back with a replace. Two concurrent writers on the same group can lose an
//! update; the last write wins.

use tracing::{debug, info, instrument};

use msad_directory::entry::UserEntry;
use msad_directory::error::{DirectoryError, DirectoryResult};
use msad_directory::operation::{Modification, SearchCriteria, SearchScope};
use msad_directory::traits::DirectorySession;

use super::directory::{release, ActiveDirectory, CLASS_GROUP, CLASS_USER};
use super::users::normalize_account;
use crate::filter::build_filter;

const MEMBER_ATTRIBUTE: &str = "member";

impl ActiveDirectory {
    /// Add `member_dn` to the group at `group_dn`.
    ///
    /// Adding a DN that is already a member leaves the group untouched.
    #[instrument(skip(self))]
    pub async fn add_member(&self, group_dn: &str, member_dn: &str) -> DirectoryResult<()> {
        check_dns(group_dn, member_dn)?;

        let mut session = self.open(true).await?;
        let result = self
            .update_members(session.as_mut(), group_dn, |members| {
                if members.iter().any(|m| m.eq_ignore_ascii_case(member_dn)) {
                    return false;
                }
                members.push(member_dn.to_string());
                true
            })
            .await;
        release(session).await;
        result
    }

    /// Remove `member_dn` from the group at `group_dn`. DN comparison ignores case.
    #[instrument(skip(self))]
    pub async fn remove_member(&self, group_dn: &str, member_dn: &str) -> DirectoryResult<()> {
        check_dns(group_dn, member_dn)?;

        let mut session = self.open(true).await?;
        let result = self
            .update_members(session.as_mut(), group_dn, |members| {
                let before = members.len();
                members.retain(|m| !m.eq_ignore_ascii_case(member_dn));
                members.len() != before
            })
            .await;
        release(session).await;
        result
    }

    /// True when the user `member_account` is a direct member of the group
    /// `group_account`.
    #[instrument(skip(self))]
    pub async fn is_member(
        &self,
        group_account: &str,
        member_account: &str,
    ) -> DirectoryResult<bool> {
        if group_account.is_empty() {
            return Err(DirectoryError::invalid_input("group account is empty"));
        }
        let member_account = normalize_account(member_account)?;

        let mut session = self.open(true).await?;
        let result = self
            .is_member_in(session.as_mut(), group_account, &member_account)
            .await;
        release(session).await;
        result
    }

    /// True when `account` belongs to the configured administrators group.
    #[instrument(skip(self))]
    pub async fn is_administrator(&self, account: &str) -> DirectoryResult<bool> {
        let Some(group) = self.config().admin_group.as_deref().filter(|g| !g.is_empty()) else {
            return Err(DirectoryError::InvalidConfiguration {
                message: "no administrator group configured".to_string(),
            });
        };
        self.is_member(group, account).await
    }

    /// Users listed in the `member` attribute of the group at `group_dn`.
    #[instrument(skip(self))]
    pub async fn group_users(&self, group_dn: &str) -> DirectoryResult<Vec<UserEntry>> {
        if group_dn.is_empty() {
            return Err(DirectoryError::invalid_input(
                "group distinguished name is empty",
            ));
        }

        let mut session = self.open(true).await?;
        let result = self.group_users_in(session.as_mut(), group_dn).await;
        release(session).await;
        result
    }

    async fn update_members<F>(
        &self,
        session: &mut dyn DirectorySession,
        group_dn: &str,
        update: F,
    ) -> DirectoryResult<()>
    where
        F: FnOnce(&mut Vec<String>) -> bool + Send,
    {
        let record = self
            .search_one_with(
                session,
                &self.config().base_dn,
                CLASS_GROUP,
                &SearchCriteria::by_dn(group_dn),
                &[MEMBER_ATTRIBUTE],
            )
            .await?;

        let mut members = record.values(MEMBER_ATTRIBUTE).to_vec();
        if !update(&mut members) {
            debug!(group = %record.dn, "Membership already up to date");
            return Ok(());
        }

        session
            .modify(
                &record.dn,
                vec![Modification::replace(MEMBER_ATTRIBUTE, members)],
            )
            .await?;
        info!(group = %record.dn, "Group membership updated");
        Ok(())
    }

    async fn is_member_in(
        &self,
        session: &mut dyn DirectorySession,
        group_account: &str,
        member_account: &str,
    ) -> DirectoryResult<bool> {
        let base_dn = &self.config().base_dn;
        let group = self
            .search_one_with(
                session,
                base_dn,
                CLASS_GROUP,
                &SearchCriteria::by_account(group_account),
                &[MEMBER_ATTRIBUTE],
            )
            .await?;
        let member = self
            .search_one(
                session,
                base_dn,
                CLASS_USER,
                &SearchCriteria::by_account(member_account),
            )
            .await?;

        Ok(group
            .values(MEMBER_ATTRIBUTE)
            .iter()
            .any(|dn| dn.eq_ignore_ascii_case(&member.dn)))
    }

    async fn group_users_in(
        &self,
        session: &mut dyn DirectorySession,
        group_dn: &str,
    ) -> DirectoryResult<Vec<UserEntry>> {
        let filter = build_filter(CLASS_GROUP, &SearchCriteria::by_dn(group_dn));
        let records = session
            .search(group_dn, SearchScope::Subtree, &filter, &[MEMBER_ATTRIBUTE])
            .await?;

        let members: Vec<&str> = records
            .iter()
            .flat_map(|record| record.values(MEMBER_ATTRIBUTE))
            .map(String::as_str)
            .filter(|dn| !dn.is_empty())
            .collect();
        if members.is_empty() {
            return Ok(Vec::new());
        }

        self.find_users(session, &SearchCriteria::by_dns(members))
            .await
    }
}

fn check_dns(group_dn: &str, member_dn: &str) -> DirectoryResult<()> {
    if group_dn.is_empty() {
        return Err(DirectoryError::invalid_input(
            "group distinguished name is empty",
        ));
    }
    if member_dn.is_empty() {
        return Err(DirectoryError::invalid_input(
            "member distinguished name is empty",
        ));
    }
    Ok(())
}
