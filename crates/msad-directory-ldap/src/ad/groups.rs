//! Group operations.

use tracing::{info, instrument};

use msad_directory::entry::GroupEntry;
use msad_directory::error::{DirectoryError, DirectoryResult};
use msad_directory::operation::{AttributeSet, SearchCriteria};
use msad_directory::traits::DirectorySession;

use super::directory::{escape_rdn_value, release, ActiveDirectory, CLASS_GROUP};

impl ActiveDirectory {
    /// Look up one group.
    #[instrument(skip(self))]
    pub async fn get_group(&self, criteria: &SearchCriteria) -> DirectoryResult<GroupEntry> {
        let mut session = self.open(true).await?;
        let result = self
            .find_one(session.as_mut(), &self.config().base_dn, criteria)
            .await;
        release(session).await;
        result
    }

    /// Groups directly below `parent_ou_dn`.
    #[instrument(skip(self))]
    pub async fn list_groups(&self, parent_ou_dn: &str) -> DirectoryResult<Vec<GroupEntry>> {
        if parent_ou_dn.is_empty() {
            return Err(DirectoryError::invalid_input(
                "parent distinguished name is empty",
            ));
        }

        let mut session = self.open(true).await?;
        let result = self
            .find(
                session.as_mut(),
                &self.config().base_dn,
                &SearchCriteria::by_parent(parent_ou_dn),
            )
            .await;
        release(session).await;
        result
    }

    /// Create a group named `name` below `parent_ou_dn`.
    ///
    /// The name doubles as the group's account name.
    #[instrument(skip(self))]
    pub async fn create_group(
        &self,
        parent_ou_dn: &str,
        name: &str,
        description: &str,
        info: &str,
    ) -> DirectoryResult<GroupEntry> {
        if parent_ou_dn.is_empty() {
            return Err(DirectoryError::invalid_input(
                "parent distinguished name is empty",
            ));
        }
        if name.is_empty() {
            return Err(DirectoryError::invalid_input("group name is empty"));
        }

        let dn = format!("CN={},{parent_ou_dn}", escape_rdn_value(name));
        let mut session = self.open(true).await?;
        let result = self
            .create_group_in(session.as_mut(), &dn, name, description, info)
            .await;
        release(session).await;
        result
    }

    async fn create_group_in(
        &self,
        session: &mut dyn DirectorySession,
        dn: &str,
        name: &str,
        description: &str,
        info: &str,
    ) -> DirectoryResult<GroupEntry> {
        let mut attrs = AttributeSet::new()
            .with("objectClass", CLASS_GROUP)
            .with("sAMAccountName", name);
        if !description.is_empty() {
            attrs.set("description", [description]);
        }
        if !info.is_empty() {
            attrs.set("info", [info]);
        }

        session.add(dn, attrs).await?;
        info!(dn = %dn, "Group created");

        self.find_one(session, &self.config().base_dn, &SearchCriteria::by_dn(dn))
            .await
    }
}
