//! Organizational unit operations.

use tracing::{info, instrument};

use msad_directory::entry::OrganizationalUnitEntry;
use msad_directory::error::{DirectoryError, DirectoryResult};
use msad_directory::operation::{AttributeSet, SearchCriteria};
use msad_directory::traits::DirectorySession;

use super::directory::{release, ActiveDirectory, CLASS_ORGANIZATIONAL_UNIT};

impl ActiveDirectory {
    /// Look up one organizational unit.
    #[instrument(skip(self))]
    pub async fn get_organizational_unit(
        &self,
        criteria: &SearchCriteria,
    ) -> DirectoryResult<OrganizationalUnitEntry> {
        let mut session = self.open(true).await?;
        let result = self
            .find_one(session.as_mut(), &self.config().base_dn, criteria)
            .await;
        release(session).await;
        result
    }

    /// Organizational units directly below `parent_ou_dn`.
    #[instrument(skip(self))]
    pub async fn list_organizational_units(
        &self,
        parent_ou_dn: &str,
    ) -> DirectoryResult<Vec<OrganizationalUnitEntry>> {
        if parent_ou_dn.is_empty() {
            return Err(DirectoryError::invalid_input(
                "parent distinguished name is empty",
            ));
        }

        let mut session = self.open(true).await?;
        let result = self
            .find(
                session.as_mut(),
                parent_ou_dn,
                &SearchCriteria::by_parent(parent_ou_dn),
            )
            .await;
        release(session).await;
        result
    }

    /// Create an organizational unit and return the stored entry.
    #[instrument(skip(self))]
    pub async fn add_organizational_unit(
        &self,
        dn: &str,
        description: &str,
        street: &str,
    ) -> DirectoryResult<OrganizationalUnitEntry> {
        if dn.is_empty() {
            return Err(DirectoryError::invalid_input("distinguished name is empty"));
        }

        let mut session = self.open(true).await?;
        let result = self
            .add_organizational_unit_in(session.as_mut(), dn, description, street)
            .await;
        release(session).await;
        result
    }

    async fn add_organizational_unit_in(
        &self,
        session: &mut dyn DirectorySession,
        dn: &str,
        description: &str,
        street: &str,
    ) -> DirectoryResult<OrganizationalUnitEntry> {
        let mut attrs = AttributeSet::new().with("objectClass", CLASS_ORGANIZATIONAL_UNIT);
        if !description.is_empty() {
            attrs.set("description", [description]);
        }
        if !street.is_empty() {
            attrs.set("street", [street]);
        }

        session.add(dn, attrs).await?;
        info!(dn = %dn, "Organizational unit created");

        self.find_one(session, &self.config().base_dn, &SearchCriteria::by_dn(dn))
            .await
    }
}
