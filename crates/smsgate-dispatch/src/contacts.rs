// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Address book management.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use smsgate_core::{
    ClientContext, Contact, NewContact, PhoneNormalizer, SmsError, StorageAdapter, Tag,
};
use tracing::{debug, info, warn};

use crate::contact_import::{
    self, ContactImportOutcome, ContactImportRequest, ContactImportSummary,
};
use crate::recipients::{InvalidRecipient, rejection};
use crate::validate;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkImport {
    pub created: Vec<Contact>,
    pub invalid: Vec<InvalidRecipient>,
}

pub struct ContactService {
    storage: Arc<dyn StorageAdapter>,
    normalizer: PhoneNormalizer,
}

impl ContactService {
    pub fn new(storage: Arc<dyn StorageAdapter>, normalizer: PhoneNormalizer) -> Self {
        Self { storage, normalizer }
    }

    pub async fn create(&self, ctx: &ClientContext, contact: NewContact) -> Result<Contact, SmsError> {
        check_fields(contact.name.as_deref(), contact.tag.as_deref())?;
        let phone = rejection(&self.normalizer, &contact.phone)
            .map_err(|reason| SmsError::validation(format!("phone: {reason}")))?;

        let mut created = self
            .storage
            .insert_contacts(&ctx.client_id, &[NewContact { phone, ..contact }])
            .await?;
        let contact = created
            .pop()
            .ok_or_else(|| SmsError::Internal("contact insert returned no row".into()))?;
        self.map_tag(&contact).await;
        Ok(contact)
    }

    /// Inserts every valid entry; malformed phones are reported, not fatal.
    pub async fn create_many(
        &self,
        ctx: &ClientContext,
        contacts: Vec<NewContact>,
    ) -> Result<BulkImport, SmsError> {
        if contacts.is_empty() {
            return Err(SmsError::validation("`contacts` must not be empty"));
        }

        let mut valid = Vec::with_capacity(contacts.len());
        let mut invalid = Vec::new();
        for (i, contact) in contacts.into_iter().enumerate() {
            check_fields(contact.name.as_deref(), contact.tag.as_deref())?;
            match rejection(&self.normalizer, &contact.phone) {
                Ok(phone) => valid.push(NewContact { phone, ..contact }),
                Err(reason) => {
                    invalid.push(InvalidRecipient::new(&contact.phone, reason).at_row(i + 1))
                }
            }
        }

        let created = if valid.is_empty() {
            Vec::new()
        } else {
            self.storage.insert_contacts(&ctx.client_id, &valid).await?
        };
        for contact in &created {
            self.map_tag(contact).await;
        }
        debug!(client_id = %ctx.client_id, created = created.len(), invalid = invalid.len(), "contacts imported");
        Ok(BulkImport { created, invalid })
    }

    pub async fn list(&self, ctx: &ClientContext, tag: Option<&str>) -> Result<Vec<Contact>, SmsError> {
        self.storage.list_contacts(&ctx.client_id, tag).await
    }

    pub async fn update(
        &self,
        ctx: &ClientContext,
        id: &str,
        update: ContactUpdate,
    ) -> Result<Contact, SmsError> {
        check_fields(update.name.as_deref(), update.tag.as_deref())?;
        let contact = self
            .storage
            .update_contact(&ctx.client_id, id, update.name.as_deref(), update.tag.as_deref())
            .await?
            .ok_or_else(|| not_found(id))?;
        if update.tag.is_some() {
            self.map_tag(&contact).await;
        }
        Ok(contact)
    }

    pub async fn delete(&self, ctx: &ClientContext, id: &str) -> Result<(), SmsError> {
        if self.storage.delete_contact(&ctx.client_id, id).await? {
            Ok(())
        } else {
            Err(not_found(id))
        }
    }

    /// Previews or stores an uploaded CSV file. Bad rows never abort a commit.
    pub async fn import(
        &self,
        ctx: &ClientContext,
        req: ContactImportRequest,
    ) -> Result<ContactImportOutcome, SmsError> {
        let parsed = contact_import::parse_contact_csv(&req, &self.normalizer)?;
        if !req.commit {
            return Ok(ContactImportOutcome::Preview(contact_import::preview(parsed)));
        }
        for contact in &parsed.contacts {
            check_fields(contact.name.as_deref(), contact.tag.as_deref())?;
        }

        let created = if parsed.contacts.is_empty() {
            Vec::new()
        } else {
            self.storage
                .insert_contacts(&ctx.client_id, &parsed.contacts)
                .await?
        };
        for contact in &created {
            self.map_tag(contact).await;
        }
        info!(client_id = %ctx.client_id, created = created.len(), invalid = parsed.invalid.len(), "contact file imported");
        Ok(ContactImportOutcome::Committed(ContactImportSummary {
            created: created.len(),
            invalid: parsed.invalid,
        }))
    }

    /// Deletes the caller's contacts among `ids`; foreign or unknown ids are
    /// ignored.
    pub async fn delete_many(&self, ctx: &ClientContext, ids: &[String]) -> Result<u64, SmsError> {
        if ids.is_empty() {
            return Err(SmsError::validation("`ids` must not be empty"));
        }
        let deleted = self.storage.delete_contacts(&ctx.client_id, ids).await?;
        debug!(client_id = %ctx.client_id, requested = ids.len(), deleted, "contacts deleted");
        Ok(deleted)
    }

    pub async fn list_tags(&self, ctx: &ClientContext) -> Result<Vec<Tag>, SmsError> {
        self.storage.list_tags(&ctx.client_id).await
    }

    /// Returns the named tag, creating it if it does not exist yet.
    pub async fn create_tag(&self, ctx: &ClientContext, name: &str) -> Result<Tag, SmsError> {
        let name = name.trim();
        validate::length("name", name, 1, 60)?;
        let id = self.storage.ensure_tag(&ctx.client_id, name).await?;
        self.storage
            .list_tags(&ctx.client_id)
            .await?
            .into_iter()
            .find(|tag| tag.id == id)
            .ok_or_else(|| SmsError::Internal(format!("tag {id} vanished after insert")))
    }

    /// Keeps the tag table and contact/tag links in step with `contact.tag`.
    /// The `tag` column stays authoritative, so failures are only logged.
    async fn map_tag(&self, contact: &Contact) {
        let Some(tag) = contact.tag.as_deref().filter(|t| !t.is_empty()) else {
            return;
        };
        let linked = async {
            let tag_id = self.storage.ensure_tag(&contact.client_id, tag).await?;
            self.storage.link_contact_tag(&contact.id, &tag_id).await
        };
        if let Err(e) = linked.await {
            warn!(contact_id = %contact.id, tag, error = %e, "failed to update tag mapping");
        }
    }
}

fn check_fields(name: Option<&str>, tag: Option<&str>) -> Result<(), SmsError> {
    validate::optional("name", name, 120)?;
    validate::optional("tag", tag, 60)
}

fn not_found(id: &str) -> SmsError {
    SmsError::NotFound {
        entity: "contact",
        id: id.to_string(),
    }
}
