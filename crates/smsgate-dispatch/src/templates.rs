// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Saved message templates.

use std::sync::Arc;

use serde::Deserialize;
use smsgate_core::{
    ClientContext, Clock, MessageTemplate, SmsError, StorageAdapter, extract_variables,
};
use tracing::debug;
use uuid::Uuid;

use crate::validate;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTemplate {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub text: String,
}

pub struct TemplateService {
    storage: Arc<dyn StorageAdapter>,
    clock: Arc<dyn Clock>,
}

impl TemplateService {
    pub fn new(storage: Arc<dyn StorageAdapter>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    pub async fn list(&self, ctx: &ClientContext) -> Result<Vec<MessageTemplate>, SmsError> {
        self.storage.list_templates(&ctx.client_id).await
    }

    /// Stores a template along with the placeholder names found in its text.
    pub async fn create(
        &self,
        ctx: &ClientContext,
        template: NewTemplate,
    ) -> Result<MessageTemplate, SmsError> {
        let name = template.name.trim();
        validate::length("name", name, 1, 120)?;
        validate::length("text", &template.text, 1, 1000)?;

        let template = MessageTemplate {
            id: Uuid::new_v4().to_string(),
            client_id: ctx.client_id.clone(),
            name: name.to_string(),
            variables: extract_variables(&template.text),
            text: template.text,
            created_at: self.clock.timestamp(),
        };
        self.storage.insert_template(&template).await?;
        debug!(client_id = %ctx.client_id, template_id = %template.id, variables = template.variables.len(), "template saved");
        Ok(template)
    }
}
