use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::ConfigStore;
use crate::error::{PresetError, Result};

/// A saved recipient that can be dropped into a quotation header.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct Client {
    #[serde(default)]
    pub institution: String,
    /// Contact person, may span several lines
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
}

impl ConfigStore {
    /// Saved clients as `(key, institution)`, sorted by institution.
    pub fn clients_list(&self) -> Vec<(String, String)> {
        let mut list: Vec<(String, String)> = self
            .document()
            .clients
            .iter()
            .map(|(key, client)| (key.clone(), client.institution.clone()))
            .collect();
        list.sort_by(|a, b| {
            a.1.to_lowercase()
                .cmp(&b.1.to_lowercase())
                .then_with(|| a.0.cmp(&b.0))
        });
        list
    }

    pub fn client(&self, key: &str) -> Result<&Client> {
        self.document()
            .clients
            .get(key)
            .ok_or_else(|| PresetError::ClientNotFound(key.to_string()))
    }

    /// Save a new client under a generated key and return the key.
    pub fn add_client(&mut self, client: Client) -> Result<String> {
        require_institution(&client)?;
        let key = self.new_client_key();
        self.commit(|doc| {
            doc.clients.insert(key.clone(), client);
            Ok(())
        })?;
        tracing::info!("Added client '{key}'");
        Ok(key)
    }

    pub fn update_client(&mut self, key: &str, client: Client) -> Result<()> {
        self.client(key)?;
        require_institution(&client)?;
        self.commit(|doc| {
            doc.clients.insert(key.to_string(), client);
            Ok(())
        })
    }

    pub fn delete_client(&mut self, key: &str) -> Result<()> {
        self.client(key)?;
        self.commit(|doc| {
            doc.clients.remove(key);
            Ok(())
        })?;
        tracing::info!("Deleted client '{key}'");
        Ok(())
    }

    fn new_client_key(&self) -> String {
        let mut stamp = Utc::now().timestamp_millis();
        loop {
            let key = format!("client_{stamp}");
            if !self.document().clients.contains_key(&key) {
                return key;
            }
            stamp += 1;
        }
    }
}

fn require_institution(client: &Client) -> Result<()> {
    if client.institution.trim().is_empty() {
        return Err(PresetError::MissingInstitution);
    }
    Ok(())
}
