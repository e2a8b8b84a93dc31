use std::sync::{Arc, Mutex};

use reqwest::Method;
use serde_json::json;
use tracing::{error, info};

use crate::api::{ApiError, Body, Transport};
use crate::models::{self, MacRecord};

/// Fetches the full record list for the current session.
pub async fn fetch_records<T: Transport + ?Sized>(
    transport: &T,
) -> Result<Vec<MacRecord>, ApiError> {
    let response = transport.send(Method::GET, "/mac", None).await?;
    match response.body {
        Body::Json(value) => serde_json::from_value(value).map_err(|e| ApiError::Server {
            status: response.status,
            message: format!("Malformed record list: {e}."),
        }),
        Body::Text(_) => Err(ApiError::Server {
            status: response.status,
            message: "Malformed record list.".to_string(),
        }),
    }
}

pub async fn submit_mac<T: Transport + ?Sized>(
    transport: &T,
    mac_address: &str,
    description: &str,
) -> Result<(), ApiError> {
    let payload = json!({ "macAddress": mac_address, "description": description });
    transport.send(Method::POST, "/mac", Some(payload)).await?;
    Ok(())
}

pub async fn toggle_mac<T: Transport + ?Sized>(transport: &T, id: i64) -> Result<(), ApiError> {
    transport
        .send(Method::PATCH, &format!("/mac/{id}"), None)
        .await?;
    Ok(())
}

pub async fn delete_mac<T: Transport + ?Sized>(transport: &T, id: i64) -> Result<(), ApiError> {
    transport
        .send(Method::DELETE, &format!("/mac/{id}"), None)
        .await?;
    Ok(())
}

// The record view's shared state. Tasks spawned onto the runtime fold
// their results back into these slots; the egui frame loop reads them
// every pass. Cloning shares the same slots.
#[derive(Clone)]
pub struct RecordView {
    transport: Arc<dyn Transport>,
    pub records: Arc<Mutex<Vec<MacRecord>>>,
    pub busy: Arc<Mutex<bool>>,
    pub alert: Arc<Mutex<Option<String>>>,
    pub expired: Arc<Mutex<bool>>,
    pub clear_form: Arc<Mutex<bool>>,
    generation: Arc<Mutex<u64>>,
}

impl RecordView {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            records: Arc::new(Mutex::new(Vec::new())),
            busy: Arc::new(Mutex::new(false)),
            alert: Arc::new(Mutex::new(None)),
            expired: Arc::new(Mutex::new(false)),
            clear_form: Arc::new(Mutex::new(false)),
            generation: Arc::new(Mutex::new(0)),
        }
    }

    fn next_generation(&self) -> u64 {
        let mut generation = self.generation.lock().unwrap();
        *generation += 1;
        *generation
    }

    fn is_current(&self, generation: u64) -> bool {
        *self.generation.lock().unwrap() == generation
    }

    fn raise_alert(&self, message: String) {
        *self.alert.lock().unwrap() = Some(message);
    }

    fn mark_expired(&self, message: String) {
        self.raise_alert(message);
        *self.expired.lock().unwrap() = true;
    }

    // Fetch tagged with a generation: a completion that lost the race
    // against a newer load is discarded instead of overwriting it.
    async fn refetch(&self, generation: u64) {
        match fetch_records(self.transport.as_ref()).await {
            Ok(fetched) => {
                if self.is_current(generation) {
                    *self.records.lock().unwrap() = fetched;
                }
            }
            Err(ApiError::Expired { message, .. }) => self.mark_expired(message),
            Err(e) => error!("failed to load records: {e}"),
        }
    }

    /// Reloads the record list. Non-auth failures only log; the view
    /// keeps showing what it already has.
    pub async fn load(&self) {
        let generation = self.next_generation();
        *self.busy.lock().unwrap() = true;
        self.refetch(generation).await;
        *self.busy.lock().unwrap() = false;
    }

    /// Registers a new MAC address. On success the submit form is
    /// flagged for clearing; in either non-auth outcome the list is
    /// re-fetched so the view reflects true server state.
    pub async fn submit(&self, mac_address: &str, description: &str) {
        let mac_address = mac_address.trim();
        if !models::is_valid_mac(mac_address) {
            self.raise_alert("Invalid MAC address specified.".to_string());
            return;
        }

        *self.busy.lock().unwrap() = true;
        match submit_mac(self.transport.as_ref(), mac_address, description).await {
            Ok(()) => {
                info!(mac = mac_address, "MAC address submitted");
                *self.clear_form.lock().unwrap() = true;
                self.refetch(self.next_generation()).await;
            }
            Err(ApiError::Expired { message, .. }) => self.mark_expired(message),
            Err(e) => {
                self.raise_alert(e.to_string());
                self.refetch(self.next_generation()).await;
            }
        }
        *self.busy.lock().unwrap() = false;
    }

    /// Enables or disables a record's network access.
    pub async fn toggle(&self, id: i64) {
        *self.busy.lock().unwrap() = true;
        match toggle_mac(self.transport.as_ref(), id).await {
            Ok(()) => {
                info!(id, "record toggled");
                self.refetch(self.next_generation()).await;
            }
            Err(ApiError::Expired { message, .. }) => self.mark_expired(message),
            Err(e) => self.raise_alert(e.to_string()),
        }
        *self.busy.lock().unwrap() = false;
    }

    pub async fn delete(&self, id: i64) {
        *self.busy.lock().unwrap() = true;
        match delete_mac(self.transport.as_ref(), id).await {
            Ok(()) => {
                info!(id, "record deleted");
                self.refetch(self.next_generation()).await;
            }
            Err(ApiError::Expired { message, .. }) => self.mark_expired(message),
            Err(e) => self.raise_alert(e.to_string()),
        }
        *self.busy.lock().unwrap() = false;
    }
}
