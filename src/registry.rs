use crate::api::CrmBackend;
use crate::errors::ClientError;
use crate::forms::ClientForm;
use crate::models::{Client, ClientId};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

#[derive(Debug, Default)]
struct RegistryState {
    clients: Vec<Client>,
    in_flight: HashSet<ClientId>,
    adding: bool,
    loaded: bool,
}

/// In-memory mirror of the backend's client records.
///
/// Local state only changes after a successful server response. Updates and deletes are
/// serialized per record: a second mutation of a record whose previous one is still
/// outstanding fails with [`ClientError::Busy`] before reaching the server. Only one add
/// is outstanding at a time; another fails with [`ClientError::AddPending`].
pub struct ClientRegistry<B> {
    backend: B,
    state: Mutex<RegistryState>,
}

impl<B: CrmBackend> ClientRegistry<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: Mutex::new(RegistryState::default()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Replaces local state with the server's list. On failure the previous
    /// (possibly stale) records are kept.
    pub async fn load(&self) -> Result<usize, ClientError> {
        let fetched = self.backend.list_clients().await?;
        let mut seen = HashSet::with_capacity(fetched.len());
        let mut clients = Vec::with_capacity(fetched.len());
        // Keep the last copy of a duplicated id.
        for client in fetched.into_iter().rev() {
            if seen.insert(client.id) {
                clients.push(client);
            } else {
                warn!(id = client.id, "server returned duplicate client id");
            }
        }
        clients.reverse();

        let count = clients.len();
        let mut state = self.lock();
        state.clients = clients;
        state.loaded = true;
        info!(count, "client list loaded");
        Ok(count)
    }

    pub async fn add(&self, form: &ClientForm) -> Result<Client, ClientError> {
        let draft = form.validate()?;
        let _pending = self.begin(Slot::Add)?;
        let created = self.backend.add_client(&draft).await?;

        let mut state = self.lock();
        match state.clients.iter_mut().find(|client| client.id == created.id) {
            Some(existing) => *existing = created.clone(),
            None => state.clients.push(created.clone()),
        }
        info!(id = created.id, "client added");
        Ok(created)
    }

    /// Sends a full replacement of record `id`, which must already be loaded.
    pub async fn update(&self, id: ClientId, form: &ClientForm) -> Result<Client, ClientError> {
        let draft = form.validate()?;
        let current = self
            .get(id)
            .ok_or_else(|| ClientError::validation(format!("Client {id} is not in the list")))?;

        let _pending = self.begin(Slot::Record(id))?;
        let payload = current.with_draft(&draft);
        let updated = self.backend.update_client(id, &payload).await?;

        let mut state = self.lock();
        if updated.id != id {
            warn!(id, returned = updated.id, "server returned a different id, local list left as is");
            return Ok(updated);
        }
        match state.clients.iter_mut().find(|client| client.id == id) {
            Some(existing) => *existing = updated.clone(),
            None => warn!(id, "updated client no longer in local list"),
        }
        info!(id, "client updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: ClientId) -> Result<(), ClientError> {
        let _pending = self.begin(Slot::Record(id))?;
        self.backend.delete_client(id).await?;

        self.lock().clients.retain(|client| client.id != id);
        info!(id, "client deleted");
        Ok(())
    }

    /// Fetches one record from the server without touching local state.
    pub async fn fetch(&self, id: ClientId) -> Result<Client, ClientError> {
        self.backend.fetch_client(id).await
    }

    pub fn search(&self, term: &str) -> Vec<Client> {
        search_clients(&self.lock().clients, term)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn clients(&self) -> Vec<Client> {
        self.lock().clients.clone()
    }

    pub fn get(&self, id: ClientId) -> Option<Client> {
        self.lock().clients.iter().find(|client| client.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_loaded(&self) -> bool {
        self.lock().loaded
    }

    pub fn is_pending(&self, id: ClientId) -> bool {
        self.lock().in_flight.contains(&id)
    }

    pub fn is_adding(&self) -> bool {
        self.lock().adding
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.clients.clear();
        state.loaded = false;
    }

    fn begin(&self, slot: Slot) -> Result<PendingMutation<'_>, ClientError> {
        let mut state = self.lock();
        match slot {
            Slot::Record(id) if !state.in_flight.insert(id) => {
                warn!(id, "rejected overlapping change");
                return Err(ClientError::Busy(id));
            }
            Slot::Add if state.adding => {
                warn!("rejected overlapping add");
                return Err(ClientError::AddPending);
            }
            Slot::Add => state.adding = true,
            Slot::Record(_) => {}
        }
        Ok(PendingMutation {
            state: &self.state,
            slot,
        })
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Add,
    Record(ClientId),
}

// Releases the in-flight mark when the mutation finishes or its future is dropped.
struct PendingMutation<'a> {
    state: &'a Mutex<RegistryState>,
    slot: Slot,
}

impl Drop for PendingMutation<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match self.slot {
            Slot::Add => state.adding = false,
            Slot::Record(id) => {
                state.in_flight.remove(&id);
            }
        }
    }
}

/// Case-insensitive substring match on name, email or phone.
pub fn search_clients<'a>(clients: &'a [Client], term: &str) -> Vec<&'a Client> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return clients.iter().collect();
    }
    clients
        .iter()
        .filter(|client| {
            client.name.to_lowercase().contains(&needle)
                || client.email.to_lowercase().contains(&needle)
                || client.phone.to_lowercase().contains(&needle)
        })
        .collect()
}
