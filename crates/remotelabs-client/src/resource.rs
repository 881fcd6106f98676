//! Fetched list state for one backend collection.
//!
//! A [`Resource`] is scoped by its collection path (which embeds the scoping
//! key, e.g. a user or subject id). The list is only ever replaced by a
//! server response; there is no local mutation path.
//!
//! Every fetch takes a ticket from a monotonically increasing counter. Only
//! the response holding the newest ticket is applied, so a slow response to
//! an older request can never overwrite a newer one.

use std::sync::{
  Arc,
  atomic::{AtomicU64, Ordering},
};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{ApiClient, Result};

#[derive(Debug)]
struct State<T> {
  path:    String,
  items:   Vec<T>,
  loading: bool,
  error:   Option<String>,
}

/// List state with manual refresh. Cheap to clone; clones share state.
#[derive(Debug)]
pub struct Resource<T> {
  client: ApiClient,
  state:  Arc<RwLock<State<T>>>,
  issued: Arc<AtomicU64>,
}

impl<T> Clone for Resource<T> {
  fn clone(&self) -> Self {
    Self {
      client: self.client.clone(),
      state:  Arc::clone(&self.state),
      issued: Arc::clone(&self.issued),
    }
  }
}

impl<T: DeserializeOwned + Clone> Resource<T> {
  /// An empty resource for `path`. Nothing is fetched until [`Self::fetch`].
  pub fn new(client: ApiClient, path: impl Into<String>) -> Self {
    Self {
      client,
      state: Arc::new(RwLock::new(State {
        path:    path.into(),
        items:   Vec::new(),
        loading: false,
        error:   None,
      })),
      issued: Arc::new(AtomicU64::new(0)),
    }
  }

  pub fn client(&self) -> &ApiClient { &self.client }

  pub fn path(&self) -> String { self.state.read().path.clone() }

  /// Snapshot of the current list.
  pub fn items(&self) -> Vec<T> { self.state.read().items.clone() }

  pub fn len(&self) -> usize { self.state.read().items.len() }

  pub fn is_empty(&self) -> bool { self.state.read().items.is_empty() }

  pub fn is_loading(&self) -> bool { self.state.read().loading }

  /// Message of the last failed fetch, cleared when a fetch starts.
  pub fn error(&self) -> Option<String> { self.state.read().error.clone() }

  /// Re-read the collection.
  ///
  /// On failure the previous list is kept and [`Self::error`] is set. The
  /// caller always receives the outcome of its own request, even when a
  /// newer fetch has superseded it.
  pub async fn fetch(&self) -> Result<()> {
    let ticket = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
    let path = {
      let mut st = self.state.write();
      st.loading = true;
      st.error = None;
      st.path.clone()
    };

    let result = self.client.get_list::<T>(&path).await;

    let mut st = self.state.write();
    if ticket != self.issued.load(Ordering::SeqCst) {
      debug!(%path, ticket, "discarding superseded response");
      return result.map(drop);
    }
    st.loading = false;
    match result {
      Ok(items) => {
        st.items = items;
        Ok(())
      }
      Err(e) => {
        st.error = Some(e.to_string());
        Err(e)
      }
    }
  }

  /// Point the resource at a new collection path and re-fetch.
  ///
  /// The old list is dropped immediately; it belongs to another scope.
  pub async fn rescope(&self, path: impl Into<String>) -> Result<()> {
    {
      let mut st = self.state.write();
      st.path = path.into();
      st.items.clear();
    }
    self.fetch().await
  }

  /// Re-fetch after a successful mutation. A failure is kept in
  /// [`Self::error`] but does not undo the mutation's success.
  pub(crate) async fn refresh_after_mutation(&self) {
    if let Err(e) = self.fetch().await {
      debug!(error = %e, "refresh after mutation failed");
    }
  }
}
