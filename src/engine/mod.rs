//! The highlighter: lifecycle, selection and user actions
//!
//! A `Highlighter` is attached to one page. `enable` paints what the stores
//! hold, starts the upload timer and refreshes the remote store in the
//! background; `disable` stops the timer and clears the page. User actions
//! mutate the stores and trigger a recompute; peer notifications for
//! blacklists and upvotes are fire-and-forget.

mod selection;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::HighlighterConfig;
use crate::dom::{Document, NodeId};
use crate::highlights::{Action, HighlightKind, LocalizedHighlight, TargetAttributes};
use crate::reconcile::Reconciler;
use crate::remote::{HighlightsApi, InvalidPageUrl, PageIdentity};
use crate::render::{span, HighlightRenderer};
use crate::store::{HighlightStores, StoreError};
use crate::sync::{BackgroundTasks, SchedulerHandle, SyncScheduler};

pub use selection::{capture_selection, TextSelection};

/// Callback receiving the attributes of the highlight acted on
pub type ActionCallback = Arc<dyn Fn(&TargetAttributes) + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    InvalidPage(#[from] InvalidPageUrl),

    #[error("Missing {0}")]
    Missing(&'static str),
}

/// Builder for `Highlighter`
pub struct HighlighterBuilder {
    config: HighlighterConfig,
    api: Option<Arc<dyn HighlightsApi>>,
    renderer: Option<Arc<dyn HighlightRenderer>>,
    stores: Option<Arc<HighlightStores>>,
    on_copy: Option<ActionCallback>,
    on_share: Option<ActionCallback>,
}

impl HighlighterBuilder {
    pub fn api(mut self, api: Arc<dyn HighlightsApi>) -> Self {
        self.api = Some(api);
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn HighlightRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Persisted stores; defaults to in-memory stores
    pub fn stores(mut self, stores: Arc<HighlightStores>) -> Self {
        self.stores = Some(stores);
        self
    }

    pub fn on_copy(mut self, callback: impl Fn(&TargetAttributes) + Send + Sync + 'static) -> Self {
        self.on_copy = Some(Arc::new(callback));
        self
    }

    pub fn on_share(mut self, callback: impl Fn(&TargetAttributes) + Send + Sync + 'static) -> Self {
        self.on_share = Some(Arc::new(callback));
        self
    }

    pub fn build(self) -> Result<Highlighter, EngineError> {
        let page = PageIdentity::parse(&self.config.page_url)?;
        let api = self.api.ok_or(EngineError::Missing("highlights api"))?;
        let renderer = self.renderer.ok_or(EngineError::Missing("renderer"))?;
        let stores = self
            .stores
            .unwrap_or_else(|| Arc::new(HighlightStores::in_memory()));

        let reconciler = Arc::new(Reconciler::new(stores, renderer));
        let scheduler = Arc::new(SyncScheduler::new(
            reconciler.clone(),
            api.clone(),
            page.clone(),
            self.config.upload_batch_size,
        ));

        let on_copy: ActionCallback = match self.on_copy {
            Some(callback) => callback,
            None => Arc::new(|target: &TargetAttributes| {
                tracing::info!(text = %target.text, "Copy requested");
            }),
        };
        let share_page = page.clone();
        let on_share: ActionCallback = match self.on_share {
            Some(callback) => callback,
            None => Arc::new(move |target: &TargetAttributes| {
                tracing::info!(url = %share_page.share_url(&target.path), "Share requested");
            }),
        };

        Ok(Highlighter {
            config: self.config,
            page,
            api,
            reconciler,
            scheduler,
            tasks: BackgroundTasks::new(),
            lifecycle: Mutex::new(Lifecycle::default()),
            on_copy,
            on_share,
        })
    }
}

#[derive(Default)]
struct Lifecycle {
    timer: Option<SchedulerHandle>,
    target: Option<TargetAttributes>,
    focused: bool,
}

/// Highlight engine attached to one page
pub struct Highlighter {
    config: HighlighterConfig,
    page: PageIdentity,
    api: Arc<dyn HighlightsApi>,
    reconciler: Arc<Reconciler>,
    scheduler: Arc<SyncScheduler>,
    tasks: BackgroundTasks,
    lifecycle: Mutex<Lifecycle>,
    on_copy: ActionCallback,
    on_share: ActionCallback,
}

impl Highlighter {
    pub fn builder(config: HighlighterConfig) -> HighlighterBuilder {
        HighlighterBuilder {
            config,
            api: None,
            renderer: None,
            stores: None,
            on_copy: None,
            on_share: None,
        }
    }

    pub fn page(&self) -> &PageIdentity {
        &self.page
    }

    pub fn stores(&self) -> &HighlightStores {
        self.reconciler.stores()
    }

    pub fn scheduler(&self) -> &Arc<SyncScheduler> {
        &self.scheduler
    }

    /// Fire-and-forget work started by this highlighter
    pub fn background(&self) -> &BackgroundTasks {
        &self.tasks
    }

    pub fn is_enabled(&self) -> bool {
        self.lifecycle.lock().timer.is_some()
    }

    /// Start highlighting the page
    ///
    /// Paints the persisted stores right away, starts the upload timer and
    /// fetches the remote store in the background. Enabling an enabled
    /// highlighter only repaints.
    pub async fn enable(&self) {
        let already_enabled = {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.timer.is_some() {
                true
            } else {
                self.reconciler.set_active(true);
                lifecycle.timer = Some(self.scheduler.clone().start(self.config.upload_interval));
                false
            }
        };

        self.reconciler.recompute().await;
        if already_enabled {
            return;
        }
        tracing::info!(page = self.page.hash(), url = %self.page.url(), "Highlighter enabled");

        self.focus_queried();

        let scheduler = self.scheduler.clone();
        self.tasks
            .spawn("fetch-remote", async move { scheduler.fetch_remote().await });
    }

    /// Stop highlighting; pending uploads stay queued for the next enable
    pub fn disable(&self) {
        let timer = {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.target = None;
            lifecycle.timer.take()
        };
        let Some(timer) = timer else {
            return;
        };

        self.reconciler.set_active(false);
        // The loop exits after any in-flight tick; its result only reaches
        // the stores
        drop(timer.stop());
        self.reconciler.renderer().clear();
        tracing::info!(page = self.page.hash(), "Highlighter disabled");
    }

    /// Re-read the stores and repaint
    pub async fn recompute(&self) -> Vec<LocalizedHighlight> {
        self.reconciler.recompute().await
    }

    /// Mark the element named in the page URL's share parameter, once
    fn focus_queried(&self) {
        let Some(path) = self.page.queried_path() else {
            return;
        };
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.focused {
            return;
        }
        lifecycle.focused = self.reconciler.renderer().focus(&path);
        if !lifecycle.focused {
            tracing::debug!(path = %path, "Shared path not found on page");
        }
    }

    /// Turn a selection into a preview and make it the current target
    pub fn select(&self, doc: &mut Document, selection: &TextSelection) -> Option<TargetAttributes> {
        if !self.reconciler.is_active() {
            return None;
        }
        let target = capture_selection(doc, selection, &self.config)?;
        self.lifecycle.lock().target = Some(target.clone());
        Some(target)
    }

    /// Make the span under the pointer the current target
    pub fn hover(&self, doc: &Document, node: NodeId) -> Option<TargetAttributes> {
        let target = span::target_attributes(doc, node)?;
        self.lifecycle.lock().target = Some(target.clone());
        Some(target)
    }

    pub fn target(&self) -> Option<TargetAttributes> {
        self.lifecycle.lock().target.clone()
    }

    pub fn clear_target(&self) {
        self.lifecycle.lock().target = None;
    }

    /// Actions available on the current target
    pub fn available_actions(&self) -> &'static [Action] {
        self.target().map(|t| t.kind.actions()).unwrap_or(&[])
    }

    /// Run `action` on the current target
    ///
    /// Returns false when there is no target or its kind does not offer the
    /// action.
    pub async fn perform(&self, action: Action) -> bool {
        let Some(target) = self.target() else {
            return false;
        };
        if !target.kind.allows(action) {
            tracing::debug!(action = ?action, kind = %target.kind, "Action not offered for highlight");
            return false;
        }

        match action {
            Action::Highlight => self.create_highlight(&target).await,
            Action::Unhighlight => self.unhighlight(&target).await,
            Action::Copy => self.copy(&target),
            Action::Share => self.share(&target),
            Action::Blacklist => match target.id {
                Some(id) => self.blacklist(id).await,
                None => {
                    tracing::debug!(path = %target.path, "Cannot blacklist a highlight without id");
                    return false;
                }
            },
            Action::Upvote => self.upvote(&target).await,
        }
        true
    }

    /// Queue the target for upload
    pub async fn create_highlight(&self, target: &TargetAttributes) {
        let highlight = target.to_highlight();
        log_store_error(self.stores().uploadable.push(highlight).await);
        self.clear_target();
        self.recompute().await;
    }

    /// Remove a highlight created on this client
    pub async fn unhighlight(&self, target: &TargetAttributes) {
        let stores = self.stores();
        let store = match target.kind {
            HighlightKind::Uploadable => &stores.uploadable,
            _ => &stores.local,
        };
        let expected = target.to_highlight();

        let removed = match store.get().await {
            Ok(items) => {
                let index = items.iter().position(|h| h.same_anchor(&expected));
                store.remove(index).await
            }
            Err(e) => Err(e),
        };
        match removed {
            Ok(true) => {}
            Ok(false) => tracing::debug!(path = %target.path, store = %store.key(), "Nothing to unhighlight"),
            Err(e) => tracing::warn!(error = %e, "Failed to unhighlight"),
        }

        self.clear_target();
        self.recompute().await;
    }

    /// Hide a highlight and tell the peer
    pub async fn blacklist(&self, id: i64) {
        log_store_error(self.stores().blacklisted.push(id).await);
        self.clear_target();
        self.recompute().await;

        let api = self.api.clone();
        self.tasks.spawn("blacklist", async move { api.blacklist(id).await });
    }

    /// Mark a highlight upvoted and tell the peer
    pub async fn upvote(&self, target: &TargetAttributes) {
        log_store_error(self.stores().upvoted.push(target.to_highlight()).await);
        self.clear_target();
        self.recompute().await;

        match target.id {
            Some(id) => {
                let api = self.api.clone();
                self.tasks.spawn("upvote", async move { api.upvote(id).await });
            }
            None => tracing::debug!(path = %target.path, "Upvoted highlight has no id, peer not notified"),
        }
    }

    pub fn copy(&self, target: &TargetAttributes) {
        (self.on_copy)(target);
    }

    pub fn share(&self, target: &TargetAttributes) {
        (self.on_share)(target);
    }
}

impl Drop for Highlighter {
    fn drop(&mut self) {
        if let Some(timer) = self.lifecycle.get_mut().timer.take() {
            drop(timer.stop());
        }
    }
}

fn log_store_error(result: Result<(), StoreError>) {
    if let Err(e) = result {
        tracing::warn!(error = %e, "Failed to update highlight store");
    }
}
