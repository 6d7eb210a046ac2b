//! Result views
//!
//! Documentation for constructors and operations is fetched with a
//! redirected query and kept in a named [`CaptureSink`] per (kind, name).
//! A view that already exists is shown again without asking the process,
//! unless a refresh is requested. A refresh re-runs the command that
//! created the view, so it lands in the same view whichever entry point
//! created it.

use std::collections::HashMap;

use crate::config::ViewConfig;
use crate::error::Result;
use crate::session::{CaptureSink, RedirectOptions, Session};
use crate::vocabulary::{self, ConstructorKind};

/// Identity of an info view
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewKey {
    pub kind: ConstructorKind,
    pub name: String,
}

#[derive(Debug)]
struct CachedView {
    command: String,
    sink: CaptureSink,
}

/// Cache of info views for one presentation layer
#[derive(Debug)]
pub struct InfoViews {
    naming: ViewConfig,
    views: HashMap<ViewKey, CachedView>,
    /// Most recently shown view per canonical name
    last_shown: HashMap<String, ViewKey>,
}

impl InfoViews {
    pub fn new(naming: ViewConfig) -> Self {
        Self {
            naming,
            views: HashMap::new(),
            last_shown: HashMap::new(),
        }
    }

    /// Show documentation for a constructor (or an unknown name)
    pub async fn show_constructor(
        &mut self,
        session: &Session,
        name: &str,
        refresh: bool,
    ) -> Result<&CaptureSink> {
        let classification = vocabulary::classify(name);
        let kind = match classification.kind {
            ConstructorKind::Operation => ConstructorKind::Unknown,
            kind => kind,
        };
        let command = format!(")show {}", classification.canonical);
        self.show(session, kind, classification.canonical, command, refresh)
            .await
    }

    /// Show the signatures of an operation
    pub async fn show_operation(
        &mut self,
        session: &Session,
        name: &str,
        refresh: bool,
    ) -> Result<&CaptureSink> {
        let name = name.trim().to_string();
        let command = format!(")display operation {}", name);
        self.show(session, ConstructorKind::Operation, name, command, refresh)
            .await
    }

    /// Whichever of the two fits `name`
    pub async fn describe(
        &mut self,
        session: &Session,
        name: &str,
        refresh: bool,
    ) -> Result<&CaptureSink> {
        let classification = vocabulary::classify(name);
        let command = vocabulary::query_command(name);
        self.show(
            session,
            classification.kind,
            classification.canonical,
            command,
            refresh,
        )
        .await
    }

    /// Query the view last shown for `name` again
    ///
    /// Without a cached view this behaves like a refreshing [`describe`].
    ///
    /// [`describe`]: InfoViews::describe
    pub async fn refresh(&mut self, session: &Session, name: &str) -> Result<&CaptureSink> {
        let canonical = vocabulary::canonical_name(name.trim());
        let cached = self.last_shown.get(&canonical).and_then(|key| {
            self.views
                .get(key)
                .map(|view| (key.clone(), view.command.clone()))
        });

        match cached {
            Some((key, command)) => self.show(session, key.kind, key.name, command, true).await,
            None => self.describe(session, name, true).await,
        }
    }

    async fn show(
        &mut self,
        session: &Session,
        kind: ConstructorKind,
        name: String,
        command: String,
        refresh: bool,
    ) -> Result<&CaptureSink> {
        let key = ViewKey { kind, name };

        if !refresh && self.views.contains_key(&key) {
            debug!("Reusing view for {} {}", key.kind, key.name);
        } else {
            let mut sink = CaptureSink::new(self.naming.info_view_name(kind.as_str(), &key.name));
            session
                .query_and_capture(&command, &mut sink, RedirectOptions::displayed())
                .await?;
            sink.seal();
            self.views.insert(key.clone(), CachedView { command, sink });
        }

        self.last_shown.insert(key.name.clone(), key.clone());
        let view = self
            .views
            .get_mut(&key)
            .ok_or_else(|| format!("view for {} vanished", key.name))?;
        view.sink.request_display();
        Ok(&view.sink)
    }

    pub fn get(&self, kind: ConstructorKind, name: &str) -> Option<&CaptureSink> {
        self.views
            .get(&ViewKey {
                kind,
                name: name.to_string(),
            })
            .map(|view| &view.sink)
    }

    /// Forget one view so the next request queries again
    pub fn invalidate(&mut self, kind: ConstructorKind, name: &str) -> bool {
        self.views
            .remove(&ViewKey {
                kind,
                name: name.to_string(),
            })
            .is_some()
    }

    pub fn clear(&mut self) {
        self.views.clear();
        self.last_shown.clear();
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}
