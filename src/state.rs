/// Application state, the actions that change it, and the side effects they request
use crate::bookmark::{Bookmark, Session};
use crate::error::{AppError, RequestError};
use crate::normalize::normalize_url;
use crate::queries::{DeleteBookmark, InsertBookmark};
use crate::realtime::{ChangeKind, ChannelStatus};
use crate::session::{IdentityChange, LookupToken, SessionEvent, SessionManager, SessionState};

/// The add-bookmark form fields, exactly as typed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookmarkForm {
    pub title: String,
    pub url: String,
}

/// Everything the view renders from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppState {
    pub session: SessionManager,
    pub bookmarks: Vec<Bookmark>,
    pub form: BookmarkForm,
    pub is_saving: bool,
    pub deleting_id: Option<String>,
    pub error: Option<AppError>,
    pending_fetches: usize,
}

/// Top-level screen derived from state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Restoring,
    SignedOut { signing_in: bool },
    Loading,
    Loaded,
}

/// Everything that can happen to the app
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Mounted,
    SessionRestored {
        token: LookupToken,
        result: Result<Option<Session>, RequestError>,
    },
    AuthChanged(Option<Session>),
    SignInRequested,
    SignInFinished(Result<(), RequestError>),
    SignOutRequested,
    SignOutFinished(Result<(), RequestError>),
    TitleChanged(String),
    UrlChanged(String),
    SubmitRequested,
    InsertFinished {
        owner: String,
        result: Result<(), RequestError>,
    },
    DeleteRequested(String),
    DeleteFinished {
        owner: String,
        id: String,
        result: Result<(), RequestError>,
    },
    BookmarksLoaded {
        owner: String,
        result: Result<Vec<Bookmark>, RequestError>,
    },
    ChangeNotified {
        owner: String,
        kind: ChangeKind,
    },
    ChannelStatusChanged {
        owner: String,
        status: ChannelStatus,
    },
}

/// Work the controller performs on behalf of the reducer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    WatchAuth,
    RestoreSession(LookupToken),
    BeginSignIn,
    SignOut,
    FetchBookmarks { owner: String },
    InsertBookmark(InsertBookmark),
    DeleteBookmark { owner: String, query: DeleteBookmark },
    OpenChannel { owner: String },
    CloseChannel,
}

impl AppState {
    pub fn new() -> AppState {
        AppState::default()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.session.user_id()
    }

    pub fn is_loading(&self) -> bool {
        self.pending_fetches > 0
    }

    pub fn screen(&self) -> Screen {
        match self.session.state() {
            SessionState::Restoring => Screen::Restoring,
            SessionState::SignedOut => Screen::SignedOut { signing_in: false },
            SessionState::SigningIn => Screen::SignedOut { signing_in: true },
            SessionState::SignedIn(_) if self.is_loading() => Screen::Loading,
            SessionState::SignedIn(_) => Screen::Loaded,
        }
    }

    pub fn is_deleting(&self, id: &str) -> bool {
        self.deleting_id.as_deref() == Some(id)
    }

    /// Apply one action and return the effects it requests, in order
    pub fn reduce(&mut self, action: Action) -> Vec<Effect> {
        let mut effects = Vec::new();

        match action {
            Action::Mounted => {
                effects.push(Effect::WatchAuth);
                effects.push(Effect::RestoreSession(self.session.lookup_token()));
            }
            Action::SessionRestored { token, result } => {
                if !self.session.is_current(token) {
                    log::debug!("Ignoring superseded session lookup");
                    return effects;
                }
                let change = match result {
                    Ok(session) => self.session.apply(SessionEvent::Restored(session)),
                    Err(e) => {
                        self.error = Some(e.into());
                        self.session.apply(SessionEvent::RestoreFailed)
                    }
                };
                self.follow_identity(change, &mut effects);
            }
            Action::AuthChanged(session) => {
                let change = self.session.apply(SessionEvent::AuthChanged(session));
                self.follow_identity(change, &mut effects);
            }
            Action::SignInRequested => {
                if self.session.state() != &SessionState::SignedOut {
                    return effects;
                }
                self.error = None;
                self.session.apply(SessionEvent::SignInStarted);
                effects.push(Effect::BeginSignIn);
            }
            Action::SignInFinished(result) => {
                // Success means the page is navigating away
                if let Err(e) = result {
                    self.session.apply(SessionEvent::SignInFailed);
                    self.error = Some(e.into());
                }
            }
            Action::SignOutRequested => {
                self.error = None;
                effects.push(Effect::SignOut);
            }
            Action::SignOutFinished(result) => match result {
                Ok(()) => {
                    let change = self.session.apply(SessionEvent::SignedOut);
                    self.follow_identity(change, &mut effects);
                }
                Err(e) => self.error = Some(e.into()),
            },
            Action::TitleChanged(title) => self.form.title = title,
            Action::UrlChanged(url) => self.form.url = url,
            Action::SubmitRequested => self.submit(&mut effects),
            Action::InsertFinished { owner, result } => {
                // Saving state was reset on identity change
                if self.user_id() != Some(owner.as_str()) {
                    log::debug!("Dropping insert result for a previous identity");
                    return effects;
                }
                self.is_saving = false;
                match result {
                    Ok(()) => {
                        self.form = BookmarkForm::default();
                        self.refresh(&mut effects);
                    }
                    Err(e) => self.error = Some(e.into()),
                }
            }
            Action::DeleteRequested(id) => {
                self.error = None;
                let Some(owner) = self.user_id().map(str::to_string) else {
                    self.error = Some(AppError::NotSignedIn);
                    return effects;
                };
                effects.push(Effect::DeleteBookmark {
                    owner,
                    query: DeleteBookmark::by_id(&id),
                });
                self.deleting_id = Some(id);
            }
            Action::DeleteFinished { owner, id, result } => {
                if self.user_id() != Some(owner.as_str()) {
                    log::debug!("Dropping delete result for a previous identity");
                    return effects;
                }
                if self.is_deleting(&id) {
                    self.deleting_id = None;
                }
                match result {
                    Ok(()) => self.refresh(&mut effects),
                    Err(e) => self.error = Some(e.into()),
                }
            }
            Action::BookmarksLoaded { owner, result } => {
                // In-flight counts are reset on identity change
                if self.user_id() != Some(owner.as_str()) {
                    log::debug!("Dropping bookmark list fetched for a previous identity");
                    return effects;
                }
                self.pending_fetches = self.pending_fetches.saturating_sub(1);
                match result {
                    Ok(bookmarks) => self.bookmarks = bookmarks,
                    // The displayed list is only ever replaced by a successful fetch
                    Err(e) => self.error = Some(e.into()),
                }
            }
            Action::ChangeNotified { owner, kind } => {
                if self.user_id() == Some(owner.as_str()) {
                    log::debug!("Bookmark {:?} notification, refreshing", kind);
                    self.refresh(&mut effects);
                }
            }
            Action::ChannelStatusChanged { owner, status } => {
                if self.user_id() != Some(owner.as_str()) {
                    return effects;
                }
                match status {
                    ChannelStatus::Subscribed => self.refresh(&mut effects),
                    ChannelStatus::ChannelError | ChannelStatus::TimedOut => {
                        log::warn!("Live updates unavailable for {}: {:?}", owner, status);
                    }
                    ChannelStatus::Closed => log::debug!("Live channel for {} closed", owner),
                }
            }
        }

        effects
    }

    fn submit(&mut self, effects: &mut Vec<Effect>) {
        if self.is_saving {
            return;
        }
        self.error = None;

        let Some(owner) = self.user_id().map(str::to_string) else {
            self.error = Some(AppError::NotSignedIn);
            return;
        };

        let normalized = normalize_url(&self.form.url);
        let title = self.form.title.trim();

        if title.is_empty() {
            self.error = Some(AppError::MissingTitle);
            return;
        }

        let url = match normalized {
            Ok(url) => url,
            Err(e) => {
                self.error = Some(AppError::InvalidUrl(e));
                return;
            }
        };

        effects.push(Effect::InsertBookmark(InsertBookmark::new(title, &url, &owner)));
        self.is_saving = true;
    }

    /// Re-fetch the whole list for the current owner. Overlapping refreshes
    /// are not merged; the last response wins.
    fn refresh(&mut self, effects: &mut Vec<Effect>) {
        if let Some(owner) = self.user_id().map(str::to_string) {
            self.error = None;
            self.pending_fetches += 1;
            effects.push(Effect::FetchBookmarks { owner });
        }
    }

    fn follow_identity(&mut self, change: IdentityChange, effects: &mut Vec<Effect>) {
        if !change.is_switch() {
            return;
        }

        if change.before.is_some() {
            effects.push(Effect::CloseChannel);
        }
        self.bookmarks.clear();
        self.deleting_id = None;
        self.is_saving = false;
        self.pending_fetches = 0;

        if let Some(owner) = change.after {
            effects.push(Effect::OpenChannel { owner });
            self.refresh(effects);
        }
    }
}
