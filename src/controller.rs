/// Runs the effects requested by `AppState::reduce` and feeds results back in
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::{Rc, Weak};

use futures::future::LocalBoxFuture;

use crate::error::RequestError;
use crate::queries::{BookmarkStore, ListBookmarks};
use crate::realtime::{ChangeFeed, ChangeKind, ChannelSlot, ChannelStatus, ChannelTopic};
use crate::session::{IdentityProvider, SignInRequest};
use crate::state::{Action, AppState, Effect};
use crate::subscription::SubscriptionGuard;

/// Runs a task on the local, single-threaded executor
pub type Spawner = Rc<dyn Fn(LocalBoxFuture<'static, ()>)>;

/// The three external collaborators
#[derive(Clone)]
pub struct Services {
    pub store: Rc<dyn BookmarkStore>,
    pub identity: Rc<dyn IdentityProvider>,
    pub feed: Rc<dyn ChangeFeed>,
}

struct Inner {
    state: RefCell<AppState>,
    services: Services,
    sign_in: SignInRequest,
    spawner: Spawner,
    mounted: Cell<bool>,
    channel: RefCell<ChannelSlot>,
    auth_watch: RefCell<Option<SubscriptionGuard>>,
    listener: RefCell<Option<Rc<dyn Fn()>>>,
}

/// Owns the app state for one mounted view.
///
/// Results of remote calls and listener callbacks re-enter through
/// [`Controller::dispatch`]; once the view is unmounted they are dropped.
#[derive(Clone)]
pub struct Controller {
    inner: Rc<Inner>,
}

impl Controller {
    pub fn new(services: Services, sign_in: SignInRequest, spawner: Spawner) -> Controller {
        Controller {
            inner: Rc::new(Inner {
                state: RefCell::new(AppState::new()),
                services,
                sign_in,
                spawner,
                mounted: Cell::new(false),
                channel: RefCell::new(ChannelSlot::new()),
                auth_watch: RefCell::new(None),
                listener: RefCell::new(None),
            }),
        }
    }

    /// Called after every state change, typically to schedule a re-render
    pub fn set_listener(&self, listener: impl Fn() + 'static) {
        *self.inner.listener.borrow_mut() = Some(Rc::new(listener));
    }

    pub fn snapshot(&self) -> AppState {
        self.inner.state.borrow().clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.mounted.get()
    }

    #[cfg(test)]
    pub fn channel_owner(&self) -> Option<String> {
        self.inner.channel.borrow().owner().map(str::to_string)
    }

    pub fn mount(&self) {
        if self.inner.mounted.replace(true) {
            return;
        }
        self.dispatch(Action::Mounted);
    }

    /// Release the live channel and the auth listener; pending results are discarded
    pub fn unmount(&self) {
        self.inner.mounted.set(false);
        self.close_channel();
        let watch = self.inner.auth_watch.borrow_mut().take();
        drop(watch);
        self.inner.listener.borrow_mut().take();
    }

    pub fn dispatch(&self, action: Action) {
        if !self.is_mounted() {
            log::debug!("View unmounted, dropping {}", action_name(&action));
            return;
        }

        let effects = self.inner.state.borrow_mut().reduce(action);
        self.notify();

        for effect in effects {
            self.run(effect);
        }
    }

    fn notify(&self) {
        let listener = self.inner.listener.borrow().clone();
        if let Some(listener) = listener {
            listener();
        }
    }

    fn run(&self, effect: Effect) {
        log::debug!("Running {:?}", effect);

        match effect {
            Effect::WatchAuth => {
                let weak = Rc::downgrade(&self.inner);
                let guard = self.inner.services.identity.watch(Box::new(move |session| {
                    if let Some(controller) = upgrade(&weak) {
                        controller.dispatch(Action::AuthChanged(session));
                    }
                }));
                let previous = self.inner.auth_watch.borrow_mut().replace(guard);
                drop(previous);
            }
            Effect::RestoreSession(token) => {
                let identity = self.inner.services.identity.clone();
                self.spawn(async move {
                    let result = logged("Session lookup", identity.current_session().await);
                    Action::SessionRestored { token, result }
                });
            }
            Effect::BeginSignIn => {
                let identity = self.inner.services.identity.clone();
                let request = self.inner.sign_in.clone();
                self.spawn(async move {
                    let result = identity.sign_in_with_oauth(&request).await;
                    Action::SignInFinished(logged("Sign-in", result))
                });
            }
            Effect::SignOut => {
                let identity = self.inner.services.identity.clone();
                self.spawn(async move {
                    Action::SignOutFinished(logged("Sign-out", identity.sign_out().await))
                });
            }
            Effect::FetchBookmarks { owner } => {
                let store = self.inner.services.store.clone();
                self.spawn(async move {
                    let query = ListBookmarks::for_owner(&owner);
                    log::debug!("{}", query);
                    let result = logged("Bookmark fetch", store.list(&query).await);
                    Action::BookmarksLoaded { owner, result }
                });
            }
            Effect::InsertBookmark(query) => {
                let store = self.inner.services.store.clone();
                self.spawn(async move {
                    log::debug!("{}", query);
                    let result = logged("Bookmark insert", store.insert(&query).await);
                    Action::InsertFinished {
                        owner: query.row.user_id,
                        result,
                    }
                });
            }
            Effect::DeleteBookmark { owner, query } => {
                let store = self.inner.services.store.clone();
                self.spawn(async move {
                    log::debug!("{}", query);
                    let result = logged("Bookmark delete", store.delete(&query).await);
                    Action::DeleteFinished {
                        owner,
                        id: query.id,
                        result,
                    }
                });
            }
            Effect::OpenChannel { owner } => self.open_channel(owner),
            Effect::CloseChannel => self.close_channel(),
        }
    }

    fn open_channel(&self, owner: String) {
        // Exactly one channel: release the old one before asking for the next
        self.close_channel();

        let topic = ChannelTopic::for_owner(&owner);

        let on_change = {
            let weak = Rc::downgrade(&self.inner);
            let owner = owner.clone();
            Box::new(move |kind: ChangeKind| {
                if let Some(controller) = upgrade(&weak) {
                    controller.dispatch(Action::ChangeNotified {
                        owner: owner.clone(),
                        kind,
                    });
                }
            })
        };

        let on_status = {
            let weak = Rc::downgrade(&self.inner);
            let owner = owner.clone();
            Box::new(move |status: ChannelStatus| {
                if let Some(controller) = upgrade(&weak) {
                    controller.dispatch(Action::ChannelStatusChanged {
                        owner: owner.clone(),
                        status,
                    });
                }
            })
        };

        let guard = self.inner.services.feed.subscribe(&topic, on_change, on_status);
        let stale = self.inner.channel.borrow_mut().install(&owner, guard);
        drop(stale);
    }

    fn close_channel(&self) {
        let previous = {
            let mut slot = self.inner.channel.borrow_mut();
            if let Some(owner) = slot.owner() {
                log::debug!("Closing live channel for {}", owner);
            }
            slot.take()
        };
        drop(previous);
    }

    fn spawn(&self, task: impl Future<Output = Action> + 'static) {
        let weak = Rc::downgrade(&self.inner);
        (self.inner.spawner)(Box::pin(async move {
            let action = task.await;
            match upgrade(&weak) {
                Some(controller) => controller.dispatch(action),
                None => log::debug!("Controller dropped, discarding {}", action_name(&action)),
            }
        }));
    }
}

fn upgrade(weak: &Weak<Inner>) -> Option<Controller> {
    weak.upgrade().map(|inner| Controller { inner })
}

fn logged<T>(what: &str, result: Result<T, RequestError>) -> Result<T, RequestError> {
    if let Err(e) = &result {
        log::warn!("{} failed: {}", what, e);
    }
    result
}

fn action_name(action: &Action) -> &'static str {
    match action {
        Action::Mounted => "Mounted",
        Action::SessionRestored { .. } => "SessionRestored",
        Action::AuthChanged(_) => "AuthChanged",
        Action::SignInRequested => "SignInRequested",
        Action::SignInFinished(_) => "SignInFinished",
        Action::SignOutRequested => "SignOutRequested",
        Action::SignOutFinished(_) => "SignOutFinished",
        Action::TitleChanged(_) => "TitleChanged",
        Action::UrlChanged(_) => "UrlChanged",
        Action::SubmitRequested => "SubmitRequested",
        Action::InsertFinished { .. } => "InsertFinished",
        Action::DeleteRequested(_) => "DeleteRequested",
        Action::DeleteFinished { .. } => "DeleteFinished",
        Action::BookmarksLoaded { .. } => "BookmarksLoaded",
        Action::ChangeNotified { .. } => "ChangeNotified",
        Action::ChannelStatusChanged { .. } => "ChannelStatusChanged",
    }
}
