/// In-memory stand-ins for the store, identity provider and change feed
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use async_trait::async_trait;
use futures::channel::oneshot;
use futures::executor::LocalPool;
use futures::future::LocalBoxFuture;
use futures::task::LocalSpawnExt;

use crate::bookmark::{Bookmark, Identity, Session};
use crate::config::AppConfig;
use crate::controller::{Controller, Services, Spawner};
use crate::error::RequestError;
use crate::queries::{BookmarkStore, DeleteBookmark, InsertBookmark, ListBookmarks};
use crate::realtime::{ChangeFeed, ChangeKind, ChannelStatus, ChannelTopic};
use crate::session::{IdentityProvider, SignInRequest};
use crate::subscription::{Subscription, SubscriptionGuard};

pub fn session(id: &str) -> Session {
    Session {
        user: Identity {
            id: id.to_string(),
            email: Some(format!("{id}@example.com")),
        },
    }
}

fn timestamp(minute: u32) -> String {
    format!("2026-10-17T{:02}:{:02}:00Z", minute / 60, minute % 60)
}

pub fn bookmark_at(id: &str, owner: &str, minute: u32) -> Bookmark {
    Bookmark {
        id: id.to_string(),
        title: format!("Title {id}"),
        url: format!("https://example.com/{id}"),
        created_at: timestamp(minute),
        user_id: owner.to_string(),
    }
}

/// Bookmark table with a row-level policy keyed on the acting user
#[derive(Default)]
pub struct FakeStore {
    rows: RefCell<Vec<Bookmark>>,
    acting_user: RefCell<Option<String>>,
    clock: Cell<u32>,
    list_calls: Cell<usize>,
    inserts: RefCell<Vec<InsertBookmark>>,
    deletes: RefCell<Vec<String>>,
    insert_failure: RefCell<Option<RequestError>>,
    delete_gate: RefCell<Option<oneshot::Receiver<()>>>,
}

impl FakeStore {
    pub fn new() -> FakeStore {
        let store = FakeStore::default();
        store.clock.set(600);
        store
    }

    pub fn seed(&self, bookmark: Bookmark) {
        self.rows.borrow_mut().push(bookmark);
    }

    pub fn act_as(&self, user_id: &str) {
        *self.acting_user.borrow_mut() = Some(user_id.to_string());
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.get()
    }

    pub fn inserts(&self) -> Vec<InsertBookmark> {
        self.inserts.borrow().clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.deletes.borrow().clone()
    }

    pub fn fail_next_insert(&self, message: &str) {
        *self.insert_failure.borrow_mut() = Some(RequestError::new(message));
    }

    /// Keep the next delete in flight until the returned sender fires
    pub fn hold_next_delete(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.delete_gate.borrow_mut() = Some(rx);
        tx
    }
}

#[async_trait(?Send)]
impl BookmarkStore for FakeStore {
    async fn list(&self, query: &ListBookmarks) -> Result<Vec<Bookmark>, RequestError> {
        self.list_calls.set(self.list_calls.get() + 1);

        let mut rows: Vec<Bookmark> = self
            .rows
            .borrow()
            .iter()
            .filter(|b| b.user_id == query.owner_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn insert(&self, query: &InsertBookmark) -> Result<(), RequestError> {
        self.inserts.borrow_mut().push(query.clone());
        if let Some(e) = self.insert_failure.borrow_mut().take() {
            return Err(e);
        }

        let minute = self.clock.get() + 1;
        self.clock.set(minute);
        self.rows.borrow_mut().push(Bookmark {
            id: uuid::Uuid::new_v4().to_string(),
            title: query.row.title.clone(),
            url: query.row.url.clone(),
            created_at: timestamp(minute),
            user_id: query.row.user_id.clone(),
        });
        Ok(())
    }

    async fn delete(&self, query: &DeleteBookmark) -> Result<(), RequestError> {
        self.deletes.borrow_mut().push(query.id.clone());

        let gate = self.delete_gate.borrow_mut().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let acting = self.acting_user.borrow().clone();
        let mut rows = self.rows.borrow_mut();
        if rows
            .iter()
            .any(|b| b.id == query.id && Some(&b.user_id) != acting.as_ref())
        {
            return Err(RequestError::new("permission denied for table bookmarks"));
        }
        rows.retain(|b| b.id != query.id);
        Ok(())
    }
}

type AuthHandler = Rc<dyn Fn(Option<Session>)>;

struct Registration<T> {
    id: u64,
    value: T,
}

struct Unregister<T> {
    id: u64,
    list: Rc<RefCell<Vec<Registration<T>>>>,
    on_release: Option<Box<dyn FnOnce()>>,
}

impl<T> Subscription for Unregister<T> {
    fn unsubscribe(&mut self) {
        self.list.borrow_mut().retain(|r| r.id != self.id);
        if let Some(on_release) = self.on_release.take() {
            on_release();
        }
    }
}

/// Identity provider whose session and notifications are driven by the test
#[derive(Default)]
pub struct FakeIdentity {
    session: RefCell<Option<Session>>,
    handlers: Rc<RefCell<Vec<Registration<AuthHandler>>>>,
    next_id: Cell<u64>,
    lookup_gate: RefCell<Option<oneshot::Receiver<()>>>,
    sign_in_requests: RefCell<Vec<SignInRequest>>,
    sign_in_failure: RefCell<Option<RequestError>>,
    sign_out_calls: Cell<usize>,
}

impl FakeIdentity {
    pub fn set_session(&self, session: Option<Session>) {
        *self.session.borrow_mut() = session;
    }

    /// Keep the startup lookup pending until the returned sender fires
    pub fn hold_lookup(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.lookup_gate.borrow_mut() = Some(rx);
        tx
    }

    pub fn fail_sign_in(&self, message: &str) {
        *self.sign_in_failure.borrow_mut() = Some(RequestError::new(message));
    }

    pub fn sign_in_requests(&self) -> Vec<SignInRequest> {
        self.sign_in_requests.borrow().clone()
    }

    pub fn sign_out_calls(&self) -> usize {
        self.sign_out_calls.get()
    }

    pub fn active_watchers(&self) -> usize {
        self.handlers.borrow().len()
    }

    /// Fire an auth-change notification
    pub fn emit(&self, session: Option<Session>) {
        self.set_session(session.clone());
        let handlers: Vec<AuthHandler> =
            self.handlers.borrow().iter().map(|r| r.value.clone()).collect();
        for handler in handlers {
            handler(session.clone());
        }
    }
}

#[async_trait(?Send)]
impl IdentityProvider for FakeIdentity {
    async fn current_session(&self) -> Result<Option<Session>, RequestError> {
        let gate = self.lookup_gate.borrow_mut().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        Ok(self.session.borrow().clone())
    }

    async fn sign_in_with_oauth(&self, request: &SignInRequest) -> Result<(), RequestError> {
        self.sign_in_requests.borrow_mut().push(request.clone());
        match self.sign_in_failure.borrow_mut().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn sign_out(&self) -> Result<(), RequestError> {
        self.sign_out_calls.set(self.sign_out_calls.get() + 1);
        self.emit(None);
        Ok(())
    }

    fn watch(&self, on_change: Box<dyn Fn(Option<Session>)>) -> SubscriptionGuard {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.handlers.borrow_mut().push(Registration {
            id,
            value: Rc::from(on_change),
        });
        SubscriptionGuard::new(Unregister {
            id,
            list: self.handlers.clone(),
            on_release: None,
        })
    }
}

struct FakeChannel {
    topic: ChannelTopic,
    on_change: Rc<dyn Fn(ChangeKind)>,
    on_status: Rc<dyn Fn(ChannelStatus)>,
}

/// Change feed that records open/close order and lets tests push events
#[derive(Default)]
pub struct FakeFeed {
    channels: Rc<RefCell<Vec<Registration<FakeChannel>>>>,
    log: Rc<RefCell<Vec<String>>>,
    next_id: Cell<u64>,
}

impl FakeFeed {
    pub fn log(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    pub fn open_channels(&self) -> Vec<String> {
        self.channels
            .borrow()
            .iter()
            .map(|r| r.value.topic.name.clone())
            .collect()
    }

    pub fn filter_of(&self, name: &str) -> Option<String> {
        self.channels
            .borrow()
            .iter()
            .find(|r| r.value.topic.name == name)
            .map(|r| r.value.topic.filter.clone())
    }

    pub fn change(&self, name: &str, kind: ChangeKind) {
        let handler = self
            .channels
            .borrow()
            .iter()
            .find(|r| r.value.topic.name == name)
            .map(|r| r.value.on_change.clone());
        if let Some(handler) = handler {
            handler(kind);
        }
    }

    pub fn status(&self, name: &str, status: ChannelStatus) {
        let handler = self
            .channels
            .borrow()
            .iter()
            .find(|r| r.value.topic.name == name)
            .map(|r| r.value.on_status.clone());
        if let Some(handler) = handler {
            handler(status);
        }
    }
}

impl ChangeFeed for FakeFeed {
    fn subscribe(
        &self,
        topic: &ChannelTopic,
        on_change: Box<dyn Fn(ChangeKind)>,
        on_status: Box<dyn Fn(ChannelStatus)>,
    ) -> SubscriptionGuard {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.log.borrow_mut().push(format!("open {}", topic.name));
        self.channels.borrow_mut().push(Registration {
            id,
            value: FakeChannel {
                topic: topic.clone(),
                on_change: Rc::from(on_change),
                on_status: Rc::from(on_status),
            },
        });

        let log = self.log.clone();
        let name = topic.name.clone();
        SubscriptionGuard::new(Unregister {
            id,
            list: self.channels.clone(),
            on_release: Some(Box::new(move || log.borrow_mut().push(format!("close {}", name)))),
        })
    }
}

/// A controller wired to fakes and a local executor
pub struct Harness {
    pub pool: LocalPool,
    pub controller: Controller,
    pub store: Rc<FakeStore>,
    pub identity: Rc<FakeIdentity>,
    pub feed: Rc<FakeFeed>,
    pub renders: Rc<Cell<usize>>,
}

impl Harness {
    pub fn new() -> Harness {
        let pool = LocalPool::new();
        let local = pool.spawner();
        let spawner: Spawner = Rc::new(move |task: LocalBoxFuture<'static, ()>| {
            local.spawn_local(task).expect("local pool accepts tasks");
        });

        let store = Rc::new(FakeStore::new());
        let identity = Rc::new(FakeIdentity::default());
        let feed = Rc::new(FakeFeed::default());
        let services = Services {
            store: store.clone(),
            identity: identity.clone(),
            feed: feed.clone(),
        };

        let config = AppConfig::new("https://abc.supabase.co", "anon-key");
        let controller = Controller::new(
            services,
            config.sign_in_request("https://bookmarks.example"),
            spawner,
        );

        let renders = Rc::new(Cell::new(0));
        let counter = renders.clone();
        controller.set_listener(move || counter.set(counter.get() + 1));

        Harness {
            pool,
            controller,
            store,
            identity,
            feed,
            renders,
        }
    }

    /// Mounted, restored as `owner`, with one bookmark loaded
    pub fn signed_in(owner: &str) -> Harness {
        let mut h = Harness::new();
        h.store.act_as(owner);
        h.store.seed(bookmark_at("b-1", owner, 1));
        h.identity.set_session(Some(session(owner)));
        h.controller.mount();
        h.run();
        h
    }

    pub fn run(&mut self) {
        self.pool.run_until_stalled();
    }
}
