/// Supabase-backed store, identity provider and change feed, reached through `/supabase.js`
use std::rc::Rc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;

use crate::bookmark::{Bookmark, Session};
use crate::config::AppConfig;
use crate::controller::Services;
use crate::error::RequestError;
use crate::queries::{BookmarkStore, DeleteBookmark, InsertBookmark, ListBookmarks, StoreResponse};
use crate::realtime::{ChangeFeed, ChangeKind, ChangePayload, ChannelStatus, ChannelTopic};
use crate::session::{IdentityProvider, SignInRequest};
use crate::subscription::{Subscription, SubscriptionGuard};

// Import JS bridge functions
#[wasm_bindgen(module = "/supabase.js")]
extern "C" {
    fn initClient(url: &str, anon_key: &str);

    #[wasm_bindgen(catch)]
    async fn getSession() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn signInWithOAuth(provider: &str, redirect_to: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn signOut() -> Result<JsValue, JsValue>;

    fn onAuthStateChange(callback: &js_sys::Function) -> JsValue;

    fn unsubscribeAuth(subscription: &JsValue);

    #[wasm_bindgen(catch)]
    async fn selectBookmarks(query: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn insertBookmark(query: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn deleteBookmark(query: JsValue) -> Result<JsValue, JsValue>;

    fn subscribeChanges(
        topic: JsValue,
        on_change: &js_sys::Function,
        on_status: &js_sys::Function,
    ) -> JsValue;

    fn removeChannel(channel: &JsValue);
}

/// The browser-side Supabase client
pub struct SupabaseClient {
    _private: (),
}

impl SupabaseClient {
    pub fn connect(config: &AppConfig) -> SupabaseClient {
        initClient(&config.supabase_url, &config.supabase_anon_key);
        SupabaseClient { _private: () }
    }

    pub fn into_services(self) -> Services {
        let client = Rc::new(self);
        Services {
            store: client.clone(),
            identity: client.clone(),
            feed: client,
        }
    }
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, RequestError> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| RequestError::new(format!("Failed to serialize request: {:?}", e)))
}

fn decode<T: DeserializeOwned>(value: JsValue) -> Result<Option<T>, RequestError> {
    let response: StoreResponse<T> = serde_wasm_bindgen::from_value(value)
        .map_err(|e| RequestError::new(format!("Failed to parse response: {:?}", e)))?;
    response.into_result()
}

fn bridge_error(call: &str, e: JsValue) -> RequestError {
    RequestError::new(format!("{} failed: {:?}", call, e))
}

#[async_trait(?Send)]
impl BookmarkStore for SupabaseClient {
    async fn list(&self, query: &ListBookmarks) -> Result<Vec<Bookmark>, RequestError> {
        let response = selectBookmarks(to_js(query)?)
            .await
            .map_err(|e| bridge_error("selectBookmarks", e))?;
        Ok(decode::<Vec<Bookmark>>(response)?.unwrap_or_default())
    }

    async fn insert(&self, query: &InsertBookmark) -> Result<(), RequestError> {
        let response = insertBookmark(to_js(query)?)
            .await
            .map_err(|e| bridge_error("insertBookmark", e))?;
        decode::<serde_json::Value>(response).map(|_| ())
    }

    async fn delete(&self, query: &DeleteBookmark) -> Result<(), RequestError> {
        let response = deleteBookmark(to_js(query)?)
            .await
            .map_err(|e| bridge_error("deleteBookmark", e))?;
        decode::<serde_json::Value>(response).map(|_| ())
    }
}

/// A JS-side registration plus the Rust closures it calls into
struct JsSubscription {
    handle: JsValue,
    release: fn(&JsValue),
    _callbacks: Vec<Closure<dyn Fn(JsValue)>>,
}

impl Subscription for JsSubscription {
    fn unsubscribe(&mut self) {
        (self.release)(&self.handle);
    }
}

#[async_trait(?Send)]
impl IdentityProvider for SupabaseClient {
    async fn current_session(&self) -> Result<Option<Session>, RequestError> {
        let response = getSession()
            .await
            .map_err(|e| bridge_error("getSession", e))?;
        decode::<Session>(response)
    }

    async fn sign_in_with_oauth(&self, request: &SignInRequest) -> Result<(), RequestError> {
        let response = signInWithOAuth(&request.provider, &request.redirect_to)
            .await
            .map_err(|e| bridge_error("signInWithOAuth", e))?;
        decode::<serde_json::Value>(response).map(|_| ())
    }

    async fn sign_out(&self) -> Result<(), RequestError> {
        let response = signOut().await.map_err(|e| bridge_error("signOut", e))?;
        decode::<serde_json::Value>(response).map(|_| ())
    }

    fn watch(&self, on_change: Box<dyn Fn(Option<Session>)>) -> SubscriptionGuard {
        let callback = Closure::wrap(Box::new(move |session: JsValue| {
            if session.is_null() || session.is_undefined() {
                on_change(None);
                return;
            }
            match serde_wasm_bindgen::from_value::<Session>(session) {
                Ok(session) => on_change(Some(session)),
                Err(e) => log::warn!("Ignoring unreadable session: {:?}", e),
            }
        }) as Box<dyn Fn(JsValue)>);

        let handle = onAuthStateChange(callback.as_ref().unchecked_ref());
        SubscriptionGuard::new(JsSubscription {
            handle,
            release: unsubscribeAuth,
            _callbacks: vec![callback],
        })
    }
}

impl ChangeFeed for SupabaseClient {
    fn subscribe(
        &self,
        topic: &ChannelTopic,
        on_change: Box<dyn Fn(ChangeKind)>,
        on_status: Box<dyn Fn(ChannelStatus)>,
    ) -> SubscriptionGuard {
        let change_callback = Closure::wrap(Box::new(move |payload: JsValue| {
            let kind = match serde_wasm_bindgen::from_value::<ChangePayload>(payload) {
                Ok(payload) => payload.event_type,
                Err(e) => {
                    log::warn!("Unreadable change payload, refreshing anyway: {:?}", e);
                    ChangeKind::Update
                }
            };
            on_change(kind);
        }) as Box<dyn Fn(JsValue)>);

        let status_callback = Closure::wrap(Box::new(move |status: JsValue| {
            match serde_wasm_bindgen::from_value::<ChannelStatus>(status) {
                Ok(status) => on_status(status),
                Err(e) => log::warn!("Unknown channel status: {:?}", e),
            }
        }) as Box<dyn Fn(JsValue)>);

        let topic_js = match serde_wasm_bindgen::to_value(topic) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Failed to serialize channel topic: {:?}", e);
                JsValue::NULL
            }
        };

        let handle = subscribeChanges(
            topic_js,
            change_callback.as_ref().unchecked_ref(),
            status_callback.as_ref().unchecked_ref(),
        );
        log::debug!("Subscribed to {} ({})", topic.name, topic.filter);

        SubscriptionGuard::new(JsSubscription {
            handle,
            release: removeChannel,
            _callbacks: vec![change_callback, status_callback],
        })
    }
}
