/// Root component: wires the controller to the browser and renders its state

use std::rc::Rc;

use futures::future::LocalBoxFuture;
use patternfly_yew::prelude::*;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

use crate::config::AppConfig;
use crate::controller::{Controller, Spawner};
use crate::state::{Action, Screen};
use crate::supabase::SupabaseClient;
use crate::ui::components::{AuthControls, BookmarkForm, BookmarkList, ErrorBanner, provider_label};

#[derive(Properties, PartialEq)]
pub struct AppProps {
    pub config: Rc<AppConfig>,
}

fn page_origin() -> String {
    web_sys::window()
        .and_then(|window| window.location().origin().ok())
        .unwrap_or_default()
}

#[function_component(App)]
pub fn app(props: &AppProps) -> Html {
    let controller = use_memo(props.config.clone(), |config| {
        let services = SupabaseClient::connect(config).into_services();
        let spawner: Spawner = Rc::new(|task: LocalBoxFuture<'static, ()>| spawn_local(task));
        Controller::new(services, config.sign_in_request(&page_origin()), spawner)
    });
    let force_update = use_force_update();

    // Mount on first render, release the channel and auth listener on teardown
    {
        let controller = controller.clone();
        use_effect_with(props.config.clone(), move |_| {
            controller.set_listener(move || force_update.force_update());
            controller.mount();
            move || controller.unmount()
        });
    }

    let on_click = |action: Action| {
        let controller = controller.clone();
        Callback::from(move |_: MouseEvent| controller.dispatch(action.clone()))
    };
    let on_sign_in = on_click(Action::SignInRequested);
    let on_sign_out = on_click(Action::SignOutRequested);

    let on_title = {
        let controller = controller.clone();
        Callback::from(move |value: String| controller.dispatch(Action::TitleChanged(value)))
    };
    let on_url = {
        let controller = controller.clone();
        Callback::from(move |value: String| controller.dispatch(Action::UrlChanged(value)))
    };
    let on_submit = {
        let controller = controller.clone();
        Callback::from(move |_: ()| controller.dispatch(Action::SubmitRequested))
    };
    let on_delete = {
        let controller = controller.clone();
        Callback::from(move |id: String| controller.dispatch(Action::DeleteRequested(id)))
    };

    let state = controller.snapshot();
    let screen = state.screen();
    let provider = provider_label(&props.config.oauth_provider);
    let signed_in = matches!(screen, Screen::Loading | Screen::Loaded);
    let signing_in = matches!(screen, Screen::SignedOut { signing_in: true });

    html! {
        <div class="padding-20">
            <div class="app-header">
                <div>
                    <h1 class="popup-title">{"Smart Bookmark App"}</h1>
                    <p class="message-text">{"Private bookmarks synced in real time."}</p>
                </div>
                if !matches!(screen, Screen::Restoring) {
                    <AuthControls
                        {signed_in}
                        {signing_in}
                        provider={props.config.oauth_provider.clone()}
                        {on_sign_in}
                        {on_sign_out}
                    />
                }
            </div>

            if let Some(email) = state.session.state().session().and_then(|s| s.email()) {
                <p class="signed-in-banner">{format!("Signed in as {}", email)}</p>
            }

            <ErrorBanner message={state.error.as_ref().map(|e| e.to_string())} />

            {match screen {
                Screen::Restoring => html! {
                    <div class="loading-text-center">
                        <Spinner />
                    </div>
                },
                Screen::SignedOut { .. } => html! {
                    <p class="message-text">
                        {format!("Sign in with {} to manage private bookmarks.", provider)}
                    </p>
                },
                Screen::Loading | Screen::Loaded => html! {
                    <>
                        <BookmarkForm
                            fields={state.form.clone()}
                            saving={state.is_saving}
                            disabled={state.is_loading()}
                            {on_title}
                            {on_url}
                            {on_submit}
                        />
                        <BookmarkList
                            bookmarks={state.bookmarks.clone()}
                            loading={state.is_loading()}
                            deleting_id={state.deleting_id.clone()}
                            {on_delete}
                        />
                    </>
                },
            }}
        </div>
    }
}
