/// Reusable UI components

use patternfly_yew::prelude::*;
use web_sys::HtmlInputElement;
use yew::prelude::*;

use crate::bookmark::Bookmark;
use crate::state::BookmarkForm as FormFields;

/// Display name for an OAuth provider id, e.g. `google` -> `Google`
pub fn provider_label(provider: &str) -> String {
    let mut chars = provider.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Properties, PartialEq)]
pub struct AuthControlsProps {
    pub signed_in: bool,
    #[prop_or(false)]
    pub signing_in: bool,
    pub provider: AttrValue,
    pub on_sign_in: Callback<MouseEvent>,
    pub on_sign_out: Callback<MouseEvent>,
}

#[function_component(AuthControls)]
pub fn auth_controls(props: &AuthControlsProps) -> Html {
    if props.signed_in {
        return html! {
            <Button onclick={props.on_sign_out.clone()} variant={ButtonVariant::Secondary}>
                {"Sign out"}
            </Button>
        };
    }

    html! {
        <Button
            onclick={props.on_sign_in.clone()}
            disabled={props.signing_in}
            variant={ButtonVariant::Primary}
        >
            if props.signing_in {
                {"Redirecting..."}
            } else {
                {format!("Continue with {}", provider_label(&props.provider))}
            }
        </Button>
    }
}

#[derive(Properties, PartialEq)]
pub struct ErrorBannerProps {
    #[prop_or_default]
    pub message: Option<String>,
}

#[function_component(ErrorBanner)]
pub fn error_banner(props: &ErrorBannerProps) -> Html {
    match &props.message {
        Some(message) => html! {
            <div class="message-top-margin">
                <Alert r#type={AlertType::Danger} title={"Error"} inline={true}>
                    {message.clone()}
                </Alert>
            </div>
        },
        None => html! {},
    }
}

#[derive(Properties, PartialEq)]
pub struct BookmarkFormProps {
    pub fields: FormFields,
    pub saving: bool,
    #[prop_or(false)]
    pub disabled: bool,
    pub on_title: Callback<String>,
    pub on_url: Callback<String>,
    pub on_submit: Callback<()>,
}

fn input_value(on_change: &Callback<String>) -> Callback<InputEvent> {
    let on_change = on_change.clone();
    Callback::from(move |e: InputEvent| {
        let input: HtmlInputElement = e.target_unchecked_into();
        on_change.emit(input.value());
    })
}

#[function_component(BookmarkForm)]
pub fn bookmark_form(props: &BookmarkFormProps) -> Html {
    let onsubmit = {
        let on_submit = props.on_submit.clone();
        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();
            on_submit.emit(());
        })
    };

    html! {
        <form class="flex-column-gap bookmark-form" {onsubmit}>
            <input
                class="pf-v5-c-form-control"
                type="text"
                placeholder="Bookmark title"
                value={props.fields.title.clone()}
                oninput={input_value(&props.on_title)}
            />
            <input
                class="pf-v5-c-form-control"
                type="text"
                placeholder="https://example.com"
                value={props.fields.url.clone()}
                oninput={input_value(&props.on_url)}
            />
            <button
                class="pf-v5-c-button pf-m-primary pf-m-block"
                type="submit"
                disabled={props.saving || props.disabled}
            >
                {if props.saving { "Saving..." } else { "Add bookmark" }}
            </button>
        </form>
    }
}

#[derive(Properties, PartialEq)]
pub struct BookmarkListProps {
    pub bookmarks: Vec<Bookmark>,
    pub loading: bool,
    #[prop_or_default]
    pub deleting_id: Option<String>,
    pub on_delete: Callback<String>,
}

#[function_component(BookmarkList)]
pub fn bookmark_list(props: &BookmarkListProps) -> Html {
    let body = if props.loading {
        html! {
            <div class="loading-text-center">
                <Spinner />
                <p class="loading-text">{"Loading bookmarks..."}</p>
            </div>
        }
    } else if props.bookmarks.is_empty() {
        html! { <p class="message-text">{"No bookmarks yet. Add your first one."}</p> }
    } else {
        html! {
            <ul class="bookmark-list">
                {for props.bookmarks.iter().map(|bookmark| {
                    let deleting = props.deleting_id.as_deref() == Some(bookmark.id.as_str());
                    let on_delete = {
                        let on_delete = props.on_delete.clone();
                        let id = bookmark.id.clone();
                        Callback::from(move |_| on_delete.emit(id.clone()))
                    };
                    html! {
                        <li key={bookmark.id.clone()} class="bookmark-item">
                            <div>
                                <p class="bookmark-title">{&bookmark.title}</p>
                                <a href={bookmark.url.clone()} target="_blank" rel="noreferrer">
                                    {&bookmark.url}
                                </a>
                            </div>
                            <Button onclick={on_delete} disabled={deleting} variant={ButtonVariant::Danger}>
                                {if deleting { "Deleting..." } else { "Delete" }}
                            </Button>
                        </li>
                    }
                })}
            </ul>
        }
    };

    html! {
        <section class="stats-container">
            <h2 class="stats-title">{"Your bookmarks"}</h2>
            {body}
        </section>
    }
}
