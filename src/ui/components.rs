/// Reusable UI components

use crate::favorites::{FavoriteItem, ItemKind};
use patternfly_yew::prelude::*;
use yew::prelude::*;

#[derive(Clone, Copy, PartialEq)]
pub enum ToastKind {
    Success,
    Error,
}

/// A transient notification; the owner decides when to drop it.
#[derive(Clone, PartialEq)]
pub struct ToastMessage {
    pub kind: ToastKind,
    pub text: String,
}

impl ToastMessage {
    pub fn success(text: &str) -> Self {
        ToastMessage {
            kind: ToastKind::Success,
            text: text.to_string(),
        }
    }

    pub fn error(text: &str) -> Self {
        ToastMessage {
            kind: ToastKind::Error,
            text: text.to_string(),
        }
    }
}

#[derive(Properties, PartialEq)]
pub struct ToastProps {
    pub message: ToastMessage,
}

#[function_component(Toast)]
pub fn toast(props: &ToastProps) -> Html {
    let alert_type = match props.message.kind {
        ToastKind::Success => AlertType::Success,
        ToastKind::Error => AlertType::Danger,
    };

    html! {
        <div class="mjeed-toast">
            <Alert r#type={alert_type} title={props.message.text.clone()} inline={true}>
            </Alert>
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct PosterCardProps {
    pub item: FavoriteItem,
    pub on_remove: Callback<String>,
}

#[function_component(PosterCard)]
pub fn poster_card(props: &PosterCardProps) -> Html {
    let item = &props.item;
    let badge = match item.kind() {
        ItemKind::Movie => "فيلم",
        ItemKind::Series => "مسلسل",
    };
    let poster_style = if item.poster_image.is_empty() {
        String::new()
    } else {
        format!("background-image: {};", item.poster_image)
    };

    let on_remove = {
        let series_url = item.series_url.clone();
        props.on_remove.reform(move |_: MouseEvent| series_url.clone())
    };

    html! {
        <div class="mjeed-card" data-series-url={item.series_url.clone()}>
            <a href={item.series_url.clone()} class="mjeed-card-poster" style={poster_style}>
                <span class="mjeed-card-badge">{badge}</span>
            </a>
            <div class="mjeed-card-footer">
                <span class="mjeed-card-title">{&item.title}</span>
                <Button onclick={on_remove} variant={ButtonVariant::Plain}>
                    {"✕"}
                </Button>
            </div>
        </div>
    }
}
