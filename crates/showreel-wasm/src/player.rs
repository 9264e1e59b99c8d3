//! The hosted video player (`Vimeo.Player`) behind [`RemotePlayer`].

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::oneshot;
use futures::FutureExt;
use js_sys::{Function, Promise};
use serde::Serialize;
use showreel_core::{
    EmbedOptions, MountTicket, RemotePlayer, ShowreelError, ShowreelResult, VideoId,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{Element, HtmlElement};

use crate::dom;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = Vimeo, js_name = Player)]
    #[derive(Clone)]
    pub type VimeoPlayer;

    #[wasm_bindgen(constructor, js_namespace = Vimeo, js_class = "Player", catch)]
    fn new(element: &HtmlElement, options: &JsValue) -> Result<VimeoPlayer, JsValue>;

    #[wasm_bindgen(method, catch)]
    fn ready(this: &VimeoPlayer) -> Result<Promise, JsValue>;

    #[wasm_bindgen(method, catch, js_name = setMuted)]
    fn set_muted(this: &VimeoPlayer, muted: bool) -> Result<Promise, JsValue>;

    #[wasm_bindgen(method, catch, js_name = setVolume)]
    fn set_volume(this: &VimeoPlayer, volume: f64) -> Result<Promise, JsValue>;

    #[wasm_bindgen(method, catch, js_name = setCurrentTime)]
    fn set_current_time(this: &VimeoPlayer, seconds: f64) -> Result<Promise, JsValue>;

    #[wasm_bindgen(method, catch)]
    fn play(this: &VimeoPlayer) -> Result<Promise, JsValue>;

    #[wasm_bindgen(method, catch)]
    fn pause(this: &VimeoPlayer) -> Result<Promise, JsValue>;

    #[wasm_bindgen(method, catch)]
    fn destroy(this: &VimeoPlayer) -> Result<Promise, JsValue>;

    #[wasm_bindgen(method, catch)]
    fn on(this: &VimeoPlayer, event: &str, callback: &Function) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch)]
    fn off(this: &VimeoPlayer, event: &str, callback: &Function) -> Result<(), JsValue>;
}

/// Constructor options: a numeric id goes in `id`, anything else in `url`.
#[derive(Serialize)]
struct PlayerOptions<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    #[serde(flatten)]
    embed: &'a EmbedOptions,
}

impl<'a> PlayerOptions<'a> {
    fn new(video_id: &'a VideoId, embed: &'a EmbedOptions) -> Self {
        let raw = video_id.as_str().trim();
        match raw.parse::<u64>() {
            Ok(id) => Self {
                id: Some(id),
                url: None,
                embed,
            },
            Err(_) => Self {
                id: None,
                url: Some(raw),
                embed,
            },
        }
    }

    fn to_js(&self) -> ShowreelResult<JsValue> {
        let serializer = serde_wasm_bindgen::Serializer::json_compatible();
        self.serialize(&serializer)
            .map_err(|e| ShowreelError::Config(e.to_string()))
    }
}

/// A constructed player and the container element it renders into.
pub struct VimeoHandle {
    player: VimeoPlayer,
    container: HtmlElement,
    wrap: Element,
    video_id: VideoId,
}

impl VimeoHandle {
    /// Create a container inside `wrap` and construct a player in it.
    pub fn create(wrap: &Element, ticket: &MountTicket, embed: &EmbedOptions) -> ShowreelResult<Self> {
        let document = dom::document()?;
        let container: HtmlElement = document
            .create_element("div")
            .map_err(dom::js_error)?
            .unchecked_into();
        container.set_class_name("player-frame");
        let _ = container.set_attribute("aria-label", &ticket.title);
        wrap.append_child(&container).map_err(dom::js_error)?;

        let options = PlayerOptions::new(&ticket.video_id, embed).to_js()?;
        let player = match VimeoPlayer::new(&container, &options) {
            Ok(player) => player,
            Err(e) => {
                container.remove();
                return Err(dom::js_error(e));
            }
        };
        tracing::debug!(video = %ticket.video_id, generation = ticket.generation, "player constructed");
        Ok(Self {
            player,
            container,
            wrap: wrap.clone(),
            video_id: ticket.video_id.clone(),
        })
    }

    /// Resolves once the player reports ready.
    pub fn ready(&self) -> impl Future<Output = ShowreelResult<()>> + 'static {
        let promise = self.player.ready();
        async move {
            let promise = promise.map_err(dom::js_error)?;
            JsFuture::from(promise)
                .await
                .map(|_| ())
                .map_err(|e| ShowreelError::PlaybackRejected(dom::js_error(e).to_string()))
        }
    }

    /// Resolves on the first `name` event from the player.
    pub fn event(&self, name: &'static str) -> PlayerEvent {
        PlayerEvent::new(self.player.clone(), name)
    }

    /// Fire a promise-returning call; a later rejection is only logged.
    fn settle(step: &'static str, call: Result<Promise, JsValue>) -> ShowreelResult<()> {
        let promise = call.map_err(dom::js_error)?;
        spawn_local(async move {
            if let Err(e) = JsFuture::from(promise).await {
                tracing::debug!("player {} rejected: {}", step, dom::js_error(e));
            }
        });
        Ok(())
    }
}

impl RemotePlayer for VimeoHandle {
    fn video_id(&self) -> &VideoId {
        &self.video_id
    }

    fn set_muted(&self, muted: bool) -> ShowreelResult<()> {
        Self::settle("setMuted", self.player.set_muted(muted))
    }

    fn set_volume(&self, volume: f64) -> ShowreelResult<()> {
        Self::settle("setVolume", self.player.set_volume(volume))
    }

    fn rewind(&self) -> ShowreelResult<()> {
        Self::settle("setCurrentTime", self.player.set_current_time(0.0))
    }

    fn play(&self) {
        if let Err(e) = Self::settle("play", self.player.play()) {
            tracing::debug!("play ignored: {}", e);
        }
    }

    fn pause(&self) -> ShowreelResult<()> {
        Self::settle("pause", self.player.pause())
    }

    fn destroy(&self) -> ShowreelResult<()> {
        let result = Self::settle("destroy", self.player.destroy())
            .map_err(|e| ShowreelError::Teardown(e.to_string()));
        self.container.remove();
        result
    }

    fn is_attached(&self) -> bool {
        self.wrap.contains(Some(&self.container))
    }

    fn attach(&self) -> ShowreelResult<()> {
        self.wrap
            .append_child(&self.container)
            .map(|_| ())
            .map_err(dom::js_error)
    }
}

/// The first occurrence of a player event. Dropping it unsubscribes.
pub struct PlayerEvent {
    player: VimeoPlayer,
    name: &'static str,
    callback: Closure<dyn FnMut(JsValue)>,
    fired: oneshot::Receiver<()>,
}

impl PlayerEvent {
    fn new(player: VimeoPlayer, name: &'static str) -> Self {
        let (tx, fired) = oneshot::channel();
        let mut tx = Some(tx);
        let callback = Closure::<dyn FnMut(JsValue)>::new(move |_: JsValue| {
            if let Some(tx) = tx.take() {
                let _ = tx.send(());
            }
        });
        if let Err(e) = player.on(name, callback.as_ref().unchecked_ref()) {
            tracing::debug!(event = name, "player subscription failed: {}", dom::js_error(e));
        }
        Self {
            player,
            name,
            callback,
            fired,
        }
    }
}

impl Future for PlayerEvent {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        match self.fired.poll_unpin(cx) {
            Poll::Ready(Ok(())) => Poll::Ready(()),
            _ => Poll::Pending,
        }
    }
}

impl Drop for PlayerEvent {
    fn drop(&mut self) {
        let _ = self.player.off(self.name, self.callback.as_ref().unchecked_ref());
    }
}
