//! Backend HTTP client: catalog fetches and the save store.
//!
//! Every request goes through a deadline-bounded `fetch` so a hung
//! backend can never leave the UI stuck in a loading state. The teardown
//! path uses `navigator.sendBeacon`, the one transport the browser keeps
//! alive after the page starts unloading; an ordinary in-flight request
//! would be aborted by the navigation.

use js_sys::{Array, Uint8Array};
use wasm_bindgen::prelude::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, Blob, DomException, RequestInit, Response, Window};

use crate::catalog::{RomRecord, SystemInfo};
use crate::consts;
use crate::error::StoreError;
use crate::session::{SaveBlob, SaveKey, SaveStore};

fn window() -> Result<Window, StoreError> {
    web_sys::window().ok_or_else(|| StoreError::Network("no window".into()))
}

fn js_error(value: JsValue) -> StoreError {
    if let Some(exception) = value.dyn_ref::<DomException>() {
        if exception.name() == "AbortError" {
            return StoreError::Timeout;
        }
        return StoreError::Network(exception.message());
    }
    StoreError::Network(format!("{value:?}"))
}

/// `fetch` with an abort-based deadline of [`consts::STORE_TIMEOUT_MS`].
async fn fetch_with_deadline(url: &str, opts: &RequestInit) -> Result<Response, StoreError> {
    let window = window()?;
    let abort = AbortController::new().map_err(js_error)?;
    opts.set_signal(Some(&abort.signal()));

    let trigger = Closure::<dyn FnMut()>::new(move || abort.abort());
    let timer = window
        .set_timeout_with_callback_and_timeout_and_arguments_0(
            trigger.as_ref().unchecked_ref(),
            consts::STORE_TIMEOUT_MS,
        )
        .map_err(js_error)?;

    let result = JsFuture::from(window.fetch_with_str_and_init(url, opts)).await;
    window.clear_timeout_with_handle(timer);
    drop(trigger);

    result
        .map_err(js_error)?
        .dyn_into::<Response>()
        .map_err(|_| StoreError::Network("fetch did not return a Response".into()))
}

async fn response_bytes(response: &Response) -> Result<Vec<u8>, StoreError> {
    let buffer = JsFuture::from(response.array_buffer().map_err(js_error)?)
        .await
        .map_err(js_error)?;
    Ok(Uint8Array::new(&buffer).to_vec())
}

async fn response_text(response: &Response) -> Result<String, StoreError> {
    let text = JsFuture::from(response.text().map_err(js_error)?)
        .await
        .map_err(js_error)?;
    Ok(text.as_string().unwrap_or_default())
}

fn encode(component: &str) -> String {
    String::from(js_sys::encode_uri_component(component))
}

/// List the systems that currently have ROMs.
pub async fn fetch_systems() -> Result<Vec<SystemInfo>, StoreError> {
    let opts = RequestInit::new();
    opts.set_method("GET");
    let response = fetch_with_deadline(consts::SYSTEMS_API, &opts).await?;
    if !response.ok() {
        return Err(StoreError::Status(response.status()));
    }
    let body = response_text(&response).await?;
    serde_json::from_str(&body).map_err(|err| StoreError::Decode(err.to_string()))
}

/// List the ROMs for one system.
pub async fn fetch_roms(system_id: &str) -> Result<Vec<RomRecord>, StoreError> {
    let url = format!("{}?system={}", consts::ROMS_API, encode(system_id));
    let opts = RequestInit::new();
    opts.set_method("GET");
    let response = fetch_with_deadline(&url, &opts).await?;
    if !response.ok() {
        return Err(StoreError::Status(response.status()));
    }
    let body = response_text(&response).await?;
    serde_json::from_str(&body).map_err(|err| StoreError::Decode(err.to_string()))
}

/// Save store backed by the backend's `/api/saves` endpoints.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpSaveStore;

impl HttpSaveStore {
    pub fn new() -> Self {
        Self
    }

    fn save_url(key: &SaveKey) -> String {
        format!(
            "{}/{}/{}",
            consts::SAVES_API,
            key.system(),
            encode(key.rom())
        )
    }
}

impl SaveStore for HttpSaveStore {
    async fn fetch(&self, key: &SaveKey) -> Result<Option<SaveBlob>, StoreError> {
        let opts = RequestInit::new();
        opts.set_method("GET");
        let response = fetch_with_deadline(&Self::save_url(key), &opts).await?;
        match response.status() {
            200..=299 => Ok(Some(SaveBlob::new(response_bytes(&response).await?))),
            404 => Ok(None),
            status => Err(StoreError::Status(status)),
        }
    }

    async fn put(&self, key: &SaveKey, blob: &SaveBlob) -> Result<(), StoreError> {
        let opts = RequestInit::new();
        opts.set_method("POST");
        let body: JsValue = Uint8Array::from(blob.as_bytes()).into();
        opts.set_body(&body);
        let response = fetch_with_deadline(&Self::save_url(key), &opts).await?;
        if response.ok() {
            Ok(())
        } else {
            Err(StoreError::Status(response.status()))
        }
    }

    fn put_detached(&self, key: &SaveKey, blob: &SaveBlob) -> bool {
        let Some(window) = web_sys::window() else {
            return false;
        };
        let Ok(payload) = bytes_to_blob(blob.as_bytes()) else {
            return false;
        };
        window
            .navigator()
            .send_beacon_with_opt_blob(&Self::save_url(key), Some(&payload))
            .unwrap_or(false)
    }
}

pub(crate) fn bytes_to_blob(bytes: &[u8]) -> Result<Blob, JsValue> {
    let part: JsValue = Uint8Array::from(bytes).into();
    Blob::new_with_u8_array_sequence(&Array::of1(&part))
}
