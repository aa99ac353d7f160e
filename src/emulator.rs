//! EmulatorJS integration.
//!
//! EmulatorJS is configured through `EJS_*` globals that must be set
//! before its loader script runs, and exposes the running emulator as a
//! `window.EJS_emulator` global once the core is up. [`EmulatorJs`] wraps
//! that global behind the [`EmulatorCapability`] seam so the session
//! controller never touches it directly, and readiness is an explicit
//! query instead of scattered presence checks.

use js_sys::{Function, Reflect, Uint8Array};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Url};

use crate::api::bytes_to_blob;
use crate::consts;
use crate::error::EmulatorError;
use crate::session::{Capture, EmulatorCapability, SaveBlob};

/// Launch parameters for the EmulatorJS page globals.
pub struct EmulatorConfig<'a> {
    pub system: &'a str,
    pub rom_file: &'a str,
    pub core: &'a str,
}

fn global() -> Option<JsValue> {
    web_sys::window().map(JsValue::from)
}

fn set_global(target: &JsValue, name: &str, value: &JsValue) -> Result<(), JsValue> {
    Reflect::set(target, &JsValue::from_str(name), value).map(|_| ())
}

/// Set the `EJS_*` globals. Must run before [`inject_loader`].
pub fn configure(config: &EmulatorConfig<'_>) -> Result<(), JsValue> {
    let window = global().ok_or_else(|| JsValue::from_str("no window"))?;
    let game_url = format!("{}/{}/{}", consts::ROMS_PATH, config.system, config.rom_file);

    set_global(&window, "EJS_player", &"#game".into())?;
    set_global(&window, "EJS_gameUrl", &game_url.into())?;
    set_global(&window, "EJS_core", &config.core.into())?;
    set_global(&window, "EJS_pathtodata", &consts::EMULATOR_DATA_PATH.into())?;
    set_global(&window, "EJS_startOnLoaded", &JsValue::TRUE)?;
    set_global(&window, "EJS_RESET_THREADING", &JsValue::TRUE)?;
    set_global(&window, "EJS_threads", &JsValue::FALSE)?;
    Ok(())
}

/// Stage an entry-load save so EmulatorJS restores it before the first
/// frame: the blob becomes an object URL in `EJS_loadStateURL`, which the
/// loader consumes during startup.
pub fn stage_entry_restore(blob: &SaveBlob) -> Result<(), JsValue> {
    let window = global().ok_or_else(|| JsValue::from_str("no window"))?;
    let payload = bytes_to_blob(blob.as_bytes())?;
    let url = Url::create_object_url_with_blob(&payload)?;
    set_global(&window, "EJS_loadStateURL", &url.into())
}

/// Append the EmulatorJS loader script; startup begins as soon as it runs.
pub fn inject_loader(document: &Document) -> Result<(), JsValue> {
    let script: web_sys::HtmlScriptElement = document
        .create_element("script")?
        .dyn_into()
        .map_err(|_| JsValue::from_str("script element cast failed"))?;
    script.set_src(consts::EMULATOR_LOADER);
    let body = document
        .body()
        .ok_or_else(|| JsValue::from_str("no body"))?;
    body.append_child(&script)?;
    Ok(())
}

/// Handle to the running EmulatorJS instance.
///
/// Readiness is a property of the page (the loader creates the global
/// once the core is up), so the handle itself carries no state.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmulatorJs;

impl EmulatorJs {
    pub fn new() -> Self {
        Self
    }

    fn game_manager() -> Option<JsValue> {
        let window = global()?;
        let emulator = Reflect::get(&window, &JsValue::from_str("EJS_emulator")).ok()?;
        if emulator.is_undefined() || emulator.is_null() {
            return None;
        }
        let manager = Reflect::get(&emulator, &JsValue::from_str("gameManager")).ok()?;
        if manager.is_undefined() || manager.is_null() {
            None
        } else {
            Some(manager)
        }
    }

    fn method(target: &JsValue, name: &str) -> Option<Function> {
        Reflect::get(target, &JsValue::from_str(name))
            .ok()?
            .dyn_into()
            .ok()
    }
}

impl EmulatorCapability for EmulatorJs {
    fn is_ready(&self) -> bool {
        Self::game_manager().is_some()
    }

    fn capture_save(&self) -> Capture {
        let Some(manager) = Self::game_manager() else {
            return Capture::Unavailable;
        };
        let Some(get_save) = Self::method(&manager, "getSaveFile") else {
            return Capture::Unavailable;
        };
        match get_save.call0(&manager) {
            Ok(data) if !data.is_undefined() && !data.is_null() => {
                let bytes = Uint8Array::new(&data).to_vec();
                if bytes.is_empty() {
                    Capture::Empty
                } else {
                    Capture::Data(SaveBlob::new(bytes))
                }
            }
            Ok(_) => Capture::Empty,
            Err(err) => {
                log::warn!("getSaveFile threw: {err:?}");
                Capture::Unavailable
            }
        }
    }

    fn restore_save(&mut self, blob: &SaveBlob) -> Result<(), EmulatorError> {
        let Some(manager) = Self::game_manager() else {
            return Err(EmulatorError::NotInitialized);
        };
        let Some(load_save) = Self::method(&manager, "loadSaveFile") else {
            return Err(EmulatorError::NotInitialized);
        };
        let data: JsValue = Uint8Array::from(blob.as_bytes()).into();
        load_save.call1(&manager, &data).map(|_| ()).map_err(|err| {
            log::error!("loadSaveFile threw: {err:?}");
            EmulatorError::RestoreRejected
        })
    }
}
