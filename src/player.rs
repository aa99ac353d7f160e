//! Player page: session parameters, EmulatorJS boot, and the save/load
//! UI.
//!
//! The session controller is shared between the button handlers and the
//! unload handler through `Rc<RefCell<_>>`; operations go through
//! `try_borrow_mut`, so a click while an operation is in flight reports
//! `Busy` instead of racing a second write against the same key.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::Closure;
use web_sys::{Document, Event, MouseEvent, UrlSearchParams};

use crate::api::HttpSaveStore;
use crate::catalog::rom_stem;
use crate::consts;
use crate::emulator::{self, EmulatorConfig, EmulatorJs};
use crate::error::ConfigError;
use crate::session::{EntryOutcome, Feedback, SaveKey, SessionController};

type Controller = SessionController<HttpSaveStore, EmulatorJs>;

/// Session parameters from the query string. All three are required; a
/// missing one is terminal for the view.
struct SessionParams {
    system: String,
    rom: String,
    core: String,
}

fn session_params() -> Result<SessionParams, ConfigError> {
    let search = web_sys::window()
        .map(|w| w.location())
        .and_then(|loc| loc.search().ok())
        .unwrap_or_default();
    let params =
        UrlSearchParams::new_with_str(&search).map_err(|_| ConfigError::MissingParam("system"))?;
    Ok(SessionParams {
        system: params.get("system").ok_or(ConfigError::MissingParam("system"))?,
        rom: params.get("rom").ok_or(ConfigError::MissingParam("rom"))?,
        core: params.get("core").ok_or(ConfigError::MissingParam("core"))?,
    })
}

pub async fn run(document: &Document) {
    let params = match session_params() {
        Ok(params) => params,
        Err(err) => {
            log::error!("cannot start session: {err}");
            set_text(document, "game-title", "Missing parameters");
            return;
        }
    };

    let title = rom_stem(&params.rom).to_string();
    set_text(document, "game-title", &title);
    document.set_title(&format!("RetroHost - {title}"));

    if let Err(err) = emulator::configure(&EmulatorConfig {
        system: &params.system,
        rom_file: &params.rom,
        core: &params.core,
    }) {
        log::error!("failed to configure emulator globals: {err:?}");
        set_text(document, "game-title", "Failed to start emulator");
        return;
    }

    let key = SaveKey::new(params.system.clone(), title);
    let mut controller = Controller::new(key, HttpSaveStore::new(), EmulatorJs::new());

    // Entry load has to finish before the loader script starts the core;
    // the staged blob is consumed during emulator startup.
    if let EntryOutcome::Restore(blob) = controller.start().await {
        if let Err(err) = emulator::stage_entry_restore(&blob) {
            log::warn!("failed to stage entry restore: {err:?}");
        }
    }

    if let Err(err) = emulator::inject_loader(document) {
        log::error!("failed to inject emulator loader: {err:?}");
        set_text(document, "game-title", "Failed to start emulator");
        return;
    }

    let controller = Rc::new(RefCell::new(controller));
    setup_save_button(document, controller.clone());
    setup_load_button(document, controller.clone());
    setup_teardown_save(controller);
}

fn setup_save_button(document: &Document, controller: Rc<RefCell<Controller>>) {
    let Some(button) = document.get_element_by_id("btn-save") else {
        log::warn!("player page is missing #btn-save");
        return;
    };
    let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
        let controller = controller.clone();
        wasm_bindgen_futures::spawn_local(async move {
            set_button_label("btn-save", "Saving...");
            let feedback = match controller.try_borrow_mut() {
                Ok(mut controller) => controller.save().await,
                // Another operation holds the session; first request wins.
                Err(_) => Feedback::Busy,
            };
            flash_button("btn-save", "Save", feedback_label(feedback));
        });
    });
    let _ = button.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
    closure.forget();
}

fn setup_load_button(document: &Document, controller: Rc<RefCell<Controller>>) {
    let Some(button) = document.get_element_by_id("btn-load") else {
        log::warn!("player page is missing #btn-load");
        return;
    };
    let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
        let controller = controller.clone();
        wasm_bindgen_futures::spawn_local(async move {
            set_button_label("btn-load", "Loading...");
            let feedback = match controller.try_borrow_mut() {
                Ok(mut controller) => controller.load().await,
                Err(_) => Feedback::Busy,
            };
            flash_button("btn-load", "Load", feedback_label(feedback));
        });
    });
    let _ = button.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
    closure.forget();
}

fn setup_teardown_save(controller: Rc<RefCell<Controller>>) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let closure = Closure::<dyn FnMut(_)>::new(move |_event: Event| {
        // If a manual operation is mid-flight the beacon is skipped;
        // teardown saves are best-effort by contract.
        if let Ok(mut controller) = controller.try_borrow_mut() {
            controller.teardown();
        }
    });
    let _ = window.add_event_listener_with_callback("beforeunload", closure.as_ref().unchecked_ref());
    closure.forget();
}

/// Button label for each operation outcome. Distinct outcomes keep
/// distinct labels so "no data" never reads like a failed write.
fn feedback_label(feedback: Feedback) -> &'static str {
    match feedback {
        Feedback::Saved => "Saved!",
        Feedback::Loaded => "Loaded!",
        Feedback::SaveFailed | Feedback::LoadFailed => "Error",
        Feedback::NothingToSave => "No data",
        Feedback::NotReady => "Not ready",
        Feedback::NoSave => "No save",
        Feedback::Busy => "Busy",
    }
}

fn set_button_label(id: &str, label: &str) {
    if let Some(document) = page_document() {
        if let Some(button) = document.get_element_by_id(id) {
            button.set_text_content(Some(label));
        }
    }
}

/// Show `label`, then restore `default` after the status interval.
fn flash_button(id: &'static str, default: &'static str, label: &str) {
    set_button_label(id, label);
    let Some(window) = web_sys::window() else {
        return;
    };
    let reset = Closure::once(move || set_button_label(id, default));
    if window
        .set_timeout_with_callback_and_timeout_and_arguments_0(
            reset.as_ref().unchecked_ref(),
            consts::STATUS_RESET_MS,
        )
        .is_ok()
    {
        reset.forget();
    }
}

fn set_text(document: &Document, id: &str, text: &str) {
    if let Some(element) = document.get_element_by_id(id) {
        element.set_text_content(Some(text));
    }
}

fn page_document() -> Option<Document> {
    web_sys::window()?.document()
}
