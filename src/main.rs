//! RetroHost frontend entry point.
//!
//! One wasm bundle serves both pages; the page's root elements decide
//! which wiring runs.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_app {
    use retrohost::{library, player};

    pub async fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("RetroHost frontend starting...");

        let window = web_sys::window().expect("no window");
        let document = window.document().expect("no document");

        if document.get_element_by_id("system-tabs").is_some() {
            library::run(&document).await;
        } else if document.get_element_by_id("game").is_some() {
            player::run(&document).await;
        } else {
            log::error!("no known page root found");
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_app::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("RetroHost frontend is wasm-only - build with trunk/wasm-pack and serve it behind the backend");
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
