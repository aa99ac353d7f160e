//! Library page: system tabs and the grouped ROM list.
//!
//! Catalog fetch failures and an empty catalog are terminal for this view
//! and replace the list with an empty-state message; everything else is
//! straight DOM construction driven by [`crate::catalog::aggregate`].

use std::rc::Rc;

use wasm_bindgen::prelude::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, MouseEvent};

use crate::api;
use crate::catalog::{self, CatalogView, RomRecord, SystemInfo};

pub async fn run(document: &Document) {
    let Some(tabs) = document.get_element_by_id("system-tabs") else {
        log::error!("library page is missing #system-tabs");
        return;
    };
    let Some(list) = document.get_element_by_id("rom-list") else {
        log::error!("library page is missing #rom-list");
        return;
    };

    let systems = match api::fetch_systems().await {
        Ok(systems) => systems,
        Err(err) => {
            log::error!("failed to load systems: {err}");
            show_empty_state(&list, "Failed to load systems. Is the server running?");
            return;
        }
    };
    if systems.is_empty() {
        show_empty_state(&list, "No ROMs found. Mount your ROM directory to /roms.");
        return;
    }

    let systems = Rc::new(systems);
    for (index, system) in systems.iter().enumerate() {
        match make_tab(document, system) {
            Ok(tab) => {
                let systems = systems.clone();
                let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                    let systems = systems.clone();
                    wasm_bindgen_futures::spawn_local(async move {
                        select_system(&systems[index]).await;
                    });
                });
                let _ =
                    tab.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
                closure.forget();
                let _ = tabs.append_child(&tab);
            }
            Err(err) => log::warn!("failed to build tab for {}: {err:?}", system.id),
        }
    }

    // First system is auto-selected.
    select_system(&systems[0]).await;
}

async fn select_system(system: &SystemInfo) {
    let Some(document) = page_document() else {
        return;
    };
    highlight_tab(&document, &system.id);
    let Some(list) = document.get_element_by_id("rom-list") else {
        return;
    };

    match api::fetch_roms(&system.id).await {
        Ok(roms) => render_catalog(&document, &list, catalog::aggregate(roms), system),
        Err(err) => {
            log::error!("failed to load ROMs for {}: {err}", system.id);
            show_empty_state(&list, "Failed to load ROMs.");
        }
    }
}

fn highlight_tab(document: &Document, system_id: &str) {
    let Ok(tabs) = document.query_selector_all(".system-tab") else {
        return;
    };
    for i in 0..tabs.length() {
        let Some(node) = tabs.item(i) else { continue };
        let Some(tab) = node.dyn_ref::<Element>() else {
            continue;
        };
        let active = tab.get_attribute("data-system").as_deref() == Some(system_id);
        let _ = tab.class_list().toggle_with_force("active", active);
    }
}

fn make_tab(document: &Document, system: &SystemInfo) -> Result<Element, JsValue> {
    let tab = document.create_element("button")?;
    tab.set_class_name("system-tab");
    tab.set_attribute("data-system", &system.id)?;

    let dot = document.create_element("span")?;
    dot.set_class_name(&format!("system-dot {}", system.id));
    tab.append_child(&dot)?;

    tab.append_child(&document.create_text_node(&system.name))?;

    let count = document.create_element("span")?;
    count.set_class_name("count");
    count.set_text_content(Some(&system.rom_count.to_string()));
    tab.append_child(&count)?;

    Ok(tab)
}

fn render_catalog(document: &Document, list: &Element, view: CatalogView, system: &SystemInfo) {
    list.set_inner_html("");
    if view.groups.is_empty() {
        show_empty_state(list, "No ROMs for this system.");
        return;
    }

    for group in &view.groups {
        // Headings are a presentation artifact; a single group renders
        // flat.
        if !view.single_group {
            if let Ok(heading) = document.create_element("h2") {
                heading.set_class_name("tag-heading");
                heading.set_text_content(Some(group.heading()));
                let _ = list.append_child(&heading);
            }
        }

        let Ok(grid) = document.create_element("div") else {
            continue;
        };
        grid.set_class_name("rom-grid");
        for rom in &group.roms {
            match make_card(document, rom, system) {
                Ok(card) => {
                    let _ = grid.append_child(&card);
                }
                Err(err) => log::warn!("failed to build card for {}: {err:?}", rom.file_name),
            }
        }
        let _ = list.append_child(&grid);
    }
}

fn make_card(document: &Document, rom: &RomRecord, system: &SystemInfo) -> Result<Element, JsValue> {
    let card = document.create_element("a")?;
    card.set_class_name("rom-card");
    let href = format!(
        "/player.html?system={}&rom={}&core={}",
        system.id,
        String::from(js_sys::encode_uri_component(&rom.file_name)),
        system.core
    );
    card.set_attribute("href", &href)?;

    let name = document.create_element("div")?;
    name.set_class_name("rom-name");
    name.set_text_content(Some(&rom.name));
    card.append_child(&name)?;

    let file = document.create_element("div")?;
    file.set_class_name("rom-file");
    file.set_text_content(Some(&rom.file_name));
    card.append_child(&file)?;

    if !rom.tag.is_empty() {
        let tag = document.create_element("div")?;
        tag.set_class_name("rom-tag");
        tag.set_text_content(Some(&rom.tag));
        card.append_child(&tag)?;
    }

    Ok(card)
}

fn show_empty_state(list: &Element, message: &str) {
    list.set_inner_html("");
    let Some(document) = page_document() else {
        return;
    };
    if let Ok(p) = document.create_element("p") {
        p.set_class_name("empty-state");
        p.set_text_content(Some(message));
        let _ = list.append_child(&p);
    }
}

fn page_document() -> Option<Document> {
    web_sys::window()?.document()
}
