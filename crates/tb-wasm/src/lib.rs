//! WebAssembly bindings for TickBoost

use std::cell::{Cell, RefCell};
use std::sync::OnceLock;

use tb_core::{run_scriptlet, IntervalRegistry, Resolver, Ruleset};
use tb_ruleset::parse_ruleset;
use wasm_bindgen::prelude::*;

static RULESET: OnceLock<Ruleset> = OnceLock::new();

thread_local! {
    static REGISTRY: RefCell<IntervalRegistry> = RefCell::new(IntervalRegistry::new());
    static INSTALLED: Cell<bool> = const { Cell::new(false) };
}

#[wasm_bindgen]
pub fn init(ruleset_text: &str) -> Result<(), JsValue> {
    if RULESET.get().is_some() {
        return Err(JsValue::from_str("Already initialized. Reload the page to reinitialize."));
    }

    let ruleset = parse_ruleset(ruleset_text)
        .map_err(|e| JsValue::from_str(&format!("Failed to load ruleset: {}", e)))?;

    RULESET
        .set(ruleset)
        .map_err(|_| JsValue::from_str("Failed to set ruleset state"))?;

    Ok(())
}

#[wasm_bindgen]
pub fn is_initialized() -> bool {
    RULESET.get().is_some()
}

#[wasm_bindgen]
pub fn get_ruleset_info() -> JsValue {
    let result = js_sys::Object::new();
    if let Some(ruleset) = RULESET.get() {
        let tables = &ruleset.tables;
        let _ = js_sys::Reflect::set(&result, &"initialized".into(), &JsValue::from(true));
        let _ = js_sys::Reflect::set(&result, &"name".into(), &JsValue::from_str(&ruleset.name));
        let counts = [
            ("argumentSets", ruleset.args.len()),
            ("hostnames", tables.hostnames.len()),
            ("entities", tables.entities.len()),
            ("exceptions", tables.exceptions.len()),
        ];
        for (key, count) in counts {
            let _ = js_sys::Reflect::set(&result, &key.into(), &JsValue::from(count as u32));
        }
        let _ = js_sys::Reflect::set(&result, &"installed".into(), &JsValue::from(is_installed()));
    } else {
        let _ = js_sys::Reflect::set(&result, &"initialized".into(), &JsValue::from(false));
    }
    result.into()
}

/// Argument-set indices that apply to `hostname`, ascending.
#[wasm_bindgen]
pub fn resolve(hostname: &str) -> JsValue {
    let indices = js_sys::Array::new();
    if let Some(ruleset) = RULESET.get() {
        for index in Resolver::new(&ruleset.tables).resolve(hostname).indices {
            indices.push(&JsValue::from(index as u32));
        }
    }
    indices.into()
}

/// Resolve `hostname` and install every selected adjustment into the
/// page-local registry. Returns the number installed.
///
/// Runs once per page; a second call would stack every boost again.
#[wasm_bindgen]
pub fn install(hostname: &str) -> Result<u32, JsValue> {
    let ruleset = RULESET
        .get()
        .ok_or_else(|| JsValue::from_str("Not initialized. Call init() first."))?;
    if INSTALLED.with(|installed| installed.replace(true)) {
        return Err(JsValue::from_str("Already installed. Reload the page to reinstall."));
    }

    let installed = REGISTRY.with(|registry| {
        let mut registry = registry.borrow_mut();
        let report = run_scriptlet(hostname, ruleset, &mut *registry, |failure| {
            let message = format!("[tickboost] argument set {}: {}", failure.index, failure.error);
            web_sys::console::warn_1(&JsValue::from_str(&message));
        });
        report.installed.len() as u32
    });
    Ok(installed)
}

#[wasm_bindgen]
pub fn is_installed() -> bool {
    INSTALLED.with(Cell::get)
}

/// Delay the wrapped `setInterval` would schedule for this call.
#[wasm_bindgen]
pub fn adjust_delay(callback_source: &str, delay: f64) -> f64 {
    REGISTRY.with(|registry| registry.borrow().schedule(callback_source, delay))
}
