use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use js_sys::{Function, Reflect};
use leptos::mount::mount_to;
use leptos::prelude::*;
use log::{debug, warn};
use wasm_bindgen::prelude::*;
use web_sys::{AddEventListenerOptions, Element, StorageEvent};

use crate::config::TocConfig;
use crate::dom::{DomHost, LocalStore};
use crate::error::{TocError, TocResult};
use crate::toc_core::{PanelModel, TocController, TocView};

const ENABLED_CLASS: &str = "right-toc-enabled";
const OPEN_CLASS: &str = "right-toc-open";
const MOBILE_CLASS: &str = "right-toc-mobile";
const PAGE_CHANGE_EVENT: &str = "page.change";

thread_local! {
    static RUNTIME: RefCell<Option<Rc<TocRuntime>>> = const { RefCell::new(None) };
}

/// Reactive mirror of [`TocView`] read by the mounted panel.
#[derive(Clone, Copy)]
struct PanelSignals {
    open: RwSignal<bool>,
    active: RwSignal<Option<String>>,
    toggle_label: RwSignal<String>,
}

impl PanelSignals {
    fn new() -> Self {
        Self {
            open: RwSignal::new(false),
            active: RwSignal::new(None),
            toggle_label: RwSignal::new(String::new()),
        }
    }

    fn project(&self, view: &TocView) {
        if self.open.get_untracked() != view.toggle_expanded() {
            self.open.set(view.toggle_expanded());
        }
        if self.active.with_untracked(|active| *active != view.active) {
            self.active.set(view.active.clone());
        }
        if self.toggle_label.with_untracked(|label| *label != view.toggle_label) {
            self.toggle_label.set(view.toggle_label.clone());
        }
    }
}

fn panel_view(model: PanelModel, signals: PanelSignals) -> impl IntoView {
    let PanelSignals {
        open,
        active,
        toggle_label,
    } = signals;

    let items = model
        .entries
        .into_iter()
        .map(|entry| {
            let id = entry.id;
            let link_class = move || {
                if active.with(|current| current.as_deref() == Some(id.as_str())) {
                    "right-toc__link is-active"
                } else {
                    "right-toc__link"
                }
            };
            view! {
                <li class=format!("right-toc__item level-{}", entry.level)>
                    <a class=link_class href=entry.href>
                        {entry.text}
                    </a>
                </li>
            }
        })
        .collect::<Vec<_>>();

    let expanded = move || if open.get() { "true" } else { "false" };

    view! {
        <div class="right-toc-backdrop" on:click=move |_| with_runtime(TocRuntime::close)></div>
        <button
            class="right-toc-toggle"
            type="button"
            aria-label=model.toggle_aria_label
            aria-expanded=expanded
            on:click=move |_| with_runtime(TocRuntime::toggle)
        >
            <span class="right-toc-toggle__text">{move || toggle_label.get()}</span>
            <span class="right-toc-toggle__icon">"›"</span>
        </button>
        <aside class="right-toc">
            <div class="right-toc__title">{model.title}</div>
            <ul class="right-toc__list">{items}</ul>
        </aside>
    }
}

fn project_body_classes(body: &Element, view: &TocView) {
    let classes = body.class_list();
    for (class, on) in [
        (ENABLED_CLASS, view.enabled),
        (OPEN_CLASS, view.open),
        (MOBILE_CLASS, view.mobile),
    ] {
        if let Err(err) = classes.toggle_with_force(class, on) {
            debug!("could not update body class {class}: {err:?}");
        }
    }
}

struct TocRuntime {
    controller: RefCell<TocController<DomHost, LocalStore>>,
    signals: PanelSignals,
    // Dropping the handle unmounts the panel, toggle and backdrop.
    mounted: RefCell<Option<Box<dyn Any>>>,
    listeners_bound: Cell<bool>,
    host_bound: Cell<bool>,
}

impl TocRuntime {
    fn new(config: TocConfig) -> Self {
        let host = DomHost::new(&config);
        Self {
            controller: RefCell::new(TocController::new(config, host, LocalStore)),
            signals: PanelSignals::new(),
            mounted: RefCell::new(None),
            listeners_bound: Cell::new(false),
            host_bound: Cell::new(false),
        }
    }

    fn start(self: &Rc<Self>) {
        self.bind_global_listeners();
        self.bind_host_page_change();
        self.rebuild();
    }

    fn rebuild(self: &Rc<Self>) {
        let previous = self.mounted.borrow_mut().take();
        drop(previous);

        let model = self.controller.borrow_mut().rebuild();
        self.project();
        if let Some(model) = model {
            if let Err(err) = self.mount_panel(model) {
                debug!("TOC panel not mounted: {err}");
            }
        }
    }

    fn mount_panel(&self, model: PanelModel) -> TocResult<()> {
        let body = {
            let controller = self.controller.borrow();
            controller
                .host()
                .body()
                .ok_or_else(|| TocError::MissingElement(controller.config().body_selector.clone()))?
        };
        let signals = self.signals;
        let handle = mount_to(body, move || panel_view(model, signals));
        *self.mounted.borrow_mut() = Some(Box::new(handle));
        Ok(())
    }

    /// Pushes controller state onto the signals and the page body.
    fn project(&self) {
        let (view, body) = {
            let controller = self.controller.borrow();
            (controller.view(), controller.host().body())
        };
        self.signals.project(&view);
        if let Some(body) = body {
            project_body_classes(&body, &view);
        }
    }

    fn on_scroll(self: &Rc<Self>) {
        if !self.controller.borrow_mut().request_scroll_update() {
            return;
        }
        let runtime = Rc::clone(self);
        let frame = Closure::once_into_js(move || runtime.run_frame());
        if let Err(err) = window().request_animation_frame(frame.unchecked_ref()) {
            debug!("requestAnimationFrame failed ({err:?}); updating now");
            self.run_frame();
        }
    }

    fn run_frame(&self) {
        let ran = self.controller.borrow_mut().run_scheduled_update();
        if ran {
            self.project();
        }
    }

    fn on_hash_change(&self) {
        self.controller.borrow_mut().on_hash_change();
        self.project();
    }

    fn on_resize(&self) {
        let synced = self.controller.borrow_mut().sync_viewport_mode();
        if synced {
            self.project();
        }
    }

    fn on_storage(&self, event: &StorageEvent) {
        let changed = {
            let mut controller = self.controller.borrow_mut();
            if event.key().as_deref() != Some(controller.config().storage_key.as_str()) {
                return;
            }
            controller.on_stored_preference_changed(event.new_value().as_deref())
        };
        if changed {
            self.project();
        }
    }

    fn toggle(self: &Rc<Self>) {
        self.controller.borrow_mut().toggle();
        self.project();
    }

    fn close(self: &Rc<Self>) {
        self.controller.borrow_mut().close();
        self.project();
    }

    fn bind_global_listeners(self: &Rc<Self>) {
        if self.listeners_bound.replace(true) {
            return;
        }
        let passive = AddEventListenerOptions::new();
        passive.set_passive(true);

        let runtime = Rc::clone(self);
        let on_scroll = Closure::<dyn FnMut()>::new(move || runtime.on_scroll());
        listen("scroll", on_scroll.as_ref().unchecked_ref(), Some(&passive));
        on_scroll.forget();

        let runtime = Rc::clone(self);
        let on_hash_change = Closure::<dyn FnMut()>::new(move || runtime.on_hash_change());
        listen("hashchange", on_hash_change.as_ref().unchecked_ref(), None);
        on_hash_change.forget();

        let runtime = Rc::clone(self);
        let on_resize = Closure::<dyn FnMut()>::new(move || runtime.on_resize());
        listen("resize", on_resize.as_ref().unchecked_ref(), Some(&passive));
        on_resize.forget();

        let runtime = Rc::clone(self);
        let on_storage =
            Closure::<dyn FnMut(StorageEvent)>::new(move |event: StorageEvent| runtime.on_storage(&event));
        listen("storage", on_storage.as_ref().unchecked_ref(), None);
        on_storage.forget();
    }

    /// GitBook/HonKit themes announce in-app navigation on
    /// `window.gitbook.events`.
    fn bind_host_page_change(self: &Rc<Self>) {
        if self.host_bound.get() {
            return;
        }
        let Some((events, bind)) = gitbook_event_bus() else {
            debug!("no gitbook event bus; waiting for onContentChanged calls");
            return;
        };
        let runtime = Rc::clone(self);
        let on_page_change = Closure::<dyn FnMut()>::new(move || runtime.rebuild());
        match bind.call2(&events, &JsValue::from_str(PAGE_CHANGE_EVENT), on_page_change.as_ref()) {
            Ok(_) => {
                self.host_bound.set(true);
                on_page_change.forget();
            }
            Err(err) => warn!("could not bind {PAGE_CHANGE_EVENT}: {err:?}"),
        }
    }
}

fn listen(event: &str, callback: &Function, options: Option<&AddEventListenerOptions>) {
    let window = window();
    let result = match options {
        Some(options) => {
            window.add_event_listener_with_callback_and_add_event_listener_options(event, callback, options)
        }
        None => window.add_event_listener_with_callback(event, callback),
    };
    if let Err(err) = result {
        warn!("could not listen for {event}: {err:?}");
    }
}

fn gitbook_event_bus() -> Option<(JsValue, Function)> {
    let gitbook = Reflect::get(&window(), &JsValue::from_str("gitbook"))
        .ok()
        .filter(JsValue::is_object)?;
    let events = Reflect::get(&gitbook, &JsValue::from_str("events"))
        .ok()
        .filter(JsValue::is_object)?;
    let bind = Reflect::get(&events, &JsValue::from_str("bind"))
        .ok()?
        .dyn_into::<Function>()
        .ok()?;
    Some((events, bind))
}

fn with_runtime(f: impl FnOnce(&Rc<TocRuntime>)) {
    let runtime = RUNTIME.with(|slot| slot.borrow().clone());
    match runtime {
        Some(runtime) => f(&runtime),
        None => debug!("TOC event before initialize; ignored"),
    }
}

fn when_document_ready(f: impl FnOnce() + 'static) {
    let loading = Reflect::get(&document(), &JsValue::from_str("readyState"))
        .ok()
        .and_then(|state| state.as_string())
        .is_some_and(|state| state == "loading");
    if !loading {
        f();
        return;
    }

    let options = AddEventListenerOptions::new();
    options.set_once(true);
    let callback = Closure::once_into_js(f);
    if let Err(err) = document().add_event_listener_with_callback_and_add_event_listener_options(
        "DOMContentLoaded",
        callback.unchecked_ref(),
        &options,
    ) {
        warn!("could not wait for DOMContentLoaded: {err:?}");
    }
}

fn load_config(options: JsValue) -> TocConfig {
    let parsed = if options.is_undefined() || options.is_null() {
        Ok(TocConfig::default())
    } else if let Some(text) = options.as_string() {
        TocConfig::from_json(&text)
    } else {
        serde_wasm_bindgen::from_value::<TocConfig>(options)
            .map_err(|err| TocError::InvalidConfig(err.to_string()))
            .and_then(TocConfig::validated)
    };
    parsed.unwrap_or_else(|err| {
        warn!("{err}; using default TOC settings");
        TocConfig::default()
    })
}

pub fn initialize(options: JsValue) {
    let config = load_config(options);
    crate::logging::init(config.log_level_filter());

    let existing = RUNTIME.with(|slot| slot.borrow().clone());
    let runtime = match existing {
        Some(runtime) => {
            if *runtime.controller.borrow().config() != config {
                debug!("TOC already initialized; keeping the first configuration");
            }
            runtime
        }
        None => {
            let runtime = Rc::new(TocRuntime::new(config));
            RUNTIME.with(|slot| *slot.borrow_mut() = Some(Rc::clone(&runtime)));
            runtime
        }
    };
    when_document_ready(move || runtime.start());
}

pub fn on_content_changed() {
    with_runtime(TocRuntime::rebuild);
}
