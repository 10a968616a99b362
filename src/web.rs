//! Browser front end.
//!
//! Binds the page's controls to a [`Piano`], streams its output through a
//! `ScriptProcessorNode`, keeps the keys' `active` class in step with the
//! sounding notes and fetches the reverb impulse response.
//!
//! Expected markup: `.waveform[data-wave]` buttons, `.key[data-note]`
//! buttons, `#reverb`, `#delay` and `#volume` range inputs, a
//! `.rotate-device-message` element and a `#content` element.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    AudioContext, AudioProcessingEvent, Document, Element, Event, EventTarget, HtmlElement,
    HtmlInputElement, KeyboardEvent, Response, Window,
};

use crate::config::PianoConfig;
use crate::error::ImpulseError;
use crate::input::InputEvent;
use crate::layout::{self, Display};
use crate::piano::{Piano, PianoEvent};

/// Frames per audio callback.
const BUFFER_SIZE: u32 = 2048;

struct App {
    piano: Piano,
    ctx: AudioContext,
    document: Document,
}

type Shared = Rc<RefCell<App>>;

/// WASM-exposed: wire up the page with the default configuration.
#[wasm_bindgen]
pub fn start() -> Result<(), JsValue> {
    start_with_config(JsValue::UNDEFINED)
}

/// WASM-exposed: wire up the page with a config object.
#[wasm_bindgen]
pub fn start_with_config(config: JsValue) -> Result<(), JsValue> {
    init_logging();

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    let config: PianoConfig = if config.is_undefined() || config.is_null() {
        PianoConfig::default()
    } else {
        serde_wasm_bindgen::from_value(config)?
    };

    let ctx = AudioContext::new()?;
    let piano = Piano::with_config(config, ctx.sample_rate() as f64)
        .map_err(|e| JsValue::from_str(&format!("{e}")))?;
    let ir_path = piano.config().impulse_response.clone();

    let app: Shared = Rc::new(RefCell::new(App {
        piano,
        ctx: ctx.clone(),
        document: document.clone(),
    }));

    connect_output(&ctx, &app)?;
    bind_waveform_buttons(&document, &app)?;
    bind_keys(&document, &app)?;
    bind_sliders(&document, &app)?;
    bind_keyboard(&window, &document, &app)?;
    bind_orientation(&window, &document)?;
    apply_layout(&window, &document);

    wasm_bindgen_futures::spawn_local(load_impulse_response(app, ir_path));
    log::info!("virtual piano {} ready at {} Hz", crate::VERSION, ctx.sample_rate());
    Ok(())
}

/// Add an event listener that lives as long as the page.
fn on(
    target: &EventTarget,
    kind: &str,
    handler: impl FnMut(Event) + 'static,
) -> Result<(), JsValue> {
    let closure = Closure::<dyn FnMut(Event)>::new(handler);
    target.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

fn elements(document: &Document, selector: &str) -> Result<Vec<Element>, JsValue> {
    let list = document.query_selector_all(selector)?;
    let mut out = Vec::with_capacity(list.length() as usize);
    for i in 0..list.length() {
        if let Some(node) = list.item(i) {
            out.push(node.dyn_into::<Element>()?);
        }
    }
    Ok(out)
}

// ── Audio ───────────────────────────────────────────────────

fn connect_output(ctx: &AudioContext, app: &Shared) -> Result<(), JsValue> {
    let node = ctx
        .create_script_processor_with_buffer_size_and_number_of_input_channels_and_number_of_output_channels(
            BUFFER_SIZE,
            0,
            1,
        )?;

    let app = app.clone();
    let mut block = vec![0.0f32; BUFFER_SIZE as usize];
    let on_process = Closure::<dyn FnMut(AudioProcessingEvent)>::new(
        move |event: AudioProcessingEvent| {
            let Ok(buffer) = event.output_buffer() else {
                return;
            };
            block.resize(buffer.length() as usize, 0.0);

            let mut app = app.borrow_mut();
            app.piano.render(&mut block);
            if let Err(e) = buffer.copy_to_channel(&block, 0) {
                log::error!("audio output failed: {e:?}");
            }
            let events = app.piano.drain_events();
            apply_events(&app.document, &events);
        },
    );
    node.set_onaudioprocess(Some(on_process.as_ref().unchecked_ref()));
    on_process.forget();

    node.connect_with_audio_node(&ctx.destination())?;
    Ok(())
}

async fn load_impulse_response(app: Shared, path: String) {
    match fetch_bytes(&path).await {
        // decode failures are logged by the engine
        Ok(bytes) => {
            let _ = app.borrow_mut().piano.load_impulse_response(&bytes);
        }
        Err(e) => log::error!("Error loading or decoding impulse response: {e}"),
    }
}

async fn fetch_bytes(path: &str) -> Result<Vec<u8>, ImpulseError> {
    let window = web_sys::window().ok_or_else(|| ImpulseError::Fetch("no window".into()))?;
    let response: Response = JsFuture::from(window.fetch_with_str(path))
        .await
        .map_err(fetch_err)?
        .dyn_into()
        .map_err(fetch_err)?;
    if !response.ok() {
        return Err(ImpulseError::Fetch(format!(
            "{path}: HTTP {}",
            response.status()
        )));
    }
    let buffer = JsFuture::from(response.array_buffer().map_err(fetch_err)?)
        .await
        .map_err(fetch_err)?;
    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}

fn fetch_err(e: JsValue) -> ImpulseError {
    ImpulseError::Fetch(format!("{e:?}"))
}

// ── Controls ────────────────────────────────────────────────

/// Feed one UI event to the piano and reflect the result on the keys.
fn dispatch(app: &Shared, input: &InputEvent) {
    let mut app = app.borrow_mut();
    if matches!(
        input,
        InputEvent::KeyDown(_) | InputEvent::PointerDown(_) | InputEvent::TouchStart(_)
    ) {
        // Audio stays suspended until the first user gesture.
        if let Err(e) = app.ctx.resume() {
            log::error!("could not resume audio: {e:?}");
        }
    }
    // errors are logged by the engine
    let _ = app.piano.handle_input(input);
    let events = app.piano.drain_events();
    apply_events(&app.document, &events);
}

fn apply_events(document: &Document, events: &[PianoEvent]) {
    for event in events {
        let (note, active) = match event {
            PianoEvent::NoteOn { note, .. } => (note, true),
            PianoEvent::NoteOff { note, .. } => (note, false),
        };
        let selector = format!(".key[data-note=\"{note}\"]");
        let Ok(Some(key)) = document.query_selector(&selector) else {
            continue;
        };
        let classes = key.class_list();
        let result = if active {
            classes.add_1("active")
        } else {
            classes.remove_1("active")
        };
        if let Err(e) = result {
            log::warn!("could not update key {note}: {e:?}");
        }
    }
}

fn bind_waveform_buttons(document: &Document, app: &Shared) -> Result<(), JsValue> {
    for button in elements(document, ".waveform")? {
        let Some(wave) = button.get_attribute("data-wave") else {
            continue;
        };
        let app = app.clone();
        on(&button, "click", move |_| {
            // unknown names are logged and ignored
            let _ = app.borrow_mut().piano.select_waveform_by_name(&wave);
        })?;
    }
    Ok(())
}

fn bind_keys(document: &Document, app: &Shared) -> Result<(), JsValue> {
    let bindings: [(&str, fn(String) -> InputEvent); 6] = [
        ("mousedown", InputEvent::PointerDown),
        ("mouseup", InputEvent::PointerUp),
        ("mouseleave", InputEvent::PointerLeave),
        ("touchstart", InputEvent::TouchStart),
        ("touchend", InputEvent::TouchEnd),
        ("touchcancel", InputEvent::TouchCancel),
    ];

    for key in elements(document, ".key")? {
        let Some(note) = key.get_attribute("data-note") else {
            continue;
        };
        for (kind, make) in bindings {
            let app = app.clone();
            let note = note.clone();
            on(&key, kind, move |event| {
                let input = make(note.clone());
                if input.prevents_default() {
                    event.prevent_default();
                }
                dispatch(&app, &input);
            })?;
        }
    }
    Ok(())
}

fn bind_sliders(document: &Document, app: &Shared) -> Result<(), JsValue> {
    let effects = app.borrow().piano.effects();
    let sliders: [(&str, f64, fn(&mut Piano, f64)); 3] = [
        ("reverb", effects.reverb, Piano::set_reverb),
        ("delay", effects.delay, Piano::set_delay),
        ("volume", effects.volume, Piano::set_volume),
    ];

    for (id, initial, apply) in sliders {
        let Some(element) = document.get_element_by_id(id) else {
            log::warn!("no #{id} slider on the page");
            continue;
        };
        let slider: HtmlInputElement = element.dyn_into()?;
        slider.set_value_as_number(initial);

        let app = app.clone();
        let source = slider.clone();
        on(&slider, "input", move |_| {
            apply(&mut app.borrow_mut().piano, source.value_as_number());
        })?;
    }
    Ok(())
}

fn bind_keyboard(window: &Window, document: &Document, app: &Shared) -> Result<(), JsValue> {
    let down = app.clone();
    on(document, "keydown", move |event| {
        if let Some(event) = event.dyn_ref::<KeyboardEvent>() {
            dispatch(&down, &InputEvent::KeyDown(event.key()));
        }
    })?;

    let up = app.clone();
    on(document, "keyup", move |event| {
        if let Some(event) = event.dyn_ref::<KeyboardEvent>() {
            dispatch(&up, &InputEvent::KeyUp(event.key()));
        }
    })?;

    // Key-up events are lost while the page is in the background.
    let blur = app.clone();
    on(window, "blur", move |_| {
        let mut app = blur.borrow_mut();
        app.piano.reset_input();
        let events = app.piano.drain_events();
        apply_events(&app.document, &events);
    })?;
    Ok(())
}

// ── Layout ──────────────────────────────────────────────────

fn bind_orientation(window: &Window, document: &Document) -> Result<(), JsValue> {
    for kind in ["resize", "orientationchange", "load"] {
        let win = window.clone();
        let doc = document.clone();
        on(window, kind, move |_| apply_layout(&win, &doc))?;
    }
    Ok(())
}

fn apply_layout(window: &Window, document: &Document) {
    let dimension = |v: Result<JsValue, JsValue>| v.ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
    let layout = layout::orientation_layout(
        dimension(window.inner_width()),
        dimension(window.inner_height()),
    );

    set_display(
        document
            .query_selector(".rotate-device-message")
            .ok()
            .flatten(),
        layout.rotate_prompt,
    );
    set_display(document.get_element_by_id("content"), layout.content);
}

fn set_display(element: Option<Element>, display: Display) {
    let Some(element) = element.and_then(|e| e.dyn_into::<HtmlElement>().ok()) else {
        return;
    };
    if let Err(e) = element.style().set_property("display", display.as_css()) {
        log::warn!("could not set display: {e:?}");
    }
}

// ── Logging ─────────────────────────────────────────────────

struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = JsValue::from_str(&format!("[{}] {}", record.target(), record.args()));
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&message),
            log::Level::Warn => web_sys::console::warn_1(&message),
            log::Level::Info => web_sys::console::info_1(&message),
            log::Level::Debug | log::Level::Trace => web_sys::console::debug_1(&message),
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

fn init_logging() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(log::LevelFilter::Info);
    }
}
