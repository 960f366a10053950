//! Event objects and their dispatch through the node tree.
//!
//! Listeners and `on<type>` handlers are plain closures. The arena is never
//! borrowed while they run, so a listener may read or modify the tree, add or
//! remove listeners, and dispatch other events.

use std::{
    collections::HashMap,
    fmt,
    rc::Rc,
    time::{SystemTime, UNIX_EPOCH},
};

use tracing::trace;

use super::{
    DOMException,
    node::{Node, NodeConnection, NodeRef},
};

/// Callback registered by [`EventTarget::add_event_listener`].
///
/// Listeners are identified by pointer, so the same `Rc` has to be passed to
/// [`EventTarget::remove_event_listener`].
pub type EventListener = Rc<dyn Fn(&mut Event)>;

/// Callback registered by [`EventTarget::set_event_handler`].
///
/// Returning `false` cancels the event.
pub type EventHandler = Rc<dyn Fn(&mut Event) -> bool>;

#[derive(Clone)]
struct Listener {
    event_type: Rc<str>,
    callback: EventListener,
    capture: bool,
}

impl Listener {
    fn is(&self, event_type: &str, callback: &EventListener, capture: bool) -> bool {
        &*self.event_type == event_type
            && self.capture == capture
            && std::ptr::addr_eq(Rc::as_ptr(&self.callback), Rc::as_ptr(callback))
    }
}

/// Listeners and handlers of one node.
#[derive(Default)]
pub(crate) struct EventTargetData {
    listeners: Vec<Listener>,
    handlers: HashMap<Rc<str>, EventHandler>,
}

/// Constants `eventPhase` in [Interface Event](https://dom.spec.whatwg.org/#interface-event).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EventPhase {
    #[default]
    None = 0,
    Capturing = 1,
    AtTarget = 2,
    Bubbling = 3,
}

/// Implementation of [Event](https://dom.spec.whatwg.org/#interface-event) interface.
pub struct Event {
    event_type: Rc<str>,
    bubbles: bool,
    cancelable: bool,
    default_prevented: bool,
    phase: EventPhase,
    target: Option<NodeRef>,
    current_target: Option<NodeRef>,
    trusted: bool,
    time_stamp: f64,
    initialized: bool,
    dispatching: bool,
    stop_propagation: bool,
    stop_immediate_propagation: bool,
}

fn now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |d| d.as_secs_f64() * 1000.0)
}

impl Event {
    /// Create an initialized event.
    pub fn new(event_type: &str, bubbles: bool, cancelable: bool) -> Self {
        Self {
            event_type: event_type.into(),
            bubbles,
            cancelable,
            default_prevented: false,
            phase: EventPhase::None,
            target: None,
            current_target: None,
            trusted: false,
            time_stamp: now(),
            initialized: true,
            dispatching: false,
            stop_propagation: false,
            stop_immediate_propagation: false,
        }
    }

    /// An event that has to go through [`Event::init_event`] before it can be
    /// dispatched, as returned by `createEvent`.
    pub(crate) fn uninitialized() -> Self {
        Self {
            initialized: false,
            ..Self::new("", false, false)
        }
    }

    /// Implementation of [`initEvent`](https://dom.spec.whatwg.org/#dom-event-initevent) method.
    ///
    /// # Specification
    /// ```text
    /// The initEvent(type, bubbles, cancelable) method steps are:
    ///
    /// 1. If this's dispatch flag is set, then return.
    /// 2. Initialize this with type, bubbles, and cancelable.
    /// ```
    pub fn init_event(&mut self, event_type: &str, bubbles: bool, cancelable: bool) {
        if self.dispatching {
            return;
        }
        self.initialized = true;
        self.stop_propagation = false;
        self.stop_immediate_propagation = false;
        self.default_prevented = false;
        self.trusted = false;
        self.target = None;
        self.event_type = event_type.into();
        self.bubbles = bubbles;
        self.cancelable = cancelable;
    }

    /// Implementation of [`type`](https://dom.spec.whatwg.org/#dom-event-type) attribute.
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    pub fn cancelable(&self) -> bool {
        self.cancelable
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// Implementation of [`eventPhase`](https://dom.spec.whatwg.org/#dom-event-eventphase) attribute.
    pub fn event_phase(&self) -> EventPhase {
        self.phase
    }

    /// The node this event was dispatched to.
    pub fn target(&self) -> Option<NodeRef> {
        self.target.clone()
    }

    /// The node whose listeners are running. `None` outside of dispatch.
    pub fn current_target(&self) -> Option<NodeRef> {
        self.current_target.clone()
    }

    /// Check if this event was dispatched by the document itself rather than
    /// through [`EventTarget::dispatch_event`].
    pub fn is_trusted(&self) -> bool {
        self.trusted
    }

    /// Creation time in milliseconds since the Unix epoch.
    pub fn time_stamp(&self) -> f64 {
        self.time_stamp
    }

    /// Implementation of [`stopPropagation`](https://dom.spec.whatwg.org/#dom-event-stoppropagation) method.
    ///
    /// Listeners of the current target still run.
    pub fn stop_propagation(&mut self) {
        self.stop_propagation = true;
    }

    /// Implementation of [`stopImmediatePropagation`](https://dom.spec.whatwg.org/#dom-event-stopimmediatepropagation) method.
    pub fn stop_immediate_propagation(&mut self) {
        self.stop_propagation = true;
        self.stop_immediate_propagation = true;
    }

    /// Implementation of [`preventDefault`](https://dom.spec.whatwg.org/#dom-event-preventdefault) method.
    ///
    /// Non-cancelable events ignore this call.
    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("type", &self.event_type)
            .field("bubbles", &self.bubbles)
            .field("cancelable", &self.cancelable)
            .field("phase", &self.phase)
            .field("default_prevented", &self.default_prevented)
            .field("trusted", &self.trusted)
            .finish()
    }
}

/// Implementation of [EventTarget](https://dom.spec.whatwg.org/#interface-eventtarget) interface.
///
/// Every node is an event target.
#[allow(private_bounds)]
pub trait EventTarget: Node {
    /// Implementation of [`addEventListener`](https://dom.spec.whatwg.org/#dom-eventtarget-addeventlistener) method.
    ///
    /// Registering the same listener twice for the same type and capture flag
    /// has no effect.
    fn add_event_listener(&self, event_type: &str, listener: EventListener, capture: bool) {
        let mut tree = self.handle().arena().borrow_mut();
        let events = tree
            .node_mut(self.node_id())
            .events
            .get_or_insert_with(Default::default);
        if events
            .listeners
            .iter()
            .any(|l| l.is(event_type, &listener, capture))
        {
            return;
        }
        events.listeners.push(Listener {
            event_type: event_type.into(),
            callback: listener,
            capture,
        });
    }

    /// Implementation of [`removeEventListener`](https://dom.spec.whatwg.org/#dom-eventtarget-removeeventlistener) method.
    ///
    /// A listener removed during dispatch does not run anymore, even if the
    /// dispatch already collected it.
    fn remove_event_listener(&self, event_type: &str, listener: &EventListener, capture: bool) {
        let mut tree = self.handle().arena().borrow_mut();
        if let Some(events) = tree.node_mut(self.node_id()).events.as_mut() {
            events
                .listeners
                .retain(|l| !l.is(event_type, listener, capture));
        }
    }

    /// Set the `on<type>` handler of this node. `None` removes it.
    fn set_event_handler(&self, event_type: &str, handler: Option<EventHandler>) {
        let mut tree = self.handle().arena().borrow_mut();
        let node = tree.node_mut(self.node_id());
        match handler {
            Some(handler) => {
                node.events
                    .get_or_insert_with(Default::default)
                    .handlers
                    .insert(event_type.into(), handler);
            }
            None => {
                if let Some(events) = node.events.as_mut() {
                    events.handlers.remove(event_type);
                }
            }
        }
    }

    /// Get the `on<type>` handler of this node.
    fn event_handler(&self, event_type: &str) -> Option<EventHandler> {
        let tree = self.tree();
        tree.node(self.node_id())
            .events
            .as_ref()?
            .handlers
            .get(event_type)
            .cloned()
    }

    /// Implementation of [`dispatchEvent`](https://dom.spec.whatwg.org/#dom-eventtarget-dispatchevent) method.
    ///
    /// Returns `false` if the event was canceled.
    ///
    /// # Specification
    /// ```text
    /// The dispatchEvent(event) method steps are:
    ///
    /// 1. If event's dispatch flag is set, or if its initialized flag is not set,
    ///    then throw an "InvalidStateError" DOMException.
    /// 2. Initialize event's isTrusted attribute to false.
    /// 3. Return the result of dispatching event to this.
    /// ```
    fn dispatch_event(&self, event: &mut Event) -> Result<bool, DOMException> {
        dispatch(&self.clone().into(), event, false)
    }
}

impl<T: Node> EventTarget for T {}

/// Dispatch `event` to `target`.
///
/// The propagation path is fixed before the first listener runs.
pub(crate) fn dispatch(
    target: &NodeRef,
    event: &mut Event,
    trusted: bool,
) -> Result<bool, DOMException> {
    if !event.initialized || event.dispatching {
        return Err(DOMException::InvalidStateErr);
    }
    event.trusted = trusted;
    event.dispatching = true;
    event.target = Some(target.clone());
    trace!(event_type = %event.event_type, ?target, "dispatch event");

    let ancestors = {
        let tree = target.tree();
        tree.ancestors(target.node_id()).collect::<Vec<_>>()
    };
    let ancestors = ancestors
        .into_iter()
        .map(|id| target.handle().wrap(id))
        .collect::<Vec<_>>();

    event.phase = EventPhase::Capturing;
    for node in ancestors.iter().rev() {
        if event.stop_propagation {
            break;
        }
        invoke(node, event);
    }

    if !event.stop_propagation {
        event.phase = EventPhase::AtTarget;
        invoke(target, event);
    }

    if event.bubbles {
        event.phase = EventPhase::Bubbling;
        for node in &ancestors {
            if event.stop_propagation {
                break;
            }
            invoke(node, event);
        }
    }

    event.dispatching = false;
    event.phase = EventPhase::None;
    event.current_target = None;
    event.stop_propagation = false;
    event.stop_immediate_propagation = false;
    Ok(!event.default_prevented)
}

/// Run the handler and the listeners of `node` for the current phase.
fn invoke(node: &NodeRef, event: &mut Event) {
    event.current_target = Some(node.clone());
    let phase = event.phase;

    let (handler, listeners) = {
        let tree = node.tree();
        let Some(events) = tree.node(node.node_id()).events.as_ref() else {
            return;
        };
        let handler = if phase == EventPhase::Capturing {
            None
        } else {
            events.handlers.get(&*event.event_type).cloned()
        };
        let listeners = events
            .listeners
            .iter()
            .filter(|l| l.event_type == event.event_type)
            .filter(|l| match phase {
                EventPhase::Capturing => l.capture,
                EventPhase::Bubbling => !l.capture,
                _ => true,
            })
            .cloned()
            .collect::<Vec<_>>();
        (handler, listeners)
    };

    if let Some(handler) = handler {
        if !handler(event) {
            event.prevent_default();
        }
    }

    for listener in listeners {
        if event.stop_immediate_propagation {
            return;
        }
        let registered = {
            let tree = node.tree();
            tree.node(node.node_id()).events.as_ref().is_some_and(|events| {
                events
                    .listeners
                    .iter()
                    .any(|l| l.is(&listener.event_type, &listener.callback, listener.capture))
            })
        };
        if registered {
            (listener.callback)(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::dom::dom_implementation::DOMImplementation;

    #[test]
    fn phases_run_in_order() {
        let doc = DOMImplementation::new().create_html_document(None);
        let body = doc.body().unwrap();
        let div = doc.create_element("div").unwrap();
        body.append_child(div.clone().into()).unwrap();

        let log = Rc::new(RefCell::new(vec![]));
        let record = |name: &'static str| -> EventListener {
            let log = log.clone();
            Rc::new(move |e: &mut Event| log.borrow_mut().push((name, e.event_phase())))
        };
        body.add_event_listener("ping", record("body-capture"), true);
        body.add_event_listener("ping", record("body-bubble"), false);
        div.add_event_listener("ping", record("div"), false);

        let mut event = Event::new("ping", true, false);
        assert!(div.dispatch_event(&mut event).unwrap());
        assert_eq!(
            *log.borrow(),
            [
                ("body-capture", EventPhase::Capturing),
                ("div", EventPhase::AtTarget),
                ("body-bubble", EventPhase::Bubbling),
            ]
        );
        assert_eq!(event.event_phase(), EventPhase::None);
        assert!(event.current_target().is_none());
        assert_eq!(event.target(), Some(div.into()));
    }

    #[test]
    fn duplicate_listeners_are_ignored() {
        let doc = DOMImplementation::new().create_html_document(None);
        let count = Rc::new(RefCell::new(0));
        let listener: EventListener = {
            let count = count.clone();
            Rc::new(move |_: &mut Event| *count.borrow_mut() += 1)
        };
        doc.add_event_listener("x", listener.clone(), false);
        doc.add_event_listener("x", listener.clone(), false);
        doc.dispatch_event(&mut Event::new("x", false, false)).unwrap();
        assert_eq!(*count.borrow(), 1);

        doc.remove_event_listener("x", &listener, false);
        doc.dispatch_event(&mut Event::new("x", false, false)).unwrap();
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn handler_cancels_event() {
        let doc = DOMImplementation::new().create_html_document(None);
        let elem = doc.create_element("a").unwrap();
        elem.set_event_handler("click", Some(Rc::new(|_: &mut Event| false)));
        assert!(elem.event_handler("click").is_some());

        let mut event = Event::new("click", true, true);
        assert!(!elem.dispatch_event(&mut event).unwrap());
        assert!(event.default_prevented());

        // not cancelable
        let mut event = Event::new("click", true, false);
        assert!(elem.dispatch_event(&mut event).unwrap());
    }

    #[test]
    fn uninitialized_event_is_rejected() {
        let doc = DOMImplementation::new().create_html_document(None);
        let mut event = doc.create_event("Event").unwrap();
        assert_eq!(
            doc.dispatch_event(&mut event),
            Err(DOMException::InvalidStateErr)
        );
        event.init_event("x", false, false);
        assert_eq!(doc.dispatch_event(&mut event), Ok(true));
        assert!(!event.is_trusted());
    }
}
