//! Behavior of the node tree as seen through the public API.

use std::{cell::RefCell, rc::Rc};

use exdom::dom::{
    DOMException, HTML_NAMESPACE,
    character_data::CharacterData,
    child_node::{ChildNode, NodeOrString, NonDocumentTypeChildNode, ParentNode},
    document::DocumentRef,
    dom_implementation::DOMImplementation,
    element::ElementRef,
    event::{Event, EventListener, EventPhase, EventTarget},
    mutation::{MutationKind, MutationRecord},
    node::{Node, NodeRef},
    node_list::NodeList,
    select::SelectorEngine,
    traversal::SHOW_ELEMENT,
};
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Understands a comma separated list of tag names and `*`.
struct TagNameEngine;

impl TagNameEngine {
    fn parse(selectors: &str) -> Result<Vec<&str>, DOMException> {
        let names = selectors.split(',').map(str::trim).collect::<Vec<_>>();
        if names
            .iter()
            .any(|name| name.is_empty() || name.contains(char::is_whitespace))
        {
            return Err(DOMException::SyntaxErr);
        }
        Ok(names)
    }
}

impl SelectorEngine for TagNameEngine {
    fn select(&self, selectors: &str, root: &NodeRef) -> Result<Vec<ElementRef>, DOMException> {
        Self::parse(selectors)?;
        let mut cur = match root.as_element() {
            Some(elem) => elem.next_element(root),
            None => kids(root).into_iter().find_map(|n| n.as_element()),
        };
        let mut res = vec![];
        while let Some(elem) = cur {
            if self.matches(selectors, &elem)? {
                res.push(elem.clone());
            }
            cur = elem.next_element(root);
        }
        Ok(res)
    }

    fn matches(&self, selectors: &str, element: &ElementRef) -> Result<bool, DOMException> {
        let local_name = element.local_name();
        Ok(Self::parse(selectors)?
            .into_iter()
            .any(|name| name == "*" || name.eq_ignore_ascii_case(&local_name)))
    }
}

fn kids(node: &NodeRef) -> Vec<NodeRef> {
    std::iter::successors(node.first_child(), |n| n.next_sibling()).collect()
}

fn html_document() -> (DocumentRef, ElementRef) {
    let doc = DOMImplementation::new().create_html_document(None);
    let body = doc.body().unwrap();
    (doc, body)
}

fn element(doc: &DocumentRef, name: &str) -> ElementRef {
    doc.create_element(name).unwrap()
}

fn record_kinds(doc: &DocumentRef) -> Rc<RefCell<Vec<MutationKind>>> {
    let kinds = Rc::new(RefCell::new(vec![]));
    let log = kinds.clone();
    doc.set_mutation_handler(move |record| log.borrow_mut().push(record.kind()));
    kinds
}

#[test]
fn selectors_through_engine() {
    let (doc, body) = html_document();
    let div = element(&doc, "div");
    let inner = element(&doc, "p");
    let outer = element(&doc, "p");
    let span = element(&doc, "span");
    div.append_child(inner.clone().into()).unwrap();
    body.append(vec![div.clone().into(), outer.clone().into(), "text".into(), span.clone().into()])
        .unwrap();

    let engine = TagNameEngine;
    assert_eq!(body.query_selector(&engine, "p").unwrap(), Some(inner.clone()));
    assert_eq!(doc.query_selector(&engine, "body").unwrap(), Some(body.clone()));
    let all = body.query_selector_all(&engine, "span, p").unwrap();
    assert_eq!(all.to_vec(), vec![inner.clone(), outer.clone(), span.clone()]);
    // the scope element itself is not a candidate
    assert_eq!(div.query_selector_all(&engine, "div").unwrap().length(), 0);

    assert!(inner.matches(&engine, "p").unwrap());
    assert!(!inner.matches(&engine, "div").unwrap());
    assert_eq!(inner.closest(&engine, "div").unwrap(), Some(div.clone()));
    assert_eq!(inner.closest(&engine, "p").unwrap(), Some(inner.clone()));
    assert_eq!(inner.closest(&engine, "table").unwrap(), None);

    assert_eq!(body.query_selector(&engine, ""), Err(DOMException::SyntaxErr));
    assert_eq!(inner.closest(&engine, "a b"), Err(DOMException::SyntaxErr));

    let frag = doc.create_document_fragment();
    let em = element(&doc, "em");
    frag.append(vec!["x".into(), em.clone().into()]).unwrap();
    assert_eq!(frag.query_selector(&engine, "*").unwrap(), Some(em));
}

#[test]
fn fragment_insertion_reports_each_child() {
    let (doc, body) = html_document();
    let targets = Rc::new(RefCell::new(vec![]));
    let log = targets.clone();
    doc.set_mutation_handler(move |record| {
        if let MutationRecord::Insert { target, node } = record {
            log.borrow_mut().push((target.clone(), node.clone()));
        }
    });

    let frag = doc.create_document_fragment();
    let nodes: Vec<NodeRef> = vec![
        element(&doc, "a").into(),
        doc.create_text_node("t").into(),
        doc.create_comment("c").into(),
    ];
    for node in &nodes {
        frag.append_child(node.clone()).unwrap();
    }
    // the fragment is not connected, so nothing has been reported yet
    assert!(targets.borrow().is_empty());

    body.append_child(frag.clone().into()).unwrap();
    assert!(!frag.has_child_nodes());
    let targets = targets.borrow();
    assert_eq!(targets.len(), 3);
    let body: NodeRef = body.into();
    for ((target, node), expected) in targets.iter().zip(&nodes) {
        assert_eq!(target, &body);
        assert_eq!(node, expected);
        assert!(node.is_connected());
    }
}

#[test]
fn same_document_replace_is_a_move() {
    let (doc, body) = html_document();
    let a = element(&doc, "a");
    let b = element(&doc, "b");
    let div = element(&doc, "div");
    body.append(vec![a.clone().into(), div.clone().into()]).unwrap();
    div.append_child(b.clone().into()).unwrap();
    let number = b.node_number();

    let kinds = record_kinds(&doc);
    body.replace_child(b.clone().into(), &a.clone().into()).unwrap();
    assert_eq!(*kinds.borrow(), vec![MutationKind::Remove, MutationKind::Move]);
    assert_eq!(kids(&body.clone().into()), vec![NodeRef::from(b.clone()), div.clone().into()]);
    assert!(!div.has_child_nodes());
    assert!(!a.is_connected());
    // moved nodes keep their number
    assert_eq!(b.node_number(), number);

    kinds.borrow_mut().clear();
    let c = element(&doc, "c");
    body.replace_child(c.clone().into(), &b.clone().into()).unwrap();
    assert_eq!(*kinds.borrow(), vec![MutationKind::Remove, MutationKind::Insert]);
    assert_eq!(c.previous_sibling(), None);
    assert_eq!(c.next_element_sibling(), Some(div));
}

#[test]
fn bulk_removal_is_one_record() {
    let (doc, body) = html_document();
    for i in 0..5 {
        body.append(vec![format!("{i}").into()]).unwrap();
    }
    let removed = Rc::new(RefCell::new(vec![]));
    let log = removed.clone();
    doc.set_mutation_handler(move |record| {
        if let MutationRecord::Remove { nodes, .. } = record {
            log.borrow_mut().push(nodes.len());
        }
    });
    body.remove_children();
    assert_eq!(*removed.borrow(), vec![5]);
    assert!(!body.has_child_nodes());
    assert_eq!(body.first_child(), None);
    // nothing left to remove
    body.remove_children();
    assert_eq!(*removed.borrow(), vec![5]);
}

#[test]
fn attribute_and_value_changes_are_reported() {
    let (doc, body) = html_document();
    let text = doc.create_text_node("hello");
    body.append_child(text.clone().into()).unwrap();

    let records = Rc::new(RefCell::new(vec![]));
    let log = records.clone();
    doc.set_mutation_handler(move |record| log.borrow_mut().push(record.clone()));

    body.set_attribute("title", "a").unwrap();
    body.set_attribute("title", "b").unwrap();
    body.remove_attribute("title");
    text.append_data(" world");

    let records = records.borrow();
    assert_eq!(records.len(), 4);
    match &records[0] {
        MutationRecord::Attr { target, attr, old_value } => {
            assert_eq!(target, &body);
            assert_eq!(&*attr.name(), "title");
            assert_eq!(old_value, &None);
        }
        other => panic!("unexpected record {other:?}"),
    }
    match &records[1] {
        MutationRecord::Attr { old_value, .. } => assert_eq!(old_value.as_deref(), Some("a")),
        other => panic!("unexpected record {other:?}"),
    }
    assert_eq!(records[2].kind(), MutationKind::RemoveAttr);
    match &records[3] {
        MutationRecord::Value { target, data } => {
            assert_eq!(target, &NodeRef::from(text.clone()));
            assert_eq!(data, "hello world");
        }
        other => panic!("unexpected record {other:?}"),
    }
}

#[test]
fn disconnected_changes_are_not_reported() {
    let (doc, _) = html_document();
    let kinds = record_kinds(&doc);
    let div = element(&doc, "div");
    div.set_attribute("id", "x").unwrap();
    div.append_child(doc.create_text_node("t").into()).unwrap();
    div.remove_children();
    assert!(kinds.borrow().is_empty());

    doc.clear_mutation_handler();
    doc.body().unwrap().append_child(div.into()).unwrap();
    assert!(kinds.borrow().is_empty());
}

#[test]
fn handler_may_modify_the_tree() {
    let (doc, body) = html_document();
    let kinds = Rc::new(RefCell::new(vec![]));
    let log = kinds.clone();
    doc.set_mutation_handler(move |record| {
        log.borrow_mut().push(record.kind());
        if let MutationRecord::Insert { node, .. } = record {
            if let Some(elem) = node.as_element() {
                elem.set_attribute("data-seen", "").unwrap();
            }
        }
    });
    let div = element(&doc, "div");
    body.append_child(div.clone().into()).unwrap();
    assert!(div.has_attribute("data-seen"));
    // the handler's own change is not reported back to it
    assert_eq!(*kinds.borrow(), vec![MutationKind::Insert]);
}

#[test]
fn node_iterator_follows_removal() {
    let (doc, body) = html_document();
    let x = element(&doc, "x");
    let a = element(&doc, "a");
    let b = element(&doc, "b");
    let c = element(&doc, "c");
    a.append_child(b.clone().into()).unwrap();
    body.append(vec![x.clone().into(), a.clone().into(), c.clone().into()])
        .unwrap();

    let it = doc.create_node_iterator(body.clone().into(), SHOW_ELEMENT, None);
    let mut seen = vec![];
    for _ in 0..4 {
        seen.push(it.next_node().unwrap().unwrap());
    }
    assert_eq!(seen.last(), Some(&NodeRef::from(b.clone())));
    assert!(!it.pointer_before_reference_node());

    // the reference node leaves with its parent
    a.remove();
    assert_eq!(it.reference_node(), NodeRef::from(x.clone()));
    assert_eq!(it.next_node().unwrap(), Some(c.clone().into()));
    assert_eq!(it.next_node().unwrap(), None);
    assert_eq!(it.previous_node().unwrap(), Some(c.into()));
    assert_eq!(it.previous_node().unwrap(), Some(x.into()));
}

#[test]
fn tree_walker_keeps_detached_current_node() {
    let (doc, body) = html_document();
    let div = element(&doc, "div");
    let span = element(&doc, "span");
    div.append_child(span.clone().into()).unwrap();
    body.append_child(div.clone().into()).unwrap();

    let walker = doc.create_tree_walker(doc.clone().into(), SHOW_ELEMENT, None);
    walker.set_current_node(&span.clone().into()).unwrap();
    div.remove();
    assert_eq!(walker.current_node(), NodeRef::from(span.clone()));
    assert_eq!(walker.parent_node().unwrap(), Some(div.into()));
    // the detached div is outside of the walker's root
    assert_eq!(walker.parent_node().unwrap(), None);

    let foreign = DOMImplementation::new().create_html_document(None);
    assert_eq!(
        walker.set_current_node(&foreign.into()),
        Err(DOMException::WrongDocumentErr)
    );
}

fn label(log: &Rc<RefCell<Vec<&'static str>>>, name: &'static str) -> EventListener {
    let log = log.clone();
    Rc::new(move |_: &mut Event| log.borrow_mut().push(name))
}

#[test]
fn event_propagation() {
    let (doc, body) = html_document();
    let div = element(&doc, "div");
    let span = element(&doc, "span");
    div.append_child(span.clone().into()).unwrap();
    body.append_child(div.clone().into()).unwrap();

    let log = Rc::new(RefCell::new(vec![]));
    doc.add_event_listener("ping", label(&log, "doc capture"), true);
    body.add_event_listener("ping", label(&log, "body bubble"), false);
    span.add_event_listener("ping", label(&log, "span"), false);
    span.add_event_listener("ping", label(&log, "span capture"), true);
    let stopper = log.clone();
    div.add_event_listener(
        "ping",
        Rc::new(move |event: &mut Event| {
            assert_eq!(event.event_phase(), EventPhase::Bubbling);
            stopper.borrow_mut().push("div bubble");
            event.stop_propagation();
        }),
        false,
    );

    let mut event = Event::new("ping", true, false);
    assert!(span.dispatch_event(&mut event).unwrap());
    assert_eq!(
        *log.borrow(),
        vec!["doc capture", "span", "span capture", "div bubble"]
    );
    assert_eq!(event.target(), Some(span.clone().into()));
    assert_eq!(event.current_target(), None);
    assert_eq!(event.event_phase(), EventPhase::None);
    assert!(!event.is_trusted());

    // without bubbling the ancestors only see the capture phase
    log.borrow_mut().clear();
    let mut event = Event::new("ping", false, false);
    span.dispatch_event(&mut event).unwrap();
    assert_eq!(*log.borrow(), vec!["doc capture", "span", "span capture"]);

    // the same event object can be dispatched again
    log.borrow_mut().clear();
    span.dispatch_event(&mut event).unwrap();
    assert_eq!(log.borrow().len(), 3);
}

#[test]
fn event_cancellation() {
    let (doc, body) = html_document();
    let log = Rc::new(RefCell::new(vec![]));
    let first = log.clone();
    body.add_event_listener(
        "go",
        Rc::new(move |event: &mut Event| {
            first.borrow_mut().push("first");
            event.prevent_default();
            event.stop_immediate_propagation();
        }),
        false,
    );
    body.add_event_listener("go", label(&log, "second"), false);

    let mut event = doc.create_event("Event").unwrap();
    assert_eq!(body.dispatch_event(&mut event), Err(DOMException::InvalidStateErr));
    event.init_event("go", true, true);
    assert!(!body.dispatch_event(&mut event).unwrap());
    assert!(event.default_prevented());
    assert_eq!(*log.borrow(), vec!["first"]);

    // an event that is not cancelable cannot be prevented
    let mut event = Event::new("go", true, false);
    assert!(body.dispatch_event(&mut event).unwrap());
    assert!(!event.default_prevented());

    assert_eq!(doc.create_event("MouseEvents").err(), Some(DOMException::NotSupportedErr));
}

#[test]
fn failed_mutations_leave_tree_unchanged() {
    let (doc, body) = html_document();
    let div = element(&doc, "div");
    let text = doc.create_text_node("t");
    body.append(vec![div.clone().into(), text.clone().into()]).unwrap();
    let html = doc.document_element().unwrap();
    let detached = element(&doc, "p");
    let foreign = DOMImplementation::new()
        .create_html_document(None)
        .create_element("p")
        .unwrap();

    let kinds = record_kinds(&doc);
    let before = kids(&body.clone().into());
    let count = doc.connected_count();

    assert_eq!(body.append_child(html.clone().into()), Err(DOMException::HierarchyRequestErr));
    assert_eq!(div.append_child(div.clone().into()), Err(DOMException::HierarchyRequestErr));
    assert_eq!(doc.append_child(element(&doc, "x").into()), Err(DOMException::HierarchyRequestErr));
    assert_eq!(
        doc.append_child(doc.create_text_node("x").into()),
        Err(DOMException::HierarchyRequestErr)
    );
    let doctype = doc.implementation().create_document_type("html", "", "").unwrap();
    assert_eq!(doc.append_child(doctype.into()), Err(DOMException::HierarchyRequestErr));
    assert_eq!(
        body.insert_before(detached.clone().into(), Some(&html.clone().into())),
        Err(DOMException::HierarchyRequestErr)
    );
    assert_eq!(body.remove_child(&detached.clone().into()), Err(DOMException::NotFoundErr));
    assert_eq!(
        body.replace_child(detached.clone().into(), &html.clone().into()),
        Err(DOMException::NotFoundErr)
    );
    assert_eq!(body.append_child(foreign.into()), Err(DOMException::WrongDocumentErr));
    assert_eq!(text.append_child(detached.clone().into()), Err(DOMException::HierarchyRequestErr));
    assert_eq!(text.remove_child(&div.clone().into()), Err(DOMException::NotFoundErr));
    assert!(!text.has_child_nodes());
    text.remove_children();

    // a fragment with a text node may not become a child of the document
    let frag = doc.create_document_fragment();
    frag.append(vec!["x".into()]).unwrap();
    assert_eq!(
        doc.replace_child(frag.clone().into(), &html.clone().into()),
        Err(DOMException::HierarchyRequestErr)
    );
    assert!(frag.has_child_nodes());

    assert_eq!(kids(&body.clone().into()), before);
    assert_eq!(doc.connected_count(), count);
    assert!(detached.parent_node().is_none());
    assert!(kinds.borrow().is_empty());
}

#[test]
fn failed_mixins_leave_arguments_in_place() {
    let (doc, body) = html_document();
    let a = element(&doc, "a");
    let b = element(&doc, "b");
    let c = element(&doc, "c");
    let comment = doc.create_comment("note");
    body.append(vec![
        a.clone().into(),
        b.clone().into(),
        c.clone().into(),
        comment.clone().into(),
    ])
    .unwrap();
    let html = doc.document_element().unwrap();
    let doctype = doc.doctype().unwrap();

    let kinds = record_kinds(&doc);
    let before = kids(&body.clone().into());
    let count = doc.connected_count();

    // a doctype cannot be gathered with other nodes
    assert_eq!(
        b.after(vec![a.clone().into(), doctype.clone().into()]),
        Err(DOMException::HierarchyRequestErr)
    );
    // the document element is an ancestor of body
    assert_eq!(
        body.replace_children(vec![c.clone().into(), html.clone().into()]),
        Err(DOMException::HierarchyRequestErr)
    );
    assert_eq!(
        a.before(vec!["x".into(), NodeOrString::Node(doc.clone().into())]),
        Err(DOMException::HierarchyRequestErr)
    );
    // a document holds a single element and no text
    assert_eq!(
        html.replace_with(vec![a.clone().into(), b.clone().into()]),
        Err(DOMException::HierarchyRequestErr)
    );
    assert_eq!(
        doc.prepend(vec![comment.clone().into(), c.clone().into()]),
        Err(DOMException::HierarchyRequestErr)
    );
    assert_eq!(
        doc.append(vec![comment.clone().into(), "x".into()]),
        Err(DOMException::HierarchyRequestErr)
    );

    assert_eq!(kids(&body.clone().into()), before);
    assert_eq!(doc.connected_count(), count);
    assert!(a.is_connected() && c.is_connected() && comment.is_connected());
    assert_eq!(doctype.parent_node(), Some(doc.clone().into()));
    assert_eq!(html.parent_node(), Some(doc.clone().into()));
    assert!(kinds.borrow().is_empty());

    // the replaced element is among the arguments, so it does not count twice
    html.replace_with(vec![comment.clone().into(), html.clone().into()])
        .unwrap();
    let names = kids(&doc.clone().into())
        .iter()
        .map(|n| n.node_name().to_string())
        .collect::<Vec<_>>();
    assert_eq!(names, ["html", "#comment", "HTML"]);
    assert_eq!(doc.connected_count(), count);
}

#[test]
fn unreachable_nodes_are_reclaimed() {
    let (doc, body) = html_document();
    let imp = doc.implementation();
    for step in 0..10_000 {
        body.remove_children();
        body.append_child(doc.create_text_node(&step.to_string()).into())
            .unwrap();
        body.set_attribute("data-step", &step.to_string()).unwrap();
        body.remove_attribute("data-step");
    }
    assert!(imp.node_count() < 1000, "{} nodes allocated", imp.node_count());

    imp.collect_garbage();
    // doc, doctype, html, head, body and the last text
    assert_eq!(imp.node_count(), 6);
    assert_eq!(body.text_content().as_deref(), Some("9999"));

    // a detached subtree lives as long as any of its nodes is held
    let outer = element(&doc, "outer");
    let inner = element(&doc, "inner");
    outer.append_child(inner.clone().into()).unwrap();
    drop(outer);
    imp.collect_garbage();
    assert_eq!(imp.node_count(), 8);
    let outer = inner.parent_node().unwrap();
    assert_eq!(outer.node_name().as_ref(), "OUTER");
    drop((outer, inner));
    assert_eq!(imp.collect_garbage(), 2);
}

#[test]
fn weak_references_do_not_keep_nodes() {
    let (doc, body) = html_document();
    let imp = doc.implementation();
    let kept = element(&doc, "kept");
    body.append_child(kept.clone().into()).unwrap();
    let lost = element(&doc, "lost");
    let weak_kept = kept.downgrade();
    let weak_lost = lost.downgrade();
    drop((kept, lost));

    assert_eq!(imp.collect_garbage(), 1);
    let kept = weak_kept.upgrade().unwrap();
    assert_eq!(kept.node_name().as_ref(), "KEPT");
    assert!(weak_lost.upgrade().is_none());

    // the slot of the lost node is reused without reviving the old reference
    let _fresh = element(&doc, "fresh");
    assert!(weak_lost.upgrade().is_none());

    // a listener capturing only weak references lets the arena go
    let token = Rc::new(());
    let held = token.clone();
    let target = body.downgrade();
    let listener: EventListener = Rc::new(move |_: &mut Event| {
        let _ = (&held, target.upgrade());
    });
    body.add_event_listener("ping", listener, false);
    assert_eq!(Rc::strong_count(&token), 2);
    drop((doc, body, imp, kept, _fresh));
    assert_eq!(Rc::strong_count(&token), 1);
}

#[test]
fn mixins_handle_their_own_arguments() {
    let (doc, body) = html_document();
    let a = element(&doc, "a");
    let b = element(&doc, "b");
    let c = element(&doc, "c");
    body.append(vec![a.clone().into(), b.clone().into(), c.clone().into()])
        .unwrap();

    // b is among the nodes placed after itself
    b.after(vec![NodeOrString::from(b.clone()), "x".into()]).unwrap();
    let names = |node: &ElementRef| {
        kids(&node.clone().into())
            .iter()
            .map(|n| n.node_name().to_string())
            .collect::<Vec<_>>()
    };
    assert_eq!(names(&body), ["A", "B", "#text", "C"]);

    c.before(vec![c.clone().into(), a.clone().into()]).unwrap();
    assert_eq!(names(&body), ["B", "#text", "C", "A"]);

    a.replace_with(vec!["y".into(), a.clone().into()]).unwrap();
    assert_eq!(names(&body), ["B", "#text", "C", "#text", "A"]);
    assert_eq!(a.previous_element_sibling(), Some(c.clone()));
    assert_eq!(b.next_element_sibling(), Some(c.clone()));

    body.prepend(vec!["z".into()]).unwrap();
    assert_eq!(body.first_element_child(), Some(b.clone()));
    assert_eq!(body.last_element_child(), Some(a.clone()));
    assert_eq!(body.child_element_count(), 3);

    body.replace_children(vec![c.clone().into()]).unwrap();
    assert_eq!(names(&body), ["C"]);
    assert!(!a.is_connected());
    c.remove();
    assert!(!body.has_child_nodes());
}

#[test]
fn indexed_and_linked_children_agree() {
    let (doc, body) = html_document();
    let linked: NodeRef = element(&doc, "div").into();
    let indexed: NodeRef = element(&doc, "div").into();
    body.append(vec![linked.clone().into(), indexed.clone().into()])
        .unwrap();
    let list = indexed.child_nodes();

    let mut rng = StdRng::seed_from_u64(7);
    for step in 0..300 {
        let len = kids(&linked).len();
        let pick = |rng: &mut StdRng| (len > 0).then(|| rng.random_range(0..len));
        match rng.random_range(0..4) {
            0 => {
                let pos = pick(&mut rng);
                for parent in [&linked, &indexed] {
                    let node = doc.create_text_node(&format!("{step}"));
                    let before = pos.map(|i| kids(parent)[i].clone());
                    parent.insert_before(node.into(), before.as_ref()).unwrap();
                }
            }
            1 => {
                if let Some(i) = pick(&mut rng) {
                    for parent in [&linked, &indexed] {
                        let child = kids(parent)[i].clone();
                        parent.remove_child(&child).unwrap();
                    }
                }
            }
            2 => {
                if let Some(i) = pick(&mut rng) {
                    for parent in [&linked, &indexed] {
                        let node = doc.create_comment(&format!("{step}"));
                        let child = kids(parent)[i].clone();
                        parent.replace_child(node.into(), &child).unwrap();
                    }
                }
            }
            _ => {
                if let (Some(from), Some(to)) = (pick(&mut rng), pick(&mut rng)) {
                    for parent in [&linked, &indexed] {
                        let children = kids(parent);
                        parent
                            .insert_before(children[from].clone(), Some(&children[to]))
                            .unwrap();
                    }
                }
            }
        }

        assert!(linked.is_equal_node(&indexed), "diverged at step {step}");
        let children = kids(&indexed);
        assert_eq!(list.length(), children.len());
        assert_eq!(list.to_vec(), children);
        assert_eq!(indexed.last_child(), children.last().cloned());
    }
}

#[test]
fn randomized_mutations_keep_bookkeeping() {
    let (doc, body) = html_document();
    let body_node: NodeRef = body.clone().into();
    let mut rng = StdRng::seed_from_u64(42);
    let ids = ["p", "q"];

    for step in 0..400 {
        let mut elements = vec![body.clone()];
        elements.extend(body.get_elements_by_tag_name("*").to_vec());
        let parent = elements[rng.random_range(0..elements.len())].clone();
        match rng.random_range(0..5) {
            0 | 1 => {
                let node: NodeRef = if rng.random_bool(0.5) {
                    element(&doc, "i").into()
                } else {
                    doc.create_text_node("t").into()
                };
                parent.append_child(node).unwrap();
            }
            2 => {
                let node = elements[rng.random_range(0..elements.len())].clone();
                // moving a node below itself is rejected
                let res = parent.insert_before(node.clone().into(), None);
                assert_eq!(res.is_err(), node.contains(&parent.clone().into()));
            }
            3 => {
                if let Some(child) = parent.first_child() {
                    parent.remove_child(&child).unwrap();
                }
            }
            _ => {
                let id = ids[rng.random_range(0..ids.len())];
                parent.set_attribute("id", id).unwrap();
            }
        }

        let all = std::iter::once(body_node.clone())
            .chain(body.get_elements_by_tag_name("*").to_vec().into_iter().map(NodeRef::from))
            .collect::<Vec<_>>();
        for (i, node) in all.iter().enumerate() {
            let number = node.node_number().unwrap();
            assert_eq!(doc.node_by_number(number).as_ref(), Some(node));
            if let Some(next) = all.get(i + 1) {
                assert!(node.compare_document_position(next).is_following(), "step {step}");
            }
        }
        for id in ids {
            let first = all
                .iter()
                .filter_map(NodeRef::as_element)
                .find(|e| e.id() == id);
            assert_eq!(doc.get_element_by_id(id), first, "step {step}");
        }
    }
}

#[test]
fn id_registry_prefers_tree_order() {
    let (doc, body) = html_document();
    let first = element(&doc, "div");
    let second = element(&doc, "div");
    second.set_id("dup");
    body.append_child(second.clone().into()).unwrap();
    assert_eq!(doc.get_element_by_id("dup"), Some(second.clone()));

    first.set_id("dup");
    assert_eq!(doc.get_element_by_id("dup"), Some(second.clone()));
    body.prepend(vec![first.clone().into()]).unwrap();
    assert_eq!(doc.get_element_by_id("dup"), Some(first.clone()));

    first.set_id("other");
    assert_eq!(doc.get_element_by_id("dup"), Some(second.clone()));
    assert_eq!(doc.get_element_by_id("other"), Some(first.clone()));

    second.remove();
    assert_eq!(doc.get_element_by_id("dup"), None);
    first.remove_attribute("id");
    assert_eq!(doc.get_element_by_id("other"), None);
    assert_eq!(doc.get_element_by_id(""), None);

    // a prefixed attribute named id is not an id
    let prefixed = element(&doc, "span");
    prefixed.set_attribute_ns_raw(None, "p:id", "pre");
    body.append_child(prefixed.clone().into()).unwrap();
    assert_eq!(doc.get_element_by_id("pre"), None);
    prefixed.set_attribute_ns_raw(None, "p:id", "changed");
    assert_eq!(doc.get_element_by_id("pre"), None);
    assert_eq!(doc.get_element_by_id("changed"), None);
    prefixed.remove();
    assert_eq!(doc.get_element_by_id("changed"), None);
}

#[test]
fn live_collections() {
    let (doc, body) = html_document();
    let children = body.children();
    let paragraphs = doc.get_elements_by_tag_name("p");
    let warnings = doc.get_elements_by_class_name("warn  big");
    assert_eq!(children.length(), 0);
    assert_eq!(paragraphs.length(), 0);

    let p = element(&doc, "p");
    let div = element(&doc, "div");
    body.append(vec![p.clone().into(), "text".into(), div.clone().into()])
        .unwrap();
    let nested = element(&doc, "p");
    div.append_child(nested.clone().into()).unwrap();
    assert_eq!(children.to_vec(), vec![p.clone(), div.clone()]);
    assert_eq!(paragraphs.to_vec(), vec![p.clone(), nested.clone()]);
    assert_eq!(warnings.length(), 0);

    nested.set_class_name("big warn");
    p.set_class_name("warn");
    assert_eq!(warnings.to_vec(), vec![nested.clone()]);
    p.class_list().add(&["big"]).unwrap();
    assert_eq!(warnings.to_vec(), vec![p.clone(), nested.clone()]);

    div.set_attribute("name", "n").unwrap();
    assert_eq!(children.named_item("n"), Some(div.clone()));
    assert_eq!(doc.get_elements_by_name("n").to_vec(), vec![div.clone()]);

    nested.remove();
    assert_eq!(paragraphs.length(), 1);
    assert_eq!(warnings.item(0), Some(p.clone()));
    assert_eq!(warnings.item(1), None);

    // a snapshot does not follow the tree
    let snapshot = body.query_selector_all(&TagNameEngine, "*").unwrap();
    body.remove_children();
    assert_eq!(snapshot.length(), 2);
    assert_eq!(children.length(), 0);
}

#[test]
fn attributes() {
    let (doc, body) = html_document();
    body.set_attribute("ID", "main").unwrap();
    assert_eq!(body.get_attribute("id").as_deref(), Some("main"));
    assert_eq!(body.id(), "main");
    body.set_attribute_ns(Some("urn:x"), "x:ID", "other").unwrap();
    assert_eq!(body.get_attribute_ns(Some("urn:x"), "ID").as_deref(), Some("other"));
    assert_eq!(body.get_attribute_ns(None, "id").as_deref(), Some("main"));
    assert_eq!(body.get_attribute_names(), vec![Rc::<str>::from("id"), Rc::from("x:ID")]);

    let map = body.attributes();
    assert_eq!(map.length(), 2);
    assert_eq!(map.item(1).map(|a| a.value()).as_deref(), Some("other"));
    // qualified names are lowercased for HTML elements
    assert_eq!(map.get_named_item("x:ID"), None);
    assert_eq!(
        map.get_named_item_ns(Some("urn:x"), "ID").map(|a| a.value()).as_deref(),
        Some("other")
    );
    assert_eq!(map.remove_named_item("missing"), Err(DOMException::NotFoundErr));

    assert_eq!(body.set_attribute("1a", "v"), Err(DOMException::InvalidCharacterErr));
    assert_eq!(
        body.set_attribute_ns(None, "p:a", "v"),
        Err(DOMException::NamespaceErr)
    );

    // an attribute node belongs to one element at a time
    let attr = doc.create_attribute("lang").unwrap();
    attr.set_value("en");
    assert_eq!(body.set_attribute_node(attr.clone()).unwrap(), None);
    assert_eq!(attr.owner_element(), Some(body.clone()));
    let div = element(&doc, "div");
    assert_eq!(
        div.set_attribute_node(attr.clone()),
        Err(DOMException::InuseAttributeErr)
    );
    let replacement = doc.create_attribute("lang").unwrap();
    assert_eq!(body.set_attribute_node(replacement).unwrap(), Some(attr.clone()));
    assert_eq!(attr.owner_element(), None);
    assert_eq!(div.set_attribute_node(attr.clone()).unwrap(), None);
    assert_eq!(div.get_attribute("lang").as_deref(), Some("en"));

    assert!(body.toggle_attribute("hidden", None).unwrap());
    assert!(!body.toggle_attribute("hidden", None).unwrap());
    assert!(!body.has_attribute("hidden"));

    // attribute nodes never take part in the tree
    let detached = body.attributes().item(0).unwrap();
    assert_eq!(detached.parent_node(), None);
    assert_eq!(
        body.append_child(detached.into()),
        Err(DOMException::HierarchyRequestErr)
    );
}

#[test]
fn character_data_offsets() {
    let (doc, body) = html_document();
    let text = doc.create_text_node("hello");
    body.append_child(text.clone().into()).unwrap();

    assert_eq!(text.substring_data(1, 3).unwrap(), "ell");
    assert_eq!(text.substring_data(3, 100).unwrap(), "lo");
    assert_eq!(text.substring_data(6, 1), Err(DOMException::IndexSizeErr));
    text.insert_data(5, ", world").unwrap();
    text.delete_data(0, 1).unwrap();
    text.replace_data(0, 4, "HELLO").unwrap();
    assert_eq!(text.data(), "HELLO, world");
    assert_eq!(text.insert_data(13, "!"), Err(DOMException::IndexSizeErr));

    let tail = text.split_text(5).unwrap();
    assert_eq!(text.data(), "HELLO");
    assert_eq!(tail.data(), ", world");
    assert_eq!(text.next_sibling(), Some(tail.clone().into()));
    assert_eq!(tail.whole_text(), "HELLO, world");
    assert!(tail.is_connected());

    body.normalize();
    assert_eq!(text.data(), "HELLO, world");
    assert!(!tail.is_connected());
    assert_eq!(body.child_nodes().length(), 1);

    let snowman = doc.create_comment("a\u{2603}b");
    assert_eq!(snowman.length(), 5);
    assert_eq!(snowman.substring_data(2, 1), Err(DOMException::IndexSizeErr));
    assert_eq!(snowman.substring_data(1, 3).unwrap(), "\u{2603}");
}

#[test]
fn namespace_lookup() {
    let doc = DOMImplementation::new()
        .create_document(Some("urn:root"), "r:root", None)
        .unwrap();
    let root = doc.document_element().unwrap();
    let child = doc.create_element_ns(Some(HTML_NAMESPACE), "child").unwrap();
    root.append_child(child.clone().into()).unwrap();
    child
        .set_attribute_ns(Some("http://www.w3.org/2000/xmlns/"), "xmlns:q", "urn:q")
        .unwrap();

    assert_eq!(child.lookup_namespace_uri(Some("r")).as_deref(), Some("urn:root"));
    assert_eq!(child.lookup_namespace_uri(Some("q")).as_deref(), Some("urn:q"));
    assert_eq!(root.lookup_namespace_uri(Some("q")), None);
    assert_eq!(child.lookup_namespace_uri(None).as_deref(), Some(HTML_NAMESPACE));
    assert!(child.is_default_namespace(Some(HTML_NAMESPACE)));
    assert!(!root.is_default_namespace(Some("urn:root")));
    assert_eq!(child.lookup_prefix(Some("urn:root")).as_deref(), Some("r"));
    assert_eq!(
        doc.lookup_namespace_uri(Some("r")).as_deref(),
        Some("urn:root")
    );
    assert_eq!(
        doc.create_element_ns(None, "x:y"),
        Err(DOMException::NamespaceErr)
    );
}

#[test]
fn adoption_between_documents() {
    let imp = DOMImplementation::new();
    let html = imp.create_html_document(None);
    let xml = imp.create_document(None, "root", None).unwrap();
    let div = html.create_element("div").unwrap();
    div.set_id("moved");
    html.body().unwrap().append_child(div.clone().into()).unwrap();
    assert_eq!(html.get_element_by_id("moved"), Some(div.clone()));

    let root = xml.document_element().unwrap();
    root.append_child(div.clone().into()).unwrap();
    assert_eq!(div.owner_document(), Some(xml.clone()));
    assert_eq!(html.get_element_by_id("moved"), None);
    assert_eq!(xml.get_element_by_id("moved"), Some(div.clone()));

    let copy = html.import_node(&div.clone().into(), true).unwrap();
    assert_eq!(copy.owner_document(), Some(html.clone()));
    assert!(copy.is_equal_node(&div.clone().into()));
    assert!(!copy.is_connected());

    assert_eq!(
        html.adopt_node(xml.clone().into()),
        Err(DOMException::NotSupportedErr)
    );
    let other = DOMImplementation::new().create_html_document(None);
    assert_eq!(
        other.adopt_node(div.into()),
        Err(DOMException::WrongDocumentErr)
    );
}
