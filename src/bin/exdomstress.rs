//! Randomized mutation driver for the node tree.
//!
//! Builds a document, applies seeded random edits and checks the structural
//! invariants of the tree after every step. A failing seed can be replayed
//! with `--seed`.

use std::collections::HashSet;

use anyhow::{Context, Result, ensure};
use clap::Parser;
use exdom::{
    dom::{
        DOMException,
        document::DocumentRef,
        dom_implementation::DOMImplementation,
        element::ElementRef,
        node::{Node, NodeRef},
    },
    globals,
};
use rand::{Rng, SeedableRng, rngs::StdRng, seq::IndexedRandom};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const ELEMENT_NAMES: &[&str] = &["div", "span", "p", "a", "b"];
const IDS: &[&str] = &["x", "y", "z"];

#[derive(Parser)]
#[command(version, name = "exdomstress")]
struct CmdArgs {
    /// seed of the random generator
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// number of random edits
    #[arg(long, default_value_t = 1000)]
    steps: usize,
    /// build an HTML document instead of an XML document
    #[arg(long)]
    html: bool,
    /// log every edit
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Default)]
struct Stats {
    inserted: usize,
    moved: usize,
    removed: usize,
    replaced: usize,
    attributes: usize,
    fragments: usize,
    touched: usize,
    rejected: usize,
    freed: usize,
}

struct Stress {
    doc: DocumentRef,
    root: ElementRef,
    rng: StdRng,
    stats: Stats,
}

impl Stress {
    fn new(args: &CmdArgs) -> Result<Self> {
        let imp = DOMImplementation::new();
        let (doc, root) = if args.html {
            let doc = imp.create_html_document(Some("stress"));
            let body = doc.body().context("HTML document without body")?;
            (doc, body)
        } else {
            let doc = imp
                .create_document(None, "root", None)
                .context("failed to create XML document")?;
            let root = doc
                .document_element()
                .context("XML document without document element")?;
            (doc, root)
        };
        Ok(Self {
            doc,
            root,
            rng: StdRng::seed_from_u64(args.seed),
            stats: Stats::default(),
        })
    }

    /// Every node connected to the document, in tree order.
    fn connected(&self) -> Vec<NodeRef> {
        let mut res = vec![];
        let mut stack = vec![NodeRef::from(self.doc.clone())];
        while let Some(node) = stack.pop() {
            let mut kids =
                std::iter::successors(node.first_child(), |n| n.next_sibling()).collect::<Vec<_>>();
            kids.reverse();
            res.push(node);
            stack.extend(kids);
        }
        res
    }

    /// The descendants of the stress root.
    fn descendants(&self) -> Vec<NodeRef> {
        let root: NodeRef = self.root.clone().into();
        self.connected()
            .into_iter()
            .filter(|n| *n != root && root.contains(n))
            .collect()
    }

    fn random_element(&mut self) -> ElementRef {
        let mut elements = self
            .descendants()
            .into_iter()
            .filter_map(|n| n.as_element())
            .collect::<Vec<_>>();
        elements.push(self.root.clone());
        elements
            .choose(&mut self.rng)
            .cloned()
            .unwrap_or_else(|| self.root.clone())
    }

    fn random_descendant(&mut self) -> Option<NodeRef> {
        self.descendants().choose(&mut self.rng).cloned()
    }

    /// A random child of `parent`, or `None` to append.
    fn random_position(&mut self, parent: &ElementRef) -> Option<NodeRef> {
        let kids = std::iter::successors(parent.first_child(), |n| n.next_sibling()).collect::<Vec<_>>();
        if kids.is_empty() || self.rng.random_bool(0.3) {
            return None;
        }
        kids.choose(&mut self.rng).cloned()
    }

    fn fresh_node(&mut self) -> Result<NodeRef> {
        let node = match self.rng.random_range(0..4) {
            0 => self.doc.create_text_node("text").into(),
            1 => self.doc.create_comment("comment").into(),
            _ => {
                let name = ELEMENT_NAMES
                    .choose(&mut self.rng)
                    .context("no element names")?;
                self.doc.create_element(name)?.into()
            }
        };
        Ok(node)
    }

    /// Count an expected DOM error as a rejected edit.
    fn settle(&mut self, res: Result<(), DOMException>) {
        if let Err(err) = res {
            debug!(%err, "edit rejected");
            self.stats.rejected += 1;
        }
    }

    fn step(&mut self, step: usize) -> Result<()> {
        let op = self.rng.random_range(0..7);
        debug!(step, op, "edit");
        match op {
            0 => {
                let parent = self.random_element();
                let node = self.fresh_node()?;
                let before = self.random_position(&parent);
                let res = parent.insert_before(node, before.as_ref()).map(|_| ());
                self.stats.inserted += res.is_ok() as usize;
                self.settle(res);
            }
            1 => {
                let Some(node) = self.random_descendant() else {
                    return Ok(());
                };
                let parent = self.random_element();
                let before = self.random_position(&parent);
                let res = parent.insert_before(node, before.as_ref()).map(|_| ());
                self.stats.moved += res.is_ok() as usize;
                self.settle(res);
            }
            2 => {
                let Some(node) = self.random_descendant() else {
                    return Ok(());
                };
                let parent = node.parent_node().context("descendant without parent")?;
                parent.remove_child(&node)?;
                self.stats.removed += 1;
            }
            3 => {
                let parent = self.random_element();
                let Some(old) = self.random_position(&parent) else {
                    return Ok(());
                };
                let new = if self.rng.random_bool(0.5) {
                    self.fresh_node()?
                } else {
                    match self.random_descendant() {
                        Some(node) => node,
                        None => self.fresh_node()?,
                    }
                };
                let res = parent.replace_child(new, &old).map(|_| ());
                self.stats.replaced += res.is_ok() as usize;
                self.settle(res);
            }
            4 => {
                let elem = self.random_element();
                if self.rng.random_bool(0.3) {
                    elem.remove_attribute("id");
                } else {
                    let id = IDS.choose(&mut self.rng).context("no ids")?;
                    elem.set_attribute("id", id)?;
                }
                self.stats.attributes += 1;
            }
            5 => {
                let frag = self.doc.create_document_fragment();
                for _ in 0..self.rng.random_range(1..4) {
                    frag.append_child(self.fresh_node()?)?;
                }
                let parent = self.random_element();
                let before = self.random_position(&parent);
                parent.insert_before(frag.clone().into(), before.as_ref())?;
                ensure!(!frag.has_child_nodes(), "fragment not emptied by insertion");
                self.stats.fragments += 1;
            }
            _ => {
                let elem = self.random_element();
                if self.rng.random_bool(0.5) {
                    // switches the element to indexed children
                    elem.child_nodes();
                } else {
                    elem.normalize();
                }
                self.stats.touched += 1;
            }
        }
        Ok(())
    }

    fn verify(&mut self) -> Result<()> {
        // nothing but the handles of this driver keeps the tree alive
        let imp = self.doc.implementation();
        self.stats.freed += imp.collect_garbage();

        let nodes = self.connected();
        ensure!(
            imp.node_count() >= nodes.len(),
            "{} nodes allocated but {} connected",
            imp.node_count(),
            nodes.len()
        );
        ensure!(
            nodes.len() == self.doc.connected_count(),
            "{} nodes reachable but {} numbered",
            nodes.len(),
            self.doc.connected_count()
        );

        let mut numbers = HashSet::new();
        for node in &nodes {
            let number = node
                .node_number()
                .with_context(|| format!("{node:?} is connected but not numbered"))?;
            ensure!(numbers.insert(number), "duplicate node number {number}");
            ensure!(
                self.doc.node_by_number(number).as_ref() == Some(node),
                "node number {number} does not lead back to {node:?}"
            );

            if let Some(next) = node.next_sibling() {
                ensure!(
                    next.previous_sibling().as_ref() == Some(node),
                    "broken sibling link after {node:?}"
                );
            }
            let kids = std::iter::successors(node.first_child(), |n| n.next_sibling()).collect::<Vec<_>>();
            ensure!(
                kids.last() == node.last_child().as_ref(),
                "last child of {node:?} disagrees with its children"
            );
            if let Some(first) = kids.first() {
                ensure!(first.previous_sibling().is_none(), "first child of {node:?} has a previous sibling");
            }
            for kid in &kids {
                ensure!(kid.parent_node().as_ref() == Some(node), "{kid:?} has a wrong parent");
            }
        }

        for &id in IDS {
            let expected = nodes
                .iter()
                .filter_map(NodeRef::as_element)
                .find(|e| e.get_attribute_ns(None, "id").as_deref() == Some(id));
            ensure!(
                self.doc.get_element_by_id(id) == expected,
                "id registry disagrees on {id:?}"
            );
        }

        let root: NodeRef = self.root.clone().into();
        let copy = root.clone_node(true);
        ensure!(copy.is_equal_node(&root), "deep clone differs from its source");
        Ok(())
    }
}

fn run(args: &CmdArgs) -> Result<Stats> {
    let mut stress = Stress::new(args)?;
    for step in 0..args.steps {
        stress
            .step(step)
            .with_context(|| format!("edit {step} failed"))?;
        stress
            .verify()
            .with_context(|| format!("invariant broken after edit {step}"))?;
    }
    info!(nodes = stress.doc.connected_count(), "done");
    Ok(stress.stats)
}

fn main() -> Result<()> {
    let args = CmdArgs::parse();
    let level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();
    globals::set_list_consistency_check(true);

    let stats = run(&args).with_context(|| format!("stress run with seed {} failed", args.seed))?;
    println!("exdomstress {} (seed {})", globals::get_version(), args.seed);
    println!("{stats:#?}");
    Ok(())
}
