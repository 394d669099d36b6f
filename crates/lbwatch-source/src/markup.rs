//! Structural extraction from a markup node tree.
//!
//! The paste path can carry a DOM dump of the venue's leaderboard page
//! instead of an API envelope. Entries are located by structural probes
//! (class markers on the container and its descendants), and the three
//! stat cells are read positionally: size, entry price, mark price, in
//! that order. The markers live in `MarkupProfile` so the volatile part
//! can be swapped without touching normalization, diffing, or scheduling.

use serde::Deserialize;

/// A generic markup node, deserializable from a pasted DOM dump.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkupNode {
    /// Element tag name.
    pub tag: String,
    /// Class list.
    #[serde(default)]
    pub classes: Vec<String>,
    /// Direct text content, if any.
    #[serde(default)]
    pub text: Option<String>,
    /// Child nodes.
    #[serde(default)]
    pub children: Vec<MarkupNode>,
}

impl MarkupNode {
    fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// First descendant (depth-first, self included) carrying a class.
    fn find(&self, class: &str) -> Option<&MarkupNode> {
        if self.has_class(class) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(class))
    }

    /// All descendants (depth-first, self included) carrying a class.
    fn find_all<'a>(&'a self, class: &str, out: &mut Vec<&'a MarkupNode>) {
        if self.has_class(class) {
            out.push(self);
            // Entry containers do not nest; no need to descend further.
            return;
        }
        for child in &self.children {
            child.find_all(class, out);
        }
    }

    /// Concatenated text of this node and its descendants.
    fn deep_text(&self) -> String {
        let mut buf = String::new();
        self.collect_text(&mut buf);
        buf
    }

    fn collect_text(&self, buf: &mut String) {
        if let Some(text) = &self.text {
            buf.push_str(text);
        }
        for child in &self.children {
            child.collect_text(buf);
        }
    }
}

/// Class markers identifying position entries in the venue's markup.
///
/// These track the venue's current page layout and break when it changes;
/// they are configuration, not correctness.
#[derive(Debug, Clone)]
pub struct MarkupProfile {
    /// Container class for one position entry.
    pub entry_class: String,
    /// Symbol cell.
    pub symbol_class: String,
    /// PnL cell, e.g. "+1,234.56 ( +0.12% )".
    pub pnl_class: String,
    /// Stats block whose children are, positionally: size, entry price,
    /// mark price.
    pub stats_class: String,
    /// Leverage cell, e.g. "20x".
    pub leverage_class: String,
    /// Color class present on the PnL cell when the position is in profit.
    /// The markup has no signed size field; this marker resolves the side.
    pub profit_class: String,
}

impl Default for MarkupProfile {
    fn default() -> Self {
        Self {
            entry_class: "css-1g2wq66".to_string(),
            symbol_class: "css-vurnku".to_string(),
            pnl_class: "css-1vni3t".to_string(),
            stats_class: "css-1wp6m5m".to_string(),
            leverage_class: "css-10c0myg".to_string(),
            profit_class: "css-7o2g7r".to_string(),
        }
    }
}

/// Raw field strings for one position entry, as read from the markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMarkupEntry {
    pub symbol: String,
    pub pnl_text: String,
    /// Positional stat cells: size, entry price, mark price.
    pub stat_cells: Vec<String>,
    pub leverage_text: String,
    /// Whether the PnL cell carries the profit color marker.
    pub profit_marker: bool,
}

/// Extract raw entries from a node tree. Pure; no parsing of numbers
/// happens here.
pub fn extract_entries(root: &MarkupNode, profile: &MarkupProfile) -> Vec<RawMarkupEntry> {
    let mut containers = Vec::new();
    root.find_all(&profile.entry_class, &mut containers);

    containers
        .into_iter()
        .filter_map(|container| extract_one(container, profile))
        .collect()
}

fn extract_one(container: &MarkupNode, profile: &MarkupProfile) -> Option<RawMarkupEntry> {
    let symbol = container
        .find(&profile.symbol_class)
        .map(|node| node.deep_text())?;

    let pnl_node = container.find(&profile.pnl_class);
    let pnl_text = pnl_node.map(|node| node.deep_text()).unwrap_or_default();
    let profit_marker = pnl_node
        .map(|node| node.has_class(&profile.profit_class))
        .unwrap_or(false);

    let stat_cells = container
        .find(&profile.stats_class)
        .map(|stats| stats.children.iter().map(MarkupNode::deep_text).collect())
        .unwrap_or_default();

    let leverage_text = container
        .find(&profile.leverage_class)
        .map(|node| node.deep_text())
        .unwrap_or_default();

    Some(RawMarkupEntry {
        symbol,
        pnl_text,
        stat_cells,
        leverage_text,
        profit_marker,
    })
}
