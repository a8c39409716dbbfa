//! Owned element tree for the live page and fetched documents.
//!
//! The tree is deliberately small: elements with ordered attributes and
//! children, and text nodes. Comments, doctypes and processing instructions
//! are dropped on parse. Lookups always walk from a root, so callers re-query
//! after every suspension point instead of holding references across awaits.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl Node {
    #[must_use]
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    #[must_use]
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder form of [`Element::set_attr`].
    #[must_use]
    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.set_attr(name, value);
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: &str) -> Self {
        self.children.push(Node::Text(text.to_owned()));
        self
    }

    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    #[must_use]
    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|(key, _)| key == name)
    }

    /// Sets `name` to `value`, returning `true` when the attribute changed.
    pub fn set_attr(&mut self, name: &str, value: &str) -> bool {
        if let Some((_, existing)) = self.attrs.iter_mut().find(|(key, _)| key == name) {
            if existing == value {
                return false;
            }
            value.clone_into(existing);
            return true;
        }
        self.attrs.push((name.to_owned(), value.to_owned()));
        true
    }

    /// Removes `name`, returning `true` when it was present.
    pub fn remove_attr(&mut self, name: &str) -> bool {
        let before = self.attrs.len();
        self.attrs.retain(|(key, _)| key != name);
        before != self.attrs.len()
    }

    /// Sets or removes a boolean attribute such as `checked` or `disabled`.
    pub fn toggle_attr(&mut self, name: &str, on: bool) -> bool {
        if on {
            if self.has_attr(name) {
                false
            } else {
                self.set_attr(name, "")
            }
        } else {
            self.remove_attr(name)
        }
    }

    #[must_use]
    pub fn attrs(&self) -> &[(String, String)] {
        &self.attrs
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Depth-first, pre-order search including `self`.
    #[must_use]
    pub fn find<P>(&self, pred: &P) -> Option<&Element>
    where
        P: Fn(&Element) -> bool,
    {
        if pred(self) {
            return Some(self);
        }
        self.child_elements().find_map(|child| child.find(pred))
    }

    pub fn find_mut<P>(&mut self, pred: &P) -> Option<&mut Element>
    where
        P: Fn(&Element) -> bool,
    {
        if pred(self) {
            return Some(self);
        }
        for child in &mut self.children {
            if let Node::Element(el) = child {
                if let Some(found) = el.find_mut(pred) {
                    return Some(found);
                }
            }
        }
        None
    }

    #[must_use]
    pub fn find_all<P>(&self, pred: &P) -> Vec<&Element>
    where
        P: Fn(&Element) -> bool,
    {
        let mut out = Vec::new();
        self.collect_into(pred, &mut out);
        out
    }

    fn collect_into<'a, P>(&'a self, pred: &P, out: &mut Vec<&'a Element>)
    where
        P: Fn(&Element) -> bool,
    {
        if pred(self) {
            out.push(self);
        }
        for child in self.child_elements() {
            child.collect_into(pred, out);
        }
    }

    /// Applies `f` to every element in the subtree, pre-order.
    pub fn for_each_mut<F>(&mut self, f: &mut F)
    where
        F: FnMut(&mut Element),
    {
        f(self);
        for child in &mut self.children {
            if let Node::Element(el) = child {
                el.for_each_mut(f);
            }
        }
    }

    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        self.find(&|el: &Element| el.id() == Some(id))
    }

    pub fn find_by_id_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.find_mut(&|el: &Element| el.id() == Some(id))
    }

    /// First element carrying attribute `name`.
    #[must_use]
    pub fn find_by_attr(&self, name: &str) -> Option<&Element> {
        self.find(&|el: &Element| el.has_attr(name))
    }

    /// Concatenated text of the subtree.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.push_text(&mut out);
        out
    }

    fn push_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(text) => out.push_str(text),
                Node::Element(el) => el.push_text(out),
            }
        }
    }

    /// Chain of ancestors of the element with id `id`, outermost first,
    /// excluding the element itself. `None` when no such element exists.
    #[must_use]
    pub fn ancestors_of(&self, id: &str) -> Option<Vec<&Element>> {
        if self.id() == Some(id) {
            return Some(Vec::new());
        }
        for child in self.child_elements() {
            if let Some(mut chain) = child.ancestors_of(id) {
                chain.insert(0, self);
                return Some(chain);
            }
        }
        None
    }

    /// Serializes the subtree back to HTML. Used for diagnostics and dumps.
    #[must_use]
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        for (name, value) in &self.attrs {
            out.push(' ');
            out.push_str(name);
            if !value.is_empty() {
                out.push_str("=\"");
                out.push_str(&escape(value, true));
                out.push('"');
            }
        }
        out.push('>');
        if is_void(&self.tag) {
            return;
        }
        let raw_text = matches!(self.tag.as_str(), "script" | "style");
        for child in &self.children {
            match child {
                Node::Text(text) if raw_text => out.push_str(text),
                Node::Text(text) => out.push_str(&escape(text, false)),
                Node::Element(el) => el.write_html(out),
            }
        }
        out.push_str("</");
        out.push_str(&self.tag);
        out.push('>');
    }
}

fn is_void(tag: &str) -> bool {
    matches!(
        tag,
        "area" | "base" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link" | "meta"
            | "source" | "track" | "wbr"
    )
}

fn escape(raw: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
#[path = "dom_test.rs"]
mod tests;
