//! Storage-format rewriting.
//!
//! Proprietary constructs (`ac:image`, `ac:link`, the code macro) are turned into
//! plain HTML, and fragments the Markdown converter would flatten (lists inside
//! tables, colored spans) are swapped for placeholders and kept aside as literal
//! HTML. Each rule is one pass over the parsed tree; replacements are spliced
//! into the tree and the result is serialised by `scraper`.
use std::borrow::Cow;
use std::path::Path;

use ego_tree::{NodeId, Tree};
use engine_logging::engine_warn;
use scraper::node::Node;
use scraper::{ElementRef, Html};

use crate::links::{attachment_href, LinkResolver};

/// Marker left in the converted text for every protected fragment.
///
/// Letters only, so the Markdown converter has nothing to escape. Documents that
/// already contain it get a longer variant, see [`ProtectedItems::token`].
pub const SKIP_PLACEHOLDER: &str = "PAGETREESKIPPEDFRAGMENT";

/// Style given to preserved colored spans.
pub const HIGHLIGHT_STYLE: &str = "background-color: #fff0b3";

/// A proprietary construct recognised in the tree, with the data needed to rebuild it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Construct {
    Image(ImageSource),
    Code {
        language: Option<String>,
        body: String,
    },
    Link {
        target: LinkTarget,
        label: Option<LinkLabel>,
    },
    /// Literal HTML of a list found inside a table.
    TableList(String),
    /// Inner HTML of a colored span.
    ColoredSpan(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Attachment(String),
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    Page(String),
    Attachment(String),
}

/// Anchor content of a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkLabel {
    /// From `ac:plain-text-link-body`.
    Text(String),
    /// Serialised `ac:link-body` children, already rewritten by the earlier passes.
    Markup(String),
}

/// The rewrite rules, in the order their passes run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Skip,
    Code,
    Image,
    Link,
}

pub const RULE_ORDER: [Rule; 4] = [Rule::Skip, Rule::Code, Rule::Image, Rule::Link];

impl Rule {
    /// Does `element` have the shape this rule looks for?
    pub fn finds(self, element: ElementRef) -> bool {
        let el = element.value();
        match self {
            Rule::Skip => match el.name() {
                "ul" | "ol" => has_ancestor(element, "table"),
                "span" => el
                    .attr("style")
                    .is_some_and(|s| s.to_ascii_lowercase().contains("color")),
                _ => false,
            },
            Rule::Code => {
                el.name() == "ac:structured-macro"
                    && matches!(el.attr("ac:name"), Some("code") | Some("noformat"))
            }
            Rule::Image => el.name() == "ac:image",
            Rule::Link => el.name() == "ac:link",
        }
    }

    /// Pull the payload out of a found element; `None` for shapes we don't know.
    pub fn extract(self, element: ElementRef) -> Option<Construct> {
        match self {
            Rule::Skip => Some(if element.value().name() == "span" {
                Construct::ColoredSpan(element.inner_html())
            } else {
                Construct::TableList(element.html())
            }),
            Rule::Code => {
                let body = find_descendant(element, "ac:plain-text-body")?
                    .text()
                    .collect::<String>();
                let language = element
                    .descendants()
                    .filter_map(ElementRef::wrap)
                    .find(|e| {
                        e.value().name() == "ac:parameter"
                            && e.value().attr("ac:name") == Some("language")
                    })
                    .map(|e| e.text().collect::<String>().trim().to_string())
                    .filter(|l| !l.is_empty());
                Some(Construct::Code { language, body })
            }
            Rule::Image => {
                let source = element
                    .descendants()
                    .filter_map(ElementRef::wrap)
                    .find_map(|e| match e.value().name() {
                        "ri:attachment" => e
                            .value()
                            .attr("ri:filename")
                            .map(|f| ImageSource::Attachment(f.to_string())),
                        "ri:url" => e
                            .value()
                            .attr("ri:value")
                            .map(|u| ImageSource::Url(u.to_string())),
                        _ => None,
                    })?;
                Some(Construct::Image(source))
            }
            Rule::Link => {
                // Only the link's own resource counts; anything deeper belongs to its body.
                let target = element
                    .children()
                    .filter_map(ElementRef::wrap)
                    .find_map(|e| match e.value().name() {
                        "ri:page" => e
                            .value()
                            .attr("ri:content-title")
                            .map(|t| LinkTarget::Page(t.to_string())),
                        "ri:attachment" => e
                            .value()
                            .attr("ri:filename")
                            .map(|f| LinkTarget::Attachment(f.to_string())),
                        _ => None,
                    })?;
                let plain = find_descendant(element, "ac:plain-text-link-body")
                    .map(|e| e.text().collect::<String>().trim().to_string())
                    .filter(|l| !l.is_empty())
                    .map(LinkLabel::Text);
                let label = plain.or_else(|| {
                    find_descendant(element, "ac:link-body")
                        .map(|e| e.inner_html().trim().to_string())
                        .filter(|l| !l.is_empty())
                        .map(LinkLabel::Markup)
                });
                Some(Construct::Link { target, label })
            }
        }
    }
}

/// Generic HTML standing in for a construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub html: String,
    /// Block replacements get a `<br>` in front so they don't merge into preceding inline text.
    pub block: bool,
}

/// Protected fragments of one document, in the order their placeholders were emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedItems {
    token: String,
    literals: Vec<String>,
}

impl Default for ProtectedItems {
    fn default() -> Self {
        Self::with_token(SKIP_PLACEHOLDER)
    }
}

impl ProtectedItems {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            literals: Vec::new(),
        }
    }

    /// Placeholder standing in for every fragment of this document.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    pub fn literals(&self) -> &[String] {
        &self.literals
    }

    fn push(&mut self, literal: String) -> &str {
        self.literals.push(literal);
        &self.token
    }

    /// Swap placeholders back for their fragments, first occurrence first.
    ///
    /// All placeholders share one token, so the substitution is positional.
    pub fn restore(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        for literal in &self.literals {
            match rest.find(self.token.as_str()) {
                Some(pos) => {
                    out.push_str(&rest[..pos]);
                    out.push_str(literal);
                    rest = &rest[pos + self.token.len()..];
                }
                None => {
                    engine_warn!("Placeholder for a protected fragment went missing during conversion");
                }
            }
        }
        out.push_str(rest);
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutput {
    pub html: String,
    pub protected: ProtectedItems,
}

/// Applies the rules to one document.
pub struct Rewriter<'a> {
    resolver: Option<LinkResolver<'a>>,
    document: &'a Path,
}

impl<'a> Rewriter<'a> {
    pub fn new(resolver: Option<LinkResolver<'a>>, document: &'a Path) -> Self {
        Self { resolver, document }
    }

    pub fn rewrite(&self, raw: &str) -> RewriteOutput {
        let normalized = normalize_cdata(raw);
        let mut protected = ProtectedItems::with_token(placeholder_for(&normalized));
        let mut fragment = Html::parse_fragment(&normalized);
        for rule in RULE_ORDER {
            self.apply(&mut fragment, rule, &mut protected);
        }
        RewriteOutput {
            html: fragment.root_element().inner_html(),
            protected,
        }
    }

    /// One pass of `rule` over the tree. Nested matches are left to the outer one.
    fn apply(&self, fragment: &mut Html, rule: Rule, protected: &mut ProtectedItems) {
        let matches: Vec<NodeId> = fragment
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|e| rule.finds(*e) && !inside_match(*e, rule))
            .map(|e| e.id())
            .collect();

        for id in matches {
            let replacement = fragment
                .tree
                .get(id)
                .and_then(ElementRef::wrap)
                .and_then(|element| rule.extract(element))
                .and_then(|construct| self.build(construct, protected));
            if let Some(replacement) = replacement {
                splice(&mut fragment.tree, id, &replacement);
            }
        }
    }

    /// Literal HTML of a protected fragment, with every rule but skip-protection applied.
    fn render_literal(&self, html: &str, protected: &mut ProtectedItems) -> String {
        let mut fragment = Html::parse_fragment(html);
        for rule in RULE_ORDER.into_iter().filter(|r| *r != Rule::Skip) {
            self.apply(&mut fragment, rule, protected);
        }
        fragment.root_element().inner_html()
    }

    fn build(&self, construct: Construct, protected: &mut ProtectedItems) -> Option<Replacement> {
        match construct {
            Construct::TableList(html) => {
                let literal = self.render_literal(&html, protected);
                let token = protected.push(literal);
                Some(Replacement {
                    html: format!("<p>{token}</p>"),
                    block: false,
                })
            }
            Construct::ColoredSpan(inner) => {
                let literal = self.render_literal(
                    &format!("<span style=\"{HIGHLIGHT_STYLE}\">{inner}</span>"),
                    protected,
                );
                let token = protected.push(literal);
                Some(Replacement {
                    html: token.to_string(),
                    block: false,
                })
            }
            Construct::Code { language, body } => {
                let class = language
                    .map(|l| format!(" class=\"language-{}\"", escape_attr(&l)))
                    .unwrap_or_default();
                Some(Replacement {
                    html: format!("<pre><code{class}>{}</code></pre>", escape_text(&body)),
                    block: true,
                })
            }
            Construct::Image(source) => {
                let src = match source {
                    ImageSource::Attachment(filename) => attachment_href(&filename),
                    ImageSource::Url(url) => url,
                };
                let src = escape_attr(&src);
                Some(Replacement {
                    html: format!("<div><img src=\"{src}\" alt=\"{src}\"></div><br>"),
                    block: true,
                })
            }
            Construct::Link { target, label } => {
                let (href, fallback) = match target {
                    LinkTarget::Page(title) => {
                        let href = self.resolver?.resolve_page(&title, self.document)?;
                        (href, title)
                    }
                    LinkTarget::Attachment(filename) => (attachment_href(&filename), filename),
                };
                let content = match label {
                    Some(LinkLabel::Markup(markup)) => markup,
                    Some(LinkLabel::Text(text)) => escape_text(&text),
                    None => escape_text(&fallback),
                };
                Some(Replacement {
                    html: format!("<a href=\"{}\">{content}</a>", escape_attr(&href)),
                    block: false,
                })
            }
        }
    }
}

/// Replace the node `target` with the parsed `replacement`, in place.
fn splice(tree: &mut Tree<Node>, target: NodeId, replacement: &Replacement) {
    let markup = if replacement.block {
        Cow::Owned(format!("<br>{}", replacement.html))
    } else {
        Cow::Borrowed(replacement.html.as_str())
    };
    let parsed = Html::parse_fragment(&markup);
    let root = tree.extend_tree(parsed.tree).id();
    let nodes: Vec<NodeId> = tree
        .get(root)
        .and_then(|r| r.children().find(|n| n.value().is_element()))
        .map(|html| html.children().map(|n| n.id()).collect())
        .unwrap_or_default();

    if let Some(mut anchor) = tree.get_mut(target) {
        for id in nodes {
            anchor.insert_id_before(id);
        }
        anchor.detach();
    }
}

/// Token not already present in `raw`, so restoration only ever finds our own placeholders.
fn placeholder_for(raw: &str) -> String {
    let mut token = SKIP_PLACEHOLDER.to_string();
    while raw.contains(token.as_str()) {
        token.push('X');
    }
    token
}

fn inside_match(element: ElementRef, rule: Rule) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| rule.finds(a))
}

fn has_ancestor(element: ElementRef, name: &str) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| a.value().name() == name)
}

fn find_descendant<'a>(element: ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
    element
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == name)
}

/// Turn `<![CDATA[...]]>` sections into escaped text.
///
/// An HTML parser reads CDATA as a bogus comment that ends at the first `>`,
/// which would cut code macro bodies short.
pub fn normalize_cdata(raw: &str) -> Cow<'_, str> {
    const OPEN: &str = "<![CDATA[";
    const CLOSE: &str = "]]>";
    if !raw.contains(OPEN) {
        return Cow::Borrowed(raw);
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let body = &rest[start + OPEN.len()..];
        match body.find(CLOSE) {
            Some(end) => {
                out.push_str(&escape_text(&body[..end]));
                rest = &body[end + CLOSE.len()..];
            }
            None => {
                out.push_str(&escape_text(body));
                rest = "";
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

// Escaping for values interpolated into replacement markup before it is parsed.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            _ => out.push(ch),
        }
    }
    out
}
