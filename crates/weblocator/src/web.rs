//! Browser binding.
//!
//! [`WebDocument`] answers [`DocumentHost`] queries from the live page and
//! [`PromptSink`] pushes channel lines through `window.prompt`, which the
//! embedding view intercepts. The exported functions are the entry points the
//! harness calls by name.

use std::cell::RefCell;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement, MouseEvent, MouseEventInit, Node, Window};

use crate::channel::OutputSink;
use crate::config::LocatorConfig;
use crate::dom::{DocumentHost, DomFault, PointerEvent};
use crate::geometry::Rect;
use crate::record::Attribute;
use crate::request::{Request, ALL_TEXTS, ALL_WEB_ELEMENTS};
use crate::result::{LocatorError, LocatorResult};

const SHOW_ELEMENT: u32 = 0x1;
const SHOW_TEXT: u32 = 0x4;
const ORDERED_NODE_ITERATOR_TYPE: u16 = 5;

fn script_fault(error: &JsValue) -> DomFault {
    DomFault::Script {
        message: error
            .as_string()
            .or_else(|| error.dyn_ref::<js_sys::Error>().map(|e| String::from(e.message())))
            .unwrap_or_else(|| format!("{error:?}")),
    }
}

fn element(node: &Node) -> Result<&Element, DomFault> {
    node.dyn_ref::<Element>().ok_or(DomFault::NotAnElement)
}

fn dom_rect(rect: &web_sys::DomRect) -> Rect {
    Rect::new(rect.left(), rect.top(), rect.width(), rect.height())
}

/// The page's document as a [`DocumentHost`]
#[derive(Debug, Clone)]
pub struct WebDocument {
    document: Document,
}

impl WebDocument {
    /// Wrap a document
    #[must_use]
    pub const fn new(document: Document) -> Self {
        Self { document }
    }

    /// The current window's document, if there is one
    #[must_use]
    pub fn current() -> Option<Self> {
        web_sys::window()?.document().map(Self::new)
    }

    fn walk_body(&self, what_to_show: u32) -> Vec<Node> {
        let Some(body) = self.document.body() else {
            return Vec::new();
        };
        let Ok(walker) = self
            .document
            .create_tree_walker_with_what_to_show(&body, what_to_show)
        else {
            return Vec::new();
        };
        let mut nodes = Vec::new();
        while let Ok(Some(node)) = walker.next_node() {
            nodes.push(node);
        }
        nodes
    }
}

fn collection(items: &web_sys::HtmlCollection) -> Vec<Node> {
    (0..items.length())
        .filter_map(|i| items.item(i))
        .map(Node::from)
        .collect()
}

impl DocumentHost for WebDocument {
    type Node = Node;

    fn element_by_id(&self, id: &str) -> Option<Node> {
        self.document.get_element_by_id(id).map(Node::from)
    }

    fn all_elements(&self) -> Vec<Node> {
        collection(&self.document.get_elements_by_tag_name("*"))
    }

    fn body_elements(&self) -> Vec<Node> {
        self.walk_body(SHOW_ELEMENT)
    }

    fn body_text_nodes(&self) -> Vec<Node> {
        self.walk_body(SHOW_TEXT)
    }

    fn elements_by_tag_name(&self, tag: &str) -> Vec<Node> {
        collection(&self.document.get_elements_by_tag_name(tag))
    }

    fn query_selector_all(&self, selector: &str) -> Result<Vec<Node>, DomFault> {
        let list = self
            .document
            .query_selector_all(selector)
            .map_err(|e| DomFault::InvalidSelector {
                selector: selector.to_string(),
                reason: script_fault(&e).to_string(),
            })?;
        Ok((0..list.length()).filter_map(|i| list.get(i)).collect())
    }

    fn evaluate_path(&self, expression: &str) -> Result<Vec<Node>, DomFault> {
        let invalid = |e: &JsValue| DomFault::InvalidPathExpression {
            expression: expression.to_string(),
            reason: script_fault(e).to_string(),
        };
        let result = self
            .document
            .evaluate_with_opt_callback_and_type(
                expression,
                &self.document,
                None,
                ORDERED_NODE_ITERATOR_TYPE,
            )
            .map_err(|e| invalid(&e))?;
        let mut nodes = Vec::new();
        while let Some(node) = result.iterate_next().map_err(|e| invalid(&e))? {
            nodes.push(node);
        }
        Ok(nodes)
    }

    fn element_id(&self, node: &Node) -> Result<String, DomFault> {
        Ok(element(node)?.id())
    }

    fn attribute(&self, node: &Node, name: &str) -> Result<Option<String>, DomFault> {
        Ok(element(node)?.get_attribute(name))
    }

    fn attributes(&self, node: &Node) -> Result<Vec<Attribute>, DomFault> {
        let map = element(node)?.attributes();
        Ok((0..map.length())
            .filter_map(|i| map.item(i))
            .map(|attr| Attribute::new(attr.name(), attr.value()))
            .collect())
    }

    fn class_name(&self, node: &Node) -> Result<String, DomFault> {
        Ok(element(node)?.class_name())
    }

    fn tag_name(&self, node: &Node) -> Result<String, DomFault> {
        Ok(element(node)?.tag_name())
    }

    fn inner_text(&self, node: &Node) -> Result<String, DomFault> {
        node.dyn_ref::<HtmlElement>()
            .map(HtmlElement::inner_text)
            .ok_or_else(|| DomFault::unreadable("innerText"))
    }

    fn value(&self, node: &Node) -> Result<Option<String>, DomFault> {
        let value = js_sys::Reflect::get(node, &JsValue::from_str("value"))
            .map_err(|e| script_fault(&e))?;
        if value.is_undefined() || value.is_null() {
            return Ok(None);
        }
        Ok(Some(value.as_string().unwrap_or_else(|| format!("{value:?}"))))
    }

    fn text_content(&self, node: &Node) -> Result<String, DomFault> {
        Ok(node.text_content().unwrap_or_default())
    }

    fn parent_element(&self, node: &Node) -> Option<Node> {
        node.parent_element().map(Node::from)
    }

    fn bounding_rect(&self, node: &Node) -> Result<Rect, DomFault> {
        Ok(dom_rect(&element(node)?.get_bounding_client_rect()))
    }

    fn text_range_rect(&self, node: &Node) -> Result<Rect, DomFault> {
        let range = self.document.create_range().map_err(|e| script_fault(&e))?;
        range
            .select_node_contents(node)
            .map_err(|e| script_fault(&e))?;
        Ok(dom_rect(&range.get_bounding_client_rect()))
    }

    fn dispatch_pointer(&mut self, node: &Node, event: PointerEvent) -> Result<(), DomFault> {
        let init = MouseEventInit::new();
        init.set_bubbles(event.bubbles);
        init.set_cancelable(event.cancelable);
        init.set_detail(1);
        let mouse = MouseEvent::new_with_mouse_event_init_dict(event.kind.event_type(), &init)
            .map_err(|e| script_fault(&e))?;
        node.dispatch_event(&mouse).map_err(|e| script_fault(&e))?;
        Ok(())
    }

    fn assign_value(&mut self, node: &Node, value: &str) -> Result<(), DomFault> {
        js_sys::Reflect::set(node, &JsValue::from_str("value"), &JsValue::from_str(value))
            .map_err(|e| script_fault(&e))?;
        Ok(())
    }
}

/// Pushes each line through `window.prompt`
#[derive(Debug, Clone)]
pub struct PromptSink {
    window: Window,
}

impl PromptSink {
    /// Sink on the given window
    #[must_use]
    pub const fn new(window: Window) -> Self {
        Self { window }
    }
}

impl OutputSink for PromptSink {
    fn push(&mut self, line: &str) -> LocatorResult<()> {
        self.window
            .prompt_with_message(line)
            .map(|_| ())
            .map_err(|e| LocatorError::sink(script_fault(&e).to_string()))
    }
}

thread_local! {
    static CONFIG: RefCell<LocatorConfig> = RefCell::new(LocatorConfig::default());
}

/// Replace the agent configuration from a JSON document
#[wasm_bindgen(js_name = configureLocator)]
pub fn configure_locator(json: &str) -> Result<(), JsValue> {
    let config: LocatorConfig =
        serde_json::from_str(json).map_err(|e| JsValue::from_str(&e.to_string()))?;
    CONFIG.with(|current| *current.borrow_mut() = config);
    Ok(())
}

fn call(function: &str, args: &[&str]) -> Result<(), JsValue> {
    let to_js = |e: LocatorError| JsValue::from_str(&e.to_string());
    let request = Request::parse(function, args).map_err(to_js)?;
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let mut host = WebDocument::new(document);
    let mut sink = PromptSink::new(window);
    let config = CONFIG.with(|current| current.borrow().clone());
    request
        .execute(&mut host, &mut sink, &config)
        .map(|_| ())
        .map_err(to_js)
}

/// Locate by identifier
#[wasm_bindgen]
pub fn id(query: &str, click: &str) -> Result<(), JsValue> {
    call("id", &[query, click])
}

/// Locate by path expression
#[wasm_bindgen]
pub fn xpath(query: &str, click: &str) -> Result<(), JsValue> {
    call("xpath", &[query, click])
}

/// Locate by selector
#[wasm_bindgen(js_name = cssSelector)]
pub fn css_selector(query: &str, click: &str) -> Result<(), JsValue> {
    call("cssSelector", &[query, click])
}

/// Locate by `name` attribute
#[wasm_bindgen]
pub fn name(query: &str, click: &str) -> Result<(), JsValue> {
    call("name", &[query, click])
}

/// Locate by `class` attribute
#[wasm_bindgen(js_name = className)]
pub fn class_name(query: &str, click: &str) -> Result<(), JsValue> {
    call("className", &[query, click])
}

/// Locate by text content
#[wasm_bindgen(js_name = textContent)]
pub fn text_content(query: &str, click: &str) -> Result<(), JsValue> {
    call("textContent", &[query, click])
}

/// Locate by tag
#[wasm_bindgen(js_name = tagName)]
pub fn tag_name(query: &str, click: &str) -> Result<(), JsValue> {
    call("tagName", &[query, click])
}

/// Set the value of the element with an identifier
#[wasm_bindgen(js_name = enterTextById)]
pub fn enter_text_by_id(query: &str, text: &str) -> Result<(), JsValue> {
    call("enterTextById", &[query, text])
}

/// Set the value of the first path-expression match
#[wasm_bindgen(js_name = enterTextByXpath)]
pub fn enter_text_by_xpath(query: &str, text: &str) -> Result<(), JsValue> {
    call("enterTextByXpath", &[query, text])
}

/// Set the value of the first selector match
#[wasm_bindgen(js_name = enterTextByCssSelector)]
pub fn enter_text_by_css_selector(query: &str, text: &str) -> Result<(), JsValue> {
    call("enterTextByCssSelector", &[query, text])
}

/// Set the value of the first element with a `name`
#[wasm_bindgen(js_name = enterTextByName)]
pub fn enter_text_by_name(query: &str, text: &str) -> Result<(), JsValue> {
    call("enterTextByName", &[query, text])
}

/// Set the value of the first element with a `class`
#[wasm_bindgen(js_name = enterTextByClassName)]
pub fn enter_text_by_class_name(query: &str, text: &str) -> Result<(), JsValue> {
    call("enterTextByClassName", &[query, text])
}

/// Set the value of the parent of the first matching text
#[wasm_bindgen(js_name = enterTextByTextContent)]
pub fn enter_text_by_text_content(query: &str, text: &str) -> Result<(), JsValue> {
    call("enterTextByTextContent", &[query, text])
}

/// Set the value of the first element with a tag
#[wasm_bindgen(js_name = enterTextByTagName)]
pub fn enter_text_by_tag_name(query: &str, text: &str) -> Result<(), JsValue> {
    call("enterTextByTagName", &[query, text])
}

/// Report every visible element
#[wasm_bindgen(js_name = allWebElements)]
pub fn all_web_elements() -> Result<(), JsValue> {
    call(ALL_WEB_ELEMENTS, &[])
}

/// Report every visible text node
#[wasm_bindgen(js_name = allTexts)]
pub fn all_texts() -> Result<(), JsValue> {
    call(ALL_TEXTS, &[])
}
