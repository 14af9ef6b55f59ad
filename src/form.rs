// HTML form extraction. The portal drives both sign-in and the exam-term
// search through plain server-rendered forms, so a form is read once from
// the page, its values are overridden and it is submitted back as-is.

use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

use crate::dom::{self, selector};
use crate::error::Result;

static FIELDS: LazyLock<Selector> =
    LazyLock::new(|| selector("input[name], select[name], textarea[name]"));
static OWNED_FIELDS: LazyLock<Selector> =
    LazyLock::new(|| selector("input[name][form], select[name][form], textarea[name][form]"));
static SELECTED_OPTION: LazyLock<Selector> = LazyLock::new(|| selector("option[selected]"));
static ANY_OPTION: LazyLock<Selector> = LazyLock::new(|| selector("option"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A form read from a page, ready to be submitted by [`crate::api::KosClient::submit`].
#[derive(Debug, Clone)]
pub struct Form {
    action: Url,
    method: Method,
    fields: Vec<(String, String)>,
}

impl Form {
    /// Read the first form matching `selector` from `document`.
    pub fn find(document: &Html, selector: &Selector, page_url: &Url, what: &str) -> Result<Self> {
        let element = dom::first(document, selector, what)?;
        Self::from_element(element, page_url)
    }

    /// Build a form from a `<form>` element. The action is resolved against
    /// the address of the page the form came from.
    pub fn from_element(form: ElementRef<'_>, page_url: &Url) -> Result<Self> {
        let action = match form.attr("action").map(str::trim).filter(|a| !a.is_empty()) {
            Some(action) => page_url.join(action)?,
            None => page_url.clone(),
        };
        let method = match form.attr("method") {
            Some(m) if m.eq_ignore_ascii_case("post") => Method::Post,
            _ => Method::Get,
        };

        let fields = controls(form).into_iter().filter_map(field_value).collect();

        Ok(Self {
            action,
            method,
            fields,
        })
    }

    pub fn action(&self) -> &Url {
        &self.action
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// Get the current value of a field.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Override a field, adding it when the page did not carry one.
    pub fn set(&mut self, name: &str, value: &str) {
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some(field) => field.1 = value.to_string(),
            None => self.fields.push((name.to_string(), value.to_string())),
        }
    }

    pub fn set_values(&mut self, values: &[(&str, &str)]) {
        for (name, value) in values {
            self.set(name, value);
        }
    }

    pub fn with_action(mut self, action: Url) -> Self {
        self.action = action;
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }
}

/// Controls submitted with `form`.
///
/// A `<form>` opened directly inside a table is closed again by the parser,
/// which leaves it empty and moves its controls into the rows after it. An
/// empty form therefore owns the controls that follow it in its parent, up
/// to the next form. Controls elsewhere naming the form in a `form`
/// attribute are owned too.
fn controls(form: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let id = form.attr("id");
    let mut controls: Vec<ElementRef<'_>> = form.select(&FIELDS).filter(|c| owned_by(c, id)).collect();
    if controls.is_empty() {
        controls = form
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .take_while(|sibling| sibling.value().name() != "form")
            .flat_map(|sibling| {
                let itself = FIELDS.matches(&sibling).then_some(sibling);
                itself.into_iter().chain(sibling.select(&FIELDS))
            })
            .filter(|c| owned_by(c, id))
            .collect();
    }

    if let Some(id) = id {
        let root = form.ancestors().filter_map(ElementRef::wrap).last();
        for control in root.iter().flat_map(|root| root.select(&OWNED_FIELDS)) {
            if control.attr("form") == Some(id) && !controls.contains(&control) {
                controls.push(control);
            }
        }
    }
    controls
}

/// A control without a `form` attribute belongs to the form around it.
fn owned_by(control: &ElementRef<'_>, form_id: Option<&str>) -> bool {
    match control.attr("form") {
        Some(owner) => Some(owner) == form_id,
        None => true,
    }
}

/// Name and value a control contributes, if it is sent at all.
fn field_value(field: ElementRef<'_>) -> Option<(String, String)> {
    let name = field.attr("name").filter(|n| !n.is_empty())?.to_string();
    match field.value().name() {
        "input" => {
            let kind = field.attr("type").unwrap_or("text").to_ascii_lowercase();
            // Buttons are only sent when clicked.
            if matches!(kind.as_str(), "submit" | "button" | "image" | "reset") {
                return None;
            }
            if matches!(kind.as_str(), "radio" | "checkbox") && field.attr("checked").is_none() {
                return None;
            }
            Some((name, field.attr("value").unwrap_or_default().to_string()))
        }
        "select" => {
            let option = field
                .select(&SELECTED_OPTION)
                .next()
                .or_else(|| field.select(&ANY_OPTION).next())?;
            let value = option
                .attr("value")
                .map(str::to_string)
                .unwrap_or_else(|| dom::text(option));
            Some((name, value))
        }
        "textarea" => Some((name, field.text().collect())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KosError;

    const LOGIN: &str = r#"
        <html><body>
        <form name="login" action="login.do" method="POST">
            <input type="text" name="userName" value="">
            <input type="password" name="password">
            <input type="hidden" name="lang" value="en">
            <input type="checkbox" name="remember" value="1">
            <input type="radio" name="mode" value="a">
            <input type="radio" name="mode" value="b" checked>
            <select name="faculty"><option value="FEL">FEL</option><option value="FIT" selected>FIT</option></select>
            <textarea name="comment">hello</textarea>
            <input type="submit" name="send" value="Login">
        </form>
        </body></html>"#;

    fn login_form() -> Form {
        let document = Html::parse_document(LOGIN);
        let page = Url::parse("https://www.kos.cvut.cz/kos/logout.do").unwrap();
        Form::find(&document, &selector(r#"form[name="login"]"#), &page, "login form").unwrap()
    }

    #[test]
    fn resolves_action_against_page() {
        let form = login_form();
        assert_eq!(form.action().as_str(), "https://www.kos.cvut.cz/kos/login.do");
        assert_eq!(form.method(), Method::Post);
    }

    #[test]
    fn collects_successful_controls_only() {
        let form = login_form();
        let names: Vec<&str> = form.fields().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["userName", "password", "lang", "mode", "faculty", "comment"]);
        assert_eq!(form.get("mode"), Some("b"));
        assert_eq!(form.get("faculty"), Some("FIT"));
        assert_eq!(form.get("comment"), Some("hello"));
    }

    #[test]
    fn set_overrides_or_appends() {
        let mut form = login_form();
        form.set_values(&[("userName", "novakj"), ("password", "secret"), ("extra", "1")]);
        assert_eq!(form.get("userName"), Some("novakj"));
        assert_eq!(form.get("password"), Some("secret"));
        assert_eq!(form.fields().last().unwrap(), &("extra".to_string(), "1".to_string()));
    }

    #[test]
    fn missing_form_is_an_error() {
        let document = Html::parse_document("<p>maintenance</p>");
        let page = Url::parse("https://www.kos.cvut.cz/").unwrap();
        let err = Form::find(&document, &selector("form"), &page, "login form").unwrap_err();
        assert!(matches!(err, KosError::MissingElement { .. }));
    }

    #[test]
    fn defaults_to_get_on_page_url() {
        let document = Html::parse_document("<form><input name=\"q\" value=\"x\"></form>");
        let page = Url::parse("https://www.kos.cvut.cz/kos/examsTerms.do?page=abc").unwrap();
        let form = Form::find(&document, &selector("form"), &page, "form").unwrap();
        assert_eq!(form.method(), Method::Get);
        assert_eq!(form.action(), &page);
        assert_eq!(form.get("q"), Some("x"));
    }

    #[test]
    fn form_closed_inside_table_owns_following_rows() {
        let document = Html::parse_document(
            r#"<table><form id="terms" action="/kos/examsTerms.do">
                <input type="hidden" name="action" value="init">
                <tr><td>
                    <input type="hidden" name="studyId" value="777">
                    <select name="selSubject"><option value="101">BI-AG1</option></select>
                </td></tr>
            </form></table>
            <form id="other"><input name="q" value="x"></form>
            <input name="token" value="t1" form="terms">"#,
        );
        let page = Url::parse("https://www.kos.cvut.cz/kos/examsTerms.do").unwrap();
        let form = Form::find(&document, &selector("table form"), &page, "terms form").unwrap();
        let names: Vec<&str> = form.fields().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["action", "studyId", "selSubject", "token"]);
        assert_eq!(form.get("studyId"), Some("777"));
        assert_eq!(form.get("q"), None);
    }

    #[test]
    fn controls_for_another_form_are_skipped() {
        let document = Html::parse_document(
            r#"<form id="a"><input name="mine" value="1"><input name="theirs" value="2" form="b"></form>"#,
        );
        let page = Url::parse("https://www.kos.cvut.cz/").unwrap();
        let form = Form::find(&document, &selector("form"), &page, "form").unwrap();
        assert_eq!(form.fields(), [("mine".to_string(), "1".to_string())]);
    }
}
