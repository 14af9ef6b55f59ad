// Portal client: a blocking HTTP session against KOS. Every response is
// kept as the "current page" because the portal hands out its navigation
// token only inside page markup, and the password notice is read from the
// last landing page.

use indicatif::ProgressBar;
use regex::Regex;
use reqwest::blocking::{Client, RequestBuilder};
use scraper::{Html, Selector};
use std::sync::LazyLock;
use tracing::{debug, info, warn};
use url::Url;

use crate::dom::{self, selector};
use crate::error::{KosError, Result};
use crate::exams::{self, ExamSchedule};
use crate::form::{Form, Method};
use crate::results::{self, ResultRow};
use crate::semester::Semester;

/// Public address of the portal.
pub const KOS_URI: &str = "https://www.kos.cvut.cz";

const LOGOUT_PATH: &str = "/kos/logout.do";
const WELCOME_PATH: &str = "/kos/toWelcome.do";
const WELCOME_FRAME_PATH: &str = "/kos/toWelcomeIFrame.do";
const RESULTS_PATH: &str = "/kos/results.do";
const EXAM_TERMS_PATH: &str = "/kos/examsTerms.do";

static PAGE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"var pageCode='(.*?)';").expect("valid regex"));
static LOGIN_FORM: LazyLock<Selector> = LazyLock::new(|| selector(r#"form[name="login"]"#));
static SESSION_LIMIT: LazyLock<Selector> = LazyLock::new(|| selector("#sessionLimit"));
/// Header notice shown only to signed-in users; holds the password expiry.
static HEADER_NOTICE: LazyLock<Selector> =
    LazyLock::new(|| selector("#hlavicka > div:nth-of-type(2) > div:nth-of-type(3) > b"));

/// The last page the session received.
#[derive(Debug, Clone)]
struct Page {
    url: Url,
    body: String,
}

/// One authenticated session. Owns the cookie jar (inside the reqwest
/// client) and the page token; every scraping call goes through it.
pub struct KosClient {
    client: Client,
    base_url: Url,
    page_code: Option<String>,
    current: Option<Page>,
}

impl KosClient {
    pub fn new(base_url: Url) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .user_agent(concat!("kos-cli/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(KosClient {
            client,
            base_url,
            page_code: None,
            current: None,
        })
    }

    /// Address of a page that needs no token.
    pub fn uri(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// Address of an in-session page: `path` plus the `page` token.
    pub fn internal_uri(&mut self, path: &str) -> Result<Url> {
        let code = self.page_code()?;
        let mut url = self.uri(path)?;
        url.query_pairs_mut().append_pair("page", &code);
        Ok(url)
    }

    /// The page token. Returns the cached one, otherwise reads it from the
    /// current page and caches it for the rest of the session.
    pub fn page_code(&mut self) -> Result<String> {
        if let Some(code) = &self.page_code {
            return Ok(code.clone());
        }
        let code = self
            .current
            .as_ref()
            .and_then(|page| PAGE_CODE.captures(&page.body))
            .map(|c| c[1].to_string())
            .ok_or(KosError::PageCodeNotFound)?;
        debug!("page code derived");
        self.page_code = Some(code.clone());
        Ok(code)
    }

    /// Address of the current page, used to resolve form actions.
    pub fn page_url(&self) -> Option<&Url> {
        self.current.as_ref().map(|page| &page.url)
    }

    pub fn get(&mut self, url: Url) -> Result<Html> {
        debug!(path = url.path(), "GET");
        let request = self.client.get(url);
        self.fetch(request)
    }

    pub fn submit(&mut self, form: &Form) -> Result<Html> {
        let mut url = form.action().clone();
        debug!(path = url.path(), method = ?form.method(), "submitting form");
        let request = match form.method() {
            Method::Get => {
                url.set_query(None);
                url.query_pairs_mut().extend_pairs(form.fields());
                self.client.get(url)
            }
            Method::Post => self.client.post(url).form(form.fields()),
        };
        self.fetch(request)
    }

    fn fetch(&mut self, request: RequestBuilder) -> Result<Html> {
        let response = request.send()?.error_for_status()?;
        let url = response.url().clone();
        let body = response.text()?;
        let document = Html::parse_document(&body);
        self.current = Some(Page { url, body });
        Ok(document)
    }

    /// Sign in as `username`, asking `password` for a password until the
    /// portal accepts one. `password` receives the attempt number, starting
    /// at 1. Returns the number of attempts it took.
    pub fn sign_in<F>(&mut self, username: &str, mut password: F) -> Result<u32>
    where
        F: FnMut(u32) -> Result<String>,
    {
        let mut attempt = 1;
        loop {
            let url = self.uri(LOGOUT_PATH)?;
            let page = self.get(url)?;
            let page_url = self.page_url().cloned().unwrap_or_else(|| self.base_url.clone());
            let mut form = Form::find(&page, &LOGIN_FORM, &page_url, "login form")?;

            let secret = password(attempt)?;
            form.set_values(&[("userName", username), ("password", &secret)]);

            let answer = self.submit(&form)?;
            if answer.select(&SESSION_LIMIT).count() == 1 {
                info!(username, attempt, "signed in");
                return Ok(attempt);
            }
            warn!(username, attempt, "sign-in rejected");
            attempt += 1;
        }
    }

    /// Whether the session is still signed in. Loads the landing page,
    /// which becomes the current page.
    pub fn is_signed_in(&mut self) -> Result<bool> {
        let url = self.internal_uri(WELCOME_PATH)?;
        let page = self.get(url)?;
        Ok(page.select(&HEADER_NOTICE).next().is_some())
    }

    fn require_sign_in(&mut self) -> Result<()> {
        if self.is_signed_in()? {
            Ok(())
        } else {
            Err(KosError::NotSignedIn)
        }
    }

    /// Fetch an in-session page after checking the session is alive.
    pub fn internal_page(&mut self, path: &str) -> Result<Html> {
        self.require_sign_in()?;
        let url = self.internal_uri(path)?;
        self.get(url)
    }

    /// The landing page, freshly loaded by the sign-in check.
    pub fn current_page(&mut self) -> Result<Html> {
        self.require_sign_in()?;
        let page = self.current.as_ref().ok_or(KosError::NotSignedIn)?;
        Ok(Html::parse_document(&page.body))
    }

    /// Days until the password expires, if the header states a number.
    pub fn password_expires_in(&mut self) -> Result<Option<i64>> {
        let page = self.current_page()?;
        let notice = dom::text(dom::first(&page, &HEADER_NOTICE, "password notice")?);
        Ok(leading_number(&notice))
    }

    pub fn current_semester(&mut self) -> Result<Semester> {
        let page = self.internal_page(WELCOME_FRAME_PATH)?;
        let semester = Semester::from_welcome_frame(&page)?;
        info!(%semester, "current semester resolved");
        Ok(semester)
    }

    pub fn results(&mut self, semester: &Semester) -> Result<Vec<ResultRow>> {
        let page = self.internal_page(RESULTS_PATH)?;
        let rows = results::parse_results(&page, semester)?;
        info!(count = rows.len(), %semester, "results loaded");
        Ok(rows)
    }

    /// Exam and credit terms of every subject on the terms page. Posts the
    /// search form once per subject; `progress` advances per subject.
    pub fn exam_terms(&mut self, progress: &ProgressBar) -> Result<ExamSchedule> {
        let page = self.internal_page(EXAM_TERMS_PATH)?;
        let subjects = exams::parse_subjects(&page)?;
        let page_url = self.page_url().cloned().unwrap_or_else(|| self.base_url.clone());
        let action = self.internal_uri(EXAM_TERMS_PATH)?;
        let mut form = exams::search_form(&page, &page_url, action)?;

        let mut schedule = ExamSchedule::new();
        for subject in &subjects {
            schedule.entry(subject.name.clone()).or_default();
        }

        progress.set_length(subjects.len() as u64);
        for subject in &subjects {
            progress.set_message(subject.name.clone());
            form.set_values(&exams::search_fields(&subject.code));
            let answer = self.submit(&form)?;
            let terms = exams::parse_term_rows(&answer, subject)?;
            debug!(subject = %subject.name, count = terms.len(), "terms loaded");
            schedule.entry(subject.name.clone()).or_default().extend(terms);
            progress.inc(1);
        }
        progress.finish_and_clear();

        info!(subjects = subjects.len(), "exam terms loaded");
        Ok(schedule)
    }
}

/// The number a notice starts with once everything but digits and signs is
/// dropped: `45 dní - 12.03.2024` reads as `45-12032024`, which is 45.
fn leading_number(notice: &str) -> Option<i64> {
    let kept: String = notice
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-' || *c == '+')
        .collect();
    let unsigned = kept.strip_prefix(['-', '+']).unwrap_or(kept.as_str());
    let sign_len = kept.len() - unsigned.len();
    let digits = unsigned.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    kept[..sign_len + digits].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> KosClient {
        KosClient::new(Url::parse(KOS_URI).unwrap()).unwrap()
    }

    fn show(client: &mut KosClient, body: &str) {
        client.current = Some(Page {
            url: Url::parse("https://www.kos.cvut.cz/kos/login.do").unwrap(),
            body: body.to_string(),
        });
    }

    #[test]
    fn page_code_is_cached() {
        let mut client = client();
        show(&mut client, "<script>var pageCode='s1a2b3';</script>");
        assert_eq!(client.page_code().unwrap(), "s1a2b3");

        show(&mut client, "<script>var pageCode='other';</script>");
        assert_eq!(client.page_code().unwrap(), "s1a2b3");
        show(&mut client, "<p>no token here</p>");
        assert_eq!(client.page_code().unwrap(), "s1a2b3");
    }

    #[test]
    fn missing_page_code_fails_without_caching() {
        let mut client = client();
        assert!(matches!(client.page_code(), Err(KosError::PageCodeNotFound)));
        show(&mut client, "<script>var other='x';</script>");
        assert!(matches!(client.page_code(), Err(KosError::PageCodeNotFound)));
        assert!(client.page_code.is_none());
    }

    #[test]
    fn internal_uri_appends_token() {
        let mut client = client();
        show(&mut client, "<script>var pageCode='abc';</script>");
        assert_eq!(
            client.internal_uri("/kos/results.do").unwrap().as_str(),
            "https://www.kos.cvut.cz/kos/results.do?page=abc"
        );
        assert_eq!(
            client.internal_uri("/kos/examsTerms.do?x=1").unwrap().as_str(),
            "https://www.kos.cvut.cz/kos/examsTerms.do?x=1&page=abc"
        );
    }

    #[test]
    fn public_uri_ignores_token() {
        let client = client();
        assert_eq!(
            client.uri("/kos/logout.do").unwrap().as_str(),
            "https://www.kos.cvut.cz/kos/logout.do"
        );
    }

    #[test]
    fn expiry_reads_leading_number_only() {
        assert_eq!(leading_number("45 days"), Some(45));
        assert_eq!(leading_number("Heslo vyprší za 45 dní - 12.03.2024"), Some(45));
        assert_eq!(leading_number("-3 days"), Some(-3));
        assert_eq!(leading_number("expires soon"), None);
        assert_eq!(leading_number("- soon"), None);
    }
}
