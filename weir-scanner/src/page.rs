use scraper::{Html, Selector};

/// A fetched page after HTML extraction, as handed to the page policy.
///
/// `text` is the plain text of the document with markup removed; `hrefs` are
/// the raw anchor targets exactly as they appeared in the markup. Resolution
/// and filtering of those hrefs is the policy's job, not ours.
#[derive(Debug, Clone)]
pub struct PageContent {
    /// The URL that was requested
    pub url: String,
    pub status: u16,
    pub text: String,
    pub hrefs: Vec<String>,
}

impl PageContent {
    /// A page with no extractable content (non-HTML, decode failure, error body)
    pub fn empty(url: String, status: u16) -> Self {
        Self {
            url,
            status,
            text: String::new(),
            hrefs: Vec::new(),
        }
    }
}

/// Extract plain text and raw anchor hrefs from an HTML body.
pub fn parse_html(url: &str, status: u16, body: &str) -> PageContent {
    let document = Html::parse_document(body);

    let link_selector = Selector::parse("a[href]").expect("static selector");
    let hrefs = document
        .select(&link_selector)
        .filter_map(|element| element.value().attr("href"))
        .map(|href| href.to_string())
        .collect::<Vec<_>>();

    let mut text = String::new();
    for chunk in document.root_element().text() {
        let trimmed = chunk.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(trimmed);
    }

    PageContent {
        url: url.to_string(),
        status,
        text,
        hrefs,
    }
}
