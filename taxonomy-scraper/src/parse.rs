use recommender_core::{CoreError, Taxonomy};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Heading that opens the subreddit list; everything before it is navigation.
const CONTENT_START: &str = "General Content";

fn selector(css: &str) -> Result<Selector, CoreError> {
    Selector::parse(css).map_err(|e| CoreError::Internal {
        message: format!("invalid selector {css}: {e}"),
    })
}

fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Builds the taxonomy from the list-of-subreddits wiki page.
///
/// `h1`, `h2` and `a` elements are read in document order once the
/// `General Content` heading has been seen. An `h1` opens a category, an
/// `h2` a subcategory, and a link whose text contains `/r/` is filed under
/// the current subcategory. Links that arrive after a category heading but
/// before any subcategory heading go into a subcategory named after the
/// category. A subreddit listed twice keeps its first placement.
pub fn parse_taxonomy(html: &str) -> Result<Taxonomy, CoreError> {
    let document = Html::parse_document(html);
    let tags = selector("h1, h2, a")?;

    let mut taxonomy = Taxonomy::new();
    let mut category: Option<String> = None;
    let mut subcategory: Option<String> = None;
    let mut content_reached = false;

    for element in document.select(&tags) {
        let name = element.value().name();
        let text = element_text(&element);

        if name == "h1" && text == CONTENT_START {
            content_reached = true;
        }
        if !content_reached || text.contains(".com") {
            continue;
        }

        match name {
            "h1" => {
                taxonomy.reset_category(&text);
                category = Some(text);
            }
            "h2" => {
                let Some(category) = category.as_deref() else {
                    debug!("Ignoring subcategory {:?} outside any category", text);
                    continue;
                };
                taxonomy.reset_subcategory(category, &text);
                subcategory = Some(text);
            }
            "a" if text.contains("/r/") => {
                let Some(category) = category.as_deref() else {
                    continue;
                };
                if taxonomy.contains_subreddit(&text) {
                    debug!("Dropping repeated subreddit {}", text);
                    continue;
                }

                let filed = subcategory
                    .as_deref()
                    .is_some_and(|sub| taxonomy.push(category, sub, &text));
                if !filed {
                    taxonomy.reset_subcategory(category, category);
                    taxonomy.push(category, category, &text);
                    subcategory = Some(category.to_string());
                }
            }
            _ => {}
        }
    }

    Ok(taxonomy)
}

/// True when the page `<title>` says the request was throttled.
pub(crate) fn title_is_rate_limited(html: &str) -> Result<bool, CoreError> {
    let document = Html::parse_document(html);
    let title = selector("title")?;
    let text = document
        .select(&title)
        .next()
        .map(|element| element_text(&element))
        .ok_or(recommender_core::TaxonomyError::MissingTitle)?;
    Ok(text.to_lowercase().contains("too many requests"))
}
